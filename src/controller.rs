//! `Controller` service: volume provisioning, capacity, and capability RPCs.

use std::sync::Arc;

use prost::Message;
use tonic::{Code, Request, Response, Status};

use crate::csi;
use crate::device;
use crate::error::CsiError;
use crate::server::LvmCsiServer;
use crate::validation;

pub struct ControllerService {
    server: Arc<LvmCsiServer>,
}

impl ControllerService {
    pub fn new(server: Arc<LvmCsiServer>) -> Self {
        Self { server }
    }
}

#[tonic::async_trait]
impl csi::controller_server::Controller for ControllerService {
    async fn controller_probe(
        &self,
        request: Request<csi::ControllerProbeRequest>,
    ) -> std::result::Result<Response<csi::ControllerProbeResponse>, Status> {
        validation::check_version(request.get_ref().version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        Ok(Response::new(csi::ControllerProbeResponse {}))
    }

    async fn create_volume(
        &self,
        request: Request<csi::CreateVolumeRequest>,
    ) -> std::result::Result<Response<csi::CreateVolumeResponse>, Status> {
        let req = request.into_inner();
        validation::check_version(req.version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        validation::check_name(&req.name)?;
        validation::check_capacity_range(req.capacity_range.as_ref())?;
        validation::check_capabilities(&self.server.config, &req.volume_capabilities)?;

        let volume_id = format!("{}_{}", self.server.config.vg_name, req.name);

        let state = self.server.state.lock().await;
        let vg = state
            .volume_group
            .as_ref()
            .ok_or(CsiError::VolumeGroupNotProbed)?;

        if let Some(existing) = vg.lookup_logical_volume(&volume_id)? {
            let info = csi::VolumeInfo {
                capacity_bytes: existing.size_in_bytes(),
                id: volume_id.clone(),
                attributes: Default::default(),
            };
            return Err(Status::with_details(
                Code::AlreadyExists,
                format!("volume already exists: {volume_id}"),
                info.encode_to_vec().into(),
            ));
        }

        let size_bytes = match req.capacity_range.as_ref() {
            Some(range) => range.required_bytes,
            None => self.server.config.default_volume_size_bytes,
        };

        let bytes_free = vg.bytes_free()?;
        let size_bytes = if size_bytes == u64::MAX { bytes_free } else { size_bytes };
        if bytes_free < size_bytes {
            return Err(CsiError::NotEnoughFreeSpace.into());
        }

        let lv = vg.create_logical_volume(&volume_id, size_bytes, &self.server.config.tags)?;

        Ok(Response::new(csi::CreateVolumeResponse {
            volume_info: Some(csi::VolumeInfo {
                capacity_bytes: lv.size_in_bytes(),
                id: volume_id,
                attributes: Default::default(),
            }),
        }))
    }

    async fn delete_volume(
        &self,
        request: Request<csi::DeleteVolumeRequest>,
    ) -> std::result::Result<Response<csi::DeleteVolumeResponse>, Status> {
        let req = request.into_inner();
        validation::check_version(req.version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        validation::check_volume_id(&req.volume_id)?;

        let state = self.server.state.lock().await;
        let vg = state
            .volume_group
            .as_ref()
            .ok_or(CsiError::VolumeGroupNotProbed)?;

        let lv = vg
            .lookup_logical_volume(&req.volume_id)?
            .ok_or_else(|| CsiError::VolumeNotFound(req.volume_id.clone()))?;

        let device_path = device::resolve_symlink(lv.path())
            .map_err(CsiError::from)?
            .to_string_lossy()
            .into_owned();
        device::scrub_device(&device_path).map_err(CsiError::from)?;

        lv.remove()?;

        Ok(Response::new(csi::DeleteVolumeResponse {}))
    }

    async fn controller_publish_volume(
        &self,
        request: Request<csi::ControllerPublishVolumeRequest>,
    ) -> std::result::Result<Response<csi::ControllerPublishVolumeResponse>, Status> {
        validation::check_version(request.get_ref().version.as_ref())?;
        Err(CsiError::Unimplemented.into())
    }

    async fn controller_unpublish_volume(
        &self,
        request: Request<csi::ControllerUnpublishVolumeRequest>,
    ) -> std::result::Result<Response<csi::ControllerUnpublishVolumeResponse>, Status> {
        validation::check_version(request.get_ref().version.as_ref())?;
        Err(CsiError::Unimplemented.into())
    }

    async fn validate_volume_capabilities(
        &self,
        request: Request<csi::ValidateVolumeCapabilitiesRequest>,
    ) -> std::result::Result<Response<csi::ValidateVolumeCapabilitiesResponse>, Status> {
        let req = request.into_inner();
        validation::check_version(req.version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        validation::check_volume_id(&req.volume_id)?;
        validation::check_capabilities(&self.server.config, &req.volume_capabilities)?;

        let state = self.server.state.lock().await;
        let vg = state
            .volume_group
            .as_ref()
            .ok_or(CsiError::VolumeGroupNotProbed)?;

        let lv = vg
            .lookup_logical_volume(&req.volume_id)?
            .ok_or_else(|| CsiError::VolumeNotFound(req.volume_id.clone()))?;

        let device_path = device::resolve_symlink(lv.path())
            .map_err(CsiError::from)?
            .to_string_lossy()
            .into_owned();
        let existing_fstype = self.server.device_tools.probe_fstype(&device_path)?;

        for cap in &req.volume_capabilities {
            if let Some(csi::volume_capability::AccessType::Mount(mount)) = &cap.access_type {
                if !existing_fstype.is_empty()
                    && !mount.fs_type.is_empty()
                    && mount.fs_type != existing_fstype
                {
                    return Err(CsiError::MismatchedFsType(mount.fs_type.clone()).into());
                }
            }
        }

        Ok(Response::new(csi::ValidateVolumeCapabilitiesResponse {
            supported: true,
            message: String::new(),
        }))
    }

    async fn list_volumes(
        &self,
        request: Request<csi::ListVolumesRequest>,
    ) -> std::result::Result<Response<csi::ListVolumesResponse>, Status> {
        let req = request.into_inner();
        validation::check_version(req.version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;

        let state = self.server.state.lock().await;
        let vg = state
            .volume_group
            .as_ref()
            .ok_or(CsiError::VolumeGroupNotProbed)?;

        let names = vg.list_logical_volume_names()?;
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            if let Some(lv) = vg.lookup_logical_volume(&name)? {
                entries.push(csi::VolumeInfo {
                    capacity_bytes: lv.size_in_bytes(),
                    id: name,
                    attributes: Default::default(),
                });
            }
        }

        Ok(Response::new(csi::ListVolumesResponse {
            entries,
            next_token: String::new(),
        }))
    }

    async fn get_capacity(
        &self,
        request: Request<csi::GetCapacityRequest>,
    ) -> std::result::Result<Response<csi::GetCapacityResponse>, Status> {
        let req = request.into_inner();
        validation::check_version(req.version.as_ref())?;

        if self.server.config.removing_volume_group {
            return Ok(Response::new(csi::GetCapacityResponse { available_capacity: 0 }));
        }

        for cap in &req.volume_capabilities {
            if let Some(csi::volume_capability::AccessType::Mount(mount)) = &cap.access_type {
                if !mount.fs_type.is_empty() && !self.server.config.is_supported_filesystem(&mount.fs_type) {
                    return Ok(Response::new(csi::GetCapacityResponse { available_capacity: 0 }));
                }
            }
        }

        let state = self.server.state.lock().await;
        let available_capacity = match state.volume_group.as_ref() {
            Some(vg) => vg.bytes_free()?,
            None => 0,
        };

        Ok(Response::new(csi::GetCapacityResponse { available_capacity }))
    }

    async fn controller_get_capabilities(
        &self,
        request: Request<csi::ControllerGetCapabilitiesRequest>,
    ) -> std::result::Result<Response<csi::ControllerGetCapabilitiesResponse>, Status> {
        validation::check_version(request.get_ref().version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;

        use csi::controller_service_capability::{rpc::Type, Rpc};

        let capability = |t: Type| csi::ControllerServiceCapability {
            r#type: Some(csi::controller_service_capability::Type::Rpc(Rpc { r#type: t as i32 })),
        };

        Ok(Response::new(csi::ControllerGetCapabilitiesResponse {
            capabilities: vec![
                capability(Type::CreateDeleteVolume),
                capability(Type::ListVolumes),
                capability(Type::GetCapacity),
            ],
        }))
    }
}
