//! `Node` service: the publish/unpublish lifecycle and node probing.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::csi;
use crate::device;
use crate::error::CsiError;
use crate::lvm;
use crate::server::LvmCsiServer;
use crate::validation;

pub struct NodeService {
    server: Arc<LvmCsiServer>,
}

impl NodeService {
    pub fn new(server: Arc<LvmCsiServer>) -> Self {
        Self { server }
    }
}

fn is_readonly(requested: bool, access_mode: &csi::volume_capability::AccessMode) -> bool {
    requested
        || access_mode.mode == csi::volume_capability::access_mode::Mode::SingleNodeReaderOnly as i32
}

#[tonic::async_trait]
impl csi::node_server::Node for NodeService {
    async fn node_publish_volume(
        &self,
        request: Request<csi::NodePublishVolumeRequest>,
    ) -> std::result::Result<Response<csi::NodePublishVolumeResponse>, Status> {
        let req = request.into_inner();
        validation::check_version(req.version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        validation::check_volume_id(&req.volume_id)?;
        let cap = validation::check_node_publish(
            &self.server.config,
            &req.target_path,
            req.volume_capability.as_ref(),
            &req.publish_volume_info,
        )?;
        let access_mode = cap.access_mode.as_ref().ok_or(CsiError::MissingAccessMode)?;
        let readonly = is_readonly(req.readonly, access_mode);

        let state = self.server.state.lock().await;
        let vg = state
            .volume_group
            .as_ref()
            .ok_or(CsiError::VolumeGroupNotProbed)?;
        let lv = vg
            .lookup_logical_volume(&req.volume_id)?
            .ok_or_else(|| CsiError::VolumeNotFound(req.volume_id.clone()))?;

        let source_path = device::resolve_symlink(lv.path())?.to_string_lossy().into_owned();

        match cap.access_type.as_ref().ok_or(CsiError::MissingAccessType)? {
            csi::volume_capability::AccessType::Block(_) => {
                publish_block(&source_path, &req.target_path, readonly)
            }
            csi::volume_capability::AccessType::Mount(mount) => {
                publish_mount(&self.server, &source_path, &req.target_path, mount, readonly)
            }
        }?;

        Ok(Response::new(csi::NodePublishVolumeResponse {}))
    }

    async fn node_unpublish_volume(
        &self,
        request: Request<csi::NodeUnpublishVolumeRequest>,
    ) -> std::result::Result<Response<csi::NodeUnpublishVolumeResponse>, Status> {
        let req = request.into_inner();
        validation::check_version(req.version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        validation::check_volume_id(&req.volume_id)?;
        validation::check_target_path(&req.target_path)?;

        let state = self.server.state.lock().await;
        let vg = state
            .volume_group
            .as_ref()
            .ok_or(CsiError::VolumeGroupNotProbed)?;
        vg.lookup_logical_volume(&req.volume_id)?
            .ok_or_else(|| CsiError::VolumeNotFound(req.volume_id.clone()))?;

        if device::get_mount_at(&req.target_path)?.is_none() {
            return Ok(Response::new(csi::NodeUnpublishVolumeResponse {}));
        }

        device::unmount(&req.target_path)?;
        Ok(Response::new(csi::NodeUnpublishVolumeResponse {}))
    }

    async fn get_node_id(
        &self,
        request: Request<csi::GetNodeIdRequest>,
    ) -> std::result::Result<Response<csi::GetNodeIdResponse>, Status> {
        validation::check_version(request.get_ref().version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        Ok(Response::new(csi::GetNodeIdResponse { node_id: String::new() }))
    }

    async fn node_probe(
        &self,
        request: Request<csi::NodeProbeRequest>,
    ) -> std::result::Result<Response<csi::NodeProbeResponse>, Status> {
        validation::check_version(request.get_ref().version.as_ref())?;

        lvm::validate_tags(&self.server.config.tags)
            .map_err(|e| CsiError::TagValidationFailed(e.to_string()))?;

        let mut state = self.server.state.lock().await;
        let config = &self.server.config;
        let backend = self.server.backend.clone();

        match lvm::lookup_volume_group(backend.clone(), &config.vg_name)? {
            None => {
                if config.removing_volume_group {
                    state.volume_group = None;
                    return Ok(Response::new(csi::NodeProbeResponse {}));
                }

                for pv_name in &config.pv_names {
                    if !lvm::lookup_physical_volume(&backend, pv_name)? {
                        std::fs::metadata(pv_name)
                            .map_err(|_| CsiError::MissingPhysicalVolume(pv_name.clone()))?;
                        device::zero_first_sector(pv_name)?;
                        lvm::create_physical_volume(&backend, pv_name)?;
                    }
                }

                let vg = lvm::create_volume_group(
                    backend,
                    &config.vg_name,
                    &config.pv_names,
                    &config.tags,
                )?;
                state.volume_group = Some(vg);
            }
            Some(vg) => {
                let actual_pvs: std::collections::HashSet<_> =
                    vg.list_physical_volume_names()?.into_iter().collect();
                let expected_pvs: std::collections::HashSet<_> =
                    config.pv_names.iter().cloned().collect();
                if actual_pvs != expected_pvs {
                    return Err(CsiError::VolumeGroupMismatch(format!(
                        "physical volumes {actual_pvs:?} do not match configured {expected_pvs:?}"
                    ))
                    .into());
                }

                let actual_tags: std::collections::HashSet<_> = vg.tags()?.into_iter().collect();
                let expected_tags: std::collections::HashSet<_> =
                    config.tags.iter().cloned().collect();
                if actual_tags != expected_tags {
                    return Err(CsiError::VolumeGroupMismatch(format!(
                        "tags {actual_tags:?} do not match configured {expected_tags:?}"
                    ))
                    .into());
                }

                if config.removing_volume_group {
                    vg.remove()?;
                    state.volume_group = None;
                } else {
                    state.volume_group = Some(vg);
                }
            }
        }

        Ok(Response::new(csi::NodeProbeResponse {}))
    }

    async fn node_get_capabilities(
        &self,
        request: Request<csi::NodeGetCapabilitiesRequest>,
    ) -> std::result::Result<Response<csi::NodeGetCapabilitiesResponse>, Status> {
        validation::check_version(request.get_ref().version.as_ref())?;
        validation::check_not_removing(&self.server.config)?;
        Ok(Response::new(csi::NodeGetCapabilitiesResponse { capabilities: vec![] }))
    }
}

fn publish_block(source_path: &str, target_path: &str, readonly: bool) -> Result<(), CsiError> {
    if readonly {
        return Err(CsiError::BlockVolNoRo);
    }

    match device::get_mount_at(target_path)? {
        Some(entry) => {
            let expected_root = format!("/dev{}", entry.root);
            if source_path == expected_root {
                Ok(())
            } else {
                Err(CsiError::TargetPathNotEmpty)
            }
        }
        None => {
            device::bind_mount(source_path, target_path, false)?;
            Ok(())
        }
    }
}

fn publish_mount(
    server: &LvmCsiServer,
    source_path: &str,
    target_path: &str,
    mount: &csi::volume_capability::MountVolume,
    readonly: bool,
) -> Result<(), CsiError> {
    let fs_type = if mount.fs_type.is_empty() {
        server.config.default_filesystem().to_string()
    } else {
        mount.fs_type.clone()
    };

    match device::get_mount_at(target_path)? {
        Some(entry) => {
            if entry.mountsource != source_path {
                return Err(CsiError::TargetPathNotEmpty);
            }
            if entry.fstype != fs_type {
                return Err(CsiError::MismatchedFsType(entry.fstype));
            }
            if entry.is_readonly != readonly {
                return Err(if entry.is_readonly {
                    CsiError::TargetPathRo
                } else {
                    CsiError::TargetPathRw
                });
            }
            Ok(())
        }
        None => {
            let existing_fstype = server.device_tools.probe_fstype(source_path)?;
            if existing_fstype.is_empty() {
                server.device_tools.format(source_path, &fs_type)?;
            } else if existing_fstype != fs_type {
                return Err(CsiError::MismatchedFsType(existing_fstype));
            }

            let mount_options = mount.mount_flags.join(",");
            device::mount_filesystem(source_path, target_path, &fs_type, readonly, &mount_options)?;
            Ok(())
        }
    }
}
