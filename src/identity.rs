//! `Identity` service: static plugin metadata, no collaborator calls.

use tonic::{Request, Response, Status};

use crate::csi;

pub const PLUGIN_NAME: &str = "io.mesosphere.dcos.storage/csilvm";
pub const PLUGIN_VERSION: &str = "1.11.0";

const SUPPORTED_VERSION: csi::Version = csi::Version { major: 0, minor: 1, patch: 0 };

#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityService;

#[tonic::async_trait]
impl csi::identity_server::Identity for IdentityService {
    async fn get_supported_versions(
        &self,
        _request: Request<csi::GetSupportedVersionsRequest>,
    ) -> std::result::Result<Response<csi::GetSupportedVersionsResponse>, Status> {
        Ok(Response::new(csi::GetSupportedVersionsResponse {
            supported_versions: vec![SUPPORTED_VERSION],
        }))
    }

    async fn get_plugin_info(
        &self,
        request: Request<csi::GetPluginInfoRequest>,
    ) -> std::result::Result<Response<csi::GetPluginInfoResponse>, Status> {
        crate::validation::check_version(request.get_ref().version.as_ref())?;
        Ok(Response::new(csi::GetPluginInfoResponse {
            name: PLUGIN_NAME.to_string(),
            vendor_version: PLUGIN_VERSION.to_string(),
            manifest: Default::default(),
        }))
    }
}
