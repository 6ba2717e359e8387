//! End-to-end RPC tests against the in-memory LVM2 facade.
//!
//! `NodePublishVolume`/`NodeUnpublishVolume`/`DeleteVolume`/`ValidateVolumeCapabilities`,
//! and `NodeProbe`'s from-scratch volume-group-creation branch, reach past the
//! `LvmBackend` trait into direct kernel syscalls and raw device stats (mount/umount,
//! device scrubbing, `fs::metadata` on a configured physical volume) and aren't
//! covered here: those are intentionally not mockable (see `DESIGN.md`), so
//! exercising them needs a real block device. `NodeProbe` against a pre-existing,
//! already-registered volume group stays within the `LvmBackend` trait and is
//! covered below.

use std::sync::Arc;

use csilvm::controller::ControllerService;
use csilvm::csi;
use csilvm::csi::controller_server::Controller;
use csilvm::csi::identity_server::Identity;
use csilvm::csi::node_server::Node;
use csilvm::device::FakeDeviceTools;
use csilvm::identity::IdentityService;
use csilvm::lvm::fake::FakeBackend;
use csilvm::node::NodeService;
use csilvm::{LvmCsiServer, ServerConfigBuilder};
use tonic::Request;

const V: csi::Version = csi::Version { major: 0, minor: 1, patch: 0 };

fn make_server(vg_name: &str, pv_names: Vec<&str>, removing: bool) -> (Arc<LvmCsiServer>, Arc<FakeBackend>) {
    let config = ServerConfigBuilder::new()
        .vg_name(vg_name)
        .pv_names(pv_names.iter().map(|s| s.to_string()).collect())
        .default_volume_size(1024 * 1024 * 1024)
        .removing_volume_group(removing)
        .supported_filesystem("", "ext4")
        .supported_filesystem("ext4", "ext4")
        .supported_filesystem("xfs", "xfs")
        .build()
        .unwrap();

    let backend = Arc::new(FakeBackend::new());
    let device_tools = Arc::new(FakeDeviceTools::new());
    let server = Arc::new(LvmCsiServer::new(config, backend.clone(), device_tools));
    (server, backend)
}

fn mount_cap(fs_type: &str) -> csi::VolumeCapability {
    csi::VolumeCapability {
        access_type: Some(csi::volume_capability::AccessType::Mount(
            csi::volume_capability::MountVolume { fs_type: fs_type.to_string(), mount_flags: vec![] },
        )),
        access_mode: Some(csi::volume_capability::AccessMode {
            mode: csi::volume_capability::access_mode::Mode::SingleNodeWriter as i32,
        }),
    }
}

async fn probe(server: &Arc<LvmCsiServer>) {
    let node = NodeService::new(server.clone());
    node.node_probe(Request::new(csi::NodeProbeRequest { version: Some(V) }))
        .await
        .expect("probe should succeed");
}

#[tokio::test]
async fn get_supported_versions_and_plugin_info() {
    let identity = IdentityService;
    let versions = identity
        .get_supported_versions(Request::new(csi::GetSupportedVersionsRequest {}))
        .await
        .unwrap();
    assert_eq!(versions.into_inner().supported_versions, vec![V]);

    let info = identity
        .get_plugin_info(Request::new(csi::GetPluginInfoRequest { version: Some(V) }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(info.name, "io.mesosphere.dcos.storage/csilvm");
    assert_eq!(info.vendor_version, "1.11.0");
}

#[tokio::test]
async fn get_plugin_info_rejects_bad_version() {
    let identity = IdentityService;

    let missing = identity
        .get_plugin_info(Request::new(csi::GetPluginInfoRequest { version: None }))
        .await;
    assert_eq!(missing.unwrap_err().code(), tonic::Code::InvalidArgument);

    let unsupported = identity
        .get_plugin_info(Request::new(csi::GetPluginInfoRequest {
            version: Some(csi::Version { major: 0, minor: 2, patch: 0 }),
        }))
        .await;
    assert_eq!(unsupported.unwrap_err().code(), tonic::Code::InvalidArgument);
}

#[tokio::test]
async fn node_probe_is_idempotent_against_matching_vg() {
    let (server, backend) = make_server("data", vec!["/dev/sdb"], false);
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sdb"], &[]);

    probe(&server).await;
    probe(&server).await;

    let state = server.state.lock().await;
    assert_eq!(state.volume_group.as_ref().unwrap().name(), "data");
}

#[tokio::test]
async fn node_probe_rejects_mismatched_physical_volumes() {
    let (server, backend) = make_server("data", vec!["/dev/sda", "/dev/sdc"], false);
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sda", "/dev/sdb"], &[]);

    let node = NodeService::new(server.clone());
    let result = node
        .node_probe(Request::new(csi::NodeProbeRequest { version: Some(V) }))
        .await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::FailedPrecondition);
}

#[tokio::test]
async fn node_probe_removes_vg_in_removing_mode() {
    let (server, backend) = make_server("data", vec!["/dev/sdb"], true);
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sdb"], &[]);

    probe(&server).await;

    let state = server.state.lock().await;
    assert!(state.volume_group.is_none());
}

#[tokio::test]
async fn create_volume_then_list_then_already_exists() {
    let (server, backend) = make_server("data", vec!["/dev/sdb"], false);
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sdb"], &[]);
    probe(&server).await;

    let controller = ControllerService::new(server.clone());

    let response = controller
        .create_volume(Request::new(csi::CreateVolumeRequest {
            version: Some(V),
            name: "v1".to_string(),
            capacity_range: Some(csi::CapacityRange { required_bytes: 1 << 30, limit_bytes: 0 }),
            volume_capabilities: vec![mount_cap("ext4")],
            parameters: Default::default(),
        }))
        .await
        .unwrap()
        .into_inner();
    let info = response.volume_info.unwrap();
    assert_eq!(info.id, "data_v1");
    assert!(info.capacity_bytes >= 1 << 30);

    let listed = controller
        .list_volumes(Request::new(csi::ListVolumesRequest { version: Some(V), max_entries: 0, starting_token: String::new() }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(listed.entries.len(), 1);
    assert_eq!(listed.entries[0].id, "data_v1");

    let again = controller
        .create_volume(Request::new(csi::CreateVolumeRequest {
            version: Some(V),
            name: "v1".to_string(),
            capacity_range: Some(csi::CapacityRange { required_bytes: 1 << 30, limit_bytes: 0 }),
            volume_capabilities: vec![mount_cap("ext4")],
            parameters: Default::default(),
        }))
        .await;
    assert_eq!(again.unwrap_err().code(), tonic::Code::AlreadyExists);
}

#[tokio::test]
async fn create_volume_without_capacity_range_consumes_all_free_space() {
    let config = ServerConfigBuilder::new()
        .vg_name("data")
        .pv_names(vec!["/dev/sdb".to_string()])
        .default_volume_size(u64::MAX)
        .supported_filesystem("", "ext4")
        .supported_filesystem("ext4", "ext4")
        .build()
        .unwrap();
    let backend = Arc::new(FakeBackend::new());
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sdb"], &[]);
    let device_tools = Arc::new(FakeDeviceTools::new());
    let server = Arc::new(LvmCsiServer::new(config, backend, device_tools));
    probe(&server).await;

    let controller = ControllerService::new(server.clone());
    let response = controller
        .create_volume(Request::new(csi::CreateVolumeRequest {
            version: Some(V),
            name: "v1".to_string(),
            capacity_range: None,
            volume_capabilities: vec![mount_cap("ext4")],
            parameters: Default::default(),
        }))
        .await
        .unwrap()
        .into_inner();
    let info = response.volume_info.unwrap();
    assert_eq!(info.capacity_bytes, 10 << 30);
}

#[tokio::test]
async fn create_volume_rejects_insufficient_capacity() {
    let (server, backend) = make_server("data", vec!["/dev/sdb"], false);
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sdb"], &[]);
    probe(&server).await;

    let controller = ControllerService::new(server.clone());
    let result = controller
        .create_volume(Request::new(csi::CreateVolumeRequest {
            version: Some(V),
            name: "huge".to_string(),
            capacity_range: Some(csi::CapacityRange { required_bytes: 1u64 << 40, limit_bytes: 0 }),
            volume_capabilities: vec![mount_cap("ext4")],
            parameters: Default::default(),
        }))
        .await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::OutOfRange);
}

#[tokio::test]
async fn create_volume_rejects_when_removing() {
    let (server, backend) = make_server("data", vec!["/dev/sdb"], true);
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sdb"], &[]);
    probe(&server).await;

    let controller = ControllerService::new(server.clone());
    let result = controller
        .create_volume(Request::new(csi::CreateVolumeRequest {
            version: Some(V),
            name: "v1".to_string(),
            capacity_range: None,
            volume_capabilities: vec![mount_cap("ext4")],
            parameters: Default::default(),
        }))
        .await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::FailedPrecondition);
}

#[tokio::test]
async fn get_capacity_reports_zero_for_unsupported_filesystem() {
    let (server, backend) = make_server("data", vec!["/dev/sdb"], false);
    backend.seed_vg("data", 10 << 30, 7 << 30, &["/dev/sdb"], &[]);
    probe(&server).await;

    let controller = ControllerService::new(server.clone());

    let normal = controller
        .get_capacity(Request::new(csi::GetCapacityRequest { version: Some(V), volume_capabilities: vec![], parameters: Default::default() }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(normal.available_capacity, 7 << 30);

    let unsupported = controller
        .get_capacity(Request::new(csi::GetCapacityRequest {
            version: Some(V),
            volume_capabilities: vec![mount_cap("zfs")],
            parameters: Default::default(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(unsupported.available_capacity, 0);
}

#[tokio::test]
async fn controller_get_capabilities_is_static() {
    let (server, _backend) = make_server("data", vec!["/dev/sdb"], false);
    let controller = ControllerService::new(server);
    let caps = controller
        .controller_get_capabilities(Request::new(csi::ControllerGetCapabilitiesRequest { version: Some(V) }))
        .await
        .unwrap()
        .into_inner()
        .capabilities;
    assert_eq!(caps.len(), 3);
}

#[tokio::test]
async fn controller_publish_is_unimplemented() {
    let (server, _backend) = make_server("data", vec!["/dev/sdb"], false);
    let controller = ControllerService::new(server);
    let result = controller
        .controller_publish_volume(Request::new(csi::ControllerPublishVolumeRequest {
            version: Some(V),
            volume_id: "data_v1".to_string(),
            node_id: String::new(),
            volume_capability: None,
            readonly: false,
        }))
        .await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::Unimplemented);
}

#[tokio::test]
async fn node_get_capabilities_and_id_are_static() {
    let (server, _backend) = make_server("data", vec!["/dev/sdb"], false);
    let node = NodeService::new(server);

    let caps = node
        .node_get_capabilities(Request::new(csi::NodeGetCapabilitiesRequest { version: Some(V) }))
        .await
        .unwrap()
        .into_inner();
    assert!(caps.capabilities.is_empty());

    let id = node
        .get_node_id(Request::new(csi::GetNodeIdRequest { version: Some(V) }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(id.node_id, "");
}

#[tokio::test]
async fn node_unpublish_volume_not_found_rejected() {
    let (server, backend) = make_server("data", vec!["/dev/sdb"], false);
    backend.seed_vg("data", 10 << 30, 10 << 30, &["/dev/sdb"], &[]);
    probe(&server).await;

    let node = NodeService::new(server.clone());
    let result = node
        .node_unpublish_volume(Request::new(csi::NodeUnpublishVolumeRequest {
            version: Some(V),
            volume_id: "data_nonexistent".to_string(),
            target_path: "/mnt/a".to_string(),
        }))
        .await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::NotFound);
}
