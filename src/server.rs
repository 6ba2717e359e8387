//! The shared server value the RPC handlers are methods on.
//!
//! All LVM mutations and metrics queries are serialized behind a single
//! coarse lock, per the concurrency model: LVM tooling exhibits latent
//! contention when invoked concurrently, so the lifecycle engine never lets
//! two collaborator calls race. Readonly, stateless RPCs never touch it.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::device::DeviceTools;
use crate::lvm::{LvmBackend, VolumeGroup};

/// Guarded by the coarse lock: the handle may be absent (pre-probe, or after
/// a destructive `NodeProbe` in removing mode).
pub struct ServerState {
    pub volume_group: Option<VolumeGroup>,
}

pub struct LvmCsiServer {
    pub config: ServerConfig,
    pub backend: Arc<dyn LvmBackend>,
    pub device_tools: Arc<dyn DeviceTools>,
    pub state: Mutex<ServerState>,
}

impl LvmCsiServer {
    pub fn new(config: ServerConfig, backend: Arc<dyn LvmBackend>, device_tools: Arc<dyn DeviceTools>) -> Self {
        Self {
            config,
            backend,
            device_tools,
            state: Mutex::new(ServerState { volume_group: None }),
        }
    }
}
