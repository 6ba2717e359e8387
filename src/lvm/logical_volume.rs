//! A short-lived handle to a single logical volume, scoped to one RPC.

use std::sync::Arc;

use super::backend::{LvInfo, LvmBackend};
use super::error::Result;

#[derive(Clone)]
pub struct LogicalVolume {
    vg_name: String,
    info: LvInfo,
    backend: Arc<dyn LvmBackend>,
}

impl LogicalVolume {
    pub(super) fn new(vg_name: String, info: LvInfo, backend: Arc<dyn LvmBackend>) -> Self {
        Self { vg_name, info, backend }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.info.size_bytes
    }

    pub fn path(&self) -> &str {
        &self.info.path
    }

    pub fn remove(&self) -> Result<()> {
        self.backend.lv_remove(&self.vg_name, &self.info.name)
    }
}

impl std::fmt::Debug for LogicalVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalVolume")
            .field("vg_name", &self.vg_name)
            .field("info", &self.info)
            .finish()
    }
}
