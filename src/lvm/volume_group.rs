//! Handle to an opened volume group, scoped to the server's lifetime.

use std::sync::Arc;

use super::backend::LvmBackend;
use super::error::Result;
use super::logical_volume::LogicalVolume;

/// The server's exclusive handle to its managed volume group. Installed and torn
/// down only by `NodeProbe`; every other handler only reads through it.
#[derive(Clone)]
pub struct VolumeGroup {
    name: String,
    backend: Arc<dyn LvmBackend>,
}

impl VolumeGroup {
    pub(super) fn new(name: String, backend: Arc<dyn LvmBackend>) -> Self {
        Self { name, backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> Result<Vec<String>> {
        self.backend.vg_tags(&self.name)
    }

    pub fn list_physical_volume_names(&self) -> Result<Vec<String>> {
        self.backend.vg_pv_names(&self.name)
    }

    pub fn list_logical_volume_names(&self) -> Result<Vec<String>> {
        self.backend.lv_list_names(&self.name)
    }

    pub fn lookup_logical_volume(&self, name: &str) -> Result<Option<LogicalVolume>> {
        Ok(self
            .backend
            .lv_find(&self.name, name)?
            .map(|info| LogicalVolume::new(self.name.clone(), info, self.backend.clone())))
    }

    pub fn create_logical_volume(
        &self,
        name: &str,
        size_bytes: u64,
        tags: &[String],
    ) -> Result<LogicalVolume> {
        let info = self.backend.lv_create(&self.name, name, size_bytes, tags)?;
        Ok(LogicalVolume::new(self.name.clone(), info, self.backend.clone()))
    }

    /// Always computed against the linear volume layout: this plugin never
    /// creates striped or mirrored logical volumes, so no other layout applies.
    pub fn bytes_total(&self) -> Result<u64> {
        Ok(self
            .backend
            .vg_find(&self.name)?
            .map(|vg| vg.bytes_total)
            .unwrap_or(0))
    }

    pub fn bytes_free(&self) -> Result<u64> {
        Ok(self
            .backend
            .vg_find(&self.name)?
            .map(|vg| vg.bytes_free)
            .unwrap_or(0))
    }

    pub fn remove(&self) -> Result<()> {
        self.backend.vg_remove(&self.name)
    }
}

impl std::fmt::Debug for VolumeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeGroup").field("name", &self.name).finish()
    }
}

/// Looks up an existing volume group by name.
pub fn lookup_volume_group(backend: Arc<dyn LvmBackend>, name: &str) -> Result<Option<VolumeGroup>> {
    Ok(backend
        .vg_find(name)?
        .map(|_| VolumeGroup::new(name.to_string(), backend.clone())))
}

/// Creates a new volume group out of the given physical volumes.
pub fn create_volume_group(
    backend: Arc<dyn LvmBackend>,
    name: &str,
    pvs: &[String],
    tags: &[String],
) -> Result<VolumeGroup> {
    backend.vg_create(name, pvs, tags)?;
    Ok(VolumeGroup::new(name.to_string(), backend))
}
