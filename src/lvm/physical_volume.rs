//! Physical-volume lookup/create, used by `NodeProbe` when building the volume
//! group for the first time.

use std::sync::Arc;

use super::backend::LvmBackend;
use super::error::Result;

pub fn lookup_physical_volume(backend: &Arc<dyn LvmBackend>, device: &str) -> Result<bool> {
    backend.pv_exists(device)
}

pub fn create_physical_volume(backend: &Arc<dyn LvmBackend>, device: &str) -> Result<()> {
    backend.pv_create(device)
}
