//! An in-memory [`LvmBackend`] used by tests so that volume-group/logical-volume
//! state can be injected deterministically, per the "external process invocation"
//! design note.

use std::collections::HashMap;
use std::sync::Mutex;

use super::backend::{LvInfo, LvmBackend, VgInfo};
use super::error::{LvmError, Result};

#[derive(Debug, Clone)]
struct FakeVg {
    bytes_total: u64,
    bytes_free: u64,
    pvs: Vec<String>,
    tags: Vec<String>,
    lvs: HashMap<String, u64>,
}

/// In-memory stand-in for real LVM2 tooling. Devices named in `pvs` are treated
/// as always present unless explicitly removed via [`FakeBackend::remove_device`].
pub struct FakeBackend {
    state: Mutex<HashMap<String, FakeVg>>,
    devices: Mutex<std::collections::HashSet<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            devices: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Pre-seed a volume group as if it had already been created, e.g. to test
    /// `NodeProbe` against a pre-existing VG.
    pub fn seed_vg(&self, name: &str, bytes_total: u64, bytes_free: u64, pvs: &[&str], tags: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.insert(
            name.to_string(),
            FakeVg {
                bytes_total,
                bytes_free,
                pvs: pvs.iter().map(|s| s.to_string()).collect(),
                tags: tags.iter().map(|s| s.to_string()).collect(),
                lvs: HashMap::new(),
            },
        );
        let mut devices = self.devices.lock().unwrap();
        for pv in pvs {
            devices.insert(pv.to_string());
        }
    }

    /// Marks a device as present (`stat`-able) without it being a registered PV.
    pub fn add_device(&self, device: &str) {
        self.devices.lock().unwrap().insert(device.to_string());
    }

    pub fn remove_device(&self, device: &str) {
        self.devices.lock().unwrap().remove(device);
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LvmBackend for FakeBackend {
    fn vg_find(&self, name: &str) -> Result<Option<VgInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state.get(name).map(|vg| VgInfo {
            name: name.to_string(),
            bytes_total: vg.bytes_total,
            bytes_free: vg.bytes_free,
        }))
    }

    fn vg_create(&self, name: &str, pvs: &[String], tags: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.insert(
            name.to_string(),
            FakeVg {
                bytes_total: 10 * 1024 * 1024 * 1024,
                bytes_free: 10 * 1024 * 1024 * 1024,
                pvs: pvs.to_vec(),
                tags: tags.to_vec(),
                lvs: HashMap::new(),
            },
        );
        Ok(())
    }

    fn vg_remove(&self, name: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| LvmError::VolumeGroupNotFound(name.to_string()))
    }

    fn vg_tags(&self, name: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        state
            .get(name)
            .map(|vg| vg.tags.clone())
            .ok_or_else(|| LvmError::VolumeGroupNotFound(name.to_string()))
    }

    fn vg_pv_names(&self, name: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        state
            .get(name)
            .map(|vg| vg.pvs.clone())
            .ok_or_else(|| LvmError::VolumeGroupNotFound(name.to_string()))
    }

    fn pv_exists(&self, device: &str) -> Result<bool> {
        Ok(self.devices.lock().unwrap().contains(device))
    }

    fn pv_create(&self, device: &str) -> Result<()> {
        self.devices.lock().unwrap().insert(device.to_string());
        Ok(())
    }

    fn lv_list_names(&self, vg: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        state
            .get(vg)
            .map(|v| v.lvs.keys().cloned().collect())
            .ok_or_else(|| LvmError::VolumeGroupNotFound(vg.to_string()))
    }

    fn lv_find(&self, vg: &str, name: &str) -> Result<Option<LvInfo>> {
        let state = self.state.lock().unwrap();
        let v = state
            .get(vg)
            .ok_or_else(|| LvmError::VolumeGroupNotFound(vg.to_string()))?;
        Ok(v.lvs.get(name).map(|&size_bytes| LvInfo {
            name: name.to_string(),
            path: format!("/dev/{vg}/{name}"),
            size_bytes,
        }))
    }

    fn lv_create(&self, vg: &str, name: &str, size_bytes: u64, _tags: &[String]) -> Result<LvInfo> {
        let mut state = self.state.lock().unwrap();
        let v = state
            .get_mut(vg)
            .ok_or_else(|| LvmError::VolumeGroupNotFound(vg.to_string()))?;
        if v.bytes_free < size_bytes {
            return Err(LvmError::NoSpace);
        }
        v.bytes_free -= size_bytes;
        v.lvs.insert(name.to_string(), size_bytes);
        Ok(LvInfo {
            name: name.to_string(),
            path: format!("/dev/{vg}/{name}"),
            size_bytes,
        })
    }

    fn lv_remove(&self, vg: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let v = state
            .get_mut(vg)
            .ok_or_else(|| LvmError::VolumeGroupNotFound(vg.to_string()))?;
        match v.lvs.remove(name) {
            Some(size) => {
                v.bytes_free += size;
                Ok(())
            }
            None => Err(LvmError::LogicalVolumeNotFound(name.to_string())),
        }
    }
}
