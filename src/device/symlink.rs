//! Resolves the `/dev/<vg>/<lv>` symlink LVM2 maintains down to the real
//! device-mapper node, since the kernel mount table reports the latter.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{DeviceError, Result};

pub fn resolve(path: &str) -> Result<PathBuf> {
    fs::canonicalize(Path::new(path))
        .map_err(|e| DeviceError::SymlinkResolution(path.to_string(), e))
}
