//! `lsblk`/`mkfs` invocation, factored behind a trait so tests can inject
//! deterministic device/filesystem state instead of shelling out.

use std::process::Command;
use std::sync::Mutex;

use tracing::{debug, instrument};

use super::error::{CommandError, DeviceError, Result};

pub trait DeviceTools: Send + Sync {
    /// Returns the empty string if the device carries no filesystem.
    fn probe_fstype(&self, device: &str) -> Result<String>;
    fn format(&self, device: &str, fstype: &str) -> Result<()>;
}

/// Real tooling: `lsblk -P -o FSTYPE <device>` and `mkfs -t <fstype> <device>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliDeviceTools;

impl DeviceTools for CliDeviceTools {
    #[instrument(skip(self))]
    fn probe_fstype(&self, device: &str) -> Result<String> {
        let output = Command::new("lsblk")
            .args(["-P", "-o", "FSTYPE", device])
            .output()?;
        if !output.status.success() {
            return Err(DeviceError::Command(CommandError {
                cmd: format!("lsblk -P -o FSTYPE {device}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_lsblk_fstype(&stdout)
    }

    #[instrument(skip(self))]
    fn format(&self, device: &str, fstype: &str) -> Result<()> {
        let output = Command::new("mkfs").args(["-t", fstype, device]).output()?;
        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(DeviceError::FormatFailed {
                fstype: fstype.to_string(),
                device: device.to_string(),
                output: combined,
            });
        }
        Ok(())
    }
}

/// Parses `lsblk -P -o FSTYPE`'s output: exactly two lines, the second empty,
/// the first matching `FSTYPE="<value>"` verbatim. Any deviation is a parse error.
fn parse_lsblk_fstype(stdout: &str) -> Result<String> {
    let lines: Vec<&str> = stdout.split('\n').collect();
    if lines.len() != 2 || !lines[1].is_empty() {
        return Err(DeviceError::FsTypeParse(format!(
            "expected exactly two lines with an empty second line, got: {stdout:?}"
        )));
    }
    let line = lines[0];
    let value = line
        .strip_prefix("FSTYPE=\"")
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| {
            DeviceError::FsTypeParse(format!("expected FSTYPE=\"<value>\", got: {line:?}"))
        })?;
    Ok(value.to_string())
}

/// In-memory device-tools double for tests.
#[derive(Default)]
pub struct FakeDeviceTools {
    fstypes: Mutex<std::collections::HashMap<String, String>>,
}

impl FakeDeviceTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fstype(&self, device: &str, fstype: &str) {
        self.fstypes
            .lock()
            .unwrap()
            .insert(device.to_string(), fstype.to_string());
    }
}

impl DeviceTools for FakeDeviceTools {
    fn probe_fstype(&self, device: &str) -> Result<String> {
        Ok(self
            .fstypes
            .lock()
            .unwrap()
            .get(device)
            .cloned()
            .unwrap_or_default())
    }

    fn format(&self, device: &str, fstype: &str) -> Result<()> {
        debug!(device, fstype, "fake format");
        self.set_fstype(device, fstype);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_output() {
        assert_eq!(parse_lsblk_fstype("FSTYPE=\"ext4\"\n").unwrap(), "ext4");
    }

    #[test]
    fn empty_fstype_means_unformatted() {
        assert_eq!(parse_lsblk_fstype("FSTYPE=\"\"\n").unwrap(), "");
    }

    #[test]
    fn rejects_malformed_output() {
        assert!(parse_lsblk_fstype("garbage").is_err());
        assert!(parse_lsblk_fstype("FSTYPE=\"ext4\"\nextra\n").is_err());
        assert!(parse_lsblk_fstype("FSTYPE=ext4\n").is_err());
    }
}
