//! Reads the kernel mount table from `/proc/self/mountinfo`, keyed by target path.
//!
//! The `mountinfo` format (see proc(5)) is richer than `/proc/mounts`: it carries
//! the mount's `root` field, which `NodePublishVolume`'s block-device comparison
//! needs.

use std::fs;

use super::error::{DeviceError, Result};

/// One row of the kernel mount table, as needed by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mountsource: String,
    pub fstype: String,
    pub root: String,
    pub is_readonly: bool,
}

fn parse_line(line: &str) -> Result<(String, MountEntry)> {
    // <id> <parent> <major:minor> <root> <mount point> <options> <opt fields...> - <fstype> <source> <super options>
    let dash_pos = line
        .split_whitespace()
        .position(|f| f == "-")
        .ok_or_else(|| DeviceError::MountInfoParse(format!("missing separator in: {line}")))?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if dash_pos < 5 || fields.len() < dash_pos + 3 {
        return Err(DeviceError::MountInfoParse(format!(
            "unexpected field count in: {line}"
        )));
    }

    let root = fields[3].to_string();
    let mount_point = fields[4].to_string();
    let options = fields[5];
    let fstype = fields[dash_pos + 1].to_string();
    let mountsource = fields[dash_pos + 2].to_string();
    let is_readonly = options.split(',').any(|o| o == "ro");

    Ok((
        mount_point,
        MountEntry {
            mountsource,
            fstype,
            root,
            is_readonly,
        },
    ))
}

/// Reads the whole table and returns the entry mounted at `target_path`, if any.
pub fn get_mount_at(target_path: &str) -> Result<Option<MountEntry>> {
    let contents = fs::read_to_string("/proc/self/mountinfo")?;
    get_mount_at_str(&contents, target_path)
}

fn get_mount_at_str(contents: &str, target_path: &str) -> Result<Option<MountEntry>> {
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (mount_point, entry) = parse_line(line)?;
        if mount_point == target_path {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
36 35 98:0 / /mnt/a rw,noatime master:1 - ext4 /dev/mapper/vg-lv rw,errors=continue
37 35 98:1 / /mnt/b ro,relatime master:1 - xfs /dev/mapper/vg-lv2 ro
";

    #[test]
    fn finds_matching_mount() {
        let entry = get_mount_at_str(SAMPLE, "/mnt/a").unwrap().unwrap();
        assert_eq!(entry.fstype, "ext4");
        assert_eq!(entry.mountsource, "/dev/mapper/vg-lv");
        assert_eq!(entry.root, "/");
        assert!(!entry.is_readonly);
    }

    #[test]
    fn detects_readonly() {
        let entry = get_mount_at_str(SAMPLE, "/mnt/b").unwrap().unwrap();
        assert!(entry.is_readonly);
    }

    #[test]
    fn absent_mount_is_none() {
        assert!(get_mount_at_str(SAMPLE, "/mnt/nowhere").unwrap().is_none());
    }
}
