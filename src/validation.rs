//! Pure, stateless request validators: one function per rule in the RPC
//! validation table, composed by the handlers in [`crate::controller`] and
//! [`crate::node`].

use crate::config::ServerConfig;
use crate::csi;
use crate::error::{CsiError, Result};

const SUPPORTED_VERSION: csi::Version = csi::Version {
    major: 0,
    minor: 1,
    patch: 0,
};

pub fn check_version(version: Option<&csi::Version>) -> Result<()> {
    let version = version.ok_or(CsiError::MissingVersion)?;
    if *version != SUPPORTED_VERSION {
        return Err(CsiError::UnsupportedVersion(version.clone()));
    }
    Ok(())
}

/// V-RemovingMode. Call from every handler except `GetSupportedVersions`,
/// `GetPluginInfo`, and `NodeProbe`.
pub fn check_not_removing(config: &ServerConfig) -> Result<()> {
    if config.removing_volume_group {
        return Err(CsiError::RemovingMode);
    }
    Ok(())
}

pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CsiError::MissingName);
    }
    Ok(())
}

pub fn check_volume_id(volume_id: &str) -> Result<()> {
    if volume_id.is_empty() {
        return Err(CsiError::MissingVolumeId);
    }
    Ok(())
}

pub fn check_target_path(target_path: &str) -> Result<()> {
    if target_path.is_empty() {
        return Err(CsiError::MissingTargetPath);
    }
    Ok(())
}

pub fn check_capacity_range(range: Option<&csi::CapacityRange>) -> Result<()> {
    let Some(range) = range else {
        return Ok(());
    };
    if range.required_bytes == 0 && range.limit_bytes == 0 {
        return Err(CsiError::CapacityRangeUnspecified);
    }
    if range.limit_bytes != 0 && range.limit_bytes < range.required_bytes {
        return Err(CsiError::CapacityRangeInvalidSize);
    }
    Ok(())
}

pub fn check_capabilities(config: &ServerConfig, caps: &[csi::VolumeCapability]) -> Result<()> {
    if caps.is_empty() {
        return Err(CsiError::MissingVolumeCapabilities);
    }
    caps.iter().try_for_each(|cap| check_capability(config, cap))
}

pub fn check_capability(config: &ServerConfig, cap: &csi::VolumeCapability) -> Result<()> {
    use csi::volume_capability::AccessType;

    let access_type = cap.access_type.as_ref().ok_or(CsiError::MissingAccessType)?;
    let access_mode = cap.access_mode.as_ref().ok_or(CsiError::MissingAccessMode)?;
    let mode = check_access_mode(access_mode)?;

    match access_type {
        AccessType::Block(_) => {
            if mode == csi::volume_capability::access_mode::Mode::SingleNodeReaderOnly {
                return Err(CsiError::BlockVolNoRo);
            }
        }
        AccessType::Mount(mount) => {
            if !mount.fs_type.is_empty() && !config.is_supported_filesystem(&mount.fs_type) {
                return Err(CsiError::UnsupportedFilesystem(mount.fs_type.clone()));
            }
        }
    }
    Ok(())
}

fn check_access_mode(
    access_mode: &csi::volume_capability::AccessMode,
) -> Result<csi::volume_capability::access_mode::Mode> {
    use csi::volume_capability::access_mode::Mode;

    let mode = Mode::try_from(access_mode.mode).map_err(|_| CsiError::InvalidAccessMode)?;
    match mode {
        Mode::Unknown => Err(CsiError::MissingAccessModeMode),
        Mode::MultiNodeReaderOnly | Mode::MultiNodeSingleWriter | Mode::MultiNodeMultiWriter => {
            Err(CsiError::UnsupportedAccessMode(access_mode.mode))
        }
        Mode::SingleNodeWriter | Mode::SingleNodeReaderOnly => Ok(mode),
    }
}

/// NodePublishVolume's single required capability, plus the publish-info
/// prohibition (the controller never produces any).
pub fn check_node_publish(
    config: &ServerConfig,
    target_path: &str,
    volume_capability: Option<&csi::VolumeCapability>,
    publish_volume_info: &std::collections::HashMap<String, String>,
) -> Result<&csi::VolumeCapability> {
    check_target_path(target_path)?;
    let cap = volume_capability.ok_or(CsiError::MissingVolumeCapability)?;
    if !publish_volume_info.is_empty() {
        return Err(CsiError::SpecifiedPublishVolumeInfo);
    }
    check_capability(config, cap)?;
    Ok(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> ServerConfig {
        crate::config::ServerConfigBuilder::new()
            .vg_name("data")
            .pv_names(vec!["/dev/sdb".to_string()])
            .supported_filesystem("", "ext4")
            .supported_filesystem("ext4", "ext4")
            .build()
            .unwrap()
    }

    fn mount_cap(fs_type: &str, mode: csi::volume_capability::access_mode::Mode) -> csi::VolumeCapability {
        csi::VolumeCapability {
            access_type: Some(csi::volume_capability::AccessType::Mount(
                csi::volume_capability::MountVolume {
                    fs_type: fs_type.to_string(),
                    mount_flags: vec![],
                },
            )),
            access_mode: Some(csi::volume_capability::AccessMode { mode: mode as i32 }),
        }
    }

    #[test]
    fn rejects_missing_version() {
        assert!(matches!(check_version(None), Err(CsiError::MissingVersion)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let v = csi::Version { major: 1, minor: 0, patch: 0 };
        assert!(matches!(check_version(Some(&v)), Err(CsiError::UnsupportedVersion(_))));
    }

    #[test]
    fn accepts_supported_version() {
        assert!(check_version(Some(&SUPPORTED_VERSION)).is_ok());
    }

    #[test]
    fn rejects_empty_capabilities() {
        assert!(matches!(
            check_capabilities(&config(), &[]),
            Err(CsiError::MissingVolumeCapabilities)
        ));
    }

    #[test]
    fn rejects_unknown_access_mode() {
        let cap = mount_cap("ext4", csi::volume_capability::access_mode::Mode::Unknown);
        assert!(matches!(
            check_capability(&config(), &cap),
            Err(CsiError::MissingAccessModeMode)
        ));
    }

    #[test]
    fn rejects_multi_node_access_modes() {
        let cap = mount_cap("ext4", csi::volume_capability::access_mode::Mode::MultiNodeMultiWriter);
        assert!(matches!(
            check_capability(&config(), &cap),
            Err(CsiError::UnsupportedAccessMode(_))
        ));
    }

    #[test]
    fn rejects_block_readonly() {
        let cap = csi::VolumeCapability {
            access_type: Some(csi::volume_capability::AccessType::Block(
                csi::volume_capability::BlockVolume {},
            )),
            access_mode: Some(csi::volume_capability::AccessMode {
                mode: csi::volume_capability::access_mode::Mode::SingleNodeReaderOnly as i32,
            }),
        };
        assert!(matches!(check_capability(&config(), &cap), Err(CsiError::BlockVolNoRo)));
    }

    #[test]
    fn rejects_unsupported_filesystem() {
        let cap = mount_cap("zfs", csi::volume_capability::access_mode::Mode::SingleNodeWriter);
        assert!(matches!(
            check_capability(&config(), &cap),
            Err(CsiError::UnsupportedFilesystem(_))
        ));
    }

    #[test]
    fn rejects_capacity_range_unspecified() {
        let range = csi::CapacityRange { required_bytes: 0, limit_bytes: 0 };
        assert!(matches!(
            check_capacity_range(Some(&range)),
            Err(CsiError::CapacityRangeUnspecified)
        ));
    }

    #[test]
    fn rejects_capacity_range_invalid_size() {
        let range = csi::CapacityRange { required_bytes: 100, limit_bytes: 10 };
        assert!(matches!(
            check_capacity_range(Some(&range)),
            Err(CsiError::CapacityRangeInvalidSize)
        ));
    }

    #[test]
    fn rejects_publish_info_on_node_publish() {
        let cap = mount_cap("ext4", csi::volume_capability::access_mode::Mode::SingleNodeWriter);
        let mut info = HashMap::new();
        info.insert("foo".to_string(), "bar".to_string());
        assert!(matches!(
            check_node_publish(&config(), "/mnt/a", Some(&cap), &info),
            Err(CsiError::SpecifiedPublishVolumeInfo)
        ));
    }
}
