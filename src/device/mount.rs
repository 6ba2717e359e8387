//! Mount-table mutation via direct `mount(2)`/`umount(2)` syscalls.
//!
//! The kernel refuses to apply `MS_RDONLY` together with `MS_BIND` in a
//! single call, so a read-only bind mount is a plain bind mount followed by
//! a remount that adds `MS_RDONLY`.

use std::path::Path;

use nix::mount::{mount as nix_mount, umount as nix_umount, MsFlags};
use tracing::{info, instrument};

use super::error::{DeviceError, Result};

#[instrument]
pub fn mount_filesystem(
    device: &str,
    target_path: &str,
    fstype: &str,
    readonly: bool,
    mount_options: &str,
) -> Result<()> {
    let mut flags = MsFlags::empty();
    if readonly {
        flags.insert(MsFlags::MS_RDONLY);
    }
    let data = if mount_options.is_empty() { None } else { Some(mount_options) };
    nix_mount(Some(Path::new(device)), Path::new(target_path), Some(fstype), flags, data)
        .map_err(DeviceError::MountErrno)?;
    info!(device, target_path, fstype, readonly, "mounted filesystem");
    Ok(())
}

#[instrument]
pub fn bind_mount(device: &str, target_path: &str, readonly: bool) -> Result<()> {
    nix_mount(
        Some(Path::new(device)),
        Path::new(target_path),
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    )
    .map_err(DeviceError::MountErrno)?;

    if readonly {
        nix_mount(
            Some(Path::new(device)),
            Path::new(target_path),
            None::<&str>,
            MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY,
            None::<&str>,
        )
        .map_err(DeviceError::MountErrno)?;
    }

    info!(device, target_path, readonly, "bind-mounted block device");
    Ok(())
}

#[instrument]
pub fn unmount(target_path: &str) -> Result<()> {
    nix_umount(Path::new(target_path)).map_err(DeviceError::UnmountErrno)?;
    info!(target_path, "unmounted");
    Ok(())
}
