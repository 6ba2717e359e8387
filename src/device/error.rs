//! Error type for the device & mount primitives.

pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to resolve device symlink {0}: {1}")]
    SymlinkResolution(String, std::io::Error),

    #[error("failed to parse lsblk output: {0}")]
    FsTypeParse(String),

    #[error("mkfs -t {fstype} {device} failed: {output}")]
    FormatFailed {
        fstype: String,
        device: String,
        output: String,
    },

    #[error("mount syscall failed: {0}")]
    MountErrno(nix::Error),

    #[error("unmount syscall failed: {0}")]
    UnmountErrno(nix::Error),

    #[error("failed to parse /proc/self/mountinfo: {0}")]
    MountInfoParse(String),

    #[error("device scrub aborted: write returned neither success nor ENOSPC: {0}")]
    ScrubContractViolation(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// A non-errno external-tool invocation failure (`lsblk`, `mkfs`), as opposed to
/// a syscall errno, which callers must distinguish for CSI status mapping.
#[derive(Debug, thiserror::Error)]
#[error("`{cmd}` failed: {stderr}")]
pub struct CommandError {
    pub cmd: String,
    pub stderr: String,
}

impl DeviceError {
    /// True if this is an errno-typed syscall failure from `mount(2)`/`umount(2)`,
    /// which the lifecycle engine maps to `FailedPrecondition` rather than `Internal`.
    pub fn is_errno(&self) -> bool {
        matches!(self, DeviceError::MountErrno(_) | DeviceError::UnmountErrno(_))
    }
}
