//! Error type for the LVM2 facade, modeled after the sentinel errors LVM2 tooling exposes.

use tonic::Code;

pub type Result<T> = std::result::Result<T, LvmError>;

#[derive(Debug, thiserror::Error)]
pub enum LvmError {
    #[error("volume group not found: {0}")]
    VolumeGroupNotFound(String),

    #[error("logical volume not found: {0}")]
    LogicalVolumeNotFound(String),

    #[error("physical volume not found: {0}")]
    PhysicalVolumeNotFound(String),

    #[error("not enough free space in volume group")]
    NoSpace,

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("lvm command `{cmd}` failed: {stderr}")]
    CommandFailed { cmd: String, stderr: String },

    #[error("failed to parse lvm output: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LvmError {
    /// Classifies an invalid-name failure, per the facade contract's `IsInvalidName` classifier.
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, LvmError::InvalidName(_))
    }

    pub fn code(&self) -> Code {
        match self {
            LvmError::VolumeGroupNotFound(_) | LvmError::LogicalVolumeNotFound(_) => {
                Code::NotFound
            }
            LvmError::PhysicalVolumeNotFound(_) => Code::FailedPrecondition,
            LvmError::NoSpace => Code::OutOfRange,
            LvmError::InvalidName(_) | LvmError::InvalidTag(_) => Code::InvalidArgument,
            LvmError::CommandFailed { .. } | LvmError::Parse(_) | LvmError::Io(_) => Code::Internal,
        }
    }
}
