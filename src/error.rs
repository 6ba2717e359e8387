//! The closed error taxonomy for the plugin, and its mapping onto CSI status codes.

use tonic::{Code, Status};

use crate::device::DeviceError;
use crate::lvm::error::LvmError;

pub type Result<T> = std::result::Result<T, CsiError>;

/// Every error the lifecycle engine or a validator can produce, tagged with the
/// CSI status code it must surface as.
#[derive(Debug, thiserror::Error)]
pub enum CsiError {
    #[error("a required version field was not provided")]
    MissingVersion,

    #[error("unsupported version: {0:?}")]
    UnsupportedVersion(crate::csi::Version),

    #[error("csilvm: plugin is running in 'remove volume group' mode")]
    RemovingMode,

    #[error("volume name not provided")]
    MissingName,

    #[error("volume id not provided")]
    MissingVolumeId,

    #[error("volume capabilities not provided")]
    MissingVolumeCapabilities,

    #[error("access type not provided")]
    MissingAccessType,

    #[error("access mode not provided")]
    MissingAccessMode,

    #[error("access mode's mode not provided")]
    MissingAccessModeMode,

    #[error("access mode value outside the known enum range")]
    InvalidAccessMode,

    #[error("unsupported access mode: {0:?}")]
    UnsupportedAccessMode(i32),

    #[error("block volumes do not support SINGLE_NODE_READER_ONLY")]
    BlockVolNoRo,

    #[error("limit_bytes is less than required_bytes")]
    CapacityRangeInvalidSize,

    #[error("neither required_bytes nor limit_bytes was specified")]
    CapacityRangeUnspecified,

    #[error("target_path not provided")]
    MissingTargetPath,

    #[error("volume_capability not provided")]
    MissingVolumeCapability,

    #[error("publish_volume_info was specified but this controller never produces any")]
    SpecifiedPublishVolumeInfo,

    #[error("unsupported filesystem: {0}")]
    UnsupportedFilesystem(String),

    #[error("volume not found: {0}")]
    VolumeNotFound(String),

    #[error("not enough free space")]
    NotEnoughFreeSpace,

    #[error("target path not empty")]
    TargetPathNotEmpty,

    #[error("mismatched fs_type: {0}")]
    MismatchedFsType(String),

    #[error("target path is mounted read-only")]
    TargetPathRo,

    #[error("target path is mounted read-write")]
    TargetPathRw,

    #[error("operation is not implemented")]
    Unimplemented,

    #[error("missing physical volume device: {0}")]
    MissingPhysicalVolume(String),

    #[error("volume group does not match configuration: {0}")]
    VolumeGroupMismatch(String),

    #[error("volume group not yet probed")]
    VolumeGroupNotProbed,

    #[error("configured tag failed local validation: {0}")]
    TagValidationFailed(String),

    #[error(transparent)]
    Lvm(#[from] LvmError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CsiError {
    pub fn code(&self) -> Code {
        match self {
            CsiError::MissingVersion
            | CsiError::UnsupportedVersion(_)
            | CsiError::MissingName
            | CsiError::MissingVolumeId
            | CsiError::MissingVolumeCapabilities
            | CsiError::MissingAccessType
            | CsiError::MissingAccessMode
            | CsiError::MissingAccessModeMode
            | CsiError::InvalidAccessMode
            | CsiError::UnsupportedAccessMode(_)
            | CsiError::BlockVolNoRo
            | CsiError::CapacityRangeInvalidSize
            | CsiError::CapacityRangeUnspecified
            | CsiError::MissingTargetPath
            | CsiError::MissingVolumeCapability
            | CsiError::SpecifiedPublishVolumeInfo
            | CsiError::UnsupportedFilesystem(_)
            | CsiError::TargetPathNotEmpty
            | CsiError::MismatchedFsType(_)
            | CsiError::TargetPathRo
            | CsiError::TargetPathRw => Code::InvalidArgument,

            CsiError::RemovingMode
            | CsiError::MissingPhysicalVolume(_)
            | CsiError::VolumeGroupMismatch(_)
            | CsiError::VolumeGroupNotProbed
            | CsiError::TagValidationFailed(_) => Code::FailedPrecondition,

            CsiError::VolumeNotFound(_) => Code::NotFound,
            CsiError::NotEnoughFreeSpace => Code::OutOfRange,
            CsiError::Unimplemented => Code::Unimplemented,

            CsiError::Lvm(e) => e.code(),
            CsiError::Device(e) if e.is_errno() => Code::FailedPrecondition,
            CsiError::Device(_) | CsiError::Internal(_) => Code::Internal,
        }
    }
}

impl From<CsiError> for Status {
    fn from(err: CsiError) -> Self {
        Status::new(err.code(), err.to_string())
    }
}

/// Lets handlers propagate facade errors with a bare `?` straight into a
/// `Status`, without an intermediate `.map_err(CsiError::from)`.
impl From<LvmError> for Status {
    fn from(err: LvmError) -> Self {
        CsiError::from(err).into()
    }
}

impl From<DeviceError> for Status {
    fn from(err: DeviceError) -> Self {
        CsiError::from(err).into()
    }
}
