//! The LVM2 facade: a narrow interface over volume groups, physical volumes,
//! logical volumes, and tags.

pub mod backend;
pub mod error;
pub mod fake;
pub mod logical_volume;
pub mod physical_volume;
pub mod tag;
pub mod volume_group;

pub use backend::{Lvm2Backend, LvmBackend};
pub use logical_volume::LogicalVolume;
pub use physical_volume::{create_physical_volume, lookup_physical_volume};
pub use tag::{validate_tag, validate_tags};
pub use volume_group::{create_volume_group, lookup_volume_group, VolumeGroup};
