//! Device and filesystem primitives sitting below the LVM2 facade: mount-table
//! inspection, filesystem probing/formatting, scrubbing, and mount/unmount.

pub mod error;
pub mod mount;
pub mod mountinfo;
pub mod scrub;
pub mod symlink;
pub mod tools;

pub use error::{CommandError, DeviceError, Result};
pub use mount::{bind_mount, mount_filesystem, unmount};
pub use mountinfo::{get_mount_at, MountEntry};
pub use scrub::{scrub_device, zero_first_sector};
pub use symlink::resolve as resolve_symlink;
pub use tools::{CliDeviceTools, DeviceTools, FakeDeviceTools};
