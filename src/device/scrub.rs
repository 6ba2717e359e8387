//! Device scrubbing: overwrite a logical volume's blocks with zeroes before
//! the volume group gives its extents back to another logical volume.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;

use tracing::{info, instrument};

use super::error::{DeviceError, Result};

const ZERO_CHUNK: usize = 1024 * 1024;
const O_DIRECT: i32 = 0o0_040_000;
const FIRST_SECTOR_BYTES: usize = 512;

/// Streams zero bytes to `device` until the kernel returns `ENOSPC`, which is
/// the only expected termination condition: a logical volume's device node
/// has no other way to signal "you've reached the end". An ordinary I/O
/// error is returned as a recoverable [`DeviceError`]; a clean EOF with no
/// ENOSPC means the device silently ignored writes past its end, which this
/// plugin cannot safely continue from, so it aborts the process instead of
/// reporting a deletion that may not have actually scrubbed the volume.
#[instrument(skip(device))]
pub fn scrub_device(device: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .custom_flags(O_DIRECT)
        .open(device)
        .or_else(|_| OpenOptions::new().write(true).open(device))?;

    let zeroes = vec![0u8; ZERO_CHUNK];
    let mut bytes_written: u64 = 0;
    loop {
        match file.write(&zeroes) {
            Ok(0) => {
                eprintln!(
                    "csilvm: scrub of {device} returned a clean EOF without ENOSPC after \
                     {bytes_written} bytes written; this device does not honor the contract \
                     this plugin relies on to know a volume's blocks were fully overwritten"
                );
                std::process::abort();
            }
            Ok(n) => bytes_written += n as u64,
            Err(e) if e.raw_os_error() == Some(nix::libc::ENOSPC) => {
                info!(bytes_written, device, "scrub complete");
                return Ok(());
            }
            Err(e) => return Err(DeviceError::ScrubContractViolation(e)),
        }
    }
}

/// Zeroes a device's leading sector, used by `NodeProbe` before `pvcreate` so a
/// stale partition table or filesystem signature can't confuse LVM2 tooling.
#[instrument]
pub fn zero_first_sector(device: &str) -> Result<()> {
    let mut file = OpenOptions::new().write(true).open(device)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&[0u8; FIRST_SECTOR_BYTES])?;
    Ok(())
}
