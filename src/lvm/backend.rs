//! The facade's dependency on actual LVM2 tooling, factored behind a trait.
//!
//! [`Lvm2Backend`] reads volume-group capacity and manages logical volumes
//! through the `lvm2_cmd` crate, the same library `volumed` in the reference
//! CSI stack uses for this concern; it shells out directly to `vgs`/`vgcreate`/
//! `vgremove`/`pvs`/`pvcreate` for volume-group and physical-volume lifecycle,
//! which that stack's daemon never performs itself (it only ever manages a
//! volume group created out of band). Tests use [`super::fake::FakeBackend`]
//! instead, so that volume-group/logical-volume/physical-volume state can be
//! injected deterministically.

use std::process::Command;

use lvm2_cmd::error::LVMError;
use lvm2_cmd::lv::{LVCreateOptions, LogicalVolume as Lvm2LogicalVolume};
use lvm2_cmd::vg::VolumeGroup as Lvm2VolumeGroup;
use tracing::{debug, instrument};

use super::error::{LvmError, Result};

/// Snapshot of a volume group's capacity.
#[derive(Debug, Clone)]
pub struct VgInfo {
    pub name: String,
    pub bytes_total: u64,
    pub bytes_free: u64,
}

/// Snapshot of a logical volume.
#[derive(Debug, Clone)]
pub struct LvInfo {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
}

/// The narrow surface the lifecycle engine needs from LVM2. Implemented once for
/// real tooling ([`Lvm2Backend`]) and once in memory for tests.
pub trait LvmBackend: Send + Sync {
    fn vg_find(&self, name: &str) -> Result<Option<VgInfo>>;
    fn vg_create(&self, name: &str, pvs: &[String], tags: &[String]) -> Result<()>;
    fn vg_remove(&self, name: &str) -> Result<()>;
    fn vg_tags(&self, name: &str) -> Result<Vec<String>>;
    fn vg_pv_names(&self, name: &str) -> Result<Vec<String>>;

    fn pv_exists(&self, device: &str) -> Result<bool>;
    fn pv_create(&self, device: &str) -> Result<()>;

    fn lv_list_names(&self, vg: &str) -> Result<Vec<String>>;
    fn lv_find(&self, vg: &str, name: &str) -> Result<Option<LvInfo>>;
    fn lv_create(&self, vg: &str, name: &str, size_bytes: u64, tags: &[String]) -> Result<LvInfo>;
    fn lv_remove(&self, vg: &str, name: &str) -> Result<()>;
}

/// Real LVM2 tooling: `lvm2_cmd` for volume-group capacity and logical-volume
/// CRUD, raw CLI invocations for everything that library's own reference
/// daemon never does itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lvm2Backend;

fn resource_name(raw: &str) -> Result<lvm2_cmd::ResourceName> {
    raw.to_string()
        .try_into()
        .map_err(|e: lvm2_cmd::InvalidResourceNameError| LvmError::InvalidName(e.to_string()))
}

fn resource_capacity(size_bytes: u64) -> Result<lvm2_cmd::ResourceCapacity> {
    (size_bytes as usize)
        .try_into()
        .map_err(|e: lvm2_cmd::InvalidResourceCapacityError| LvmError::Parse(e.to_string()))
}

/// What kind of resource a `map_lvm2_cmd_error` call is looking up, so a
/// `LVMError::NotFound` can be classified precisely instead of collapsing
/// volume-group and logical-volume misses into the same variant.
#[derive(Clone, Copy)]
enum Lookup<'a> {
    VolumeGroup(&'a str),
    LogicalVolume(&'a str),
}

/// Maps an `lvm2_cmd` failure onto our own taxonomy. `context` names the
/// operation being attempted, for the `CommandFailed`/`Parse` fallback arms.
fn map_lvm2_cmd_error(lookup: Lookup<'_>, context: &str, err: LVMError) -> LvmError {
    match err {
        LVMError::NotFound { .. } => match lookup {
            Lookup::VolumeGroup(name) => LvmError::VolumeGroupNotFound(name.to_string()),
            Lookup::LogicalVolume(name) => LvmError::LogicalVolumeNotFound(name.to_string()),
        },
        LVMError::Command { .. } => LvmError::CommandFailed {
            cmd: context.to_string(),
            stderr: err.to_string(),
        },
        other => LvmError::CommandFailed {
            cmd: context.to_string(),
            stderr: other.to_string(),
        },
    }
}

fn lv_info(lv: Lvm2LogicalVolume) -> Result<LvInfo> {
    let size_bytes = (*lv.capacity_bytes)
        .try_into()
        .map_err(|_| LvmError::Parse(format!("lv capacity out of range for u64: {}", lv.capacity_bytes)))?;
    Ok(LvInfo {
        name: lv.name.to_string(),
        path: lv.path.to_string_lossy().into_owned(),
        size_bytes,
    })
}

impl LvmBackend for Lvm2Backend {
    #[instrument(skip(self))]
    fn vg_find(&self, name: &str) -> Result<Option<VgInfo>> {
        let resource = resource_name(name)?;
        let vg = match Lvm2VolumeGroup::from_id(&resource) {
            Ok(vg) => vg,
            Err(LVMError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(map_lvm2_cmd_error(Lookup::VolumeGroup(name), "vg lookup", e)),
        };
        let bytes_total: u64 = (*vg.capacity_bytes)
            .try_into()
            .map_err(|_| LvmError::Parse(format!("vg capacity out of range for u64: {}", vg.capacity_bytes)))?;
        let allocated: u64 = vg
            .list_lvs()
            .map_err(|e| map_lvm2_cmd_error(Lookup::VolumeGroup(name), "vg lv list", e))?
            .into_iter()
            .map(|lv| lv_info(lv).map(|info| info.size_bytes))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .sum();
        Ok(Some(VgInfo {
            name: vg.name.to_string(),
            bytes_total,
            bytes_free: bytes_total.saturating_sub(allocated),
        }))
    }

    #[instrument(skip(self))]
    fn vg_create(&self, name: &str, pvs: &[String], tags: &[String]) -> Result<()> {
        let mut args = vec!["vgcreate".to_string(), name.to_string()];
        args.extend(pvs.iter().cloned());
        for tag in tags {
            args.push("--addtag".to_string());
            args.push(tag.clone());
        }
        let args_ref: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
        run("vgcreate", &args_ref)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn vg_remove(&self, name: &str) -> Result<()> {
        run("vgremove", &["-f", name])?;
        Ok(())
    }

    fn vg_tags(&self, name: &str) -> Result<Vec<String>> {
        let out = run("vgs", &["--noheadings", "-o", "vg_tags", name])?;
        Ok(out
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn vg_pv_names(&self, name: &str) -> Result<Vec<String>> {
        let out = run("vgs", &["--noheadings", "-o", "pv_name", "--separator", ",", name])?;
        Ok(out
            .lines()
            .flat_map(|l| l.trim().split(','))
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn pv_exists(&self, device: &str) -> Result<bool> {
        let out = Command::new("pvs")
            .args(["--noheadings", "-o", "pv_name", device])
            .output()?;
        Ok(out.status.success())
    }

    #[instrument(skip(self))]
    fn pv_create(&self, device: &str) -> Result<()> {
        run("pvcreate", &["-f", device])?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn lv_list_names(&self, vg: &str) -> Result<Vec<String>> {
        let vg_resource = resource_name(vg)?;
        let handle = Lvm2VolumeGroup::from_id(&vg_resource)
            .map_err(|e| map_lvm2_cmd_error(Lookup::VolumeGroup(vg), "vg lookup", e))?;
        Ok(handle
            .list_lvs()
            .map_err(|e| map_lvm2_cmd_error(Lookup::VolumeGroup(vg), "lv list", e))?
            .into_iter()
            .map(|lv| lv.name.to_string())
            .collect())
    }

    #[instrument(skip(self))]
    fn lv_find(&self, vg: &str, name: &str) -> Result<Option<LvInfo>> {
        let vg_resource = resource_name(vg)?;
        let lv_resource = resource_name(name)?;
        match Lvm2LogicalVolume::from_id(&vg_resource, &lv_resource) {
            Ok(lv) => Ok(Some(lv_info(lv)?)),
            Err(LVMError::NotFound { .. }) => Ok(None),
            Err(e) => Err(map_lvm2_cmd_error(Lookup::LogicalVolume(name), "lv lookup", e)),
        }
    }

    #[instrument(skip(self))]
    fn lv_create(&self, vg: &str, name: &str, size_bytes: u64, tags: &[String]) -> Result<LvInfo> {
        let vg_resource = resource_name(vg)?;
        let handle = Lvm2VolumeGroup::from_id(&vg_resource)
            .map_err(|e| map_lvm2_cmd_error(Lookup::VolumeGroup(vg), "vg lookup", e))?;
        let lv = handle
            .add_lv(LVCreateOptions {
                activate: true,
                capacity_bytes: resource_capacity(size_bytes)?,
                name: resource_name(name)?,
                tags: tags.to_vec(),
            })
            .map_err(|e| map_lvm2_cmd_error(Lookup::LogicalVolume(name), "lv create", e))?;
        lv_info(lv)
    }

    #[instrument(skip(self))]
    fn lv_remove(&self, vg: &str, name: &str) -> Result<()> {
        let vg_resource = resource_name(vg)?;
        let handle = Lvm2VolumeGroup::from_id(&vg_resource)
            .map_err(|e| map_lvm2_cmd_error(Lookup::VolumeGroup(vg), "vg lookup", e))?;
        handle
            .remove_lv(&resource_name(name)?)
            .map_err(|e| map_lvm2_cmd_error(Lookup::LogicalVolume(name), "lv remove", e))
    }
}

fn run(cmd: &str, args: &[&str]) -> Result<String> {
    debug!(cmd, ?args, "invoking lvm tool");
    let output = Command::new(cmd).args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(classify(cmd, args, stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Classifies `vgcreate`/`pvcreate` failures by the stderr text LVM2's tooling
/// actually emits, so callers can map them onto distinct CSI status codes
/// instead of a blanket `Internal`.
fn classify(cmd: &str, args: &[&str], stderr: String) -> LvmError {
    let lower = stderr.to_lowercase();
    if lower.contains("invalid name") || lower.contains("name contains invalid character") {
        return LvmError::InvalidName(stderr);
    }
    if lower.contains("insufficient free extents") || lower.contains("not enough free space") {
        return LvmError::NoSpace;
    }
    LvmError::CommandFailed {
        cmd: format!("{cmd} {}", args.join(" ")),
        stderr,
    }
}
