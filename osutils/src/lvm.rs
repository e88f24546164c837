use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use serde::Serialize;

use voidstrap_api::primitives::bytes::ByteCount;

use crate::dependencies::{Command, Dependency};

/// Size of a logical volume at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogicalVolumeSize {
    Fixed(ByteCount),

    /// Percentage of the free space left in the volume group.
    PercentFree(u8),
}

/// Path of logical volume `name` in volume group `vg`.
pub fn lv_path(vg: &str, name: &str) -> PathBuf {
    Path::new("/dev").join(vg).join(name)
}

pub fn pvcreate(device_path: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Pvcreate
        .cmd()
        .arg("--yes")
        .arg(device_path.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create physical volume on '{}'",
                device_path.as_ref().display()
            )
        })
}

pub fn vgcreate(vg: &str, device_path: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Vgcreate
        .cmd()
        .arg(vg)
        .arg(device_path.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to create volume group '{vg}'"))
}

fn lvcreate_command(vg: &str, name: &str, size: LogicalVolumeSize) -> Command {
    let mut cmd = Dependency::Lvcreate.cmd();
    cmd.arg("--yes");
    match size {
        LogicalVolumeSize::Fixed(bytes) => cmd.arg("-L").arg(bytes.to_lvm_size()),
        LogicalVolumeSize::PercentFree(percent) => cmd.arg("-l").arg(format!("{percent}%FREE")),
    };
    cmd.arg("-n").arg(name).arg(vg);
    cmd
}

/// Creates a logical volume and returns its device path.
pub fn lvcreate(vg: &str, name: &str, size: LogicalVolumeSize) -> Result<PathBuf, Error> {
    lvcreate_command(vg, name, size)
        .run_and_check()
        .with_context(|| format!("Failed to create logical volume '{vg}/{name}'"))?;
    Ok(lv_path(vg, name))
}

/// Deactivates all logical volumes of `vg`.
pub fn deactivate(vg: &str) -> Result<(), Error> {
    Dependency::Vgchange
        .cmd()
        .arg("--activate")
        .arg("n")
        .arg(vg)
        .run_and_check()
        .with_context(|| format!("Failed to deactivate volume group '{vg}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lvcreate_command() {
        assert_eq!(
            lvcreate_command("void", "swap", LogicalVolumeSize::Fixed(ByteCount(4 << 30)))
                .render_command(),
            "lvcreate --yes -L 4G -n swap void"
        );
        assert_eq!(
            lvcreate_command("void", "root", LogicalVolumeSize::PercentFree(90)).render_command(),
            "lvcreate --yes -l 90%FREE -n root void"
        );
    }

    #[test]
    fn test_lv_path() {
        assert_eq!(lv_path("void", "root"), Path::new("/dev/void/root"));
    }
}
