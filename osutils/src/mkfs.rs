use std::path::Path;

use anyhow::{Context, Error};

use voidstrap_api::config::Filesystem;

use crate::dependencies::{Command, Dependency};

fn format_command(device_path: &Path, filesystem: Filesystem) -> Command {
    match filesystem {
        Filesystem::Ext4 => Dependency::MkfsExt4.cmd().with_arg("-F").with_arg(device_path),
        Filesystem::Xfs => Dependency::MkfsXfs.cmd().with_arg("-f").with_arg(device_path),
        Filesystem::Btrfs => Dependency::MkfsBtrfs.cmd().with_arg("-f").with_arg(device_path),
        Filesystem::Bcachefs => Dependency::Bcachefs
            .cmd()
            .with_arg("format")
            .with_arg("-f")
            .with_arg(device_path),
    }
}

fn vfat_command(device_path: &Path, label: &str) -> Command {
    Dependency::MkfsVfat
        .cmd()
        .with_arg("-F")
        .with_arg("32")
        .with_arg("-n")
        .with_arg(label)
        .with_arg(device_path)
}

/// Formats `device_path`, overwriting any existing filesystem.
pub fn run(device_path: impl AsRef<Path>, filesystem: Filesystem) -> Result<(), Error> {
    format_command(device_path.as_ref(), filesystem)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create {} filesystem on '{}'",
                filesystem.name(),
                device_path.as_ref().display()
            )
        })
}

/// Formats a boot partition as FAT32.
pub fn vfat(device_path: impl AsRef<Path>, label: &str) -> Result<(), Error> {
    vfat_command(device_path.as_ref(), label)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create FAT32 filesystem on '{}'",
                device_path.as_ref().display()
            )
        })
}
