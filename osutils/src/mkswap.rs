use std::{
    fs::{self, OpenOptions},
    os::{
        fd::AsRawFd,
        unix::fs::{OpenOptionsExt, PermissionsExt},
    },
    path::Path,
};

use anyhow::{Context, Error};
use nix::fcntl::{fallocate, FallocateFlags};

use voidstrap_api::primitives::bytes::ByteCount;

use crate::dependencies::Dependency;

pub fn run(device_path: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Mkswap
        .cmd()
        .arg("--verbose")
        .arg(device_path.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to execute mkswap on '{}'",
                device_path.as_ref().display()
            )
        })
}

/// Preallocates a swap file of `size` with mode 0600 and writes a swap
/// signature to it.
pub fn create_swapfile(path: impl AsRef<Path>, size: ByteCount) -> Result<(), Error> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("Failed to create swap file '{}'", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions of '{}'", path.display()))?;

    let length = i64::try_from(size.bytes()).context("Swap size is too large")?;
    fallocate(file.as_raw_fd(), FallocateFlags::empty(), 0, length)
        .with_context(|| format!("Failed to allocate swap file '{}'", path.display()))?;
    drop(file);

    run(path)
}
