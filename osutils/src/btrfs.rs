use std::path::Path;

use anyhow::{Context, Error};

use voidstrap_api::primitives::bytes::ByteCount;

use crate::dependencies::Dependency;

/// Creates subvolume `path`. The parent directory must be on a mounted btrfs
/// filesystem.
pub fn create_subvolume(path: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Btrfs
        .cmd()
        .arg("subvolume")
        .arg("create")
        .arg(path.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create btrfs subvolume '{}'",
                path.as_ref().display()
            )
        })
}

/// Creates a NOCOW, preallocated swap file formatted with a swap signature.
pub fn mkswapfile(path: impl AsRef<Path>, size: ByteCount) -> Result<(), Error> {
    Dependency::Btrfs
        .cmd()
        .arg("filesystem")
        .arg("mkswapfile")
        .arg("--size")
        .arg(size.to_human_readable())
        .arg(path.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create btrfs swap file '{}'",
                path.as_ref().display()
            )
        })
}
