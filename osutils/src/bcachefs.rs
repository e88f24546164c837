use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Creates subvolume `path` on a mounted bcachefs filesystem.
pub fn create_subvolume(path: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Bcachefs
        .cmd()
        .arg("subvolume")
        .arg("create")
        .arg(path.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create bcachefs subvolume '{}'",
                path.as_ref().display()
            )
        })
}
