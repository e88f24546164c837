use std::path::Path;

use anyhow::{ensure, Context, Error};

use crate::dependencies::Dependency;

fn run(device_path: impl AsRef<Path>, tag: &str) -> Result<String, Error> {
    let output = Dependency::Blkid
        .cmd()
        .arg("-o") // output format
        .arg("value") // single value
        .arg("-s") // tag
        .arg(tag)
        .arg(device_path.as_ref())
        .output_and_check()
        .context("Failed to execute blkid")?;

    Ok(output.trim().to_owned())
}

/// Returns the filesystem (or LUKS container) UUID of a device.
///
/// FAT volumes report a short serial such as `8AA2-EE49`, so the value is
/// kept as a string.
pub fn get_uuid(device_path: impl AsRef<Path>) -> Result<String, Error> {
    let uuid = run(&device_path, "UUID")?;
    ensure!(
        !uuid.is_empty(),
        "Device '{}' has no UUID",
        device_path.as_ref().display()
    );
    Ok(uuid)
}
