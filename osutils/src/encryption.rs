use std::path::{Path, PathBuf};

use anyhow::{Context, Error};

use voidstrap_api::primitives::secret::Secret;

use crate::dependencies::{Command, Dependency};

/// Path of the opened mapping for `name`.
pub fn mapper_path(name: &str) -> PathBuf {
    Path::new("/dev/mapper").join(name)
}

fn format_command(device_path: &Path, passphrase: &Secret) -> Command {
    let mut cmd = Dependency::Cryptsetup.cmd();
    cmd.arg("luksFormat")
        .arg("--type")
        .arg("luks2")
        .arg("--batch-mode")
        .arg("--key-file=-")
        .arg(device_path)
        .stdin(passphrase.expose());
    cmd
}

fn open_command(device_path: &Path, name: &str, passphrase: &Secret) -> Command {
    let mut cmd = Dependency::Cryptsetup.cmd();
    cmd.arg("open")
        .arg("--type")
        .arg("luks2")
        .arg("--key-file=-")
        .arg(device_path)
        .arg(name)
        .stdin(passphrase.expose());
    cmd
}

/// Initializes a LUKS2 container on `device_path`. The passphrase is passed
/// on stdin.
pub fn luks_format(device_path: impl AsRef<Path>, passphrase: &Secret) -> Result<(), Error> {
    format_command(device_path.as_ref(), passphrase)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to create LUKS2 container on '{}'",
                device_path.as_ref().display()
            )
        })
}

/// Opens the LUKS2 container on `device_path` as `/dev/mapper/<name>`.
pub fn open(device_path: impl AsRef<Path>, name: &str, passphrase: &Secret) -> Result<PathBuf, Error> {
    open_command(device_path.as_ref(), name, passphrase)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to open encrypted device '{}' as '{}'",
                device_path.as_ref().display(),
                name
            )
        })?;
    Ok(mapper_path(name))
}

/// Closes the mapping `name`.
pub fn close(name: &str) -> Result<(), Error> {
    Dependency::Cryptsetup
        .cmd()
        .arg("close")
        .arg(name)
        .run_and_check()
        .with_context(|| format!("Failed to close encrypted volume '{name}'"))
}

/// Returns the UUID of the LUKS header on `device_path`.
pub fn luks_uuid(device_path: impl AsRef<Path>) -> Result<String, Error> {
    Ok(Dependency::Cryptsetup
        .cmd()
        .arg("luksUUID")
        .arg(device_path.as_ref())
        .output_and_check()
        .with_context(|| {
            format!(
                "Failed to read LUKS UUID of '{}'",
                device_path.as_ref().display()
            )
        })?
        .trim()
        .to_owned())
}
