use std::{fs, path::Path};

use anyhow::{bail, Context, Error};

use crate::{
    dependencies::{Command, Dependency},
    files,
};

fn mount_command(
    device: &Path,
    mount_dir: &Path,
    fstype: Option<&str>,
    options: &[String],
) -> Command {
    let mut cmd = Dependency::Mount.cmd();
    if let Some(fstype) = fstype {
        cmd.arg("-t").arg(fstype);
    }
    if !options.is_empty() {
        cmd.arg("-o").arg(options.join(","));
    }
    cmd.arg(device).arg(mount_dir);
    cmd
}

/// Mounts a block device at mount_dir.
pub fn mount(
    device: impl AsRef<Path>,
    mount_dir: impl AsRef<Path>,
    fstype: Option<&str>,
    options: &[String],
) -> Result<(), Error> {
    mount_command(device.as_ref(), mount_dir.as_ref(), fstype, options)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to mount {} to path {}",
                device.as_ref().display(),
                mount_dir.as_ref().display(),
            )
        })
}

/// Recursively binds `path` at `mount_dir` and marks the new tree as a slave,
/// so unmounting it does not propagate back to the host.
pub fn rbind_rslave(path: impl AsRef<Path>, mount_dir: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Mount
        .cmd()
        .arg("--rbind")
        .arg(path.as_ref())
        .arg(mount_dir.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to mount {} as a bind mount for {}",
                path.as_ref().display(),
                mount_dir.as_ref().display(),
            )
        })?;

    Dependency::Mount
        .cmd()
        .arg("--make-rslave")
        .arg(mount_dir.as_ref())
        .run_and_check()
        .with_context(|| format!("Failed to make {} a slave", mount_dir.as_ref().display()))
}

/// Unmounts given directory mount_dir.
pub fn umount(mount_dir: impl AsRef<Path>, recursive: bool) -> Result<(), Error> {
    let mut cmd = Dependency::Umount.cmd();
    if recursive {
        cmd.arg("-R");
    }

    cmd.arg(mount_dir.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to unmount directory {}",
                mount_dir.as_ref().display()
            )
        })
}

/// Ensure that the target_path is a suitable path for a mount point
pub fn ensure_mount_directory(target_path: &Path) -> Result<(), Error> {
    if target_path.exists() {
        if !target_path.is_dir() {
            bail!("Mount path '{}' is not a directory", target_path.display());
        }
        if let Ok(mut entries) = fs::read_dir(target_path) {
            if entries.next().is_some() {
                bail!("Mount path '{}' is not empty", target_path.display());
            }
        }
    } else {
        files::create_dirs(target_path).context(format!(
            "Failed to create mount path '{}'",
            target_path.display()
        ))?;
    }

    Ok(())
}
