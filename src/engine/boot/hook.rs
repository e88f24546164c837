use std::path::Path;

use anyhow::{Context, Error};
use log::{debug, info};

use osutils::files;
use voidstrap_api::constants::{BOOT_MOUNT_POINT_PATH, KERNEL_HOOK_PATH};

use super::entries::InstalledKernel;

/// Post-install kernel hook copying new kernels onto a separately mounted
/// ESP. xbps runs it as `<hook> <pkgname> <version>` after the initramfs has
/// been generated.
pub(super) fn render_hook(esp_mount_point: &str) -> String {
    format!(
        "#!/bin/sh\n\
         # Copies the kernel and initramfs of a new kernel onto the ESP.\n\
         VERSION=\"$2\"\n\
         \n\
         cp -f {BOOT_MOUNT_POINT_PATH}/vmlinuz-\"$VERSION\" {esp_mount_point}/\n\
         cp -f {BOOT_MOUNT_POINT_PATH}/initramfs-\"$VERSION\".img {esp_mount_point}/\n"
    )
}

pub(super) fn write_hook(target_root: &Path, esp_mount_point: &str) -> Result<(), Error> {
    let path = osutils::path::join_relative(target_root, KERNEL_HOOK_PATH);
    debug!("Writing kernel hook '{}'", path.display());
    files::write_file(&path, 0o755, render_hook(esp_mount_point).as_bytes())
}

/// Copies kernels and their initramfs from `/boot` onto the ESP.
pub(super) fn copy_kernels(boot_dir: &Path, esp_dir: &Path) -> Result<(), Error> {
    for kernel in super::entries::discover_kernels(boot_dir)? {
        copy_kernel(&kernel, boot_dir, esp_dir)?;
    }
    Ok(())
}

fn copy_kernel(kernel: &InstalledKernel, boot_dir: &Path, esp_dir: &Path) -> Result<(), Error> {
    info!("Copying kernel {} to the ESP", kernel.version);
    for file in [&kernel.kernel, &kernel.initramfs] {
        files::copy_file(boot_dir.join(file), esp_dir.join(file))
            .with_context(|| format!("Failed to copy '{file}' to '{}'", esp_dir.display()))?;
    }
    Ok(())
}
