use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Error};
use const_format::formatcp;
use log::{debug, info, warn};

use osutils::{efibootmgr, files, limine};
use voidstrap_api::{
    config::{BootLayout, Firmware, SnapshotStrategy},
    constants::{
        BOOT_ENTRY_LABEL, BOOT_MOUNT_POINT_PATH, EFI_DEFAULT_BIN_DIRECTORY,
        EFI_DEFAULT_BIN_RELATIVE_PATH, ESP_EFI_DIRECTORY, LIMINE_BIOS_STAGE_FILENAME, LIMINE_CONFIG_FILENAME, LIMINE_SHARE_PATH,
    },
    error::{InstallError, ReportError, VoidstrapError},
};

use crate::engine::{EngineContext, Subsystem};

pub mod cmdline;
pub mod entries;
mod hook;

/// Directory of the fallback loader, as an ESP path for efibootmgr.
const EFI_LOADER_DIRECTORY: &str = formatcp!("\\{ESP_EFI_DIRECTORY}\\{EFI_DEFAULT_BIN_DIRECTORY}");

#[derive(Default, Debug)]
pub(super) struct BootSubsystem;

impl Subsystem for BootSubsystem {
    fn name(&self) -> &'static str {
        "boot"
    }

    fn configure(&mut self, ctx: &EngineContext, _exec_root: &Path) -> Result<(), VoidstrapError> {
        if ctx.firmware == Firmware::Bios {
            info!("Installing Limine BIOS stages to '{}'", ctx.config.disk);
            limine::bios_install(&ctx.config.disk).structured(InstallError::InstallBootloader)?;
        }
        Ok(())
    }

    fn finalize(&mut self, ctx: &EngineContext) -> Result<(), VoidstrapError> {
        install_limine(ctx).structured(InstallError::InstallBootloader)?;

        if ctx.firmware == Firmware::Uefi {
            if let Err(e) = register_boot_entry(ctx).structured(InstallError::RegisterBootEntry) {
                warn!("Firmware boot entry was not registered, the fallback loader path still boots: {e:?}");
            }
        }
        Ok(())
    }
}

/// Directory on the live system holding the boot partition of the target.
fn boot_partition_dir(ctx: &EngineContext) -> PathBuf {
    ctx.target_path(ctx.boot_mount_point())
}

/// Writes `limine.conf` and the Limine loader files onto the boot partition.
fn install_limine(ctx: &EngineContext) -> Result<(), Error> {
    let boot_dir = boot_partition_dir(ctx);

    if ctx.config.boot_layout == BootLayout::SeparateEsp {
        hook::copy_kernels(&ctx.target_path(BOOT_MOUNT_POINT_PATH), &boot_dir)?;
        hook::write_hook(&ctx.target_root, ctx.boot_mount_point())?;
    }

    let kernels = entries::discover_kernels(&boot_dir)?;
    ensure!(
        !kernels.is_empty(),
        "No kernel with an initramfs found in '{}'",
        boot_dir.display()
    );

    let snapshots = match ctx.config.storage.snapshot_strategy() {
        SnapshotStrategy::Timeline => entries::discover_snapshots(&ctx.target_root),
        _ => Vec::new(),
    };
    let boot_entries = entries::build_entries(&kernels, &ctx.kernel_cmdline(), &snapshots);
    let config = entries::limine_config(&boot_entries, ctx.config.boot_timeout);

    let config_path = boot_dir.join(LIMINE_CONFIG_FILENAME);
    info!(
        "Writing {} boot entries to '{}'",
        boot_entries.len(),
        config_path.display()
    );
    debug!("Limine configuration:\n{config}");
    files::write_file(&config_path, 0o644, config.to_string().as_bytes())?;

    let share = ctx.target_path(LIMINE_SHARE_PATH);
    match ctx.firmware {
        Firmware::Uefi => {
            let binary = ctx.architecture.efi_binary_name();
            files::copy_file(
                share.join(binary),
                boot_dir.join(EFI_DEFAULT_BIN_RELATIVE_PATH).join(binary),
            )
        }
        Firmware::Bios => files::copy_file(
            share.join(LIMINE_BIOS_STAGE_FILENAME),
            boot_dir.join(LIMINE_BIOS_STAGE_FILENAME),
        ),
    }
    .context("Failed to copy Limine loader onto the boot partition")
}

/// ESP-relative loader path in the form efibootmgr expects.
fn loader_path(binary: &str) -> String {
    format!("{EFI_LOADER_DIRECTORY}\\{binary}")
}

fn register_boot_entry(ctx: &EngineContext) -> Result<(), Error> {
    let existing = efibootmgr::list_and_parse_bootmgr_entries()?;
    if existing.boot_entry_exists(BOOT_ENTRY_LABEL) {
        info!("Firmware boot entry '{BOOT_ENTRY_LABEL}' already exists");
        return Ok(());
    }

    efibootmgr::create_boot_entry(
        BOOT_ENTRY_LABEL,
        Path::new(&ctx.config.disk),
        ctx.partitions.boot().number,
        &loader_path(ctx.architecture.efi_binary_name()),
    )
}
