use std::{fs, os::unix::fs::FileTypeExt, path::Path};

use log::{debug, info, warn};

use osutils::path::join_relative;
use voidstrap_api::{
    config::{Firmware, InstallConfiguration},
    constants::{EFI_FIRMWARE_PATH, ZONEINFO_PATH},
    error::{PreconditionError, VoidstrapError},
};

/// Checks that the host can run the installation and resolves the firmware
/// interface to install for.
pub(crate) fn check_host(config: &InstallConfiguration) -> Result<Firmware, VoidstrapError> {
    check_root()?;

    let firmware = resolve_firmware(config.firmware, host_firmware() == Firmware::Uefi)?;
    info!("Installing for {} firmware", firmware.name());

    check_disk(Path::new(&config.disk))?;
    check_timezone(Path::new("/"), &config.timezone)?;
    Ok(firmware)
}

/// Firmware interface the host was booted with.
pub(super) fn host_firmware() -> Firmware {
    if Path::new(EFI_FIRMWARE_PATH).is_dir() {
        Firmware::Uefi
    } else {
        Firmware::Bios
    }
}

fn check_root() -> Result<(), VoidstrapError> {
    if !nix::unistd::Uid::effective().is_root() {
        return Err(VoidstrapError::new(PreconditionError::NotRoot));
    }
    Ok(())
}

/// Picks the firmware interface: the requested one, or the one the host was
/// booted with.
fn resolve_firmware(
    requested: Option<Firmware>,
    efi_present: bool,
) -> Result<Firmware, VoidstrapError> {
    match (requested, efi_present) {
        (Some(Firmware::Uefi), false) => Err(VoidstrapError::new(PreconditionError::NotUefi)),
        (Some(Firmware::Bios), true) => {
            warn!("Installing for BIOS firmware on a host booted through UEFI");
            Ok(Firmware::Bios)
        }
        (Some(firmware), _) => Ok(firmware),
        (None, true) => Ok(Firmware::Uefi),
        (None, false) => Ok(Firmware::Bios),
    }
}

fn check_disk(disk: &Path) -> Result<(), VoidstrapError> {
    let path = disk.display().to_string();
    let Ok(metadata) = fs::metadata(disk) else {
        return Err(VoidstrapError::new(PreconditionError::DeviceNotFound { path }));
    };
    if !metadata.file_type().is_block_device() {
        return Err(VoidstrapError::new(PreconditionError::NotABlockDevice { path }));
    }
    debug!("Target disk '{path}' is a block device");
    Ok(())
}

/// Checks that `timezone` names a zone file under `root`.
fn check_timezone(root: &Path, timezone: &str) -> Result<(), VoidstrapError> {
    if !join_relative(root, ZONEINFO_PATH).join(timezone).is_file() {
        return Err(VoidstrapError::new(PreconditionError::InvalidTimezone {
            timezone: timezone.into(),
        }));
    }
    Ok(())
}
