use log::{info, warn};

use osutils::{files, xbps};
use voidstrap_api::{
    config::{Firmware, SnapshotStrategy},
    constants::{BASE_PACKAGE, RESOLV_CONF_PATH},
    error::{InstallError, ReportError, VoidstrapError},
};

use super::EngineContext;

/// Installs the base system and the packages the chosen storage stack and
/// bootloader need into the mounted target.
pub(super) fn bootstrap(ctx: &EngineContext) -> Result<(), VoidstrapError> {
    let copied = xbps::copy_keys("/", &ctx.target_root).structured(InstallError::Bootstrap)?;
    info!("Trusting {copied} repository keys in the target");

    let xbps_arch = ctx.config.xbps_arch();
    info!(
        "Installing {BASE_PACKAGE} for {xbps_arch} from '{}'",
        ctx.config.repository
    );
    xbps::XbpsInstall::new([BASE_PACKAGE])
        .root(&ctx.target_root)
        .repository(&ctx.config.repository)
        .arch(&xbps_arch)
        .run()
        .structured(InstallError::Bootstrap)?;

    let packages = target_packages(ctx);
    info!("Installing {}", packages.join(", "));
    xbps::XbpsInstall::new(packages)
        .root(&ctx.target_root)
        .repository(&ctx.config.repository)
        .arch(&xbps_arch)
        .run()
        .structured(InstallError::Bootstrap)?;

    if let Err(e) = files::copy_file(RESOLV_CONF_PATH, ctx.target_path(RESOLV_CONF_PATH)) {
        warn!("Name resolution inside the target may not work: {e:?}");
    }
    Ok(())
}

/// Packages installed on top of the base system.
pub(super) fn target_packages(ctx: &EngineContext) -> Vec<&'static str> {
    let storage = &ctx.config.storage;
    let mut packages = Vec::new();

    if storage.is_encrypted() {
        packages.push("cryptsetup");
    }
    if storage.lvm().is_some() {
        packages.push("lvm2");
    }
    packages.push(storage.filesystem.tools_package());
    packages.extend(["dosfstools", "limine"]);
    if ctx.firmware == Firmware::Uefi {
        packages.push("efibootmgr");
    }

    match storage.snapshot_strategy() {
        SnapshotStrategy::None => {}
        SnapshotStrategy::Timeline => packages.extend(["cronie", "snapper"]),
        SnapshotStrategy::SubvolumeRotation | SnapshotStrategy::LogicalVolumeRotation { .. } => {
            packages.push("cronie")
        }
    }

    packages.push("chrony");
    packages.push(ctx.config.privilege_tool.package());
    packages
}
