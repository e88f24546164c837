use log::{debug, warn};

use osutils::tabfile::{TabDevice, TabFile, TabFileEntry};
use voidstrap_api::{
    config::SwapLayout,
    constants::FSTAB_PATH,
    error::{InstallError, ReportError, VoidstrapError},
};

use crate::engine::EngineContext;

/// Builds the fstab of the installed system from the planned mounts.
pub fn build(ctx: &EngineContext) -> TabFile {
    let mut entries = ctx
        .mounts()
        .into_iter()
        .map(|mount| {
            let device = match ctx.uuids.for_mount(mount.source) {
                Some(uuid) if !uuid.is_empty() => TabDevice::Uuid(uuid.into()),
                _ => TabDevice::Path(mount.device),
            };
            TabFileEntry::new_path(device, mount.mount_point, mount.fs_type)
                .with_options(mount.options)
        })
        .collect::<Vec<_>>();

    match ctx.config.storage.swap_layout(&ctx.config.swap) {
        SwapLayout::LogicalVolume => {
            if let Some(swap) = &ctx.stack.swap {
                let device = match &ctx.uuids.swap {
                    Some(uuid) => TabDevice::Uuid(uuid.clone()),
                    None => TabDevice::Path(swap.device.clone()),
                };
                entries.push(TabFileEntry::new_swap(device));
            }
        }
        SwapLayout::File => entries.push(TabFileEntry::new_swap(TabDevice::Path(
            ctx.config.storage.filesystem.swapfile_path().into(),
        ))),
        SwapLayout::Unsupported => warn!(
            "Swap files are not supported on {}, no swap entry is written",
            ctx.config.storage.filesystem.name()
        ),
        SwapLayout::None => (),
    }

    TabFile { entries }
}

/// Writes the fstab into the target.
pub(crate) fn write(ctx: &EngineContext) -> Result<(), VoidstrapError> {
    let tab = build(ctx);
    debug!("Generated fstab:\n{}", tab.render());
    osutils::files::create_dirs(ctx.target_path("/etc")).structured(InstallError::Fstab)?;
    tab.write(ctx.target_path(FSTAB_PATH))
        .structured(InstallError::Fstab)
}
