use std::path::Path;

use anyhow::Error;
use log::{info, warn};

use osutils::{btrfs, mkswap, path::join_relative};
use voidstrap_api::config::{Filesystem, Swap, SwapLayout};

/// Creates the swap file when swap lives in a file. Swap on a logical volume
/// is created with the storage stack.
pub(super) fn set_up(
    target_root: &Path,
    filesystem: Filesystem,
    layout: SwapLayout,
    swap: &Swap,
) -> Result<(), Error> {
    match layout {
        SwapLayout::None | SwapLayout::LogicalVolume => Ok(()),
        SwapLayout::Unsupported => {
            warn!(
                "Swap was requested, but {} cannot hold a swap file, continuing without swap",
                filesystem.name()
            );
            Ok(())
        }
        SwapLayout::File => {
            let swapfile = filesystem.swapfile_path();
            let path = join_relative(target_root, swapfile);
            info!(
                "Creating {} swap file '{swapfile}'",
                swap.size.to_human_readable()
            );
            match filesystem {
                Filesystem::Btrfs => btrfs::mkswapfile(&path, swap.size),
                _ => mkswap::create_swapfile(&path, swap.size),
            }
        }
    }
}
