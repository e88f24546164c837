use std::fmt::{self, Display};

use serde::Serialize;

use voidstrap_api::{
    config::{Filesystem, StorageStack, Swap},
    constants::BTRFS_ROOT_SUBVOLUME,
};

use crate::engine::storage::VolumeUuids;

const ZSWAP_PARAMETERS: [&str; 3] = [
    "zswap.enabled=1",
    "zswap.compressor=zstd",
    "zswap.max_pool_percent=20",
];

const LOGLEVEL: &str = "loglevel=4";

/// Kernel command line of the installed system.
///
/// Tokens are always rendered in the same order: root, `rw`, rootflags,
/// LUKS, LVM, zswap, log level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelCmdline {
    pub root_uuid: String,

    /// Btrfs subvolume mounted as root.
    pub root_subvolume: Option<String>,

    pub luks_uuid: Option<String>,

    pub volume_group: Option<String>,

    pub zswap: bool,
}

impl KernelCmdline {
    pub fn new(storage: &StorageStack, swap: &Swap, uuids: &VolumeUuids) -> Self {
        Self {
            root_uuid: uuids.root.clone(),
            root_subvolume: (storage.filesystem == Filesystem::Btrfs)
                .then(|| BTRFS_ROOT_SUBVOLUME.to_string()),
            luks_uuid: uuids.luks.clone().filter(|_| storage.is_encrypted()),
            volume_group: storage.lvm().map(|lvm| lvm.volume_group.clone()),
            zswap: swap.enabled && swap.compression,
        }
    }

    /// The same command line booting into another btrfs subvolume.
    pub fn with_root_subvolume(&self, subvolume: impl Into<String>) -> Self {
        Self {
            root_subvolume: Some(subvolume.into()),
            ..self.clone()
        }
    }

    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![format!("root=UUID={}", self.root_uuid), "rw".into()];
        if let Some(subvolume) = &self.root_subvolume {
            tokens.push(format!("rootflags=subvol={subvolume}"));
        }
        if let Some(uuid) = &self.luks_uuid {
            tokens.push(format!("rd.luks.uuid={uuid}"));
        }
        if let Some(vg) = &self.volume_group {
            tokens.push(format!("rd.lvm.vg={vg}"));
        }
        if self.zswap {
            tokens.extend(ZSWAP_PARAMETERS.iter().map(|p| p.to_string()));
        }
        tokens.push(LOGLEVEL.into());
        tokens
    }
}

impl Display for KernelCmdline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(" "))
    }
}
