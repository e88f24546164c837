use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::{
    constants::{BTRFS_SWAPFILE_PATH, DEFAULT_SWAP_SIZE, DEFAULT_VOLUME_GROUP, SWAPFILE_PATH},
    is_default,
    primitives::bytes::ByteCount,
};

use super::error::InvalidConfigurationError;

/// Storage stack of the data partition. Layers are always applied in the
/// order encryption, volume manager, filesystem.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StorageStack {
    /// Filesystem of the root volume (and of a separate home volume).
    pub filesystem: Filesystem,

    /// Whether the data partition is wrapped in a LUKS2 container.
    #[serde(default, skip_serializing_if = "is_default")]
    pub encryption: Encryption,

    /// Whether the data partition (or its LUKS mapping) is managed by LVM.
    #[serde(default, skip_serializing_if = "is_default")]
    pub volume_manager: VolumeManager,

    /// Install a daily snapshot job.
    #[serde(default, skip_serializing_if = "is_default")]
    pub snapshots: bool,
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Filesystem {
    Ext4,
    Xfs,
    Btrfs,
    Bcachefs,
}

impl Filesystem {
    pub const ALL: [Filesystem; 4] = [
        Filesystem::Ext4,
        Filesystem::Xfs,
        Filesystem::Btrfs,
        Filesystem::Bcachefs,
    ];

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether the filesystem has named, snapshot-able subvolumes.
    pub fn supports_subvolumes(self) -> bool {
        matches!(self, Filesystem::Btrfs | Filesystem::Bcachefs)
    }

    /// Whether the kernel can swap to a file on this filesystem.
    pub fn supports_swapfile(self) -> bool {
        !matches!(self, Filesystem::Bcachefs)
    }

    /// Path of the swap file inside the installed system.
    pub fn swapfile_path(self) -> &'static str {
        match self {
            Filesystem::Btrfs => BTRFS_SWAPFILE_PATH,
            _ => SWAPFILE_PATH,
        }
    }

    /// Whether fsck should check the filesystem at boot.
    pub fn fsck_at_boot(self) -> bool {
        matches!(self, Filesystem::Ext4)
    }

    /// Void package providing the userspace tools.
    pub fn tools_package(self) -> &'static str {
        match self {
            Filesystem::Ext4 => "e2fsprogs",
            Filesystem::Xfs => "xfsprogs",
            Filesystem::Btrfs => "btrfs-progs",
            Filesystem::Bcachefs => "bcachefs-tools",
        }
    }

    /// Mount options used for the root and home volumes.
    pub fn mount_options(self) -> &'static [&'static str] {
        match self {
            Filesystem::Ext4 | Filesystem::Xfs | Filesystem::Bcachefs => &["defaults", "noatime"],
            Filesystem::Btrfs => &["defaults", "noatime", "compress=zstd"],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    #[default]
    None,
    Luks,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum VolumeManager {
    #[default]
    None,
    Lvm(LvmOptions),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LvmOptions {
    /// Name of the volume group.
    #[serde(default = "LvmOptions::default_volume_group")]
    pub volume_group: String,

    /// Size of the root logical volume. When omitted, root takes the
    /// remaining space of the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_size: Option<ByteCount>,

    /// Create a separate home logical volume from the remaining space.
    #[serde(default, skip_serializing_if = "is_default")]
    pub separate_home: bool,

    /// Size of each snapshot logical volume.
    #[serde(default = "LvmOptions::default_snapshot_size")]
    pub snapshot_size: ByteCount,
}

impl LvmOptions {
    fn default_volume_group() -> String {
        DEFAULT_VOLUME_GROUP.into()
    }

    fn default_snapshot_size() -> ByteCount {
        ByteCount(10 << 30)
    }
}

impl Default for LvmOptions {
    fn default() -> Self {
        Self {
            volume_group: Self::default_volume_group(),
            root_size: None,
            separate_home: false,
            snapshot_size: Self::default_snapshot_size(),
        }
    }
}

/// Swap configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Swap {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "Swap::default_size")]
    pub size: ByteCount,

    /// Enable compressed swap cache (zswap) on the kernel command line.
    #[serde(default)]
    pub compression: bool,
}

impl Swap {
    fn default_size() -> ByteCount {
        DEFAULT_SWAP_SIZE
            .parse()
            .unwrap_or(ByteCount(4 << 30))
    }
}

impl Default for Swap {
    fn default() -> Self {
        Self {
            enabled: false,
            size: Self::default_size(),
            compression: false,
        }
    }
}

/// Where /home lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HomeLayout {
    /// A plain directory in the root filesystem.
    InRoot,
    /// The `@home` btrfs subvolume.
    Subvolume,
    /// A separate logical volume formatted like root.
    LogicalVolume,
}

/// How periodic snapshots are taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotStrategy {
    None,
    /// snapper timeline with daily/weekly/monthly retention (btrfs).
    Timeline,
    /// Dated read-only subvolume snapshots, newest seven kept (bcachefs).
    SubvolumeRotation,
    /// Dated snapshot logical volumes of root, newest seven kept.
    LogicalVolumeRotation {
        volume_group: String,
        size: ByteCount,
    },
}

/// Where swap lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapLayout {
    None,
    LogicalVolume,
    File,
    /// Swap was requested but the filesystem cannot hold a swap file.
    Unsupported,
}

impl StorageStack {
    pub fn is_encrypted(&self) -> bool {
        self.encryption == Encryption::Luks
    }

    pub fn lvm(&self) -> Option<&LvmOptions> {
        match &self.volume_manager {
            VolumeManager::Lvm(options) => Some(options),
            VolumeManager::None => None,
        }
    }

    pub fn home_layout(&self) -> HomeLayout {
        match (self.filesystem, self.lvm()) {
            (Filesystem::Btrfs, _) => HomeLayout::Subvolume,
            (Filesystem::Ext4 | Filesystem::Xfs, Some(lvm)) if lvm.separate_home => {
                HomeLayout::LogicalVolume
            }
            _ => HomeLayout::InRoot,
        }
    }

    pub fn snapshot_strategy(&self) -> SnapshotStrategy {
        if !self.snapshots {
            return SnapshotStrategy::None;
        }

        match (self.filesystem, self.lvm()) {
            (Filesystem::Btrfs, _) => SnapshotStrategy::Timeline,
            (Filesystem::Bcachefs, _) => SnapshotStrategy::SubvolumeRotation,
            (Filesystem::Ext4 | Filesystem::Xfs, Some(lvm)) => {
                SnapshotStrategy::LogicalVolumeRotation {
                    volume_group: lvm.volume_group.clone(),
                    size: lvm.snapshot_size,
                }
            }
            (Filesystem::Ext4 | Filesystem::Xfs, None) => SnapshotStrategy::None,
        }
    }

    pub fn swap_layout(&self, swap: &Swap) -> SwapLayout {
        if !swap.enabled {
            SwapLayout::None
        } else if self.lvm().is_some() {
            SwapLayout::LogicalVolume
        } else if self.filesystem.supports_swapfile() {
            SwapLayout::File
        } else {
            SwapLayout::Unsupported
        }
    }

    pub fn validate(&self) -> Result<(), InvalidConfigurationError> {
        if let Some(lvm) = self.lvm() {
            if !is_valid_volume_group_name(&lvm.volume_group) {
                return Err(InvalidConfigurationError::InvalidVolumeGroupName {
                    name: lvm.volume_group.clone(),
                });
            }

            if lvm.separate_home {
                if !matches!(self.filesystem, Filesystem::Ext4 | Filesystem::Xfs) {
                    return Err(InvalidConfigurationError::SeparateHomeUnsupported {
                        filesystem: self.filesystem.name(),
                    });
                }
                if lvm.root_size.is_none() {
                    return Err(InvalidConfigurationError::SeparateHomeWithoutRootSize);
                }
            }
        }

        if self.snapshots && self.snapshot_strategy() == SnapshotStrategy::None {
            return Err(InvalidConfigurationError::SnapshotsUnsupported {
                filesystem: self.filesystem.name(),
            });
        }

        Ok(())
    }
}

fn is_valid_volume_group_name(name: &str) -> bool {
    lazy_static::lazy_static! {
        static ref VG_NAME: regex::Regex =
            regex::Regex::new(r"^[A-Za-z0-9+_.][A-Za-z0-9+_.-]{0,126}$").unwrap();
    }
    name != "." && name != ".." && VG_NAME.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(filesystem: Filesystem, lvm: Option<LvmOptions>) -> StorageStack {
        StorageStack {
            filesystem,
            encryption: Encryption::None,
            volume_manager: lvm.map(VolumeManager::Lvm).unwrap_or_default(),
            snapshots: false,
        }
    }

    #[test]
    fn test_home_layout() {
        let home_lvm = LvmOptions {
            root_size: Some(ByteCount(50 << 30)),
            separate_home: true,
            ..Default::default()
        };

        assert_eq!(
            stack(Filesystem::Btrfs, None).home_layout(),
            HomeLayout::Subvolume
        );
        assert_eq!(
            stack(Filesystem::Bcachefs, None).home_layout(),
            HomeLayout::InRoot
        );
        assert_eq!(
            stack(Filesystem::Ext4, None).home_layout(),
            HomeLayout::InRoot
        );
        assert_eq!(
            stack(Filesystem::Ext4, Some(home_lvm.clone())).home_layout(),
            HomeLayout::LogicalVolume
        );
        assert_eq!(
            stack(Filesystem::Xfs, Some(home_lvm)).home_layout(),
            HomeLayout::LogicalVolume
        );
        assert_eq!(
            stack(Filesystem::Xfs, Some(LvmOptions::default())).home_layout(),
            HomeLayout::InRoot
        );
    }

    #[test]
    fn test_snapshot_strategy() {
        let mut s = stack(Filesystem::Btrfs, None);
        assert_eq!(s.snapshot_strategy(), SnapshotStrategy::None);

        s.snapshots = true;
        assert_eq!(s.snapshot_strategy(), SnapshotStrategy::Timeline);

        s.filesystem = Filesystem::Bcachefs;
        assert_eq!(s.snapshot_strategy(), SnapshotStrategy::SubvolumeRotation);

        s.filesystem = Filesystem::Ext4;
        assert_eq!(s.snapshot_strategy(), SnapshotStrategy::None);
        assert_eq!(
            s.validate().unwrap_err(),
            InvalidConfigurationError::SnapshotsUnsupported { filesystem: "ext4" }
        );

        s.volume_manager = VolumeManager::Lvm(LvmOptions::default());
        assert_eq!(
            s.snapshot_strategy(),
            SnapshotStrategy::LogicalVolumeRotation {
                volume_group: "void".into(),
                size: ByteCount(10 << 30),
            }
        );
        s.validate().unwrap();
    }

    #[test]
    fn test_swap_layout() {
        let swap = Swap {
            enabled: true,
            ..Default::default()
        };

        assert_eq!(
            stack(Filesystem::Ext4, None).swap_layout(&swap),
            SwapLayout::File
        );
        assert_eq!(
            stack(Filesystem::Btrfs, None).swap_layout(&swap),
            SwapLayout::File
        );
        assert_eq!(
            stack(Filesystem::Bcachefs, None).swap_layout(&swap),
            SwapLayout::Unsupported
        );
        assert_eq!(
            stack(Filesystem::Bcachefs, Some(LvmOptions::default())).swap_layout(&swap),
            SwapLayout::LogicalVolume
        );
        assert_eq!(
            stack(Filesystem::Ext4, None).swap_layout(&Swap::default()),
            SwapLayout::None
        );

        assert_eq!(Filesystem::Ext4.swapfile_path(), "/swapfile");
        assert_eq!(Filesystem::Btrfs.swapfile_path(), "/swap/swapfile");
    }

    #[test]
    fn test_validate_separate_home() {
        let s = stack(
            Filesystem::Btrfs,
            Some(LvmOptions {
                separate_home: true,
                root_size: Some(ByteCount(20 << 30)),
                ..Default::default()
            }),
        );
        assert_eq!(
            s.validate().unwrap_err(),
            InvalidConfigurationError::SeparateHomeUnsupported { filesystem: "btrfs" }
        );

        let s = stack(
            Filesystem::Ext4,
            Some(LvmOptions {
                separate_home: true,
                ..Default::default()
            }),
        );
        assert_eq!(
            s.validate().unwrap_err(),
            InvalidConfigurationError::SeparateHomeWithoutRootSize
        );
    }

    #[test]
    fn test_validate_volume_group_name() {
        for (name, valid) in [
            ("void", true),
            ("vg_0.data+x", true),
            ("-void", false),
            ("..", false),
            ("with space", false),
            ("", false),
        ] {
            let s = stack(
                Filesystem::Xfs,
                Some(LvmOptions {
                    volume_group: name.into(),
                    ..Default::default()
                }),
            );
            assert_eq!(s.validate().is_ok(), valid, "volume group '{name}'");
        }
    }

    #[test]
    fn test_deserialize() {
        let parsed: StorageStack = serde_yaml::from_str(
            "filesystem: ext4\nencryption: luks\nvolumeManager:\n  type: lvm\n  rootSize: 50G\n  separateHome: true\n",
        )
        .unwrap();
        assert!(parsed.is_encrypted());
        let lvm = parsed.lvm().unwrap();
        assert_eq!(lvm.volume_group, "void");
        assert_eq!(lvm.root_size, Some(ByteCount(50 << 30)));
        assert!(lvm.separate_home);

        let parsed: StorageStack = serde_yaml::from_str("filesystem: bcachefs").unwrap();
        assert_eq!(parsed.volume_manager, VolumeManager::None);
        assert_eq!(parsed.encryption, Encryption::None);

        serde_yaml::from_str::<StorageStack>("filesystem: zfs").unwrap_err();
        serde_yaml::from_str::<StorageStack>("filesystem: ext4\nraid: true").unwrap_err();
    }
}
