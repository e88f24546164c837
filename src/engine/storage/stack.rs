use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use osutils::{
    btrfs, encryption,
    lvm::{self, LogicalVolumeSize},
    mkfs, mkswap,
    tabfile::TabFileSystemType,
};
use voidstrap_api::{
    config::{Filesystem, HomeLayout, SnapshotStrategy, StorageStack, Swap, SwapLayout},
    constants::{
        BTRFS_HOME_SUBVOLUME, BTRFS_ROOT_SUBVOLUME, BTRFS_SWAP_SUBVOLUME,
        HOME_MOUNT_POINT_PATH, HOME_VOLUME_NAME, LUKS_MAPPER_NAME,
        LVM_SNAPSHOT_RESERVE_PERCENT, ROOT_MOUNT_POINT_PATH, ROOT_VOLUME_NAME,
        SWAP_MOUNT_POINT_PATH, SWAP_VOLUME_NAME,
    },
    error::{InstallError, InternalError, ReportError, VoidstrapError, VoidstrapResultExt},
    primitives::secret::Secret,
};

use super::session::{Resource, StorageSession};

/// One layer of the storage stack on the data partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layer", rename_all = "kebab-case")]
pub enum Layer {
    #[serde(rename_all = "camelCase")]
    Luks {
        device: PathBuf,
        mapping: String,
        opened: PathBuf,
    },
    #[serde(rename_all = "camelCase")]
    Lvm {
        physical_volume: PathBuf,
        volume_group: String,
    },
    Filesystem { filesystem: Filesystem },
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Luks { .. } => "luks",
            Layer::Lvm { .. } => "lvm",
            Layer::Filesystem { .. } => "filesystem",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeFormat {
    Filesystem(Filesystem),
    Swap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalVolume {
    pub name: &'static str,
    pub size: LogicalVolumeSize,
}

/// A formatted block device produced by the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Final device path, after every layer has been applied.
    pub device: PathBuf,

    pub format: VolumeFormat,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_volume: Option<LogicalVolume>,
}

/// The storage stack of the data partition: layers in application order and
/// the volumes they produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackPlan {
    pub layers: Vec<Layer>,
    pub filesystem: Filesystem,
    pub home_layout: HomeLayout,
    pub root: Volume,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<Volume>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<Volume>,

    /// The swap file gets its own btrfs subvolume, which root snapshots
    /// never include.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub swap_subvolume: bool,
}

/// Which formatted device a mount refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountSource {
    Root,
    Boot,
    Home,
}

/// A mount of the installed system, shared by the installer's own mounts and
/// the generated fstab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMount {
    #[serde(skip)]
    pub source: MountSource,
    pub device: PathBuf,
    pub mount_point: PathBuf,
    pub fs_type: TabFileSystemType,
    pub options: Vec<String>,
}

impl StackPlan {
    pub fn new(storage: &StorageStack, swap: &Swap, data_partition: impl AsRef<Path>) -> Self {
        let mut layers = Vec::new();
        let mut device = data_partition.as_ref().to_path_buf();
        let root_format = VolumeFormat::Filesystem(storage.filesystem);

        if storage.is_encrypted() {
            let opened = encryption::mapper_path(LUKS_MAPPER_NAME);
            layers.push(Layer::Luks {
                device,
                mapping: LUKS_MAPPER_NAME.into(),
                opened: opened.clone(),
            });
            device = opened;
        }

        let home_layout = storage.home_layout();
        let (root, home, swap_volume) = match storage.lvm() {
            Some(lvm) => {
                layers.push(Layer::Lvm {
                    physical_volume: device,
                    volume_group: lvm.volume_group.clone(),
                });

                let remainder = match storage.snapshot_strategy() {
                    SnapshotStrategy::LogicalVolumeRotation { .. } => {
                        LogicalVolumeSize::PercentFree(100 - LVM_SNAPSHOT_RESERVE_PERCENT)
                    }
                    _ => LogicalVolumeSize::PercentFree(100),
                };
                let logical_volume = |name: &'static str, size, format| Volume {
                    device: lvm::lv_path(&lvm.volume_group, name),
                    format,
                    logical_volume: Some(LogicalVolume { name, size }),
                };

                let swap_volume = (storage.swap_layout(swap) == SwapLayout::LogicalVolume)
                    .then(|| {
                        logical_volume(
                            SWAP_VOLUME_NAME,
                            LogicalVolumeSize::Fixed(swap.size),
                            VolumeFormat::Swap,
                        )
                    });
                let root_size = lvm
                    .root_size
                    .map(LogicalVolumeSize::Fixed)
                    .unwrap_or(remainder);
                let root = logical_volume(ROOT_VOLUME_NAME, root_size, root_format);
                let home = (home_layout == HomeLayout::LogicalVolume)
                    .then(|| logical_volume(HOME_VOLUME_NAME, remainder, root_format));
                (root, home, swap_volume)
            }
            None => (
                Volume {
                    device,
                    format: root_format,
                    logical_volume: None,
                },
                None,
                None,
            ),
        };

        layers.push(Layer::Filesystem {
            filesystem: storage.filesystem,
        });

        let swap_subvolume = storage.filesystem == Filesystem::Btrfs
            && storage.swap_layout(swap) == SwapLayout::File;

        Self {
            layers,
            filesystem: storage.filesystem,
            home_layout,
            root,
            home,
            swap: swap_volume,
            swap_subvolume,
        }
    }

    /// Volumes in creation order: swap, root, home.
    pub fn volumes(&self) -> impl Iterator<Item = &Volume> {
        self.swap
            .iter()
            .chain(std::iter::once(&self.root))
            .chain(self.home.iter())
    }

    pub fn volume_group(&self) -> Option<&str> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Lvm { volume_group, .. } => Some(volume_group.as_str()),
            _ => None,
        })
    }

    /// The encrypted partition, when the stack starts with LUKS.
    pub fn luks_device(&self) -> Option<&Path> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Luks { device, .. } => Some(device.as_path()),
            _ => None,
        })
    }

    fn volume_options(&self, subvolume: Option<&str>) -> Vec<String> {
        let mut options = self
            .filesystem
            .mount_options()
            .iter()
            .map(|o| o.to_string())
            .collect::<Vec<_>>();
        if let Some(subvolume) = subvolume {
            options.push(format!("subvol={subvolume}"));
        }
        options
    }

    /// Mounts of the installed system, parents first.
    pub fn mounts(&self, boot_partition: &Path, boot_mount_point: &str) -> Vec<PlannedMount> {
        let fs_type = TabFileSystemType::from(self.filesystem);
        let is_btrfs = self.filesystem == Filesystem::Btrfs;

        let mut mounts = vec![
            PlannedMount {
                source: MountSource::Root,
                device: self.root.device.clone(),
                mount_point: ROOT_MOUNT_POINT_PATH.into(),
                fs_type,
                options: self.volume_options(is_btrfs.then_some(BTRFS_ROOT_SUBVOLUME)),
            },
            PlannedMount {
                source: MountSource::Boot,
                device: boot_partition.to_path_buf(),
                mount_point: boot_mount_point.into(),
                fs_type: TabFileSystemType::Vfat,
                options: vec!["defaults".into(), "umask=0077".into()],
            },
        ];

        match (self.home_layout, &self.home) {
            (HomeLayout::Subvolume, _) => mounts.push(PlannedMount {
                source: MountSource::Root,
                device: self.root.device.clone(),
                mount_point: HOME_MOUNT_POINT_PATH.into(),
                fs_type,
                options: self.volume_options(Some(BTRFS_HOME_SUBVOLUME)),
            }),
            (HomeLayout::LogicalVolume, Some(home)) => mounts.push(PlannedMount {
                source: MountSource::Home,
                device: home.device.clone(),
                mount_point: HOME_MOUNT_POINT_PATH.into(),
                fs_type,
                options: self.volume_options(None),
            }),
            _ => (),
        }

        if self.swap_subvolume {
            mounts.push(PlannedMount {
                source: MountSource::Root,
                device: self.root.device.clone(),
                mount_point: SWAP_MOUNT_POINT_PATH.into(),
                fs_type,
                options: vec![
                    "defaults".into(),
                    "noatime".into(),
                    format!("subvol={BTRFS_SWAP_SUBVOLUME}"),
                ],
            });
        }
        mounts
    }

    /// Btrfs subvolumes created on the root filesystem.
    pub fn subvolumes(&self) -> Vec<&'static str> {
        if self.filesystem != Filesystem::Btrfs {
            return Vec::new();
        }
        let mut subvolumes = vec![BTRFS_ROOT_SUBVOLUME];
        if self.home_layout == HomeLayout::Subvolume {
            subvolumes.push(BTRFS_HOME_SUBVOLUME);
        }
        if self.swap_subvolume {
            subvolumes.push(BTRFS_SWAP_SUBVOLUME);
        }
        subvolumes
    }
}

/// Applies every layer of the plan, recording activations in `session`.
pub(super) fn build(
    plan: &StackPlan,
    passphrase: Option<&Secret>,
    session: &mut StorageSession,
) -> Result<(), VoidstrapError> {
    for layer in &plan.layers {
        info!("Creating storage layer '{}'", layer.name());
        match layer {
            Layer::Luks {
                device, mapping, ..
            } => {
                let passphrase = passphrase
                    .structured(InternalError::Internal("Missing LUKS passphrase"))?;
                encryption::luks_format(device, passphrase)
                    .structured(InstallError::CreateEncryptedVolume)?;
                let opened = encryption::open(device, mapping, passphrase)
                    .structured(InstallError::CreateEncryptedVolume)?;
                session.record(Resource::LuksMapping(mapping.clone()));
                debug!("Opened '{}' at '{}'", device.display(), opened.display());
            }

            Layer::Lvm {
                physical_volume,
                volume_group,
            } => {
                lvm::pvcreate(physical_volume).structured(InstallError::CreateVolumeGroup)?;
                lvm::vgcreate(volume_group, physical_volume)
                    .structured(InstallError::CreateVolumeGroup)?;
                session.record(Resource::VolumeGroup(volume_group.clone()));

                for (volume, logical_volume) in plan
                    .volumes()
                    .filter_map(|v| v.logical_volume.as_ref().map(|lv| (v, lv)))
                {
                    lvm::lvcreate(volume_group, logical_volume.name, logical_volume.size)
                        .structured(InstallError::CreateVolumeGroup)
                        .message(format!(
                            "Failed to create logical volume for '{}'",
                            volume.device.display()
                        ))?;
                }
            }

            Layer::Filesystem { .. } => {
                for volume in plan.volumes() {
                    let formatted = match volume.format {
                        VolumeFormat::Filesystem(filesystem) => mkfs::run(&volume.device, filesystem),
                        VolumeFormat::Swap => mkswap::run(&volume.device),
                    };
                    formatted.structured(InstallError::CreateFilesystem {
                        device: volume.device.display().to_string(),
                    })?;
                }
            }
        }
    }
    Ok(())
}

/// Creates the btrfs subvolumes of the plan on a freshly formatted root.
pub(super) fn create_btrfs_subvolumes(
    plan: &StackPlan,
    scratch_mount: &Path,
    session: &mut StorageSession,
) -> Result<(), VoidstrapError> {
    session
        .mount(&plan.root.device, scratch_mount, TabFileSystemType::Btrfs, &[])
        .structured(InstallError::CreateSubvolumes)?;

    for subvolume in plan.subvolumes() {
        btrfs::create_subvolume(scratch_mount.join(subvolume))
            .structured(InstallError::CreateSubvolumes)?;
    }

    session
        .unmount(scratch_mount)
        .structured(InstallError::CreateSubvolumes)
}

#[cfg(test)]
mod tests {
    use voidstrap_api::{
        config::{Encryption, LvmOptions, VolumeManager},
        primitives::bytes::ByteCount,
    };

    use super::*;

    fn storage(filesystem: Filesystem, encryption: Encryption, lvm: Option<LvmOptions>) -> StorageStack {
        StorageStack {
            filesystem,
            encryption,
            volume_manager: lvm.map(VolumeManager::Lvm).unwrap_or_default(),
            snapshots: false,
        }
    }

    fn swap(enabled: bool) -> Swap {
        Swap {
            enabled,
            ..Default::default()
        }
    }

    #[test]
    fn test_layer_order_for_every_combination() {
        for filesystem in Filesystem::ALL {
            for encryption in [Encryption::None, Encryption::Luks] {
                for lvm in [None, Some(LvmOptions::default())] {
                    let stack = storage(filesystem, encryption, lvm.clone());
                    let plan = StackPlan::new(&stack, &swap(false), "/dev/sda2");

                    let mut expected = Vec::new();
                    if encryption == Encryption::Luks {
                        expected.push("luks");
                    }
                    if lvm.is_some() {
                        expected.push("lvm");
                    }
                    expected.push("filesystem");
                    let names = plan.layers.iter().map(Layer::name).collect::<Vec<_>>();
                    assert_eq!(names, expected, "{stack:?}");

                    let expected_root = match (encryption, lvm.is_some()) {
                        (_, true) => "/dev/void/root",
                        (Encryption::Luks, false) => "/dev/mapper/cryptroot",
                        (Encryption::None, false) => "/dev/sda2",
                    };
                    assert_eq!(plan.root.device, PathBuf::from(expected_root), "{stack:?}");
                    assert_eq!(plan.root.format, VolumeFormat::Filesystem(filesystem));
                }
            }
        }
    }

    #[test]
    fn test_lvm_on_luks_physical_volume() {
        let stack = storage(Filesystem::Xfs, Encryption::Luks, Some(LvmOptions::default()));
        let plan = StackPlan::new(&stack, &swap(false), "/dev/nvme0n1p2");
        assert_eq!(
            plan.layers[..2],
            [
                Layer::Luks {
                    device: "/dev/nvme0n1p2".into(),
                    mapping: "cryptroot".into(),
                    opened: "/dev/mapper/cryptroot".into(),
                },
                Layer::Lvm {
                    physical_volume: "/dev/mapper/cryptroot".into(),
                    volume_group: "void".into(),
                },
            ]
        );
        assert_eq!(plan.volume_group(), Some("void"));
        assert_eq!(plan.luks_device(), Some(Path::new("/dev/nvme0n1p2")));
    }

    #[test]
    fn test_logical_volume_order_and_sizes() {
        let mut stack = storage(
            Filesystem::Ext4,
            Encryption::None,
            Some(LvmOptions {
                root_size: Some(ByteCount(50 << 30)),
                separate_home: true,
                ..Default::default()
            }),
        );
        let plan = StackPlan::new(&stack, &swap(true), "/dev/sda2");
        let volumes = plan
            .volumes()
            .map(|v| {
                let lv = v.logical_volume.as_ref().unwrap();
                (lv.name, lv.size)
            })
            .collect::<Vec<_>>();
        assert_eq!(
            volumes,
            vec![
                ("swap", LogicalVolumeSize::Fixed(ByteCount(4 << 30))),
                ("root", LogicalVolumeSize::Fixed(ByteCount(50 << 30))),
                ("home", LogicalVolumeSize::PercentFree(100)),
            ]
        );
        assert_eq!(plan.swap.as_ref().unwrap().format, VolumeFormat::Swap);
        assert_eq!(plan.home.as_ref().unwrap().device, PathBuf::from("/dev/void/home"));

        // Snapshot volumes need free extents in the group
        stack.snapshots = true;
        let plan = StackPlan::new(&stack, &swap(false), "/dev/sda2");
        assert!(plan.swap.is_none());
        assert_eq!(
            plan.home.unwrap().logical_volume.unwrap().size,
            LogicalVolumeSize::PercentFree(90)
        );

        let mut stack = storage(Filesystem::Xfs, Encryption::None, Some(LvmOptions::default()));
        stack.snapshots = true;
        let plan = StackPlan::new(&stack, &swap(false), "/dev/sda2");
        assert_eq!(
            plan.root.logical_volume.unwrap().size,
            LogicalVolumeSize::PercentFree(90)
        );
    }

    #[test]
    fn test_swap_without_lvm_is_not_a_volume() {
        let stack = storage(Filesystem::Ext4, Encryption::Luks, None);
        let plan = StackPlan::new(&stack, &swap(true), "/dev/sda2");
        assert!(plan.swap.is_none());
        assert_eq!(plan.volumes().count(), 1);
    }

    #[test]
    fn test_mounts_btrfs() {
        let stack = storage(Filesystem::Btrfs, Encryption::Luks, None);
        let plan = StackPlan::new(&stack, &swap(false), "/dev/sda2");
        let mounts = plan.mounts(Path::new("/dev/sda1"), "/boot");

        let summary = mounts
            .iter()
            .map(|m| (m.device.to_str().unwrap(), m.mount_point.to_str().unwrap(), m.options.last().unwrap().as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("/dev/mapper/cryptroot", "/", "subvol=@"),
                ("/dev/sda1", "/boot", "umask=0077"),
                ("/dev/mapper/cryptroot", "/home", "subvol=@home"),
            ]
        );
        assert_eq!(mounts[2].source, MountSource::Root);
        assert!(mounts[0].options.contains(&"compress=zstd".to_string()));
    }

    #[test]
    fn test_mounts_lvm_home() {
        let stack = storage(
            Filesystem::Xfs,
            Encryption::None,
            Some(LvmOptions {
                root_size: Some(ByteCount(20 << 30)),
                separate_home: true,
                ..Default::default()
            }),
        );
        let plan = StackPlan::new(&stack, &swap(false), "/dev/sda3");
        let mounts = plan.mounts(Path::new("/dev/sda2"), "/boot/efi");
        assert_eq!(mounts.len(), 3);
        assert_eq!(mounts[1].mount_point, PathBuf::from("/boot/efi"));
        assert_eq!(mounts[2].source, MountSource::Home);
        assert_eq!(mounts[2].device, PathBuf::from("/dev/void/home"));
        assert_eq!(mounts[2].fs_type, TabFileSystemType::Xfs);
        assert_eq!(mounts[2].options, vec!["defaults", "noatime"]);

        let plan = StackPlan::new(
            &storage(Filesystem::Bcachefs, Encryption::None, None),
            &swap(false),
            "/dev/sda3",
        );
        assert_eq!(plan.mounts(Path::new("/dev/sda2"), "/boot").len(), 2);
    }

    #[test]
    fn test_btrfs_swapfile_gets_own_subvolume() {
        let mut stack = storage(Filesystem::Btrfs, Encryption::None, None);
        stack.snapshots = true;
        let plan = StackPlan::new(&stack, &swap(true), "/dev/sda2");
        assert!(plan.swap_subvolume);
        assert!(plan.swap.is_none());
        assert_eq!(plan.subvolumes(), vec!["@", "@home", "@swap"]);

        let mounts = plan.mounts(Path::new("/dev/sda1"), "/boot");
        let swap_mount = mounts.last().unwrap();
        assert_eq!(swap_mount.mount_point, PathBuf::from("/swap"));
        assert_eq!(swap_mount.device, PathBuf::from("/dev/sda2"));
        assert_eq!(swap_mount.options, vec!["defaults", "noatime", "subvol=@swap"]);

        let plan = StackPlan::new(&stack, &swap(false), "/dev/sda2");
        assert!(!plan.swap_subvolume);
        assert_eq!(plan.subvolumes(), vec!["@", "@home"]);
        assert_eq!(plan.mounts(Path::new("/dev/sda1"), "/boot").len(), 3);

        let ext4 = StackPlan::new(
            &storage(Filesystem::Ext4, Encryption::None, None),
            &swap(true),
            "/dev/sda2",
        );
        assert!(!ext4.swap_subvolume);
        assert!(ext4.subvolumes().is_empty());
    }
}
