use std::path::{Path, PathBuf};

use osutils::path::join_relative;
use sysdefs::arch::SystemArchitecture;
use voidstrap_api::{
    config::{BootLayout, Firmware, InstallConfiguration},
    constants::{BOOT_MOUNT_POINT_PATH, ESP_SEPARATE_MOUNT_POINT_PATH, TARGET_ROOT_PATH},
    primitives::secret::Credentials,
};

use super::{
    boot::cmdline::KernelCmdline,
    storage::{
        partitioning::PartitionPlan,
        stack::{PlannedMount, StackPlan},
        VolumeUuids,
    },
};

/// Per-run state of an install: the immutable configuration plus everything
/// derived from it or discovered while provisioning.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub config: InstallConfiguration,

    pub credentials: Credentials,

    /// Firmware interface after detection.
    pub firmware: Firmware,

    pub architecture: SystemArchitecture,

    /// Where the target root is mounted on the live system.
    pub target_root: PathBuf,

    pub partitions: PartitionPlan,

    pub stack: StackPlan,

    /// Filled in once the stack has been formatted.
    pub uuids: VolumeUuids,
}

impl EngineContext {
    pub fn new(config: InstallConfiguration, credentials: Credentials, firmware: Firmware) -> Self {
        let partitions = PartitionPlan::new(&config.disk, firmware, config.esp_size());
        let stack = StackPlan::new(&config.storage, &config.swap, &partitions.data().path);
        Self {
            architecture: config.architecture(),
            config,
            credentials,
            firmware,
            target_root: TARGET_ROOT_PATH.into(),
            partitions,
            stack,
            uuids: VolumeUuids::default(),
        }
    }

    /// Mount point of the FAT boot partition inside the target.
    pub fn boot_mount_point(&self) -> &'static str {
        match self.config.boot_layout {
            BootLayout::EspAsBoot => BOOT_MOUNT_POINT_PATH,
            BootLayout::SeparateEsp => ESP_SEPARATE_MOUNT_POINT_PATH,
        }
    }

    pub fn mounts(&self) -> Vec<PlannedMount> {
        self.stack
            .mounts(&self.partitions.boot().path, self.boot_mount_point())
    }

    /// Path of `path` (absolute in the installed system) on the live system.
    pub fn target_path(&self, path: impl AsRef<Path>) -> PathBuf {
        join_relative(&self.target_root, path)
    }

    pub fn kernel_cmdline(&self) -> KernelCmdline {
        KernelCmdline::new(&self.config.storage, &self.config.swap, &self.uuids)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use voidstrap_api::config::Filesystem;

    use super::*;

    /// A validated configuration for `disk` with the given filesystem.
    pub(crate) fn config(disk: &str, filesystem: Filesystem) -> InstallConfiguration {
        let config = InstallConfiguration::from_yaml(&format!(
            "disk: {disk}\nhostname: void\ntimezone: UTC\nusername: alice\nstorage:\n  filesystem: {}\n",
            filesystem.name()
        ))
        .unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn test_new() {
        let mut config = config("/dev/nvme0n1", Filesystem::Ext4);
        config.boot_layout = BootLayout::SeparateEsp;
        let ctx = EngineContext::new(config, Credentials::default(), Firmware::Uefi);

        assert_eq!(ctx.partitions.data().path, PathBuf::from("/dev/nvme0n1p2"));
        assert_eq!(ctx.stack.root.device, PathBuf::from("/dev/nvme0n1p2"));
        assert_eq!(ctx.boot_mount_point(), "/boot/efi");
        assert_eq!(
            ctx.target_path("/etc/fstab"),
            PathBuf::from("/mnt/etc/fstab")
        );
        assert_eq!(ctx.mounts()[1].device, PathBuf::from("/dev/nvme0n1p1"));
    }
}
