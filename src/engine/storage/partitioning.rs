use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Error};
use log::{debug, info};
use serde::Serialize;

use osutils::{
    block_devices,
    sfdisk::{ScriptPartition, SfDisk, SfdiskScript},
    udevadm, wipefs,
};
use sysdefs::partition_types::GptPartitionType;
use voidstrap_api::{config::Firmware, primitives::bytes::ByteCount};

/// Size of the BIOS boot partition holding Limine's stage 2.
const BIOS_BOOT_SIZE_MIB: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionRole {
    /// Raw BIOS boot partition (BIOS only).
    BiosBoot,

    /// FAT32 partition holding the bootloader, its configuration and, unless
    /// kept separate, the kernels. The ESP on UEFI.
    Boot,

    /// Everything else: the storage stack lives here.
    Data,
}

impl PartitionRole {
    fn label(self) -> &'static str {
        match self {
            PartitionRole::BiosBoot => "bios",
            PartitionRole::Boot => "boot",
            PartitionRole::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPartition {
    pub number: u32,
    pub role: PartitionRole,

    /// `None` takes the rest of the disk.
    pub size: Option<ByteCount>,

    pub partition_type: GptPartitionType,

    pub path: PathBuf,
}

/// GPT layout written to the target disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionPlan {
    pub disk: PathBuf,
    pub partitions: Vec<PlannedPartition>,
}

impl PartitionPlan {
    pub fn new(disk: impl AsRef<Path>, firmware: Firmware, esp_size: ByteCount) -> Self {
        let layout: &[(PartitionRole, Option<ByteCount>, GptPartitionType)] = match firmware {
            Firmware::Uefi => &[
                (PartitionRole::Boot, Some(esp_size), GptPartitionType::Esp),
                (PartitionRole::Data, None, GptPartitionType::LinuxFilesystem),
            ],
            Firmware::Bios => &[
                (
                    PartitionRole::BiosBoot,
                    Some(ByteCount::from_mebibytes(BIOS_BOOT_SIZE_MIB)),
                    GptPartitionType::BiosBoot,
                ),
                (PartitionRole::Boot, Some(esp_size), GptPartitionType::Esp),
                (PartitionRole::Data, None, GptPartitionType::LinuxFilesystem),
            ],
        };

        let disk = disk.as_ref().to_path_buf();
        let partitions = layout
            .iter()
            .zip(1..)
            .map(|(&(role, size, partition_type), number)| PlannedPartition {
                number,
                role,
                size,
                partition_type,
                path: block_devices::partition_path(&disk, number),
            })
            .collect();

        Self { disk, partitions }
    }

    /// Returns the partition with the given role, if the layout has one.
    pub fn get(&self, role: PartitionRole) -> Option<&PlannedPartition> {
        self.partitions.iter().find(|p| p.role == role)
    }

    pub fn boot(&self) -> &PlannedPartition {
        self.by_role(PartitionRole::Boot)
    }

    pub fn data(&self) -> &PlannedPartition {
        self.by_role(PartitionRole::Data)
    }

    fn by_role(&self, role: PartitionRole) -> &PlannedPartition {
        // Every layout built by `new` has a boot and a data partition
        self.get(role)
            .unwrap_or_else(|| unreachable!("partition plan without a {role:?} partition"))
    }

    pub fn script(&self) -> SfdiskScript {
        SfdiskScript {
            partitions: self
                .partitions
                .iter()
                .map(|p| ScriptPartition {
                    size_mib: p.size.map(ByteCount::mebibytes),
                    partition_type: p.partition_type,
                    name: p.role.label(),
                })
                .collect(),
        }
    }

    fn partition_types(&self) -> Vec<GptPartitionType> {
        self.partitions.iter().map(|p| p.partition_type).collect()
    }
}

/// Wipes all signatures from the disk.
pub(super) fn wipe_disk(plan: &PartitionPlan) -> Result<(), Error> {
    info!("Wiping existing signatures from '{}'", plan.disk.display());
    wipefs::all(&plan.disk)
}

/// Writes the partition table and waits for the partition nodes.
pub(super) fn create_partitions(plan: &PartitionPlan) -> Result<(), Error> {
    info!(
        "Creating {} partitions on '{}'",
        plan.partitions.len(),
        plan.disk.display()
    );
    let script = plan.script();
    debug!("Partition script:\n{script}");
    script.apply(&plan.disk)?;
    udevadm::settle()?;

    let table = SfDisk::get_info(&plan.disk)?;
    ensure!(
        table.matches_layout(&plan.partition_types()),
        "Partition table of '{}' does not match the requested layout",
        plan.disk.display()
    );

    for partition in &plan.partitions {
        block_devices::ensure_block_device(&partition.path).with_context(|| {
            format!("Partition {} did not appear after partitioning", partition.number)
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uefi_layout() {
        let plan = PartitionPlan::new("/dev/nvme0n1", Firmware::Uefi, ByteCount::from_mebibytes(1024));
        assert_eq!(
            plan.partitions,
            vec![
                PlannedPartition {
                    number: 1,
                    role: PartitionRole::Boot,
                    size: Some(ByteCount(1 << 30)),
                    partition_type: GptPartitionType::Esp,
                    path: PathBuf::from("/dev/nvme0n1p1"),
                },
                PlannedPartition {
                    number: 2,
                    role: PartitionRole::Data,
                    size: None,
                    partition_type: GptPartitionType::LinuxFilesystem,
                    path: PathBuf::from("/dev/nvme0n1p2"),
                },
            ]
        );
        assert!(plan.get(PartitionRole::BiosBoot).is_none());
        assert_eq!(plan.data().path, PathBuf::from("/dev/nvme0n1p2"));
    }

    #[test]
    fn test_bios_layout() {
        let plan = PartitionPlan::new("/dev/sda", Firmware::Bios, ByteCount::from_mebibytes(512));
        let roles = plan.partitions.iter().map(|p| p.role).collect::<Vec<_>>();
        assert_eq!(
            roles,
            [PartitionRole::BiosBoot, PartitionRole::Boot, PartitionRole::Data]
        );
        assert_eq!(
            plan.get(PartitionRole::BiosBoot).unwrap().size,
            Some(ByteCount(1 << 20))
        );
        assert_eq!(plan.boot().path, PathBuf::from("/dev/sda2"));
        assert_eq!(plan.data().path, PathBuf::from("/dev/sda3"));
        assert_eq!(plan.data().number, 3);
    }

    #[test]
    fn test_partition_paths_follow_device_naming() {
        for (disk, data) in [
            ("/dev/sda", "/dev/sda2"),
            ("/dev/vdb", "/dev/vdb2"),
            ("/dev/nvme0n1", "/dev/nvme0n1p2"),
            ("/dev/mmcblk0", "/dev/mmcblk0p2"),
            ("/dev/loop7", "/dev/loop7p2"),
        ] {
            let plan = PartitionPlan::new(disk, Firmware::Uefi, ByteCount::from_mebibytes(1024));
            assert_eq!(plan.data().path, PathBuf::from(data), "disk {disk}");
        }
    }

    #[test]
    fn test_script() {
        let plan = PartitionPlan::new("/dev/sda", Firmware::Uefi, ByteCount::from_mebibytes(1024));
        assert_eq!(
            plan.script().to_string(),
            "label: gpt\n\n\
             size=1024MiB, type=C12A7328-F81F-11D2-BA4B-00A0C93EC93B, name=\"boot\"\n\
             type=0FC63DAF-8483-4772-8E79-3D69D8477DE4, name=\"data\"\n"
        );
    }
}
