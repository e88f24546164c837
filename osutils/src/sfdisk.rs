use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use serde::Deserialize;

use sysdefs::partition_types::GptPartitionType;

use crate::dependencies::Dependency;

/// One partition line of an sfdisk script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPartition {
    /// Size in MiB; `None` takes the rest of the disk.
    pub size_mib: Option<u64>,
    pub partition_type: GptPartitionType,
    pub name: &'static str,
}

/// An sfdisk input script creating a fresh GPT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfdiskScript {
    pub partitions: Vec<ScriptPartition>,
}

impl Display for SfdiskScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "label: gpt")?;
        writeln!(f)?;
        for partition in &self.partitions {
            if let Some(size) = partition.size_mib {
                write!(f, "size={size}MiB, ")?;
            }
            writeln!(
                f,
                "type={}, name=\"{}\"",
                partition.partition_type.guid(),
                partition.name
            )?;
        }
        Ok(())
    }
}

impl SfdiskScript {
    /// Writes the partition table to `disk`, replacing any existing one.
    pub fn apply(&self, disk: impl AsRef<Path>) -> Result<(), Error> {
        Dependency::Sfdisk
            .cmd()
            .arg("--wipe")
            .arg("always")
            .arg(disk.as_ref())
            .stdin(self.to_string())
            .run_and_check()
            .with_context(|| {
                format!(
                    "Failed to write partition table to '{}'",
                    disk.as_ref().display()
                )
            })
    }
}

#[derive(Debug, PartialEq, Deserialize)]
struct SfdiskOutput {
    partitiontable: SfDisk,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct SfDisk {
    /// Disk label type
    pub label: SfDiskLabel,

    /// Disk device path
    pub device: PathBuf,

    /// Sector size
    #[serde(default = "SfDisk::default_sectorsize")]
    pub sectorsize: u64,

    /// List of partitions
    #[serde(default)]
    pub partitions: Vec<SfPartition>,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Clone)]
pub struct SfPartition {
    /// Partition device path
    pub node: PathBuf,

    /// Partition start offset
    pub start: u64,

    /// Partition size in sectors
    pub size: u64,

    /// Partition type GUID
    #[serde(rename = "type")]
    pub partition_type: String,

    /// Partition name
    pub name: Option<String>,
}

#[derive(Debug, PartialEq, Deserialize)]
pub enum SfDiskLabel {
    #[serde(rename = "gpt")]
    Gpt,

    /// Master Boot Record
    #[serde(rename = "mbr", alias = "dos")]
    Mbr,
}

impl SfDisk {
    fn default_sectorsize() -> u64 {
        512
    }

    /// Reads the partition table of a disk.
    pub fn get_info(disk: impl AsRef<Path>) -> Result<Self, Error> {
        let sfdisk_output_json = Dependency::Sfdisk
            .cmd()
            .arg("-J")
            .arg(disk.as_ref())
            .output_and_check()
            .with_context(|| {
                format!(
                    "Failed to fetch disk information for {}",
                    disk.as_ref().display()
                )
            })?;

        SfDisk::parse_sfdisk_output(&sfdisk_output_json).with_context(|| {
            format!(
                "Failed to extract disk information for {}",
                disk.as_ref().display()
            )
        })
    }

    fn parse_sfdisk_output(output: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str::<SfdiskOutput>(output)
            .context("Failed to parse disk information")?
            .partitiontable)
    }

    /// Whether the table is GPT and its partitions carry exactly the given
    /// types, in order.
    pub fn matches_layout(&self, types: &[GptPartitionType]) -> bool {
        self.label == SfDiskLabel::Gpt
            && self.partitions.len() == types.len()
            && self
                .partitions
                .iter()
                .zip(types)
                .all(|(p, t)| p.partition_type.eq_ignore_ascii_case(t.guid()))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_render_script() {
        let script = SfdiskScript {
            partitions: vec![
                ScriptPartition {
                    size_mib: Some(1),
                    partition_type: GptPartitionType::BiosBoot,
                    name: "bios",
                },
                ScriptPartition {
                    size_mib: Some(1024),
                    partition_type: GptPartitionType::Esp,
                    name: "boot",
                },
                ScriptPartition {
                    size_mib: None,
                    partition_type: GptPartitionType::LinuxFilesystem,
                    name: "data",
                },
            ],
        };

        assert_eq!(
            script.to_string(),
            indoc! {r#"
                label: gpt

                size=1MiB, type=21686148-6449-6E6F-744E-656564454649, name="bios"
                size=1024MiB, type=C12A7328-F81F-11D2-BA4B-00A0C93EC93B, name="boot"
                type=0FC63DAF-8483-4772-8E79-3D69D8477DE4, name="data"
            "#}
        );
    }

    #[test]
    fn test_parse_disk() {
        let sfdisk_output_json = r#"
        {
            "partitiontable": {
               "label": "gpt",
               "id": "3E6494F9-91E1-426B-A25A-0A8101E464A4",
               "device": "/dev/nvme0n1",
               "unit": "sectors",
               "firstlba": 34,
               "lastlba": 266338270,
               "sectorsize": 512,
               "partitions": [
                  {
                     "node": "/dev/nvme0n1p1",
                     "start": 2048,
                     "size": 2097152,
                     "type": "C12A7328-F81F-11D2-BA4B-00A0C93EC93B",
                     "uuid": "F764E91F-9D15-4F6E-8508-0AFC1D0DF0B5",
                     "name": "esp"
                  },{
                     "node": "/dev/nvme0n1p2",
                     "start": 2099200,
                     "size": 264239071,
                     "type": "0fc63daf-8483-4772-8e79-3d69d8477de4",
                     "uuid": "4D8C2A88-1411-4021-804D-EB8C40F054AA",
                     "name": "data"
                  }
               ]
            }
         }
         "#;
        let parsed = SfDisk::parse_sfdisk_output(sfdisk_output_json).unwrap();
        assert_eq!(parsed.label, SfDiskLabel::Gpt);
        assert_eq!(parsed.device, PathBuf::from("/dev/nvme0n1"));
        assert_eq!(parsed.partitions.len(), 2);
        assert_eq!(parsed.partitions[1].node, PathBuf::from("/dev/nvme0n1p2"));
        assert_eq!(parsed.partitions[0].name.as_deref(), Some("esp"));

        assert!(parsed.matches_layout(&[
            GptPartitionType::Esp,
            GptPartitionType::LinuxFilesystem
        ]));
        assert!(!parsed.matches_layout(&[GptPartitionType::Esp]));
        assert!(!parsed.matches_layout(&[
            GptPartitionType::BiosBoot,
            GptPartitionType::LinuxFilesystem
        ]));

        // dos label
        let parsed = SfDisk::parse_sfdisk_output(
            r#"{"partitiontable": {"label": "dos", "device": "/dev/sda"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.label, SfDiskLabel::Mbr);
        assert!(parsed.partitions.is_empty());
        assert!(!parsed.matches_layout(&[]));

        // missing device
        SfDisk::parse_sfdisk_output(r#"{"partitiontable": {"label": "gpt"}}"#).unwrap_err();
    }
}
