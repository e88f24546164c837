use std::path::Path;

use anyhow::{bail, Context, Error};
use lazy_static::lazy_static;
use regex::Regex;

use crate::dependencies::{Command, Dependency};

/// Represents an entry in the EFI Boot Manager.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EfiBootEntry {
    /// The identifier for the boot entry.
    pub id: String,

    /// The label or description of the boot entry.
    pub label: String,
}

// Represents the output of the EFI Boot Manager.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EfiBootManagerOutput {
    /// The currently active boot entry.
    pub boot_current: String,

    /// The order in which boot entries are attempted.
    pub boot_order: Vec<String>,

    /// List of EFI boot entries with their associated information.
    pub boot_entries: Vec<EfiBootEntry>,
}

lazy_static! {
    static ref BOOT_ENTRY: Regex = Regex::new(r"^Boot([0-9a-fA-F]{4})(\*?) ([^\t]+)\t?").unwrap();
}

impl EfiBootManagerOutput {
    pub fn parse_efibootmgr_output(output: &str) -> Result<Self, Error> {
        let mut boot_manager_output = EfiBootManagerOutput::default();

        for line in output.lines() {
            if let Some(value) = line.strip_prefix("BootCurrent:") {
                boot_manager_output.boot_current = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("BootOrder:") {
                boot_manager_output.boot_order =
                    value.split(',').map(|s| s.trim().to_string()).collect();
            } else if line.starts_with("BootNext:") {
                continue;
            } else if line.starts_with("Boot") {
                let Some(captures) = BOOT_ENTRY.captures(line.trim()) else {
                    bail!("Error splitting efibootmgr output line '{line}'");
                };
                let id = captures
                    .get(1)
                    .context("failed to parse boot entry number")?
                    .as_str()
                    .to_string();
                let label = captures
                    .get(3)
                    .context("failed to parse boot entry name")?
                    .as_str()
                    .trim()
                    .to_string();
                boot_manager_output
                    .boot_entries
                    .push(EfiBootEntry { id, label });
            }
        }
        Ok(boot_manager_output)
    }

    /// Checks if a boot entry with the entry label already exists.
    pub fn boot_entry_exists(&self, entry_label: &str) -> bool {
        self.boot_entries
            .iter()
            .any(|entry| entry.label == entry_label)
    }
}

/// Lists boot entries using efibootmgr
pub fn list_and_parse_bootmgr_entries() -> Result<EfiBootManagerOutput, Error> {
    let output = Dependency::Efibootmgr
        .cmd()
        .output_and_check()
        .context("Efibootmgr exited with an error")?;
    EfiBootManagerOutput::parse_efibootmgr_output(&output)
        .context("Failed to parse efibootmgr output")
}

fn create_command(entry_label: &str, disk_path: &Path, partition: u32, loader: &str) -> Command {
    let mut cmd = Dependency::Efibootmgr.cmd();
    cmd.arg("--create")
        .arg("--disk")
        .arg(disk_path)
        .arg("--part")
        .arg(partition.to_string())
        .arg("--label")
        .arg(entry_label)
        .arg("--loader")
        .arg(loader);
    cmd
}

/// Adds a firmware boot entry for `loader` (an ESP-relative path with
/// backslashes) on partition `partition` of `disk_path`.
pub fn create_boot_entry(
    entry_label: &str,
    disk_path: impl AsRef<Path>,
    partition: u32,
    loader: &str,
) -> Result<(), Error> {
    create_command(entry_label, disk_path.as_ref(), partition, loader)
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to add boot entry '{}' at disk path {} through efibootmgr",
                entry_label,
                disk_path.as_ref().display()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use indoc::indoc;

    #[test]
    fn test_boot_mgr() {
        let sample_output = indoc! {"
            BootNext: 0000
            BootCurrent: 0001
            Timeout: 0 seconds
            BootOrder: 0001,0000,0002,000A
            Boot0000  Windows Boot Manager
            Boot0001* Void Linux\tHD(1,GPT,f764e91f-9d15-4f6e-8508-0afc1d0df0b5)/File(\\EFI\\BOOT\\BOOTX64.EFI)
            Boot0002* UEFI: Built-in EFI Shell
            Boot000A* Mariner
        "};

        let bootmgr_output = EfiBootManagerOutput::parse_efibootmgr_output(sample_output).unwrap();

        assert_eq!(bootmgr_output.boot_current, "0001");
        assert_eq!(
            bootmgr_output.boot_order,
            vec!["0001", "0000", "0002", "000A"]
        );
        assert_eq!(
            bootmgr_output.boot_entries[1],
            EfiBootEntry {
                id: "0001".into(),
                label: "Void Linux".into()
            }
        );
        assert_eq!(bootmgr_output.boot_entries.len(), 4);
        assert!(bootmgr_output.boot_entry_exists("Void Linux"));
        assert!(!bootmgr_output.boot_entry_exists("Void"));

        EfiBootManagerOutput::parse_efibootmgr_output("BootXYZ garbage").unwrap_err();
    }

    #[test]
    fn test_create_command() {
        assert_eq!(
            create_command(
                "Void Linux",
                Path::new("/dev/nvme0n1"),
                1,
                "\\EFI\\BOOT\\BOOTX64.EFI"
            )
            .render_command(),
            "efibootmgr --create --disk /dev/nvme0n1 --part 1 --label 'Void Linux' --loader \\EFI\\BOOT\\BOOTX64.EFI"
        );
    }
}
