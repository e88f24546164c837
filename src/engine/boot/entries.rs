use std::{cmp::Ordering, fs, path::Path};

use anyhow::{Context, Error};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;

use osutils::limine::{LimineConfig, LimineEntry};
use voidstrap_api::constants::{BTRFS_ROOT_SUBVOLUME, SNAPSHOTS_MOUNT_POINT_PATH};

use super::cmdline::KernelCmdline;

lazy_static! {
    static ref KERNEL_IMAGE: Regex = Regex::new(r"^vmlinuz-(\d[\w.+-]*)$").unwrap();
}

const INITRAMFS_PREFIX: &str = "initramfs-";
const INITRAMFS_SUFFIX: &str = ".img";

/// A kernel image with its initramfs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledKernel {
    pub version: String,
    pub kernel: String,
    pub initramfs: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootEntry {
    pub title: String,

    /// Paths relative to the root of the boot partition.
    pub kernel_path: String,
    pub initramfs_path: String,

    pub cmdline: KernelCmdline,
}

impl From<&BootEntry> for LimineEntry {
    fn from(entry: &BootEntry) -> Self {
        LimineEntry {
            title: entry.title.clone(),
            kernel_path: entry.kernel_path.clone(),
            module_path: entry.initramfs_path.clone(),
            cmdline: entry.cmdline.to_string(),
        }
    }
}

/// Compares dotted kernel versions such as `6.6.12_1` numerically.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let split = |v: &str| {
        v.split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<u64>().unwrap_or(u64::MAX))
            .collect::<Vec<_>>()
    };
    split(a).cmp(&split(b)).then_with(|| a.cmp(b))
}

/// Finds `vmlinuz-<version>` images in `dir` that have a matching
/// `initramfs-<version>.img`, newest first.
pub fn discover_kernels(dir: &Path) -> Result<Vec<InstalledKernel>, Error> {
    let mut kernels = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to list kernels in '{}'", dir.display()))?
    {
        let name = entry
            .context("Failed to read directory entry")?
            .file_name()
            .to_string_lossy()
            .to_string();
        let Some(version) = KERNEL_IMAGE
            .captures(&name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };

        let initramfs = format!("{INITRAMFS_PREFIX}{version}{INITRAMFS_SUFFIX}");
        if !dir.join(&initramfs).is_file() {
            warn!("Skipping kernel '{name}': '{initramfs}' does not exist");
            continue;
        }

        kernels.push(InstalledKernel {
            version,
            kernel: name.clone(),
            initramfs,
        });
    }

    kernels.sort_by(|a, b| compare_versions(&b.version, &a.version));
    debug!(
        "Found kernels: {:?}",
        kernels.iter().map(|k| &k.version).collect::<Vec<_>>()
    );
    Ok(kernels)
}

/// Returns the numbers of snapper snapshots under `root`, newest first.
pub fn discover_snapshots(root: &Path) -> Vec<u32> {
    let dir = osutils::path::join_relative(root, SNAPSHOTS_MOUNT_POINT_PATH);
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut snapshots = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().join("snapshot").is_dir())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .collect::<Vec<_>>();
    snapshots.sort_unstable_by(|a, b| b.cmp(a));
    snapshots
}

/// Subvolume path of snapper snapshot `number`, relative to the top level.
fn snapshot_subvolume(number: u32) -> String {
    format!("{BTRFS_ROOT_SUBVOLUME}{SNAPSHOTS_MOUNT_POINT_PATH}/{number}/snapshot")
}

/// One entry per kernel, then one per snapshot and kernel.
pub fn build_entries(
    kernels: &[InstalledKernel],
    cmdline: &KernelCmdline,
    snapshots: &[u32],
) -> Vec<BootEntry> {
    let mut entries = kernels
        .iter()
        .map(|kernel| BootEntry {
            title: format!("Void Linux ({})", kernel.version),
            kernel_path: kernel.kernel.clone(),
            initramfs_path: kernel.initramfs.clone(),
            cmdline: cmdline.clone(),
        })
        .collect::<Vec<_>>();

    for &snapshot in snapshots {
        let snapshot_cmdline = cmdline.with_root_subvolume(snapshot_subvolume(snapshot));
        entries.extend(kernels.iter().map(|kernel| BootEntry {
            title: format!("Void Linux snapshot {snapshot} ({})", kernel.version),
            kernel_path: kernel.kernel.clone(),
            initramfs_path: kernel.initramfs.clone(),
            cmdline: snapshot_cmdline.clone(),
        }));
    }
    entries
}

pub fn limine_config(entries: &[BootEntry], timeout: u32) -> LimineConfig {
    LimineConfig {
        timeout,
        default_entry: 1,
        entries: entries.iter().map(LimineEntry::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn boot_dir(files: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"").unwrap();
        }
        dir
    }

    fn cmdline() -> KernelCmdline {
        KernelCmdline {
            root_uuid: "r".into(),
            root_subvolume: Some("@".into()),
            luks_uuid: None,
            volume_group: None,
            zswap: false,
        }
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("6.10.2_1", "6.9.12_1"), Ordering::Greater);
        assert_eq!(compare_versions("6.6.12_1", "6.6.12_2"), Ordering::Less);
        assert_eq!(compare_versions("6.1.0_1", "6.1.0_1"), Ordering::Equal);
    }

    #[test]
    fn test_discover_kernels() {
        let dir = boot_dir(&[
            "vmlinuz-6.6.12_1",
            "initramfs-6.6.12_1.img",
            "vmlinuz-6.10.2_1",
            "initramfs-6.10.2_1.img",
            "vmlinuz-6.1.0_1",
            "vmlinuz-old",
            "initramfs-old.img",
            "config-6.6.12_1",
            "limine.conf",
        ]);
        let kernels = discover_kernels(dir.path()).unwrap();
        assert_eq!(
            kernels,
            vec![
                InstalledKernel {
                    version: "6.10.2_1".into(),
                    kernel: "vmlinuz-6.10.2_1".into(),
                    initramfs: "initramfs-6.10.2_1.img".into(),
                },
                InstalledKernel {
                    version: "6.6.12_1".into(),
                    kernel: "vmlinuz-6.6.12_1".into(),
                    initramfs: "initramfs-6.6.12_1.img".into(),
                },
            ]
        );

        discover_kernels(&dir.path().join("missing")).unwrap_err();
    }

    #[test]
    fn test_entry_per_kernel() {
        let dir = boot_dir(&[
            "vmlinuz-6.6.12_1",
            "initramfs-6.6.12_1.img",
            "vmlinuz-6.1.70_1",
            "initramfs-6.1.70_1.img",
        ]);
        let kernels = discover_kernels(dir.path()).unwrap();
        let entries = build_entries(&kernels, &cmdline(), &[]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Void Linux (6.6.12_1)");
        assert_eq!(entries[1].kernel_path, "vmlinuz-6.1.70_1");
        assert_eq!(entries[1].initramfs_path, "initramfs-6.1.70_1.img");
        for entry in &entries {
            assert!(dir.path().join(&entry.kernel_path).is_file());
            assert!(dir.path().join(&entry.initramfs_path).is_file());
        }
    }

    #[test]
    fn test_entries_with_snapshots() {
        let root = tempfile::tempdir().unwrap();
        for n in [1, 2, 10] {
            fs::create_dir_all(root.path().join(format!(".snapshots/{n}/snapshot"))).unwrap();
        }
        fs::create_dir_all(root.path().join(".snapshots/4")).unwrap();
        let snapshots = discover_snapshots(root.path());
        assert_eq!(snapshots, vec![10, 2, 1]);

        let kernels = discover_kernels(
            boot_dir(&[
                "vmlinuz-6.6.12_1",
                "initramfs-6.6.12_1.img",
                "vmlinuz-6.1.70_1",
                "initramfs-6.1.70_1.img",
            ])
            .path(),
        )
        .unwrap();
        let entries = build_entries(&kernels, &cmdline(), &snapshots);
        assert_eq!(entries.len(), 2 + 2 * 3);
        assert_eq!(entries[2].title, "Void Linux snapshot 10 (6.6.12_1)");
        assert_eq!(
            entries[2].cmdline.root_subvolume.as_deref(),
            Some("@/.snapshots/10/snapshot")
        );
        assert_eq!(entries[0].cmdline.root_subvolume.as_deref(), Some("@"));
    }

    #[test]
    fn test_no_snapshot_directory() {
        let root = tempfile::tempdir().unwrap();
        assert!(discover_snapshots(root.path()).is_empty());
    }

    #[test]
    fn test_limine_config() {
        let kernels = vec![InstalledKernel {
            version: "6.6.12_1".into(),
            kernel: "vmlinuz-6.6.12_1".into(),
            initramfs: "initramfs-6.6.12_1.img".into(),
        }];
        let config = limine_config(&build_entries(&kernels, &cmdline(), &[]), 5);
        assert_eq!(
            config.to_string(),
            "timeout: 5\n\
             default_entry: 1\n\
             \n\
             /Void Linux (6.6.12_1)\n\
            \x20   protocol: linux\n\
            \x20   kernel_path: boot():/vmlinuz-6.6.12_1\n\
            \x20   module_path: boot():/initramfs-6.6.12_1.img\n\
            \x20   cmdline: root=UUID=r rw rootflags=subvol=@ loglevel=4\n"
        );
    }
}
