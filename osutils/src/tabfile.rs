use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use serde::Serialize;
use strum_macros::IntoStaticStr;

use voidstrap_api::{config::Filesystem, constants::ROOT_MOUNT_POINT_PATH};

/// A representation of a fstab file.
#[derive(Debug, Default)]
pub struct TabFile {
    pub entries: Vec<TabFileEntry>,
}

/// A representation of a single entry in a tab file.
#[derive(Debug, PartialEq, Eq)]
pub struct TabFileEntry {
    pub device: TabDevice,
    pub mount_point: TabMountPoint,
    pub fs_type: TabFileSystemType,
    pub options: Vec<String>,
}

/// A representation of a device in a tab file.
#[derive(Debug, PartialEq, Eq)]
pub enum TabDevice {
    /// Filesystem UUID, rendered as `UUID=<uuid>`.
    Uuid(String),
    Path(PathBuf),
}

/// A representation of a mount point in a tab file.
#[derive(Debug, PartialEq, Eq)]
pub enum TabMountPoint {
    None,
    Path(PathBuf),
}

/// Filesystem types that appear in a generated fstab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TabFileSystemType {
    Ext4,
    Xfs,
    Btrfs,
    Bcachefs,
    Vfat,
    Swap,
}

impl TabFileSystemType {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether boot-time fsck applies. Copy-on-write and journaling
    /// filesystems that repair on mount are skipped.
    fn checked_at_boot(self) -> bool {
        matches!(self, TabFileSystemType::Ext4 | TabFileSystemType::Vfat)
    }
}

impl From<Filesystem> for TabFileSystemType {
    fn from(fs: Filesystem) -> Self {
        match fs {
            Filesystem::Ext4 => TabFileSystemType::Ext4,
            Filesystem::Xfs => TabFileSystemType::Xfs,
            Filesystem::Btrfs => TabFileSystemType::Btrfs,
            Filesystem::Bcachefs => TabFileSystemType::Bcachefs,
        }
    }
}

impl TabFile {
    /// Write this tab file to disk at location `tab_file_path`.
    pub fn write(&self, tab_file_path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(tab_file_path.as_ref(), self.render().as_bytes())
            .with_context(|| format!("Failed to write new {}", tab_file_path.as_ref().display()))
    }

    /// Render this tab file as a string.
    pub fn render(&self) -> String {
        self.entries.iter().map(|entry| entry.render()).collect()
    }
}

impl TabFileEntry {
    /// Create a new regular entry for a device mounted at a path.
    pub fn new_path(
        device: TabDevice,
        mount_point: impl Into<PathBuf>,
        fs_type: TabFileSystemType,
    ) -> Self {
        Self {
            device,
            mount_point: TabMountPoint::Path(mount_point.into()),
            fs_type,
            options: Vec::new(),
        }
    }

    /// Create a new entry for a swap device or file.
    pub fn new_swap(device: TabDevice) -> Self {
        Self {
            device,
            mount_point: TabMountPoint::None,
            fs_type: TabFileSystemType::Swap,
            options: Vec::new(),
        }
    }

    /// Add options to this entry.
    pub fn with_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    fn fsck_pass(&self) -> u8 {
        match self.mount_point {
            _ if !self.fs_type.checked_at_boot() => 0,
            TabMountPoint::None => 0,
            TabMountPoint::Path(ref path) if path == Path::new(ROOT_MOUNT_POINT_PATH) => 1,
            _ => 2,
        }
    }

    /// Render this entry as a string suitable for writing to a tab file.
    pub fn render(&self) -> String {
        // If the options are empty, use "defaults" as the default
        let options = if self.options.is_empty() {
            "defaults".into()
        } else {
            self.options.join(",")
        };

        format!(
            "{} {} {} {} 0 {}\n",
            self.device.render(),
            self.mount_point.render(),
            self.fs_type.name(),
            options,
            self.fsck_pass(),
        )
    }
}

impl TabDevice {
    /// Render this device as a string.
    pub fn render(&self) -> String {
        match self {
            TabDevice::Uuid(uuid) => format!("UUID={uuid}"),
            TabDevice::Path(path) => path.to_string_lossy().to_string(),
        }
    }
}

impl TabMountPoint {
    /// Render this mount point as a string.
    pub fn render(&self) -> String {
        match self {
            TabMountPoint::None => "none".to_string(),
            TabMountPoint::Path(path) => path.to_string_lossy().to_string(),
        }
    }
}
