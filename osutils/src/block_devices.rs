use std::{
    fs,
    os::unix::fs::FileTypeExt,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Error};

/// Derives the device path of partition `number` on `disk`.
///
/// Disk names ending in a digit (`nvme0n1`, `mmcblk0`, `loop0`) separate the
/// partition number with a `p`; all others append it directly (`sda2`).
pub fn partition_path(disk: impl AsRef<Path>, number: u32) -> PathBuf {
    let disk = disk.as_ref().as_os_str().to_string_lossy();
    if disk.ends_with(|c: char| c.is_ascii_digit()) {
        PathBuf::from(format!("{disk}p{number}"))
    } else {
        PathBuf::from(format!("{disk}{number}"))
    }
}

/// Ensures that `path` exists and refers to a block device.
pub fn ensure_block_device(path: impl AsRef<Path>) -> Result<(), Error> {
    let metadata = fs::metadata(path.as_ref())
        .with_context(|| format!("Failed to stat '{}'", path.as_ref().display()))?;
    ensure!(
        metadata.file_type().is_block_device(),
        "'{}' is not a block device",
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_path() {
        assert_eq!(partition_path("/dev/sda", 2), Path::new("/dev/sda2"));
        assert_eq!(partition_path("/dev/vdb", 1), Path::new("/dev/vdb1"));
        assert_eq!(partition_path("/dev/nvme0n1", 2), Path::new("/dev/nvme0n1p2"));
        assert_eq!(partition_path("/dev/mmcblk0", 1), Path::new("/dev/mmcblk0p1"));
        assert_eq!(partition_path("/dev/loop0", 3), Path::new("/dev/loop0p3"));
        assert_eq!(partition_path("/dev/sda", 12), Path::new("/dev/sda12"));
    }

    #[test]
    fn test_ensure_block_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let error = ensure_block_device(file.path()).unwrap_err();
        assert!(error.to_string().ends_with("is not a block device"));

        ensure_block_device("/dev/does-not-exist").unwrap_err();
    }
}
