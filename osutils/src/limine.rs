use std::{
    fmt::{self, Display},
    path::Path,
};

use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// One menu entry of `limine.conf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimineEntry {
    pub title: String,

    /// Kernel path relative to the boot partition root.
    pub kernel_path: String,

    /// Initramfs path relative to the boot partition root.
    pub module_path: String,

    pub cmdline: String,
}

/// A `limine.conf` with a single level of Linux entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimineConfig {
    /// Menu timeout in seconds.
    pub timeout: u32,

    /// 1-based index of the entry booted by default.
    pub default_entry: usize,

    pub entries: Vec<LimineEntry>,
}

impl Display for LimineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timeout: {}", self.timeout)?;
        writeln!(f, "default_entry: {}", self.default_entry)?;
        for entry in &self.entries {
            writeln!(f)?;
            writeln!(f, "/{}", entry.title)?;
            writeln!(f, "    protocol: linux")?;
            writeln!(f, "    kernel_path: boot():/{}", entry.kernel_path)?;
            writeln!(f, "    module_path: boot():/{}", entry.module_path)?;
            writeln!(f, "    cmdline: {}", entry.cmdline)?;
        }
        Ok(())
    }
}

/// Installs the BIOS stages into the post-MBR gap / BIOS boot partition of
/// `disk`.
pub fn bios_install(disk: impl AsRef<Path>) -> Result<(), Error> {
    Dependency::Limine
        .cmd()
        .arg("bios-install")
        .arg(disk.as_ref())
        .run_and_check()
        .with_context(|| {
            format!(
                "Failed to install Limine BIOS stages to '{}'",
                disk.as_ref().display()
            )
        })
}
