//! Makes sure every external tool the installation calls on the live system
//! is present, installing the providing packages when they are not.

use std::collections::BTreeSet;

use anyhow::Error;
use log::{debug, info};

use osutils::{dependencies::Dependency, xbps::XbpsInstall};
use voidstrap_api::{
    config::{Filesystem, Firmware, InstallConfiguration, SwapLayout},
    error::{ReportError, ToolingError, VoidstrapError},
};

/// Answers whether a tool can be run on the host.
pub trait ToolProbe {
    fn is_available(&self, tool: Dependency) -> bool;
}

/// Installs packages onto the host.
pub trait PackageInstaller {
    fn install(&self, packages: &[&'static str]) -> Result<(), Error>;
}

/// Looks tools up in `PATH`.
pub struct HostProbe;

impl ToolProbe for HostProbe {
    fn is_available(&self, tool: Dependency) -> bool {
        tool.exists()
    }
}

/// Installs packages with the host's `xbps-install` from `repository`.
pub struct XbpsHostInstaller {
    repository: String,
}

impl XbpsHostInstaller {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
        }
    }
}

impl PackageInstaller for XbpsHostInstaller {
    fn install(&self, packages: &[&'static str]) -> Result<(), Error> {
        XbpsInstall::new(packages.iter().copied())
            .repository(&self.repository)
            .run()
    }
}

/// Tools the installation runs on the live system for `config`.
pub fn required_tools(config: &InstallConfiguration, firmware: Firmware) -> BTreeSet<Dependency> {
    let mut tools: BTreeSet<_> = [
        Dependency::Sfdisk,
        Dependency::Wipefs,
        Dependency::Udevadm,
        Dependency::MkfsVfat,
        Dependency::Blkid,
        Dependency::Mount,
        Dependency::Umount,
        Dependency::XbpsInstall,
    ]
    .into_iter()
    .collect();

    let storage = &config.storage;
    match storage.filesystem {
        Filesystem::Ext4 => {
            tools.insert(Dependency::MkfsExt4);
        }
        Filesystem::Xfs => {
            tools.insert(Dependency::MkfsXfs);
        }
        Filesystem::Btrfs => {
            tools.extend([Dependency::MkfsBtrfs, Dependency::Btrfs]);
        }
        Filesystem::Bcachefs => {
            tools.insert(Dependency::Bcachefs);
        }
    }

    if storage.is_encrypted() {
        tools.insert(Dependency::Cryptsetup);
    }

    if storage.lvm().is_some() {
        tools.extend([
            Dependency::Pvcreate,
            Dependency::Vgcreate,
            Dependency::Lvcreate,
            Dependency::Vgchange,
        ]);
    }

    if matches!(
        storage.swap_layout(&config.swap),
        SwapLayout::LogicalVolume | SwapLayout::File
    ) {
        tools.insert(Dependency::Mkswap);
    }

    if firmware == Firmware::Uefi {
        tools.insert(Dependency::Efibootmgr);
    }

    tools
}

/// Void package providing `tool`.
pub fn providing_package(tool: Dependency) -> &'static str {
    match tool {
        Dependency::Sfdisk
        | Dependency::Wipefs
        | Dependency::Blkid
        | Dependency::Mount
        | Dependency::Umount
        | Dependency::Mkswap => "util-linux",
        Dependency::Udevadm => "eudev",
        Dependency::MkfsVfat => "dosfstools",
        Dependency::MkfsExt4 => "e2fsprogs",
        Dependency::MkfsXfs => "xfsprogs",
        Dependency::MkfsBtrfs | Dependency::Btrfs => "btrfs-progs",
        Dependency::Bcachefs => "bcachefs-tools",
        Dependency::Cryptsetup => "cryptsetup",
        Dependency::Pvcreate
        | Dependency::Vgcreate
        | Dependency::Lvcreate
        | Dependency::Lvremove
        | Dependency::Lvs
        | Dependency::Vgchange => "lvm2",
        Dependency::Efibootmgr => "efibootmgr",
        Dependency::Limine => "limine",
        Dependency::Chpasswd | Dependency::Useradd => "shadow",
        Dependency::XbpsInstall | Dependency::XbpsReconfigure => "xbps",
    }
}

/// Installs the packages providing missing tools, once, then checks again.
/// A tool still missing after that is fatal.
pub fn ensure_tools(
    required: &BTreeSet<Dependency>,
    probe: &impl ToolProbe,
    installer: &impl PackageInstaller,
) -> Result<(), VoidstrapError> {
    let missing: Vec<_> = required
        .iter()
        .copied()
        .filter(|tool| !probe.is_available(*tool))
        .collect();
    if missing.is_empty() {
        debug!("All {} required tools are available", required.len());
        return Ok(());
    }

    let packages: Vec<_> = missing
        .iter()
        .map(|tool| providing_package(*tool))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    info!(
        "Missing tools {}, installing {}",
        missing
            .iter()
            .map(Dependency::name)
            .collect::<Vec<_>>()
            .join(", "),
        packages.join(", ")
    );
    installer
        .install(&packages)
        .structured(ToolingError::InstallTools)?;

    if let Some(tool) = missing.into_iter().find(|tool| !probe.is_available(*tool)) {
        return Err(VoidstrapError::new(ToolingError::MissingTool {
            tool: tool.name().into(),
        }));
    }
    Ok(())
}

/// Checks and, where needed, installs the host tools for `config`.
pub(crate) fn check(config: &InstallConfiguration, firmware: Firmware) -> Result<(), VoidstrapError> {
    ensure_tools(
        &required_tools(config, firmware),
        &HostProbe,
        &XbpsHostInstaller::new(&config.repository),
    )
}
