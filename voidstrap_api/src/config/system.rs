use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use sysdefs::arch::Libc;

/// Firmware interface used to boot the installed system.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Firmware {
    Uefi,
    Bios,
}

impl Firmware {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Where the ESP (or BIOS boot partition) is mounted in the target.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum BootLayout {
    /// The FAT partition is mounted at /boot and holds kernels directly.
    #[default]
    EspAsBoot,

    /// The FAT partition is mounted at /boot/efi; kernels stay on the root
    /// filesystem and are copied to the ESP by a kernel hook.
    SeparateEsp,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    #[default]
    Mainline,
    Lts,
    Both,
}

impl Kernel {
    /// Kernel packages, in install order.
    pub fn packages(self) -> &'static [&'static str] {
        match self {
            Kernel::Mainline => &["linux"],
            Kernel::Lts => &["linux-lts"],
            Kernel::Both => &["linux", "linux-lts"],
        }
    }

    /// Header packages matching [`Kernel::packages`].
    pub fn header_packages(self) -> &'static [&'static str] {
        match self {
            Kernel::Mainline => &["linux-headers"],
            Kernel::Lts => &["linux-lts-headers"],
            Kernel::Both => &["linux-headers", "linux-lts-headers"],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gpu {
    #[default]
    Generic,
    Nvidia,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeTool {
    #[default]
    Sudo,
    Doas,
}

impl PrivilegeTool {
    pub fn package(self) -> &'static str {
        match self {
            PrivilegeTool::Sudo => "sudo",
            PrivilegeTool::Doas => "opendoas",
        }
    }
}

/// Repository packages enabling additional repositories.
pub fn repository_packages(libc: Libc, multilib_capable: bool) -> Vec<&'static str> {
    let mut packages = vec!["void-repo-nonfree"];
    if libc == Libc::Glibc && multilib_capable {
        packages.push("void-repo-multilib");
        packages.push("void-repo-multilib-nonfree");
    }
    packages
}
