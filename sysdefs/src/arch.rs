use serde::{de::Error, Deserialize, Deserializer, Serialize};
use strum_macros::IntoStaticStr;

/// System architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemArchitecture {
    /// 64-bit x86
    #[strum(serialize = "x86_64")]
    X86_64,

    /// 64-bit ARM
    #[strum(serialize = "aarch64")]
    Aarch64,
}

impl SystemArchitecture {
    /// Get the current system architecture
    pub const fn current() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            SystemArchitecture::X86_64
        }

        #[cfg(target_arch = "aarch64")]
        {
            SystemArchitecture::Aarch64
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Architecture string understood by `XBPS_ARCH`, e.g. `x86_64-musl`.
    pub fn xbps_arch(self, libc: Libc) -> String {
        match libc {
            Libc::Glibc => self.name().to_string(),
            Libc::Musl => format!("{}-musl", self.name()),
        }
    }

    /// File name of the removable-media EFI binary for this architecture.
    pub fn efi_binary_name(self) -> &'static str {
        match self {
            SystemArchitecture::X86_64 => "BOOTX64.EFI",
            SystemArchitecture::Aarch64 => "BOOTAA64.EFI",
        }
    }

    /// Whether legacy BIOS boot exists on this architecture.
    pub fn has_bios(self) -> bool {
        matches!(self, SystemArchitecture::X86_64)
    }
}

impl<'de> Deserialize<'de> for SystemArchitecture {
    fn deserialize<D>(deserializer: D) -> Result<SystemArchitecture, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match &*String::deserialize(deserializer)?.to_lowercase() {
            "x64" | "amd64" | "x86_64" => SystemArchitecture::X86_64,
            "arm64" | "aarch64" => SystemArchitecture::Aarch64,
            arch => {
                return Err(D::Error::custom(format!(
                    "unknown system architecture '{arch}'",
                )))
            }
        })
    }
}

/// C library flavour of the installed system.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Libc {
    #[default]
    Glibc,
    Musl,
}
