use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use sysdefs::arch::SystemArchitecture;

use crate::{
    constants::{
        DEFAULT_BOOT_TIMEOUT, DEFAULT_ESP_SIZE_MIB, DEFAULT_REPOSITORY, MAX_BOOT_TIMEOUT,
        MIN_ESP_SIZE_MIB,
    },
    error::{InvalidInputError, ReportError, VoidstrapError},
    is_default,
    primitives::bytes::ByteCount,
};

mod error;
mod storage;
mod system;

pub use error::InvalidConfigurationError;
pub use storage::{
    Encryption, Filesystem, HomeLayout, LvmOptions, SnapshotStrategy, StorageStack, Swap,
    SwapLayout, VolumeManager,
};
pub use sysdefs::arch::Libc;
pub use system::{repository_packages, BootLayout, Firmware, Gpu, Kernel, PrivilegeTool};

/// Everything needed to install Void Linux onto one disk, except secrets.
///
/// Built once (from YAML or by the interactive collector) and passed by
/// reference through the installation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstallConfiguration {
    /// Block device to wipe and install onto, e.g. `/dev/nvme0n1`.
    pub disk: String,

    /// Firmware interface. Detected from the host when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<Firmware>,

    /// Target architecture. Defaults to the architecture of the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<SystemArchitecture>,

    /// Size of the ESP (or BIOS boot data partition) in MiB.
    #[serde(default = "default_esp_size")]
    pub esp_size: u64,

    #[serde(default, skip_serializing_if = "is_default")]
    pub boot_layout: BootLayout,

    pub hostname: String,

    pub timezone: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_keymap")]
    pub keymap: String,

    /// Name of the unprivileged user, member of the wheel group.
    pub username: String,

    #[serde(default)]
    pub libc: Libc,

    #[serde(default = "default_repository")]
    pub repository: String,

    #[serde(default)]
    pub kernel: Kernel,

    #[serde(default)]
    pub gpu: Gpu,

    #[serde(default)]
    pub privilege_tool: PrivilegeTool,

    /// Boot menu timeout in seconds.
    #[serde(default = "default_boot_timeout")]
    pub boot_timeout: u32,

    pub storage: StorageStack,

    #[serde(default)]
    pub swap: Swap,
}

fn default_esp_size() -> u64 {
    DEFAULT_ESP_SIZE_MIB
}

fn default_locale() -> String {
    "en_US.UTF-8".into()
}

fn default_keymap() -> String {
    "us".into()
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.into()
}

fn default_boot_timeout() -> u32 {
    DEFAULT_BOOT_TIMEOUT
}

const RESERVED_USERNAMES: &[&str] = &[
    "root", "bin", "daemon", "adm", "lp", "sync", "shutdown", "halt", "mail", "news", "uucp",
    "operator", "man", "nobody", "sshd", "polkitd", "dbus", "wheel",
];

lazy_static! {
    static ref HOSTNAME_LABEL: Regex = Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap();
    static ref USERNAME: Regex = Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").unwrap();
    static ref LOCALE: Regex =
        Regex::new(r"^([a-z]{2,3}(_[A-Z]{2})?|C|POSIX)(\.[A-Za-z0-9-]+)?(@[A-Za-z0-9]+)?$").unwrap();
    static ref TIMEZONE: Regex = Regex::new(r"^[A-Za-z0-9_+-]+(/[A-Za-z0-9_+-]+)*$").unwrap();
    static ref KEYMAP: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

impl InstallConfiguration {
    /// Parses a configuration from YAML. The result is not validated.
    pub fn from_yaml(contents: &str) -> Result<Self, VoidstrapError> {
        serde_yaml::from_str(contents).structured(InvalidInputError::ParseConfiguration)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, VoidstrapError> {
        let contents = std::fs::read_to_string(path.as_ref()).structured(
            InvalidInputError::LoadConfiguration {
                path: path.as_ref().display().to_string(),
            },
        )?;
        let config = Self::from_yaml(&contents)?;
        config.validate().map_err(|e| {
            VoidstrapError::new(InvalidInputError::InvalidConfiguration(e))
        })?;
        Ok(config)
    }

    pub fn architecture(&self) -> SystemArchitecture {
        self.architecture
            .unwrap_or_else(SystemArchitecture::current)
    }

    /// Value of `XBPS_ARCH` for the target.
    pub fn xbps_arch(&self) -> String {
        self.architecture().xbps_arch(self.libc)
    }

    /// Size of the ESP. Validation rejects sizes that overflow.
    pub fn esp_size(&self) -> ByteCount {
        ByteCount::checked_from_mebibytes(self.esp_size).unwrap_or(ByteCount(u64::MAX))
    }

    /// Static validation that does not depend on the host.
    pub fn validate(&self) -> Result<(), InvalidConfigurationError> {
        if !self.disk.starts_with("/dev/") || self.disk.len() <= "/dev/".len() {
            return Err(InvalidConfigurationError::InvalidDiskPath {
                disk: self.disk.clone(),
            });
        }

        if !is_valid_hostname(&self.hostname) {
            return Err(InvalidConfigurationError::InvalidHostname {
                hostname: self.hostname.clone(),
            });
        }

        if !USERNAME.is_match(&self.username) {
            return Err(InvalidConfigurationError::InvalidUsername {
                username: self.username.clone(),
            });
        }
        if RESERVED_USERNAMES.contains(&self.username.as_str()) {
            return Err(InvalidConfigurationError::ReservedUsername {
                username: self.username.clone(),
            });
        }

        if !LOCALE.is_match(&self.locale) {
            return Err(InvalidConfigurationError::InvalidLocale {
                locale: self.locale.clone(),
            });
        }

        if !TIMEZONE.is_match(&self.timezone) {
            return Err(InvalidConfigurationError::InvalidTimezone {
                timezone: self.timezone.clone(),
            });
        }

        if !KEYMAP.is_match(&self.keymap) {
            return Err(InvalidConfigurationError::InvalidKeymap {
                keymap: self.keymap.clone(),
            });
        }

        if !(self.repository.starts_with("https://")
            || self.repository.starts_with("http://")
            || self.repository.starts_with('/'))
        {
            return Err(InvalidConfigurationError::InvalidRepository {
                repository: self.repository.clone(),
            });
        }

        if self.esp_size < MIN_ESP_SIZE_MIB {
            return Err(InvalidConfigurationError::EspTooSmall {
                size: self.esp_size,
                minimum: MIN_ESP_SIZE_MIB,
            });
        }

        if ByteCount::checked_from_mebibytes(self.esp_size).is_none() {
            return Err(InvalidConfigurationError::EspTooLarge {
                size: self.esp_size,
            });
        }

        if self.boot_timeout > MAX_BOOT_TIMEOUT {
            return Err(InvalidConfigurationError::BootTimeoutTooLong {
                timeout: self.boot_timeout,
            });
        }

        if self.firmware == Some(Firmware::Bios) && !self.architecture().has_bios() {
            return Err(InvalidConfigurationError::BiosUnsupportedArchitecture {
                arch: self.architecture().name(),
            });
        }

        if self.gpu == Gpu::Nvidia && self.libc == Libc::Musl {
            return Err(InvalidConfigurationError::NvidiaOnMusl);
        }

        if self.swap.enabled && self.swap.size.bytes() == 0 {
            return Err(InvalidConfigurationError::SwapSizeZero);
        }

        self.storage.validate()?;

        Ok(())
    }
}

fn is_valid_hostname(hostname: &str) -> bool {
    !hostname.is_empty()
        && hostname.len() <= 253
        && hostname.split('.').all(|label| HOSTNAME_LABEL.is_match(label))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::error::ErrorKind;

    use super::*;

    const FULL: &str = indoc! {r#"
        disk: /dev/nvme0n1
        firmware: uefi
        espSize: 1024
        hostname: void
        timezone: Europe/Berlin
        locale: en_US.UTF-8
        keymap: us
        username: alice
        libc: glibc
        repository: https://repo-default.voidlinux.org/current
        kernel: mainline
        gpu: generic
        privilegeTool: sudo
        bootTimeout: 5
        storage:
          filesystem: ext4
          encryption: luks
          volumeManager:
            type: lvm
            volumeGroup: void
            rootSize: 50G
            separateHome: true
          snapshots: true
        swap:
          enabled: true
          size: 4G
          compression: true
    "#};

    const MINIMAL: &str = indoc! {r#"
        disk: /dev/sda
        hostname: void
        timezone: UTC
        username: alice
        storage:
          filesystem: bcachefs
    "#};

    #[test]
    fn test_parse_full() {
        let config = InstallConfiguration::from_yaml(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.disk, "/dev/nvme0n1");
        assert_eq!(config.firmware, Some(Firmware::Uefi));
        assert!(config.storage.is_encrypted());
        assert_eq!(
            config.storage.lvm().unwrap().root_size,
            Some(ByteCount(50 << 30))
        );
        assert_eq!(config.swap.size, ByteCount(4 << 30));
        assert_eq!(config.storage.home_layout(), HomeLayout::LogicalVolume);
        assert_eq!(config.storage.swap_layout(&config.swap), SwapLayout::LogicalVolume);
    }

    #[test]
    fn test_parse_minimal_defaults() {
        let config = InstallConfiguration::from_yaml(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.firmware, None);
        assert_eq!(config.esp_size, DEFAULT_ESP_SIZE_MIB);
        assert_eq!(config.locale, "en_US.UTF-8");
        assert_eq!(config.keymap, "us");
        assert_eq!(config.repository, DEFAULT_REPOSITORY);
        assert_eq!(config.boot_timeout, DEFAULT_BOOT_TIMEOUT);
        assert_eq!(config.boot_layout, BootLayout::EspAsBoot);
        assert_eq!(config.kernel, Kernel::Mainline);
        assert_eq!(config.privilege_tool, PrivilegeTool::Sudo);
        assert!(!config.swap.enabled);
        assert_eq!(config.storage.volume_manager, VolumeManager::None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = format!("{MINIMAL}password: hunter2\n");
        let error = InstallConfiguration::from_yaml(&yaml).unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::InvalidInput(InvalidInputError::ParseConfiguration)
        );
    }

    #[test]
    fn test_serialize_roundtrip_keeps_shape() {
        let config = InstallConfiguration::from_yaml(FULL).unwrap();
        let rendered = serde_yaml::to_string(&config).unwrap();
        assert!(rendered.contains("type: lvm"));
        assert!(rendered.contains("espSize: 1024"));
        assert_eq!(InstallConfiguration::from_yaml(&rendered).unwrap(), config);
    }

    #[test]
    fn test_validate_identity() {
        let base = InstallConfiguration::from_yaml(MINIMAL).unwrap();

        let mut config = base.clone();
        config.disk = "sda".into();
        assert!(matches!(
            config.validate(),
            Err(InvalidConfigurationError::InvalidDiskPath { .. })
        ));

        for hostname in ["", "-void", "void-", "vo id", &"a".repeat(64)] {
            let mut config = base.clone();
            config.hostname = hostname.into();
            assert!(
                matches!(
                    config.validate(),
                    Err(InvalidConfigurationError::InvalidHostname { .. })
                ),
                "hostname '{hostname}'"
            );
        }
        let mut config = base.clone();
        config.hostname = "void.example.org".into();
        config.validate().unwrap();

        for username in ["Alice", "1alice", "al ice", ""] {
            let mut config = base.clone();
            config.username = username.into();
            assert!(
                matches!(
                    config.validate(),
                    Err(InvalidConfigurationError::InvalidUsername { .. })
                ),
                "username '{username}'"
            );
        }

        let mut config = base.clone();
        config.username = "root".into();
        assert_eq!(
            config.validate().unwrap_err(),
            InvalidConfigurationError::ReservedUsername {
                username: "root".into()
            }
        );
    }

    #[test]
    fn test_validate_locale_timezone_keymap() {
        let base = InstallConfiguration::from_yaml(MINIMAL).unwrap();

        for (locale, valid) in [
            ("en_US.UTF-8", true),
            ("de_DE@euro", true),
            ("C.UTF-8", true),
            ("english", false),
            ("en_US UTF-8", false),
        ] {
            let mut config = base.clone();
            config.locale = locale.into();
            assert_eq!(config.validate().is_ok(), valid, "locale '{locale}'");
        }

        for (timezone, valid) in [
            ("Europe/Berlin", true),
            ("America/Argentina/Buenos_Aires", true),
            ("Etc/GMT+5", true),
            ("../etc/passwd", false),
            ("Europe/", false),
        ] {
            let mut config = base.clone();
            config.timezone = timezone.into();
            assert_eq!(config.validate().is_ok(), valid, "timezone '{timezone}'");
        }

        let mut config = base.clone();
        config.keymap = "de latin1".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_system_choices() {
        let base = InstallConfiguration::from_yaml(MINIMAL).unwrap();

        let mut config = base.clone();
        config.esp_size = 64;
        assert_eq!(
            config.validate().unwrap_err(),
            InvalidConfigurationError::EspTooSmall {
                size: 64,
                minimum: MIN_ESP_SIZE_MIB
            }
        );

        let mut config = base.clone();
        config.esp_size = 17592186044416;
        assert_eq!(
            config.validate().unwrap_err(),
            InvalidConfigurationError::EspTooLarge {
                size: 17592186044416
            }
        );

        let mut config = base.clone();
        config.gpu = Gpu::Nvidia;
        config.libc = Libc::Musl;
        assert_eq!(
            config.validate().unwrap_err(),
            InvalidConfigurationError::NvidiaOnMusl
        );

        let mut config = base.clone();
        config.firmware = Some(Firmware::Bios);
        config.architecture = Some(SystemArchitecture::Aarch64);
        assert_eq!(
            config.validate().unwrap_err(),
            InvalidConfigurationError::BiosUnsupportedArchitecture { arch: "aarch64" }
        );

        let mut config = base.clone();
        config.swap = Swap {
            enabled: true,
            size: ByteCount(0),
            compression: false,
        };
        assert_eq!(
            config.validate().unwrap_err(),
            InvalidConfigurationError::SwapSizeZero
        );

        let mut config = base.clone();
        config.repository = "ftp://mirror".into();
        assert!(config.validate().is_err());
        config.repository = "/srv/repo".into();
        config.validate().unwrap();

        let mut config = base;
        config.boot_timeout = MAX_BOOT_TIMEOUT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voidstrap.yaml");

        let error = InstallConfiguration::load_from_file(&path).unwrap_err();
        assert_eq!(error.category(), "invalid-input");

        std::fs::write(&path, MINIMAL.replace("alice", "root")).unwrap();
        let error = InstallConfiguration::load_from_file(&path).unwrap_err();
        assert!(matches!(
            error.kind(),
            ErrorKind::InvalidInput(InvalidInputError::InvalidConfiguration(
                InvalidConfigurationError::ReservedUsername { .. }
            ))
        ));

        std::fs::write(&path, MINIMAL).unwrap();
        let config = InstallConfiguration::load_from_file(&path).unwrap();
        assert_eq!(config.storage.filesystem, Filesystem::Bcachefs);
    }
}
