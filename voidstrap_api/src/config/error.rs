//! Validation errors for the install configuration.

/// Errors detected during static validation of the install configuration,
/// i.e. errors that can be detected without looking at the host.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InvalidConfigurationError {
    #[error("Disk path '{disk}' must be an absolute path under /dev")]
    InvalidDiskPath { disk: String },

    #[error("Hostname '{hostname}' is not a valid RFC 1123 host name")]
    InvalidHostname { hostname: String },

    #[error("Username '{username}' is invalid, it must match [a-z_][a-z0-9_-]* and be at most 32 characters")]
    InvalidUsername { username: String },

    #[error("Username '{username}' is reserved")]
    ReservedUsername { username: String },

    #[error("Locale '{locale}' is invalid, expected a form like 'en_US.UTF-8'")]
    InvalidLocale { locale: String },

    #[error("Timezone '{timezone}' is invalid, expected a form like 'Europe/Berlin'")]
    InvalidTimezone { timezone: String },

    #[error("Keymap '{keymap}' is invalid")]
    InvalidKeymap { keymap: String },

    #[error("Repository '{repository}' must be an http(s) URL or an absolute path")]
    InvalidRepository { repository: String },

    #[error("ESP size of {size} MiB is too small, at least {minimum} MiB is required")]
    EspTooSmall { size: u64, minimum: u64 },

    #[error("ESP size of {size} MiB is out of range")]
    EspTooLarge { size: u64 },

    #[error("Volume group name '{name}' is invalid")]
    InvalidVolumeGroupName { name: String },

    #[error("A separate home volume is not supported on {filesystem}, which keeps /home in the root filesystem or a subvolume")]
    SeparateHomeUnsupported { filesystem: &'static str },

    #[error("A separate home volume requires a fixed root size")]
    SeparateHomeWithoutRootSize,

    #[error("Snapshots are not supported on {filesystem} without LVM")]
    SnapshotsUnsupported { filesystem: &'static str },

    #[error("Swap size must be larger than zero")]
    SwapSizeZero,

    #[error("The proprietary NVIDIA driver is not available for musl")]
    NvidiaOnMusl,

    #[error("BIOS boot is not available on {arch}")]
    BiosUnsupportedArchitecture { arch: &'static str },

    #[error("Boot menu timeout of {timeout} seconds is too long")]
    BootTimeoutTooLong { timeout: u32 },
}
