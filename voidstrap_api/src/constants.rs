use const_format::formatcp;

// Install target paths

/// Where the target root is mounted on the live system.
pub const TARGET_ROOT_PATH: &str = "/mnt";

/// Root volume mount point path.
pub const ROOT_MOUNT_POINT_PATH: &str = "/";

/// Boot partition mount point when the ESP is the boot partition.
pub const BOOT_MOUNT_POINT_PATH: &str = "/boot";

/// ESP mount point when it is kept separate from /boot.
pub const ESP_SEPARATE_MOUNT_POINT_PATH: &str = "/boot/efi";

/// Home mount point path.
pub const HOME_MOUNT_POINT_PATH: &str = "/home";

/// Snapshot directory (btrfs/bcachefs).
pub const SNAPSHOTS_MOUNT_POINT_PATH: &str = "/.snapshots";

/// Mount point of the btrfs swap subvolume.
pub const SWAP_MOUNT_POINT_PATH: &str = "/swap";

/// None/null mount point.
pub const NONE_MOUNT_POINT: &str = "none";

/// Pseudo filesystems bind-mounted into the target before entering it.
pub const PSEUDO_FILESYSTEMS: [&str; 3] = ["/proc", "/sys", "/dev"];

// Storage naming

/// Name of the LUKS mapping wrapping the data partition.
pub const LUKS_MAPPER_NAME: &str = "cryptroot";

/// Default volume group name.
pub const DEFAULT_VOLUME_GROUP: &str = "void";

/// Logical volume names.
pub const ROOT_VOLUME_NAME: &str = "root";
pub const HOME_VOLUME_NAME: &str = "home";
pub const SWAP_VOLUME_NAME: &str = "swap";

/// Btrfs subvolume names.
pub const BTRFS_ROOT_SUBVOLUME: &str = "@";
pub const BTRFS_HOME_SUBVOLUME: &str = "@home";
pub const BTRFS_SWAP_SUBVOLUME: &str = "@swap";

/// Share of the volume group left free for snapshot volumes.
pub const LVM_SNAPSHOT_RESERVE_PERCENT: u8 = 10;

/// Swap file path used when swap is not on a logical volume.
pub const SWAPFILE_PATH: &str = "/swapfile";

/// Swap file path on btrfs. It lives in its own subvolume, outside the
/// snapshotted root.
pub const BTRFS_SWAPFILE_PATH: &str = formatcp!("{SWAP_MOUNT_POINT_PATH}/swapfile");

/// Default ESP size in MiB.
pub const DEFAULT_ESP_SIZE_MIB: u64 = 1024;

/// Smallest accepted ESP size in MiB.
pub const MIN_ESP_SIZE_MIB: u64 = 256;

/// Default swap size.
pub const DEFAULT_SWAP_SIZE: &str = "4G";

/// Number of snapshots kept by the rotation jobs.
pub const SNAPSHOT_RETENTION: usize = 7;

/// Timeline retention for snapper.
pub const TIMELINE_LIMIT_DAILY: u32 = 7;
pub const TIMELINE_LIMIT_WEEKLY: u32 = 4;
pub const TIMELINE_LIMIT_MONTHLY: u32 = 12;

// Packages and repositories

/// Default Void Linux repository.
pub const DEFAULT_REPOSITORY: &str = "https://repo-default.voidlinux.org/current";

/// Base package set.
pub const BASE_PACKAGE: &str = "base-system";

// Boot

/// Label of the firmware boot entry.
pub const BOOT_ENTRY_LABEL: &str = "Void Linux";

/// EFI directory name.
pub const ESP_EFI_DIRECTORY: &str = "EFI";

/// BOOT directory name.
pub const EFI_DEFAULT_BIN_DIRECTORY: &str = "BOOT";

/// Fallback location for the EFI boot loader, relative to the ESP.
pub const EFI_DEFAULT_BIN_RELATIVE_PATH: &str =
    formatcp!("{ESP_EFI_DIRECTORY}/{EFI_DEFAULT_BIN_DIRECTORY}");

/// Limine data directory inside the target.
pub const LIMINE_SHARE_PATH: &str = "/usr/share/limine";

/// Limine configuration file name, written to the root of the boot partition.
pub const LIMINE_CONFIG_FILENAME: &str = "limine.conf";

/// Limine BIOS stage file name.
pub const LIMINE_BIOS_STAGE_FILENAME: &str = "limine-bios.sys";

/// Default boot menu timeout in seconds.
pub const DEFAULT_BOOT_TIMEOUT: u32 = 5;

/// Longest accepted boot menu timeout in seconds.
pub const MAX_BOOT_TIMEOUT: u32 = 60;

// Generated configuration paths, relative to the target root

pub const FSTAB_PATH: &str = "/etc/fstab";
pub const HOSTNAME_PATH: &str = "/etc/hostname";
pub const HOSTS_PATH: &str = "/etc/hosts";
pub const LOCALTIME_PATH: &str = "/etc/localtime";
pub const LOCALE_CONF_PATH: &str = "/etc/locale.conf";
pub const LIBC_LOCALES_PATH: &str = "/etc/default/libc-locales";
pub const RC_CONF_PATH: &str = "/etc/rc.conf";
pub const DRACUT_CONFIG_PATH: &str = "/etc/dracut.conf.d/10-voidstrap.conf";
pub const SUDOERS_DROPIN_PATH: &str = "/etc/sudoers.d/10-wheel";
pub const DOAS_CONFIG_PATH: &str = "/etc/doas.conf";
pub const KERNEL_HOOK_PATH: &str = "/etc/kernel.d/post-install/99-voidstrap-esp";
pub const SNAPSHOT_CRON_PATH: &str = "/etc/cron.daily/voidstrap-snapshot";
pub const SNAPPER_CONFIG_PATH: &str = "/etc/snapper/configs/root";
pub const SNAPPER_CONF_D_PATH: &str = "/etc/conf.d/snapper";
pub const INSTALL_LOG_PATH: &str = "/var/log/voidstrap.log";

/// Present when the host was booted through UEFI.
pub const EFI_FIRMWARE_PATH: &str = "/sys/firmware/efi";

/// Timezone database, on the host and in the target.
pub const ZONEINFO_PATH: &str = "/usr/share/zoneinfo";

/// Host name resolution config copied into the target.
pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

/// Main repository override of the installed system.
pub const XBPS_REPOSITORY_CONFIG_PATH: &str = "/etc/xbps.d/00-repository-main.conf";

/// Background log on the live system.
pub const BACKGROUND_LOG_PATH: &str = "/tmp/voidstrap.log";

/// Supplementary groups of the created user.
pub const USER_GROUPS: [&str; 8] = [
    "wheel", "audio", "video", "input", "kvm", "optical", "storage", "network",
];

/// Group allowed to escalate privileges.
pub const PRIVILEGED_GROUP: &str = "wheel";
