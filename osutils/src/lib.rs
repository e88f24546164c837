pub mod bcachefs;
pub mod blkid;
pub mod block_devices;
pub mod btrfs;
pub mod chroot;
pub mod dependencies;
pub mod efibootmgr;
pub mod encryption;
pub mod files;
pub mod limine;
pub mod lvm;
pub mod mkfs;
pub mod mkswap;
pub mod mount;
pub mod path;
pub mod runit;
pub mod sfdisk;
pub mod tabfile;
pub mod udevadm;
pub mod users;
pub mod wipefs;
pub mod xbps;
