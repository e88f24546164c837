use std::{
    fmt::{self, Display},
    path::Path,
};

use anyhow::Error;
use log::{debug, info};

use osutils::{bcachefs, btrfs, files, path::join_relative};
use voidstrap_api::{
    config::SnapshotStrategy,
    constants::{
        ROOT_VOLUME_NAME, SNAPPER_CONFIG_PATH, SNAPPER_CONF_D_PATH, SNAPSHOTS_MOUNT_POINT_PATH,
        SNAPSHOT_CRON_PATH, SNAPSHOT_RETENTION, TIMELINE_LIMIT_DAILY, TIMELINE_LIMIT_MONTHLY,
        TIMELINE_LIMIT_WEEKLY,
    },
    primitives::bytes::ByteCount,
};

/// snapper configuration of the root subvolume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SnapperConfig {
    pub subvolume: &'static str,
    pub timeline_create: bool,
    pub timeline_cleanup: bool,
    pub limit_hourly: u32,
    pub limit_daily: u32,
    pub limit_weekly: u32,
    pub limit_monthly: u32,
    pub limit_yearly: u32,
}

impl Default for SnapperConfig {
    fn default() -> Self {
        Self {
            subvolume: "/",
            timeline_create: true,
            timeline_cleanup: true,
            limit_hourly: 0,
            limit_daily: TIMELINE_LIMIT_DAILY,
            limit_weekly: TIMELINE_LIMIT_WEEKLY,
            limit_monthly: TIMELINE_LIMIT_MONTHLY,
            limit_yearly: 0,
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl Display for SnapperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = [
            ("SUBVOLUME", self.subvolume.to_string()),
            ("FSTYPE", "btrfs".into()),
            ("ALLOW_GROUPS", String::new()),
            ("SYNC_ACL", "no".into()),
            ("NUMBER_CLEANUP", "yes".into()),
            ("NUMBER_LIMIT", "50".into()),
            ("TIMELINE_CREATE", yes_no(self.timeline_create).into()),
            ("TIMELINE_CLEANUP", yes_no(self.timeline_cleanup).into()),
            ("TIMELINE_LIMIT_HOURLY", self.limit_hourly.to_string()),
            ("TIMELINE_LIMIT_DAILY", self.limit_daily.to_string()),
            ("TIMELINE_LIMIT_WEEKLY", self.limit_weekly.to_string()),
            ("TIMELINE_LIMIT_MONTHLY", self.limit_monthly.to_string()),
            ("TIMELINE_LIMIT_YEARLY", self.limit_yearly.to_string()),
        ];
        for (key, value) in settings {
            writeln!(f, "{key}=\"{value}\"")?;
        }
        Ok(())
    }
}

/// Daily cron job taking and pruning snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SnapshotJob {
    /// Timeline snapshots through snapper.
    Snapper,

    /// Dated read-only bcachefs snapshots of the root subvolume.
    Bcachefs { retention: usize },

    /// Dated snapshot logical volumes of the root volume.
    Lvm {
        volume_group: String,
        size: ByteCount,
        retention: usize,
    },
}

impl SnapshotJob {
    pub fn for_strategy(strategy: &SnapshotStrategy) -> Option<Self> {
        match strategy {
            SnapshotStrategy::None => None,
            SnapshotStrategy::Timeline => Some(SnapshotJob::Snapper),
            SnapshotStrategy::SubvolumeRotation => Some(SnapshotJob::Bcachefs {
                retention: SNAPSHOT_RETENTION,
            }),
            SnapshotStrategy::LogicalVolumeRotation { volume_group, size } => {
                Some(SnapshotJob::Lvm {
                    volume_group: volume_group.clone(),
                    size: *size,
                    retention: SNAPSHOT_RETENTION,
                })
            }
        }
    }
}

impl Display for SnapshotJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#!/bin/sh")?;
        match self {
            SnapshotJob::Snapper => {
                writeln!(f, "snapper -c root create -c timeline")?;
                writeln!(f, "snapper -c root cleanup timeline")?;
            }
            SnapshotJob::Bcachefs { retention } => {
                writeln!(f, "set -e")?;
                writeln!(f, "SNAPSHOTS={SNAPSHOTS_MOUNT_POINT_PATH}")?;
                writeln!(f, "TODAY=\"$SNAPSHOTS/$(date +%Y-%m-%d)\"")?;
                writeln!(
                    f,
                    "[ -e \"$TODAY\" ] || bcachefs subvolume snapshot -r / \"$TODAY\""
                )?;
                writeln!(
                    f,
                    "ls -1d \"$SNAPSHOTS\"/????-??-?? | sort -r | tail -n +{} | while read -r snapshot; do",
                    retention + 1
                )?;
                writeln!(f, "    bcachefs subvolume delete \"$snapshot\"")?;
                writeln!(f, "done")?;
            }
            SnapshotJob::Lvm {
                volume_group,
                size,
                retention,
            } => {
                writeln!(f, "set -e")?;
                writeln!(f, "VG={volume_group}")?;
                writeln!(f, "NAME=\"{ROOT_VOLUME_NAME}-snap-$(date +%Y%m%d)\"")?;
                writeln!(
                    f,
                    "snapshots() {{ lvs --noheadings -o lv_name \"$VG\" | tr -d ' ' | grep '^{ROOT_VOLUME_NAME}-snap-'; }}"
                )?;
                writeln!(
                    f,
                    "snapshots | grep -qx \"$NAME\" || lvcreate -s -L {} -n \"$NAME\" \"$VG/{ROOT_VOLUME_NAME}\"",
                    size.to_lvm_size()
                )?;
                writeln!(
                    f,
                    "snapshots | sort -r | tail -n +{} | while read -r lv; do",
                    retention + 1
                )?;
                writeln!(f, "    lvremove -y \"$VG/$lv\"")?;
                writeln!(f, "done")?;
            }
        }
        Ok(())
    }
}

/// Creates the snapshot directory, snapper configuration and cron job for
/// `strategy` in the mounted target at `target_root`.
pub(super) fn set_up(target_root: &Path, strategy: &SnapshotStrategy) -> Result<(), Error> {
    let Some(job) = SnapshotJob::for_strategy(strategy) else {
        debug!("No snapshot strategy for this storage stack");
        return Ok(());
    };

    let snapshots = join_relative(target_root, SNAPSHOTS_MOUNT_POINT_PATH);
    match job {
        SnapshotJob::Snapper => {
            info!("Setting up snapper timeline snapshots");
            btrfs::create_subvolume(&snapshots)?;
            files::write_file(
                join_relative(target_root, SNAPPER_CONFIG_PATH),
                0o644,
                SnapperConfig::default().to_string().as_bytes(),
            )?;
            files::write_file(
                join_relative(target_root, SNAPPER_CONF_D_PATH),
                0o644,
                b"SNAPPER_CONFIGS=\"root\"\n",
            )?;
        }
        SnapshotJob::Bcachefs { .. } => {
            info!("Setting up daily bcachefs snapshots");
            bcachefs::create_subvolume(&snapshots)?;
        }
        SnapshotJob::Lvm { .. } => {
            info!("Setting up daily logical volume snapshots");
        }
    }

    files::write_file(
        join_relative(target_root, SNAPSHOT_CRON_PATH),
        0o755,
        job.to_string().as_bytes(),
    )
}
