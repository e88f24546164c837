use std::path::Path;

use log::{debug, info};
use serde::Serialize;

use osutils::{blkid, encryption, mkfs};
use voidstrap_api::{
    config::{Filesystem, Firmware},
    constants::PSEUDO_FILESYSTEMS,
    error::{InstallError, ReportError, VoidstrapError, VoidstrapResultExt},
};

use super::EngineContext;

pub mod fstab;
pub mod partitioning;
pub mod session;
pub mod stack;

use session::StorageSession;
use stack::MountSource;

/// Filesystem and container UUIDs of the formatted stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeUuids {
    pub root: String,
    pub boot: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<String>,

    /// UUID of the LUKS container, not of the filesystem inside it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub luks: Option<String>,
}

impl VolumeUuids {
    /// Stand-ins used when rendering templates before anything is formatted.
    pub fn placeholders(ctx: &EngineContext) -> Self {
        Self {
            root: "<root-uuid>".into(),
            boot: "<boot-uuid>".into(),
            home: ctx.stack.home.as_ref().map(|_| "<home-uuid>".into()),
            swap: ctx.stack.swap.as_ref().map(|_| "<swap-uuid>".into()),
            luks: ctx.stack.luks_device().map(|_| "<luks-uuid>".into()),
        }
    }

    pub fn for_mount(&self, source: MountSource) -> Option<&str> {
        match source {
            MountSource::Root => Some(&self.root),
            MountSource::Boot => Some(&self.boot),
            MountSource::Home => self.home.as_deref(),
        }
    }
}

/// Partitions the disk, builds the storage stack and mounts it with the host
/// pseudo filesystems under the target root.
pub(super) fn provision(ctx: &mut EngineContext) -> Result<StorageSession, VoidstrapError> {
    let disk = ctx.partitions.disk.display().to_string();
    partitioning::wipe_disk(&ctx.partitions).structured(InstallError::WipeDisk { disk })?;
    partitioning::create_partitions(&ctx.partitions).structured(InstallError::CreatePartitions)?;

    let boot = &ctx.partitions.boot().path;
    let label = match ctx.firmware {
        Firmware::Uefi => "ESP",
        Firmware::Bios => "BOOT",
    };
    mkfs::vfat(boot, label).structured(InstallError::CreateFilesystem {
        device: boot.display().to_string(),
    })?;

    let mut session = StorageSession::new();
    stack::build(
        &ctx.stack,
        ctx.credentials.luks_passphrase.as_ref(),
        &mut session,
    )
    .message("Failed to build storage stack")?;

    if ctx.stack.filesystem == Filesystem::Btrfs {
        stack::create_btrfs_subvolumes(&ctx.stack, &ctx.target_root, &mut session)?;
    }

    ctx.uuids = read_uuids(ctx)?;
    debug!("Volume UUIDs: {:?}", ctx.uuids);

    mount_target(ctx, &mut session)?;
    Ok(session)
}

fn read_uuid(device: &Path) -> Result<String, VoidstrapError> {
    blkid::get_uuid(device).structured(InstallError::ReadUuid {
        device: device.display().to_string(),
    })
}

fn read_uuids(ctx: &EngineContext) -> Result<VolumeUuids, VoidstrapError> {
    Ok(VolumeUuids {
        root: read_uuid(&ctx.stack.root.device)?,
        boot: read_uuid(&ctx.partitions.boot().path)?,
        home: ctx
            .stack
            .home
            .as_ref()
            .map(|v| read_uuid(&v.device))
            .transpose()?,
        swap: ctx
            .stack
            .swap
            .as_ref()
            .map(|v| read_uuid(&v.device))
            .transpose()?,
        luks: ctx
            .stack
            .luks_device()
            .map(|device| {
                encryption::luks_uuid(device).structured(InstallError::ReadUuid {
                    device: device.display().to_string(),
                })
            })
            .transpose()?,
    })
}

fn mount_target(ctx: &EngineContext, session: &mut StorageSession) -> Result<(), VoidstrapError> {
    info!("Mounting target at '{}'", ctx.target_root.display());
    for planned in ctx.mounts() {
        let mount_point = ctx.target_path(&planned.mount_point);
        session
            .mount(
                &planned.device,
                &mount_point,
                planned.fs_type,
                &planned.options,
            )
            .structured(InstallError::Mount {
                target: mount_point.display().to_string(),
            })?;
    }

    for pseudo in PSEUDO_FILESYSTEMS {
        let mount_point = ctx.target_path(pseudo);
        session
            .rbind(Path::new(pseudo), &mount_point)
            .structured(InstallError::Mount {
                target: mount_point.display().to_string(),
            })?;
    }
    Ok(())
}
