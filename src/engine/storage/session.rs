use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use log::{debug, error, warn};

use osutils::{encryption, lvm, mount, tabfile::TabFileSystemType};
use voidstrap_api::error::{InstallError, ReportError, VoidstrapError};

/// Something the installer activated on the host and must undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Mount { path: PathBuf, recursive: bool },
    LuksMapping(String),
    VolumeGroup(String),
}

impl Resource {
    fn release(&self) -> Result<(), Error> {
        match self {
            Resource::Mount { path, recursive } => mount::umount(path, *recursive),
            Resource::LuksMapping(name) => encryption::close(name),
            Resource::VolumeGroup(name) => lvm::deactivate(name),
        }
    }
}

/// Owns the mounts and device activations of one install.
///
/// Resources are released in reverse order of acquisition, either explicitly
/// with [`StorageSession::release`] or, after an early exit, when the session
/// is dropped.
#[derive(Debug, Default)]
pub struct StorageSession {
    acquired: Vec<Resource>,
}

impl StorageSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, resource: Resource) {
        debug!("Acquired {resource:?}");
        self.acquired.push(resource);
    }

    #[cfg(test)]
    pub fn acquired(&self) -> &[Resource] {
        &self.acquired
    }

    /// Mounts `device` at `mount_point`, creating the directory if needed.
    pub fn mount(
        &mut self,
        device: &Path,
        mount_point: &Path,
        fs_type: TabFileSystemType,
        options: &[String],
    ) -> Result<(), Error> {
        mount::ensure_mount_directory(mount_point)?;
        mount::mount(device, mount_point, Some(fs_type.name()), options)?;
        self.record(Resource::Mount {
            path: mount_point.to_path_buf(),
            recursive: false,
        });
        Ok(())
    }

    /// Recursively binds a host pseudo filesystem into the target.
    pub fn rbind(&mut self, source: &Path, mount_point: &Path) -> Result<(), Error> {
        mount::ensure_mount_directory(mount_point)?;
        mount::rbind_rslave(source, mount_point)?;
        self.record(Resource::Mount {
            path: mount_point.to_path_buf(),
            recursive: true,
        });
        Ok(())
    }

    /// Unmounts a mount made through this session before the session ends.
    pub fn unmount(&mut self, mount_point: &Path) -> Result<(), Error> {
        let index = self
            .acquired
            .iter()
            .rposition(|r| matches!(r, Resource::Mount { path, .. } if path == mount_point))
            .with_context(|| format!("'{}' was not mounted by the installer", mount_point.display()))?;
        self.acquired[index].release()?;
        self.acquired.remove(index);
        Ok(())
    }

    /// Releases everything, newest first. Every resource is attempted; the
    /// first failure is returned with later ones attached.
    pub fn release(mut self) -> Result<(), VoidstrapError> {
        self.release_all()
    }

    fn release_all(&mut self) -> Result<(), VoidstrapError> {
        let mut failure: Option<VoidstrapError> = None;
        while let Some(resource) = self.acquired.pop() {
            debug!("Releasing {resource:?}");
            if let Err(e) = resource.release().structured(release_error(&resource)) {
                failure = Some(match failure {
                    None => e,
                    Some(first) => first.secondary_error_context(e),
                });
            }
        }
        failure.map_or(Ok(()), Err)
    }
}

fn release_error(resource: &Resource) -> InstallError {
    match resource {
        Resource::Mount { path, .. } => InstallError::Unmount {
            target: path.display().to_string(),
        },
        Resource::LuksMapping(_) | Resource::VolumeGroup(_) => InstallError::ReleaseSession,
    }
}

impl Drop for StorageSession {
    fn drop(&mut self) {
        if self.acquired.is_empty() {
            return;
        }
        warn!(
            "Releasing {} storage resources after an early exit",
            self.acquired.len()
        );
        if let Err(e) = self.release_all() {
            error!("Failed to release storage session: {e:?}");
        }
    }
}
