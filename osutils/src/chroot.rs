use std::{
    fs,
    os::{
        fd::{IntoRawFd, RawFd},
        unix,
    },
    path::Path,
};

use log::{info, warn};

use voidstrap_api::error::{InstallError, ReportError, VoidstrapError, VoidstrapResultExt};

/// A chroot into the target root.
///
/// The pseudo filesystems must already be bind-mounted into the root.
/// Dropping this object does *not* exit the chroot; use
/// [`Chroot::execute_and_exit`].
pub struct Chroot {
    rootfd: RawFd,
}

impl Chroot {
    fn enter(path: &Path) -> Result<Self, VoidstrapError> {
        if !path.join("dev").is_dir() || !path.join("proc").is_dir() {
            return Err(VoidstrapError::new(InstallError::EnterChroot))
                .message(format!("'{}' is not a prepared root", path.display()));
        }

        info!("Entering chroot '{}'", path.display());
        let rootfd = fs::File::open("/")
            .structured(InstallError::EnterChroot)?
            .into_raw_fd();
        unix::fs::chroot(path).structured(InstallError::EnterChroot)?;
        std::env::set_current_dir("/").structured(InstallError::EnterChroot)?;

        Ok(Self { rootfd })
    }

    /// Runs `f` inside the chroot, then leaves it.
    ///
    /// If `f` fails, its error is returned and a failure to leave is only
    /// logged.
    pub fn execute_and_exit<F>(self, f: F) -> Result<(), VoidstrapError>
    where
        F: FnOnce() -> Result<(), VoidstrapError>,
    {
        let result = f();

        if let Err(e) = self.exit() {
            if result.is_ok() {
                return Err(e);
            }
            warn!("Encountered secondary error while handling earlier error: {e:?}");
        }
        result
    }

    fn exit(self) -> Result<(), VoidstrapError> {
        nix::unistd::fchdir(self.rootfd).structured(InstallError::ExitChroot)?;
        unix::fs::chroot(".").structured(InstallError::ExitChroot)?;
        nix::unistd::close(self.rootfd).structured(InstallError::ExitChroot)?;
        info!("Exited chroot");
        Ok(())
    }
}

/// Enters the chroot at `root`.
pub fn enter(root: &Path) -> Result<Chroot, VoidstrapError> {
    Chroot::enter(root).message("Failed to enter target chroot")
}
