use std::path::Path;

use log::{debug, info};

use voidstrap_api::error::{VoidstrapError, VoidstrapResultExt};

use crate::engine::{boot::BootSubsystem, finish::FinishSubsystem, osconfig::OsConfigSubsystem};

// Engine functionality
mod bootstrap;
mod context;
mod install;
pub mod plan;
mod preflight;
pub mod tools;

// Voidstrap subsystems
pub mod boot;
mod finish;
mod osconfig;
pub mod storage;

pub(crate) use context::EngineContext;
pub(crate) use install::install;
pub(crate) use preflight::check_host;

pub(crate) trait Subsystem {
    fn name(&self) -> &'static str;

    /// Configure the installed system. Runs inside the chroot, with
    /// `exec_root` being the root of the installed system as seen from the
    /// running process.
    fn configure(&mut self, _ctx: &EngineContext, _exec_root: &Path) -> Result<(), VoidstrapError> {
        Ok(())
    }

    /// Finish the installation from the live system, after the chroot has
    /// been left and while the target is still mounted.
    fn finalize(&mut self, _ctx: &EngineContext) -> Result<(), VoidstrapError> {
        Ok(())
    }
}

/// Subsystems in the order they run.
fn subsystems() -> Vec<Box<dyn Subsystem>> {
    vec![
        Box::<OsConfigSubsystem>::default(),
        Box::<FinishSubsystem>::default(),
        Box::<BootSubsystem>::default(),
    ]
}

fn configure(
    subsystems: &mut [Box<dyn Subsystem>],
    ctx: &EngineContext,
    exec_root: &Path,
) -> Result<(), VoidstrapError> {
    info!("Starting step 'Configure'");
    for subsystem in subsystems {
        debug!(
            "Starting step 'Configure' for subsystem '{}'",
            subsystem.name()
        );
        subsystem.configure(ctx, exec_root).message(format!(
            "Step 'Configure' failed for subsystem '{}'",
            subsystem.name()
        ))?;
    }
    debug!("Finished step 'Configure'");
    Ok(())
}

fn finalize(subsystems: &mut [Box<dyn Subsystem>], ctx: &EngineContext) -> Result<(), VoidstrapError> {
    info!("Starting step 'Finalize'");
    for subsystem in subsystems {
        debug!(
            "Starting step 'Finalize' for subsystem '{}'",
            subsystem.name()
        );
        subsystem.finalize(ctx).message(format!(
            "Step 'Finalize' failed for subsystem '{}'",
            subsystem.name()
        ))?;
    }
    debug!("Finished step 'Finalize'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use voidstrap_api::{
        config::{Filesystem, Firmware},
        error::{ErrorKind, InstallError},
        primitives::secret::Credentials,
    };

    use super::*;

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        fail: bool,
        calls: Vec<&'static str>,
    }

    impl Subsystem for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn configure(&mut self, _ctx: &EngineContext, _exec_root: &Path) -> Result<(), VoidstrapError> {
            self.calls.push("configure");
            if self.fail {
                return Err(VoidstrapError::new(InstallError::Configure { step: "test" }));
            }
            Ok(())
        }
    }

    #[test]
    fn test_subsystem_order() {
        let names: Vec<_> = subsystems().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["os-config", "finish", "boot"]);
    }

    #[test]
    fn test_configure_stops_at_first_failure() {
        let ctx = EngineContext::new(
            context::tests::config("/dev/sda", Filesystem::Ext4),
            Credentials::default(),
            Firmware::Uefi,
        );
        let mut subsystems: Vec<Box<dyn Subsystem>> = vec![
            Box::new(Recorder {
                name: "first",
                fail: true,
                ..Default::default()
            }),
            Box::new(Recorder {
                name: "second",
                ..Default::default()
            }),
        ];

        let error = configure(&mut subsystems, &ctx, Path::new("/")).unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::Install(InstallError::Configure { step: "test" })
        );
        assert!(format!("{error:?}").contains("Step 'Configure' failed for subsystem 'first'"));

        // Finalize defaults to a no-op
        finalize(&mut subsystems, &ctx).unwrap();
    }
}
