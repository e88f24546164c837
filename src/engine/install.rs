use std::path::Path;

use log::{error, info};

use osutils::chroot;
use voidstrap_api::{
    config::{Firmware, InstallConfiguration},
    error::VoidstrapError,
    primitives::secret::Credentials,
};

use crate::{
    engine::{self, bootstrap, storage, tools, EngineContext},
    logging,
};

/// Installs Void Linux as described by `config`, wiping the target disk.
///
/// The host must already have passed the preflight checks, and the operator
/// must have confirmed the installation.
pub(crate) fn install(
    config: InstallConfiguration,
    credentials: Credentials,
    firmware: Firmware,
) -> Result<(), VoidstrapError> {
    tools::check(&config, firmware)?;

    let mut ctx = EngineContext::new(config, credentials, firmware);
    info!(
        "Installing Void Linux onto '{}' with {} on {} firmware",
        ctx.config.disk,
        ctx.config.storage.filesystem.name(),
        firmware.name()
    );

    let session = storage::provision(&mut ctx)?;
    let result = install_into(&ctx);
    if let Err(ref e) = result {
        error!("Installation failed, releasing the target: {e:?}");
    }

    logging::persist_background_log(&ctx.target_root);

    info!("Releasing the target");
    match (result, session.release()) {
        (Ok(()), release) => release,
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_error)) => Err(e.secondary_error_context(release_error)),
    }?;

    info!("Installation finished");
    Ok(())
}

/// The steps run against the provisioned, mounted target.
fn install_into(ctx: &EngineContext) -> Result<(), VoidstrapError> {
    bootstrap::bootstrap(ctx)?;
    storage::fstab::write(ctx)?;

    let mut subsystems = engine::subsystems();
    chroot::enter(&ctx.target_root)?
        .execute_and_exit(|| engine::configure(&mut subsystems, ctx, Path::new("/")))?;

    engine::finalize(&mut subsystems, ctx)
}
