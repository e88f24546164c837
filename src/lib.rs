use voidstrap_api::{
    config::{Firmware, InstallConfiguration},
    error::VoidstrapError,
    primitives::secret::Credentials,
};

pub mod cli;
pub mod collect;
mod engine;
mod logging;
pub mod validation;

pub use engine::plan::InstallPlan;
pub use logging::{background_log::BackgroundLog, multilog::MultiLogger};

/// Version of voidstrap, taken from the crate manifest.
pub const VOIDSTRAP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Checks that the host can install `config` and resolves the firmware
/// interface to install for.
pub fn check_host(config: &InstallConfiguration) -> Result<Firmware, VoidstrapError> {
    engine::check_host(config)
}

/// Installs Void Linux onto the target disk of `config`.
///
/// Everything on the disk is destroyed. The caller is responsible for
/// [`check_host`] and for obtaining the operator's confirmation.
pub fn install(
    config: InstallConfiguration,
    credentials: Credentials,
    firmware: Firmware,
) -> Result<(), VoidstrapError> {
    engine::install(config, credentials, firmware)
}
