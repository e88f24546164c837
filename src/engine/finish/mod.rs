use log::debug;

use voidstrap_api::error::{InstallError, ReportError, VoidstrapError};

use crate::engine::{EngineContext, Subsystem};

mod snapshots;
mod swap;

/// Snapshot jobs and file-backed swap, set up from the live system once the
/// installed system has been configured.
#[derive(Default, Debug)]
pub(super) struct FinishSubsystem;

impl Subsystem for FinishSubsystem {
    fn name(&self) -> &'static str {
        "finish"
    }

    fn finalize(&mut self, ctx: &EngineContext) -> Result<(), VoidstrapError> {
        let storage = &ctx.config.storage;

        let strategy = storage.snapshot_strategy();
        debug!("Snapshot strategy: {strategy:?}");
        snapshots::set_up(&ctx.target_root, &strategy).structured(InstallError::Snapshots)?;

        swap::set_up(
            &ctx.target_root,
            storage.filesystem,
            storage.swap_layout(&ctx.config.swap),
            &ctx.config.swap,
        )
        .structured(InstallError::Swap)
    }
}
