use serde::Serialize;

use voidstrap_api::{
    config::{Firmware, InstallConfiguration, SnapshotStrategy, SwapLayout},
    error::{InternalError, ReportError, VoidstrapError},
    primitives::secret::Credentials,
};

use crate::engine::{
    bootstrap, preflight,
    storage::{
        fstab,
        partitioning::PartitionPlan,
        stack::{PlannedMount, StackPlan},
        VolumeUuids,
    },
    tools, EngineContext,
};

/// Everything an installation would do with a configuration, computed
/// without touching any device. UUIDs are shown as placeholders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallPlan {
    pub firmware: Firmware,
    pub xbps_arch: String,
    pub partitions: PartitionPlan,
    pub storage: StackPlan,
    pub mounts: Vec<PlannedMount>,
    pub snapshots: SnapshotStrategy,
    pub swap: SwapLayout,
    pub host_tools: Vec<&'static str>,
    pub packages: Vec<&'static str>,
    pub kernel_cmdline: String,
    pub fstab: String,
}

impl InstallPlan {
    /// Plans `config` for its configured firmware, or for the firmware the
    /// host was booted with.
    pub fn new(config: InstallConfiguration) -> Self {
        let firmware = config.firmware.unwrap_or_else(preflight::host_firmware);
        Self::for_firmware(config, firmware)
    }

    pub fn for_firmware(config: InstallConfiguration, firmware: Firmware) -> Self {
        let host_tools = tools::required_tools(&config, firmware)
            .into_iter()
            .map(|tool| tool.name())
            .collect();

        let mut ctx = EngineContext::new(config, Credentials::default(), firmware);
        ctx.uuids = VolumeUuids::placeholders(&ctx);

        let storage = &ctx.config.storage;
        InstallPlan {
            firmware,
            xbps_arch: ctx.config.xbps_arch(),
            partitions: ctx.partitions.clone(),
            storage: ctx.stack.clone(),
            mounts: ctx.mounts(),
            snapshots: storage.snapshot_strategy(),
            swap: storage.swap_layout(&ctx.config.swap),
            host_tools,
            packages: bootstrap::target_packages(&ctx),
            kernel_cmdline: ctx.kernel_cmdline().to_string(),
            fstab: fstab::build(&ctx).render(),
        }
    }

    pub fn to_yaml(&self) -> Result<String, VoidstrapError> {
        serde_yaml::to_string(self)
            .structured(InternalError::Internal("Failed to serialize install plan"))
    }
}
