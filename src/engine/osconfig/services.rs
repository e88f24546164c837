use std::path::Path;

use anyhow::Error;
use log::{debug, warn};
use strum_macros::{Display, IntoStaticStr};

use osutils::runit;
use voidstrap_api::config::{SnapshotStrategy, StorageStack};

/// runit services enabled in the installed system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(super) enum Service {
    Dhcpcd,
    Chronyd,
    Dbus,
    Sshd,
    Crond,
}

pub(super) fn services(storage: &StorageStack) -> Vec<Service> {
    let mut services = vec![Service::Dhcpcd, Service::Chronyd, Service::Dbus, Service::Sshd];
    if storage.snapshot_strategy() != SnapshotStrategy::None {
        services.push(Service::Crond);
    }
    services
}

pub(super) fn enable_services(root: &Path, services: &[Service]) -> Result<(), Error> {
    for service in services {
        let name: &'static str = service.into();
        if runit::enable_service(root, name)? {
            debug!("Enabled service '{service}'");
        } else {
            warn!("Service '{service}' is not installed, not enabling it");
        }
    }
    Ok(())
}
