use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use osutils::{files, path::join_relative};
use voidstrap_api::constants::{BACKGROUND_LOG_PATH, INSTALL_LOG_PATH};

pub(super) mod background_log;
pub(super) mod multilog;

/// One line of the background log.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub target: String,
    pub module: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl From<log::Level> for Level {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<&log::Record<'_>> for LogEntry {
    fn from(value: &log::Record) -> Self {
        Self {
            timestamp: Utc::now(),
            level: value.level().into(),
            message: value.args().to_string(),
            target: value.target().to_string(),
            module: value.module_path().unwrap_or_default().to_string(),
            file: value.file().unwrap_or_default().to_string(),
            line: value.line().unwrap_or_default(),
        }
    }
}

/// Copies the background log into the installed system. Failures are only
/// reported.
pub fn persist_background_log(target_root: &Path) {
    persist_log_file(Path::new(BACKGROUND_LOG_PATH), target_root)
}

fn persist_log_file(source: &Path, target_root: &Path) {
    log::logger().flush();
    let destination = join_relative(target_root, INSTALL_LOG_PATH);
    match files::copy_file(source, &destination) {
        Ok(()) => debug!(
            "Persisted background log from '{}' to '{}'",
            source.display(),
            destination.display()
        ),
        Err(e) => warn!("Failed to persist background log: {e:?}"),
    }
}
