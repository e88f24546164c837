use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::{LevelFilter, Log, Metadata, Record};

use osutils::files;

use super::LogEntry;

/// Writes every record as one JSON line to a file on the live system.
///
/// The file is truncated on creation. If it cannot be created the logger
/// stays disabled instead of failing the run.
pub struct BackgroundLog {
    path: PathBuf,
    target: Option<Mutex<File>>,
    max_level: LevelFilter,
}

impl BackgroundLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let target = match files::create_file(path.as_ref()) {
            Ok(file) => Some(Mutex::new(file)),
            Err(err) => {
                eprintln!(
                    "Logging setup error: failed to create background log '{}': {err:?}",
                    path.as_ref().display()
                );
                None
            }
        };

        Self {
            path: path.as_ref().to_path_buf(),
            target,
            max_level: LevelFilter::Trace,
        }
    }

    pub fn with_max_level(self, max_level: LevelFilter) -> Self {
        Self { max_level, ..self }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_logger(self) -> Box<dyn Log> {
        Box::new(self)
    }

    fn write_entry(&self, record: &Record) -> Result<(), Box<dyn std::error::Error + '_>> {
        let Some(file) = self.target.as_ref() else {
            return Ok(());
        };

        let mut line = serde_json::to_string(&LogEntry::from(record))?;
        line.push('\n');

        let mut file = file.lock()?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl Log for BackgroundLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.target.is_some() && metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        // Best effort
        let _ = self.write_entry(record);
    }

    fn flush(&self) {
        if let Some(Ok(mut file)) = self.target.as_ref().map(|f| f.lock()) {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use log::Level;
    use tempfile::tempdir;

    use super::*;
    use crate::logging::Level as EntryLevel;

    #[test]
    fn test_filter() {
        let dir = tempdir().unwrap();
        let logger = BackgroundLog::new(dir.path().join("voidstrap.log"))
            .with_max_level(LevelFilter::Debug)
            .into_logger();

        assert!(logger.enabled(&Metadata::builder().level(Level::Debug).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Trace).build()));
    }

    #[test]
    fn test_unwritable_target_disables_logger() {
        let dir = tempdir().unwrap();
        let log = BackgroundLog::new(dir.path());
        assert!(log.target.is_none());
        assert_eq!(log.path(), dir.path());
        assert!(!log
            .into_logger()
            .enabled(&Metadata::builder().level(Level::Error).build()));
    }

    #[test]
    fn test_previous_run_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("voidstrap.log");
        fs::write(&path, "previous install\n").unwrap();

        let logger = BackgroundLog::new(&path).into_logger();
        logger.log(&Record::builder().args(format_args!("fresh")).build());
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("previous install"));
        assert!(contents.contains("fresh"));
    }

    #[test]
    fn test_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("voidstrap.log");
        let logger = BackgroundLog::new(&path).into_logger();

        for (level, message) in [(Level::Info, "Partitioning"), (Level::Warn, "Skipping swap")] {
            logger.log(
                &Record::builder()
                    .args(format_args!("{message}"))
                    .level(level)
                    .target("voidstrap")
                    .line(Some(7))
                    .build(),
            );
        }
        logger.flush();

        let entries = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str::<LogEntry>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, EntryLevel::Info);
        assert_eq!(entries[0].message, "Partitioning");
        assert_eq!(entries[1].level, EntryLevel::Warn);
        assert_eq!(entries[1].target, "voidstrap");
        assert_eq!(entries[1].line, 7);
    }
}
