use std::path::{Path, PathBuf};

use anyhow::Error;

use crate::{files, path};

/// Service definitions.
pub const SERVICE_DIRECTORY: &str = "/etc/sv";

/// Services started in the default runlevel.
pub const DEFAULT_RUNSVDIR: &str = "/etc/runit/runsvdir/default";

/// Enables `service` in the root at `root` by linking it into the default
/// runsvdir. Returns `false` without changes when the service is not
/// installed.
pub fn enable_service(root: impl AsRef<Path>, service: &str) -> Result<bool, Error> {
    let definition = Path::new(SERVICE_DIRECTORY).join(service);
    if !path::join_relative(root.as_ref(), &definition).is_dir() {
        return Ok(false);
    }

    let link: PathBuf = path::join_relative(root.as_ref(), DEFAULT_RUNSVDIR).join(service);
    files::replace_symlink(&definition, link)?;
    Ok(true)
}
