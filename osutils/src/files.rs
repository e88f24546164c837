use std::{
    fs::{File, Permissions},
    io::Write,
    os::unix::fs::PermissionsExt,
    path::Path,
};

use anyhow::{Context, Error};

/// Creates a file and all parent directories if they don't exist
pub fn create_file<S>(path: S) -> Result<File, Error>
where
    S: AsRef<Path>,
{
    if let Some(parent) = path.as_ref().parent() {
        create_dirs(parent)?;
    }

    std::fs::File::create(path.as_ref()).context(format!(
        "Could not create file: {}",
        path.as_ref().display()
    ))
}

/// Creates a file and all parent directories if they don't exist, and sets the file mode
pub fn create_file_mode<S>(path: S, mode: u32) -> Result<File, Error>
where
    S: AsRef<Path>,
{
    let file = create_file(path.as_ref())?;
    std::fs::set_permissions(path.as_ref(), Permissions::from_mode(mode)).context(format!(
        "Could not set permissions {:#o} for file {}",
        mode,
        path.as_ref().display()
    ))?;
    Ok(file)
}

/// Creates all directories in a path if they don't exist
pub fn create_dirs<S>(path: S) -> Result<(), Error>
where
    S: AsRef<Path>,
{
    std::fs::create_dir_all(path.as_ref()).context(format!(
        "Could not create path: {}",
        path.as_ref().display()
    ))
}

/// Writes to a file, replacing its contents
pub fn write_file<S>(path: S, mode: u32, contents: &[u8]) -> Result<(), Error>
where
    S: AsRef<Path>,
{
    let mut file = create_file_mode(path.as_ref(), mode).context(format!(
        "Could not create file: {}",
        path.as_ref().display()
    ))?;

    file.write_all(contents).context(format!(
        "Could not write to file: {}",
        path.as_ref().display()
    ))?;

    Ok(())
}

/// Copies a file, creating the destination's parent directories
pub fn copy_file<S, D>(source: S, destination: D) -> Result<(), Error>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    if let Some(parent) = destination.as_ref().parent() {
        create_dirs(parent)?;
    }

    std::fs::copy(source.as_ref(), destination.as_ref()).context(format!(
        "Could not copy {} to {}",
        source.as_ref().display(),
        destination.as_ref().display()
    ))?;
    Ok(())
}

/// Points `link` at `target`, replacing whatever `link` was before
pub fn replace_symlink<T, L>(target: T, link: L) -> Result<(), Error>
where
    T: AsRef<Path>,
    L: AsRef<Path>,
{
    if link.as_ref().symlink_metadata().is_ok() {
        std::fs::remove_file(link.as_ref()).context(format!(
            "Could not remove existing {}",
            link.as_ref().display()
        ))?;
    } else if let Some(parent) = link.as_ref().parent() {
        create_dirs(parent)?;
    }

    std::os::unix::fs::symlink(target.as_ref(), link.as_ref()).context(format!(
        "Could not link {} to {}",
        link.as_ref().display(),
        target.as_ref().display()
    ))
}
