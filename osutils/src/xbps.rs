use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use log::debug;

use crate::{
    dependencies::{Command, Dependency},
    files, path,
};

/// Directory holding trusted repository keys.
pub const KEYS_DIRECTORY: &str = "/var/db/xbps/keys";

/// An `xbps-install` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XbpsInstall {
    /// Install into this root instead of `/`.
    pub root: Option<PathBuf>,

    /// Repositories used instead of the configured ones.
    pub repositories: Vec<String>,

    /// Value of `XBPS_ARCH`.
    pub arch: Option<String>,

    /// Synchronize repository indexes first.
    pub sync: bool,

    /// Update installed packages.
    pub update: bool,

    pub packages: Vec<String>,
}

impl XbpsInstall {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
            sync: true,
            ..Default::default()
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repositories.push(repository.into());
        self
    }

    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn update(mut self) -> Self {
        self.update = true;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Dependency::XbpsInstall.cmd();
        if self.sync {
            cmd.arg("-S");
        }
        if self.update {
            cmd.arg("-u");
        }
        cmd.arg("-y");
        if let Some(ref root) = self.root {
            cmd.arg("-r").arg(root);
        }
        for repository in &self.repositories {
            cmd.arg("-R").arg(repository);
        }
        if let Some(ref arch) = self.arch {
            cmd.env("XBPS_ARCH", arch);
        }
        cmd.args(&self.packages);
        cmd
    }

    pub fn run(&self) -> Result<(), Error> {
        self.command()
            .run_and_check()
            .with_context(|| format!("Failed to install packages {:?}", self.packages))
    }
}

fn reconfigure_command(package: Option<&str>) -> Command {
    let mut cmd = Dependency::XbpsReconfigure.cmd();
    match package {
        Some(package) => cmd.arg("-f").arg(package),
        None => cmd.arg("-fa"),
    };
    cmd
}

/// Forces reconfiguration of `package`, or of all packages when `None`.
pub fn reconfigure(package: Option<&str>) -> Result<(), Error> {
    reconfigure_command(package)
        .run_and_check()
        .with_context(|| match package {
            Some(package) => format!("Failed to reconfigure '{package}'"),
            None => "Failed to reconfigure all packages".into(),
        })
}

/// Copies the trusted repository keys of `source_root` into `target_root`,
/// so that the target trusts the same repositories without prompting.
pub fn copy_keys(source_root: impl AsRef<Path>, target_root: impl AsRef<Path>) -> Result<usize, Error> {
    let source = path::join_relative(source_root.as_ref(), KEYS_DIRECTORY);
    let target = path::join_relative(target_root.as_ref(), KEYS_DIRECTORY);
    files::create_dirs(&target)?;

    let mut copied = 0;
    for entry in std::fs::read_dir(&source)
        .with_context(|| format!("Failed to read keys from '{}'", source.display()))?
    {
        let entry = entry.context("Failed to read key directory entry")?;
        if entry.path().is_file() {
            files::copy_file(entry.path(), target.join(entry.file_name()))?;
            copied += 1;
        }
    }
    debug!("Copied {copied} xbps keys into '{}'", target.display());
    Ok(copied)
}
