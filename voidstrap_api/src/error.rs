use std::fmt::{Debug, Write};
use std::{borrow::Cow, panic::Location};

use strum_macros::IntoStaticStr;

use crate::config::InvalidConfigurationError;

/// The installation cannot start because the host or the operator's answers
/// do not satisfy a precondition.
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum PreconditionError {
    #[error("Installation requires root privileges")]
    NotRoot,
    #[error("UEFI firmware was requested but the host was not booted in UEFI mode")]
    NotUefi,
    #[error("Target device '{path}' does not exist")]
    DeviceNotFound { path: String },
    #[error("Target device '{path}' is not a block device")]
    NotABlockDevice { path: String },
    #[error("Passwords for '{account}' do not match")]
    PasswordMismatch { account: String },
    #[error("Password for '{account}' cannot be empty")]
    EmptyPassword { account: String },
    #[error("Timezone '{timezone}' is not known to the host")]
    InvalidTimezone { timezone: String },
    #[error("Operator did not confirm the destructive installation")]
    NotConfirmed,
}

/// User provided input could not be read or was invalid.
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum InvalidInputError {
    #[error("Failed to load install configuration from '{path}'")]
    LoadConfiguration { path: String },
    #[error("Failed to parse install configuration")]
    ParseConfiguration,
    #[error("Invalid install configuration: {0}")]
    InvalidConfiguration(#[from] InvalidConfigurationError),
    #[error("Failed to read answer for '{question}'")]
    Prompt { question: String },
}

/// A required external tool is missing and could not be installed.
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum ToolingError {
    #[error("Required tool '{tool}' is not available")]
    MissingTool { tool: String },
    #[error("Failed to install packages providing missing tools")]
    InstallTools,
}

/// A step of the installation failed.
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum InstallError {
    #[error("Failed to wipe existing signatures from '{disk}'")]
    WipeDisk { disk: String },
    #[error("Failed to create disk partitions")]
    CreatePartitions,
    #[error("Failed to create encrypted volume")]
    CreateEncryptedVolume,
    #[error("Failed to create volume group")]
    CreateVolumeGroup,
    #[error("Failed to create filesystem on '{device}'")]
    CreateFilesystem { device: String },
    #[error("Failed to create subvolumes")]
    CreateSubvolumes,
    #[error("Failed to read UUID of '{device}'")]
    ReadUuid { device: String },
    #[error("Failed to mount '{target}'")]
    Mount { target: String },
    #[error("Failed to unmount '{target}'")]
    Unmount { target: String },
    #[error("Failed to release storage session")]
    ReleaseSession,
    #[error("Failed to bootstrap base system")]
    Bootstrap,
    #[error("Failed to enter chroot")]
    EnterChroot,
    #[error("Failed to exit chroot")]
    ExitChroot,
    #[error("Failed to configure {step}")]
    Configure { step: &'static str },
    #[error("Failed to install bootloader")]
    InstallBootloader,
    #[error("Failed to register firmware boot entry")]
    RegisterBootEntry,
    #[error("Failed to set up snapshots")]
    Snapshots,
    #[error("Failed to set up swap")]
    Swap,
    #[error("Failed to write fstab")]
    Fstab,
}

#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum InternalError {
    #[error("Internal error: {0}")]
    Internal(&'static str),
    #[error("Voidstrap panicked: {0}")]
    Panic(String),
}

/// Each variant of `ErrorKind` corresponds to a different category of error.
#[derive(Debug, Eq, thiserror::Error, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    #[error(transparent)]
    Tooling(#[from] ToolingError),

    /// An external command or a file operation of the installation failed.
    /// The target disk may be left partially provisioned.
    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug)]
struct VoidstrapErrorInner {
    kind: ErrorKind,
    location: &'static Location<'static>,
    source: Option<anyhow::Error>,
    context: Vec<(Cow<'static, str>, &'static Location<'static>)>,
}

pub struct VoidstrapError(Box<VoidstrapErrorInner>);

impl VoidstrapError {
    #[track_caller]
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        VoidstrapError(Box::new(VoidstrapErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: None,
            context: Vec::new(),
        }))
    }

    #[track_caller]
    pub fn internal(msg: &'static str) -> Self {
        Self::new(InternalError::Internal(msg))
    }

    #[track_caller]
    pub fn secondary_error_context(mut self, secondary: VoidstrapError) -> Self {
        self.0.context.push((
            format!(
                "While handling the error, an additional error was caught: \n\n{secondary:?}\n\nThe earlier error:"
            )
            .into(),
            Location::caller(),
        ));
        self
    }

    pub fn unstructured(self, context: impl Into<Cow<'static, str>>) -> anyhow::Error {
        match self.0.source {
            Some(source) => source.context(self.0.kind).context(context.into()),
            None => anyhow::Error::from(self.0.kind).context(context.into()),
        }
    }

    /// Returns a reference to the inner ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }

    /// Name of the error category, e.g. `precondition`.
    pub fn category(&self) -> &'static str {
        (&self.0.kind).into()
    }
}

pub trait ReportError<T, K> {
    /// Convert this error into a structured VoidstrapError.
    fn structured(self, kind: K) -> Result<T, VoidstrapError>;
}

impl<T, K> ReportError<T, K> for Option<T>
where
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, VoidstrapError> {
        match self {
            Some(t) => Ok(t),
            None => Err(VoidstrapError::new(kind)),
        }
    }
}

impl<T, E, K> ReportError<T, K> for Result<T, E>
where
    E: Into<anyhow::Error>,
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, VoidstrapError> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(VoidstrapError(Box::new(VoidstrapErrorInner {
                kind: kind.into(),
                location: Location::caller(),
                source: Some(e.into()),
                context: Vec::new(),
            }))),
        }
    }
}

pub trait VoidstrapResultExt<T> {
    /// Attach a context message to the error.
    fn message(self, context: impl Into<Cow<'static, str>>) -> Result<T, VoidstrapError>;

    /// Convert the error into an unstructured error.
    fn unstructured(self, context: impl Into<Cow<'static, str>>) -> Result<T, anyhow::Error>;
}

impl<T> VoidstrapResultExt<T> for Result<T, VoidstrapError> {
    #[track_caller]
    fn message(mut self, context: impl Into<Cow<'static, str>>) -> Result<T, VoidstrapError> {
        if let Err(ref mut e) = self {
            e.0.context.push((context.into(), Location::caller()));
        }
        self
    }

    fn unstructured(self, context: impl Into<Cow<'static, str>>) -> Result<T, anyhow::Error> {
        self.map_err(|e| e.unstructured(context))
    }
}

impl Debug for VoidstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.0.kind,
            self.0.location.file(),
            self.0.location.line()
        )?;

        if !self.0.context.is_empty() {
            writeln!(f, "\n\nContext:")?;
            for (i, (context, location)) in self.0.context.iter().enumerate() {
                for (j, line) in context.split('\n').enumerate() {
                    if j == 0 {
                        write!(f, "{: >5}: ", i)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                writeln!(f, " at {}:{}", location.file(), location.line())?;
            }
        }

        if let Some(ref source) = self.0.source {
            writeln!(f, "\n\nCaused by:")?;
            let mut index = 0;
            let mut source: Option<&dyn std::error::Error> = Some(source.as_ref());
            while let Some(e) = source {
                for (i, line) in e.to_string().split('\n').enumerate() {
                    if i == 0 {
                        write!(f, "{: >5}: ", index)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                f.write_char('\n')?;
                source = e.source();
                index += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn test_error_debug() {
        let error = Err::<(), _>(anyhow::anyhow!("z"))
            .context("x\ny")
            .structured(InternalError::Internal("w"))
            .unwrap_err();
        assert_eq!(
            format!("{:?}", error),
            format!(
                "Internal error: w at {}:{}\n\nCaused by:\n    0: x\n       y\n    1: z\n",
                error.0.location.file(),
                error.0.location.line(),
            ),
        );
    }

    #[test]
    fn test_message_context() {
        let error = Err::<(), _>(VoidstrapError::new(InstallError::CreatePartitions))
            .message("Failed to provision '/dev/sda'")
            .unwrap_err();
        let rendered = format!("{error:?}");
        assert!(rendered.starts_with("Failed to create disk partitions at "));
        assert!(rendered.contains("Context:\n    0: Failed to provision '/dev/sda' at "));
    }

    #[test]
    fn test_category() {
        assert_eq!(
            VoidstrapError::new(PreconditionError::NotRoot).category(),
            "precondition"
        );
        assert_eq!(
            VoidstrapError::new(ToolingError::MissingTool {
                tool: "sfdisk".into()
            })
            .category(),
            "tooling"
        );
        assert_eq!(
            None::<()>
                .structured(InstallError::Fstab)
                .unwrap_err()
                .category(),
            "install"
        );
    }

    #[test]
    fn test_unstructured() {
        let error = Err::<(), _>(anyhow::anyhow!("mkfs exited with status: 1"))
            .structured(InstallError::CreateFilesystem {
                device: "/dev/sda2".into(),
            })
            .unstructured("Storage stack failed")
            .unwrap_err();
        let chain = error.chain().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(
            chain,
            vec![
                "Storage stack failed".to_string(),
                "Failed to create filesystem on '/dev/sda2'".to_string(),
                "mkfs exited with status: 1".to_string(),
            ]
        );
    }
}
