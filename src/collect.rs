//! Interactive collection of the install configuration and of the secrets
//! that never live in a configuration file.

use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};
use log::{debug, warn};

use voidstrap_api::{
    config::{
        BootLayout, Encryption, Filesystem, Gpu, InstallConfiguration, Kernel, Libc, LvmOptions,
        PrivilegeTool, SnapshotStrategy, StorageStack, Swap, VolumeManager,
    },
    constants::{
        DEFAULT_BOOT_TIMEOUT, DEFAULT_ESP_SIZE_MIB, DEFAULT_REPOSITORY, DEFAULT_SWAP_SIZE,
    },
    error::{InvalidInputError, PreconditionError, ReportError, VoidstrapError},
    primitives::{
        bytes::ByteCount,
        secret::{Credentials, Secret},
    },
};

/// Word the operator has to type before the target disk is erased.
const CONFIRMATION_WORD: &str = "YES";

/// Source of answers to single-line questions.
pub trait Prompter {
    fn text(&mut self, question: &str, default: Option<&str>) -> Result<String, VoidstrapError>;

    /// Returns the index of the chosen option.
    fn select(&mut self, question: &str, options: &[&str]) -> Result<usize, VoidstrapError>;

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool, VoidstrapError>;

    /// Reads a secret without echoing it.
    fn secret(&mut self, question: &str) -> Result<Secret, VoidstrapError>;
}

/// Prompts on the controlling terminal.
pub struct Terminal;

fn prompt_error(question: &str) -> InvalidInputError {
    InvalidInputError::Prompt {
        question: question.to_string(),
    }
}

impl Prompter for Terminal {
    fn text(&mut self, question: &str, default: Option<&str>) -> Result<String, VoidstrapError> {
        let mut prompt = Text::new(question);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        prompt.prompt().structured(prompt_error(question))
    }

    fn select(&mut self, question: &str, options: &[&str]) -> Result<usize, VoidstrapError> {
        Select::new(question, options.to_vec())
            .raw_prompt()
            .map(|choice| choice.index)
            .structured(prompt_error(question))
    }

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool, VoidstrapError> {
        Confirm::new(question)
            .with_default(default)
            .prompt()
            .structured(prompt_error(question))
    }

    fn secret(&mut self, question: &str) -> Result<Secret, VoidstrapError> {
        Password::new(question)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
            .map(Secret::new)
            .structured(prompt_error(question))
    }
}

/// Asks for every configurable choice and returns a validated configuration.
///
/// Choices without a question (firmware, architecture, ESP size, boot layout,
/// repository, boot timeout) take their defaults; a configuration file is
/// needed to change them.
pub fn collect_configuration(
    prompter: &mut impl Prompter,
) -> Result<InstallConfiguration, VoidstrapError> {
    let disk = prompter.text("Target disk (will be erased):", None)?;
    let hostname = prompter.text("Hostname:", Some("void"))?;
    let timezone = prompter.text("Timezone:", Some("UTC"))?;
    let locale = prompter.text("Locale:", Some("en_US.UTF-8"))?;
    let keymap = prompter.text("Keymap:", Some("us"))?;
    let username = prompter.text("Username:", None)?;

    let libc = match prompter.select("C library:", &["glibc", "musl"])? {
        0 => Libc::Glibc,
        _ => Libc::Musl,
    };

    let storage = collect_storage(prompter)?;
    let swap = collect_swap(prompter)?;

    let kernel = match prompter.select("Kernel:", &["mainline", "lts", "both"])? {
        0 => Kernel::Mainline,
        1 => Kernel::Lts,
        _ => Kernel::Both,
    };
    let gpu = match prompter.select("Graphics driver:", &["generic", "nvidia"])? {
        0 => Gpu::Generic,
        _ => Gpu::Nvidia,
    };
    let privilege_tool = match prompter.select("Privilege escalation tool:", &["sudo", "doas"])? {
        0 => PrivilegeTool::Sudo,
        _ => PrivilegeTool::Doas,
    };

    let config = InstallConfiguration {
        disk,
        firmware: None,
        architecture: None,
        esp_size: DEFAULT_ESP_SIZE_MIB,
        boot_layout: BootLayout::default(),
        hostname,
        timezone,
        locale,
        keymap,
        username,
        libc,
        repository: DEFAULT_REPOSITORY.into(),
        kernel,
        gpu,
        privilege_tool,
        boot_timeout: DEFAULT_BOOT_TIMEOUT,
        storage,
        swap,
    };

    config
        .validate()
        .map_err(|e| VoidstrapError::new(InvalidInputError::InvalidConfiguration(e)))?;
    debug!("Collected install configuration: {config:?}");
    Ok(config)
}

fn collect_storage(prompter: &mut impl Prompter) -> Result<StorageStack, VoidstrapError> {
    let names = Filesystem::ALL.map(Filesystem::name);
    let filesystem = Filesystem::ALL[prompter.select("Root filesystem:", &names)?];

    let encryption = if prompter.confirm("Encrypt the disk with LUKS?", false)? {
        Encryption::Luks
    } else {
        Encryption::None
    };

    let volume_manager = if prompter.confirm("Use LVM?", false)? {
        let defaults = LvmOptions::default();
        let volume_group = prompter.text("Volume group name:", Some(defaults.volume_group.as_str()))?;
        // btrfs and bcachefs keep /home on the root filesystem
        let separate_home = !filesystem.supports_subvolumes()
            && prompter.confirm("Put /home on a separate logical volume?", false)?;
        let root_size = if separate_home {
            Some(ask_size(prompter, "Root logical volume size:", "50G")?)
        } else {
            None
        };
        VolumeManager::Lvm(LvmOptions {
            volume_group,
            root_size,
            separate_home,
            ..defaults
        })
    } else {
        VolumeManager::None
    };

    let mut storage = StorageStack {
        filesystem,
        encryption,
        volume_manager,
        snapshots: true,
    };
    // ext4 and xfs can only be snapshotted through LVM
    storage.snapshots = storage.snapshot_strategy() != SnapshotStrategy::None
        && prompter.confirm("Take daily snapshots of the root filesystem?", false)?;
    Ok(storage)
}

fn collect_swap(prompter: &mut impl Prompter) -> Result<Swap, VoidstrapError> {
    if !prompter.confirm("Enable swap?", true)? {
        return Ok(Swap::default());
    }

    let size = ask_size(prompter, "Swap size:", DEFAULT_SWAP_SIZE)?;
    let compression = prompter.confirm("Enable compressed swap cache (zswap)?", false)?;

    Ok(Swap {
        enabled: true,
        size,
        compression,
    })
}

/// Repeats the question until the answer parses as a non-zero size.
fn ask_size(
    prompter: &mut impl Prompter,
    question: &str,
    default: &str,
) -> Result<ByteCount, VoidstrapError> {
    loop {
        let answer = prompter.text(question, Some(default))?;
        match answer.parse::<ByteCount>() {
            Ok(size) if size.bytes() > 0 => return Ok(size),
            _ => warn!("'{answer}' is not a size, expected e.g. '4G' or '512M'"),
        }
    }
}

/// Asks for the root password, the user password and, for an encrypted
/// stack, the LUKS passphrase. Each secret is asked twice.
pub fn collect_credentials(
    prompter: &mut impl Prompter,
    config: &InstallConfiguration,
) -> Result<Credentials, VoidstrapError> {
    let root_password = ask_secret(prompter, "root")?;
    let user_password = ask_secret(prompter, &config.username)?;
    let luks_passphrase = if config.storage.is_encrypted() {
        Some(ask_secret(prompter, "LUKS")?)
    } else {
        None
    };

    Ok(Credentials {
        root_password,
        user_password,
        luks_passphrase,
    })
}

fn ask_secret(prompter: &mut impl Prompter, account: &str) -> Result<Secret, VoidstrapError> {
    let first = prompter.secret(&format!("Password for {account}:"))?;
    let second = prompter.secret(&format!("Repeat password for {account}:"))?;
    confirm_secret(account, first, second)
}

/// Checks that both answers are equal and not empty.
pub fn confirm_secret(
    account: &str,
    first: Secret,
    second: Secret,
) -> Result<Secret, VoidstrapError> {
    if first.is_empty() {
        return Err(VoidstrapError::new(PreconditionError::EmptyPassword {
            account: account.into(),
        }));
    }
    if first.expose() != second.expose() {
        return Err(VoidstrapError::new(PreconditionError::PasswordMismatch {
            account: account.into(),
        }));
    }
    Ok(first)
}

/// Requires the operator to type [`CONFIRMATION_WORD`] before `disk` is
/// erased.
pub fn confirm_destruction(prompter: &mut impl Prompter, disk: &str) -> Result<(), VoidstrapError> {
    let answer = prompter.text(
        &format!("All data on {disk} will be destroyed. Type {CONFIRMATION_WORD} to continue:"),
        None,
    )?;
    if answer.trim() != CONFIRMATION_WORD {
        return Err(VoidstrapError::new(PreconditionError::NotConfirmed));
    }
    Ok(())
}
