use std::{panic, process::ExitCode};

use anyhow::{Context, Error};
use clap::Parser;
use log::{error, info};

use voidstrap::{
    cli::{Cli, Commands},
    collect::{self, Terminal},
    validation, BackgroundLog, InstallPlan, MultiLogger,
};
use voidstrap_api::{
    config::InstallConfiguration,
    constants::BACKGROUND_LOG_PATH,
    error::{InternalError, VoidstrapError, VoidstrapResultExt},
};

fn run_voidstrap(args: &Cli) -> Result<(), VoidstrapError> {
    // Log version ASAP
    info!("voidstrap version: {}", voidstrap::VOIDSTRAP_VERSION);

    // Commands that never touch the host
    match &args.command {
        Commands::Validate { file } => {
            return validation::validate_config_file(file).map(|_| ());
        }

        Commands::Plan { file } => {
            let config = InstallConfiguration::load_from_file(file)?;
            println!("{}", InstallPlan::new(config).to_yaml()?);
            return Ok(());
        }

        Commands::Install { .. } => (),
    }

    let res = panic::catch_unwind(move || {
        let Commands::Install { config, yes } = &args.command else {
            return Err(VoidstrapError::internal("Invalid command"));
        };

        let mut terminal = Terminal;
        let config = match config {
            Some(path) => InstallConfiguration::load_from_file(path)
                .message("Failed to load install configuration")?,
            None => collect::collect_configuration(&mut terminal)
                .message("Failed to collect install configuration")?,
        };

        let firmware = voidstrap::check_host(&config).message("Host is not ready to install")?;
        let credentials = collect::collect_credentials(&mut terminal, &config)?;
        if !*yes {
            collect::confirm_destruction(&mut terminal, &config.disk)?;
        }

        voidstrap::install(config, credentials, firmware)
            .message(format!("Failed to execute '{}' command", args.command))
    });

    match res {
        Err(e) => Err(VoidstrapError::new(InternalError::Panic(format!("{e:?}")))),
        Ok(r) => r,
    }
}

fn setup_logging(args: &Cli) -> Result<(), Error> {
    let mut multilogger = MultiLogger::new()
        // Add regular env_logger to output to stderr
        .with_logger(Box::new(
            env_logger::builder()
                .format_timestamp(None)
                .filter_level(args.verbosity)
                .build(),
        ))
        .with_max_level(args.verbosity);

    // Add background logger if we're running a command that needs it
    if matches!(args.command, Commands::Install { .. }) {
        multilogger.add_logger(
            BackgroundLog::new(BACKGROUND_LOG_PATH)
                .with_max_level(args.verbosity)
                .into_logger(),
        );
    }

    multilogger.init().context("Logger already registered")
}

fn main() -> ExitCode {
    // Parse args
    let args = Cli::parse();

    // Initialize the loggers
    if let Err(e) = setup_logging(&args) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(1);
    }

    if let Err(e) = run_voidstrap(&args) {
        error!("voidstrap failed: {e:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
