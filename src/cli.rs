use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::VOIDSTRAP_VERSION;

#[derive(Parser, Debug)]
#[clap(version = VOIDSTRAP_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Debug)]
    pub verbosity: LevelFilter,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install Void Linux, erasing the target disk
    ///
    /// Without a configuration file, the configuration is collected
    /// interactively. Passwords are always prompted for.
    Install {
        /// Install configuration to apply
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Do not ask for confirmation before erasing the target disk
        #[clap(long)]
        yes: bool,
    },

    /// Print what an installation with the given configuration would do
    Plan {
        /// Path to an install configuration file
        #[clap(index = 1)]
        file: PathBuf,
    },

    /// Validate the provided install configuration
    Validate {
        /// Path to an install configuration file
        #[clap(index = 1)]
        file: PathBuf,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Install { .. } => "install",
            Commands::Plan { .. } => "plan",
            Commands::Validate { .. } => "validate",
        }
    }
}

impl Display for Commands {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_install() {
        let cli = Cli::parse_from(["voidstrap", "install", "--config", "void.yaml", "--yes"]);
        assert_eq!(cli.verbosity, LevelFilter::Debug);
        match cli.command {
            Commands::Install { config, yes } => {
                assert_eq!(config, Some(PathBuf::from("void.yaml")));
                assert!(yes);
            }
            other => panic!("unexpected command {other}"),
        }

        let cli = Cli::parse_from(["voidstrap", "-v", "trace", "install"]);
        assert_eq!(cli.verbosity, LevelFilter::Trace);
        assert!(matches!(
            cli.command,
            Commands::Install {
                config: None,
                yes: false
            }
        ));
    }

    #[test]
    fn test_parse_plan_and_validate() {
        let cli = Cli::parse_from(["voidstrap", "plan", "void.yaml", "--verbosity", "warn"]);
        assert_eq!(cli.command.to_string(), "plan");
        assert_eq!(cli.verbosity, LevelFilter::Warn);

        let cli = Cli::parse_from(["voidstrap", "validate", "void.yaml"]);
        assert!(matches!(cli.command, Commands::Validate { file } if file == PathBuf::from("void.yaml")));

        Cli::try_parse_from(["voidstrap", "plan"]).unwrap_err();
    }
}
