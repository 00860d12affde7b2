#![forbid(unsafe_code)]

//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use idlefx_core::config::EffectKind;

#[derive(Debug, Parser)]
#[command(name = "idlefx")]
#[command(about = "Idle-triggered terminal screensaver")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Settings file (defaults to $XDG_CONFIG_HOME/idlefx/settings.json)
    #[arg(long, global = true, env = "IDLEFX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append log records to this file. Nothing is logged without it.
    #[arg(long, global = true, env = "IDLEFX_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Write log records as JSON lines
    #[arg(long, global = true, env = "IDLEFX_LOG_JSON")]
    pub log_json: bool,

    /// Fixed seed for reproducible animations
    #[arg(long, global = true, env = "IDLEFX_SEED")]
    pub seed: Option<u64>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Watch for idle time and start the configured effect (default)
    Run,

    /// Preview an effect now; exits when it ends
    Test {
        /// Effect to preview (defaults to the configured one)
        #[arg(value_enum)]
        effect: Option<EffectArg>,
    },

    /// Inspect or reset the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective settings as JSON
    Show,
    /// Print the settings file location
    Path,
    /// Overwrite the settings file with defaults
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EffectArg {
    Matrix,
    Mystify,
}

impl From<EffectArg> for EffectKind {
    fn from(arg: EffectArg) -> Self {
        match arg {
            EffectArg::Matrix => EffectKind::Matrix,
            EffectArg::Mystify => EffectKind::Mystify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["idlefx"]).unwrap();
        assert_eq!(cli.command, None);
        assert!(!cli.log_json);
    }

    #[test]
    fn test_takes_effect_name() {
        let cli = Cli::try_parse_from(["idlefx", "test", "mystify", "--seed", "7"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Test {
                effect: Some(EffectArg::Mystify)
            })
        );
        assert_eq!(cli.seed, Some(7));
        assert!(Cli::try_parse_from(["idlefx", "test", "starfield"]).is_err());
    }

    #[test]
    fn config_subcommands() {
        let cli = Cli::try_parse_from(["idlefx", "--config", "/tmp/x.json", "config", "show"])
            .unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        );
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.json")));
    }

    #[test]
    fn effect_arg_maps_to_kind() {
        assert_eq!(EffectKind::from(EffectArg::Matrix), EffectKind::Matrix);
        assert_eq!(EffectKind::from(EffectArg::Mystify), EffectKind::Mystify);
    }
}
