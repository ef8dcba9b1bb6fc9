//! CLI argument parsing and command definitions.

use clap::{Args, Parser, Subcommand};
use roleprobe_core::ProbeMode;

use crate::config::ReportFormat;

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "roleprobe", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "ROLEPROBE_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute. Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the fixture accounts, then probe every user.
    Run(ProbeArgs),

    /// Create the fixture accounts and assign their roles.
    Setup {
        /// Report format.
        #[arg(long, value_enum)]
        format: Option<ReportFormat>,
    },

    /// Probe every user; the fixture accounts must already exist.
    Probe(ProbeArgs),

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Options shared by `run` and `probe`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeArgs {
    /// How documents are provided to users who may not create them:
    /// escalate or seeded.
    #[arg(long)]
    pub mode: Option<ProbeMode>,

    /// Report format.
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Print FAILED outcomes as DENIED.
    #[arg(long)]
    pub conflate_failures: bool,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_default() {
        let args = CliArgs::parse_from(["roleprobe"]);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_cli_args_global_flags() {
        let args = CliArgs::parse_from(["roleprobe", "-v", "--config", "/tmp/rp.toml"]);
        assert!(args.verbose);
        assert_eq!(args.config.as_deref(), Some("/tmp/rp.toml"));
    }

    #[test]
    fn test_run_flags() {
        let args = CliArgs::parse_from([
            "roleprobe",
            "run",
            "--mode",
            "seeded",
            "--format",
            "json",
            "--conflate-failures",
        ]);
        match args.command {
            Some(Command::Run(probe)) => {
                assert_eq!(probe.mode, Some(ProbeMode::Seeded));
                assert_eq!(probe.format, Some(ReportFormat::Json));
                assert!(probe.conflate_failures);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_run_without_flags() {
        let args = CliArgs::parse_from(["roleprobe", "run"]);
        match args.command {
            Some(Command::Run(probe)) => assert_eq!(probe, ProbeArgs::default()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_probe_rejects_unknown_mode() {
        let result = CliArgs::try_parse_from(["roleprobe", "probe", "--mode", "sideways"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_setup_command() {
        let args = CliArgs::parse_from(["roleprobe", "setup", "--format", "text"]);
        assert!(matches!(
            args.command,
            Some(Command::Setup {
                format: Some(ReportFormat::Text)
            })
        ));
    }

    #[test]
    fn test_config_init_command() {
        let args = CliArgs::parse_from(["roleprobe", "config", "init", "--file", "x.toml", "--force"]);
        match args.command {
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Init { file, force },
            })) => {
                assert_eq!(file.as_deref(), Some("x.toml"));
                assert!(force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_show_and_path() {
        let args = CliArgs::parse_from(["roleprobe", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Show
            }))
        ));
        let args = CliArgs::parse_from(["roleprobe", "config", "path"]);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Path
            }))
        ));
    }

    #[test]
    fn test_version_command() {
        let args = CliArgs::parse_from(["roleprobe", "version"]);
        assert!(matches!(args.command, Some(Command::Version)));
    }
}
