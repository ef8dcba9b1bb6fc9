//! RoleProbeCli application.
//!
//! Loads configuration, installs logging and dispatches commands. Probe
//! commands talk to the emulators through `roleprobe-emulator`.

use roleprobe_core::{Backends, ProbeSettings, Result, RunReport, Runner, Transcript};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command, ProbeArgs};
use crate::config::{ReportFormat, RoleProbeConfig};
use crate::config_handlers;

/// Which part of a run to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Setup, separator, probes, `Done.`.
    Full,
    /// Fixture setup only.
    Setup,
    /// Probes only.
    Probe,
}

// ============================================================================
// RoleProbeCli
// ============================================================================

/// The roleprobe command-line application.
pub struct RoleProbeCli {
    name: String,
    version: String,
}

impl Default for RoleProbeCli {
    fn default() -> Self {
        Self::new("roleprobe")
    }
}

impl RoleProbeCli {
    /// Create a new CLI application.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Initialise tracing-based logging on stderr.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);
        let config_path = args.config.as_deref();

        match args.command {
            Some(Command::Version) => {
                println!("{} {}", self.name, self.version);
                Ok(())
            }
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(config_path, config_cmd.command)
            }
            Some(Command::Run(probe)) => {
                self.run_against_emulators(config_path, RunKind::Full, probe)
                    .await
            }
            Some(Command::Setup { format }) => {
                let probe = ProbeArgs {
                    format,
                    ..Default::default()
                };
                self.run_against_emulators(config_path, RunKind::Setup, probe)
                    .await
            }
            Some(Command::Probe(probe)) => {
                self.run_against_emulators(config_path, RunKind::Probe, probe)
                    .await
            }
            None => {
                self.run_against_emulators(config_path, RunKind::Full, ProbeArgs::default())
                    .await
            }
        }
    }

    async fn run_against_emulators(
        &self,
        config_path: Option<&str>,
        kind: RunKind,
        probe: ProbeArgs,
    ) -> Result<()> {
        let config = RoleProbeConfig::load(config_path)?;
        let settings = resolve_settings(&config, &probe);
        debug!(?settings, "resolved settings");

        let options = resolve_report_options(&config, &probe);
        let backends = roleprobe_emulator::backends(&settings);
        let mut transcript =
            Transcript::stdout().with_conflated_failures(options.conflate_failures);

        let report = execute(settings, backends, kind, &mut transcript).await?;

        if options.format == ReportFormat::Json {
            println!("{}", report.to_json()?);
        }
        Ok(())
    }
}

/// Configured settings with command-line overrides applied.
pub fn resolve_settings(config: &RoleProbeConfig, probe: &ProbeArgs) -> ProbeSettings {
    let mut settings = config.to_settings();
    if let Some(mode) = probe.mode {
        settings.mode = mode;
    }
    settings
}

/// How a run's results are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Print FAILED outcomes as DENIED.
    pub conflate_failures: bool,
    /// Output format.
    pub format: ReportFormat,
}

/// Configured report options with command-line overrides applied.
///
/// `--format` replaces the configured format. `--conflate-failures` can only
/// turn conflation on; it is combined with the configured value.
pub fn resolve_report_options(config: &RoleProbeConfig, probe: &ProbeArgs) -> ReportOptions {
    ReportOptions {
        conflate_failures: probe.conflate_failures || config.report.conflate_failures,
        format: probe.format.unwrap_or(config.report.format),
    }
}

/// Runs one part of a probe run against `backends`.
pub async fn execute(
    settings: ProbeSettings,
    backends: Backends,
    kind: RunKind,
    transcript: &mut Transcript,
) -> Result<RunReport> {
    let runner = Runner::new(settings, backends)?;
    match kind {
        RunKind::Full => runner.run(transcript).await,
        RunKind::Setup => runner.setup(transcript).await,
        RunKind::Probe => runner.probe(transcript).await,
    }
}

// ============================================================================
// Tests
// ============================================================================
