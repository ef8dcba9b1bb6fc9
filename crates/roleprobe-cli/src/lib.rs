//! Command-line runner for roleprobe.
//!
//! Loads [`RoleProbeConfig`] from file and environment, installs logging and
//! runs fixture setup and permission probes against the Firebase emulators.
//!
//! # Modules
//!
//! - [`app`]: Application and command dispatch
//! - [`cli`]: Argument parsing
//! - [`config`]: Configuration loading
//! - [`config_handlers`]: `config` subcommands

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;

pub use app::{ReportOptions, RoleProbeCli, RunKind};
pub use cli::{CliArgs, Command, ProbeArgs};
pub use config::{ReportFormat, RoleProbeConfig};
