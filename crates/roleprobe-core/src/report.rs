//! Transcript output and the structured run report.
//!
//! [`Transcript`] writes each line as soon as it is known, so a fatal error
//! still leaves everything printed up to that point. [`RunReport`] collects
//! the same facts for machine-readable output.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::model::{FixtureUser, Operation, Outcome, Role};

// ============================================================================
// Transcript
// ============================================================================

/// Line-oriented, human-readable run transcript.
pub struct Transcript {
    out: Box<dyn Write + Send>,
    conflate_failures: bool,
}

impl Transcript {
    /// Transcript written to the given sink.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            conflate_failures: false,
        }
    }

    /// Transcript written to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Report every failure as `DENIED`, whatever its cause.
    pub fn with_conflated_failures(mut self, conflate: bool) -> Self {
        self.conflate_failures = conflate;
        self
    }

    /// Writes one line and flushes it.
    pub fn line(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }

    /// `Created: <email>`
    pub fn account_created(&mut self, email: &str) -> Result<()> {
        self.line(format_args!("Created: {email}"))
    }

    /// `Exists: <email>`
    pub fn account_exists(&mut self, email: &str) -> Result<()> {
        self.line(format_args!("Exists: {email}"))
    }

    /// `Role: <role> for <email>`
    pub fn role_assigned(&mut self, role: Role, email: &str) -> Result<()> {
        self.line(format_args!("Role: {role} for {email}"))
    }

    /// Blank line then a row of 30 `=`.
    pub fn separator(&mut self) -> Result<()> {
        self.line(format_args!("\n{}", "=".repeat(30)))
    }

    /// Blank line then `<role>: <email>`.
    pub fn user_header(&mut self, user: &FixtureUser) -> Result<()> {
        self.line(format_args!("\n{}: {}", user.role, user.email))
    }

    /// `<OPERATION>: <OK|DENIED|FAILED (...)>`
    pub fn outcome(&mut self, operation: Operation, outcome: &Outcome) -> Result<()> {
        let rendered = self.render(outcome);
        self.line(format_args!("{operation}: {rendered}"))
    }

    /// Blank line then `Done.`
    pub fn done(&mut self) -> Result<()> {
        self.line("\nDone.")
    }

    fn render(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Allowed => "OK".to_string(),
            Outcome::Denied => "DENIED".to_string(),
            Outcome::Failed(_) if self.conflate_failures => "DENIED".to_string(),
            Outcome::Failed(reason) => format!("FAILED ({reason})"),
        }
    }
}

/// Cloneable in-memory sink, for reading back what a [`Transcript`] wrote.
#[derive(Clone, Default)]
pub struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    /// Empty capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }

    /// Non-empty lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .buf
            .lock()
            .map_err(|_| io::Error::other("capture buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Structured report
// ============================================================================

/// How a fixture account was provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Created by this run.
    Created,
    /// Already present.
    Exists,
}

/// Setup result for one fixture user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupEntry {
    /// Account email.
    pub email: String,
    /// Backend account id.
    pub uid: String,
    /// Whether the account was created or found.
    pub status: AccountStatus,
    /// Role claim that was attached.
    pub role: Role,
}

/// One probe and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Operation attempted.
    pub operation: Operation,
    /// What happened.
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Probe results for one fixture user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReport {
    /// Account email.
    pub email: String,
    /// Role probed.
    pub role: Role,
    /// Whether the admin fixture wrote the document for this user.
    pub bootstrapped: bool,
    /// Results in the order they were attempted.
    pub probes: Vec<ProbeResult>,
}

impl UserReport {
    /// Empty report for a user.
    pub fn new(user: &FixtureUser) -> Self {
        Self {
            email: user.email.clone(),
            role: user.role,
            bootstrapped: false,
            probes: Vec::new(),
        }
    }

    /// Records a result.
    pub fn record(&mut self, operation: Operation, outcome: Outcome) {
        self.probes.push(ProbeResult { operation, outcome });
    }

    /// Outcome of an operation, or `None` if it was skipped.
    pub fn outcome(&self, operation: Operation) -> Option<&Outcome> {
        self.probes
            .iter()
            .find(|p| p.operation == operation)
            .map(|p| &p.outcome)
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Fixture setup, empty when setup was not run.
    pub setup: Vec<SetupEntry>,
    /// Probe results, empty when probes were not run.
    pub users: Vec<UserReport>,
}

impl RunReport {
    /// Report for a given user email.
    pub fn user(&self, email: &str) -> Option<&UserReport> {
        self.users.iter().find(|u| u.email == email)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
