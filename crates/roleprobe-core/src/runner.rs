//! Whole-run orchestration: setup, separator, probes, done.

use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::probe::Prober;
use crate::report::{RunReport, Transcript};
use crate::settings::ProbeSettings;
use crate::setup::setup_users;
use crate::traits::{DocumentStore, IdentityAdmin, IdentityClient};

/// The three backends a run talks to.
#[derive(Clone)]
pub struct Backends {
    /// Privileged account management.
    pub admin: Arc<dyn IdentityAdmin>,
    /// End-user sign-in.
    pub identity: Arc<dyn IdentityClient>,
    /// Document database.
    pub store: Arc<dyn DocumentStore>,
}

impl Backends {
    /// Uses one value for all three roles.
    pub fn single<B>(backend: Arc<B>) -> Self
    where
        B: IdentityAdmin + IdentityClient + DocumentStore + 'static,
    {
        Self {
            admin: backend.clone(),
            identity: backend.clone(),
            store: backend,
        }
    }
}

/// Runs setup and probes against a set of backends.
pub struct Runner {
    settings: Arc<ProbeSettings>,
    backends: Backends,
}

impl Runner {
    /// Creates a runner after validating the settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are invalid.
    pub fn new(settings: ProbeSettings, backends: Backends) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings: Arc::new(settings),
            backends,
        })
    }

    /// The validated settings.
    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Fixture setup only.
    pub async fn setup(&self, transcript: &mut Transcript) -> Result<RunReport> {
        let setup = setup_users(&*self.backends.admin, &self.settings.users, transcript).await?;
        Ok(RunReport {
            setup,
            users: Vec::new(),
        })
    }

    /// Probes only; the fixture accounts must already exist.
    pub async fn probe(&self, transcript: &mut Transcript) -> Result<RunReport> {
        let users = self.prober().probe_all(transcript).await?;
        Ok(RunReport {
            setup: Vec::new(),
            users,
        })
    }

    /// Setup, a separator, every probe, then `Done.`.
    pub async fn run(&self, transcript: &mut Transcript) -> Result<RunReport> {
        info!(
            project = %self.settings.project_id,
            users = self.settings.users.len(),
            mode = %self.settings.mode,
            "starting run"
        );
        let setup = setup_users(&*self.backends.admin, &self.settings.users, transcript).await?;
        transcript.separator()?;
        let users = self.prober().probe_all(transcript).await?;
        transcript.done()?;
        Ok(RunReport { setup, users })
    }

    fn prober(&self) -> Prober {
        Prober::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.backends.identity),
            Arc::clone(&self.backends.store),
        )
    }
}
