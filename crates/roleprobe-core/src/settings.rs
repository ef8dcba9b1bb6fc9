//! Explicit settings passed into setup and probe routines.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{FixtureUser, Role};
use crate::{Error, Result};

/// Default Auth emulator endpoint.
pub const DEFAULT_AUTH_HOST: &str = "127.0.0.1:9099";
/// Default Firestore emulator host.
pub const DEFAULT_FIRESTORE_HOST: &str = "127.0.0.1";
/// Default Firestore emulator port.
pub const DEFAULT_FIRESTORE_PORT: u16 = 8080;
/// Default project id.
pub const DEFAULT_PROJECT_ID: &str = "firestorerules-70291";
/// API key accepted by the Auth emulator.
pub const DEFAULT_API_KEY: &str = "fake-api-key";
/// Collection the probe documents are written to.
pub const DEFAULT_COLLECTION: &str = "testCollection";

/// How read/update/delete get a document to act on when create is denied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Each user creates their own document. When a non-admin user is denied
    /// create, the session switches to the admin fixture to write it, then
    /// back.
    #[default]
    Escalate,
    /// The admin fixture seeds one document per user before any probe runs.
    /// Create is probed against a separate reference and never affects the
    /// later steps.
    Seeded,
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMode::Escalate => f.write_str("escalate"),
            ProbeMode::Seeded => f.write_str("seeded"),
        }
    }
}

impl FromStr for ProbeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "escalate" => Ok(ProbeMode::Escalate),
            "seeded" => Ok(ProbeMode::Seeded),
            other => Err(Error::config(format!(
                "Unknown probe mode '{other}' (expected escalate or seeded)"
            ))),
        }
    }
}

/// Everything setup and the probes need to know about the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Auth emulator `host:port`.
    pub auth_host: String,
    /// Firestore emulator host.
    pub firestore_host: String,
    /// Firestore emulator port.
    pub firestore_port: u16,
    /// Project id shared by both emulators.
    pub project_id: String,
    /// API key sent with sign-in requests.
    pub api_key: String,
    /// Collection probe documents are written to.
    pub collection: String,
    /// Probe mode.
    pub mode: ProbeMode,
    /// Fixture users, probed in order.
    pub users: Vec<FixtureUser>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            auth_host: DEFAULT_AUTH_HOST.to_string(),
            firestore_host: DEFAULT_FIRESTORE_HOST.to_string(),
            firestore_port: DEFAULT_FIRESTORE_PORT,
            project_id: DEFAULT_PROJECT_ID.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            mode: ProbeMode::default(),
            users: FixtureUser::defaults(),
        }
    }
}

impl ProbeSettings {
    /// Checks the invariants the probe relies on.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when there are no users, an email is
    /// repeated, no admin fixture exists, or a required field is empty.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(Error::config("project_id must not be empty"));
        }
        if self.collection.trim().is_empty() {
            return Err(Error::config("collection must not be empty"));
        }
        if self.auth_host.trim().is_empty() || self.firestore_host.trim().is_empty() {
            return Err(Error::config("emulator hosts must not be empty"));
        }
        if self.users.is_empty() {
            return Err(Error::config("at least one fixture user is required"));
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.email.trim().is_empty() {
                return Err(Error::config("fixture user email must not be empty"));
            }
            if !seen.insert(user.email.to_lowercase()) {
                return Err(Error::config(format!(
                    "duplicate fixture user email: {}",
                    user.email
                )));
            }
        }

        if self.admin().is_none() {
            return Err(Error::config(
                "an admin fixture user is required to bootstrap probe documents",
            ));
        }
        Ok(())
    }

    /// The fixture used to write documents on behalf of other users: the
    /// first user with the admin role.
    pub fn admin(&self) -> Option<&FixtureUser> {
        self.users.iter().find(|u| u.role == Role::Admin)
    }

    /// Base URL of the Auth emulator.
    pub fn auth_base_url(&self) -> String {
        format!("http://{}", self.auth_host)
    }

    /// Base URL of the Firestore emulator.
    pub fn firestore_base_url(&self) -> String {
        format!("http://{}:{}", self.firestore_host, self.firestore_port)
    }
}
