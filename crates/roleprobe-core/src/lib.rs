//! Roleprobe Core: role-based security rule probing.
//!
//! Provisions fixture users with role claims, signs in as each one and
//! attempts create, read, update and delete against a document database,
//! reporting which operations the security rules allowed.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`model`]: Roles, fixture users, documents and outcomes
//! - [`traits`]: Identity and document backend abstractions
//! - [`session`]: The single authenticated session
//! - [`settings`]: Explicit run settings
//! - [`setup`]: Fixture account provisioning
//! - [`probe`]: Per-user permission probes
//! - [`report`]: Transcript output and structured report
//! - [`runner`]: Whole-run orchestration
//! - [`mock`]: In-memory backend for tests

pub mod error;
pub mod mock;
pub mod model;
pub mod probe;
pub mod report;
pub mod runner;
pub mod session;
pub mod settings;
pub mod setup;
pub mod traits;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use mock::{MockEmulator, MockRules};
pub use model::{
    Claims, DocumentRef, Fields, FixtureUser, IdToken, Operation, Outcome, ProbeDocument, Role,
    UserRecord,
};
pub use probe::Prober;
pub use report::{Capture, RunReport, Transcript, UserReport};
pub use runner::{Backends, Runner};
pub use session::Session;
pub use settings::{ProbeMode, ProbeSettings};
pub use setup::setup_users;
pub use traits::{DocumentStore, IdentityAdmin, IdentityClient};
