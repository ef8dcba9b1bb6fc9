//! Per-user permission probes.
//!
//! Each probe signs in as a fixture user and attempts create, read, update
//! and delete on one document. Failures of those four calls are recorded as
//! outcomes and never propagated. Sign-in failures and admin writes made on a
//! user's behalf are propagated and abort the run.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::model::{DocumentRef, Fields, FixtureUser, Operation, Outcome, ProbeDocument, Role};
use crate::report::{Transcript, UserReport};
use crate::session::Session;
use crate::settings::{ProbeMode, ProbeSettings};
use crate::traits::{DocumentStore, IdentityClient};
use crate::{Error, Result};

/// Runs permission probes for the configured fixture users.
pub struct Prober {
    settings: Arc<ProbeSettings>,
    store: Arc<dyn DocumentStore>,
    session: Session,
}

impl Prober {
    /// Creates a prober with a signed-out session.
    pub fn new(
        settings: Arc<ProbeSettings>,
        identity: Arc<dyn IdentityClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            settings,
            store,
            session: Session::new(identity),
        }
    }

    /// The session, signed out between probes.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Probes every fixture user in order, using the configured mode.
    pub async fn probe_all(&mut self, transcript: &mut Transcript) -> Result<Vec<UserReport>> {
        let settings = Arc::clone(&self.settings);
        let users = &settings.users;
        let mut reports = Vec::with_capacity(users.len());

        match settings.mode {
            ProbeMode::Escalate => {
                for user in users {
                    reports.push(self.probe_user(user, transcript).await?);
                }
            }
            ProbeMode::Seeded => {
                let docs = self.seed_documents(users).await?;
                for (user, doc) in users.iter().zip(&docs) {
                    reports.push(self.probe_seeded(user, doc, transcript).await?);
                }
            }
        }

        Ok(reports)
    }

    /// Probes one user, escalating to the admin fixture when the user cannot
    /// create the document itself.
    ///
    /// The state sequence is: sign in, create, optional admin bootstrap,
    /// read, update (only if the document is known to exist), delete, sign
    /// out.
    pub async fn probe_user(
        &mut self,
        user: &FixtureUser,
        transcript: &mut Transcript,
    ) -> Result<UserReport> {
        let mut report = UserReport::new(user);

        self.session.sign_in(user).await?;
        transcript.user_header(user)?;

        let doc = DocumentRef::auto(&self.settings.collection);
        debug!(email = %user.email, %doc, "probing document");

        let created = self
            .attempt_create(&doc, user.role, &mut report, transcript)
            .await?;
        let mut doc_exists = created.is_allowed();

        if !doc_exists && user.role != Role::Admin {
            self.bootstrap_as_admin(user, &doc).await?;
            report.bootstrapped = true;
            doc_exists = true;
        }

        self.attempt_read(&doc, &mut report, transcript).await?;
        if doc_exists {
            self.attempt_update(&doc, &mut report, transcript).await?;
        } else {
            debug!(email = %user.email, "document never existed, skipping update");
        }
        self.attempt_delete(&doc, &mut report, transcript).await?;

        self.session.sign_out();
        Ok(report)
    }

    /// Writes one document per user as the admin fixture, before any probe
    /// runs. Returned references line up with `users`.
    pub async fn seed_documents(&mut self, users: &[FixtureUser]) -> Result<Vec<DocumentRef>> {
        let admin = self.admin()?;
        self.session.sign_in(&admin).await?;

        let fields = ProbeDocument::admin_doc().to_fields();
        let mut docs = Vec::with_capacity(users.len());
        for user in users {
            let doc = DocumentRef::auto(&self.settings.collection);
            self.store.set(self.session.token(), &doc, &fields).await?;
            debug!(email = %user.email, %doc, "seeded document");
            docs.push(doc);
        }

        self.session.sign_out();
        info!(count = docs.len(), "seeded probe documents as admin");
        Ok(docs)
    }

    /// Probes one user against a pre-seeded document. Create is tried on a
    /// separate reference so its outcome cannot affect the other probes.
    pub async fn probe_seeded(
        &mut self,
        user: &FixtureUser,
        doc: &DocumentRef,
        transcript: &mut Transcript,
    ) -> Result<UserReport> {
        let mut report = UserReport::new(user);

        self.session.sign_in(user).await?;
        transcript.user_header(user)?;

        let scratch = DocumentRef::auto(&self.settings.collection);
        self.attempt_create(&scratch, user.role, &mut report, transcript)
            .await?;
        self.attempt_read(doc, &mut report, transcript).await?;
        self.attempt_update(doc, &mut report, transcript).await?;
        self.attempt_delete(doc, &mut report, transcript).await?;

        self.session.sign_out();
        Ok(report)
    }

    fn admin(&self) -> Result<FixtureUser> {
        self.settings
            .admin()
            .cloned()
            .ok_or_else(|| Error::config("no admin fixture user configured"))
    }

    /// Signs in as the admin fixture, writes the document, and restores the
    /// original user's session.
    async fn bootstrap_as_admin(&mut self, user: &FixtureUser, doc: &DocumentRef) -> Result<()> {
        let admin = self.admin()?;
        info!(email = %user.email, %doc, admin = %admin.email, "create denied, bootstrapping document as admin");

        self.session.sign_out();
        self.session.sign_in(&admin).await?;
        self.store
            .set(
                self.session.token(),
                doc,
                &ProbeDocument::admin_doc().to_fields(),
            )
            .await?;
        self.session.sign_out();
        self.session.sign_in(user).await?;
        Ok(())
    }

    async fn attempt_create(
        &self,
        doc: &DocumentRef,
        role: Role,
        report: &mut UserReport,
        transcript: &mut Transcript,
    ) -> Result<Outcome> {
        let fields = ProbeDocument::test_data(role).to_fields();
        let result = self.store.set(self.session.token(), doc, &fields).await;
        self.record(Operation::Create, &result, report, transcript)
    }

    async fn attempt_read(
        &self,
        doc: &DocumentRef,
        report: &mut UserReport,
        transcript: &mut Transcript,
    ) -> Result<Outcome> {
        let result = self.store.get(self.session.token(), doc).await;
        if matches!(result, Ok(None)) {
            debug!(%doc, "read allowed, document missing");
        }
        self.record(Operation::Read, &result, report, transcript)
    }

    async fn attempt_update(
        &self,
        doc: &DocumentRef,
        report: &mut UserReport,
        transcript: &mut Transcript,
    ) -> Result<Outcome> {
        let fields = Fields::from([("content".to_string(), "Updated".to_string())]);
        let result = self.store.update(self.session.token(), doc, &fields).await;
        self.record(Operation::Update, &result, report, transcript)
    }

    async fn attempt_delete(
        &self,
        doc: &DocumentRef,
        report: &mut UserReport,
        transcript: &mut Transcript,
    ) -> Result<Outcome> {
        let result = self.store.delete(self.session.token(), doc).await;
        self.record(Operation::Delete, &result, report, transcript)
    }

    fn record<T>(
        &self,
        operation: Operation,
        result: &Result<T>,
        report: &mut UserReport,
        transcript: &mut Transcript,
    ) -> Result<Outcome> {
        let outcome = Outcome::from_result(result);
        if let Outcome::Failed(reason) = &outcome {
            warn!(%operation, email = ?self.session.email(), %reason, "probe failed for a reason other than a rule denial");
        }
        transcript.outcome(operation, &outcome)?;
        report.record(operation, outcome.clone());
        Ok(outcome)
    }
}
