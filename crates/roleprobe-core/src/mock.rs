//! In-memory emulator for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::model::{Claims, DocumentRef, Fields, IdToken, Operation, Role, UserRecord};
use crate::traits::{DocumentStore, IdentityAdmin, IdentityClient};
use crate::{Error, Result};

/// Role permission table evaluated by [`MockEmulator`].
///
/// Unauthenticated requests and roles without an entry are denied
/// everything.
#[derive(Debug, Clone, Default)]
pub struct MockRules {
    grants: HashMap<Role, HashSet<Operation>>,
}

impl MockRules {
    /// Rules that deny everything.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Admin full access, editor create and read, viewer read only.
    pub fn standard() -> Self {
        use Operation::*;
        Self::deny_all()
            .allow(Role::Admin, &[Create, Read, Update, Delete])
            .allow(Role::Editor, &[Create, Read])
            .allow(Role::Viewer, &[Read])
    }

    /// Grants operations to a role.
    pub fn allow(mut self, role: Role, operations: &[Operation]) -> Self {
        self.grants
            .entry(role)
            .or_default()
            .extend(operations.iter().copied());
        self
    }

    fn permits(&self, role: Option<Role>, operation: Operation) -> bool {
        role.and_then(|r| self.grants.get(&r))
            .is_some_and(|ops| ops.contains(&operation))
    }
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: String,
    role: Option<Role>,
}

#[derive(Default)]
struct MockState {
    accounts: Vec<Account>,
    tokens: HashMap<String, Option<Role>>,
    documents: HashMap<DocumentRef, Fields>,
    sign_ins: Vec<String>,
    offline: HashSet<Operation>,
    broken_accounts: HashSet<String>,
    next_id: u64,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.email == email)
    }
}

/// Identity and document backend held in memory.
///
/// Implements all three backend traits. Custom claims are captured in the
/// token at sign-in time, as with a real ID token.
#[derive(Clone)]
pub struct MockEmulator {
    rules: Arc<MockRules>,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmulator {
    /// Emulator using [`MockRules::standard`].
    pub fn new() -> Self {
        Self::with_rules(MockRules::standard())
    }

    /// Emulator using the given rules.
    pub fn with_rules(rules: MockRules) -> Self {
        Self {
            rules: Arc::new(rules),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Makes an operation fail with a transport error, as if the database
    /// were unreachable.
    pub async fn take_offline(&self, operation: Operation) {
        self.state.lock().await.offline.insert(operation);
    }

    /// Makes account creation for this email fail with a backend error.
    pub async fn break_account(&self, email: &str) {
        self.state
            .lock()
            .await
            .broken_accounts
            .insert(email.to_string());
    }

    /// Emails that signed in, in order.
    pub async fn sign_ins(&self) -> Vec<String> {
        self.state.lock().await.sign_ins.clone()
    }

    /// Number of stored documents.
    pub async fn document_count(&self) -> usize {
        self.state.lock().await.documents.len()
    }

    /// A stored document, bypassing the rules.
    pub async fn document(&self, doc: &DocumentRef) -> Option<Fields> {
        self.state.lock().await.documents.get(doc).cloned()
    }

    /// Stores a document directly, bypassing the rules.
    pub async fn insert_document(&self, doc: DocumentRef, fields: Fields) {
        self.state.lock().await.documents.insert(doc, fields);
    }

    fn authorize(
        &self,
        state: &MockState,
        auth: Option<&IdToken>,
        operation: Operation,
        doc: &DocumentRef,
    ) -> Result<()> {
        if state.offline.contains(&operation) {
            return Err(Error::transport(format!("{operation} {doc}: connection refused")));
        }
        let role = auth
            .and_then(|t| state.tokens.get(t.as_str()))
            .copied()
            .flatten();
        if self.rules.permits(role, operation) {
            Ok(())
        } else {
            Err(Error::permission_denied(format!(
                "{operation} on {doc} denied by rules"
            )))
        }
    }
}

#[async_trait]
impl IdentityAdmin for MockEmulator {
    async fn create_user(&self, email: &str, password: &str) -> Result<UserRecord> {
        let mut state = self.state.lock().await;
        if state.broken_accounts.contains(email) {
            return Err(Error::backend(500, "INTERNAL"));
        }
        if state.find_by_email(email).is_some() {
            return Err(Error::account_exists(email));
        }
        let uid = state.next_id("uid");
        state.accounts.push(Account {
            uid: uid.clone(),
            email: email.to_string(),
            password: password.to_string(),
            role: None,
        });
        Ok(UserRecord {
            uid,
            email: email.to_string(),
            role: None,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord> {
        let state = self.state.lock().await;
        state
            .find_by_email(email)
            .map(|a| UserRecord {
                uid: a.uid.clone(),
                email: a.email.clone(),
                role: a.role,
            })
            .ok_or_else(|| Error::not_found(format!("no account for {email}")))
    }

    async fn set_custom_claims(&self, uid: &str, claims: &Claims) -> Result<()> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.uid == uid)
            .ok_or_else(|| Error::not_found(format!("no account with uid {uid}")))?;
        account.role = Some(claims.role);
        Ok(())
    }
}

#[async_trait]
impl IdentityClient for MockEmulator {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdToken> {
        let mut state = self.state.lock().await;
        let (uid, role) = match state.find_by_email(email) {
            Some(a) if a.password == password => (a.uid.clone(), a.role),
            Some(_) => return Err(Error::authentication("INVALID_PASSWORD")),
            None => return Err(Error::authentication("EMAIL_NOT_FOUND")),
        };
        let token = state.next_id("token");
        state.tokens.insert(token.clone(), role);
        state.sign_ins.push(email.to_string());
        Ok(IdToken::new(uid, token))
    }
}

#[async_trait]
impl DocumentStore for MockEmulator {
    async fn set(&self, auth: Option<&IdToken>, doc: &DocumentRef, fields: &Fields) -> Result<()> {
        let mut state = self.state.lock().await;
        let operation = if state.documents.contains_key(doc) {
            Operation::Update
        } else {
            Operation::Create
        };
        self.authorize(&state, auth, operation, doc)?;
        state.documents.insert(doc.clone(), fields.clone());
        Ok(())
    }

    async fn get(&self, auth: Option<&IdToken>, doc: &DocumentRef) -> Result<Option<Fields>> {
        let state = self.state.lock().await;
        self.authorize(&state, auth, Operation::Read, doc)?;
        Ok(state.documents.get(doc).cloned())
    }

    async fn update(
        &self,
        auth: Option<&IdToken>,
        doc: &DocumentRef,
        fields: &Fields,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        self.authorize(&state, auth, Operation::Update, doc)?;
        let existing = state
            .documents
            .get_mut(doc)
            .ok_or_else(|| Error::not_found(format!("no document {doc}")))?;
        existing.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn delete(&self, auth: Option<&IdToken>, doc: &DocumentRef) -> Result<()> {
        let mut state = self.state.lock().await;
        self.authorize(&state, auth, Operation::Delete, doc)?;
        state.documents.remove(doc);
        Ok(())
    }
}
