//! Domain types: roles, fixture users, probe documents and outcomes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// Roles and fixture users
// ============================================================================

/// Application role carried by an account as a custom claim.
///
/// The set is closed: the security rules under test branch on exactly these
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access.
    Admin,
    /// Read and create.
    Editor,
    /// Read only.
    Viewer,
}

impl Role {
    /// All roles, in privilege order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Viewer];

    /// The claim value for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(Error::invalid_data(format!(
                "Unknown role '{other}' (expected admin, editor or viewer)"
            ))),
        }
    }
}

/// A hardcoded test account with an associated role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureUser {
    /// Login email, unique across fixtures.
    pub email: String,
    /// Login password.
    pub password: String,
    /// Role claim attached during setup.
    pub role: Role,
}

impl FixtureUser {
    /// Creates a fixture user.
    pub fn new(email: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role,
        }
    }

    /// The three built-in fixtures: one admin, one editor, one viewer.
    pub fn defaults() -> Vec<FixtureUser> {
        vec![
            FixtureUser::new("admin@example.com", "admin123", Role::Admin),
            FixtureUser::new("editor@example.com", "editor123", Role::Editor),
            FixtureUser::new("viewer@example.com", "viewer123", Role::Viewer),
        ]
    }
}

// ============================================================================
// Identity types
// ============================================================================

/// An account as stored by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Backend-assigned account id.
    pub uid: String,
    /// Account email.
    pub email: String,
    /// Role claim currently attached, if any.
    pub role: Option<Role>,
}

/// Custom claims attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Role consumed by the security rules.
    pub role: Role,
}

impl Claims {
    /// Claims carrying only a role.
    pub fn role(role: Role) -> Self {
        Self { role }
    }
}

/// ID token returned by a successful sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct IdToken {
    /// Account id the token was issued for.
    pub uid: String,
    token: String,
}

impl IdToken {
    /// Wraps a raw bearer token.
    pub fn new(uid: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            token: token.into(),
        }
    }

    /// The raw bearer token.
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdToken")
            .field("uid", &self.uid)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Reference to a document inside a named collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Collection id.
    pub collection: String,
    /// Document id within the collection.
    pub id: String,
}

impl DocumentRef {
    /// Reference to a specific document.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Reference to a new document with a client-generated id.
    pub fn auto(collection: impl Into<String>) -> Self {
        Self::new(collection, uuid::Uuid::new_v4().simple().to_string())
    }

    /// Path relative to the database's document root.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Flat string fields of a document.
pub type Fields = BTreeMap<String, String>;

/// The document written by a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeDocument {
    /// Free-form content.
    pub content: String,
    /// Role of the writer. Absent on admin bootstrap documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ProbeDocument {
    /// The document a user attempts to create.
    pub fn test_data(role: Role) -> Self {
        Self {
            content: "Test data".to_string(),
            role: Some(role),
        }
    }

    /// The document the admin fixture writes on behalf of another user.
    pub fn admin_doc() -> Self {
        Self {
            content: "Admin doc".to_string(),
            role: None,
        }
    }

    /// Flattens the document into string fields.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("content".to_string(), self.content.clone());
        if let Some(role) = self.role {
            fields.insert("role".to_string(), role.to_string());
        }
        fields
    }

    /// Rebuilds a document from string fields.
    pub fn from_fields(fields: &Fields) -> Result<Self> {
        let content = fields
            .get("content")
            .cloned()
            .ok_or_else(|| Error::invalid_data("Document has no 'content' field"))?;
        let role = fields.get("role").map(|r| r.parse()).transpose()?;
        Ok(Self { content, role })
    }
}

// ============================================================================
// Probes
// ============================================================================

/// A CRUD operation attempted against the probe document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create (or overwrite) the document.
    Create,
    /// Read the document.
    Read,
    /// Update fields on the existing document.
    Update,
    /// Delete the document.
    Delete,
}

impl Operation {
    /// All operations in probe order.
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    /// Transcript label.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Read => "READ",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    /// The rules allowed the operation.
    Allowed,
    /// The rules denied the operation.
    Denied,
    /// The operation failed for a reason other than a rule denial.
    Failed(String),
}

impl Outcome {
    /// Classifies the result of a probe call.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Outcome::Allowed,
            Err(e) if e.is_permission_denied() => Outcome::Denied,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    /// Whether the operation went through.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Outcome::Allowed)
    }
}
