//! Backend abstractions.
//!
//! Rule evaluation happens in external services. These traits are the seams
//! between the probe logic and those services: the HTTP clients in
//! `roleprobe-emulator` implement them against the emulators, and
//! [`MockEmulator`](crate::MockEmulator) implements them in memory for tests.

use async_trait::async_trait;

use crate::Result;
use crate::model::{Claims, DocumentRef, Fields, IdToken, UserRecord};

/// Privileged account management on the identity backend.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountExists`](crate::Error::AccountExists) when the
    /// email is already registered.
    async fn create_user(&self, email: &str, password: &str) -> Result<UserRecord>;

    /// Looks up an account by email.
    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord>;

    /// Replaces the custom claims on an account.
    async fn set_custom_claims(&self, uid: &str, claims: &Claims) -> Result<()>;
}

/// End-user authentication on the identity backend.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Signs in with email and password, returning an ID token that carries
    /// the account's custom claims.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdToken>;
}

/// Document operations on the database backend.
///
/// Every call is evaluated against the security rules as the holder of
/// `auth`, or as an unauthenticated client when `auth` is `None`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates or overwrites a document.
    async fn set(&self, auth: Option<&IdToken>, doc: &DocumentRef, fields: &Fields) -> Result<()>;

    /// Reads a document. `Ok(None)` means the read was allowed but the
    /// document does not exist.
    async fn get(&self, auth: Option<&IdToken>, doc: &DocumentRef) -> Result<Option<Fields>>;

    /// Updates fields on an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when the document
    /// does not exist.
    async fn update(
        &self,
        auth: Option<&IdToken>,
        doc: &DocumentRef,
        fields: &Fields,
    ) -> Result<()>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete(&self, auth: Option<&IdToken>, doc: &DocumentRef) -> Result<()>;
}
