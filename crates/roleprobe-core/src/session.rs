//! The single authenticated session shared by setup and probes.

use std::sync::Arc;

use tracing::debug;

use crate::Result;
use crate::model::{FixtureUser, IdToken};
use crate::traits::IdentityClient;

/// Who the session is currently signed in as.
#[derive(Debug, Clone)]
struct SignedIn {
    email: String,
    token: IdToken,
}

/// Client-side authentication state.
///
/// Holds at most one ID token. Signing in replaces any current token and
/// signing out drops it; neither contacts the database backend.
pub struct Session {
    identity: Arc<dyn IdentityClient>,
    current: Option<SignedIn>,
}

impl Session {
    /// Creates a signed-out session.
    pub fn new(identity: Arc<dyn IdentityClient>) -> Self {
        Self {
            identity,
            current: None,
        }
    }

    /// Signs in as the given fixture user.
    ///
    /// # Errors
    ///
    /// Propagates any sign-in failure; the session is left signed out.
    pub async fn sign_in(&mut self, user: &FixtureUser) -> Result<()> {
        self.current = None;
        let token = self
            .identity
            .sign_in_with_password(&user.email, &user.password)
            .await?;
        debug!(email = %user.email, uid = %token.uid, "signed in");
        self.current = Some(SignedIn {
            email: user.email.clone(),
            token,
        });
        Ok(())
    }

    /// Signs out. Signing out of a signed-out session is a no-op.
    pub fn sign_out(&mut self) {
        if let Some(prev) = self.current.take() {
            debug!(email = %prev.email, "signed out");
        }
    }

    /// The current ID token, if signed in.
    pub fn token(&self) -> Option<&IdToken> {
        self.current.as_ref().map(|s| &s.token)
    }

    /// Email of the signed-in user, if any.
    pub fn email(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.email.as_str())
    }

    /// Whether a user is signed in.
    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::MockEmulator;
    use crate::model::Role;
    use crate::traits::IdentityAdmin;

    async fn emulator_with(user: &FixtureUser) -> Arc<MockEmulator> {
        let emulator = Arc::new(MockEmulator::new());
        emulator
            .create_user(&user.email, &user.password)
            .await
            .unwrap();
        emulator
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let user = FixtureUser::new("a@example.com", "pw", Role::Admin);
        let emulator = emulator_with(&user).await;
        let mut session = Session::new(emulator);

        assert!(!session.is_signed_in());
        session.sign_in(&user).await.unwrap();
        assert!(session.is_signed_in());
        assert_eq!(session.email(), Some("a@example.com"));
        assert!(session.token().is_some());

        session.sign_out();
        assert!(!session.is_signed_in());
        assert!(session.token().is_none());

        // Idempotent
        session.sign_out();
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_session_signed_out() {
        let user = FixtureUser::new("a@example.com", "pw", Role::Admin);
        let emulator = emulator_with(&user).await;
        let mut session = Session::new(emulator);
        session.sign_in(&user).await.unwrap();

        let wrong = FixtureUser::new("a@example.com", "nope", Role::Admin);
        assert!(session.sign_in(&wrong).await.is_err());
        assert!(!session.is_signed_in());
    }
}
