//! Fixture setup: make sure every fixture account exists with its role claim.

use tracing::{debug, info};

use crate::Result;
use crate::model::{Claims, FixtureUser};
use crate::report::{AccountStatus, SetupEntry, Transcript};
use crate::traits::IdentityAdmin;

/// Ensures each fixture user has an account carrying its role claim.
///
/// Accounts that already exist are looked up instead of created, so running
/// setup repeatedly is safe. Users are processed in order and each step is
/// written to the transcript as it completes.
///
/// # Errors
///
/// Any identity failure other than "account already exists" aborts setup.
/// Nothing is retried.
pub async fn setup_users(
    admin: &dyn IdentityAdmin,
    users: &[FixtureUser],
    transcript: &mut Transcript,
) -> Result<Vec<SetupEntry>> {
    let mut entries = Vec::with_capacity(users.len());

    for user in users {
        let (record, status) = match admin.create_user(&user.email, &user.password).await {
            Ok(record) => {
                transcript.account_created(&user.email)?;
                (record, AccountStatus::Created)
            }
            Err(e) if e.is_account_exists() => {
                debug!(email = %user.email, "account already exists, looking it up");
                let record = admin.get_user_by_email(&user.email).await?;
                transcript.account_exists(&user.email)?;
                (record, AccountStatus::Exists)
            }
            Err(e) => return Err(e),
        };

        admin
            .set_custom_claims(&record.uid, &Claims::role(user.role))
            .await?;
        transcript.role_assigned(user.role, &user.email)?;
        info!(email = %user.email, uid = %record.uid, role = %user.role, ?status, "fixture ready");

        entries.push(SetupEntry {
            email: user.email.clone(),
            uid: record.uid,
            status,
            role: user.role,
        });
    }

    Ok(entries)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::MockEmulator;
    use crate::model::Role;
    use crate::report::Capture;

    #[tokio::test]
    async fn test_setup_creates_accounts_with_roles() {
        let emulator = MockEmulator::new();
        let capture = Capture::new();
        let mut transcript = Transcript::new(capture.clone());
        let users = FixtureUser::defaults();

        let entries = setup_users(&emulator, &users, &mut transcript)
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.status == AccountStatus::Created));
        for user in &users {
            let record = emulator.get_user_by_email(&user.email).await.unwrap();
            assert_eq!(record.role, Some(user.role));
        }
        assert_eq!(
            capture.lines(),
            vec![
                "Created: admin@example.com",
                "Role: admin for admin@example.com",
                "Created: editor@example.com",
                "Role: editor for editor@example.com",
                "Created: viewer@example.com",
                "Role: viewer for viewer@example.com",
            ]
        );
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let emulator = MockEmulator::new();
        let users = FixtureUser::defaults();
        let mut first = Transcript::new(Capture::new());
        let created = setup_users(&emulator, &users, &mut first).await.unwrap();

        let capture = Capture::new();
        let mut second = Transcript::new(capture.clone());
        let existing = setup_users(&emulator, &users, &mut second).await.unwrap();

        assert!(existing.iter().all(|e| e.status == AccountStatus::Exists));
        for (a, b) in created.iter().zip(&existing) {
            assert_eq!(a.uid, b.uid);
        }
        assert_eq!(capture.lines()[0], "Exists: admin@example.com");
        assert_eq!(capture.lines()[1], "Role: admin for admin@example.com");
    }

    #[tokio::test]
    async fn test_setup_updates_role_of_existing_account() {
        let emulator = MockEmulator::new();
        emulator.create_user("x@example.com", "pw").await.unwrap();
        let users = vec![FixtureUser::new("x@example.com", "pw", Role::Editor)];

        setup_users(&emulator, &users, &mut Transcript::new(Capture::new()))
            .await
            .unwrap();

        let record = emulator.get_user_by_email("x@example.com").await.unwrap();
        assert_eq!(record.role, Some(Role::Editor));
    }

    #[tokio::test]
    async fn test_setup_aborts_on_unexpected_error() {
        let emulator = MockEmulator::new();
        emulator.break_account("editor@example.com").await;
        let capture = Capture::new();
        let mut transcript = Transcript::new(capture.clone());

        let result = setup_users(&emulator, &FixtureUser::defaults(), &mut transcript).await;

        assert!(result.is_err());
        // The admin was processed before the failure; the viewer never was.
        assert_eq!(capture.lines().len(), 2);
        assert!(emulator.get_user_by_email("viewer@example.com").await.is_err());
    }
}
