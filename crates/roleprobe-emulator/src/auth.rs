//! Auth emulator client (Identity Toolkit v1 REST API).

use async_trait::async_trait;
use roleprobe_core::{
    Claims, Error, IdToken, IdentityAdmin, IdentityClient, ProbeSettings, Result, Role, UserRecord,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::wire;

/// Bearer token the Auth emulator accepts for admin calls.
pub const OWNER_TOKEN: &str = "owner";

const API_ROOT: &str = "identitytoolkit.googleapis.com/v1";

/// Client for the Firebase Auth emulator.
///
/// Implements both the privileged [`IdentityAdmin`] calls (authorised with
/// the emulator's owner token) and end-user [`IdentityClient`] sign-in.
pub struct EmulatorAuth {
    base_url: String,
    project_id: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    custom_attributes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    local_id: String,
}

impl EmulatorAuth {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Emulator root, e.g. `http://127.0.0.1:9099`
    /// * `project_id` - Project the accounts live in
    /// * `api_key` - Key sent with sign-in requests
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Creates a client from run settings.
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self::new(
            settings.auth_base_url(),
            &settings.project_id,
            &settings.api_key,
        )
    }

    /// Uses a preconfigured HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn project_url(&self, resource: &str) -> String {
        format!(
            "{}/{API_ROOT}/projects/{}/{resource}",
            self.base_url, self.project_id
        )
    }

    async fn admin_call(&self, resource: &str, body: &Value) -> Result<reqwest::Response> {
        let url = self.project_url(resource);
        debug!(%url, "auth admin request");
        let request = self
            .client
            .post(&url)
            .bearer_auth(OWNER_TOKEN)
            .json(body);
        wire::send(request, &format!("POST {url}")).await
    }
}

/// Extracts the role from the JSON-encoded `customAttributes` string.
fn role_from_attributes(attributes: Option<&str>) -> Option<Role> {
    let parsed: Value = serde_json::from_str(attributes?).ok()?;
    let role = parsed.get("role")?.as_str()?;
    match role.parse() {
        Ok(role) => Some(role),
        Err(_) => {
            debug!(%role, "ignoring unknown role claim");
            None
        }
    }
}

#[async_trait]
impl IdentityAdmin for EmulatorAuth {
    async fn create_user(&self, email: &str, password: &str) -> Result<UserRecord> {
        let body = json!({ "email": email, "password": password });
        let response = match self.admin_call("accounts", &body).await {
            Ok(response) => response,
            Err(e) if e.is_account_exists() => return Err(Error::account_exists(email)),
            Err(e) => return Err(e),
        };
        let account: AccountResponse = wire::json(response, "create account").await?;
        Ok(UserRecord {
            uid: account.local_id,
            email: account.email.unwrap_or_else(|| email.to_string()),
            role: None,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord> {
        let body = json!({ "email": [email] });
        let response = self.admin_call("accounts:lookup", &body).await?;
        let lookup: LookupResponse = wire::json(response, "lookup account").await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("no account for {email}")))?;
        Ok(UserRecord {
            uid: user.local_id,
            email: user.email.unwrap_or_else(|| email.to_string()),
            role: role_from_attributes(user.custom_attributes.as_deref()),
        })
    }

    async fn set_custom_claims(&self, uid: &str, claims: &Claims) -> Result<()> {
        let body = json!({
            "localId": uid,
            "customAttributes": serde_json::to_string(claims)?,
        });
        self.admin_call("accounts:update", &body).await?;
        debug!(%uid, role = %claims.role, "custom claims set");
        Ok(())
    }
}

#[async_trait]
impl IdentityClient for EmulatorAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdToken> {
        let url = format!("{}/{API_ROOT}/accounts:signInWithPassword", self.base_url);
        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }));
        let response = wire::send(request, &format!("POST {url}")).await?;
        let signed_in: SignInResponse = wire::json(response, "sign in").await?;
        Ok(IdToken::new(signed_in.local_id, signed_in.id_token))
    }
}
