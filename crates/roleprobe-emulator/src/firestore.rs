//! Firestore emulator client (Firestore v1 REST API).

use async_trait::async_trait;
use reqwest::RequestBuilder;
use roleprobe_core::{DocumentRef, DocumentStore, Fields, IdToken, ProbeSettings, Result};
use serde_json::Value;
use tracing::debug;

use crate::wire;

/// Client for the Firestore emulator.
///
/// Every request is evaluated against the emulator's security rules as the
/// holder of the supplied ID token, or anonymously without one.
pub struct EmulatorFirestore {
    documents_url: String,
    client: reqwest::Client,
}

impl EmulatorFirestore {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Emulator root, e.g. `http://127.0.0.1:8080`
    /// * `project_id` - Project whose default database is used
    pub fn new(base_url: impl Into<String>, project_id: impl AsRef<str>) -> Self {
        let base_url = base_url.into();
        Self {
            documents_url: format!(
                "{}/v1/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                project_id.as_ref()
            ),
            client: reqwest::Client::new(),
        }
    }

    /// Creates a client from run settings.
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self::new(settings.firestore_base_url(), &settings.project_id)
    }

    /// Uses a preconfigured HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Full URL of a document.
    pub fn document_url(&self, doc: &DocumentRef) -> String {
        format!("{}/{}", self.documents_url, doc.path())
    }

    fn authorize(request: RequestBuilder, auth: Option<&IdToken>) -> RequestBuilder {
        match auth {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }
}

#[async_trait]
impl DocumentStore for EmulatorFirestore {
    async fn set(&self, auth: Option<&IdToken>, doc: &DocumentRef, fields: &Fields) -> Result<()> {
        let url = self.document_url(doc);
        debug!(%url, "set document");
        let request = self.client.patch(&url).json(&wire::encode_document(fields));
        wire::send(Self::authorize(request, auth), &format!("PATCH {url}")).await?;
        Ok(())
    }

    async fn get(&self, auth: Option<&IdToken>, doc: &DocumentRef) -> Result<Option<Fields>> {
        let url = self.document_url(doc);
        debug!(%url, "get document");
        let request = self.client.get(&url);
        match wire::send(Self::authorize(request, auth), &format!("GET {url}")).await {
            Ok(response) => {
                let body: Value = wire::json(response, "get document").await?;
                Ok(Some(wire::decode_document(&body)))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        auth: Option<&IdToken>,
        doc: &DocumentRef,
        fields: &Fields,
    ) -> Result<()> {
        let url = self.document_url(doc);
        debug!(%url, "update document");
        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", name.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let request = self
            .client
            .patch(&url)
            .query(&query)
            .json(&wire::encode_document(fields));
        wire::send(Self::authorize(request, auth), &format!("PATCH {url}")).await?;
        Ok(())
    }

    async fn delete(&self, auth: Option<&IdToken>, doc: &DocumentRef) -> Result<()> {
        let url = self.document_url(doc);
        debug!(%url, "delete document");
        let request = self.client.delete(&url);
        wire::send(Self::authorize(request, auth), &format!("DELETE {url}")).await?;
        Ok(())
    }
}
