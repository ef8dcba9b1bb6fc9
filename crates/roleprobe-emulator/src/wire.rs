//! Request plumbing shared by the Auth and Firestore clients: sending,
//! error classification and the Firestore value encoding.

use reqwest::{RequestBuilder, Response};
use roleprobe_core::{Error, Fields, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Sends a request, turning transport failures and non-success statuses
/// into errors.
pub(crate) async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::transport_with_source(what.to_string(), e))?;

    let status = response.status();
    debug!(%what, status = status.as_u16(), "response");
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), &body))
}

/// Decodes a JSON response body.
pub(crate) async fn json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::invalid_data(format!("{what}: unreadable response: {e}")))
}

/// Maps an error response onto the error variants the probe logic branches
/// on.
///
/// Identity Toolkit messages look like `EMAIL_EXISTS` or
/// `INVALID_PASSWORD : extra detail`; only the leading code is matched.
pub(crate) fn classify(status: u16, body: &str) -> Error {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), None),
    };
    let code = message.split(" : ").next().unwrap_or_default().trim();

    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => return Error::account_exists(message.clone()),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            return Error::authentication(code.to_string());
        }
        "USER_NOT_FOUND" => return Error::not_found(message.clone()),
        _ => {}
    }

    match (status, api_status.as_deref()) {
        (403, _) | (_, Some("PERMISSION_DENIED")) => Error::permission_denied(message),
        (404, _) | (_, Some("NOT_FOUND")) => Error::not_found(message),
        (401, _) | (_, Some("UNAUTHENTICATED")) => Error::authentication(message),
        _ => Error::backend(status, message),
    }
}

/// Encodes string fields as a Firestore document body.
pub(crate) fn encode_document(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), json!({ "stringValue": v })))
        .collect();
    json!({ "fields": encoded })
}

/// Decodes a Firestore document body into string fields.
///
/// Scalar values are rendered as strings; maps, arrays and other composite
/// values are skipped.
pub(crate) fn decode_document(body: &Value) -> Fields {
    let mut fields = Fields::new();
    let Some(map) = body.get("fields").and_then(Value::as_object) else {
        return fields;
    };

    for (name, value) in map {
        let scalar = value
            .get("stringValue")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                value
                    .get("integerValue")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| value.get("booleanValue").map(|b| b.to_string()))
            .or_else(|| value.get("doubleValue").map(|d| d.to_string()));
        match scalar {
            Some(s) => {
                fields.insert(name.clone(), s);
            }
            None => debug!(field = %name, "skipping non-scalar field"),
        }
    }
    fields
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_email_exists() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        assert!(classify(400, body).is_account_exists());

        let body = r#"{"error":{"code":400,"message":"DUPLICATE_EMAIL : taken"}}"#;
        assert!(classify(400, body).is_account_exists());
    }

    #[test]
    fn test_classify_sign_in_failures() {
        let body = r#"{"error":{"code":400,"message":"INVALID_PASSWORD : bad"}}"#;
        assert!(matches!(classify(400, body), Error::Authentication(code) if code == "INVALID_PASSWORD"));
    }

    #[test]
    fn test_classify_permission_denied() {
        let body = r#"{"error":{"code":403,"message":"false for 'create' @ L5","status":"PERMISSION_DENIED"}}"#;
        assert!(classify(403, body).is_permission_denied());
        // Status string alone is enough.
        let body = r#"{"error":{"code":400,"message":"nope","status":"PERMISSION_DENIED"}}"#;
        assert!(classify(400, body).is_permission_denied());
    }

    #[test]
    fn test_classify_not_found() {
        let body = r#"{"error":{"code":404,"message":"no entity to update","status":"NOT_FOUND"}}"#;
        assert!(classify(404, body).is_not_found());
        let body = r#"{"error":{"code":400,"message":"USER_NOT_FOUND"}}"#;
        assert!(classify(400, body).is_not_found());
    }

    #[test]
    fn test_classify_unstructured_body() {
        let err = classify(502, "Bad Gateway");
        assert!(matches!(err, Error::Backend { status: 502, ref message } if message == "Bad Gateway"));
    }

    #[test]
    fn test_encode_document() {
        let fields = Fields::from([
            ("content".to_string(), "Test data".to_string()),
            ("role".to_string(), "admin".to_string()),
        ]);
        let body = encode_document(&fields);
        assert_eq!(
            body,
            json!({"fields": {
                "content": {"stringValue": "Test data"},
                "role": {"stringValue": "admin"}
            }})
        );
    }

    #[test]
    fn test_decode_document() {
        let body = json!({
            "name": "projects/p/databases/(default)/documents/c/d",
            "fields": {
                "content": {"stringValue": "Updated"},
                "count": {"integerValue": "3"},
                "flag": {"booleanValue": true},
                "nested": {"mapValue": {"fields": {}}}
            }
        });
        let fields = decode_document(&body);
        assert_eq!(fields.get("content").unwrap(), "Updated");
        assert_eq!(fields.get("count").unwrap(), "3");
        assert_eq!(fields.get("flag").unwrap(), "true");
        assert!(!fields.contains_key("nested"));
    }

    #[test]
    fn test_decode_document_without_fields() {
        assert!(decode_document(&json!({"name": "x"})).is_empty());
    }
}
