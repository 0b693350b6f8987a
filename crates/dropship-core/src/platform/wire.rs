//! JSON bodies exchanged with the management service and response handling.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RemoteFailure;

#[derive(Debug, Serialize)]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectResponse {
    pub id: String,
    pub api_key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub project_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub download_url: String,
    pub file_id: String,
    /// Advisory; tolerates fractional, negative, and missing values
    #[serde(default, deserialize_with = "lenient_secs")]
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployFromUrlRequest<'a> {
    pub url: &'a str,
    pub project_token: &'a str,
    pub use_project: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentResponse {
    pub url: String,
    pub id: String,
}

/// Read a seconds count from any JSON number, clamping into `u64`.
fn lenient_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f > 0.0)
                .map(|f| f.min(u64::MAX as f64) as u64)
                .unwrap_or(0)
        }),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().map_or(0, |f| {
            if f.is_finite() && f > 0.0 { f as u64 } else { 0 }
        }),
        _ => 0,
    })
}

/// `{"error": {"message": "..."}}` or `{"error": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Plain(String),
    Detailed {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Human-readable failure message: the service's own message when the body
/// carries one, otherwise the status reason phrase.
pub fn remote_message(status: StatusCode, body: &str) -> String {
    extract_error_message(body).unwrap_or_else(|| status_text(status))
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed.error? {
        ErrorField::Plain(message) => message,
        ErrorField::Detailed { message } => message?,
    };
    (!message.trim().is_empty()).then_some(message)
}

pub fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

/// Map a non-success response to a failure carrying the remote message.
pub async fn failure_from_response(response: reqwest::Response) -> RemoteFailure {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    RemoteFailure::from_status(status.as_u16(), remote_message(status, &body))
}

/// Decode a success body, or classify the failure.
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteFailure> {
    let status = response.status();
    if !status.is_success() {
        return Err(failure_from_response(response).await);
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RemoteFailure::transport(&e))?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteFailure::malformed(status.as_u16(), e))
}
