//! Request plumbing shared by the management and data-plane clients.

use kvdemo_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// `code: message` from an Azure error body.
///
/// Resource Manager and Key Vault both wrap errors as
/// `{"error": {"code": ..., "message": ...}}`.
pub(crate) fn parse_service_error(body: &Value) -> String {
    let err = body
        .get("error")
        .or_else(|| body.get("Error"))
        .unwrap_or(body);
    let code = err["code"].as_str().unwrap_or("Unknown");
    let message = err["message"].as_str().unwrap_or("unknown error");
    format!("{code}: {message}")
}

/// A response that was received and read.
pub(crate) struct Response {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Service error for a non-success response.
    pub fn error(&self, operation: &str) -> Error {
        let value: Value = serde_json::from_str(&self.body).unwrap_or(Value::Null);
        let message = if value.is_null() {
            format!("HTTP {}", self.status)
        } else {
            parse_service_error(&value)
        };
        Error::service_status(operation, self.status, message)
    }

    /// Decode a successful body, or map the failure.
    pub fn json<T: DeserializeOwned>(&self, operation: &str) -> Result<T> {
        if !self.is_success() {
            return Err(self.error(operation));
        }
        serde_json::from_str(&self.body).map_err(|e| {
            Error::service_status(
                operation,
                self.status,
                format!("unexpected response body: {e}"),
            )
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Send with a bearer token and read the whole body.
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    token: &str,
    operation: &str,
) -> Result<Response> {
    let response = request
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| Error::service(operation, format!("request failed: {e}")))?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|e| {
            Error::service_status(operation, status, format!("response unreadable: {e}"))
        })?;
    Ok(Response {
        status,
        headers,
        body,
    })
}
