//! Service principal credentials loaded from an SDK auth file.
//!
//! The file is the JSON document printed by `az ad sp create-for-rbac --sdk-auth`.
//! Only `clientId`, `tenantId`, `clientSecret` and `subscriptionId` are read;
//! every other key (endpoint overrides and the like) is ignored.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the path to the credentials file.
pub const AUTH_LOCATION_ENV: &str = "AZURE_AUTH_LOCATION";

/// Service principal credentials for one subscription.
///
/// The client secret is zeroized on drop and never shows up in `Debug`.
#[derive(Clone)]
pub struct Credentials {
    /// Application (client) id of the service principal
    pub client_id: String,
    /// Directory (tenant) id
    pub tenant_id: String,
    client_secret: SecretString,
    /// Subscription the walkthrough creates resources in
    pub subscription_id: String,
}

/// Raw file layout; converted so the secret goes straight into a `SecretString`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthFile {
    client_id: String,
    tenant_id: String,
    client_secret: String,
    subscription_id: String,
}

impl Credentials {
    /// Create credentials from explicit values.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        tenant_id: impl Into<String>,
        client_secret: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            subscription_id: subscription_id.into(),
        }
    }

    /// Load credentials from the file named by `AZURE_AUTH_LOCATION`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the variable is unset or empty, or if
    /// the file cannot be loaded (see [`Credentials::from_file`]).
    pub fn from_env() -> Result<Self> {
        let path = auth_location()?;
        Self::from_file(&path)
    }

    /// Load credentials from a JSON auth file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is unreadable, is not valid
    /// JSON, or lacks one of the four required string fields.
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Reading credentials file");
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "Credentials file {} cannot be read: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents).map_err(|e| match e {
            Error::Configuration { message } => {
                Error::configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Parse credentials from the contents of an auth file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on malformed JSON or a missing or
    /// non-string required field.
    pub fn from_json(contents: &str) -> Result<Self> {
        let raw: AuthFile = serde_json::from_str(contents)
            .map_err(|e| Error::configuration(format!("invalid credentials file: {e}")))?;
        Ok(Self::new(
            raw.client_id,
            raw.tenant_id,
            raw.client_secret,
            raw.subscription_id,
        ))
    }

    /// The client secret. Callers must not log or print it.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_secret", &"[REDACTED]")
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

/// Resolve the credentials file path from `AZURE_AUTH_LOCATION`.
///
/// # Errors
///
/// Returns a configuration error if the variable is unset or empty.
pub fn auth_location() -> Result<PathBuf> {
    match std::env::var_os(AUTH_LOCATION_ENV) {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Err(Error::configuration(format!(
            "Credentials file cannot be found or read. Ensure that the system variable {AUTH_LOCATION_ENV} is set"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"{
        "clientId": "11111111-1111-1111-1111-111111111111",
        "clientSecret": "s3cr3t-value",
        "subscriptionId": "22222222-2222-2222-2222-222222222222",
        "tenantId": "33333333-3333-3333-3333-333333333333",
        "activeDirectoryEndpointUrl": "https://login.microsoftonline.com",
        "resourceManagerEndpointUrl": "https://management.azure.com/"
    }"#;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_json_reads_all_fields() {
        let creds = Credentials::from_json(FULL).unwrap();
        assert_eq!(creds.client_id, "11111111-1111-1111-1111-111111111111");
        assert_eq!(creds.tenant_id, "33333333-3333-3333-3333-333333333333");
        assert_eq!(creds.client_secret(), "s3cr3t-value");
        assert_eq!(
            creds.subscription_id,
            "22222222-2222-2222-2222-222222222222"
        );
    }

    #[test]
    fn test_each_missing_field_fails() {
        for field in ["clientId", "tenantId", "clientSecret", "subscriptionId"] {
            let mut value: serde_json::Value = serde_json::from_str(FULL).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let err = Credentials::from_json(&value.to_string()).unwrap_err();
            assert!(
                matches!(err, Error::Configuration { ref message } if message.contains(field)),
                "missing {field} gave {err}"
            );
        }
    }

    #[test]
    fn test_non_string_field_fails() {
        let err = Credentials::from_json(
            r#"{"clientId": 7, "tenantId": "t", "clientSecret": "s", "subscriptionId": "x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(matches!(
            Credentials::from_json("not json").unwrap_err(),
            Error::Configuration { .. }
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::from_json(FULL).unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("s3cr3t-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_file() {
        let file = write_file(FULL);
        let creds = Credentials::from_file(file.path()).unwrap();
        assert_eq!(creds.client_secret(), "s3cr3t-value");
    }

    #[test]
    fn test_from_file_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Credentials::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("cannot be read"));
    }

    #[test]
    fn test_from_file_error_names_path() {
        let file = write_file(r#"{"clientId": "c"}"#);
        let err = Credentials::from_file(file.path()).unwrap_err();
        assert!(
            err.to_string()
                .contains(&file.path().display().to_string())
        );
    }

    #[test]
    fn test_from_env_unset() {
        temp_env::with_var_unset(AUTH_LOCATION_ENV, || {
            let err = Credentials::from_env().unwrap_err();
            assert!(err.to_string().contains(AUTH_LOCATION_ENV));
        });
    }

    #[test]
    fn test_from_env_empty() {
        temp_env::with_var(AUTH_LOCATION_ENV, Some(""), || {
            assert!(Credentials::from_env().is_err());
        });
    }

    #[test]
    fn test_from_env_reads_file() {
        let file = write_file(FULL);
        temp_env::with_var(AUTH_LOCATION_ENV, Some(file.path()), || {
            let creds = Credentials::from_env().unwrap();
            assert_eq!(creds.tenant_id, "33333333-3333-3333-3333-333333333333");
        });
    }
}
