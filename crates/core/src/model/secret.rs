//! Secrets stored in a vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Management attributes of a secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretAttributes {
    /// Whether the secret can be read
    #[serde(default)]
    pub enabled: bool,
    /// Creation time
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated: Option<DateTime<Utc>>,
    /// Deletion recovery level, e.g. `Recoverable+Purgeable`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_level: Option<String>,
}

impl fmt::Display for SecretAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enabled={}", self.enabled)?;
        if let Some(created) = self.created {
            write!(f, ", created={}", created.to_rfc3339())?;
        }
        if let Some(updated) = self.updated {
            write!(f, ", updated={}", updated.to_rfc3339())?;
        }
        if let Some(level) = &self.recovery_level {
            write!(f, ", recoveryLevel={level}")?;
        }
        Ok(())
    }
}

/// A secret value with its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBundle {
    /// Versioned secret identifier
    pub id: String,
    /// Secret value
    pub value: String,
    /// Management attributes
    #[serde(default)]
    pub attributes: SecretAttributes,
    /// Optional content type hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl SecretBundle {
    /// Secret name parsed from the identifier.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        SecretId::parse(&self.id).map(|id| id.name)
    }
}

/// One entry of a secret listing; carries no value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretItem {
    /// Unversioned secret identifier
    pub id: String,
    /// Management attributes
    #[serde(default)]
    pub attributes: SecretAttributes,
    /// Optional content type hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// The parts of a secret identifier such as
/// `https://name.vault.azure.net/secrets/db-password/0123abcd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretId<'a> {
    /// Vault endpoint without trailing slash
    pub vault_uri: &'a str,
    /// Secret name
    pub name: &'a str,
    /// Version, absent for the latest
    pub version: Option<&'a str>,
}

impl<'a> SecretId<'a> {
    /// Split an identifier; `None` if it has no `/secrets/{name}` path.
    #[must_use]
    pub fn parse(id: &'a str) -> Option<Self> {
        let (vault_uri, rest) = id.split_once("/secrets/")?;
        let rest = rest.trim_end_matches('/');
        let (name, version) = match rest.split_once('/') {
            Some((name, version)) => (name, Some(version)),
            None => (rest, None),
        };
        if name.is_empty() || vault_uri.is_empty() {
            return None;
        }
        Some(Self {
            vault_uri,
            name,
            version: version.filter(|v| !v.is_empty()),
        })
    }
}
