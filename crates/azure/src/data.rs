//! Key Vault data-plane client for keys and secrets.

use crate::auth::TokenProvider;
use crate::http;
use async_trait::async_trait;
use kvdemo_core::{
    Error, KeyBundle, KeyOperation, KeySpec, KeyType, Result, SecretBundle, SecretItem, VaultData,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Key Vault REST API version.
pub const DATA_API_VERSION: &str = "7.4";

#[derive(Debug, Serialize)]
struct CreateKeyBody {
    kty: KeyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_size: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    key_ops: Vec<KeyOperation>,
}

#[derive(Debug, Deserialize)]
struct JsonWebKey {
    kid: String,
    kty: KeyType,
    #[serde(default)]
    key_ops: Vec<KeyOperation>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyAttributes {
    #[serde(default)]
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    key: JsonWebKey,
    #[serde(default)]
    attributes: KeyAttributes,
}

#[derive(Debug, Serialize)]
struct SetSecretBody<'a> {
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct SecretList {
    #[serde(default)]
    value: Vec<SecretItem>,
}

/// [`VaultData`] over the Key Vault REST API. One client serves every vault.
pub struct KeyVaultData {
    http: reqwest::Client,
    token: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for KeyVaultData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultData").finish_non_exhaustive()
    }
}

/// `path` resolved against a vault URI.
fn endpoint(vault_uri: &str, path: &str, operation: &str) -> Result<Url> {
    let base = if vault_uri.ends_with('/') {
        Url::parse(vault_uri)
    } else {
        Url::parse(&format!("{vault_uri}/"))
    };
    base.and_then(|base| base.join(path))
        .map_err(|e| Error::service(operation, format!("invalid vault URI '{vault_uri}': {e}")))
}

impl KeyVaultData {
    /// A client authorizing with vault-audience tokens from `token`.
    #[must_use]
    pub fn new(http: reqwest::Client, token: Arc<dyn TokenProvider>) -> Self {
        Self { http, token }
    }

    async fn get_secret_at(&self, url: Url, operation: &str) -> Result<SecretBundle> {
        let token = self.token.token().await?;
        debug!(%url, "Key Vault GET secret");
        let request = self
            .http
            .get(url)
            .query(&[("api-version", DATA_API_VERSION)]);
        http::send(request, &token, operation)
            .await?
            .json(operation)
    }
}

#[async_trait]
impl VaultData for KeyVaultData {
    async fn create_key(&self, vault_uri: &str, spec: &KeySpec) -> Result<KeyBundle> {
        const OP: &str = "create key";
        let url = endpoint(vault_uri, &format!("keys/{}/create", spec.name), OP)?;
        let token = self.token.token().await?;
        debug!(%url, key_type = %spec.key_type, "Key Vault create key");

        let body = CreateKeyBody {
            kty: spec.key_type,
            key_size: spec.key_size,
            key_ops: spec.key_ops.clone(),
        };
        let request = self
            .http
            .post(url)
            .query(&[("api-version", DATA_API_VERSION)])
            .json(&body);
        let created: KeyResponse = http::send(request, &token, OP).await?.json(OP)?;
        Ok(KeyBundle {
            kid: created.key.kid,
            key_type: created.key.kty,
            key_ops: created.key.key_ops,
            enabled: created.attributes.enabled,
        })
    }

    async fn set_secret(&self, vault_uri: &str, name: &str, value: &str) -> Result<SecretBundle> {
        const OP: &str = "set secret";
        let url = endpoint(vault_uri, &format!("secrets/{name}"), OP)?;
        let token = self.token.token().await?;
        debug!(%url, "Key Vault set secret");

        let request = self
            .http
            .put(url)
            .query(&[("api-version", DATA_API_VERSION)])
            .json(&SetSecretBody { value });
        http::send(request, &token, OP).await?.json(OP)
    }

    async fn get_secret(&self, vault_uri: &str, name: &str) -> Result<SecretBundle> {
        const OP: &str = "get secret";
        let url = endpoint(vault_uri, &format!("secrets/{name}"), OP)?;
        self.get_secret_at(url, OP).await
    }

    async fn get_secret_by_id(&self, secret_id: &str) -> Result<SecretBundle> {
        const OP: &str = "get secret";
        let url = Url::parse(secret_id).map_err(|e| {
            Error::service(OP, format!("invalid secret identifier '{secret_id}': {e}"))
        })?;
        self.get_secret_at(url, OP).await
    }

    async fn list_secrets(&self, vault_uri: &str, max_results: usize) -> Result<Vec<SecretItem>> {
        const OP: &str = "list secrets";
        let url = endpoint(vault_uri, "secrets", OP)?;
        let token = self.token.token().await?;
        debug!(%url, max_results, "Key Vault list secrets");

        let request = self.http.get(url).query(&[
            ("maxresults", max_results.to_string()),
            ("api-version", DATA_API_VERSION.to_string()),
        ]);
        let mut page: SecretList = http::send(request, &token, OP).await?.json(OP)?;
        page.value.truncate(max_results);
        Ok(page.value)
    }
}
