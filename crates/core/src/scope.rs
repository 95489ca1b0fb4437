//! A data-plane client bound to one vault.

use crate::error::Result;
use crate::model::{KeyBundle, KeyOperation, KeySpec, KeyType, SecretBundle, SecretItem, Vault};
use crate::traits::VaultData;
use std::sync::Arc;

/// Key and secret operations for one vault, so callers don't repeat its URI.
#[derive(Clone)]
pub struct VaultScope {
    data: Arc<dyn VaultData>,
    vault_name: String,
    vault_uri: String,
}

impl VaultScope {
    /// Bind `data` to `vault`'s endpoint.
    #[must_use]
    pub fn new(data: Arc<dyn VaultData>, vault: &Vault) -> Self {
        Self {
            data,
            vault_name: vault.name.clone(),
            vault_uri: vault.vault_uri.clone(),
        }
    }

    /// Name of the bound vault.
    #[must_use]
    pub fn vault_name(&self) -> &str {
        &self.vault_name
    }

    /// Endpoint of the bound vault.
    #[must_use]
    pub fn vault_uri(&self) -> &str {
        &self.vault_uri
    }

    /// Create a key allowed for `ops`.
    ///
    /// # Errors
    ///
    /// Propagates the data-plane error.
    pub async fn create_key(
        &self,
        name: &str,
        key_type: KeyType,
        ops: impl IntoIterator<Item = KeyOperation> + Send,
    ) -> Result<KeyBundle> {
        let spec = KeySpec::new(name, key_type).with_operations(ops);
        self.data.create_key(&self.vault_uri, &spec).await
    }

    /// Store a secret.
    ///
    /// # Errors
    ///
    /// Propagates the data-plane error.
    pub async fn set_secret(&self, name: &str, value: &str) -> Result<SecretBundle> {
        self.data.set_secret(&self.vault_uri, name, value).await
    }

    /// Latest version of a secret.
    ///
    /// # Errors
    ///
    /// Propagates the data-plane error.
    pub async fn get_secret(&self, name: &str) -> Result<SecretBundle> {
        self.data.get_secret(&self.vault_uri, name).await
    }

    /// First `max_results` secret references.
    ///
    /// # Errors
    ///
    /// Propagates the data-plane error.
    pub async fn list_secrets(&self, max_results: usize) -> Result<Vec<SecretItem>> {
        self.data.list_secrets(&self.vault_uri, max_results).await
    }
}

impl std::fmt::Debug for VaultScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultScope")
            .field("vault_name", &self.vault_name)
            .field("vault_uri", &self.vault_uri)
            .finish_non_exhaustive()
    }
}
