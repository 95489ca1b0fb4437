//! The two collaborators the walkthrough drives.
//!
//! [`VaultManagement`] is the Resource Manager side (resource groups and vault
//! lifecycle); [`VaultData`] talks to a vault's own endpoint (keys and
//! secrets). `kvdemo-azure` implements both over HTTPS and
//! [`crate::testing`] implements both in memory.

use crate::error::Result;
use crate::model::{
    KeyBundle, KeySpec, ResourceGroup, SecretBundle, SecretItem, Vault, VaultSpec, VaultUpdate,
};
use async_trait::async_trait;

/// Resource group and vault lifecycle.
#[async_trait]
pub trait VaultManagement: Send + Sync {
    /// Create (or update) a resource group.
    async fn create_resource_group(&self, name: &str, region: &str) -> Result<ResourceGroup>;

    /// Delete a resource group and everything in it.
    async fn delete_resource_group(&self, name: &str) -> Result<()>;

    /// Create a vault and return its populated descriptor, including the
    /// data-plane URI.
    async fn create_vault(&self, spec: &VaultSpec) -> Result<Vault>;

    /// Apply a partial change set and return the merged descriptor.
    async fn update_vault(
        &self,
        resource_group: &str,
        name: &str,
        update: &VaultUpdate,
    ) -> Result<Vault>;

    /// Every vault in a resource group, across all result pages.
    async fn list_vaults(&self, resource_group: &str) -> Result<Vec<Vault>>;

    /// Delete a vault by its Resource Manager id.
    async fn delete_vault(&self, id: &str) -> Result<()>;
}

/// Key and secret operations against a vault endpoint.
#[async_trait]
pub trait VaultData: Send + Sync {
    /// Create a key in the vault at `vault_uri`.
    async fn create_key(&self, vault_uri: &str, spec: &KeySpec) -> Result<KeyBundle>;

    /// Store a new version of a secret.
    async fn set_secret(&self, vault_uri: &str, name: &str, value: &str) -> Result<SecretBundle>;

    /// Latest version of a secret by name.
    async fn get_secret(&self, vault_uri: &str, name: &str) -> Result<SecretBundle>;

    /// A secret by its full identifier, versioned or not.
    async fn get_secret_by_id(&self, secret_id: &str) -> Result<SecretBundle>;

    /// At most `max_results` secret references. Only the first page is read.
    async fn list_secrets(&self, vault_uri: &str, max_results: usize) -> Result<Vec<SecretItem>>;
}
