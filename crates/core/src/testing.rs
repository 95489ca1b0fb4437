//! In-memory collaborators for tests.
//!
//! [`InMemoryVaultManagement`] and [`InMemoryVaultData`] behave like a tiny
//! subscription: resource groups hold vaults, vaults hold keys and secrets.
//! Both record every call and can be told to fail the n-th call of an
//! operation.

use crate::error::{Error, Result};
use crate::model::{
    KeyBundle, KeySpec, ResourceGroup, SecretAttributes, SecretBundle, SecretId, SecretItem, Vault,
    VaultSpec, VaultUpdate,
};
use crate::naming::random_alphanumeric;
use crate::traits::{VaultData, VaultManagement};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_version() -> String {
    random_alphanumeric(32).to_ascii_lowercase()
}

/// Counts calls per operation and decides which one fails.
#[derive(Debug)]
struct FailurePlan<Op> {
    counts: HashMap<Op, usize>,
    fail_at: HashMap<Op, usize>,
}

impl<Op> Default for FailurePlan<Op> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
            fail_at: HashMap::new(),
        }
    }
}

impl<Op: Copy + Eq + std::hash::Hash + std::fmt::Debug> FailurePlan<Op> {
    fn check(&mut self, op: Op, operation: &str) -> Result<()> {
        let count = {
            let count = self.counts.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        if self.fail_at.get(&op) == Some(&count) {
            return Err(Error::service_status(
                operation,
                500,
                format!("InternalError: injected failure on call {count} of {op:?}"),
            ));
        }
        Ok(())
    }
}

/// Management operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagementOp {
    /// [`VaultManagement::create_resource_group`]
    CreateResourceGroup,
    /// [`VaultManagement::delete_resource_group`]
    DeleteResourceGroup,
    /// [`VaultManagement::create_vault`]
    CreateVault,
    /// [`VaultManagement::update_vault`]
    UpdateVault,
    /// [`VaultManagement::list_vaults`]
    ListVaults,
    /// [`VaultManagement::delete_vault`]
    DeleteVault,
}

/// A recorded management call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementCall {
    /// Resource group creation
    CreateResourceGroup {
        /// Group name
        name: String,
        /// Region
        region: String,
    },
    /// Resource group deletion
    DeleteResourceGroup {
        /// Group name
        name: String,
    },
    /// Vault creation, with the `VaultSpec` as submitted
    CreateVault(VaultSpec),
    /// Vault update, with the change set as submitted
    UpdateVault {
        /// Resource group
        resource_group: String,
        /// Vault name
        name: String,
        /// Change set
        update: VaultUpdate,
    },
    /// Vault listing
    ListVaults {
        /// Resource group
        resource_group: String,
    },
    /// Vault deletion
    DeleteVault {
        /// Resource Manager id
        id: String,
    },
}

#[derive(Debug, Default)]
struct ManagementState {
    resource_groups: Vec<ResourceGroup>,
    vaults: Vec<Vault>,
    calls: Vec<ManagementCall>,
    failures: FailurePlan<ManagementOp>,
}

/// In-memory Resource Manager for one subscription.
#[derive(Debug)]
pub struct InMemoryVaultManagement {
    subscription_id: String,
    state: Mutex<ManagementState>,
}

impl Default for InMemoryVaultManagement {
    fn default() -> Self {
        Self::new("00000000-0000-0000-0000-000000000000")
    }
}

impl InMemoryVaultManagement {
    /// An empty subscription.
    #[must_use]
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            state: Mutex::new(ManagementState::default()),
        }
    }

    /// Make the `nth` call (1-based) of `op` fail with a service error.
    #[must_use]
    pub fn failing_on(self, op: ManagementOp, nth: usize) -> Self {
        lock(&self.state).failures.fail_at.insert(op, nth);
        self
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ManagementCall> {
        lock(&self.state).calls.clone()
    }

    /// Vault specs submitted to `create_vault`, in order.
    #[must_use]
    pub fn created_vault_specs(&self) -> Vec<VaultSpec> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                ManagementCall::CreateVault(spec) => Some(spec.clone()),
                _ => None,
            })
            .collect()
    }

    /// Vaults that currently exist.
    #[must_use]
    pub fn vaults(&self) -> Vec<Vault> {
        lock(&self.state).vaults.clone()
    }

    /// Names of resource groups that currently exist.
    #[must_use]
    pub fn resource_group_names(&self) -> Vec<String> {
        lock(&self.state)
            .resource_groups
            .iter()
            .map(|rg| rg.name.clone())
            .collect()
    }

    fn vault_id(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.KeyVault/vaults/{name}",
            self.subscription_id
        )
    }
}

#[async_trait]
impl VaultManagement for InMemoryVaultManagement {
    async fn create_resource_group(&self, name: &str, region: &str) -> Result<ResourceGroup> {
        let mut state = lock(&self.state);
        state.calls.push(ManagementCall::CreateResourceGroup {
            name: name.to_string(),
            region: region.to_string(),
        });
        state
            .failures
            .check(ManagementOp::CreateResourceGroup, "create resource group")?;

        let group = ResourceGroup {
            id: format!("/subscriptions/{}/resourceGroups/{name}", self.subscription_id),
            name: name.to_string(),
            region: region.to_string(),
        };
        state
            .resource_groups
            .retain(|rg| !rg.name.eq_ignore_ascii_case(name));
        state.resource_groups.push(group.clone());
        Ok(group)
    }

    async fn delete_resource_group(&self, name: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(ManagementCall::DeleteResourceGroup {
            name: name.to_string(),
        });
        state
            .failures
            .check(ManagementOp::DeleteResourceGroup, "delete resource group")?;

        let before = state.resource_groups.len();
        state
            .resource_groups
            .retain(|rg| !rg.name.eq_ignore_ascii_case(name));
        if state.resource_groups.len() == before {
            return Err(Error::service_status(
                "delete resource group",
                404,
                format!("ResourceGroupNotFound: Resource group '{name}' could not be found."),
            ));
        }
        state
            .vaults
            .retain(|v| !v.resource_group.eq_ignore_ascii_case(name));
        Ok(())
    }

    async fn create_vault(&self, spec: &VaultSpec) -> Result<Vault> {
        let mut state = lock(&self.state);
        state.calls.push(ManagementCall::CreateVault(spec.clone()));
        state
            .failures
            .check(ManagementOp::CreateVault, "create vault")?;

        if !state
            .resource_groups
            .iter()
            .any(|rg| rg.name.eq_ignore_ascii_case(&spec.resource_group))
        {
            return Err(Error::service_status(
                "create vault",
                404,
                format!(
                    "ResourceGroupNotFound: Resource group '{}' could not be found.",
                    spec.resource_group
                ),
            ));
        }
        if state
            .vaults
            .iter()
            .any(|v| v.name.eq_ignore_ascii_case(&spec.name))
        {
            return Err(Error::service_status(
                "create vault",
                409,
                format!("VaultAlreadyExists: The vault name '{}' is already in use.", spec.name),
            ));
        }

        let vault = Vault {
            id: self.vault_id(&spec.resource_group, &spec.name),
            name: spec.name.clone(),
            resource_group: spec.resource_group.clone(),
            region: spec.region.clone(),
            tenant_id: spec.tenant_id.clone(),
            sku: spec.sku,
            vault_uri: format!("https://{}.vault.azure.net/", spec.name),
            access_policies: spec.access_policies.clone(),
            enabled_for_deployment: spec.enabled_for_deployment,
            enabled_for_template_deployment: spec.enabled_for_template_deployment,
        };
        state.vaults.push(vault.clone());
        Ok(vault)
    }

    async fn update_vault(
        &self,
        resource_group: &str,
        name: &str,
        update: &VaultUpdate,
    ) -> Result<Vault> {
        let mut state = lock(&self.state);
        state.calls.push(ManagementCall::UpdateVault {
            resource_group: resource_group.to_string(),
            name: name.to_string(),
            update: update.clone(),
        });
        state
            .failures
            .check(ManagementOp::UpdateVault, "update vault")?;

        let vault = state
            .vaults
            .iter_mut()
            .find(|v| {
                v.resource_group.eq_ignore_ascii_case(resource_group)
                    && v.name.eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| {
                Error::service_status(
                    "update vault",
                    404,
                    format!("ResourceNotFound: Vault '{name}' was not found."),
                )
            })?;
        let merged = update.apply(vault)?;
        vault.clone_from(&merged);
        Ok(merged)
    }

    async fn list_vaults(&self, resource_group: &str) -> Result<Vec<Vault>> {
        let mut state = lock(&self.state);
        state.calls.push(ManagementCall::ListVaults {
            resource_group: resource_group.to_string(),
        });
        state.failures.check(ManagementOp::ListVaults, "list vaults")?;

        Ok(state
            .vaults
            .iter()
            .filter(|v| v.resource_group.eq_ignore_ascii_case(resource_group))
            .cloned()
            .collect())
    }

    async fn delete_vault(&self, id: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state
            .calls
            .push(ManagementCall::DeleteVault { id: id.to_string() });
        state
            .failures
            .check(ManagementOp::DeleteVault, "delete vault")?;

        let before = state.vaults.len();
        state.vaults.retain(|v| !v.id.eq_ignore_ascii_case(id));
        if state.vaults.len() == before {
            return Err(Error::service_status(
                "delete vault",
                404,
                format!("ResourceNotFound: Vault '{id}' was not found."),
            ));
        }
        Ok(())
    }
}

/// Data-plane operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataOp {
    /// [`VaultData::create_key`]
    CreateKey,
    /// [`VaultData::set_secret`]
    SetSecret,
    /// [`VaultData::get_secret`]
    GetSecret,
    /// [`VaultData::get_secret_by_id`]
    GetSecretById,
    /// [`VaultData::list_secrets`]
    ListSecrets,
}

#[derive(Debug, Default)]
struct VaultContents {
    keys: BTreeMap<String, KeyBundle>,
    /// Secret name to versions, newest last
    secrets: BTreeMap<String, Vec<SecretBundle>>,
}

#[derive(Debug, Default)]
struct DataState {
    vaults: HashMap<String, VaultContents>,
    list_requests: Vec<usize>,
    failures: FailurePlan<DataOp>,
}

/// In-memory vault data plane. Any vault URI is accepted.
#[derive(Debug, Default)]
pub struct InMemoryVaultData {
    state: Mutex<DataState>,
}

fn normalize(vault_uri: &str) -> String {
    vault_uri.trim_end_matches('/').to_ascii_lowercase()
}

fn secret_not_found(name: &str) -> Error {
    Error::service_status(
        "get secret",
        404,
        format!("SecretNotFound: A secret with (name/id) {name} was not found in this key vault."),
    )
}

impl InMemoryVaultData {
    /// An empty data plane.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `nth` call (1-based) of `op` fail with a service error.
    #[must_use]
    pub fn failing_on(self, op: DataOp, nth: usize) -> Self {
        lock(&self.state).failures.fail_at.insert(op, nth);
        self
    }

    /// `max_results` of every `list_secrets` call, in order.
    #[must_use]
    pub fn list_requests(&self) -> Vec<usize> {
        lock(&self.state).list_requests.clone()
    }

    /// Names of the secrets stored in a vault, sorted.
    #[must_use]
    pub fn secret_names(&self, vault_uri: &str) -> Vec<String> {
        lock(&self.state)
            .vaults
            .get(&normalize(vault_uri))
            .map(|v| v.secrets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of the keys stored in a vault, sorted.
    #[must_use]
    pub fn key_names(&self, vault_uri: &str) -> Vec<String> {
        lock(&self.state)
            .vaults
            .get(&normalize(vault_uri))
            .map(|v| v.keys.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VaultData for InMemoryVaultData {
    async fn create_key(&self, vault_uri: &str, spec: &KeySpec) -> Result<KeyBundle> {
        let mut state = lock(&self.state);
        state.failures.check(DataOp::CreateKey, "create key")?;

        let base = vault_uri.trim_end_matches('/');
        let bundle = KeyBundle {
            kid: format!("{base}/keys/{}/{}", spec.name, new_version()),
            key_type: spec.key_type,
            key_ops: spec.key_ops.clone(),
            enabled: true,
        };
        state
            .vaults
            .entry(normalize(vault_uri))
            .or_default()
            .keys
            .insert(spec.name.clone(), bundle.clone());
        Ok(bundle)
    }

    async fn set_secret(&self, vault_uri: &str, name: &str, value: &str) -> Result<SecretBundle> {
        let mut state = lock(&self.state);
        state.failures.check(DataOp::SetSecret, "set secret")?;

        let base = vault_uri.trim_end_matches('/');
        let now = chrono::Utc::now();
        let bundle = SecretBundle {
            id: format!("{base}/secrets/{name}/{}", new_version()),
            value: value.to_string(),
            attributes: SecretAttributes {
                enabled: true,
                created: Some(now),
                updated: Some(now),
                recovery_level: Some("Recoverable+Purgeable".to_string()),
            },
            content_type: None,
        };
        state
            .vaults
            .entry(normalize(vault_uri))
            .or_default()
            .secrets
            .entry(name.to_string())
            .or_default()
            .push(bundle.clone());
        Ok(bundle)
    }

    async fn get_secret(&self, vault_uri: &str, name: &str) -> Result<SecretBundle> {
        let mut state = lock(&self.state);
        state.failures.check(DataOp::GetSecret, "get secret")?;

        state
            .vaults
            .get(&normalize(vault_uri))
            .and_then(|v| v.secrets.get(name))
            .and_then(|versions| versions.last())
            .cloned()
            .ok_or_else(|| secret_not_found(name))
    }

    async fn get_secret_by_id(&self, secret_id: &str) -> Result<SecretBundle> {
        let mut state = lock(&self.state);
        state
            .failures
            .check(DataOp::GetSecretById, "get secret")?;

        let id = SecretId::parse(secret_id).ok_or_else(|| {
            Error::service_status(
                "get secret",
                400,
                format!("BadParameter: '{secret_id}' is not a secret identifier"),
            )
        })?;
        let versions = state
            .vaults
            .get(&normalize(id.vault_uri))
            .and_then(|v| v.secrets.get(id.name))
            .ok_or_else(|| secret_not_found(secret_id))?;
        let found = match id.version {
            Some(version) => versions.iter().find(|b| b.id.ends_with(&format!("/{version}"))),
            None => versions.last(),
        };
        found.cloned().ok_or_else(|| secret_not_found(secret_id))
    }

    async fn list_secrets(&self, vault_uri: &str, max_results: usize) -> Result<Vec<SecretItem>> {
        let mut state = lock(&self.state);
        state.list_requests.push(max_results);
        state.failures.check(DataOp::ListSecrets, "list secrets")?;

        let base = vault_uri.trim_end_matches('/');
        Ok(state
            .vaults
            .get(&normalize(vault_uri))
            .map(|v| {
                v.secrets
                    .iter()
                    .filter_map(|(name, versions)| {
                        versions.last().map(|latest| SecretItem {
                            id: format!("{base}/secrets/{name}"),
                            attributes: latest.attributes.clone(),
                            content_type: latest.content_type.clone(),
                        })
                    })
                    .take(max_results)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessPolicySpec, KeyType, PolicyGrant};

    const URI: &str = "https://v1.vault.azure.net/";

    #[tokio::test]
    async fn test_vault_lifecycle() {
        let mgmt = InMemoryVaultManagement::new("sub");
        mgmt.create_resource_group("rg", "eastus").await.unwrap();
        let vault = mgmt
            .create_vault(&VaultSpec::new("v1", "rg", "eastus", "t"))
            .await
            .unwrap();
        assert_eq!(vault.vault_uri, URI);
        assert!(vault.id.ends_with("/vaults/v1"));

        let updated = mgmt
            .update_vault(
                "rg",
                "v1",
                &VaultUpdate::add_policies([AccessPolicySpec::new("t", "oid")]),
            )
            .await
            .unwrap();
        assert_eq!(updated.access_policies.len(), 1);
        assert_eq!(mgmt.list_vaults("rg").await.unwrap(), vec![updated]);

        mgmt.delete_vault(&vault.id).await.unwrap();
        assert!(mgmt.list_vaults("rg").await.unwrap().is_empty());
        mgmt.delete_resource_group("rg").await.unwrap();
        assert!(mgmt.resource_group_names().is_empty());
    }

    #[tokio::test]
    async fn test_create_vault_requires_group() {
        let mgmt = InMemoryVaultManagement::default();
        let err = mgmt
            .create_vault(&VaultSpec::new("v1", "missing", "eastus", "t"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_duplicate_vault_name_conflicts() {
        let mgmt = InMemoryVaultManagement::default();
        mgmt.create_resource_group("rg", "eastus").await.unwrap();
        let spec = VaultSpec::new("v1", "rg", "eastus", "t");
        mgmt.create_vault(&spec).await.unwrap();
        assert_eq!(mgmt.create_vault(&spec).await.unwrap_err().status(), Some(409));
    }

    #[tokio::test]
    async fn test_injected_failure_hits_nth_call_only() {
        let mgmt = InMemoryVaultManagement::default().failing_on(ManagementOp::CreateVault, 2);
        mgmt.create_resource_group("rg", "eastus").await.unwrap();
        mgmt.create_vault(&VaultSpec::new("v1", "rg", "eastus", "t"))
            .await
            .unwrap();
        assert!(
            mgmt.create_vault(&VaultSpec::new("v2", "rg", "eastus", "t"))
                .await
                .is_err()
        );
        mgmt.create_vault(&VaultSpec::new("v3", "rg", "eastus", "t"))
            .await
            .unwrap();
        assert_eq!(mgmt.created_vault_specs().len(), 3);
    }

    #[tokio::test]
    async fn test_update_grant_for_unknown_policy_fails() {
        let mgmt = InMemoryVaultManagement::default();
        mgmt.create_resource_group("rg", "eastus").await.unwrap();
        mgmt.create_vault(&VaultSpec::new("v1", "rg", "eastus", "t"))
            .await
            .unwrap();
        let update = VaultUpdate {
            grants: vec![PolicyGrant::all_secret_permissions("nobody")],
            ..VaultUpdate::default()
        };
        assert!(mgmt.update_vault("rg", "v1", &update).await.is_err());
        assert!(mgmt.vaults()[0].access_policies.is_empty());
    }

    #[tokio::test]
    async fn test_secret_round_trip() {
        let data = InMemoryVaultData::new();
        let stored = data.set_secret(URI, "s1", "abc123").await.unwrap();
        assert_eq!(data.get_secret(URI, "s1").await.unwrap().value, "abc123");
        assert_eq!(
            data.get_secret_by_id(&stored.id).await.unwrap().value,
            "abc123"
        );
        assert_eq!(
            data.get_secret_by_id("https://v1.vault.azure.net/secrets/s1")
                .await
                .unwrap()
                .value,
            "abc123"
        );
    }

    #[tokio::test]
    async fn test_latest_version_wins() {
        let data = InMemoryVaultData::new();
        let first = data.set_secret(URI, "s1", "one").await.unwrap();
        data.set_secret(URI, "s1", "two").await.unwrap();
        assert_eq!(data.get_secret(URI, "s1").await.unwrap().value, "two");
        assert_eq!(data.get_secret_by_id(&first.id).await.unwrap().value, "one");
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_found() {
        let data = InMemoryVaultData::new();
        let err = data.get_secret(URI, "nope").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_list_secrets_is_bounded() {
        let data = InMemoryVaultData::new();
        for i in 0..15 {
            data.set_secret(URI, &format!("s{i:02}"), "v").await.unwrap();
        }
        let items = data.list_secrets(URI, 10).await.unwrap();
        assert_eq!(items.len(), 10);
        assert_eq!(items[0].id, "https://v1.vault.azure.net/secrets/s00");
        assert_eq!(data.list_requests(), vec![10]);
    }

    #[tokio::test]
    async fn test_create_key() {
        let data = InMemoryVaultData::new();
        let key = data
            .create_key(URI, &KeySpec::new("key-1", KeyType::Rsa))
            .await
            .unwrap();
        assert!(key.kid.starts_with("https://v1.vault.azure.net/keys/key-1/"));
        assert_eq!(data.key_names(URI), vec!["key-1".to_string()]);
    }

    #[test]
    fn test_usable_without_async_test_harness() {
        let data = InMemoryVaultData::new().failing_on(DataOp::SetSecret, 1);
        let result = tokio_test::block_on(data.set_secret(URI, "s1", "v"));
        assert!(result.is_err());
        assert!(data.secret_names(URI).is_empty());
    }
}
