//! The Key Vault walkthrough.
//!
//! [`KeyVaultSample`] runs the whole sequence against the two collaborators:
//! create a vault, authorize principals, create keys and secrets, read them
//! back, update the vault, create a second vault, list vaults and, when
//! enabled, delete everything again. Progress is reported through
//! `kvdemo_events` macros.

use crate::error::{Error, Result};
use crate::model::{
    AccessPolicySpec, KeyOperation, KeyPermission, KeySpec, KeyType, PolicyGrant, SecretId,
    SecretPermission, VaultSpec, VaultUpdate,
};
use crate::naming::SampleNames;
use crate::scope::VaultScope;
use crate::session::Session;
use crate::traits::{VaultData, VaultManagement};
use kvdemo_events::{
    emit_cleanup, emit_key_created, emit_sample_completed, emit_sample_failed, emit_secret_listed,
    emit_secret_retrieved, emit_secret_stored, emit_step, emit_vault_summary, register_secrets,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Region of the first vault and the resource group.
pub const DEFAULT_REGION: &str = "eastus";

/// Region of the second vault.
pub const DEFAULT_SECOND_REGION: &str = "eastus2";

/// Object id granted full access next to the signed-in principal.
pub const DEFAULT_EXTERNAL_OBJECT_ID: &str = "cd069970-731a-435d-ac26-8d0f5e6d8862";

/// Upper bound on the secret listing page.
pub const MAX_SECRET_PAGE_SIZE: usize = 10;

/// Knobs of one walkthrough run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleConfig {
    /// Region of the first vault and the resource group
    pub region: String,
    /// Region of the second vault
    pub second_region: String,
    /// Extra object id granted full access on the first vault
    pub external_object_id: String,
    /// Requested secret page size, clamped to `1..=10`
    pub page_size: usize,
    /// Delete the vaults and resource group when done
    pub cleanup: bool,
    /// Register generated secret values for redaction
    pub mask_secret_values: bool,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            second_region: DEFAULT_SECOND_REGION.to_string(),
            external_object_id: DEFAULT_EXTERNAL_OBJECT_ID.to_string(),
            page_size: MAX_SECRET_PAGE_SIZE,
            cleanup: false,
            mask_secret_values: false,
        }
    }
}

impl SampleConfig {
    /// Page size actually sent to `list_secrets`.
    #[must_use]
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_SECRET_PAGE_SIZE)
    }
}

/// What a successful run created and observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleReport {
    /// Resource group holding both vaults
    pub resource_group: String,
    /// Created vault names, in creation order
    pub vaults: Vec<String>,
    /// Created key identifiers
    pub key_ids: Vec<String>,
    /// Versioned identifiers of the stored secrets
    pub secret_ids: Vec<String>,
    /// Identifiers returned by the secret listing
    pub listed_secret_ids: Vec<String>,
    /// Vault names returned by the final listing
    pub listed_vaults: Vec<String>,
}

/// Resources to delete during cleanup.
#[derive(Debug, Default)]
struct CreatedResources {
    resource_group: Option<String>,
    vault_ids: Vec<String>,
}

/// The walkthrough, bound to a session and its collaborators.
pub struct KeyVaultSample {
    session: Session,
    management: Arc<dyn VaultManagement>,
    data: Arc<dyn VaultData>,
    config: SampleConfig,
}

impl KeyVaultSample {
    /// Create a walkthrough.
    #[must_use]
    pub fn new(
        session: Session,
        management: Arc<dyn VaultManagement>,
        data: Arc<dyn VaultData>,
        config: SampleConfig,
    ) -> Self {
        Self {
            session,
            management,
            data,
            config,
        }
    }

    /// Run with fresh names. Returns `true` on success.
    ///
    /// Never returns an error: failures are reported as events and logged.
    pub async fn run(&self) -> bool {
        let started = Instant::now();
        let success = match self.try_run().await {
            Ok(report) => {
                tracing::info!(
                    resource_group = %report.resource_group,
                    vaults = ?report.vaults,
                    "Walkthrough finished"
                );
                true
            }
            Err(e) => {
                // Already reported by `emit_sample_failed!`
                tracing::debug!(kind = ?e.kind(), "Walkthrough failed");
                false
            }
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        emit_sample_completed!(success, duration_ms);
        success
    }

    /// Run with fresh names and return what was created.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator error. Cleanup, when enabled, has
    /// already run by then and its own failures are only reported.
    pub async fn try_run(&self) -> Result<SampleReport> {
        self.try_run_with(&SampleNames::generate()).await
    }

    /// Run with the given names.
    ///
    /// # Errors
    ///
    /// Same as [`KeyVaultSample::try_run`].
    pub async fn try_run_with(&self, names: &SampleNames) -> Result<SampleReport> {
        if self.config.mask_secret_values {
            register_secrets(names.secrets.iter().map(|(_, value)| value.clone()));
        }

        let mut created = CreatedResources::default();
        let result = self.walkthrough(names, &mut created).await;
        if let Err(e) = &result {
            emit_sample_failed!(e);
        }
        self.finish(&created).await;
        result
    }

    #[instrument(skip_all, fields(resource_group = %names.resource_group))]
    async fn walkthrough(
        &self,
        names: &SampleNames,
        created: &mut CreatedResources,
    ) -> Result<SampleReport> {
        let tenant = self.session.tenant_id();
        let principal = self.session.principal_object_id();
        let mut report = SampleReport {
            resource_group: names.resource_group.clone(),
            ..SampleReport::default()
        };

        // Vault with no access policy, in a new resource group
        emit_step!("Creating a key vault with no Access Policy...");
        self.management
            .create_resource_group(&names.resource_group, &self.config.region)
            .await?;
        created.resource_group = Some(names.resource_group.clone());

        let spec = VaultSpec::new(
            &names.vault1,
            &names.resource_group,
            &self.config.region,
            tenant,
        );
        let vault1 = self.management.create_vault(&spec).await?;
        created.vault_ids.push(vault1.id.clone());
        report.vaults.push(vault1.name.clone());
        emit_step!("Created key vault");
        emit_vault_summary!(vault1.name, vault1);

        // Authorize the principal and the external object
        emit_step!("Authorizing the application associated with the current service principal...");
        let authorize = VaultUpdate::add_policies([
            AccessPolicySpec::full_access(tenant, principal),
            AccessPolicySpec::full_access(tenant, &self.config.external_object_id),
        ]);
        let vault1 = self
            .management
            .update_vault(&vault1.resource_group, &vault1.name, &authorize)
            .await?;
        emit_step!("Updated key vault");
        emit_vault_summary!(vault1.name, vault1);

        let scope = VaultScope::new(Arc::clone(&self.data), &vault1);
        tracing::debug!(
            vault = %scope.vault_name(),
            vault_uri = %scope.vault_uri(),
            "Bound data-plane client"
        );

        // Keys: low-level request, then the vault-scoped handle
        let key = self
            .data
            .create_key(scope.vault_uri(), &KeySpec::new(&names.key1, KeyType::Rsa))
            .await?;
        emit_key_created!(names.key1, key.kid);
        report.key_ids.push(key.kid);

        let key = scope
            .create_key(&names.key2, KeyType::Rsa, KeyOperation::ALL)
            .await?;
        emit_key_created!(names.key2, key.kid);
        report.key_ids.push(key.kid);

        // Secrets: low-level request, a spawned request, the vault-scoped handle
        let [(name1, value1), (name2, value2), (name3, value3)] = &names.secrets;

        let stored = self
            .data
            .set_secret(scope.vault_uri(), name1, value1)
            .await?;
        emit_secret_stored!(name1, stored.id);
        report.secret_ids.push(stored.id);

        let pending = {
            let data = Arc::clone(&self.data);
            let vault_uri = scope.vault_uri().to_string();
            let (name, value) = (name3.clone(), value3.clone());
            tokio::spawn(async move { data.set_secret(&vault_uri, &name, &value).await })
        };

        let stored = match scope.set_secret(name2, value2).await {
            Ok(stored) => stored,
            Err(e) => {
                pending.abort();
                return Err(e);
            }
        };
        emit_secret_stored!(name2, stored.id);
        report.secret_ids.push(stored.id);

        let stored = pending.await.map_err(|e| {
            Error::service("set secret", format!("background request did not complete: {e}"))
        })??;
        emit_secret_stored!(name3, stored.id);
        emit_secret_retrieved!(name3, stored.value);
        report.secret_ids.push(stored.id);

        // Read back by name
        let secret = scope.get_secret(name1).await?;
        emit_secret_retrieved!(name1, secret.value);

        // Bounded listing, then each entry by identifier
        let page_size = self.config.effective_page_size();
        let items = scope.list_secrets(page_size).await?;
        for item in items.iter().take(page_size) {
            emit_secret_listed!(item.id, item.attributes);
            let secret = self.data.get_secret_by_id(&item.id).await?;
            let name = SecretId::parse(&item.id).map_or(item.id.as_str(), |id| id.name);
            emit_secret_retrieved!(name, secret.value);
            report.listed_secret_ids.push(item.id.clone());
        }

        // Enable deployments and widen the first policy
        emit_step!(
            "Update a key vault to enable deployments and add permissions to the application..."
        );
        let first_policy = vault1.access_policies.first().ok_or_else(|| {
            Error::service(
                "update vault",
                format!("vault {} has no access policies", vault1.name),
            )
        })?;
        let update = VaultUpdate {
            grants: vec![PolicyGrant::all_secret_permissions(&first_policy.object_id)],
            enabled_for_deployment: Some(true),
            enabled_for_template_deployment: Some(true),
            ..VaultUpdate::default()
        };
        let vault1 = self
            .management
            .update_vault(&vault1.resource_group, &vault1.name, &update)
            .await?;
        emit_step!("Updated key vault");
        emit_vault_summary!(vault1.name, vault1);

        // Second vault with a read-only policy set at creation
        let mut spec = VaultSpec::new(
            &names.vault2,
            &names.resource_group,
            &self.config.second_region,
            tenant,
        );
        spec.access_policies.push(AccessPolicySpec::with_permissions(
            tenant,
            principal,
            [KeyPermission::List, KeyPermission::Get, KeyPermission::Decrypt],
            [SecretPermission::Get],
        ));
        let vault2 = self.management.create_vault(&spec).await?;
        created.vault_ids.push(vault2.id.clone());
        report.vaults.push(vault2.name.clone());
        emit_step!("Created key vault");
        emit_vault_summary!(vault2.name, vault2);

        emit_step!("Listing key vaults...");
        for vault in self.management.list_vaults(&names.resource_group).await? {
            emit_vault_summary!(vault.name, vault);
            report.listed_vaults.push(vault.name);
        }

        Ok(report)
    }

    /// Delete what was created, or say what was left behind.
    async fn finish(&self, created: &CreatedResources) {
        let Some(resource_group) = &created.resource_group else {
            emit_cleanup!(
                "Did not create any resources in Azure. No clean up is necessary",
                true
            );
            return;
        };

        if !self.config.cleanup {
            emit_step!(format!(
                "Leaving resource group {resource_group} and its key vaults in place"
            ));
            return;
        }

        if !created.vault_ids.is_empty() {
            emit_step!("Deleting the key vaults");
            let mut all_deleted = true;
            for id in &created.vault_ids {
                if let Err(e) = self.management.delete_vault(id).await {
                    all_deleted = false;
                    tracing::warn!(vault_id = %id, error = %e, "Vault deletion failed");
                    emit_cleanup!(format!("Failed to delete key vault {id}: {e}"), false);
                }
            }
            if all_deleted {
                emit_cleanup!("Deleted the key vaults", true);
            }
        }

        emit_step!(format!("Deleting Resource Group: {resource_group}"));
        match self.management.delete_resource_group(resource_group).await {
            Ok(()) => emit_cleanup!(format!("Deleted Resource Group: {resource_group}"), true),
            Err(e) => {
                tracing::warn!(%resource_group, error = %e, "Resource group deletion failed");
                emit_cleanup!(
                    format!("Failed to delete resource group {resource_group}: {e}"),
                    false
                );
            }
        }
    }
}

impl std::fmt::Debug for KeyVaultSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultSample")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SampleConfig::default();
        assert_eq!(config.region, "eastus");
        assert_eq!(config.second_region, "eastus2");
        assert_eq!(config.external_object_id, DEFAULT_EXTERNAL_OBJECT_ID);
        assert!(!config.cleanup);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let mut config = SampleConfig::default();
        config.page_size = 500;
        assert_eq!(config.effective_page_size(), 10);
        config.page_size = 0;
        assert_eq!(config.effective_page_size(), 1);
        config.page_size = 4;
        assert_eq!(config.effective_page_size(), 4);
    }
}
