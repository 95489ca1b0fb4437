//! Azure Resource Manager client for resource groups and vaults.

use crate::auth::TokenProvider;
use crate::http;
use async_trait::async_trait;
use kvdemo_core::{
    AccessPolicySpec, Error, KeyPermission, ResourceGroup, Result, SecretPermission, Sku, Vault,
    VaultManagement, VaultSpec, VaultUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// API version for `Microsoft.Resources/resourceGroups`.
pub const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";

/// API version for `Microsoft.KeyVault/vaults`.
pub const VAULT_API_VERSION: &str = "2022-07-01";

const MAX_DELETE_POLLS: usize = 120;
const DEFAULT_POLL_DELAY_SECS: u64 = 10;

// ── Wire types ────────────────────────────────────────────────────────────────
//
// `extra` keeps the properties the model does not cover, so a fetched vault
// can be written back without losing them.

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SkuBody {
    family: String,
    name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PermissionsBody {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    secrets: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyBody {
    tenant_id: String,
    object_id: String,
    #[serde(default)]
    permissions: PermissionsBody,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultProperties {
    tenant_id: String,
    sku: SkuBody,
    #[serde(default)]
    access_policies: Vec<PolicyBody>,
    #[serde(default, skip_serializing)]
    vault_uri: Option<String>,
    #[serde(default)]
    enabled_for_deployment: bool,
    #[serde(default)]
    enabled_for_template_deployment: bool,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct VaultBody {
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Value>,
    properties: VaultProperties,
}

#[derive(Debug, Clone, Deserialize)]
struct VaultResource {
    id: String,
    name: String,
    location: String,
    #[serde(default)]
    tags: Option<Value>,
    properties: VaultProperties,
}

#[derive(Debug, Deserialize)]
struct VaultList {
    #[serde(default)]
    value: Vec<VaultResource>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceGroupResource {
    id: String,
    name: String,
    location: String,
}

impl From<&AccessPolicySpec> for PolicyBody {
    fn from(policy: &AccessPolicySpec) -> Self {
        Self {
            tenant_id: policy.tenant_id.clone(),
            object_id: policy.object_id.clone(),
            permissions: PermissionsBody {
                keys: policy
                    .key_permissions
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect(),
                secrets: policy
                    .secret_permissions
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }
}

impl From<&PolicyBody> for AccessPolicySpec {
    /// Permissions the model does not know about are left out of the
    /// descriptor; they stay on the wire body.
    fn from(body: &PolicyBody) -> Self {
        Self::with_permissions(
            body.tenant_id.clone(),
            body.object_id.clone(),
            body.permissions
                .keys
                .iter()
                .filter_map(|p| KeyPermission::parse(p)),
            body.permissions
                .secrets
                .iter()
                .filter_map(|p| SecretPermission::parse(p)),
        )
    }
}

fn sku_from_wire(name: &str) -> Sku {
    if name.eq_ignore_ascii_case(Sku::Premium.as_str()) {
        Sku::Premium
    } else {
        Sku::Standard
    }
}

fn sku_body(sku: Sku) -> SkuBody {
    SkuBody {
        family: "A".to_string(),
        name: sku.as_str().to_string(),
    }
}

/// Resource group segment of a Resource Manager id.
fn resource_group_of(id: &str) -> Option<&str> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().filter(|s| !s.is_empty());
        }
    }
    None
}

impl VaultResource {
    fn to_vault(&self, fallback_group: &str) -> Vault {
        let resource_group = resource_group_of(&self.id)
            .unwrap_or(fallback_group)
            .to_string();
        Vault {
            resource_group,
            id: self.id.clone(),
            name: self.name.clone(),
            region: self.location.clone(),
            tenant_id: self.properties.tenant_id.clone(),
            sku: sku_from_wire(&self.properties.sku.name),
            vault_uri: self.properties.vault_uri.clone().unwrap_or_default(),
            access_policies: self
                .properties
                .access_policies
                .iter()
                .map(AccessPolicySpec::from)
                .collect(),
            enabled_for_deployment: self.properties.enabled_for_deployment,
            enabled_for_template_deployment: self.properties.enabled_for_template_deployment,
        }
    }
}

/// Append the wire names in `granted` that `names` lacks, keeping the
/// existing entries and their order.
fn union_names<'a>(names: &mut Vec<String>, granted: impl IntoIterator<Item = &'a str>) {
    for name in granted {
        if !names.iter().any(|known| known.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
}

/// The fetched vault with `merged`'s policies and flags written over it.
///
/// Existing policies keep their unmodeled permissions (certificates, storage,
/// key operations newer than the model) and every other property survives.
fn merged_body(current: VaultResource, merged: &Vault) -> VaultBody {
    let mut properties = current.properties;
    let mut existing = std::mem::take(&mut properties.access_policies);

    properties.access_policies = merged
        .access_policies
        .iter()
        .map(|policy| {
            let found = existing
                .iter()
                .position(|body| body.object_id.eq_ignore_ascii_case(&policy.object_id));
            match found {
                Some(index) => {
                    let mut body = existing.remove(index);
                    union_names(
                        &mut body.permissions.keys,
                        policy.key_permissions.iter().map(|p| p.as_str()),
                    );
                    union_names(
                        &mut body.permissions.secrets,
                        policy.secret_permissions.iter().map(|p| p.as_str()),
                    );
                    body
                }
                None => PolicyBody::from(policy),
            }
        })
        .collect();
    properties.vault_uri = None;
    properties.enabled_for_deployment = merged.enabled_for_deployment;
    properties.enabled_for_template_deployment = merged.enabled_for_template_deployment;

    VaultBody {
        location: current.location,
        tags: current.tags,
        properties,
    }
}

fn vault_body(
    region: &str,
    tenant_id: &str,
    sku: Sku,
    policies: &[AccessPolicySpec],
    enabled_for_deployment: bool,
    enabled_for_template_deployment: bool,
) -> VaultBody {
    VaultBody {
        location: region.to_string(),
        tags: None,
        properties: VaultProperties {
            tenant_id: tenant_id.to_string(),
            sku: sku_body(sku),
            access_policies: policies.iter().map(PolicyBody::from).collect(),
            vault_uri: None,
            enabled_for_deployment,
            enabled_for_template_deployment,
            extra: Map::new(),
        },
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// [`VaultManagement`] over the Resource Manager REST API.
pub struct ArmVaultManagement {
    http: reqwest::Client,
    token: Arc<dyn TokenProvider>,
    resource_manager: String,
    subscription_id: String,
}

impl std::fmt::Debug for ArmVaultManagement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmVaultManagement")
            .field("resource_manager", &self.resource_manager)
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

impl ArmVaultManagement {
    /// A client for one subscription.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        token: Arc<dyn TokenProvider>,
        resource_manager: &str,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token,
            resource_manager: resource_manager.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.into(),
        }
    }

    fn group_url(&self, resource_group: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups/{resource_group}",
            self.resource_manager, self.subscription_id
        )
    }

    fn vaults_url(&self, resource_group: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.KeyVault/vaults",
            self.resource_manager, self.subscription_id
        )
    }

    fn vault_url(&self, resource_group: &str, name: &str) -> String {
        format!("{}/{name}", self.vaults_url(resource_group))
    }

    async fn get_vault(&self, resource_group: &str, name: &str) -> Result<VaultResource> {
        let token = self.token.token().await?;
        debug!(%resource_group, vault = %name, "ARM GET vault");
        let request = self
            .http
            .get(self.vault_url(resource_group, name))
            .query(&[("api-version", VAULT_API_VERSION)]);
        http::send(request, &token, "get vault")
            .await?
            .json("get vault")
    }

    async fn put_vault(
        &self,
        resource_group: &str,
        name: &str,
        body: &VaultBody,
        operation: &str,
    ) -> Result<Vault> {
        let token = self.token.token().await?;
        debug!(%resource_group, vault = %name, "ARM PUT vault");
        let request = self
            .http
            .put(self.vault_url(resource_group, name))
            .query(&[("api-version", VAULT_API_VERSION)])
            .json(body);
        let resource: VaultResource = http::send(request, &token, operation)
            .await?
            .json(operation)?;
        Ok(resource.to_vault(resource_group))
    }

    /// Delete, then follow a `202 Accepted` to completion.
    async fn delete_and_wait(&self, url: &str, api_version: &str, operation: &str) -> Result<()> {
        let token = self.token.token().await?;
        debug!(url, "ARM DELETE");
        let request = self.http.delete(url).query(&[("api-version", api_version)]);
        let mut response = http::send(request, &token, operation).await?;

        for poll in 1..=MAX_DELETE_POLLS {
            match response.status {
                404 => {
                    debug!(url, "Already deleted");
                    return Ok(());
                }
                202 => {}
                _ if response.is_success() => return Ok(()),
                _ => return Err(response.error(operation)),
            }

            let Some(location) = response.header("Location").map(str::to_string) else {
                return Ok(());
            };
            let delay = response
                .header("Retry-After")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_POLL_DELAY_SECS);
            if poll % 10 == 0 {
                info!(poll, url, "Still waiting for deletion");
            }
            tokio::time::sleep(Duration::from_secs(delay)).await;

            let token = self.token.token().await?;
            response = http::send(self.http.get(&location), &token, operation).await?;
        }

        Err(Error::service(
            operation,
            format!("still in progress after {MAX_DELETE_POLLS} polls"),
        ))
    }
}

#[async_trait]
impl VaultManagement for ArmVaultManagement {
    async fn create_resource_group(&self, name: &str, region: &str) -> Result<ResourceGroup> {
        let token = self.token.token().await?;
        debug!(resource_group = %name, %region, "ARM PUT resource group");
        let request = self
            .http
            .put(self.group_url(name))
            .query(&[("api-version", RESOURCE_GROUP_API_VERSION)])
            .json(&json!({ "location": region }));
        let group: ResourceGroupResource = http::send(request, &token, "create resource group")
            .await?
            .json("create resource group")?;
        Ok(ResourceGroup {
            id: group.id,
            name: group.name,
            region: group.location,
        })
    }

    async fn delete_resource_group(&self, name: &str) -> Result<()> {
        self.delete_and_wait(
            &self.group_url(name),
            RESOURCE_GROUP_API_VERSION,
            "delete resource group",
        )
        .await
    }

    async fn create_vault(&self, spec: &VaultSpec) -> Result<Vault> {
        let body = vault_body(
            &spec.region,
            &spec.tenant_id,
            spec.sku,
            &spec.access_policies,
            spec.enabled_for_deployment,
            spec.enabled_for_template_deployment,
        );
        self.put_vault(&spec.resource_group, &spec.name, &body, "create vault")
            .await
    }

    async fn update_vault(
        &self,
        resource_group: &str,
        name: &str,
        update: &VaultUpdate,
    ) -> Result<Vault> {
        let current = self.get_vault(resource_group, name).await?;
        let vault = current.to_vault(resource_group);
        if update.is_empty() {
            return Ok(vault);
        }
        let merged = update.apply(&vault)?;
        let body = merged_body(current, &merged);
        self.put_vault(resource_group, name, &body, "update vault")
            .await
    }

    async fn list_vaults(&self, resource_group: &str) -> Result<Vec<Vault>> {
        let mut vaults = Vec::new();
        let mut request = self
            .http
            .get(self.vaults_url(resource_group))
            .query(&[("api-version", VAULT_API_VERSION)]);

        loop {
            let token = self.token.token().await?;
            let page: VaultList = http::send(request, &token, "list vaults")
                .await?
                .json("list vaults")?;
            vaults.extend(
                page.value
                    .into_iter()
                    .map(|resource| resource.to_vault(resource_group)),
            );
            match page.next_link {
                Some(next) if !next.is_empty() => request = self.http.get(next),
                _ => break,
            }
        }

        debug!(%resource_group, count = vaults.len(), "Listed vaults");
        Ok(vaults)
    }

    async fn delete_vault(&self, id: &str) -> Result<()> {
        let url = format!("{}{id}", self.resource_manager);
        self.delete_and_wait(&url, VAULT_API_VERSION, "delete vault")
            .await
    }
}
