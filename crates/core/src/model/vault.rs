//! Vaults, resource groups and access policies.

use super::permissions::{KeyPermission, SecretPermission, join_permissions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Binds one directory object to the key and secret operations it may perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicySpec {
    /// Tenant the object lives in
    pub tenant_id: String,
    /// Directory object id of the user, group or service principal
    pub object_id: String,
    /// Allowed key operations
    pub key_permissions: BTreeSet<KeyPermission>,
    /// Allowed secret operations
    pub secret_permissions: BTreeSet<SecretPermission>,
}

impl AccessPolicySpec {
    /// A policy that allows nothing yet.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            object_id: object_id.into(),
            key_permissions: BTreeSet::new(),
            secret_permissions: BTreeSet::new(),
        }
    }

    /// A policy granting every key and every secret permission.
    #[must_use]
    pub fn full_access(tenant_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            key_permissions: KeyPermission::all(),
            secret_permissions: SecretPermission::all(),
            ..Self::new(tenant_id, object_id)
        }
    }

    /// A policy granting exactly the given permissions.
    #[must_use]
    pub fn with_permissions(
        tenant_id: impl Into<String>,
        object_id: impl Into<String>,
        keys: impl IntoIterator<Item = KeyPermission>,
        secrets: impl IntoIterator<Item = SecretPermission>,
    ) -> Self {
        Self {
            key_permissions: keys.into_iter().collect(),
            secret_permissions: secrets.into_iter().collect(),
            ..Self::new(tenant_id, object_id)
        }
    }
}

/// Pricing tier of a vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sku {
    /// Software-protected keys
    #[default]
    Standard,
    /// Adds HSM-protected keys
    Premium,
}

impl Sku {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

/// Everything needed to create a vault, submitted as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSpec {
    /// Globally unique vault name
    pub name: String,
    /// Resource group the vault is created in
    pub resource_group: String,
    /// Azure region, e.g. `eastus`
    pub region: String,
    /// Tenant used to authenticate data-plane requests
    pub tenant_id: String,
    /// Pricing tier
    pub sku: Sku,
    /// Initial access policies; may be empty
    pub access_policies: Vec<AccessPolicySpec>,
    /// Whether VMs may retrieve certificates stored as secrets
    pub enabled_for_deployment: bool,
    /// Whether Resource Manager may retrieve secrets during deployments
    pub enabled_for_template_deployment: bool,
}

impl VaultSpec {
    /// A standard-tier vault with no access policies and deployments disabled.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        resource_group: impl Into<String>,
        region: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            region: region.into(),
            tenant_id: tenant_id.into(),
            sku: Sku::Standard,
            access_policies: Vec::new(),
            enabled_for_deployment: false,
            enabled_for_template_deployment: false,
        }
    }
}

/// A vault as the management API describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    /// Resource Manager id
    pub id: String,
    /// Vault name
    pub name: String,
    /// Owning resource group
    pub resource_group: String,
    /// Azure region
    pub region: String,
    /// Tenant used to authenticate data-plane requests
    pub tenant_id: String,
    /// Pricing tier
    pub sku: Sku,
    /// Data-plane endpoint, e.g. `https://name.vault.azure.net/`
    pub vault_uri: String,
    /// Access policies in service order
    pub access_policies: Vec<AccessPolicySpec>,
    /// Whether VMs may retrieve certificates stored as secrets
    pub enabled_for_deployment: bool,
    /// Whether Resource Manager may retrieve secrets during deployments
    pub enabled_for_template_deployment: bool,
}

impl Vault {
    /// The access policy for `object_id`, if any.
    #[must_use]
    pub fn policy_for(&self, object_id: &str) -> Option<&AccessPolicySpec> {
        self.access_policies
            .iter()
            .find(|p| p.object_id.eq_ignore_ascii_case(object_id))
    }
}

impl fmt::Display for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Key Vault: {}", self.id)?;
        writeln!(f, "\tName: {}", self.name)?;
        writeln!(f, "\tResource group: {}", self.resource_group)?;
        writeln!(f, "\tRegion: {}", self.region)?;
        writeln!(f, "\tSku: {}", self.sku.as_str())?;
        writeln!(f, "\tVault URI: {}", self.vault_uri)?;
        writeln!(f, "\tDeployment enabled: {}", self.enabled_for_deployment)?;
        writeln!(
            f,
            "\tTemplate deployment enabled: {}",
            self.enabled_for_template_deployment
        )?;
        write!(f, "\tAccess policies: ")?;
        for policy in &self.access_policies {
            write!(f, "\n\t\tIdentity: {}", policy.object_id)?;
            write!(
                f,
                "\n\t\tKey permissions: {}",
                join_permissions(&policy.key_permissions)
            )?;
            write!(
                f,
                "\n\t\tSecret permissions: {}",
                join_permissions(&policy.secret_permissions)
            )?;
        }
        Ok(())
    }
}

/// A resource group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGroup {
    /// Resource Manager id
    pub id: String,
    /// Group name
    pub name: String,
    /// Azure region holding the group's metadata
    pub region: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vault() -> Vault {
        Vault {
            id: "/subscriptions/sub/resourceGroups/rgKV_abc/providers/Microsoft.KeyVault/vaults/vault1abc"
                .to_string(),
            name: "vault1abc".to_string(),
            resource_group: "rgKV_abc".to_string(),
            region: "eastus".to_string(),
            tenant_id: "tenant".to_string(),
            sku: Sku::Standard,
            vault_uri: "https://vault1abc.vault.azure.net/".to_string(),
            access_policies: vec![AccessPolicySpec::with_permissions(
                "tenant",
                "oid-1",
                [KeyPermission::List, KeyPermission::Get],
                [SecretPermission::Get],
            )],
            enabled_for_deployment: false,
            enabled_for_template_deployment: true,
        }
    }

    #[test]
    fn test_full_access_policy() {
        let policy = AccessPolicySpec::full_access("t", "o");
        assert_eq!(policy.key_permissions, KeyPermission::all());
        assert_eq!(policy.secret_permissions, SecretPermission::all());
    }

    #[test]
    fn test_vault_spec_defaults() {
        let spec = VaultSpec::new("vault1abc", "rg", "eastus", "tenant");
        assert!(spec.access_policies.is_empty());
        assert_eq!(spec.sku, Sku::Standard);
        assert!(!spec.enabled_for_deployment);
    }

    #[test]
    fn test_policy_for_ignores_case() {
        let vault = sample_vault();
        assert!(vault.policy_for("OID-1").is_some());
        assert!(vault.policy_for("other").is_none());
    }

    #[test]
    fn test_display_summary() {
        let summary = sample_vault().to_string();
        assert!(summary.starts_with("Key Vault: /subscriptions/sub/"));
        assert!(summary.contains("\tVault URI: https://vault1abc.vault.azure.net/"));
        assert!(summary.contains("\t\tIdentity: oid-1"));
        assert!(summary.contains("\t\tKey permissions: get, list"));
        assert!(summary.contains("\t\tSecret permissions: get"));
        assert!(summary.contains("Template deployment enabled: true"));
    }

    #[test]
    fn test_policy_serializes_camel_case() {
        let json = serde_json::to_value(AccessPolicySpec::with_permissions(
            "t",
            "o",
            [KeyPermission::Decrypt],
            Vec::<SecretPermission>::new(),
        ))
        .unwrap();
        assert_eq!(json["objectId"], "o");
        assert_eq!(json["permissions"], serde_json::Value::Null);
        assert_eq!(json["keyPermissions"][0], "decrypt");
    }
}
