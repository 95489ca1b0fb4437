//! Partial vault updates.
//!
//! A [`VaultUpdate`] describes only what changes. [`VaultUpdate::apply`]
//! merges it into the current descriptor; management clients submit the
//! merged result.

use super::permissions::{KeyPermission, SecretPermission};
use super::vault::{AccessPolicySpec, Vault};
use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Extra permissions for a principal that already has an access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyGrant {
    /// Object id of the existing policy
    pub object_id: String,
    /// Key permissions to add
    pub key_permissions: BTreeSet<KeyPermission>,
    /// Secret permissions to add
    pub secret_permissions: BTreeSet<SecretPermission>,
}

impl PolicyGrant {
    /// Grant every secret permission to `object_id`.
    #[must_use]
    pub fn all_secret_permissions(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            key_permissions: BTreeSet::new(),
            secret_permissions: SecretPermission::all(),
        }
    }
}

/// A change set for an existing vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultUpdate {
    /// Policies to add. A policy for an object id that already has one is
    /// merged into the existing entry.
    pub add_policies: Vec<AccessPolicySpec>,
    /// Permission grants for existing policies
    pub grants: Vec<PolicyGrant>,
    /// New deployment flag, if it changes
    pub enabled_for_deployment: Option<bool>,
    /// New template deployment flag, if it changes
    pub enabled_for_template_deployment: Option<bool>,
}

impl VaultUpdate {
    /// An update that adds the given policies.
    #[must_use]
    pub fn add_policies(policies: impl IntoIterator<Item = AccessPolicySpec>) -> Self {
        Self {
            add_policies: policies.into_iter().collect(),
            ..Self::default()
        }
    }

    /// True when applying this update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_policies.is_empty()
            && self.grants.is_empty()
            && self.enabled_for_deployment.is_none()
            && self.enabled_for_template_deployment.is_none()
    }

    /// Merge this update into `vault`, returning the new descriptor.
    ///
    /// # Errors
    ///
    /// Returns a service error if a grant names an object id with no policy.
    pub fn apply(&self, vault: &Vault) -> Result<Vault> {
        let mut merged = vault.clone();

        for policy in &self.add_policies {
            match merged
                .access_policies
                .iter_mut()
                .find(|p| p.object_id.eq_ignore_ascii_case(&policy.object_id))
            {
                Some(existing) => {
                    existing
                        .key_permissions
                        .extend(policy.key_permissions.iter().copied());
                    existing
                        .secret_permissions
                        .extend(policy.secret_permissions.iter().copied());
                }
                None => merged.access_policies.push(policy.clone()),
            }
        }

        for grant in &self.grants {
            let existing = merged
                .access_policies
                .iter_mut()
                .find(|p| p.object_id.eq_ignore_ascii_case(&grant.object_id))
                .ok_or_else(|| {
                    Error::service(
                        "update vault",
                        format!(
                            "vault {} has no access policy for object id {}",
                            vault.name, grant.object_id
                        ),
                    )
                })?;
            existing
                .key_permissions
                .extend(grant.key_permissions.iter().copied());
            existing
                .secret_permissions
                .extend(grant.secret_permissions.iter().copied());
        }

        if let Some(enabled) = self.enabled_for_deployment {
            merged.enabled_for_deployment = enabled;
        }
        if let Some(enabled) = self.enabled_for_template_deployment {
            merged.enabled_for_template_deployment = enabled;
        }

        Ok(merged)
    }
}
