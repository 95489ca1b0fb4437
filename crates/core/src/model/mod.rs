//! Domain model shared by the walkthrough and its collaborators.

pub mod key;
pub mod permissions;
pub mod secret;
pub mod update;
pub mod vault;

pub use key::{KeyBundle, KeyOperation, KeySpec, KeyType};
pub use permissions::{KeyPermission, SecretPermission, join_permissions};
pub use secret::{SecretAttributes, SecretBundle, SecretId, SecretItem};
pub use update::{PolicyGrant, VaultUpdate};
pub use vault::{AccessPolicySpec, ResourceGroup, Sku, Vault, VaultSpec};
