//! Random resource names, fresh for every run.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Total length of generated vault names.
pub const VAULT_NAME_LENGTH: usize = 20;

/// Total length of the generated resource group name.
pub const RESOURCE_GROUP_NAME_LENGTH: usize = 16;

/// Random characters after the `key-` / `secret-` prefixes.
pub const ITEM_SUFFIX_LENGTH: usize = 8;

/// Length of generated secret values.
pub const SECRET_VALUE_LENGTH: usize = 16;

const MIN_SUFFIX_LENGTH: usize = 3;

/// `len` random ASCII letters and digits.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// `prefix` followed by lowercase letters and digits, `max_len` chars in total.
///
/// At least three random characters are appended even when the prefix leaves
/// no room.
#[must_use]
pub fn random_resource_name(prefix: &str, max_len: usize) -> String {
    let suffix_len = max_len
        .saturating_sub(prefix.len())
        .max(MIN_SUFFIX_LENGTH);
    let suffix: String = random_alphanumeric(suffix_len)
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .collect();
    format!("{prefix}{suffix}")
}

/// Every name and secret value one run of the walkthrough uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleNames {
    /// First vault
    pub vault1: String,
    /// Second vault
    pub vault2: String,
    /// Shared resource group
    pub resource_group: String,
    /// Key created through the low-level request
    pub key1: String,
    /// Key created through the vault-scoped handle
    pub key2: String,
    /// `(name, value)` of the three secrets, in creation path order:
    /// low-level, vault-scoped, spawned
    pub secrets: [(String, String); 3],
}

impl SampleNames {
    /// Generate a fresh set of names.
    #[must_use]
    pub fn generate() -> Self {
        let secret = || {
            (
                format!("secret-{}", random_alphanumeric(ITEM_SUFFIX_LENGTH)),
                random_alphanumeric(SECRET_VALUE_LENGTH),
            )
        };
        Self {
            vault1: random_resource_name("vault1", VAULT_NAME_LENGTH),
            vault2: random_resource_name("vault2", VAULT_NAME_LENGTH),
            resource_group: random_resource_name("rgKV_", RESOURCE_GROUP_NAME_LENGTH),
            key1: format!("key-{}", random_alphanumeric(ITEM_SUFFIX_LENGTH)),
            key2: format!("key-{}", random_alphanumeric(ITEM_SUFFIX_LENGTH)),
            secrets: [secret(), secret(), secret()],
        }
    }
}
