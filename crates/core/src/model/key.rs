//! Keys created in a vault.

use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON Web Key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Elliptic curve
    #[serde(rename = "EC")]
    Ec,
    /// Elliptic curve, HSM protected
    #[serde(rename = "EC-HSM")]
    EcHsm,
    /// RSA
    #[serde(rename = "RSA")]
    Rsa,
    /// RSA, HSM protected
    #[serde(rename = "RSA-HSM")]
    RsaHsm,
    /// Symmetric octet sequence
    #[serde(rename = "oct")]
    Oct,
    /// Symmetric octet sequence, HSM protected
    #[serde(rename = "oct-HSM")]
    OctHsm,
}

impl KeyType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ec => "EC",
            Self::EcHsm => "EC-HSM",
            Self::Rsa => "RSA",
            Self::RsaHsm => "RSA-HSM",
            Self::Oct => "oct",
            Self::OctHsm => "oct-HSM",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation a key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOperation {
    /// Encrypt plaintext
    Encrypt,
    /// Decrypt ciphertext
    Decrypt,
    /// Sign a digest
    Sign,
    /// Verify a signature
    Verify,
    /// Wrap another key
    WrapKey,
    /// Unwrap another key
    UnwrapKey,
}

impl KeyOperation {
    /// Every key operation.
    pub const ALL: [Self; 6] = [
        Self::Encrypt,
        Self::Decrypt,
        Self::Sign,
        Self::Verify,
        Self::WrapKey,
        Self::UnwrapKey,
    ];
}

/// Request to create a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    /// Key name; letters, digits and dashes
    pub name: String,
    /// Key type
    pub key_type: KeyType,
    /// RSA modulus size in bits; service default when `None`
    pub key_size: Option<u32>,
    /// Permitted operations; service default when empty
    pub key_ops: Vec<KeyOperation>,
}

impl KeySpec {
    /// A key of `key_type` with service defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
            key_size: None,
            key_ops: Vec::new(),
        }
    }

    /// Restrict the key to `ops`.
    #[must_use]
    pub fn with_operations(mut self, ops: impl IntoIterator<Item = KeyOperation>) -> Self {
        self.key_ops = ops.into_iter().collect();
        self
    }
}

/// A created key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyBundle {
    /// Versioned key identifier
    pub kid: String,
    /// Key type
    pub key_type: KeyType,
    /// Permitted operations
    pub key_ops: Vec<KeyOperation>,
    /// Whether the key is enabled
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_wire_names() {
        assert_eq!(serde_json::to_string(&KeyType::RsaHsm).unwrap(), "\"RSA-HSM\"");
        assert_eq!(
            serde_json::from_str::<KeyType>("\"oct\"").unwrap(),
            KeyType::Oct
        );
        assert_eq!(KeyType::Rsa.to_string(), "RSA");
    }

    #[test]
    fn test_key_operation_wire_names() {
        assert_eq!(
            serde_json::to_string(&KeyOperation::UnwrapKey).unwrap(),
            "\"unwrapKey\""
        );
    }

    #[test]
    fn test_key_spec_builder() {
        let spec = KeySpec::new("key-1", KeyType::Rsa).with_operations(KeyOperation::ALL);
        assert_eq!(spec.key_ops.len(), 6);
        assert_eq!(spec.key_size, None);
    }
}
