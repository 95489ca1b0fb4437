//! Key and secret permissions granted by access policies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! permission_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[allow(missing_docs)]
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every permission of this kind.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name as the management API spells it.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Parse a wire name, ignoring case. The service echoes some
            /// permissions back with different casing.
            #[must_use]
            pub fn parse(value: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|p| p.as_str().eq_ignore_ascii_case(value))
            }

            /// The full permission set.
            #[must_use]
            pub fn all() -> BTreeSet<Self> {
                Self::ALL.iter().copied().collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

permission_enum! {
    /// Operations an access policy may allow on keys.
    KeyPermission {
        Get => "get",
        List => "list",
        Update => "update",
        Create => "create",
        Import => "import",
        Delete => "delete",
        Recover => "recover",
        Backup => "backup",
        Restore => "restore",
        Decrypt => "decrypt",
        Encrypt => "encrypt",
        UnwrapKey => "unwrapKey",
        WrapKey => "wrapKey",
        Verify => "verify",
        Sign => "sign",
        Purge => "purge",
    }
}

permission_enum! {
    /// Operations an access policy may allow on secrets.
    SecretPermission {
        Get => "get",
        List => "list",
        Set => "set",
        Delete => "delete",
        Recover => "recover",
        Backup => "backup",
        Restore => "restore",
        Purge => "purge",
    }
}

/// Join a permission set for display, e.g. `get, list, decrypt`.
#[must_use]
pub fn join_permissions<P: fmt::Display>(permissions: &BTreeSet<P>) -> String {
    permissions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
