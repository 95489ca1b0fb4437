//! Azure cloud environments and their endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A sovereign Azure cloud.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudEnvironment {
    /// Public Azure
    #[default]
    AzureCloud,
    /// Azure operated by 21Vianet
    AzureChinaCloud,
    /// Azure Government
    #[serde(rename = "AzureUSGovernment")]
    AzureUsGovernment,
}

/// Endpoints of one cloud environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEndpoints {
    /// Identity provider authority, without trailing slash
    pub login: String,
    /// Azure Resource Manager, without trailing slash
    pub resource_manager: String,
    /// DNS suffix of vault data-plane hosts, e.g. `vault.azure.net`
    pub vault_dns_suffix: String,
}

impl CloudEndpoints {
    /// Token audience for management requests.
    #[must_use]
    pub fn management_scope(&self) -> String {
        format!("{}/.default", self.resource_manager)
    }

    /// Token audience for vault data-plane requests.
    #[must_use]
    pub fn vault_scope(&self) -> String {
        format!("https://{}/.default", self.vault_dns_suffix)
    }
}

impl CloudEnvironment {
    /// All known environments.
    pub const ALL: [Self; 3] = [
        Self::AzureCloud,
        Self::AzureChinaCloud,
        Self::AzureUsGovernment,
    ];

    /// Canonical environment name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AzureCloud => "AzureCloud",
            Self::AzureChinaCloud => "AzureChinaCloud",
            Self::AzureUsGovernment => "AzureUSGovernment",
        }
    }

    /// Endpoints for this environment.
    #[must_use]
    pub fn endpoints(self) -> CloudEndpoints {
        let (login, resource_manager, vault_dns_suffix) = match self {
            Self::AzureCloud => (
                "https://login.microsoftonline.com",
                "https://management.azure.com",
                "vault.azure.net",
            ),
            Self::AzureChinaCloud => (
                "https://login.chinacloudapi.cn",
                "https://management.chinacloudapi.cn",
                "vault.azure.cn",
            ),
            Self::AzureUsGovernment => (
                "https://login.microsoftonline.us",
                "https://management.usgovcloudapi.net",
                "vault.usgovcloudapi.net",
            ),
        };
        CloudEndpoints {
            login: login.to_string(),
            resource_manager: resource_manager.to_string(),
            vault_dns_suffix: vault_dns_suffix.to_string(),
        }
    }
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudEnvironment {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::configuration(format!("unknown cloud environment '{s}'")))
    }
}
