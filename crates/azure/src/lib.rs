//! Azure REST collaborators for kvdemo.
//!
//! - [`auth`]: client-credentials tokens and the signed-in principal's object id
//! - [`management`]: resource groups and vaults through Azure Resource Manager
//! - [`data`]: keys and secrets through a vault's own endpoint
//!
//! [`authenticate`] wires them together for one service principal and
//! subscription.

pub mod auth;
pub mod data;
mod http;
pub mod management;

pub use auth::{ClientSecretCredential, TokenProvider, principal_object_id};
pub use data::KeyVaultData;
pub use management::ArmVaultManagement;

use kvdemo_core::{CloudEnvironment, Credentials, Error, Result, Session};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP settings and endpoint overrides.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Replaces the environment's identity provider authority
    pub login_endpoint: Option<String>,
    /// Replaces the environment's Resource Manager endpoint
    pub resource_manager_endpoint: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            login_endpoint: None,
            resource_manager_endpoint: None,
        }
    }
}

/// An authenticated session and the collaborators bound to it.
#[derive(Debug, Clone)]
pub struct AzureClients {
    /// Subscription, tenant and principal
    pub session: Session,
    /// Resource Manager collaborator
    pub management: Arc<ArmVaultManagement>,
    /// Data-plane collaborator
    pub data: Arc<KeyVaultData>,
}

/// Authenticate a service principal and build both collaborators.
///
/// Tokens for the management and vault audiences are requested up front so
/// bad credentials fail here rather than halfway through the walkthrough.
///
/// # Errors
///
/// Returns a configuration error if the HTTP client cannot be built and an
/// authentication error if either token request fails or the management
/// token carries no `oid` claim.
pub async fn authenticate(
    credentials: &Credentials,
    environment: CloudEnvironment,
    options: &ClientOptions,
) -> Result<AzureClients> {
    let http = reqwest::Client::builder()
        .timeout(options.timeout)
        .build()
        .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

    let endpoints = environment.endpoints();
    let login = options
        .login_endpoint
        .as_deref()
        .unwrap_or(&endpoints.login);
    let resource_manager = options
        .resource_manager_endpoint
        .as_deref()
        .unwrap_or(&endpoints.resource_manager);

    let credential = |scope: String| -> Arc<ClientSecretCredential> {
        Arc::new(ClientSecretCredential::new(
            http.clone(),
            login,
            &credentials.tenant_id,
            credentials.client_id.clone(),
            SecretString::from(credentials.client_secret().to_string()),
            scope,
        ))
    };
    let management_token = credential(endpoints.management_scope());
    let vault_token = credential(endpoints.vault_scope());

    let principal = principal_object_id(&management_token.token().await?)?;
    vault_token.token().await?;
    info!(
        %environment,
        subscription_id = %credentials.subscription_id,
        principal_object_id = %principal,
        "Authenticated service principal"
    );

    let session = Session::new(
        environment,
        credentials.tenant_id.clone(),
        credentials.client_id.clone(),
        credentials.subscription_id.clone(),
        principal,
    );
    Ok(AzureClients {
        management: Arc::new(ArmVaultManagement::new(
            http.clone(),
            management_token,
            resource_manager,
            credentials.subscription_id.clone(),
        )),
        data: Arc::new(KeyVaultData::new(http, vault_token)),
        session,
    })
}
