//! Authenticated session handed to every collaborator.

use crate::environment::CloudEnvironment;
use serde::Serialize;

/// The outcome of authenticating a service principal against one subscription.
///
/// There is no process-wide "current subscription": whatever needs the
/// subscription, tenant or principal receives a `Session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    subscription_id: String,
    tenant_id: String,
    client_id: String,
    principal_object_id: String,
    environment: CloudEnvironment,
}

impl Session {
    /// Create a session.
    #[must_use]
    pub fn new(
        environment: CloudEnvironment,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        subscription_id: impl Into<String>,
        principal_object_id: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            principal_object_id: principal_object_id.into(),
            environment,
        }
    }

    /// Subscription all resources are created in.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Directory the principal belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Application id of the service principal.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Directory object id of the service principal; access policies name it.
    #[must_use]
    pub fn principal_object_id(&self) -> &str {
        &self.principal_object_id
    }

    /// Cloud environment the session was opened against.
    #[must_use]
    pub const fn environment(&self) -> CloudEnvironment {
        self.environment
    }
}
