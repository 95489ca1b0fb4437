//! Structured progress events for kvdemo.
//!
//! The sample reports its progress through tracing macros. A custom tracing
//! Layer captures them as typed [`KvdemoEvent`]s, an [`EventBus`] fans them
//! out, and a renderer prints them for a terminal or as JSON lines.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           kvdemo-events crate                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │ Event Schema │  │ EventBus     │  │ Tracing Layer│  │ Renderers   │ │
//! │  │ (typed)      │  │ (broadcast)  │  │ (capture)    │  │ (CLI/JSON)  │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use kvdemo_events::{CliRenderer, EventBus, emit_step};
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! let bus = EventBus::new();
//! let renderer = CliRenderer::new();
//! tokio::spawn(renderer.run(bus.subscribe()));
//! tracing_subscriber::registry().with(bus.layer()).init();
//!
//! emit_step!("Creating a key vault with no Access Policy...");
//! ```

pub mod bus;
pub mod event;
pub mod layer;
pub mod metadata;
pub mod redaction;
pub mod renderers;

pub use bus::{EventBus, EventReceiver};
pub use event::{
    AuthEvent, EventCategory, EventSource, KeyEvent, KvdemoEvent, SampleEvent, SecretEvent,
    SystemEvent, VaultEvent,
};
pub use layer::{EVENT_TARGET_PREFIX, KvdemoEventLayer};
pub use metadata::correlation_id;
pub use redaction::{REDACTED_PLACEHOLDER, Redactor, redact, register_secret, register_secrets};
pub use renderers::{CliRenderer, CliRendererConfig, JsonRenderer};

// ============================================================================
// Emit Macros
// ============================================================================

// Auth Events

/// Emit the credentials-found event with the non-secret identifiers.
///
/// # Example
/// ```rust,ignore
/// emit_credentials_found!("client", "tenant", "subscription");
/// ```
#[macro_export]
macro_rules! emit_credentials_found {
    ($client_id:expr, $tenant_id:expr, $subscription_id:expr) => {
        ::tracing::info!(
            target: "kvdemo::auth",
            event_type = "auth.credentials_found",
            client_id = %$client_id,
            tenant_id = %$tenant_id,
            subscription_id = %$subscription_id,
        )
    };
}

/// Emit an authorized event.
#[macro_export]
macro_rules! emit_authorized {
    ($subscription_id:expr) => {
        ::tracing::info!(
            target: "kvdemo::auth",
            event_type = "auth.authorized",
            subscription_id = %$subscription_id,
        )
    };
}

// Sample Events

/// Emit a progress step message.
///
/// # Example
/// ```rust,ignore
/// emit_step!("Listing key vaults...");
/// ```
#[macro_export]
macro_rules! emit_step {
    ($message:expr) => {
        ::tracing::info!(
            target: "kvdemo::sample",
            event_type = "sample.step",
            message = %$message,
        )
    };
}

/// Emit a sample failure.
#[macro_export]
macro_rules! emit_sample_failed {
    ($error:expr) => {
        ::tracing::info!(
            target: "kvdemo::sample",
            event_type = "sample.failed",
            error = %$error,
        )
    };
}

/// Emit a cleanup outcome.
#[macro_export]
macro_rules! emit_cleanup {
    ($message:expr, $success:expr) => {
        ::tracing::info!(
            target: "kvdemo::sample",
            event_type = "sample.cleanup",
            message = %$message,
            success = $success,
        )
    };
}

/// Emit the sample completion event.
///
/// # Example
/// ```rust,ignore
/// emit_sample_completed!(true, 1234_u64);
/// ```
#[macro_export]
macro_rules! emit_sample_completed {
    ($success:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "kvdemo::sample",
            event_type = "sample.completed",
            success = $success,
            duration_ms = $duration_ms,
        )
    };
}

// Resource Events

/// Emit a vault summary block.
#[macro_export]
macro_rules! emit_vault_summary {
    ($vault_name:expr, $details:expr) => {
        ::tracing::info!(
            target: "kvdemo::vault",
            event_type = "vault.summary",
            vault_name = %$vault_name,
            details = %$details,
        )
    };
}

/// Emit a key created event.
#[macro_export]
macro_rules! emit_key_created {
    ($key_name:expr, $kid:expr) => {
        ::tracing::info!(
            target: "kvdemo::key",
            event_type = "key.created",
            key_name = %$key_name,
            kid = %$kid,
        )
    };
}

/// Emit a secret stored event.
#[macro_export]
macro_rules! emit_secret_stored {
    ($secret_name:expr, $secret_id:expr) => {
        ::tracing::info!(
            target: "kvdemo::secret",
            event_type = "secret.stored",
            secret_name = %$secret_name,
            secret_id = %$secret_id,
        )
    };
}

/// Emit a secret retrieved event.
#[macro_export]
macro_rules! emit_secret_retrieved {
    ($secret_name:expr, $value:expr) => {
        ::tracing::info!(
            target: "kvdemo::secret",
            event_type = "secret.retrieved",
            secret_name = %$secret_name,
            value = %$value,
        )
    };
}

/// Emit a secret listed event.
#[macro_export]
macro_rules! emit_secret_listed {
    ($secret_id:expr, $attributes:expr) => {
        ::tracing::info!(
            target: "kvdemo::secret",
            event_type = "secret.listed",
            secret_id = %$secret_id,
            attributes = %$attributes,
        )
    };
}

// System Events

/// Emit a system shutdown event.
#[macro_export]
macro_rules! emit_shutdown {
    () => {
        ::tracing::info!(
            target: "kvdemo::system",
            event_type = "system.shutdown",
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(f: impl FnOnce()) -> Vec<KvdemoEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let layer = KvdemoEventLayer::new(tx);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_auth_macros_produce_events() {
        let events = capture(|| {
            emit_credentials_found!("client", "tenant", "sub");
            emit_authorized!("sub");
        });
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1].category,
            EventCategory::Auth(AuthEvent::Authorized { subscription_id }) if subscription_id == "sub"
        ));
    }

    #[test]
    fn test_sample_macros_produce_events() {
        let events = capture(|| {
            emit_step!("Listing key vaults...");
            emit_sample_failed!("service error");
            emit_cleanup!("Deleted the resource group", true);
            emit_sample_completed!(false, 15_u64);
        });
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[2].category,
            EventCategory::Sample(SampleEvent::Cleanup { success: true, .. })
        ));
    }

    #[test]
    fn test_resource_macros_produce_events() {
        let events = capture(|| {
            emit_vault_summary!("vault1abc", "Key Vault: /subscriptions/x");
            emit_key_created!("key-abc", "https://v.vault.azure.net/keys/key-abc/1");
            emit_secret_stored!("secret-abc", "https://v.vault.azure.net/secrets/secret-abc/1");
            emit_secret_retrieved!("secret-abc", "value");
            emit_secret_listed!("https://v.vault.azure.net/secrets/secret-abc", "enabled=true");
        });
        assert_eq!(events.len(), 5);
        assert!(matches!(
            &events[1].category,
            EventCategory::Key(KeyEvent::Created { key_name, .. }) if key_name == "key-abc"
        ));
    }

    #[test]
    fn test_shutdown_macro_produces_event() {
        let events = capture(|| {
            emit_shutdown!();
        });
        assert_eq!(events.len(), 1);
        assert!(events[0].is_shutdown());
    }
}
