//! Custom tracing Layer for capturing kvdemo events.
//!
//! This layer intercepts tracing events whose target starts with `kvdemo::`
//! and that carry an `event_type` field, converts them to [`KvdemoEvent`]
//! instances, and sends them to the `EventBus`.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::event::{
    AuthEvent, EventCategory, EventSource, KeyEvent, KvdemoEvent, SampleEvent, SecretEvent,
    SystemEvent, VaultEvent,
};
use crate::metadata::correlation_id;
use tokio::sync::mpsc;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Target prefix shared by every kvdemo event.
pub const EVENT_TARGET_PREFIX: &str = "kvdemo::";

/// A tracing Layer that captures kvdemo-specific events.
pub struct KvdemoEventLayer {
    sender: mpsc::UnboundedSender<KvdemoEvent>,
}

impl KvdemoEventLayer {
    /// Create a new layer that sends events to the given channel.
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<KvdemoEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for KvdemoEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let target = event.metadata().target();

        // Module-path targets (kvdemo_core::...) are diagnostics, not events
        if !target.starts_with(EVENT_TARGET_PREFIX) {
            return;
        }

        let mut visitor = KvdemoEventVisitor::new(target);
        event.record(&mut visitor);

        if let Some(kvdemo_event) = visitor.build() {
            let _ = self.sender.send(kvdemo_event);
        }
    }
}

/// Visitor for extracting typed fields from tracing events.
#[derive(Default)]
struct KvdemoEventVisitor {
    target: String,
    event_type: Option<String>,

    // Auth
    client_id: Option<String>,
    tenant_id: Option<String>,
    subscription_id: Option<String>,

    // Sample
    message: Option<String>,
    error: Option<String>,
    success: Option<bool>,
    duration_ms: Option<u64>,

    // Resources
    vault_name: Option<String>,
    details: Option<String>,
    key_name: Option<String>,
    kid: Option<String>,
    secret_name: Option<String>,
    secret_id: Option<String>,
    value: Option<String>,
    attributes: Option<String>,
}

impl KvdemoEventVisitor {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Self::default()
        }
    }

    fn build(self) -> Option<KvdemoEvent> {
        let event_type = self.event_type.as_deref()?;
        let source = EventSource::new(&self.target);

        let category = match event_type {
            "auth.credentials_found" => EventCategory::Auth(AuthEvent::CredentialsFound {
                client_id: self.client_id?,
                tenant_id: self.tenant_id?,
                subscription_id: self.subscription_id?,
            }),
            "auth.authorized" => EventCategory::Auth(AuthEvent::Authorized {
                subscription_id: self.subscription_id?,
            }),

            "sample.step" => EventCategory::Sample(SampleEvent::Step {
                message: self.message?,
            }),
            "sample.failed" => EventCategory::Sample(SampleEvent::Failed { error: self.error? }),
            "sample.cleanup" => EventCategory::Sample(SampleEvent::Cleanup {
                message: self.message?,
                success: self.success.unwrap_or(true),
            }),
            "sample.completed" => EventCategory::Sample(SampleEvent::Completed {
                success: self.success?,
                duration_ms: self.duration_ms.unwrap_or(0),
            }),

            "vault.summary" => EventCategory::Vault(VaultEvent::Summary {
                vault_name: self.vault_name?,
                details: self.details?,
            }),
            "key.created" => EventCategory::Key(KeyEvent::Created {
                key_name: self.key_name?,
                kid: self.kid?,
            }),
            "secret.stored" => EventCategory::Secret(SecretEvent::Stored {
                secret_name: self.secret_name?,
                secret_id: self.secret_id?,
            }),
            "secret.retrieved" => EventCategory::Secret(SecretEvent::Retrieved {
                secret_name: self.secret_name?,
                value: self.value?,
            }),
            "secret.listed" => EventCategory::Secret(SecretEvent::Listed {
                secret_id: self.secret_id?,
                attributes: self.attributes.unwrap_or_default(),
            }),

            "system.shutdown" => EventCategory::System(SystemEvent::Shutdown),

            _ => return None,
        };

        Some(KvdemoEvent::new(correlation_id(), source, category))
    }

    fn set_string(&mut self, field: &str, value: String) {
        let slot = match field {
            "event_type" => &mut self.event_type,
            "client_id" => &mut self.client_id,
            "tenant_id" => &mut self.tenant_id,
            "subscription_id" => &mut self.subscription_id,
            "message" => &mut self.message,
            "error" => &mut self.error,
            "vault_name" => &mut self.vault_name,
            "details" => &mut self.details,
            "key_name" => &mut self.key_name,
            "kid" => &mut self.kid,
            "secret_name" => &mut self.secret_name,
            "secret_id" => &mut self.secret_id,
            "value" => &mut self.value,
            "attributes" => &mut self.attributes,
            _ => return,
        };
        *slot = Some(value);
    }
}

impl Visit for KvdemoEventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_string(field.name(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "duration_ms" {
            self.duration_ms = Some(value as u64);
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "duration_ms" {
            self.duration_ms = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "success" {
            self.success = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `%value` fields arrive here; their Debug impl forwards to Display
        self.set_string(field.name(), format!("{value:?}"));
    }
}
