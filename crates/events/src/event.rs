//! Event type definitions for structured kvdemo events.
//!
//! Events are categorized by domain (authentication, vault, key, secret,
//! sample run) and carry an id, the process correlation id and a timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured kvdemo event with full metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvdemoEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Correlation ID shared by every event of one process.
    pub correlation_id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Source information for the event.
    pub source: EventSource,
    /// The event category and data.
    pub category: EventCategory,
}

impl KvdemoEvent {
    /// Create a new event with the given category.
    #[must_use]
    pub fn new(correlation_id: Uuid, source: EventSource, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id,
            timestamp: Utc::now(),
            source,
            category,
        }
    }

    /// Whether this event ends the stream.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self.category, EventCategory::System(SystemEvent::Shutdown))
    }
}

/// Source information for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    /// The tracing target (e.g., "`kvdemo::vault`", "`kvdemo::secret`").
    pub target: String,
}

impl EventSource {
    /// Create a new event source from a tracing target.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// Event categories organized by domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// Credential loading and authentication.
    Auth(AuthEvent),
    /// Sample run lifecycle.
    Sample(SampleEvent),
    /// Vault descriptors.
    Vault(VaultEvent),
    /// Key creation.
    Key(KeyEvent),
    /// Secret writes, reads and listings.
    Secret(SecretEvent),
    /// Process-level events.
    System(SystemEvent),
}

/// Credential loading and authentication events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum AuthEvent {
    /// A credentials file was read.
    CredentialsFound {
        /// Application (client) id.
        client_id: String,
        /// Directory (tenant) id.
        tenant_id: String,
        /// Subscription the session will be bound to.
        subscription_id: String,
    },
    /// A session was established.
    Authorized {
        /// Subscription the session is bound to.
        subscription_id: String,
    },
}

/// Sample run lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SampleEvent {
    /// A new step of the walkthrough started.
    Step {
        /// Human-readable description of the step.
        message: String,
    },
    /// The walkthrough failed.
    Failed {
        /// Error message.
        error: String,
    },
    /// Resource cleanup progress.
    Cleanup {
        /// What is being removed.
        message: String,
        /// Whether the removal succeeded.
        success: bool,
    },
    /// The walkthrough finished.
    Completed {
        /// Whether every step succeeded.
        success: bool,
        /// Duration in milliseconds.
        duration_ms: u64,
    },
}

/// Vault descriptor events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum VaultEvent {
    /// A vault descriptor to display.
    Summary {
        /// Vault name.
        vault_name: String,
        /// Multi-line rendering of the descriptor.
        details: String,
    },
}

/// Key events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum KeyEvent {
    /// A key was created.
    Created {
        /// Key name.
        key_name: String,
        /// Key identifier URI.
        kid: String,
    },
}

/// Secret events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SecretEvent {
    /// A secret was written.
    Stored {
        /// Secret name.
        secret_name: String,
        /// Secret identifier URI.
        secret_id: String,
    },
    /// A secret value was read back.
    Retrieved {
        /// Secret name or identifier used for the lookup.
        secret_name: String,
        /// The secret value.
        value: String,
    },
    /// A secret reference was returned by a listing.
    Listed {
        /// Secret identifier URI.
        secret_id: String,
        /// Rendered attributes.
        attributes: String,
    },
}

/// Process-level events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SystemEvent {
    /// No further events will be emitted.
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = KvdemoEvent::new(
            Uuid::new_v4(),
            EventSource::new("kvdemo::test"),
            EventCategory::Sample(SampleEvent::Step {
                message: "test".to_string(),
            }),
        );

        assert!(!event.id.is_nil());
        assert_eq!(event.source.target, "kvdemo::test");
        assert!(!event.is_shutdown());
    }

    #[test]
    fn test_event_serialization() {
        let event = KvdemoEvent::new(
            Uuid::new_v4(),
            EventSource::new("kvdemo::key"),
            EventCategory::Key(KeyEvent::Created {
                key_name: "key-abc".to_string(),
                kid: "https://v1.vault.azure.net/keys/key-abc/1".to_string(),
            }),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("kvdemo::key"));
        assert!(json.contains("\"type\":\"Key\""));
        assert!(json.contains("key-abc"));

        let parsed: KvdemoEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, event.id);
    }

    #[test]
    fn test_secret_event_tags() {
        let event = SecretEvent::Retrieved {
            secret_name: "s1".to_string(),
            value: "abc123".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Retrieved"));
        assert!(json.contains("abc123"));
    }

    #[test]
    fn test_shutdown_detection() {
        let event = KvdemoEvent::new(
            Uuid::new_v4(),
            EventSource::new("kvdemo::system"),
            EventCategory::System(SystemEvent::Shutdown),
        );
        assert!(event.is_shutdown());
    }

    #[test]
    fn test_sample_completed_roundtrip() {
        let event = SampleEvent::Completed {
            success: false,
            duration_ms: 1200,
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: SampleEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed,
            SampleEvent::Completed {
                success: false,
                duration_ms: 1200
            }
        ));
    }
}
