//! CLI renderer for kvdemo events.
//!
//! Renders events to stdout/stderr for terminal display.
//! This module is allowed to use println!/eprintln! as it's the output layer.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use crate::bus::EventReceiver;
use crate::event::{
    AuthEvent, EventCategory, KeyEvent, KvdemoEvent, SampleEvent, SecretEvent, SystemEvent,
    VaultEvent,
};
use crate::redaction::redact;
use std::io::{self, IsTerminal};

/// CLI renderer configuration.
#[derive(Debug, Clone)]
pub struct CliRendererConfig {
    /// Whether to use ANSI colors.
    pub colors: bool,
    /// Whether to show verbose output.
    pub verbose: bool,
}

impl Default for CliRendererConfig {
    fn default() -> Self {
        Self {
            colors: io::stdout().is_terminal(),
            verbose: false,
        }
    }
}

/// CLI renderer that outputs events to stdout/stderr.
#[derive(Debug)]
pub struct CliRenderer {
    config: CliRendererConfig,
}

impl CliRenderer {
    /// Create a new CLI renderer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CliRendererConfig::default(),
        }
    }

    /// Create a new CLI renderer with the given configuration.
    #[must_use]
    pub const fn with_config(config: CliRendererConfig) -> Self {
        Self { config }
    }

    /// Run the renderer until the bus closes or a shutdown event arrives.
    pub async fn run(self, mut receiver: EventReceiver) {
        while let Some(event) = receiver.recv().await {
            if event.is_shutdown() {
                break;
            }
            self.render(&event);
        }
    }

    /// Render a single event.
    pub fn render(&self, event: &KvdemoEvent) {
        match &event.category {
            EventCategory::Auth(auth) => Self::render_auth(auth),
            EventCategory::Sample(sample) => self.render_sample(sample),
            EventCategory::Vault(VaultEvent::Summary { details, .. }) => {
                println!("{}", redact(details));
            }
            EventCategory::Key(KeyEvent::Created { kid, .. }) => {
                println!("The key Id is: {}", redact(kid));
            }
            EventCategory::Secret(secret) => self.render_secret(secret),
            EventCategory::System(SystemEvent::Shutdown) => {
                if self.config.verbose {
                    eprintln!("Event stream closed");
                }
            }
        }
    }

    fn render_auth(event: &AuthEvent) {
        match event {
            AuthEvent::CredentialsFound {
                client_id,
                tenant_id,
                subscription_id,
            } => {
                println!("Found the following for Azure authentication");
                println!("clientId={}", redact(client_id));
                println!("tenantId={}", redact(tenant_id));
                println!("subscription={}", redact(subscription_id));
            }
            AuthEvent::Authorized { subscription_id } => {
                println!(
                    "Authorized for selected subscription: {}",
                    redact(subscription_id)
                );
            }
        }
    }

    fn render_sample(&self, event: &SampleEvent) {
        match event {
            SampleEvent::Step { message } => println!("{}", redact(message)),
            SampleEvent::Failed { error } => {
                if self.config.colors {
                    eprintln!("\x1b[31m{}\x1b[0m", redact(error));
                } else {
                    eprintln!("{}", redact(error));
                }
            }
            SampleEvent::Cleanup { message, success } => {
                if *success {
                    println!("{}", redact(message));
                } else {
                    eprintln!("{}", redact(message));
                }
            }
            SampleEvent::Completed {
                success,
                duration_ms,
            } => {
                if self.config.verbose || !success {
                    let status = if *success { "completed" } else { "failed" };
                    eprintln!("Sample {status} in {duration_ms}ms");
                }
            }
        }
    }

    fn render_secret(&self, event: &SecretEvent) {
        match event {
            SecretEvent::Stored {
                secret_name,
                secret_id,
            } => {
                if self.config.verbose {
                    println!("Stored secret {secret_name}: {}", redact(secret_id));
                }
            }
            SecretEvent::Retrieved { secret_name, value } => {
                println!(
                    "Got Secret: {} with value={}",
                    redact(secret_name),
                    redact(value)
                );
            }
            SecretEvent::Listed {
                secret_id,
                attributes,
            } => {
                for line in listed_lines(secret_id, attributes) {
                    println!("{line}");
                }
            }
        }
    }
}

/// The two lines printed per listed secret.
fn listed_lines(secret_id: &str, attributes: &str) -> [String; 2] {
    [
        format!("secret attributes: {}", redact(attributes)),
        format!("secret value: {}", redact(secret_id)),
    ]
}

impl Default for CliRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventBus;
    use crate::event::EventSource;
    use tracing_subscriber::layer::SubscriberExt;
    use uuid::Uuid;

    fn create_test_event(category: EventCategory) -> KvdemoEvent {
        KvdemoEvent::new(Uuid::new_v4(), EventSource::new("kvdemo::test"), category)
    }

    fn quiet() -> CliRenderer {
        CliRenderer::with_config(CliRendererConfig {
            colors: false,
            verbose: false,
        })
    }

    fn verbose() -> CliRenderer {
        CliRenderer::with_config(CliRendererConfig {
            colors: false,
            verbose: true,
        })
    }

    #[test]
    fn test_cli_renderer_config_default() {
        let config = CliRendererConfig::default();
        assert!(!config.verbose);
    }

    #[test]
    fn test_render_auth_events() {
        let renderer = quiet();
        renderer.render(&create_test_event(EventCategory::Auth(
            AuthEvent::CredentialsFound {
                client_id: "client".to_string(),
                tenant_id: "tenant".to_string(),
                subscription_id: "sub".to_string(),
            },
        )));
        renderer.render(&create_test_event(EventCategory::Auth(
            AuthEvent::Authorized {
                subscription_id: "sub".to_string(),
            },
        )));
    }

    #[test]
    fn test_render_sample_events() {
        for renderer in [quiet(), verbose()] {
            renderer.render(&create_test_event(EventCategory::Sample(SampleEvent::Step {
                message: "Creating a key vault with no Access Policy...".to_string(),
            })));
            renderer.render(&create_test_event(EventCategory::Sample(
                SampleEvent::Failed {
                    error: "boom".to_string(),
                },
            )));
            renderer.render(&create_test_event(EventCategory::Sample(
                SampleEvent::Cleanup {
                    message: "Deleted the key vaults".to_string(),
                    success: true,
                },
            )));
            renderer.render(&create_test_event(EventCategory::Sample(
                SampleEvent::Completed {
                    success: false,
                    duration_ms: 10,
                },
            )));
        }
    }

    #[test]
    fn test_render_resource_events() {
        let renderer = verbose();
        renderer.render(&create_test_event(EventCategory::Vault(VaultEvent::Summary {
            vault_name: "vault1".to_string(),
            details: "Key Vault: /subscriptions/x\n\tName: vault1".to_string(),
        })));
        renderer.render(&create_test_event(EventCategory::Key(KeyEvent::Created {
            key_name: "key-1".to_string(),
            kid: "https://vault1.vault.azure.net/keys/key-1/abc".to_string(),
        })));
        renderer.render(&create_test_event(EventCategory::Secret(
            SecretEvent::Stored {
                secret_name: "secret-1".to_string(),
                secret_id: "https://vault1.vault.azure.net/secrets/secret-1/abc".to_string(),
            },
        )));
        renderer.render(&create_test_event(EventCategory::Secret(
            SecretEvent::Listed {
                secret_id: "https://vault1.vault.azure.net/secrets/secret-1".to_string(),
                attributes: "enabled=true".to_string(),
            },
        )));
    }

    #[test]
    fn test_listed_secret_lines() {
        let [attributes, value] = listed_lines(
            "https://vault1.vault.azure.net/secrets/secret-1",
            "enabled=true",
        );
        assert_eq!(attributes, "secret attributes: enabled=true");
        assert_eq!(
            value,
            "secret value: https://vault1.vault.azure.net/secrets/secret-1"
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let bus = EventBus::new();
        let handle = tokio::spawn(quiet().run(bus.subscribe()));
        let subscriber = tracing_subscriber::registry().with(bus.layer());

        tracing::subscriber::with_default(subscriber, || {
            crate::emit_step!("Listing key vaults...");
            crate::emit_shutdown!();
        });

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("renderer should stop on shutdown")
            .unwrap();
    }
}
