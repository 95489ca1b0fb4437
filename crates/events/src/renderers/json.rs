//! JSON renderer for kvdemo events.
//!
//! Renders events as JSON lines for machine consumption.
//! This module is allowed to use println! as it's the output layer.

#![allow(clippy::print_stdout)]

use crate::bus::EventReceiver;
use crate::event::KvdemoEvent;
use crate::redaction::redact;

/// JSON renderer that outputs events as JSON lines.
#[derive(Debug, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    /// Create a new JSON renderer with compact output.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a new JSON renderer with pretty-printed output.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Run the renderer until the bus closes or a shutdown event arrives.
    pub async fn run(self, mut receiver: EventReceiver) {
        while let Some(event) = receiver.recv().await {
            let done = event.is_shutdown();
            self.render(&event);
            if done {
                break;
            }
        }
    }

    /// Format a single event; registered secrets are redacted.
    #[must_use]
    pub fn format(&self, event: &KvdemoEvent) -> Option<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(event)
        } else {
            serde_json::to_string(event)
        };
        json.ok().map(|line| redact(&line))
    }

    /// Render a single event as JSON.
    pub fn render(&self, event: &KvdemoEvent) {
        if let Some(json) = self.format(event) {
            println!("{json}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventCategory, EventSource, SecretEvent};
    use crate::redaction::register_secret;
    use uuid::Uuid;

    #[test]
    fn test_format_is_single_line() {
        let renderer = JsonRenderer::new();
        let event = KvdemoEvent::new(
            Uuid::new_v4(),
            EventSource::new("kvdemo::secret"),
            EventCategory::Secret(SecretEvent::Listed {
                secret_id: "https://v.vault.azure.net/secrets/s".to_string(),
                attributes: "enabled=true".to_string(),
            }),
        );
        let line = renderer.format(&event).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"type\":\"Secret\""));
    }

    #[test]
    fn test_format_redacts_registered_secrets() {
        register_secret("hunter2hunter2");

        let event = KvdemoEvent::new(
            Uuid::new_v4(),
            EventSource::new("kvdemo::secret"),
            EventCategory::Secret(SecretEvent::Retrieved {
                secret_name: "s1".to_string(),
                value: "hunter2hunter2".to_string(),
            }),
        );
        let line = JsonRenderer::pretty().format(&event).unwrap();
        assert!(!line.contains("hunter2hunter2"));
        assert!(line.contains("*_*"));
    }
}
