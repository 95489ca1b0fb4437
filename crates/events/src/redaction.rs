//! Secret masking for rendered kvdemo output.
//!
//! The service principal's client secret is registered as soon as the
//! credentials load. Generated secret values are registered only when the
//! user asks for them to be masked. Renderers pass every string through
//! [`redact`] before printing.

use std::sync::{PoisonError, RwLock};

/// Values shorter than this are never masked; they match too much.
pub const MIN_SECRET_LENGTH: usize = 4;

/// Replaces each masked value.
pub const REDACTED_PLACEHOLDER: &str = "*_*";

/// A set of secret values, longest first so a secret containing another is
/// masked whole.
#[derive(Debug, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// An empty redactor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            secrets: Vec::new(),
        }
    }

    /// Add a value. Returns `false` if it is too short or already known.
    pub fn register(&mut self, secret: impl Into<String>) -> bool {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LENGTH || self.secrets.contains(&secret) {
            return false;
        }
        let at = self
            .secrets
            .partition_point(|known| known.len() >= secret.len());
        self.secrets.insert(at, secret);
        true
    }

    /// `input` with every known value replaced by [`REDACTED_PLACEHOLDER`].
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        self.secrets
            .iter()
            .fold(input.to_string(), |text, secret| {
                text.replace(secret.as_str(), REDACTED_PLACEHOLDER)
            })
    }

    /// Number of known values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

static REGISTRY: RwLock<Redactor> = RwLock::new(Redactor::new());

/// Mask `secret` in everything rendered from now on.
///
/// ```rust
/// use kvdemo_events::redaction::register_secret;
///
/// register_secret("client-secret-value");
/// ```
pub fn register_secret(secret: impl Into<String>) {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(secret);
}

/// [`register_secret`] for each value.
pub fn register_secrets(secrets: impl IntoIterator<Item = impl Into<String>>) {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    for secret in secrets {
        registry.register(secret);
    }
}

/// Mask every registered secret in `input`.
///
/// ```rust
/// use kvdemo_events::redaction::{redact, register_secret};
///
/// register_secret("abc123-generated");
/// assert_eq!(redact("value=abc123-generated"), "value=*_*");
/// ```
#[must_use]
pub fn redact(input: &str) -> String {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .redact(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_every_occurrence() {
        let mut redactor = Redactor::new();
        redactor.register("abc123");
        assert_eq!(
            redactor.redact("secret s1 = abc123, again abc123"),
            "secret s1 = *_*, again *_*"
        );
    }

    #[test]
    fn test_short_values_are_ignored() {
        let mut redactor = Redactor::new();
        assert!(!redactor.register("abc"));
        assert!(redactor.register("abcd"));
        assert_eq!(redactor.len(), 1);
        assert_eq!(redactor.redact("ab abc abcd"), "ab abc *_*");
    }

    #[test]
    fn test_longest_value_wins() {
        let mut redactor = Redactor::new();
        redactor.register("pass");
        redactor.register("password");
        assert_eq!(redactor.redact("the password is set"), "the *_* is set");
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let mut redactor = Redactor::new();
        assert!(redactor.register("def456"));
        assert!(!redactor.register("def456"));
        assert_eq!(redactor.len(), 1);
    }

    #[test]
    fn test_empty_redactor_is_identity() {
        let redactor = Redactor::new();
        assert!(redactor.is_empty());
        assert_eq!(redactor.redact("line1\nline2"), "line1\nline2");
    }

    #[test]
    fn test_global_registry() {
        register_secrets(["ghi789-global-one", "ghi789-global-two"]);
        register_secret("ghi789-global-three");
        assert_eq!(
            redact("ghi789-global-one ghi789-global-two ghi789-global-three"),
            "*_* *_* *_*"
        );
    }
}
