//! Startup sequence: credentials, sign-in, then the walkthrough.

use crate::cli::{Cli, CliError};
use kvdemo_core::{Credentials, KeyVaultSample};
use kvdemo_events::{emit_authorized, emit_credentials_found, register_secret};
use tracing::instrument;

/// Load credentials from `--auth-file`, falling back to `AZURE_AUTH_LOCATION`.
///
/// The client secret is registered for redaction before anything else can
/// print it.
///
/// # Errors
///
/// Returns a configuration error if no file is configured or it cannot be
/// parsed.
pub fn load_credentials(cli: &Cli) -> Result<Credentials, CliError> {
    let credentials = match &cli.auth_file {
        Some(path) => Credentials::from_file(path)?,
        None => Credentials::from_env()?,
    };
    register_secret(credentials.client_secret());
    emit_credentials_found!(
        credentials.client_id,
        credentials.tenant_id,
        credentials.subscription_id
    );
    Ok(credentials)
}

/// Sign in and run the walkthrough. `Ok(false)` means it ran and failed.
///
/// # Errors
///
/// Returns an error when the walkthrough cannot start: missing or malformed
/// credentials, or a rejected sign-in.
#[instrument(name = "kvdemo_execute", skip_all, fields(cloud = %cli.environment()))]
pub async fn execute(cli: &Cli) -> Result<bool, CliError> {
    let credentials = load_credentials(cli)?;
    let clients =
        kvdemo_azure::authenticate(&credentials, cli.environment(), &cli.client_options()).await?;
    emit_authorized!(clients.session.subscription_id());

    let sample = KeyVaultSample::new(
        clients.session,
        clients.management,
        clients.data,
        cli.sample_config(),
    );
    Ok(sample.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        temp_env::with_var_unset("KVDEMO_AUTH_FILE", || Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_auth_file_flag_wins_over_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"clientId":"c","tenantId":"t","clientSecret":"s3cr3t-value","subscriptionId":"sub"}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let credentials = temp_env::with_var("AZURE_AUTH_LOCATION", Some("/nonexistent"), || {
            load_credentials(&cli(&["kvdemo", "--auth-file", path.as_str()]))
        })
        .unwrap();
        assert_eq!(credentials.client_id, "c");
        assert_eq!(credentials.subscription_id, "sub");
        assert_eq!(
            kvdemo_events::redact("leaked s3cr3t-value"),
            format!("leaked {}", kvdemo_events::REDACTED_PLACEHOLDER)
        );
    }

    #[test]
    fn test_missing_auth_location_is_config_error() {
        let err = temp_env::with_var_unset("AZURE_AUTH_LOCATION", || {
            load_credentials(&cli(&["kvdemo"]))
        })
        .unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert!(err.to_string().contains("AZURE_AUTH_LOCATION"));
    }
}
