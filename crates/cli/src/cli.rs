//! Command-line surface: arguments, error type and exit codes.

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, ValueEnum};
use kvdemo_azure::ClientOptions;
use kvdemo_core::{CloudEnvironment, SampleConfig};
use kvdemo_core::sample::{
    DEFAULT_EXTERNAL_OBJECT_ID, DEFAULT_REGION, DEFAULT_SECOND_REGION, MAX_SECRET_PAGE_SIZE,
};
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The walkthrough succeeded.
pub const EXIT_OK: i32 = 0;
/// The walkthrough failed or could not start.
pub const EXIT_FAILURE: i32 = 1;

/// CLI-level errors, rendered through miette before exit.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Credentials, arguments or tracing could not be set up
    #[error("Configuration error: {message}")]
    #[diagnostic(code(kvdemo::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The service principal could not sign in
    #[error("Authentication error: {message}")]
    #[diagnostic(code(kvdemo::cli::auth))]
    Auth {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The walkthrough reported failure, or something unexpected happened
    #[error("{message}")]
    #[diagnostic(code(kvdemo::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Auth { .. } => "auth",
            Self::Other { .. } => "other",
        }
    }
}

/// Keeps the message without the core prefix so reports don't read
/// "Configuration error: Configuration error: ...".
impl From<kvdemo_core::Error> for CliError {
    fn from(err: kvdemo_core::Error) -> Self {
        match err {
            kvdemo_core::Error::Configuration { message } => Self::config_with_help(
                message,
                format!(
                    "Point {} (or --auth-file) at a JSON file with clientId, tenantId, clientSecret and subscriptionId",
                    kvdemo_core::AUTH_LOCATION_ENV
                ),
            ),
            kvdemo_core::Error::Authentication { message } => Self::Auth {
                message,
                help: Some(
                    "Check that the client secret is valid and the tenant id is correct".to_string(),
                ),
            },
            kvdemo_core::Error::Service { .. } => Self::other(err.to_string()),
        }
    }
}

/// Every error exits 1; there are no per-kind codes.
#[must_use]
pub const fn exit_code_for(_err: &CliError) -> i32 {
    EXIT_FAILURE
}

/// JSON error envelope for `--json` mode.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Always "error"
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.code(),
            "message": kvdemo_events::redact(&err.to_string()),
        }));
        match serde_json::to_string(&envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{}", kvdemo_events::redact(&format!("{report:?}")));
        let _ = io::stderr().flush();
    }
}

/// `--cloud` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CloudArg {
    /// Azure public cloud
    #[default]
    Azure,
    /// Azure China (21Vianet)
    China,
    /// Azure US Government
    UsGov,
}

impl From<CloudArg> for CloudEnvironment {
    fn from(cloud: CloudArg) -> Self {
        match cloud {
            CloudArg::Azure => Self::AzureCloud,
            CloudArg::China => Self::AzureChinaCloud,
            CloudArg::UsGov => Self::AzureUsGovernment,
        }
    }
}

/// Create two Key Vaults, grant access, store keys and secrets, then list them.
#[derive(Parser, Debug)]
#[command(name = "kvdemo")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Service principal auth file (takes precedence over AZURE_AUTH_LOCATION)
    #[arg(long, env = "KVDEMO_AUTH_FILE", value_name = "PATH")]
    pub auth_file: Option<PathBuf>,

    /// Azure cloud to sign in to
    #[arg(long, env = "KVDEMO_CLOUD", value_enum, default_value_t = CloudArg::Azure)]
    pub cloud: CloudArg,

    /// Region of the resource group and the first vault
    #[arg(long, env = "KVDEMO_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Region of the second vault
    #[arg(long, env = "KVDEMO_SECOND_REGION", default_value = DEFAULT_SECOND_REGION)]
    pub second_region: String,

    /// Extra object id granted full access on the first vault
    #[arg(
        long,
        env = "KVDEMO_EXTERNAL_OBJECT_ID",
        value_name = "OID",
        default_value = DEFAULT_EXTERNAL_OBJECT_ID
    )]
    pub external_object_id: String,

    /// Secrets to request when listing (at most 10)
    #[arg(long, env = "KVDEMO_PAGE_SIZE", value_name = "N", default_value_t = MAX_SECRET_PAGE_SIZE)]
    pub page_size: usize,

    /// Delete both vaults and the resource group when done
    #[arg(long, env = "KVDEMO_CLEANUP")]
    pub cleanup: bool,

    /// Mask generated secret values in output
    #[arg(long, env = "KVDEMO_MASK_SECRET_VALUES")]
    pub mask_secret_values: bool,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "KVDEMO_TIMEOUT_SECS", value_name = "N", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Logging verbosity level
    #[arg(
        short = 'l',
        long,
        env = "KVDEMO_LEVEL",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Diagnostic log format (defaults to json with --json, pretty otherwise)
    #[arg(long, env = "KVDEMO_LOG_FORMAT", value_enum)]
    pub log_format: Option<TracingFormat>,

    /// Emit progress as JSON lines
    #[arg(long, env = "KVDEMO_JSON")]
    pub json: bool,

    /// Also print stored secret ids and the run duration
    #[arg(short, long, env = "KVDEMO_VERBOSE")]
    pub verbose: bool,
}

impl Cli {
    /// Walkthrough settings from the parsed flags.
    #[must_use]
    pub fn sample_config(&self) -> SampleConfig {
        SampleConfig {
            region: self.region.clone(),
            second_region: self.second_region.clone(),
            external_object_id: self.external_object_id.clone(),
            page_size: self.page_size,
            cleanup: self.cleanup,
            mask_secret_values: self.mask_secret_values,
        }
    }

    /// HTTP settings from the parsed flags.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            ..ClientOptions::default()
        }
    }

    /// Cloud selected by `--cloud`.
    #[must_use]
    pub fn environment(&self) -> CloudEnvironment {
        self.cloud.into()
    }

    /// Diagnostic format: `--log-format`, else json with `--json`, else pretty.
    #[must_use]
    pub fn tracing_format(&self) -> TracingFormat {
        self.log_format.unwrap_or(if self.json {
            TracingFormat::Json
        } else {
            TracingFormat::Pretty
        })
    }
}

/// Parse the process arguments, exiting on usage errors.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 13] = [
        "KVDEMO_AUTH_FILE",
        "KVDEMO_CLOUD",
        "KVDEMO_REGION",
        "KVDEMO_SECOND_REGION",
        "KVDEMO_EXTERNAL_OBJECT_ID",
        "KVDEMO_PAGE_SIZE",
        "KVDEMO_CLEANUP",
        "KVDEMO_MASK_SECRET_VALUES",
        "KVDEMO_TIMEOUT_SECS",
        "KVDEMO_LEVEL",
        "KVDEMO_LOG_FORMAT",
        "KVDEMO_JSON",
        "KVDEMO_VERBOSE",
    ];

    fn parse_clean(args: &[&str]) -> Cli {
        let unset: Vec<(&str, Option<&str>)> = ENV_VARS.iter().map(|v| (*v, None)).collect();
        temp_env::with_vars(unset, || Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_cli_default_values() {
        let cli = parse_clean(&["kvdemo"]);

        assert!(cli.auth_file.is_none());
        assert_eq!(cli.cloud, CloudArg::Azure);
        assert_eq!(cli.level, LogLevel::Warn);
        assert!(!cli.json);
        assert!(!cli.verbose);
        assert!(!cli.cleanup);
        assert_eq!(cli.sample_config(), SampleConfig::default());
        assert_eq!(cli.client_options().timeout, Duration::from_secs(60));
        assert_eq!(cli.environment(), CloudEnvironment::AzureCloud);
        assert_eq!(cli.tracing_format(), TracingFormat::Pretty);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = parse_clean(&[
            "kvdemo",
            "--auth-file",
            "/tmp/azureauth.json",
            "--cloud",
            "us-gov",
            "--region",
            "westus",
            "--second-region",
            "westus2",
            "--page-size",
            "3",
            "--cleanup",
            "--mask-secret-values",
            "--timeout-secs",
            "5",
            "-l",
            "debug",
            "--json",
            "-v",
        ]);

        assert_eq!(cli.auth_file, Some(PathBuf::from("/tmp/azureauth.json")));
        assert_eq!(cli.environment(), CloudEnvironment::AzureUsGovernment);
        assert_eq!(cli.level, LogLevel::Debug);
        assert_eq!(cli.tracing_format(), TracingFormat::Json);
        assert!(cli.verbose);

        let config = cli.sample_config();
        assert_eq!(config.region, "westus");
        assert_eq!(config.second_region, "westus2");
        assert_eq!(config.page_size, 3);
        assert!(config.cleanup);
        assert!(config.mask_secret_values);
        assert_eq!(cli.client_options().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_log_format_overrides_json_default() {
        let cli = parse_clean(&["kvdemo", "--json", "--log-format", "compact"]);
        assert_eq!(cli.tracing_format(), TracingFormat::Compact);
    }

    #[test]
    fn test_env_fallbacks() {
        let cli = temp_env::with_vars(
            [
                ("KVDEMO_CLOUD", Some("china")),
                ("KVDEMO_REGION", Some("chinaeast2")),
                ("KVDEMO_CLEANUP", Some("true")),
                ("KVDEMO_PAGE_SIZE", Some("7")),
            ],
            || Cli::try_parse_from(["kvdemo"]).unwrap(),
        );
        assert_eq!(cli.environment(), CloudEnvironment::AzureChinaCloud);
        assert_eq!(cli.region, "chinaeast2");
        assert!(cli.cleanup);
        assert_eq!(cli.page_size, 7);
    }

    #[test]
    fn test_rejects_unknown_cloud() {
        assert!(Cli::try_parse_from(["kvdemo", "--cloud", "mars"]).is_err());
    }

    #[test]
    fn test_core_errors_map_to_cli_errors() {
        let err = CliError::from(kvdemo_core::Error::configuration("missing file"));
        assert!(matches!(
            err,
            CliError::Config { ref message, help: Some(_) } if message == "missing file"
        ));

        let err = CliError::from(kvdemo_core::Error::authentication("bad secret"));
        assert!(matches!(err, CliError::Auth { .. }));
        assert_eq!(err.to_string(), "Authentication error: bad secret");

        let err = CliError::from(kvdemo_core::Error::service_status(
            "create vault",
            409,
            "Conflict: taken",
        ));
        assert_eq!(err.to_string(), "create vault failed: Conflict: taken");
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_error_envelope_shape() {
        let envelope = ErrorEnvelope::new(serde_json::json!({ "code": "config" }));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code"], "config");
    }
}
