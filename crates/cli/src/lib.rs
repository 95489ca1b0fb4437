//! kvdemo: an Azure Key Vault management walkthrough.
//!
//! The binary signs in a service principal, creates two vaults, grants
//! access, stores keys and secrets, lists them and optionally cleans up.
//! This library holds the pieces the binary wires together so they can be
//! tested without a process boundary.

pub mod app;
pub mod cli;
pub mod tracing;

pub use cli::{CliError, EXIT_FAILURE, EXIT_OK};
