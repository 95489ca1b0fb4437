//! Renderers that turn the event stream into terminal or JSON output.

pub mod cli;
pub mod json;

pub use cli::{CliRenderer, CliRendererConfig};
pub use json::JsonRenderer;
