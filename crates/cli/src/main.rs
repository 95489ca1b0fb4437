//! kvdemo binary entry point.

// CLI binary needs to output to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use kvdemo::cli::{self, CliError, EXIT_FAILURE, EXIT_OK, exit_code_for, render_error};
use kvdemo::tracing::{TracingConfig, init_tracing_with_events};
use kvdemo_events::emit_shutdown;
use kvdemo_events::renderers::{CliRenderer, CliRendererConfig, JsonRenderer};
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long the renderer gets to drain remaining events.
const RENDERER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() {
    // Tracing may be unusable during a panic, so go straight to stderr.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    std::process::exit(rt.block_on(run(cli)));
}

async fn run(cli: cli::Cli) -> i32 {
    let renderer_handle = match start_renderer(&cli) {
        Ok(handle) => handle,
        Err(err) => {
            render_error(&err, cli.json);
            return exit_code_for(&err);
        }
    };

    let result = kvdemo::app::execute(&cli).await;

    emit_shutdown!();
    match tokio::time::timeout(RENDERER_DRAIN_TIMEOUT, renderer_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Renderer task failed"),
        Err(_) => tracing::debug!("Renderer did not drain in time"),
    }

    match result {
        Ok(true) => EXIT_OK,
        Ok(false) => EXIT_FAILURE,
        Err(err) => {
            tracing::debug!(error = %err, "Startup failed");
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    }
}

/// Install tracing and spawn the renderer for the selected output mode.
fn start_renderer(cli: &cli::Cli) -> Result<JoinHandle<()>, CliError> {
    let config = TracingConfig {
        format: cli.tracing_format(),
        level: cli.level.into(),
        ..TracingConfig::default()
    };
    let receiver = init_tracing_with_events(&config)
        .map_err(|e| CliError::config(format!("Failed to initialize tracing: {e}")))?;

    let handle = if cli.json {
        let renderer = JsonRenderer::new();
        tokio::spawn(async move {
            renderer.run(receiver).await;
        })
    } else {
        let renderer = CliRenderer::with_config(CliRendererConfig {
            verbose: cli.verbose,
            ..CliRendererConfig::default()
        });
        tokio::spawn(async move {
            renderer.run(receiver).await;
        })
    };
    Ok(handle)
}
