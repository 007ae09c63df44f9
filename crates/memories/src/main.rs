//! Memories CLI binary.
//!
//! This binary provides command-line access to an event's media store:
//! - Upload files and mint direct-upload URLs
//! - List files and check quota usage
//! - Share, inspect, and delete files

use clap::Parser;
use memories::{ObservabilityConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, build_manager, handle_command};

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut observability = ObservabilityConfig::new().with_json_logs(cli.json_logs);
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability(&observability)?;

    let manager = build_manager(cli.config.as_deref())?;
    handle_command(cli.command, &manager).await
}
