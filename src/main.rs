//! Main application entry point (CLI binary).
//!
//! A thin wrapper around the `crawl_sink` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use crawl_sink::initialization::init_logger_with;
use crawl_sink::{run_batch, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Settings path and RUST_LOG may come from a .env file
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    let dry_run = config.dry_run;
    match run_batch(config).await {
        Ok(report) => {
            println!(
                "✅ Processed {} callback result{} ({} rejected, {} with store failures) in {:.1}s{}",
                report.processed,
                if report.processed == 1 { "" } else { "s" },
                report.rejected,
                report.failed,
                report.elapsed_seconds,
                if dry_run { " (dry run)" } else { "" }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("crawl_sink error: {:#}", e);
            process::exit(1);
        }
    }
}
