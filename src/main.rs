//! pwalk - Parallel Filesystem Inventory Walker
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use pwalk::config::{CliArgs, ScanConfig, ScanRequest};
use pwalk::walker::ScanCoordinator;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();
    let quiet = args.quiet;

    setup_logging(args.verbose)?;

    let config = ScanConfig::from_request(ScanRequest::from(args))
        .context("Invalid configuration")?;

    let coordinator = ScanCoordinator::new(config).context("Failed to initialize scan")?;

    // Graceful shutdown on interrupt: stop traversal, keep what was flushed
    let abort_flag = coordinator.abort_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        abort_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let outcome = coordinator.run().context("Scan failed")?;

    if !quiet {
        print_summary(&outcome);
    }

    Ok(())
}

/// Configure tracing output; `-v` bumps the default level to debug.
fn setup_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Print the scan summary
fn print_summary(outcome: &pwalk::ScanOutcome) {
    let s = &outcome.summary;

    println!();
    println!("Scan {}", if s.completed { "complete" } else { "INCOMPLETE" });
    println!("  Directories: {}", s.dirs);
    println!("  Files:       {}", s.files);
    println!("  Data:        {}", format_size(s.bytes, BINARY));
    println!("  Rows:        {}", s.rows_written);
    println!("  Duration:    {:.2}s", s.duration.as_secs_f64());
    println!("  Errors:      {}", outcome.errors.len());
    println!("  Report:      {}", outcome.output_path.display());

    if !outcome.errors.is_empty() {
        println!();
        println!("First errors:");
        for err in outcome.errors.iter().take(10) {
            println!("  {}", err);
        }
        if outcome.errors.len() > 10 {
            println!("  ... and {} more", outcome.errors.len() - 10);
        }
    }
}
