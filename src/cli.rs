//! Command-line surface for async-flow.
//!
//! `probe` loads a list of targets and checks them with bounded parallelism, printing a
//! report in target order. All scheduling lives in the library; this module only parses
//! arguments, loads configuration and prints.
use crate::load_config::load_config;
use crate::map::MapOptions;
use crate::probe::{probe_all, HttpProber, ProbeReport};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for async-flow: bounded fan-out of endpoint checks.
#[derive(Parser)]
#[clap(
    name = "async-flow",
    version,
    about = "Check many endpoints with bounded parallelism, reporting in input order"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe every target listed in the given config file
    Probe {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Maximum checks in flight; overrides the config file and environment
        #[clap(long)]
        concurrency: Option<usize>,
        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Probe {
            config,
            concurrency,
            json,
        } => {
            let mut config = load_config(config)?;
            if let Some(cap) = concurrency {
                config.options = MapOptions::with_concurrency(cap);
            }
            tracing::info!(command = "probe", targets = config.targets.len(), "Starting probe run");

            let prober = Arc::new(HttpProber::new()?);
            match probe_all(prober, config.targets, config.options).await {
                Ok(report) => {
                    tracing::info!(command = "probe", healthy = report.healthy, unhealthy = report.unhealthy, "Probe run complete");
                    print_report(&report, json)
                }
                Err(e) => {
                    tracing::error!(command = "probe", error = %e, "Probe run failed");
                    eprintln!("[ERROR] Probe failed: {}", e);
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}

fn print_report(report: &ProbeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("Probe complete.");
    for outcome in &report.outcomes {
        let mark = if outcome.healthy { "ok  " } else { "FAIL" };
        println!(
            "{mark} {} {} status={} {}ms",
            outcome.name, outcome.url, outcome.status, outcome.elapsed_ms
        );
    }
    println!("healthy={} unhealthy={}", report.healthy, report.unhealthy);
    Ok(())
}
