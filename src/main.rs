use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod compare;
mod config;
mod errors;
mod fetch;
mod filter;
mod metrics;
mod models;
mod period;
mod pulse;
mod report;
mod snapshot;

use config::Config;
use fetch::PeriodDataFetcher;
use period::Period;

#[derive(Parser)]
#[command(name = "pipeline-pulse")]
#[command(about = "CRM pipeline KPIs for named reporting periods", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the KPI report for a reporting period
    Report {
        #[arg(long, value_enum, default_value_t = Period::Today)]
        period: Period,
        /// Write the report to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the resolved UTC window of every reporting period
    Windows,
    /// Fire the AI refresh trigger and drop the in-process result cache
    Refresh,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

fn build_fetcher() -> anyhow::Result<PeriodDataFetcher> {
    let config = Config::from_env().context("dashboard configuration incomplete")?;
    tracing::debug!(store = %config.supabase_url, api = %config.api_base, "configured");
    Ok(PeriodDataFetcher::new(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Report { period, out } => {
            let fetcher = build_fetcher()?;
            let pulse = pulse::period_pulse(&fetcher, period).await?;
            let report = report::build_report(&pulse, Utc::now());
            match out {
                Some(path) => {
                    std::fs::write(&path, report)?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{report}"),
            }
        }
        Commands::Windows => {
            let now = Utc::now();
            println!("Reporting windows at {} (UTC):", now.format("%Y-%m-%dT%H:%M:%SZ"));
            for period in Period::all() {
                let window = period::resolve(period, now);
                let start = window
                    .start
                    .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                    .unwrap_or_else(|| "unbounded".to_string());
                let end = window
                    .end
                    .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                    .unwrap_or_else(|| "now".to_string());
                println!("- {period}: [{start}, {end})");
            }
        }
        Commands::Refresh => {
            let fetcher = build_fetcher()?;
            fetcher.trigger_refresh().await;
            fetcher.clear_cache().await;
            println!("Refresh trigger sent; result cache cleared.");
        }
    }

    Ok(())
}
