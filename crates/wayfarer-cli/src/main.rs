mod cache_cmd;
mod config;
mod plan_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use wayfarer_core::cache::CacheConfig;
use wayfarer_core::models::{BudgetTier, TravelPreference};

use config::WayfarerConfig;

#[derive(Parser)]
#[command(name = "wayfarer", about = "Two-day trip itinerary planner")]
struct Cli {
    /// Redis URL for the shared itinerary cache (overrides WAYFARER_REDIS_URL env var)
    #[arg(long, global = true)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a wayfarer config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Plan a trip and print the itinerary as JSON
    Plan(PlanArgs),
    /// Itinerary cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Read the whole request from a TOML file instead of flags
    #[arg(long, conflicts_with_all = ["destination", "budget", "tier", "prefs", "start_date", "party_size", "requirements"])]
    pub file: Option<PathBuf>,
    /// Destination, e.g. "Paris, France"
    #[arg(long, required_unless_present = "file")]
    pub destination: Option<String>,
    /// Total budget for the party
    #[arg(long, required_unless_present = "file")]
    pub budget: Option<f64>,
    /// Spending tier: economy, standard or premium
    #[arg(long, required_unless_present = "file")]
    pub tier: Option<BudgetTier>,
    /// Comma-separated preferences (adventure, culture, relaxation, food, nightlife, family)
    #[arg(long, value_delimiter = ',')]
    pub prefs: Vec<TravelPreference>,
    /// First day of the trip (YYYY-MM-DD)
    #[arg(long, required_unless_present = "file")]
    pub start_date: Option<NaiveDate>,
    /// Number of travellers
    #[arg(long, default_value_t = 1)]
    pub party_size: u32,
    /// Free-form requirements passed to the planners
    #[arg(long)]
    pub requirements: Option<String>,
    /// Ignore any cached itinerary and plan afresh
    #[arg(long)]
    pub refresh: bool,
    /// Print single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Drop entries whose key contains PATTERN (or matches it, if it is a glob)
    Invalidate {
        /// Substring, or glob when it contains `*`, `?` or `[`
        pattern: String,
    },
    /// Drop every entry
    Clear,
    /// Report the backend in use and how many entries it holds
    Stats,
    /// Print the itinerary cached under FINGERPRINT
    Show {
        /// Cache key, e.g. "itinerary:paris, france:500.00:standard:2024-06-15:2"
        fingerprint: String,
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
}

/// Execute the `wayfarer init` command: write config file.
fn cmd_init(redis_url: Option<&str>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        cache: config::CacheSection {
            redis_url: redis_url.map(str::to_owned),
            ttl_secs: Some(CacheConfig::DEFAULT_TTL_SECS),
        },
        ..Default::default()
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    match redis_url {
        Some(url) => println!("  cache.redis_url = {url}"),
        None => println!("  cache: in-process (no Redis URL)"),
    }
    println!("  cache.ttl_secs = {}", CacheConfig::DEFAULT_TTL_SECS);
    println!();
    println!("Next: add provider keys under [gateway] and [generator], then run `wayfarer plan`.");

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { force } => cmd_init(cli.redis_url.as_deref(), force),
        Commands::Plan(args) => {
            let resolved = WayfarerConfig::resolve(cli.redis_url.as_deref())?;
            plan_cmd::run_plan(&args, &resolved).await
        }
        Commands::Cache { command } => {
            let resolved = WayfarerConfig::resolve(cli.redis_url.as_deref())?;
            cache_cmd::run_cache_command(command, &resolved).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout carries only the itinerary JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
