//! Handlers for `wayfarer cache` subcommands.
//!
//! Implements:
//! - `wayfarer cache invalidate <pattern>` -- drop entries by substring or glob
//! - `wayfarer cache clear`                -- drop every entry
//! - `wayfarer cache stats`                -- backend and entry count
//! - `wayfarer cache show <fingerprint>`   -- print one cached itinerary

use anyhow::{Context, Result, bail};

use wayfarer_core::cache::{Cache, CacheStats};
use wayfarer_core::models::Itinerary;

use crate::CacheCommands;
use crate::config::WayfarerConfig;

/// Dispatch a `CacheCommands` variant to the appropriate handler.
pub async fn run_cache_command(command: CacheCommands, config: &WayfarerConfig) -> Result<()> {
    let cache = Cache::connect(&config.cache).await;
    if config.cache.redis_url.is_none() {
        eprintln!("note: no Redis URL configured; only this process's empty cache is affected");
    }
    run_with(&cache, command).await
}

async fn run_with(cache: &Cache, command: CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Invalidate { pattern } => {
            if !cache.invalidate(&pattern).await {
                bail!(
                    "failed to invalidate entries matching {pattern:?} in the {} cache",
                    cache.backend_name()
                );
            }
            println!("Invalidated entries matching {pattern:?}.");
        }
        CacheCommands::Clear => {
            if !cache.clear().await {
                bail!("failed to clear the {} cache", cache.backend_name());
            }
            println!("Cache cleared.");
        }
        CacheCommands::Stats => {
            let Some(stats) = cache.stats().await else {
                bail!("the {} cache did not report its size", cache.backend_name());
            };
            println!("{}", format_stats(&stats));
        }
        CacheCommands::Show {
            fingerprint,
            compact,
        } => {
            let itinerary = lookup(cache, &fingerprint).await?;
            let json = if compact {
                serde_json::to_string(&itinerary)
            } else {
                serde_json::to_string_pretty(&itinerary)
            }
            .context("failed to serialize itinerary")?;
            println!("{json}");
        }
    }
    Ok(())
}

async fn lookup(cache: &Cache, fingerprint: &str) -> Result<Itinerary> {
    cache
        .get_json::<Itinerary>(fingerprint)
        .await
        .with_context(|| format!("no cached itinerary under {fingerprint:?}"))
}

fn format_stats(stats: &CacheStats) -> String {
    format!(
        "backend:     {}\nentries:     {}\ndefault ttl: {}s",
        stats.backend, stats.entries, stats.default_ttl_secs
    )
}
