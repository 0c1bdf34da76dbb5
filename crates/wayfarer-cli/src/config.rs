//! Configuration file management for wayfarer.
//!
//! Provides a TOML-based config file at `~/.config/wayfarer/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use wayfarer_core::cache::CacheConfig;
use wayfarer_core::gateway::GatewayConfig;
use wayfarer_core::generator::GeneratorConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub generator: GeneratorSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GatewaySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openweather_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_places_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the wayfarer config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/wayfarer` or
/// `~/.config/wayfarer`, never the platform-specific `dirs::config_dir()`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("wayfarer");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("wayfarer")
}

/// Return the path to the wayfarer config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the empty config.
/// A file that exists and fails to parse is still an error.
pub fn load_config_if_present() -> Result<ConfigFile> {
    if config_path().exists() {
        load_config()
    } else {
        Ok(ConfigFile::default())
    }
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // API keys live here: owner read/write only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct WayfarerConfig {
    pub cache: CacheConfig,
    pub gateway: GatewayConfig,
    pub generator: GeneratorConfig,
}

impl WayfarerConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Redis URL: `cli_redis_url` > `WAYFARER_REDIS_URL` > `cache.redis_url` > none (in-process cache)
    /// - Cache TTL: `WAYFARER_CACHE_TTL_SECS` > `cache.ttl_secs` > one hour
    /// - Provider keys: their env vars > `[gateway]` / `[generator]` > none
    /// - Gateway timeout: `WAYFARER_GATEWAY_TIMEOUT_SECS` > `gateway.timeout_secs` > 10s
    /// - Model: `WAYFARER_MODEL` > `generator.model` > `gpt-4`
    pub fn resolve(cli_redis_url: Option<&str>) -> Result<Self> {
        let file = load_config_if_present()?;

        // Cache.
        let redis_url = match cli_redis_url {
            Some(url) => Some(url.to_owned()),
            None => env_value("WAYFARER_REDIS_URL").or(file.cache.redis_url),
        };
        let ttl_secs = secs_value(
            "WAYFARER_CACHE_TTL_SECS",
            file.cache.ttl_secs,
            CacheConfig::DEFAULT_TTL_SECS,
        )?;
        let cache = CacheConfig {
            redis_url,
            ttl: Duration::from_secs(ttl_secs),
        };

        // Gateway. Base URLs are env-only.
        let mut gateway = GatewayConfig::from_env();
        gateway.openweather_api_key = gateway
            .openweather_api_key
            .or(file.gateway.openweather_api_key);
        gateway.google_places_api_key = gateway
            .google_places_api_key
            .or(file.gateway.google_places_api_key);
        gateway.google_maps_api_key = gateway
            .google_maps_api_key
            .or(file.gateway.google_maps_api_key);
        gateway.timeout = Duration::from_secs(secs_value(
            "WAYFARER_GATEWAY_TIMEOUT_SECS",
            file.gateway.timeout_secs,
            GatewayConfig::DEFAULT_TIMEOUT_SECS,
        )?);

        // Generator.
        let mut generator = GeneratorConfig::from_env();
        generator.api_key = generator.api_key.or(file.generator.api_key);
        if env_value("WAYFARER_MODEL").is_none() {
            if let Some(model) = file.generator.model {
                generator.model = model;
            }
        }
        if env_value("OPENAI_BASE_URL").is_none() {
            if let Some(base_url) = file.generator.base_url {
                generator.base_url = base_url;
            }
        }

        Ok(Self {
            cache,
            gateway,
            generator,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// A seconds value from `env`, else `file`, else `default`. A set but
/// unparseable env var is an error rather than silently ignored.
fn secs_value(env: &str, file: Option<u64>, default: u64) -> Result<u64> {
    match env_value(env) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{env} must be a whole number of seconds, got {raw:?}")),
        None => Ok(file.unwrap_or(default)),
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
