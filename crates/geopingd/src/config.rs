//! Daemon configuration from environment variables

use anyhow::{Context, Result};
use geoping_core::{GeopingConfig, SchemaVariant};
use std::path::PathBuf;
use std::str::FromStr;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub geoping: GeopingConfig,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, unset variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut geoping = GeopingConfig::new();

        if let Some(path) = lookup("GEOPING_INVENTORY_PATH") {
            geoping.inventory.path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("GEOPING_LISTEN_ADDR") {
            geoping.query.listen_addr = addr;
        }
        if let Some(endpoint) = lookup("GEOPING_QUERY_PATH") {
            geoping.query.endpoint = endpoint;
        }
        if let Some(identity) = lookup("GEOPING_ADMIN_IDENTITY") {
            geoping.query.admin_identity = identity;
        }
        if let Some(ms) = parse(&lookup, "GEOPING_PROBE_TIMEOUT_MS")? {
            geoping.probe.timeout_ms = ms;
        }
        if let Some(secs) = parse(&lookup, "GEOPING_REFRESH_INTERVAL_SECS")? {
            geoping.refresh.interval_secs = secs;
        }
        if let Some(n) = parse(&lookup, "GEOPING_PROBE_CONCURRENCY")? {
            geoping.refresh.probe_concurrency = n;
        }
        if let Some(n) = parse(&lookup, "GEOPING_MAX_STORE_FAILURES")? {
            geoping.refresh.max_consecutive_store_failures = n;
        }
        if let Some(schema) = lookup("GEOPING_SCHEMA") {
            geoping.schema = SchemaVariant::from_str(&schema)?;
        }

        Ok(Self {
            geoping,
            log_level: lookup("GEOPING_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.geoping.validate()?;

        if let Some(parent) = self.geoping.inventory.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "GEOPING_INVENTORY_PATH parent directory does not exist: {}",
                parent.display()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "GEOPING_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("{} = '{}'", key, raw)))
        .transpose()
}
