//! Configuration loading from files and environment variables
//!
//! Environment variables for instances take precedence over the config file,
//! so container deployments can point the proxy at backends without editing
//! the file.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use super::defaults;
use super::types::{Config, InstanceConfig, PoolConfig, ProxyConfig};
use crate::types::{HostName, InstanceName};

/// Prefix of the indexed instance variables
const INSTANCE_ENV_PREFIX: &str = "RESP_PROXY_INSTANCE";

/// Where the active configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from an existing file
    File,
    /// File missing, instances taken from the environment
    Environment,
    /// File missing and no instance variables; a default file was written
    DefaultCreated,
}

impl ConfigSource {
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::File => "configuration file",
            Self::Environment => "environment variables",
            Self::DefaultCreated => "generated default configuration",
        }
    }
}

/// Load instances from indexed variables using `lookup` to read them
///
/// Reads `RESP_PROXY_INSTANCE_0_NAME`, `RESP_PROXY_INSTANCE_0_HOST`,
/// `RESP_PROXY_INSTANCE_0_PORT`, then index 1, and so on, stopping at the
/// first index without a `_HOST`. The name falls back to `instance-N` and the
/// port to 6379.
///
/// Returns `Ok(None)` when no instance variables are set.
pub fn load_instances_from<F>(lookup: F) -> Result<Option<Vec<InstanceConfig>>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut instances = Vec::new();

    for index in 0.. {
        let Some(host) = lookup(&format!("{INSTANCE_ENV_PREFIX}_{index}_HOST")) else {
            break;
        };

        let port_key = format!("{INSTANCE_ENV_PREFIX}_{index}_PORT");
        let port = match lookup(&port_key) {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("Invalid {port_key} '{port}'"))?,
            None => defaults::backend_port(),
        };

        let name = lookup(&format!("{INSTANCE_ENV_PREFIX}_{index}_NAME"))
            .unwrap_or_else(|| format!("instance-{index}"));

        instances.push(InstanceConfig {
            name: InstanceName::new(&name)
                .with_context(|| format!("Invalid name for instance {index}"))?,
            host: HostName::new(host)
                .with_context(|| format!("Invalid host for instance {index}"))?,
            port,
        });
    }

    if instances.is_empty() {
        Ok(None)
    } else {
        Ok(Some(instances))
    }
}

/// Load instances from the process environment
pub fn load_instances_from_env() -> Result<Option<Vec<InstanceConfig>>> {
    load_instances_from(|key| std::env::var(key).ok())
}

/// Whether any indexed instance variable is set
#[must_use]
pub fn has_instance_env_vars() -> bool {
    std::env::var(format!("{INSTANCE_ENV_PREFIX}_0_HOST")).is_ok()
}

/// Load configuration from a TOML file, with environment variable overrides
pub fn load_config(config_path: &str) -> Result<Config> {
    let config_content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file '{config_path}'"))?;

    let mut config: Config = toml::from_str(&config_content)
        .with_context(|| format!("Failed to parse config file '{config_path}'"))?;

    if let Some(env_instances) = load_instances_from_env()? {
        info!(
            count = env_instances.len(),
            "Using instances from environment variables (overriding config file)"
        );
        config.instances = env_instances;
    }

    config.validate()?;

    Ok(config)
}

/// Build a configuration from environment variables alone
pub fn load_config_from_env() -> Result<Config> {
    let instances = load_instances_from_env()?
        .context("No RESP_PROXY_INSTANCE_0_HOST set in the environment")?;

    let config = Config {
        proxy: ProxyConfig::default(),
        pool: PoolConfig::default(),
        instances,
    };
    config.validate()?;
    Ok(config)
}

/// Create the configuration written when no config file exists
#[must_use]
pub fn create_default_config() -> Config {
    Config {
        proxy: ProxyConfig::default(),
        pool: PoolConfig::default(),
        instances: vec![InstanceConfig {
            name: InstanceName::from_selection("default"),
            host: HostName::new("127.0.0.1".to_string()).expect("literal host is non-empty"),
            port: defaults::backend_port(),
        }],
    }
}

/// Load the config file, falling back to the environment, then to a default
///
/// An existing file that fails to load is an error, never silently replaced.
pub fn load_config_with_fallback(config_path: &str) -> Result<(Config, ConfigSource)> {
    if Path::new(config_path).exists() {
        return Ok((load_config(config_path)?, ConfigSource::File));
    }

    if has_instance_env_vars() {
        info!(path = config_path, "Config file not found, using environment variables");
        return Ok((load_config_from_env()?, ConfigSource::Environment));
    }

    warn!(path = config_path, "Config file not found, creating default config");
    let config = create_default_config();
    let config_toml = toml::to_string_pretty(&config).context("Failed to serialize default config")?;
    std::fs::write(config_path, config_toml)
        .with_context(|| format!("Failed to write default config file '{config_path}'"))?;
    info!(path = config_path, "Created default config file");

    Ok((config, ConfigSource::DefaultCreated))
}
