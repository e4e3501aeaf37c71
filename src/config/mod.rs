//! Configuration module
//!
//! Typed configuration, its defaults, loading from TOML and the environment,
//! and validation.

mod defaults;
mod loading;
mod types;
mod validation;

pub use loading::{
    ConfigSource, create_default_config, has_instance_env_vars, load_config,
    load_config_from_env, load_config_with_fallback, load_instances_from,
    load_instances_from_env,
};
pub use types::{Config, InstanceConfig, PoolConfig, ProxyConfig};
