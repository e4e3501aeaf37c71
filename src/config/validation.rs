//! Configuration validation
//!
//! Empty names and hosts are already rejected while deserializing; this
//! checks the constraints that span fields or entries.

use anyhow::{Result, bail};
use std::collections::HashSet;

use super::types::{Config, InstanceConfig};

impl Config {
    /// Validate configuration for correctness
    ///
    /// - At least one instance configured
    /// - Instance names unique (names are already case-folded)
    /// - No port is zero
    /// - Pool limits are at least one, and active covers idle
    pub fn validate(&self) -> Result<()> {
        if self.instances.is_empty() {
            bail!("Configuration must have at least one instance");
        }

        if self.proxy.port == 0 {
            bail!("Proxy listen port cannot be 0");
        }

        if self.pool.max_idle == 0 {
            bail!("pool.max_idle must be at least 1");
        }

        if self.pool.max_active < self.pool.max_idle {
            bail!(
                "pool.max_active ({}) must be at least pool.max_idle ({})",
                self.pool.max_active,
                self.pool.max_idle
            );
        }

        if self.pool.idle_timeout_secs == 0 {
            bail!("pool.idle_timeout_secs must be at least 1");
        }

        let mut seen = HashSet::with_capacity(self.instances.len());
        for instance in &self.instances {
            validate_instance(instance)?;
            if !seen.insert(&instance.name) {
                bail!("Duplicate instance name '{}'", instance.name);
            }
        }

        Ok(())
    }
}

fn validate_instance(instance: &InstanceConfig) -> Result<()> {
    if instance.port == 0 {
        bail!("Instance '{}' has invalid port 0", instance.name);
    }
    Ok(())
}
