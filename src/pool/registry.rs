//! Name to provider mapping shared by every session

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::connection_trait::ConnectionProvider;
use super::provider::BackendPool;
use crate::config::{InstanceConfig, PoolConfig};
use crate::error::ProxyError;
use crate::types::InstanceName;

/// Immutable map from instance name to its connection provider
///
/// Built once at startup and shared read-only through an `Arc`, so lookups
/// never take a lock.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    providers: HashMap<InstanceName, Arc<dyn ConnectionProvider>>,
}

impl InstanceRegistry {
    /// Create one lazily-dialing pool per configured instance
    ///
    /// Names are unique after validation; a later duplicate would replace an
    /// earlier entry.
    pub fn initialize(instances: &[InstanceConfig], pool: &PoolConfig) -> Result<Self> {
        let mut providers: HashMap<InstanceName, Arc<dyn ConnectionProvider>> =
            HashMap::with_capacity(instances.len());

        for instance in instances {
            let backend = BackendPool::from_instance_config(instance, pool)
                .with_context(|| format!("Failed to create pool for instance '{}'", instance.name))?;
            info!(
                instance = %instance.name,
                backend = %backend.address(),
                max_idle = pool.max_idle,
                max_active = pool.max_active,
                "Registered instance"
            );
            providers.insert(instance.name.clone(), Arc::new(backend));
        }

        Ok(Self { providers })
    }

    /// Build a registry from ready-made providers
    pub fn from_providers<I>(providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ConnectionProvider>>,
    {
        let providers = providers
            .into_iter()
            .map(|provider| (InstanceName::from_selection(provider.name()), provider))
            .collect();
        Self { providers }
    }

    /// Find the provider for a selected instance, ignoring case
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn ConnectionProvider>, ProxyError> {
        let name = InstanceName::from_selection(name);
        self.providers
            .get(&name)
            .ok_or(ProxyError::UnknownInstance(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered instance names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&InstanceName> {
        let mut names: Vec<_> = self.providers.keys().collect();
        names.sort();
        names
    }

    /// Shut down every provider
    pub async fn graceful_shutdown(&self) {
        for provider in self.providers.values() {
            provider.graceful_shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolStatus;
    use crate::protocol::Frame;
    use crate::types::HostName;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct NamedProvider(&'static str);

    #[async_trait]
    impl ConnectionProvider for NamedProvider {
        fn name(&self) -> &str {
            self.0
        }

        fn status(&self) -> PoolStatus {
            PoolStatus {
                available: 0,
                max_size: 1,
                created: 0,
            }
        }

        async fn forward(&self, _frame: &Frame) -> Result<Frame, ProxyError> {
            Ok(Frame::from(&b"+OK\r\n"[..]))
        }

        async fn graceful_shutdown(&self) {}
    }

    fn instance(name: &str, port: u16) -> InstanceConfig {
        InstanceConfig {
            name: InstanceName::new(name).unwrap(),
            host: HostName::new("127.0.0.1".to_string()).unwrap(),
            port,
        }
    }

    #[test]
    fn test_initialize_registers_every_instance() {
        let registry = InstanceRegistry::initialize(
            &[instance("Cache", 6379), instance("sessions", 6380)],
            &PoolConfig::default(),
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry
            .names()
            .into_iter()
            .map(InstanceName::as_str)
            .collect();
        assert_eq!(names, vec!["cache", "sessions"]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = InstanceRegistry::from_providers([
            Arc::new(NamedProvider("cache")) as Arc<dyn ConnectionProvider>,
        ]);

        assert_eq!(registry.lookup("CACHE").unwrap().name(), "cache");
        assert_eq!(registry.lookup("Cache").unwrap().name(), "cache");
    }

    #[test]
    fn test_lookup_unknown_instance() {
        let registry = InstanceRegistry::from_providers([
            Arc::new(NamedProvider("cache")) as Arc<dyn ConnectionProvider>,
        ]);

        let err = registry.lookup("Missing").unwrap_err();
        assert_eq!(err.to_string(), "instance 'missing' does not exist");
    }

    #[test]
    fn test_empty_registry() {
        let registry = InstanceRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.lookup("").is_err());
    }

    #[tokio::test]
    async fn test_graceful_shutdown_closes_pools() {
        let registry =
            InstanceRegistry::initialize(&[instance("cache", 6379)], &PoolConfig::default())
                .unwrap();
        registry.graceful_shutdown().await;
        assert_eq!(registry.lookup("cache").unwrap().status().created, 0);
    }
}
