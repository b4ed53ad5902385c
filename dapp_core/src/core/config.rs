use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::connectors::{Connector, ConnectorError};

/// Builds a fresh connector for every activation; connectors are never
/// reused across activate/deactivate cycles.
pub type ConnectorFactory = Arc<dyn Fn() -> Box<dyn Connector> + Send + Sync>;

/// Connector tags (e.g. `"metamask"`) mapped to the factory for that wallet.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    factories: HashMap<String, ConnectorFactory>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connector under `tag`. Tags are unique.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F) -> Result<(), ConnectorError>
    where
        F: Fn() -> Box<dyn Connector> + Send + Sync + 'static,
    {
        let tag = tag.into();
        if self.factories.contains_key(&tag) {
            return Err(ConnectorError::DuplicateTag(tag));
        }
        self.factories.insert(tag, Arc::new(factory));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, tag: impl Into<String>, factory: F) -> Result<Self, ConnectorError>
    where
        F: Fn() -> Box<dyn Connector> + Send + Sync + 'static,
    {
        self.register(tag, factory)?;
        Ok(self)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Build the connector configured under `tag`.
    pub fn create(&self, tag: &str) -> Result<Box<dyn Connector>, ConnectorError> {
        self.factories
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| ConnectorError::NotConfigured(tag.to_string()))
    }

    /// Configured tags in sorted order.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tags()).finish()
    }
}

/// Ambient configuration consumed by the manager and its controllers.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub connectors: ConnectorRegistry,
    /// Silently reconnect the last used connector at startup.
    pub auto_connect: bool,
    /// Chain ids the application accepts. `None` accepts any chain.
    pub networks: Option<Vec<u64>>,
}

impl Config {
    pub fn new(connectors: ConnectorRegistry) -> Self {
        Self {
            connectors,
            ..Self::default()
        }
    }

    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    pub fn networks(mut self, chain_ids: Vec<u64>) -> Self {
        self.networks = Some(chain_ids);
        self
    }

    pub fn is_supported_chain(&self, chain_id: u64) -> bool {
        self.networks
            .as_ref()
            .map_or(true, |ids| ids.contains(&chain_id))
    }
}
