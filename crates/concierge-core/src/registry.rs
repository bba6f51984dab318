//! Agent handler trait and registry

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A domain responder the router can dispatch a query to
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// One-line summary of what the handler answers
    fn description(&self) -> &str;

    /// Produce a raw text answer for the query
    async fn handle(&self, query: &str) -> Result<String>;
}

/// Name → handler map.
///
/// Populated at startup, then shared read-only (wrap it in an `Arc`).
/// Registering a name that already exists replaces the old handler: last
/// write wins, and the replaced handler is returned to the caller.
pub struct AgentRegistry {
    handlers: HashMap<String, Arc<dyn AgentHandler>>,
}

impl AgentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under `name`, returning any handler it replaced
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn AgentHandler>,
    ) -> Option<Arc<dyn AgentHandler>> {
        let name = name.into();
        let previous = self.handlers.insert(name.clone(), handler);
        if previous.is_some() {
            info!("Replacing handler already registered as '{}'", name);
        } else {
            debug!("Registering handler: {}", name);
        }
        previous
    }

    /// Get a handler by name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn AgentHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Remove a handler, returning it if it was registered
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn AgentHandler>> {
        let removed = self.handlers.remove(name);
        if removed.is_some() {
            debug!("Removed handler: {}", name);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
