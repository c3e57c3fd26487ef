//! Shared application state for the gateway server.

use crate::config::InvokeConfig;
use fcore::{Registry, Route, Transport};
use std::sync::Arc;

/// Shared state available to all request handlers.
pub struct Gateway {
    /// Registered routes (immutable after startup).
    pub registry: Arc<Registry>,
    /// Invocation settings.
    pub invoke: Arc<InvokeConfig>,
}

impl Gateway {
    /// Build the state from a finished registry.
    pub fn new(registry: Registry, invoke: InvokeConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            invoke: Arc::new(invoke),
        }
    }

    /// The route `name` if it is served over `transport`.
    pub fn route(&self, name: &str, transport: Transport) -> Option<Route> {
        self.registry
            .get(name)
            .filter(|route| route.transport() == transport)
            .cloned()
    }
}

impl Clone for Gateway {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            invoke: Arc::clone(&self.invoke),
        }
    }
}
