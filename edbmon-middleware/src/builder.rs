//! Builder for composing sources with middleware layers.
//!
//! Layers are stored outermost-first (last added = outermost) and applied in
//! reverse during `build()`:
//!
//! ```text
//! builder.with_layer(A).with_layer(B)
//!
//! Storage: [B, A]
//! Result:  B(A(Raw))
//! ```

use std::sync::Arc;

use edbmon_core::{Middleware, TelemetrySource};
use edbmon_types::FetchPolicy;

use crate::retry::RetryMiddleware;

/// Generic middleware builder for composing a source with layered wrappers.
pub struct SourceBuilder {
    raw: Arc<dyn TelemetrySource>,
    layers: Vec<Box<dyn Middleware>>,
}

impl SourceBuilder {
    /// Create a new builder from a raw, unwrapped source.
    #[must_use]
    pub fn new(raw: Arc<dyn TelemetrySource>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    /// Add an arbitrary middleware as the new outermost layer.
    #[must_use]
    pub fn with_layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Add or replace the retry layer.
    #[must_use]
    pub fn with_retry(mut self, policy: FetchPolicy) -> Self {
        self.layers.retain(|l| l.name() != "RetryingSource");
        self.with_layer(Box::new(RetryMiddleware::new(policy)))
    }

    /// Names of the configured layers, outermost first.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// Configuration snapshots of the layers, outermost first.
    #[must_use]
    pub fn layer_configs(&self) -> Vec<serde_json::Value> {
        self.layers.iter().map(|l| l.config_json()).collect()
    }

    /// Apply the layers and return the wrapped source.
    #[must_use]
    pub fn build(self) -> Arc<dyn TelemetrySource> {
        self.layers
            .into_iter()
            .rev()
            .fold(self.raw, |inner, layer| layer.apply(inner))
    }
}
