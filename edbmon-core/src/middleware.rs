//! Middleware trait for wrapping `TelemetrySource` implementations.

use std::sync::Arc;

use crate::source::TelemetrySource;

/// Trait implemented by source middleware layers.
///
/// A middleware consumes an inner `TelemetrySource` and returns a wrapped source
/// that augments its behavior (e.g. timeouts and retries).
pub trait Middleware: Send + Sync {
    /// Apply this middleware to wrap an inner source and return the wrapped source.
    fn apply(self: Box<Self>, inner: Arc<dyn TelemetrySource>) -> Arc<dyn TelemetrySource>;

    /// Human-readable middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}
