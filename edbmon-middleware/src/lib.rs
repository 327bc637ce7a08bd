#![doc = include_str!("../README.md")]
//! edbmon-middleware
//!
//! Re-exports for the range cache and source middleware.

mod backoff;
mod builder;
mod cache;
mod retry;

pub use crate::backoff::jitter_wait;
pub use crate::builder::SourceBuilder;
pub use crate::cache::QueryCache;
pub use crate::retry::{RetryMiddleware, RetryingSource};
