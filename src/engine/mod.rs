//! Batch execution engine
//!
//! This module provides the scheduling core: the per-context [`Executor`]
//! with its FIFO loader registry and tick loop, the thread-bound current
//! instance with scoped overrides, and scheduler metrics.

pub mod context;
pub mod executor;
pub mod metrics;

pub use context::ExecutorScope;
pub use executor::Executor;
