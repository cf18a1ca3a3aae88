//! # querybatch
//!
//! A batch execution scheduler that coalesces many individually-requested
//! lookups into a small number of grouped resolutions. It is the scheduling
//! core of a data-loading batching layer inside a request-processing
//! pipeline (e.g. resolving the fields of a query graph), where naive
//! per-field fetching would cost one round-trip per item.
//!
//! ## Overview
//!
//! Loaders accumulate pending work and register themselves with the
//! per-context [`Executor`](engine::Executor). The executor resolves them in
//! strict registration order, one `tick` at a time, driven by `wait` (until
//! a specific future settles) or `wait_all` (until the registry drains).
//! Loaders discovered mid-resolution are appended behind everything already
//! queued, preserving FIFO fairness across waves of dependent loads.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use querybatch::engine::Executor;
//! use querybatch::loader::{Loader, LoaderKey};
//! use querybatch::promise::Promise;
//! use querybatch::Result;
//!
//! struct UserLoader {
//!     output: Promise<Vec<String>>,
//! }
//!
//! impl Loader for UserLoader {
//!     fn key(&self) -> LoaderKey {
//!         LoaderKey::of::<UserLoader>()
//!     }
//!
//!     fn resolve(&self, _executor: &Executor) -> Result<()> {
//!         // One grouped fetch for every user requested this wave.
//!         self.output.fulfill(vec!["ada".to_string(), "grace".to_string()]);
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> querybatch::Result<()> {
//! let executor = Executor::current();
//! let output = Promise::new();
//! executor.register(Rc::new(UserLoader { output: output.clone() }));
//!
//! executor.wait(&output)?;
//! assert_eq!(output.value().map(|users| users.len()), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the executor, per-context singleton, and metrics
//! - [`loader`]: the loader contract and identity keys
//! - [`promise`]: the future contract and a minimal settle-once promise

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use thiserror::Error;

/// Result type for querybatch operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for querybatch operations
#[derive(Error, Debug, Clone)]
pub enum BatchError {
    /// A future was still pending after every queued loader ran to
    /// completion: no registered loader was responsible for settling it.
    /// This is a loader bug surfaced as a rejection, not routine control
    /// flow.
    #[error("Broken future: {0}")]
    BrokenFuture(String),

    /// Loader resolution failure
    #[error("Loader error: {0}")]
    Loader(#[from] loader::LoaderError),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Batch execution engine
pub mod engine;

/// Loader contract and identity keys
pub mod loader;

/// Future contract and the settle-once promise
pub mod promise;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_error_converts_to_batch_error() {
        let error: BatchError = loader::LoaderError::Failed("shard down".to_string()).into();
        assert!(matches!(error, BatchError::Loader(_)));
        assert!(error.to_string().contains("shard down"));
    }

    #[test]
    fn test_broken_future_message() {
        let error = BatchError::BrokenFuture("never fulfilled".to_string());
        assert_eq!(error.to_string(), "Broken future: never fulfilled");
    }
}
