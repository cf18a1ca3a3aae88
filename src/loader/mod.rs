//! Loader contract
//!
//! A loader is a batchable unit of deferred work: it accumulates individual
//! lookup requests and, when resolved, performs one grouped operation that
//! fulfills every future it handed out. This module defines only the contract
//! the executor needs from a loader; how a loader groups keys or performs its
//! fetch is up to the implementation.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::engine::Executor;
use crate::Result;

/// Errors raised by loader implementations during resolution
#[derive(Error, Debug, Clone)]
pub enum LoaderError {
    /// The batched operation itself failed
    #[error("Batch load failed: {0}")]
    Failed(String),

    /// The load was abandoned before the loader could resolve it
    #[error("Load canceled")]
    Canceled,
}

/// Stable identity for a loader instance within one executor's registry.
///
/// Two loaders are the same registry entry when their keys are equal. The key
/// is the loader's type plus an optional group discriminator, so one loader
/// type can be registered multiple times for distinct configurations (e.g.
/// one per backend shard) without colliding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoaderKey {
    type_name: &'static str,
    group: Option<String>,
}

impl LoaderKey {
    /// Key for a loader type with no configuration discriminator
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            group: None,
        }
    }

    /// Key for a loader type plus a group discriminator
    pub fn with_group<T: ?Sized>(group: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            group: Some(group.into()),
        }
    }

    /// The loader's type name (also used as the metrics label)
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The group discriminator, if any
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

impl fmt::Display for LoaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}[{}]", self.type_name, group),
            None => f.write_str(self.type_name),
        }
    }
}

/// A batchable unit of deferred work.
///
/// Implementations register themselves with an [`Executor`] once they have
/// accumulated pending work, and are resolved in registration order by the
/// executor's tick loop. `resolve` receives the executor so that dependent
/// loaders discovered mid-resolution can be registered (they run in a later
/// tick) and so nested waits stay on the same scheduler.
pub trait Loader {
    /// Registry identity for this loader instance
    fn key(&self) -> LoaderKey;

    /// Perform the batched operation, fulfilling or rejecting every future
    /// this loader owns. Errors propagate unmodified out of the scheduler.
    fn resolve(&self, executor: &Executor) -> Result<()>;
}

/// Shared loader handle as stored in the executor's registry
pub type LoaderRef = Rc<dyn Loader>;

#[cfg(test)]
mod tests {
    use super::*;

    struct ShardLoader;

    #[test]
    fn test_keys_distinguish_groups() {
        let plain = LoaderKey::of::<ShardLoader>();
        let shard_a = LoaderKey::with_group::<ShardLoader>("shard-a");
        let shard_b = LoaderKey::with_group::<ShardLoader>("shard-b");

        assert_ne!(plain, shard_a);
        assert_ne!(shard_a, shard_b);
        assert_eq!(shard_a, LoaderKey::with_group::<ShardLoader>("shard-a"));
    }

    #[test]
    fn test_key_display_includes_group() {
        let key = LoaderKey::with_group::<ShardLoader>("primary");
        let rendered = key.to_string();
        assert!(rendered.contains("ShardLoader"));
        assert!(rendered.ends_with("[primary]"));

        let plain = LoaderKey::of::<ShardLoader>().to_string();
        assert!(!plain.contains('['));
    }
}
