//! Batch executor implementation

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::{debug, trace, warn};

use crate::engine::metrics;
use crate::loader::{Loader, LoaderKey, LoaderRef};
use crate::promise::BatchFuture;
use crate::{BatchError, Result};

/// The batch execution scheduler for one execution context.
///
/// Owns the insertion-ordered registry of pending loaders and the loading
/// flag, and drives resolution one tick at a time. A single instance serves
/// one logical request or task; instances are never shared across threads
/// (see [`Executor::current`] for the per-thread singleton).
///
/// Interior mutability is deliberate: loaders receive `&Executor` during
/// resolution and may register further loaders or reenter `wait`, so every
/// operation takes `&self` and no registry borrow is held across a
/// `resolve` call.
pub struct Executor {
    /// Resolution order, front-popped only
    queue: RefCell<VecDeque<LoaderKey>>,

    /// Registered loaders by identity, keys unique
    loaders: RefCell<HashMap<LoaderKey, LoaderRef>>,

    /// True only while a loader's `resolve` runs via `tick`
    loading: Cell<bool>,
}

impl Executor {
    /// Create an executor with an empty registry
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            loaders: RefCell::new(HashMap::new()),
            loading: Cell::new(false),
        }
    }

    /// Append a loader to the registry, keyed by its identity.
    ///
    /// Idempotent: if a loader with the same key is already registered, the
    /// existing instance is returned and its queue position is unchanged.
    pub fn register(&self, loader: LoaderRef) -> LoaderRef {
        let key = loader.key();
        let mut loaders = self.loaders.borrow_mut();
        if let Some(existing) = loaders.get(&key) {
            trace!(%key, "loader already registered");
            return existing.clone();
        }

        debug!(%key, "registering loader");
        loaders.insert(key.clone(), loader.clone());
        self.queue.borrow_mut().push_back(key.clone());
        metrics::record_registration(&key);
        metrics::set_registry_depth(loaders.len());
        loader
    }

    /// Look up a registered loader by identity without mutating the registry
    pub fn get(&self, key: &LoaderKey) -> Option<LoaderRef> {
        self.loaders.borrow().get(key).cloned()
    }

    /// Number of loaders currently queued for resolution
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// True when no loaders are queued
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// True while a loader's `resolve` is running via [`tick`](Self::tick).
    ///
    /// Instrumentation reads this to tell batched resolution apart from
    /// incidental unbatched work, e.g. to flag suspicious per-item fetches.
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Remove and return the earliest-registered loader, or `None` when the
    /// registry is empty.
    pub fn shift(&self) -> Option<(LoaderKey, LoaderRef)> {
        let key = self.queue.borrow_mut().pop_front()?;
        let loader = self.loaders.borrow_mut().remove(&key)?;
        metrics::set_registry_depth(self.loaders.borrow().len());
        Some((key, loader))
    }

    /// Perform one resolution step: pop the earliest loader and resolve it,
    /// with the loading flag raised for the duration.
    ///
    /// The flag is restored to its prior value (not unconditionally false),
    /// so ticks nested inside another loader's resolution observe and restore
    /// their own level correctly. An empty registry makes `tick` a no-op.
    /// Loader errors propagate unmodified.
    pub fn tick(&self) -> Result<()> {
        let _guard = LoadingGuard::set(&self.loading, true);
        match self.shift() {
            Some((key, loader)) => {
                trace!(%key, "resolving loader");
                metrics::record_tick();
                loader.resolve(self)
            }
            None => Ok(()),
        }
    }

    /// Drive the scheduler until `future` settles or no work remains.
    ///
    /// Ticks while the future is pending and the registry is non-empty. If
    /// the registry drains with the future still pending, no registered
    /// loader was responsible for it — a loader bug — and the future is
    /// rejected with [`BatchError::BrokenFuture`]. `wait` itself still
    /// returns `Ok(())` in that case; the rejection belongs to the future's
    /// consumer. Loader errors propagate.
    pub fn wait(&self, future: &dyn BatchFuture) -> Result<()> {
        while future.is_pending() && !self.is_empty() {
            self.tick()?;
        }
        if future.is_pending() {
            warn!("registry drained with the awaited future still pending");
            metrics::record_broken_future();
            future.reject(BatchError::BrokenFuture(
                "future was never fulfilled after all pending loaders resolved".to_string(),
            ));
        }
        Ok(())
    }

    /// Drain the registry unconditionally, resolving every queued loader in
    /// FIFO order. Used when no single future is awaited but all pending
    /// batched work must complete, e.g. an end-of-request flush.
    pub fn wait_all(&self) -> Result<()> {
        while !self.is_empty() {
            self.tick()?;
        }
        Ok(())
    }

    /// Empty the registry without resolving anything.
    ///
    /// Futures the discarded loaders would have fulfilled remain pending
    /// forever; callers must not depend on them after `clear`. Used to
    /// discard stale state between isolated executions sharing a context.
    pub fn clear(&self) {
        let discarded = self.queue.borrow().len();
        self.queue.borrow_mut().clear();
        self.loaders.borrow_mut().clear();
        metrics::set_registry_depth(0);
        if discarded > 0 {
            debug!(discarded, "cleared pending loaders without resolving");
        }
    }

    /// Run `f` with the loading flag forced false, restoring the prior value
    /// on every exit path, including unwinding.
    ///
    /// Work performed from inside a loader's `resolve` is conceptually
    /// "loading", but ad hoc unbatched operations issued there should not be
    /// reported as part of a batch. `defer` lets that nested work read as
    /// ordinary unbatched activity for instrumentation.
    pub fn defer<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = LoadingGuard::set(&self.loading, false);
        f()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("pending", &self.len())
            .field("loading", &self.loading.get())
            .finish()
    }
}

/// Save/restore guard for the loading flag. Restoring on drop keeps the flag
/// correct across nested ticks, `defer` blocks, and unwinding.
struct LoadingGuard<'a> {
    flag: &'a Cell<bool>,
    prior: bool,
}

impl<'a> LoadingGuard<'a> {
    fn set(flag: &'a Cell<bool>, value: bool) -> Self {
        let prior = flag.replace(value);
        Self { flag, prior }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prior);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    use super::*;
    use crate::promise::Promise;

    struct NamedLoader {
        name: String,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Loader for NamedLoader {
        fn key(&self) -> LoaderKey {
            LoaderKey::with_group::<NamedLoader>(self.name.clone())
        }

        fn resolve(&self, _executor: &Executor) -> Result<()> {
            self.log.borrow_mut().push(self.name.clone());
            Ok(())
        }
    }

    fn named(name: &str, log: &Rc<RefCell<Vec<String>>>) -> LoaderRef {
        Rc::new(NamedLoader {
            name: name.to_string(),
            log: log.clone(),
        })
    }

    #[test]
    fn test_new_executor_is_idle() {
        let executor = Executor::new();
        assert!(executor.is_empty());
        assert_eq!(executor.len(), 0);
        assert!(!executor.is_loading());
    }

    #[test]
    fn test_tick_on_empty_registry_is_noop() {
        let executor = Executor::new();
        executor.tick().expect("empty tick should succeed");
        assert!(executor.is_empty());
        assert!(!executor.is_loading());
    }

    #[test]
    fn test_shift_pops_in_registration_order() {
        let executor = Executor::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        executor.register(named("a", &log));
        executor.register(named("b", &log));

        let (first, _) = executor.shift().expect("registry should be non-empty");
        assert_eq!(first.group(), Some("a"));
        let (second, _) = executor.shift().expect("registry should be non-empty");
        assert_eq!(second.group(), Some("b"));
        assert!(executor.shift().is_none());
    }

    #[test]
    fn test_defer_restores_flag_on_panic() {
        let executor = Executor::new();
        executor.loading.set(true);

        let result = catch_unwind(AssertUnwindSafe(|| {
            executor.defer(|| {
                assert!(!executor.is_loading());
                panic!("inner work failed");
            })
        }));

        assert!(result.is_err());
        assert!(executor.is_loading());
    }

    #[test]
    fn test_wait_on_settled_future_ticks_nothing() {
        let executor = Executor::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        executor.register(named("queued", &log));

        let settled = Promise::new();
        settled.fulfill(());
        executor.wait(&settled).expect("wait should succeed");

        // Loop condition failed immediately; the queued loader never ran.
        assert_eq!(executor.len(), 1);
        assert!(log.borrow().is_empty());
    }
}
