//! Execution context management
//!
//! Each logical execution context (a worker thread, or a cooperative task
//! given a scope) owns exactly one [`Executor`]. Contexts never share
//! scheduler state, so no locking is involved anywhere: isolation comes from
//! partitioning, not synchronization.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::Executor;

thread_local! {
    static CURRENT: RefCell<Option<Rc<Executor>>> = RefCell::new(None);
}

impl Executor {
    /// The executor bound to the calling thread, created lazily on first use.
    ///
    /// Exactly one live instance exists per thread for the thread's lifetime;
    /// it is reclaimed with the thread. Use [`ExecutorScope`] to install a
    /// specific instance for a region of code instead.
    pub fn current() -> Rc<Executor> {
        CURRENT.with(|slot| {
            let mut slot = slot.borrow_mut();
            match &*slot {
                Some(executor) => executor.clone(),
                None => {
                    let executor = Rc::new(Executor::new());
                    *slot = Some(executor.clone());
                    executor
                }
            }
        })
    }
}

/// Installs a specific executor as the thread's current instance for the
/// guard's lifetime, restoring the previous instance on drop.
///
/// This is the explicit-context alternative to the lazy thread singleton:
/// cooperative tasks multiplexed on one thread each enter their own scope
/// around their execution slice, and tests use it for isolation.
pub struct ExecutorScope {
    previous: Option<Rc<Executor>>,
}

impl ExecutorScope {
    /// Install `executor` as the current instance until the scope drops
    pub fn enter(executor: Rc<Executor>) -> Self {
        let previous = CURRENT.with(|slot| slot.borrow_mut().replace(executor));
        Self { previous }
    }
}

impl Drop for ExecutorScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}
