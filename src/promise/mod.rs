//! Futures as seen by the scheduler
//!
//! The executor only ever needs two things from a future: whether it is still
//! pending, and a way to reject it when the registry drains without anyone
//! fulfilling it. [`BatchFuture`] captures that contract. [`Promise`] is the
//! minimal settle-once implementation shipped with the crate; hosts with
//! their own future type implement [`BatchFuture`] for it instead.

use std::cell::RefCell;
use std::rc::Rc;

use crate::BatchError;

/// The scheduler-side contract of a future.
///
/// Fulfillment is never performed by the executor; only loaders fulfill, as a
/// side effect of [`Loader::resolve`](crate::loader::Loader::resolve). The
/// executor calls `reject` in exactly one situation: the registry drained
/// while this future was still pending.
pub trait BatchFuture {
    /// True while the future has neither been fulfilled nor rejected
    fn is_pending(&self) -> bool;

    /// Reject the future. Must be a no-op if the future is already settled.
    fn reject(&self, error: BatchError);
}

#[derive(Debug)]
enum PromiseState<T> {
    Pending,
    Fulfilled(T),
    Rejected(BatchError),
}

/// A handle to a value that is initially pending and later fulfilled or
/// rejected exactly once.
///
/// Clones share state, so a loader can keep one handle and give another to
/// the caller awaiting the value. The first settlement wins; later `fulfill`
/// or `reject` calls are ignored and report `false`.
#[derive(Debug)]
pub struct Promise<T> {
    state: Rc<RefCell<PromiseState<T>>>,
}

impl<T> Promise<T> {
    /// Create a pending promise
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PromiseState::Pending)),
        }
    }

    /// Fulfill the promise. Returns false if it was already settled.
    pub fn fulfill(&self, value: T) -> bool {
        let mut state = self.state.borrow_mut();
        match *state {
            PromiseState::Pending => {
                *state = PromiseState::Fulfilled(value);
                true
            }
            _ => false,
        }
    }

    /// Reject the promise. Returns false if it was already settled.
    pub fn reject(&self, error: BatchError) -> bool {
        let mut state = self.state.borrow_mut();
        match *state {
            PromiseState::Pending => {
                *state = PromiseState::Rejected(error);
                true
            }
            _ => false,
        }
    }

    /// True while the promise has neither been fulfilled nor rejected
    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Pending)
    }

    /// True once the promise has been fulfilled
    pub fn is_fulfilled(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Fulfilled(_))
    }

    /// True once the promise has been rejected
    pub fn is_rejected(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Rejected(_))
    }

    /// The rejection error, if the promise was rejected
    pub fn error(&self) -> Option<BatchError> {
        match &*self.state.borrow() {
            PromiseState::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Promise<T> {
    /// The fulfilled value, if the promise was fulfilled
    pub fn value(&self) -> Option<T> {
        match &*self.state.borrow() {
            PromiseState::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BatchFuture for Promise<T> {
    fn is_pending(&self) -> bool {
        Promise::is_pending(self)
    }

    fn reject(&self, error: BatchError) {
        Promise::reject(self, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promise_starts_pending() {
        let promise: Promise<u32> = Promise::new();
        assert!(promise.is_pending());
        assert!(!promise.is_fulfilled());
        assert!(!promise.is_rejected());
        assert_eq!(promise.value(), None);
    }

    #[test]
    fn test_first_settlement_wins() {
        let promise = Promise::new();
        assert!(promise.fulfill(7));
        assert!(!promise.fulfill(9));
        assert!(!promise.reject(BatchError::Internal("late".to_string())));

        assert_eq!(promise.value(), Some(7));
        assert!(promise.error().is_none());
    }

    #[test]
    fn test_rejection_is_readable() {
        let promise: Promise<()> = Promise::new();
        assert!(promise.reject(BatchError::Internal("boom".to_string())));
        assert!(promise.is_rejected());
        assert!(matches!(promise.error(), Some(BatchError::Internal(_))));
    }

    #[test]
    fn test_clones_share_state() {
        let promise = Promise::new();
        let other = promise.clone();
        promise.fulfill("shared");
        assert!(!other.is_pending());
        assert_eq!(other.value(), Some("shared"));
    }
}
