//! RAII guard for cancellation-safe in-flight exchange counting.
//!
//! The count is advisory: it annotates debug logs and is never used for
//! admission control.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How an outbound exchange left the in-flight set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Final (non-redirect) response headers arrived.
    Response,
    /// Transport failure or redirect limit.
    Error,
}

/// Counts one outbound exchange for as long as it lives.
/// Decrements on drop unless `complete()` already did.
pub struct InFlightGuard {
    counter: Arc<AtomicUsize>,
    released: bool,
}

impl InFlightGuard {
    pub fn enter(counter: Arc<AtomicUsize>) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("(++req++) {}", stars(now));
        Self { counter, released: false }
    }

    pub fn complete(mut self, completion: Completion) {
        let now = decrement(&self.counter);
        self.released = true;
        match completion {
            Completion::Response => tracing::debug!("(--res--) {}", stars(now)),
            Completion::Error => tracing::debug!("(--err--) {}", stars(now)),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.released {
            decrement(&self.counter);
        }
    }
}

fn decrement(counter: &AtomicUsize) -> usize {
    match counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1)) {
        Ok(previous) => previous - 1,
        Err(current) => current,
    }
}

fn stars(n: usize) -> String {
    "*".repeat(n)
}
