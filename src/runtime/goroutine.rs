//! State of a goroutine that other goroutines need to reach.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::semaphore::Semaphore;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const UNCLAIMED: usize = usize::MAX;

/// Shared half of a goroutine.
///
/// The owning thread suspends on it, partners claim and resume it.
/// The private half (fairness PRNG) lives in [super::tls].
#[derive(Debug)]
pub(crate) struct Goroutine {
    id: u64,
    parker: Semaphore,
    /// Index of the case (or plain operation) that won the current park.
    claim: AtomicUsize,
    cancelled: AtomicBool,
    /// Sleepers wait on this, cancellation is the only thing that signals it.
    cancel_signal: (Mutex<()>, Condvar),
}

impl Goroutine {
    pub(crate) fn new() -> Self {
        Goroutine {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            parker: Semaphore::new(0),
            claim: AtomicUsize::new(UNCLAIMED),
            cancelled: AtomicBool::new(false),
            cancel_signal: (Mutex::new(()), Condvar::new()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Blocks the calling thread until [Goroutine::resume].
    /// Only the goroutine's own thread may call this.
    pub(crate) fn suspend(&self) {
        tracing::trace!(goroutine = self.id, "suspend");
        self.parker.acquire();
        tracing::trace!(goroutine = self.id, "resumed");
    }

    /// Wakes the goroutine. Callers must have won [Goroutine::try_claim] first,
    /// so each park is resumed exactly once.
    pub(crate) fn resume(&self) {
        self.parker.release();
    }

    /// Prepares for a new park. Must happen before any wait node of the park is visible to partners.
    pub(crate) fn reset_claim(&self) {
        self.claim.store(UNCLAIMED, Ordering::Release);
    }

    /// Grants the park to `index` unless another partner got there first.
    pub(crate) fn try_claim(&self, index: usize) -> bool {
        debug_assert_ne!(index, UNCLAIMED);
        self.claim
            .compare_exchange(UNCLAIMED, index, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_claimed(&self) -> bool {
        self.claim.load(Ordering::Acquire) != UNCLAIMED
    }

    pub(crate) fn claimed(&self) -> Option<usize> {
        match self.claim.load(Ordering::Acquire) {
            UNCLAIMED => None,
            index => Some(index),
        }
    }

    pub(crate) fn cancel(&self) {
        let (lock, signal) = &self.cancel_signal;
        let _guard = lock.lock();
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!(goroutine = self.id, "cancelled");
        }
        signal.notify_all();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sleeps until `deadline` or cancellation.
    /// Returns `false` if cancelled, including when already cancelled before sleeping.
    pub(crate) fn sleep_until(&self, deadline: Instant) -> bool {
        let (lock, signal) = &self.cancel_signal;
        let mut guard = lock.lock();
        while !self.is_cancelled() {
            if signal.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }

        !self.is_cancelled()
    }
}
