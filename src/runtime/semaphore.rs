//! Counting semaphore, the primitive goroutines suspend on.
//!
//! A release that happens before the matching acquire is remembered,
//! so a partner may resume a goroutine that hasn't finished parking yet.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
pub(crate) struct Semaphore {
    permits: Mutex<isize>,
    available: Condvar,
}

impl Semaphore {
    /// Negative permits require that many extra releases before an acquire succeeds.
    pub(crate) fn new(permits: isize) -> Self {
        Semaphore {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Blocks the calling thread until a permit is available, then takes it.
    pub(crate) fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits <= 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    pub(crate) fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        if *permits > 0 {
            self.available.notify_one();
        }
    }

    /// Removes permits without blocking, may go negative.
    pub(crate) fn forfeit(&self, permits: isize) {
        *self.permits.lock() -= permits;
    }
}
