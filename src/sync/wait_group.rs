//! Waits for a number of goroutines to finish.
//!
//! # Examples
//! ```
//! use gochan::go;
//! use gochan::sync::WaitGroup;
//!
//! let wait_group = WaitGroup::new(3);
//!
//! for _ in 0..3 {
//!     let wait_group = wait_group.clone();
//!     go(move || wait_group.done());
//! }
//!
//! wait_group.wait();
//! ```

use std::sync::Arc;

use crate::runtime::semaphore::Semaphore;

/// Counter of outstanding work, shared by cloning.
#[derive(Debug, Clone)]
pub struct WaitGroup {
    semaphore: Arc<Semaphore>,
}

impl WaitGroup {
    /// Expects `count` calls to [WaitGroup::done].
    pub fn new(count: usize) -> Self {
        WaitGroup {
            semaphore: Arc::new(Semaphore::new(1 - to_permits(count))),
        }
    }

    /// Expects `count` more calls to [WaitGroup::done].
    pub fn add(&self, count: usize) {
        self.semaphore.forfeit(to_permits(count));
    }

    /// Marks one unit of work as finished.
    pub fn done(&self) {
        self.semaphore.release();
    }

    /// Blocks until every expected [WaitGroup::done] has happened.
    pub fn wait(&self) {
        self.semaphore.acquire();
        // let other waiters through too
        self.semaphore.release();
    }
}

fn to_permits(count: usize) -> isize {
    match isize::try_from(count) {
        Ok(permits) => permits,
        Err(_) => panic!("wait group count {count} is too large"),
    }
}
