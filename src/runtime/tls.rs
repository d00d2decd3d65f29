//! Thread local storage of the goroutine running on each thread.
//!
//! Threads that weren't started by the pool (main, test harness) are adopted
//! as goroutines the first time they need one.

use std::cell::RefCell;
use std::sync::Arc;

use super::goroutine::Goroutine;
use super::rand::FastRand;

/// Cache padded against false sharing.
#[repr(align(128))]
struct Current(RefCell<Option<Running>>);

struct Running {
    goroutine: Arc<Goroutine>,
    rand: FastRand,
}

impl Running {
    fn new(goroutine: Arc<Goroutine>) -> Self {
        // reseeded only here, once per goroutine
        Running {
            goroutine,
            rand: FastRand::new(),
        }
    }
}

thread_local! {
    static CURRENT: Current = const { Current(RefCell::new(None)) };
}

/// Runs `f` as `goroutine` on this thread, restoring whatever ran before.
pub(super) fn enter<T>(goroutine: Arc<Goroutine>, f: impl FnOnce() -> T) -> T {
    struct Restore(Option<Running>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CURRENT.with(|current| *current.0.borrow_mut() = previous);
        }
    }

    let previous = CURRENT.with(|current| current.0.borrow_mut().replace(Running::new(goroutine)));
    let _restore = Restore(previous);

    f()
}

fn with_running<T>(f: impl FnOnce(&mut Running) -> T) -> T {
    CURRENT.with(|current| {
        let mut cell = current.0.borrow_mut();
        let running = cell.get_or_insert_with(|| {
            let goroutine = Arc::new(Goroutine::new());
            tracing::debug!(goroutine = goroutine.id(), "adopted thread");
            Running::new(goroutine)
        });
        f(running)
    })
}

/// The goroutine running on this thread.
pub(crate) fn current() -> Arc<Goroutine> {
    with_running(|running| running.goroutine.clone())
}

/// Borrow the running goroutine's private PRNG.
pub(crate) fn with_rand<T>(f: impl FnOnce(&mut FastRand) -> T) -> T {
    with_running(|running| f(&mut running.rand))
}
