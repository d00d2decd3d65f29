//! Goroutines: logical threads that communicate over channels.
//!
//! Each goroutine runs on a worker thread of an elastic pool and keeps that thread
//! for its whole life, a parked goroutine is a blocked thread.
//! There is no preemption and no cooperative scheduler.

use std::any::Any;
use std::sync::Arc;
use std::{fmt, panic, thread};

use crate::sync::channel::Channel;

mod config;
pub(crate) mod goroutine;
mod pool;
pub(crate) mod rand;
pub(crate) mod semaphore;
pub(crate) mod tls;

pub use config::{Config, ConfigError};

use goroutine::Goroutine;

/// Configures the worker pool, must be called before the first goroutine is started.
/// Otherwise the pool uses [Config::from_env].
pub fn configure(config: Config) -> Result<(), ConfigError> {
    pool::configure(config)
}

/// Spawns a new goroutine, returning a [JoinHandle] for it.
///
/// Dropping the handle detaches the goroutine, it keeps running.
pub fn go<F, T>(body: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let goroutine = Arc::new(Goroutine::new());
    let output = Channel::bounded(1);

    let handle = JoinHandle {
        goroutine: goroutine.clone(),
        output: output.clone(),
    };

    tracing::debug!(goroutine = goroutine.id(), "spawned");
    pool::submit(move || {
        let id = goroutine.id();
        tls::enter(goroutine, move || {
            let result = panic::catch_unwind(panic::AssertUnwindSafe(body));
            if result.is_err() {
                tracing::warn!(goroutine = id, "goroutine panicked");
            }

            // sole sender of a capacity 1 channel, never parks
            output.send(result);
        });
        tracing::debug!(goroutine = id, "finished");
    });

    handle
}

/// Runs `body` as a goroutine and blocks the calling thread until it returns.
pub fn start<F, T>(body: F) -> thread::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    go(body).join()
}

/// Handle for joining or cancelling a goroutine.
pub struct JoinHandle<T> {
    goroutine: Arc<Goroutine>,
    output: Channel<thread::Result<T>>,
}

impl<T: Send + 'static> JoinHandle<T> {
    /// Waits for the goroutine to finish.
    /// A panic inside the goroutine is returned as [Err] with the panic payload.
    pub fn join(self) -> Result<T, Box<dyn Any + Send + 'static>> {
        match self.output.recv() {
            Some(result) => result,
            None => unreachable!("goroutine output channel is never closed"),
        }
    }

    /// Whether the goroutine body has returned.
    pub fn is_finished(&self) -> bool {
        !self.output.is_empty()
    }

    /// Asks the goroutine to stop.
    ///
    /// Cancellation is cooperative, it's only observed by [crate::time] sleeps and [is_cancelled].
    /// A goroutine blocked on a channel operation stays blocked.
    pub fn cancel(&self) {
        self.goroutine.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.goroutine.is_cancelled()
    }

    /// Process-unique identifier of the goroutine.
    pub fn goroutine_id(&self) -> u64 {
        self.goroutine.id()
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("goroutine", &self.goroutine.id())
            .finish()
    }
}

/// Cancels the running goroutine, see [JoinHandle::cancel].
pub fn cancel() {
    tls::current().cancel();
}

/// Whether the running goroutine has been cancelled.
pub fn is_cancelled() -> bool {
    tls::current().is_cancelled()
}

/// Process-unique identifier of the running goroutine.
pub fn current_id() -> u64 {
    tls::current().id()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use super::*;

    mod start {
        use super::*;

        #[test]
        fn returns_output() {
            let output = start(|| 123);

            assert_eq!(output.unwrap(), 123);
        }

        #[test]
        fn catches_panic() {
            let result = start(|| panic!());

            assert!(result.is_err());
        }

        #[test]
        fn can_nest() {
            let output = start(|| start(|| 123).unwrap());

            assert_eq!(output.unwrap(), 123);
        }

        #[test]
        fn works_several_times() {
            start(|| {}).unwrap();
            start(|| {}).unwrap();
        }

        #[test]
        fn works_in_parallel() {
            let handle = thread::spawn(|| {
                start(|| thread::sleep(Duration::from_millis(2))).unwrap();
            });

            start(|| {
                thread::sleep(Duration::from_millis(1));
            })
            .unwrap();

            handle.join().unwrap();
        }

        #[test]
        fn runs_on_another_thread() {
            let caller = thread::current().id();

            let runner = start(|| thread::current().id()).unwrap();

            assert_ne!(caller, runner);
        }

        mod cancellation {
            use super::*;

            #[test]
            fn initially_not_cancelled() {
                start(|| {
                    assert!(!is_cancelled());
                })
                .unwrap();
            }

            #[test]
            fn cancelled_after_cancelling_self() {
                start(|| {
                    cancel();
                    assert!(is_cancelled());
                })
                .unwrap();
            }
        }
    }

    mod go {
        use super::*;

        #[test]
        fn returns_child_output() {
            start(|| {
                let handle = go(|| 123);

                let output = handle.join();

                assert_eq!(output.unwrap(), 123);
            })
            .unwrap();
        }

        #[test]
        fn returns_non_child_output() {
            start(|| {
                let other = go(|| 123);
                let handle = go(|| other.join().unwrap());

                let output = handle.join();

                assert_eq!(output.unwrap(), 123);
            })
            .unwrap();
        }

        #[test]
        fn returns_already_completed_output() {
            start(|| {
                let handle = go(|| 123);

                let deadline = Instant::now() + Duration::from_secs(5);
                while !handle.is_finished() {
                    assert!(Instant::now() < deadline);
                    thread::yield_now();
                }
                let output = handle.join();

                assert_eq!(output.unwrap(), 123);
            })
            .unwrap();
        }

        #[test]
        fn catches_panic() {
            start(|| {
                let result = go(|| panic!()).join();

                assert!(result.is_err());
            })
            .unwrap();
        }

        #[test]
        fn panic_doesnt_affect_siblings() {
            start(|| {
                let failing = go(|| panic!("boom"));
                let healthy = go(|| 123);

                assert!(failing.join().is_err());
                assert_eq!(healthy.join().unwrap(), 123);
            })
            .unwrap();
        }

        #[test]
        fn detached_goroutine_keeps_running() {
            let ran = Arc::new(AtomicBool::new(false));

            start({
                let ran = ran.clone();
                move || {
                    let handle = go(move || ran.store(true, Ordering::SeqCst));
                    drop(handle);
                }
            })
            .unwrap();

            let deadline = Instant::now() + Duration::from_secs(5);
            while !ran.load(Ordering::SeqCst) {
                assert!(Instant::now() < deadline, "detached goroutine never ran");
                thread::yield_now();
            }
        }

        #[test]
        fn many_goroutines() {
            start(|| {
                let handles: Vec<_> = (0..100).map(|n| go(move || n * 2)).collect();

                let sum: i32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

                assert_eq!(sum, (0..100).map(|n| n * 2).sum());
            })
            .unwrap();
        }

        #[test]
        fn goroutines_have_distinct_ids() {
            start(|| {
                let a = go(current_id);
                let b = go(current_id);

                let (a_id, b_id) = (a.goroutine_id(), b.goroutine_id());

                assert_eq!(a.join().unwrap(), a_id);
                assert_eq!(b.join().unwrap(), b_id);
                assert_ne!(a_id, b_id);
            })
            .unwrap();
        }

        mod cancellation {
            use super::*;

            #[test]
            fn child_initially_not_cancelled() {
                start(|| {
                    let handle = go(|| assert!(!is_cancelled()));

                    handle.join().unwrap();
                })
                .unwrap();
            }

            #[test]
            fn child_cancelled_after_cancelling_self() {
                start(|| {
                    let handle = go(|| {
                        cancel();
                        assert!(is_cancelled());
                    });

                    handle.join().unwrap();
                    assert!(!is_cancelled());
                })
                .unwrap();
            }

            #[test]
            fn child_cancelled_after_cancelling_handle() {
                start(|| {
                    let handle = go(|| {
                        let _ = crate::time::sleep(Duration::from_secs(10));
                        is_cancelled()
                    });

                    handle.cancel();

                    assert!(handle.is_cancelled());
                    assert!(handle.join().unwrap());
                    assert!(!is_cancelled());
                })
                .unwrap();
            }

            #[test]
            fn cancel_doesnt_propagate_to_children() {
                start(|| {
                    let handle = go(|| go(is_cancelled).join().unwrap());

                    handle.cancel();

                    assert!(!handle.join().unwrap());
                })
                .unwrap();
            }
        }
    }

    #[test]
    fn configure_after_start_fails() {
        start(|| {}).unwrap();

        assert_eq!(configure(Config::default()), Err(ConfigError::AlreadyStarted));
    }

    #[test]
    fn trait_implementations() {
        use impls::impls;
        use std::fmt::Debug;

        assert!(impls!(JoinHandle<i32>: Debug & Send & Sync & !Clone));
        assert!(impls!(Config: Debug & Clone & Default));
    }

    #[test]
    fn debug_shows_goroutine_id() {
        start(|| {
            let handle = go(|| {});
            let id = handle.goroutine_id();

            assert_eq!(format!("{handle:?}"), format!("JoinHandle {{ goroutine: {id} }}"));
        })
        .unwrap();
    }
}
