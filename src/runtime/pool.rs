//! Elastic pool of worker threads.
//!
//! A parked goroutine keeps its worker blocked, so the pool can't have a fixed size:
//! work goes to an idle worker if there is one, otherwise a new worker is spawned.
//! Idle workers retire after [Config::keep_alive](super::Config::keep_alive).

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::config::{Config, ConfigError};

type Job = Box<dyn FnOnce() + Send + 'static>;

static CONFIG: OnceLock<Config> = OnceLock::new();
static POOL: OnceLock<Arc<Pool>> = OnceLock::new();

/// Installs the configuration used when the pool is first created.
pub(crate) fn configure(config: Config) -> Result<(), ConfigError> {
    if POOL.get().is_some() {
        return Err(ConfigError::AlreadyStarted);
    }

    CONFIG.set(config).map_err(|_| ConfigError::AlreadyStarted)
}

/// Runs `job` on some worker thread, eventually.
pub(crate) fn submit(job: impl FnOnce() + Send + 'static) {
    let pool = POOL.get_or_init(|| {
        let config = CONFIG
            .get_or_init(|| {
                Config::from_env().unwrap_or_else(|error| {
                    tracing::warn!(%error, "ignoring worker pool environment");
                    Config::default()
                })
            })
            .clone();
        Arc::new(Pool::new(config))
    });

    Pool::submit(pool, Box::new(job));
}

#[derive(Debug)]
struct Pool {
    config: Config,
    state: Mutex<PoolState>,
    work_available: Condvar,
    next_worker: AtomicUsize,
}

struct PoolState {
    jobs: VecDeque<Job>,
    idle: usize,
    workers: usize,
}

impl std::fmt::Debug for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolState")
            .field("jobs", &self.jobs.len())
            .field("idle", &self.idle)
            .field("workers", &self.workers)
            .finish()
    }
}

impl Pool {
    fn new(config: Config) -> Self {
        Pool {
            config,
            state: Mutex::new(PoolState {
                jobs: VecDeque::new(),
                idle: 0,
                workers: 0,
            }),
            work_available: Condvar::new(),
            next_worker: AtomicUsize::new(0),
        }
    }

    fn submit(pool: &Arc<Pool>, job: Job) {
        let mut state = pool.state.lock();
        state.jobs.push_back(job);

        // every idle worker may already be claimed by queued jobs
        if state.idle >= state.jobs.len() {
            pool.work_available.notify_one();
            return;
        }

        state.workers += 1;
        drop(state);

        if let Err(error) = Pool::spawn_worker(pool) {
            // an already running worker will eventually drain the queue
            let mut state = pool.state.lock();
            state.workers -= 1;
            let stranded = state.workers == 0;
            drop(state);

            tracing::error!(%error, "failed to spawn worker thread");
            if stranded {
                panic!("no worker thread available to run goroutines: {error}");
            }
        }
    }

    fn spawn_worker(pool: &Arc<Pool>) -> io::Result<()> {
        let number = pool.next_worker.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{number}", pool.config.thread_name));
        if let Some(stack_size) = pool.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = pool.clone();
        builder.spawn(move || pool.work())?;

        Ok(())
    }

    fn work(&self) {
        tracing::debug!(thread = thread::current().name(), "worker started");

        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                drop(state);
                job();
                state = self.state.lock();
                continue;
            }

            if state.idle >= self.config.max_idle {
                break;
            }

            state.idle += 1;
            let deadline = Instant::now() + self.config.keep_alive;
            let timed_out = loop {
                if !state.jobs.is_empty() {
                    break false;
                }
                if self.work_available.wait_until(&mut state, deadline).timed_out() {
                    break state.jobs.is_empty();
                }
            };
            state.idle -= 1;

            if timed_out {
                break;
            }
        }
        state.workers -= 1;
        drop(state);

        tracing::debug!(thread = thread::current().name(), "worker retired");
    }
}
