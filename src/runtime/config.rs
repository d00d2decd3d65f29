//! Worker pool configuration.

use std::env;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// Tunables for the worker pool that backs goroutines.
///
/// Goroutines are backed 1:1 by worker threads while they run or park,
/// so these only affect how idle workers are kept around and how new ones are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix of worker thread names, suffixed with a sequence number.
    pub thread_name: String,
    /// Worker stack size in bytes, `None` uses the platform default.
    pub stack_size: Option<usize>,
    /// How long an idle worker waits for work before exiting.
    pub keep_alive: Duration,
    /// Idle workers beyond this count exit immediately.
    pub max_idle: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thread_name: "gochan-worker".to_string(),
            stack_size: None,
            keep_alive: Duration::from_secs(10),
            max_idle: thread::available_parallelism().map_or(4, |n| n.get()),
        }
    }
}

impl Config {
    /// Default configuration overlaid with `GOCHAN_STACK_SIZE`, `GOCHAN_KEEP_ALIVE_MS` and `GOCHAN_MAX_IDLE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_vars(|name| env::var(name))
    }

    fn from_vars(lookup: impl Fn(&'static str) -> Result<String, env::VarError>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(stack_size) = parse_var("GOCHAN_STACK_SIZE", &lookup)? {
            config.stack_size = Some(stack_size);
        }

        if let Some(millis) = parse_var("GOCHAN_KEEP_ALIVE_MS", &lookup)? {
            config.keep_alive = Duration::from_millis(millis);
        }

        if let Some(max_idle) = parse_var("GOCHAN_MAX_IDLE", &lookup)? {
            config.max_idle = max_idle;
        }

        Ok(config)
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }
}

fn parse_var<T: FromStr>(
    name: &'static str,
    lookup: impl Fn(&'static str) -> Result<String, env::VarError>,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            name,
            value: String::from("<non-unicode>"),
        }),
    }
}

/// Failure to apply a [Config].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the worker pool is already running, configure before the first goroutine")]
    AlreadyStarted,
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}
