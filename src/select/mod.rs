//! Waiting on several channel operations at once.
//!
//! A select commits to exactly one of its cases and runs that case's continuation.
//! When several cases are ready, one is picked uniformly at random rather than by position.
//! With a default branch the select never parks, it runs the default if nothing is ready.
//!
//! A receive continuation gets `Some(value)`, or `None` if the channel is closed and drained.
//! Continuations are closures: `return`, `break` and `?` inside them act on the closure,
//! so have every branch produce a value and act on that instead.
//!
//! # Examples
//! ```
//! use gochan::{select, Channel};
//!
//! let numbers = Channel::bounded(1);
//! let words = Channel::<&str>::bounded(1);
//! numbers.send(1);
//!
//! let received = select! {
//!     recv(numbers) -> n => format!("number {n:?}"),
//!     recv(words) -> w => format!("word {w:?}"),
//! };
//! assert_eq!(received, "number Some(1)");
//!
//! let fallback = select! {
//!     recv(numbers) -> _ => "number",
//!     default => "nothing ready",
//! };
//! assert_eq!(fallback, "nothing ready");
//! ```
//!
//! Without the macro:
//! ```
//! use gochan::{Channel, Select};
//!
//! let channel = Channel::bounded(1);
//!
//! let sent = Select::new()
//!     .send(&channel, 42, || true)
//!     .or_else(|| false);
//!
//! assert!(sent);
//! assert_eq!(channel.recv(), Some(42));
//! ```

use std::fmt;

use crate::sync::channel::Channel;

mod case;
mod engine;

pub use engine::MAX_CASES;

use case::{RecvCase, SendCase};
use engine::Cases;

/// Builder for a select over cases whose continuations all produce an `R`.
pub struct Select<'a, R> {
    cases: Cases<'a, R>,
}

impl<'a, R> Select<'a, R> {
    pub fn new() -> Self {
        Select { cases: Vec::new() }
    }

    /// Adds a receive case.
    pub fn recv<T, F>(mut self, channel: &'a Channel<T>, continuation: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce(Option<T>) -> R + 'a,
    {
        self.cases.push(Box::new(RecvCase::new(channel, continuation)));
        self
    }

    /// Adds a send case, `value` is dropped if another case wins.
    ///
    /// # Panics
    /// When the select runs, if the channel is closed.
    pub fn send<T, F>(mut self, channel: &'a Channel<T>, value: T, continuation: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce() -> R + 'a,
    {
        self.cases.push(Box::new(SendCase::new(channel, value, continuation)));
        self
    }

    /// Parks until one case completes and returns its continuation's output.
    /// Without any case this never returns.
    ///
    /// # Panics
    /// With more than [MAX_CASES] cases.
    pub fn wait(self) -> R {
        engine::select(self.cases, None)
    }

    /// Completes a ready case, or runs `default` if none is ready, without parking.
    ///
    /// # Panics
    /// With more than [MAX_CASES] cases.
    pub fn or_else(self, default: impl FnOnce() -> R + 'a) -> R {
        engine::select(self.cases, Some(Box::new(default)))
    }

    /// Number of cases added so far.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<R> Default for Select<'_, R> {
    fn default() -> Self {
        Select::new()
    }
}

impl<R> fmt::Debug for Select<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select").field("cases", &self.cases.len()).finish()
    }
}

/// Waits on several channel operations, see the [module documentation](crate::select).
///
/// ```text
/// select! {
///     recv(channel) -> received => expression,
///     send(channel, value) => expression,
///     default => expression,
/// }
/// ```
///
/// Cases are separated by commas, `default` is optional and must come last.
/// Every expression must have the same type, which is the type of the whole `select!`.
#[macro_export]
macro_rules! select {
    (@chain ($select:expr) recv($channel:expr) -> $received:pat => $body:expr $(, $($rest:tt)*)?) => {
        $crate::select!(@chain ($select.recv(&$channel, |$received| $body)) $($($rest)*)?)
    };
    (@chain ($select:expr) send($channel:expr, $value:expr) => $body:expr $(, $($rest:tt)*)?) => {
        $crate::select!(@chain ($select.send(&$channel, $value, || $body)) $($($rest)*)?)
    };
    (@chain ($select:expr) default => $body:expr $(,)?) => {
        $select.or_else(|| $body)
    };
    (@chain ($select:expr)) => {
        $select.wait()
    };
    ($($case:tt)*) => {
        $crate::select!(@chain ($crate::Select::new()) $($case)*)
    };
}
