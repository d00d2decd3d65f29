//! Goroutines, channels and select for blocking Rust code.
//!
//! Goroutines are closures run on a pool of OS threads, see [go] and [start].
//! They communicate over [Channel]s, which hand values over directly when unbuffered
//! and queue them in order when buffered.
//! [select!] waits on whichever of several channel operations becomes possible first.
//!
//! # Examples
//! ```
//! use gochan::{go, Channel};
//!
//! let jobs = Channel::bounded(4);
//! let results = Channel::unbuffered();
//!
//! let worker = go({
//!     let (jobs, results) = (jobs.clone(), results.clone());
//!     move || {
//!         for job in &jobs {
//!             results.send(job * 2);
//!         }
//!         results.close();
//!     }
//! });
//!
//! go(move || {
//!     for job in 1..=3 {
//!         jobs.send(job);
//!     }
//!     jobs.close();
//! });
//!
//! assert_eq!(results.iter().collect::<Vec<_>>(), vec![2, 4, 6]);
//! worker.join().unwrap();
//! ```

mod circular_buffer;
pub mod runtime;
pub mod select;
pub mod sync;
pub mod time;

pub use runtime::{go, JoinHandle};
pub use select::Select;
pub use sync::Channel;

#[cfg(feature = "macros")]
pub use gochan_macros::start;

/// Failure of an operation that can also be cut short by cancellation.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error<E> {
    #[error("{0}")]
    Original(E),
    /// The goroutine was cancelled, see [runtime::cancel].
    #[error("cancelled")]
    Cancelled,
}

/// Result of an operation whose only failure is cancellation.
pub type CancellableResult<T> = Result<T, Error<std::convert::Infallible>>;
