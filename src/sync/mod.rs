//! Synchronization primitives for goroutines.
//!
//! Prefer [Channel] for passing values between goroutines,
//! [crate::select] for waiting on several channels at once,
//! and [WaitGroup] for waiting until a batch of goroutines finishes.

pub mod channel;
pub(crate) mod wait_queue;
mod wait_group;

pub use channel::{Channel, TryRecvError, TrySendError};
pub use wait_group::WaitGroup;
