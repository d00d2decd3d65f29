//! Typed channel with Go semantics.
//!
//! A channel of capacity 0 is unbuffered: every transfer is a direct handoff between
//! a sender and a receiver. Otherwise up to `capacity` values wait in a ring buffer.
//!
//! Misuse is fatal: sending on a closed channel, closing twice,
//! or closing while senders are parked all panic.
//! Receiving from a closed channel drains the buffer, then yields `None` forever without blocking.
//!
//! # Examples
//! ```
//! use gochan::{go, Channel};
//!
//! let channel = Channel::bounded(2);
//!
//! go({
//!     let channel = channel.clone();
//!     move || {
//!         channel.send("hello");
//!         channel.send("world");
//!         channel.close();
//!     }
//! });
//!
//! let received: Vec<_> = channel.iter().collect();
//! assert_eq!(received, ["hello", "world"]);
//! ```

use std::sync::Arc;
use std::{fmt, iter};

use parking_lot::Mutex;

use crate::circular_buffer::Ring;
use crate::runtime::tls;
use crate::sync::wait_queue::{WaitNode, WaitQueue};

/// Multi-producer multi-consumer channel handle.
///
/// Clones refer to the same channel.
pub struct Channel<T> {
    state: Arc<Mutex<State<T>>>,
}

/// Exclusive access to a channel's state that can outlive the borrow of the [Channel],
/// select holds several of these at once.
pub(crate) type Guard<T> = lock_api::ArcMutexGuard<parking_lot::RawMutex, State<T>>;

impl<T: Send + 'static> Channel<T> {
    /// Creates a channel holding up to `capacity` values, 0 means unbuffered.
    ///
    /// # Panics
    /// If `capacity` is negative.
    pub fn new(capacity: isize) -> Self {
        match usize::try_from(capacity) {
            Ok(capacity) => Channel::bounded(capacity),
            Err(_) => panic!("negative channel capacity: {capacity}"),
        }
    }

    /// Creates a channel where every send waits for a receiver.
    pub fn unbuffered() -> Self {
        Channel::bounded(0)
    }

    /// Creates a channel holding up to `capacity` values.
    pub fn bounded(capacity: usize) -> Self {
        Channel {
            state: Arc::new(Mutex::new(State::new(capacity))),
        }
    }

    /// Sends a value, parking until there's room or a receiver takes it.
    ///
    /// # Panics
    /// If the channel is closed.
    pub fn send(&self, value: T) {
        let mut state = self.state.lock();

        let value = match state.try_send(value) {
            Ok(()) => return,
            Err(value) => value,
        };

        let goroutine = tls::current();
        goroutine.reset_claim();
        state.senders.enqueue(Arc::new(WaitNode::sender(goroutine.clone(), 0, value)));
        drop(state);

        // woken by the receiver that took the value
        goroutine.suspend();
    }

    /// Receives a value, parking until one is available.
    /// Returns `None` once the channel is closed and drained.
    pub fn recv(&self) -> Option<T> {
        let mut state = self.state.lock();

        match state.try_recv() {
            Received::Value(value) => return Some(value),
            Received::Closed => return None,
            Received::WouldBlock => {}
        }

        let goroutine = tls::current();
        goroutine.reset_claim();
        let node = Arc::new(WaitNode::receiver(goroutine.clone(), 0));
        state.receivers.enqueue(node.clone());
        drop(state);

        // woken by a sender or by close
        goroutine.suspend();
        node.received()
    }

    /// Sends without parking.
    ///
    /// # Panics
    /// If the channel is closed.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.state.lock().try_send(value).map_err(TrySendError::Full)
    }

    /// Receives without parking.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        match self.state.lock().try_recv() {
            Received::Value(value) => Ok(value),
            Received::Closed => Err(TryRecvError::Closed),
            Received::WouldBlock => Err(TryRecvError::Empty),
        }
    }

    /// Closes the channel, waking every parked receiver if nothing is buffered.
    /// Buffered values stay receivable.
    ///
    /// # Panics
    /// If the channel is already closed or a sender is parked on it.
    pub fn close(&self) {
        self.state.lock().close();
    }

    /// Iterates over received values until the channel is closed and drained.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }

    pub(crate) fn lock_arc(&self) -> Guard<T> {
        self.state.lock_arc()
    }
}

impl<T> Channel<T> {
    /// Number of buffered values.
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().buffer.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Identity of the channel's lock, select acquires locks in increasing order of this key.
    pub(crate) fn lock_id(&self) -> usize {
        Arc::as_ptr(&self.state) as *const () as usize
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel {
            state: self.state.clone(),
        }
    }
}

impl<T> PartialEq for Channel<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Eq for Channel<T> {}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("len", &state.buffer.len())
            .field("capacity", &state.buffer.capacity())
            .field("senders", &state.senders.len())
            .field("receivers", &state.receivers.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Blocking iterator over a channel, see [Channel::iter].
#[derive(Debug)]
pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T: Send + 'static> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.channel.recv()
    }
}

impl<T: Send + 'static> iter::FusedIterator for Iter<'_, T> {}

/// Owning blocking iterator over a channel.
#[derive(Debug)]
pub struct IntoIter<T> {
    channel: Channel<T>,
}

impl<T: Send + 'static> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.channel.recv()
    }
}

impl<T: Send + 'static> iter::FusedIterator for IntoIter<T> {}

impl<T: Send + 'static> IntoIterator for Channel<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { channel: self }
    }
}

impl<'a, T: Send + 'static> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Non-parking send failed because the channel is full (or has no receiver, if unbuffered).
#[derive(thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
    #[error("sending on a full channel")]
    Full(T),
}

impl<T> TrySendError<T> {
    /// Recovers the value that wasn't sent.
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) => value,
        }
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("Full(..)"),
        }
    }
}

/// Non-parking receive failed.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
    #[error("receiving on an empty channel")]
    Empty,
    #[error("receiving on a closed and drained channel")]
    Closed,
}

/// Outcome of a receive attempt that doesn't park.
#[derive(Debug, PartialEq)]
pub(crate) enum Received<T> {
    Value(T),
    Closed,
    WouldBlock,
}

/// Everything a channel's lock guards.
pub(crate) struct State<T> {
    buffer: Ring<T>,
    pub(crate) senders: WaitQueue<T>,
    pub(crate) receivers: WaitQueue<T>,
    closed: bool,
}

impl<T> State<T> {
    fn new(capacity: usize) -> Self {
        State {
            buffer: Ring::new(capacity),
            senders: WaitQueue::new(),
            receivers: WaitQueue::new(),
            closed: false,
        }
    }

    /// Hands the value to a parked receiver or buffers it, otherwise gives it back.
    pub(crate) fn try_send(&mut self, value: T) -> Result<(), T> {
        if self.closed {
            panic!("send on closed channel");
        }

        if let Some(receiver) = self.receivers.claim_next() {
            // oldest buffered value goes first, the new one takes its place
            let value = self.buffer.replace_oldest(value);
            tracing::trace!(goroutine = receiver.goroutine().id(), "handed value to parked receiver");
            receiver.fill(value);
            receiver.goroutine().resume();
            return Ok(());
        }

        self.buffer.push(value)
    }

    /// Takes a value from a parked sender or the buffer.
    pub(crate) fn try_recv(&mut self) -> Received<T> {
        if let Some(sender) = self.senders.claim_next() {
            // the buffer is full, so the sender's value queues behind it
            let value = self.buffer.replace_oldest(sender.take_value());
            tracing::trace!(goroutine = sender.goroutine().id(), "took value from parked sender");
            sender.goroutine().resume();
            return Received::Value(value);
        }

        if let Some(value) = self.buffer.pop() {
            return Received::Value(value);
        }

        if self.closed {
            return Received::Closed;
        }

        Received::WouldBlock
    }

    fn close(&mut self) {
        if self.closed {
            panic!("close of closed channel");
        }

        if self.senders.has_live() {
            panic!("close of channel with parked senders");
        }

        self.closed = true;

        // receivers only park on an empty buffer
        if self.buffer.is_empty() {
            while let Some(receiver) = self.receivers.claim_next() {
                tracing::trace!(goroutine = receiver.goroutine().id(), "woke parked receiver on close");
                receiver.close();
                receiver.goroutine().resume();
            }
        }
    }
}
