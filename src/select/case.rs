//! Type-erased select cases.
//!
//! The engine handles cases over channels of different element types uniformly.
//! Each case locks its own channel into an opaque guard and is later handed that guard back,
//! it's the only code that knows which [Guard] type is inside.

use std::any::Any;
use std::sync::Arc;

use crate::runtime::goroutine::Goroutine;
use crate::sync::channel::{Channel, Guard, Received, State};
use crate::sync::wait_queue::{WaitKey, WaitNode};

/// A locked channel, only its own cases can open it.
pub(crate) type Locked = Box<dyn Any>;

pub(crate) trait Case<R> {
    /// Global lock order key.
    fn lock_id(&self) -> usize;

    fn lock(&self) -> Locked;

    /// Attempts the operation without parking, remembering the outcome on success.
    fn poll(&mut self, locked: &mut Locked) -> bool;

    /// Parks the operation on the channel's wait queue as case `index`.
    fn register(&mut self, locked: &mut Locked, goroutine: &Arc<Goroutine>, index: usize);

    /// Whether the registration is still queued, without taking the lock.
    /// Only `false` is definitive.
    fn is_registered(&self) -> bool;

    /// Retracts the registration unless a partner already took it.
    fn unregister(&mut self, locked: &mut Locked);

    /// Runs the continuation with the outcome of [Case::poll] or of the winning registration.
    fn complete(self: Box<Self>) -> R;
}

fn state<T: Send + 'static>(locked: &mut Locked) -> &mut State<T> {
    match (**locked).downcast_mut::<Guard<T>>() {
        Some(guard) => &mut **guard,
        None => unreachable!("select case handed another channel's lock"),
    }
}

pub(crate) struct RecvCase<'a, T, F> {
    channel: &'a Channel<T>,
    continuation: F,
    outcome: Option<Option<T>>,
    registration: Option<(WaitKey, Arc<WaitNode<T>>)>,
}

impl<'a, T, F> RecvCase<'a, T, F> {
    pub(crate) fn new(channel: &'a Channel<T>, continuation: F) -> Self {
        RecvCase {
            channel,
            continuation,
            outcome: None,
            registration: None,
        }
    }
}

impl<'a, T, F, R> Case<R> for RecvCase<'a, T, F>
where
    T: Send + 'static,
    F: FnOnce(Option<T>) -> R,
{
    fn lock_id(&self) -> usize {
        self.channel.lock_id()
    }

    fn lock(&self) -> Locked {
        Box::new(self.channel.lock_arc())
    }

    fn poll(&mut self, locked: &mut Locked) -> bool {
        match state::<T>(locked).try_recv() {
            Received::Value(value) => self.outcome = Some(Some(value)),
            Received::Closed => self.outcome = Some(None),
            Received::WouldBlock => return false,
        }

        true
    }

    fn register(&mut self, locked: &mut Locked, goroutine: &Arc<Goroutine>, index: usize) {
        let node = Arc::new(WaitNode::receiver(goroutine.clone(), index));
        let key = state::<T>(locked).receivers.enqueue(node.clone());
        self.registration = Some((key, node));
    }

    fn is_registered(&self) -> bool {
        matches!(&self.registration, Some((_, node)) if !node.is_dequeued())
    }

    fn unregister(&mut self, locked: &mut Locked) {
        if let Some((key, node)) = &self.registration {
            state::<T>(locked).receivers.remove(*key, node);
        }
    }

    fn complete(self: Box<Self>) -> R {
        let RecvCase {
            continuation,
            outcome,
            registration,
            ..
        } = *self;

        let received = match (outcome, registration) {
            (Some(received), _) => received,
            (None, Some((_, node))) => node.received(),
            (None, None) => unreachable!("completed receive case that never ran"),
        };

        continuation(received)
    }
}

pub(crate) struct SendCase<'a, T, F> {
    channel: &'a Channel<T>,
    continuation: F,
    /// Held until the value is buffered, handed off or moved into a registration.
    value: Option<T>,
    sent: bool,
    registration: Option<(WaitKey, Arc<WaitNode<T>>)>,
}

impl<'a, T, F> SendCase<'a, T, F> {
    pub(crate) fn new(channel: &'a Channel<T>, value: T, continuation: F) -> Self {
        SendCase {
            channel,
            continuation,
            value: Some(value),
            sent: false,
            registration: None,
        }
    }
}

impl<'a, T, F, R> Case<R> for SendCase<'a, T, F>
where
    T: Send + 'static,
    F: FnOnce() -> R,
{
    fn lock_id(&self) -> usize {
        self.channel.lock_id()
    }

    fn lock(&self) -> Locked {
        Box::new(self.channel.lock_arc())
    }

    fn poll(&mut self, locked: &mut Locked) -> bool {
        let Some(value) = self.value.take() else {
            unreachable!("send case polled after its value left");
        };

        match state::<T>(locked).try_send(value) {
            Ok(()) => {
                self.sent = true;
                true
            }
            Err(value) => {
                self.value = Some(value);
                false
            }
        }
    }

    fn register(&mut self, locked: &mut Locked, goroutine: &Arc<Goroutine>, index: usize) {
        let Some(value) = self.value.take() else {
            unreachable!("send case registered after its value left");
        };

        let node = Arc::new(WaitNode::sender(goroutine.clone(), index, value));
        let key = state::<T>(locked).senders.enqueue(node.clone());
        self.registration = Some((key, node));
    }

    fn is_registered(&self) -> bool {
        matches!(&self.registration, Some((_, node)) if !node.is_dequeued())
    }

    fn unregister(&mut self, locked: &mut Locked) {
        if let Some((key, node)) = &self.registration {
            state::<T>(locked).senders.remove(*key, node);
        }
    }

    fn complete(self: Box<Self>) -> R {
        debug_assert!(self.sent || self.registration.is_some());
        let SendCase { continuation, .. } = *self;

        continuation()
    }
}
