//! Queue of goroutines parked on one side of a channel.
//!
//! A [WaitNode] is shared between the queue and the goroutine that parked it.
//! Links live in a slab so a node can be unlinked by key in O(1),
//! which select needs to retract the cases that lost.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::goroutine::Goroutine;

/// One pending send or receive.
pub(crate) struct WaitNode<T> {
    goroutine: Arc<Goroutine>,
    /// Select case index, 0 for plain operations.
    index: usize,
    /// The value to send, or the slot a sender fills for a receiver.
    payload: Mutex<Option<T>>,
    /// Set when a receiver is woken by close instead of a value.
    closed: AtomicBool,
    /// Set once the node has left its queue.
    dequeued: AtomicBool,
}

impl<T> WaitNode<T> {
    pub(crate) fn sender(goroutine: Arc<Goroutine>, index: usize, value: T) -> Self {
        WaitNode {
            goroutine,
            index,
            payload: Mutex::new(Some(value)),
            closed: AtomicBool::new(false),
            dequeued: AtomicBool::new(false),
        }
    }

    pub(crate) fn receiver(goroutine: Arc<Goroutine>, index: usize) -> Self {
        WaitNode {
            goroutine,
            index,
            payload: Mutex::new(None),
            closed: AtomicBool::new(false),
            dequeued: AtomicBool::new(false),
        }
    }

    pub(crate) fn goroutine(&self) -> &Goroutine {
        &self.goroutine
    }

    pub(crate) fn is_dequeued(&self) -> bool {
        self.dequeued.load(Ordering::Acquire)
    }

    /// Takes the value a parked sender carries.
    pub(crate) fn take_value(&self) -> T {
        match self.payload.lock().take() {
            Some(value) => value,
            None => panic!("parked sender without a value"),
        }
    }

    /// Hands a value to a parked receiver.
    pub(crate) fn fill(&self, value: T) {
        let previous = self.payload.lock().replace(value);
        assert!(previous.is_none(), "parked receiver filled twice");
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// What a parked receiver was woken with, `None` if the channel was closed.
    /// Only valid after the goroutine was resumed for this node.
    pub(crate) fn received(&self) -> Option<T> {
        let value = self.payload.lock().take();
        if value.is_none() && !self.closed.load(Ordering::Acquire) {
            panic!("receiver woken without a value");
        }
        value
    }

    /// Tries to win the node's goroutine for this node.
    fn claim(&self) -> bool {
        self.goroutine.try_claim(self.index)
    }
}

impl<T> fmt::Debug for WaitNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitNode")
            .field("goroutine", &self.goroutine.id())
            .field("index", &self.index)
            .field("dequeued", &self.is_dequeued())
            .finish_non_exhaustive()
    }
}

/// Position of a node in its [WaitQueue], valid until the node leaves the queue.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct WaitKey(usize);

struct Link<T> {
    node: Arc<WaitNode<T>>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked FIFO of [WaitNode]s.
pub(crate) struct WaitQueue<T> {
    links: slab::Slab<Link<T>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<T> WaitQueue<T> {
    pub(crate) fn new() -> Self {
        WaitQueue {
            links: slab::Slab::new(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn enqueue(&mut self, node: Arc<WaitNode<T>>) -> WaitKey {
        debug_assert!(!node.is_dequeued(), "wait nodes are never reused");

        let key = self.links.insert(Link {
            node,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => self.links[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);

        WaitKey(key)
    }

    /// Pops nodes until one whose goroutine can be claimed.
    /// Nodes of goroutines already claimed elsewhere are stale select cases and get dropped.
    pub(crate) fn claim_next(&mut self) -> Option<Arc<WaitNode<T>>> {
        while let Some(node) = self.dequeue() {
            if node.claim() {
                return Some(node);
            }
            tracing::trace!(goroutine = node.goroutine.id(), "skipped stale wait node");
        }

        None
    }

    /// Whether any node belongs to a goroutine that's still waiting to be claimed.
    pub(crate) fn has_live(&self) -> bool {
        self.links.iter().any(|(_, link)| !link.node.goroutine.is_claimed())
    }

    /// Unlinks `node` if it's still queued under `key`.
    /// Returns `false` if a partner already dequeued it.
    pub(crate) fn remove(&mut self, key: WaitKey, node: &Arc<WaitNode<T>>) -> bool {
        if node.is_dequeued() {
            return false;
        }

        // key can't have been reused while the node is still queued
        debug_assert!(Arc::ptr_eq(&self.links[key.0].node, node));
        self.unlink(key.0);
        true
    }

    fn dequeue(&mut self) -> Option<Arc<WaitNode<T>>> {
        let head = self.head?;
        Some(self.unlink(head))
    }

    fn unlink(&mut self, key: usize) -> Arc<WaitNode<T>> {
        let link = self.links.remove(key);

        match link.prev {
            Some(prev) => self.links[prev].next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => self.links[next].prev = link.prev,
            None => self.tail = link.prev,
        }

        link.node.dequeued.store(true, Ordering::Release);
        link.node
    }
}

impl<T> fmt::Debug for WaitQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        let mut cursor = self.head;
        while let Some(key) = cursor {
            list.entry(&self.links[key].node);
            cursor = self.links[key].next;
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver() -> Arc<WaitNode<i32>> {
        Arc::new(WaitNode::receiver(Arc::new(Goroutine::new()), 0))
    }

    fn drain(queue: &mut WaitQueue<i32>) -> Vec<Arc<WaitNode<i32>>> {
        std::iter::from_fn(|| queue.dequeue()).collect()
    }

    mod queue {
        use super::*;

        #[test]
        fn dequeues_in_fifo_order() {
            let mut queue = WaitQueue::new();
            let nodes = [receiver(), receiver(), receiver()];
            for node in &nodes {
                queue.enqueue(node.clone());
            }

            let dequeued = drain(&mut queue);

            assert_eq!(dequeued.len(), 3);
            for (expected, actual) in nodes.iter().zip(&dequeued) {
                assert!(Arc::ptr_eq(expected, actual));
            }
            assert_eq!(queue.len(), 0);
        }

        #[test]
        fn dequeue_marks_node() {
            let mut queue = WaitQueue::new();
            let node = receiver();
            queue.enqueue(node.clone());

            queue.dequeue();

            assert!(node.is_dequeued());
        }

        #[test]
        fn removes_head_middle_and_tail() {
            for removed in 0..3 {
                let mut queue = WaitQueue::new();
                let nodes = [receiver(), receiver(), receiver()];
                let keys: Vec<_> = nodes.iter().map(|n| queue.enqueue(n.clone())).collect();

                assert!(queue.remove(keys[removed], &nodes[removed]));

                let remaining = drain(&mut queue);
                let expected: Vec<_> = (0..3).filter(|&i| i != removed).collect();
                assert_eq!(remaining.len(), 2);
                for (&i, actual) in expected.iter().zip(&remaining) {
                    assert!(Arc::ptr_eq(&nodes[i], actual));
                }
            }
        }

        #[test]
        fn remove_only_node_empties_queue() {
            let mut queue = WaitQueue::new();
            let node = receiver();
            let key = queue.enqueue(node.clone());

            assert!(queue.remove(key, &node));

            assert_eq!(queue.len(), 0);
            assert!(queue.dequeue().is_none());

            // still usable afterwards
            let other = receiver();
            queue.enqueue(other.clone());
            assert!(Arc::ptr_eq(&queue.dequeue().unwrap(), &other));
        }

        #[test]
        fn remove_after_dequeue_is_noop() {
            let mut queue = WaitQueue::new();
            let node = receiver();
            let key = queue.enqueue(node.clone());
            queue.dequeue();

            // key may now belong to a newer node
            let newer = receiver();
            queue.enqueue(newer.clone());

            assert!(!queue.remove(key, &node));
            assert_eq!(queue.len(), 1);
        }
    }

    mod claim_next {
        use super::*;

        #[test]
        fn skips_claimed_goroutines() {
            let mut queue = WaitQueue::new();
            let stale = receiver();
            stale.goroutine().try_claim(7);
            let live = receiver();
            queue.enqueue(stale.clone());
            queue.enqueue(live.clone());

            let claimed = queue.claim_next().unwrap();

            assert!(Arc::ptr_eq(&claimed, &live));
            assert!(stale.is_dequeued());
            assert_eq!(live.goroutine().claimed(), Some(0));
            assert_eq!(queue.len(), 0);
        }

        #[test]
        fn claims_with_case_index() {
            let mut queue = WaitQueue::new();
            let node = Arc::new(WaitNode::<i32>::receiver(Arc::new(Goroutine::new()), 4));
            queue.enqueue(node.clone());

            queue.claim_next();

            assert_eq!(node.goroutine().claimed(), Some(4));
        }

        #[test]
        fn one_goroutine_is_claimed_once() {
            let goroutine = Arc::new(Goroutine::new());
            let mut first = WaitQueue::new();
            let mut second = WaitQueue::new();
            first.enqueue(Arc::new(WaitNode::<i32>::receiver(goroutine.clone(), 0)));
            second.enqueue(Arc::new(WaitNode::<i32>::receiver(goroutine.clone(), 1)));

            assert!(first.claim_next().is_some());
            assert!(second.claim_next().is_none());
            assert_eq!(goroutine.claimed(), Some(0));
        }

        #[test]
        fn has_live_ignores_stale_nodes() {
            let mut queue = WaitQueue::new();
            let stale = receiver();
            stale.goroutine().try_claim(0);
            queue.enqueue(stale);

            assert!(!queue.has_live());

            queue.enqueue(receiver());
            assert!(queue.has_live());
        }
    }

    mod payload {
        use super::*;

        #[test]
        fn sender_value_taken_once() {
            let node = WaitNode::sender(Arc::new(Goroutine::new()), 0, 5);

            assert_eq!(node.take_value(), 5);
        }

        #[test]
        #[should_panic(expected = "parked sender without a value")]
        fn sender_value_taken_twice_panics() {
            let node = WaitNode::sender(Arc::new(Goroutine::new()), 0, 5);

            node.take_value();
            node.take_value();
        }

        #[test]
        fn receiver_gets_filled_value() {
            let node = receiver();

            node.fill(9);

            assert_eq!(node.received(), Some(9));
        }

        #[test]
        fn closed_receiver_gets_nothing() {
            let node = receiver();

            node.close();

            assert_eq!(node.received(), None);
        }

        #[test]
        #[should_panic(expected = "receiver woken without a value")]
        fn empty_receiver_panics() {
            receiver().received();
        }
    }
}
