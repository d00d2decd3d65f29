//! Fixed-capacity circular buffer of values.
//!
//! slots:   _ C D _ _ A B     (capacity 7, count 4)
//!              ^send   ^recv
//!
//! Values are pushed at the send cursor and popped at the recv cursor,
//! both wrap around at the end of the slots.

#[derive(Debug)]
pub(crate) struct Ring<T> {
    slots: Box<[Option<T>]>,
    count: usize,
    send_cursor: usize,
    recv_cursor: usize,
}

impl<T> Ring<T> {
    /// Zero capacity is valid, such a ring is always both empty and full.
    pub(crate) fn new(capacity: usize) -> Self {
        Ring {
            slots: (0..capacity).map(|_| None).collect(),
            count: 0,
            send_cursor: 0,
            recv_cursor: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Appends the newest value, handing it back if there's no room.
    pub(crate) fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }

        let slot = &mut self.slots[self.send_cursor];
        debug_assert!(slot.is_none());
        *slot = Some(value);
        self.send_cursor = self.wrap(self.send_cursor + 1);
        self.count += 1;

        Ok(())
    }

    /// Removes the oldest value.
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let value = self.slots[self.recv_cursor].take();
        self.recv_cursor = self.wrap(self.recv_cursor + 1);
        self.count -= 1;

        match value {
            Some(value) => Some(value),
            None => unreachable!("occupied ring slot without a value"),
        }
    }

    /// Takes the oldest value and appends `value` in one step, keeping the occupancy.
    /// On an empty ring `value` comes straight back out.
    pub(crate) fn replace_oldest(&mut self, value: T) -> T {
        match self.pop() {
            Some(oldest) => {
                if self.push(value).is_err() {
                    unreachable!("ring full right after a pop");
                }
                oldest
            }
            None => value,
        }
    }

    fn wrap(&self, cursor: usize) -> usize {
        if cursor == self.capacity() {
            0
        } else {
            cursor
        }
    }
}
