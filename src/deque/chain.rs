//! Node storage for the blocking deque
//!
//! Nodes live in a slot arena and link to each other by index, so the chain
//! never holds raw pointers. Released slots are threaded onto a free list and
//! reused by later pushes.
//!
//! ## Layout
//!
//! - `head`: index of the front node, `None` when the chain is empty
//! - `tail`: index of the back node, `None` when the chain is empty
//! - Each linked node carries `prev`/`next` indices; `prev == None` marks the
//!   head and `next == None` marks the tail
//!
//! Node allocation is the only fallible step of a push and happens before any
//! link is touched, so a failed push leaves the chain exactly as it was and
//! hands the payload back.

use crate::{Error, PushError, Result};
use core::mem;

/// A linked element of the chain
#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
enum Slot<T> {
    Linked(Node<T>),
    Free { next_free: Option<usize> },
}

/// Doubly-linked chain of payloads backed by a slot arena
#[derive(Debug)]
pub(crate) struct Chain<T> {
    slots: Vec<Slot<T>>,
    free: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    // Arena size at which fresh allocations fail, to exercise exhaustion.
    #[cfg(test)]
    slot_limit: Option<usize>,
}

impl<T> Chain<T> {
    /// Create an empty chain without reserving storage
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: None,
            head: None,
            tail: None,
            len: 0,
            #[cfg(test)]
            slot_limit: None,
        }
    }

    /// Create an empty chain with room for `capacity` nodes
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        let mut chain = Self::new();
        chain.reserve(capacity)?;
        Ok(chain)
    }

    /// Largest node count the arena can address for this payload type
    pub(crate) fn max_capacity() -> usize {
        isize::MAX as usize / mem::size_of::<Slot<T>>().max(1)
    }

    /// Bytes held by node storage
    pub(crate) fn storage_bytes(&self) -> usize {
        self.slots.capacity() * mem::size_of::<Slot<T>>()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Link `value` in front of the current head
    pub(crate) fn push_front(&mut self, value: T) -> core::result::Result<(), PushError<T>> {
        let index = self
            .allocate(Node {
                value,
                prev: None,
                next: self.head,
            })
            .map_err(|node| PushError::new(Error::ResourceExhausted, node.value))?;

        match self.head {
            Some(old_head) => self.node_mut(old_head).prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.len += 1;
        Ok(())
    }

    /// Link `value` behind the current tail
    pub(crate) fn push_back(&mut self, value: T) -> core::result::Result<(), PushError<T>> {
        let index = self
            .allocate(Node {
                value,
                prev: self.tail,
                next: None,
            })
            .map_err(|node| PushError::new(Error::ResourceExhausted, node.value))?;

        match self.tail {
            Some(old_tail) => self.node_mut(old_tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        Ok(())
    }

    /// Unlink the head node and hand back its payload
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let index = self.head?;
        let node = self.release(index);

        match node.next {
            Some(next) => self.node_mut(next).prev = None,
            None => self.tail = None,
        }
        self.head = node.next;
        self.len -= 1;
        Some(node.value)
    }

    /// Unlink the tail node and hand back its payload
    pub(crate) fn pop_back(&mut self) -> Option<T> {
        let index = self.tail?;
        let node = self.release(index);

        match node.prev {
            Some(prev) => self.node_mut(prev).next = None,
            None => self.head = None,
        }
        self.tail = node.prev;
        self.len -= 1;
        Some(node.value)
    }

    /// Unlink every node front-to-back and release all node storage
    pub(crate) fn into_values(mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        while let Some(value) = self.pop_front() {
            values.push(value);
        }
        values
    }

    /// Iterate payloads front-to-back
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            chain: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        if additional > Self::max_capacity() {
            return Err(Error::InvalidArgument);
        }
        self.slots
            .try_reserve(additional)
            .map_err(|_| Error::ResourceExhausted)
    }

    /// Place `node` in a slot, or give it back if no slot can be had
    fn allocate(&mut self, node: Node<T>) -> core::result::Result<usize, Node<T>> {
        if let Some(index) = self.free {
            let previous = mem::replace(&mut self.slots[index], Slot::Linked(node));
            self.free = match previous {
                Slot::Free { next_free } => next_free,
                Slot::Linked(_) => unreachable!("free list points at a linked slot"),
            };
            return Ok(index);
        }

        if self.at_slot_limit() || self.slots.try_reserve(1).is_err() {
            return Err(node);
        }
        self.slots.push(Slot::Linked(node));
        Ok(self.slots.len() - 1)
    }

    #[cfg(test)]
    fn at_slot_limit(&self) -> bool {
        self.slot_limit.is_some_and(|limit| self.slots.len() >= limit)
    }

    #[cfg(not(test))]
    fn at_slot_limit(&self) -> bool {
        false
    }

    fn release(&mut self, index: usize) -> Node<T> {
        let freed = Slot::Free {
            next_free: self.free,
        };
        match mem::replace(&mut self.slots[index], freed) {
            Slot::Linked(node) => {
                self.free = Some(index);
                node
            }
            Slot::Free { .. } => unreachable!("released a slot that was already free"),
        }
    }

    fn node(&self, index: usize) -> &Node<T> {
        match &self.slots[index] {
            Slot::Linked(node) => node,
            Slot::Free { .. } => unreachable!("link points at a free slot"),
        }
    }

    fn node_mut(&mut self, index: usize) -> &mut Node<T> {
        match &mut self.slots[index] {
            Slot::Linked(node) => node,
            Slot::Free { .. } => unreachable!("link points at a free slot"),
        }
    }

    /// Fail fresh slot allocations once the arena holds `limit` slots.
    /// Slots on the free list stay usable.
    #[cfg(test)]
    pub(crate) fn limit_slots(&mut self, limit: usize) {
        self.slot_limit = Some(limit);
    }

    /// Walk the chain in both directions and check every link invariant.
    #[cfg(test)]
    pub(crate) fn assert_links(&self) {
        assert_eq!(self.head.is_none(), self.tail.is_none());

        let mut forward = 0;
        let mut cursor = self.head;
        let mut last = None;
        while let Some(index) = cursor {
            let node = self.node(index);
            assert_eq!(node.prev, last, "prev link of {index} is stale");
            last = Some(index);
            cursor = node.next;
            forward += 1;
            assert!(forward <= self.len, "cycle in forward links");
        }
        assert_eq!(last, self.tail);
        assert_eq!(forward, self.len);

        let mut backward = 0;
        let mut cursor = self.tail;
        let mut last = None;
        while let Some(index) = cursor {
            last = Some(index);
            cursor = self.node(index).prev;
            backward += 1;
            assert!(backward <= self.len, "cycle in backward links");
        }
        assert_eq!(last, self.head);
        assert_eq!(backward, self.len);
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over chain payloads
#[derive(Debug)]
pub(crate) struct Iter<'a, T> {
    chain: &'a Chain<T>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.chain.node(self.cursor?);
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(chain: &Chain<i32>) -> Vec<i32> {
        chain.iter().copied().collect()
    }

    #[test]
    fn test_single_node_is_head_and_tail() {
        let mut chain = Chain::new();
        chain.push_back(7).unwrap();

        assert_eq!(chain.head, chain.tail);
        assert_eq!(chain.len(), 1);
        chain.assert_links();

        assert_eq!(chain.pop_front(), Some(7));
        assert!(chain.is_empty());
        assert!(chain.tail.is_none());
        chain.assert_links();
    }

    #[test]
    fn test_both_ends() {
        let mut chain = Chain::new();
        chain.push_back(2).unwrap();
        chain.push_front(1).unwrap();
        chain.push_back(3).unwrap();
        chain.push_front(0).unwrap();
        chain.assert_links();

        assert_eq!(collect(&chain), vec![0, 1, 2, 3]);
        assert_eq!(chain.pop_back(), Some(3));
        assert_eq!(chain.pop_front(), Some(0));
        chain.assert_links();
        assert_eq!(collect(&chain), vec![1, 2]);
        assert_eq!(chain.pop_back(), Some(2));
        assert_eq!(chain.pop_back(), Some(1));
        assert_eq!(chain.pop_back(), None);
        assert_eq!(chain.pop_front(), None);
    }

    #[test]
    fn test_released_slots_are_reused() {
        let mut chain = Chain::new();
        for i in 0..8 {
            chain.push_back(i).unwrap();
        }
        let slots = chain.slots.len();

        for _ in 0..4 {
            chain.pop_front();
        }
        for i in 8..12 {
            chain.push_front(i).unwrap();
        }

        assert_eq!(chain.slots.len(), slots);
        assert_eq!(collect(&chain), vec![11, 10, 9, 8, 4, 5, 6, 7]);
        chain.assert_links();
    }

    #[test]
    fn test_into_values_front_to_back() {
        let mut chain = Chain::with_capacity(16).unwrap();
        for i in 0..5 {
            chain.push_front(i).unwrap();
        }

        assert_eq!(chain.into_values(), vec![4, 3, 2, 1, 0]);
        assert!(Chain::<i32>::new().into_values().is_empty());
    }

    #[test]
    fn test_exhausted_push_leaves_chain_unchanged() {
        let mut chain = Chain::new();
        chain.push_back(1).unwrap();
        chain.push_back(2).unwrap();
        chain.limit_slots(2);

        let rejected = chain.push_front(0).unwrap_err();
        assert_eq!(rejected.error(), Error::ResourceExhausted);
        assert_eq!(rejected.into_value(), 0);
        let rejected = chain.push_back(3).unwrap_err();
        assert_eq!(rejected.into_value(), 3);

        assert_eq!(chain.len(), 2);
        assert_eq!(collect(&chain), vec![1, 2]);
        chain.assert_links();

        // A released slot is reused without a fresh allocation.
        assert_eq!(chain.pop_front(), Some(1));
        chain.push_back(3).unwrap();
        assert_eq!(collect(&chain), vec![2, 3]);
        chain.assert_links();
    }

    #[test]
    fn test_unrepresentable_capacity() {
        assert_eq!(
            Chain::<u64>::with_capacity(usize::MAX).unwrap_err(),
            Error::InvalidArgument
        );
    }

    #[test]
    fn test_iter_size_hint() {
        let mut chain = Chain::new();
        for i in 0..3 {
            chain.push_back(i).unwrap();
        }
        let mut iter = chain.iter();
        assert_eq!(iter.size_hint(), (3, Some(3)));
        iter.next();
        assert_eq!(iter.size_hint(), (2, Some(2)));
    }
}
