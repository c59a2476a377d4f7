//! Doubly Linked List Module
//!
//! Arena-backed doubly linked list addressed through node handles. The cache
//! uses it to keep LRU order, but it is a general container on its own.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicU64, Ordering};

use generational_arena::{Arena, Index};

use crate::error::{CacheError, Result};

/// Source of list identities, so handles can be traced back to their list.
static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

// == Node Handle ==
/// Opaque reference to a node of a [`List`].
///
/// A handle stays valid until its node is removed or the list is cleared.
/// It remembers which list issued it: using it with any other list, or after
/// its node is gone, fails with [`CacheError::InvalidHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    list: u64,
    index: Index,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<Index>,
    next: Option<Index>,
}

// == List ==
/// Doubly linked list with O(1) insertion and removal anywhere, given a handle.
///
/// Nodes live in a generational arena owned by the list, so the list is the
/// only owner of its values. Every node in the arena is attached to the chain:
/// the arena length is the list length.
pub struct List<T> {
    /// Identity stamped into every handle this list hands out
    id: u64,
    /// Node storage
    nodes: Arena<Node<T>>,
    /// Head of the chain (`prev == None`)
    first: Option<Index>,
    /// Tail of the chain (`next == None`)
    last: Option<Index>,
}

impl<T> List<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Arena::new(),
            first: None,
            last: None,
        }
    }

    // == Length ==
    /// Returns the number of nodes in the list.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Handle of the head node.
    pub fn first(&self) -> Option<NodeHandle> {
        self.first.map(|index| self.handle(index))
    }

    /// Handle of the tail node.
    pub fn last(&self) -> Option<NodeHandle> {
        self.last.map(|index| self.handle(index))
    }

    /// Value at the head of the list.
    pub fn front(&self) -> Option<&T> {
        self.first.map(|index| &self.nodes[index].value)
    }

    /// Value at the tail of the list.
    pub fn back(&self) -> Option<&T> {
        self.last.map(|index| &self.nodes[index].value)
    }

    /// Returns true if `handle` refers to a node currently in this list.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Value stored at `handle`, or `None` if the handle is not valid here.
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        let index = self.resolve(handle).ok()?;
        Some(&self.nodes[index].value)
    }

    /// Mutable access to the value stored at `handle`.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut T> {
        let index = self.resolve(handle).ok()?;
        Some(&mut self.nodes[index].value)
    }

    /// Handle of the node following `handle`.
    pub fn next(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let index = self.resolve(handle).ok()?;
        self.nodes[index].next.map(|next| self.handle(next))
    }

    /// Handle of the node preceding `handle`.
    pub fn prev(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let index = self.resolve(handle).ok()?;
        self.nodes[index].prev.map(|prev| self.handle(prev))
    }

    // == Push ==
    /// Appends a value at the tail and returns its handle.
    pub fn push_back(&mut self, value: T) -> NodeHandle {
        let index = self.alloc(value);
        self.link_back(index);
        self.handle(index)
    }

    /// Prepends a value at the head and returns its handle.
    pub fn push_front(&mut self, value: T) -> NodeHandle {
        let index = self.alloc(value);
        self.link_front(index);
        self.handle(index)
    }

    // == Pop ==
    /// Removes and returns the head value, or `None` if the list is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let index = self.first?;
        self.unlink(index);
        self.nodes.remove(index).map(|node| node.value)
    }

    /// Removes and returns the tail value, or `None` if the list is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        let index = self.last?;
        self.unlink(index);
        self.nodes.remove(index).map(|node| node.value)
    }

    // == Insert ==
    /// Inserts a new value right after `target`.
    pub fn insert_after(&mut self, target: NodeHandle, value: T) -> Result<NodeHandle> {
        let target = self.resolve(target)?;
        let index = self.alloc(value);
        self.link_after(index, target);
        Ok(self.handle(index))
    }

    /// Inserts a new value right before `target`.
    pub fn insert_before(&mut self, target: NodeHandle, value: T) -> Result<NodeHandle> {
        let target = self.resolve(target)?;
        let index = self.alloc(value);
        self.link_before(index, target);
        Ok(self.handle(index))
    }

    // == Move ==
    /// Splices the existing node `node` so that it directly follows `target`.
    ///
    /// Moving a node next to itself is a no-op.
    pub fn move_after(&mut self, node: NodeHandle, target: NodeHandle) -> Result<()> {
        let index = self.resolve(node)?;
        let target = self.resolve(target)?;
        if index != target {
            self.unlink(index);
            self.link_after(index, target);
        }
        Ok(())
    }

    /// Splices the existing node `node` so that it directly precedes `target`.
    pub fn move_before(&mut self, node: NodeHandle, target: NodeHandle) -> Result<()> {
        let index = self.resolve(node)?;
        let target = self.resolve(target)?;
        if index != target {
            self.unlink(index);
            self.link_before(index, target);
        }
        Ok(())
    }

    /// Moves `node` to the tail of the list.
    pub fn move_to_back(&mut self, node: NodeHandle) -> Result<()> {
        let index = self.resolve(node)?;
        if self.last != Some(index) {
            self.unlink(index);
            self.link_back(index);
        }
        Ok(())
    }

    /// Moves `node` to the head of the list.
    pub fn move_to_front(&mut self, node: NodeHandle) -> Result<()> {
        let index = self.resolve(node)?;
        if self.first != Some(index) {
            self.unlink(index);
            self.link_front(index);
        }
        Ok(())
    }

    // == Remove ==
    /// Detaches the node at `handle` and returns its value.
    pub fn remove(&mut self, handle: NodeHandle) -> Result<T> {
        let index = self.resolve(handle)?;
        self.unlink(index);
        self.nodes
            .remove(index)
            .map(|node| node.value)
            .ok_or(CacheError::InvalidHandle)
    }

    // == Clear ==
    /// Removes every node. All outstanding handles become invalid.
    pub fn clear(&mut self) {
        // Arena slots get reused after a clear, so handles are retired by identity.
        self.id = NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed);
        self.nodes.clear();
        self.first = None;
        self.last = None;
    }

    // == Rotate ==
    /// Rotates the list as if it were circular.
    ///
    /// A positive `amount` moves nodes from the head to the tail, a negative one
    /// from the tail to the head. The walk takes whichever direction around the
    /// ring is shorter, so it never costs more than `len / 2` steps.
    ///
    /// Returns `|amount % len|`. An empty list returns 0 and a single-node list
    /// returns 1, both without changing anything.
    pub fn rotate(&mut self, amount: isize) -> usize {
        let (Some(first), Some(last)) = (self.first, self.last) else {
            return 0;
        };
        let size = self.len();
        if size == 1 {
            return 1;
        }

        let size_signed = size as isize;
        let mut shift = amount % size_signed;
        if shift == 0 {
            return 0;
        }
        let rotated = shift.unsigned_abs();
        if rotated * 2 > size {
            shift = if shift > 0 {
                shift - size_signed
            } else {
                shift + size_signed
            };
        }

        // Close the ring, walk to the new head, then cut the ring open again.
        self.nodes[first].prev = Some(last);
        self.nodes[last].next = Some(first);

        let mut head = first;
        if shift > 0 {
            for _ in 0..shift {
                head = self.nodes[head].next.unwrap_or(first);
            }
        } else {
            for _ in shift..0 {
                head = self.nodes[head].prev.unwrap_or(last);
            }
        }
        let tail = self.nodes[head].prev.unwrap_or(last);

        self.nodes[head].prev = None;
        self.nodes[tail].next = None;
        self.first = Some(head);
        self.last = Some(tail);

        rotated
    }

    // == Trim ==
    /// Detaches `min(n, len)` nodes from the head and returns them, in order,
    /// as a standalone list.
    ///
    /// Returns `None` when nothing was removed (`n == 0` or empty list). When
    /// `n >= len` the whole list moves out and this list is left empty.
    pub fn trim_start(&mut self, n: usize) -> Option<List<T>> {
        if n == 0 || self.is_empty() {
            return None;
        }
        if n >= self.len() {
            return Some(std::mem::take(self));
        }

        let mut detached = List::new();
        for _ in 0..n {
            if let Some(value) = self.pop_front() {
                detached.push_back(value);
            }
        }
        Some(detached)
    }

    /// Detaches `min(n, len)` nodes from the tail and returns them, in order,
    /// as a standalone list.
    pub fn trim_end(&mut self, n: usize) -> Option<List<T>> {
        if n == 0 || self.is_empty() {
            return None;
        }
        if n >= self.len() {
            return Some(std::mem::take(self));
        }

        let mut detached = List::new();
        for _ in 0..n {
            if let Some(value) = self.pop_back() {
                detached.push_front(value);
            }
        }
        Some(detached)
    }

    // == Iteration ==
    /// Iterates over values from head to tail. Use `.rev()` for tail to head.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            front: self.first,
            back: self.last,
            remaining: self.len(),
        }
    }

    /// Iterates over node handles from head to tail. Use `.rev()` for tail to head.
    pub fn handles(&self) -> Handles<'_, T> {
        Handles {
            list: self,
            front: self.first,
            back: self.last,
            remaining: self.len(),
        }
    }

    /// Copies the values into a vector, head first.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    // == Internal Linking ==

    fn handle(&self, index: Index) -> NodeHandle {
        NodeHandle {
            list: self.id,
            index,
        }
    }

    fn resolve(&self, handle: NodeHandle) -> Result<Index> {
        if handle.list == self.id && self.nodes.contains(handle.index) {
            Ok(handle.index)
        } else {
            Err(CacheError::InvalidHandle)
        }
    }

    fn alloc(&mut self, value: T) -> Index {
        self.nodes.insert(Node {
            value,
            prev: None,
            next: None,
        })
    }

    fn unlink(&mut self, index: Index) {
        let (prev, next) = {
            let node = &self.nodes[index];
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.first = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.last = prev,
        }

        let node = &mut self.nodes[index];
        node.prev = None;
        node.next = None;
    }

    fn link_after(&mut self, index: Index, target: Index) {
        let next = self.nodes[target].next;
        {
            let node = &mut self.nodes[index];
            node.prev = Some(target);
            node.next = next;
        }
        self.nodes[target].next = Some(index);
        match next {
            Some(next) => self.nodes[next].prev = Some(index),
            None => self.last = Some(index),
        }
    }

    fn link_before(&mut self, index: Index, target: Index) {
        let prev = self.nodes[target].prev;
        {
            let node = &mut self.nodes[index];
            node.prev = prev;
            node.next = Some(target);
        }
        self.nodes[target].prev = Some(index);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(index),
            None => self.first = Some(index),
        }
    }

    fn link_back(&mut self, index: Index) {
        match self.last {
            Some(last) => self.link_after(index, last),
            None => {
                self.first = Some(index);
                self.last = Some(index);
            }
        }
    }

    fn link_front(&mut self, index: Index) {
        match self.first {
            Some(first) => self.link_before(index, first),
            None => {
                self.first = Some(index);
                self.last = Some(index);
            }
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = List::new();
        list.extend(iter);
        list
    }
}

impl<T> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for List<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { list: self }
    }
}

// == Iterators ==
/// Borrowing iterator over list values.
pub struct Iter<'a, T> {
    list: &'a List<T>,
    front: Option<Index>,
    back: Option<Index>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let list = self.list;
        let node = &list.nodes[self.front?];
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let list = self.list;
        let node = &list.nodes[self.back?];
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Borrowing iterator over node handles.
pub struct Handles<'a, T> {
    list: &'a List<T>,
    front: Option<Index>,
    back: Option<Index>,
    remaining: usize,
}

impl<T> Iterator for Handles<'_, T> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.front?;
        self.front = self.list.nodes[index].next;
        self.remaining -= 1;
        Some(self.list.handle(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Handles<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.back?;
        self.back = self.list.nodes[index].prev;
        self.remaining -= 1;
        Some(self.list.handle(index))
    }
}

impl<T> ExactSizeIterator for Handles<'_, T> {}
impl<T> FusedIterator for Handles<'_, T> {}

/// Owning iterator, drains values from the head.
pub struct IntoIter<T> {
    list: List<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.list.pop_back()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
