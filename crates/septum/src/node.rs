//! Arena-backed doubly-linked list.
//!
//! Nodes live in a slot vector and link to each other by slot index, so
//! splicing is index rewiring and a node can only ever belong to the list
//! that allocated it. Freed slots are recycled; every reuse bumps the slot
//! generation so a stale [`NodeId`] is detected instead of aliasing the new
//! occupant.

/// Stable handle to a node in a [`NodeList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

#[derive(Debug)]
pub(crate) struct NodeList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeList<T> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn head(&self) -> Option<NodeId> {
        self.head.map(|index| self.id_at(index))
    }

    pub(crate) fn tail(&self) -> Option<NodeId> {
        self.tail.map(|index| self.id_at(index))
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.value)
    }

    /// Returns the node following `id`, or `None` at the tail or for a
    /// stale handle.
    pub(crate) fn next(&self, id: NodeId) -> Option<NodeId> {
        let next = self.node(id)?.next?;
        Some(self.id_at(next))
    }

    pub(crate) fn push_back(&mut self, value: T) -> NodeId {
        let prev = self.tail;
        let index = self.alloc(value, prev, None);
        match prev {
            Some(tail) => self.link_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.id_at(index)
    }

    /// Inserts `value` immediately before `at`.
    ///
    /// Returns `None` if `at` is stale.
    pub(crate) fn insert_before(&mut self, at: NodeId, value: T) -> Option<NodeId> {
        let prev = self.node(at)?.prev;
        let index = self.alloc(value, prev, Some(at.index));
        self.link_mut(at.index).prev = Some(index);
        match prev {
            Some(prev) => self.link_mut(prev).next = Some(index),
            None => self.head = Some(index),
        }
        Some(self.id_at(index))
    }

    /// Inserts `value` immediately after `at`.
    ///
    /// Returns `None` if `at` is stale.
    pub(crate) fn insert_after(&mut self, at: NodeId, value: T) -> Option<NodeId> {
        let next = self.node(at)?.next;
        let index = self.alloc(value, Some(at.index), next);
        self.link_mut(at.index).next = Some(index);
        match next {
            Some(next) => self.link_mut(next).prev = Some(index),
            None => self.tail = Some(index),
        }
        Some(self.id_at(index))
    }

    /// Unlinks the node, splicing its neighbours together, and returns its
    /// value. Returns `None` if `id` is stale.
    pub(crate) fn unlink(&mut self, id: NodeId) -> Option<T> {
        self.node(id)?;
        let slot = &mut self.slots[id.index];
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;

        match node.prev {
            Some(prev) => self.link_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.link_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.value)
    }

    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let head = self.head()?;
        self.unlink(head)
    }

    /// Returns the first node, scanning from the head, whose value satisfies
    /// `predicate`.
    pub(crate) fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<NodeId> {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.link(index);
            if predicate(&node.value) {
                return Some(self.id_at(index));
            }
            cursor = node.next;
        }
        None
    }

    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn alloc(&mut self, value: T, prev: Option<usize>, next: Option<usize>) -> usize {
        let node = Node { value, prev, next };
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn id_at(&self, index: usize) -> NodeId {
        NodeId {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node<T>> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    // Internal links always point at occupied slots.
    fn link(&self, index: usize) -> &Node<T> {
        match self.slots[index].node.as_ref() {
            Some(node) => node,
            None => unreachable!("linked slot {} is vacant", index),
        }
    }

    fn link_mut(&mut self, index: usize) -> &mut Node<T> {
        match self.slots[index].node.as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {} is vacant", index),
        }
    }
}

/// Head-to-tail iterator over list values.
pub(crate) struct Iter<'a, T> {
    list: &'a NodeList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.link(self.cursor?);
        self.cursor = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &NodeList<u32>) -> Vec<u32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_push_back_and_iterate() {
        let mut list = NodeList::new();
        assert!(list.is_empty());
        list.push_back(1);
        list.push_back(2);
        list.push_back(3);
        assert_eq!(values(&list), vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_insert_before_head_updates_head() {
        let mut list = NodeList::new();
        let first = list.push_back(2);
        list.insert_before(first, 1).unwrap();
        assert_eq!(values(&list), vec![1, 2]);
        assert_eq!(list.get(list.head().unwrap()), Some(&1));
        assert_eq!(list.get(list.tail().unwrap()), Some(&2));
    }

    #[test]
    fn test_insert_after_tail_updates_tail() {
        let mut list = NodeList::new();
        let a = list.push_back(1);
        let c = list.push_back(3);
        list.insert_after(a, 2).unwrap();
        list.insert_after(c, 4).unwrap();
        assert_eq!(values(&list), vec![1, 2, 3, 4]);
        assert_eq!(list.get(list.tail().unwrap()), Some(&4));
    }

    #[test]
    fn test_unlink_middle_head_tail() {
        let mut list = NodeList::new();
        let a = list.push_back(1);
        let b = list.push_back(2);
        let c = list.push_back(3);

        assert_eq!(list.unlink(b), Some(2));
        assert_eq!(values(&list), vec![1, 3]);
        assert_eq!(list.next(a), Some(c));

        assert_eq!(list.unlink(a), Some(1));
        assert_eq!(list.head(), Some(c));

        assert_eq!(list.unlink(c), Some(3));
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
        assert_eq!(list.tail(), None);
    }

    #[test]
    fn test_double_unlink_is_noop() {
        let mut list = NodeList::new();
        let a = list.push_back(1);
        list.push_back(2);
        assert_eq!(list.unlink(a), Some(1));
        assert_eq!(list.unlink(a), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_stale_id_after_slot_reuse() {
        let mut list = NodeList::new();
        let a = list.push_back(1);
        list.unlink(a);
        let b = list.push_back(2);

        assert!(!list.contains(a));
        assert!(list.contains(b));
        assert_eq!(list.get(a), None);
        assert_eq!(list.insert_after(a, 9), None);
        assert_eq!(values(&list), vec![2]);
    }

    #[test]
    fn test_find_and_pop_front() {
        let mut list = NodeList::new();
        for v in [5, 6, 7] {
            list.push_back(v);
        }
        let six = list.find(|v| *v == 6).unwrap();
        assert_eq!(list.get(six), Some(&6));
        assert_eq!(list.find(|v| *v == 8), None);

        assert_eq!(list.pop_front(), Some(5));
        assert_eq!(values(&list), vec![6, 7]);
    }

    #[test]
    fn test_get_mut() {
        let mut list = NodeList::new();
        let a = list.push_back(1);
        *list.get_mut(a).unwrap() = 10;
        assert_eq!(values(&list), vec![10]);
    }
}
