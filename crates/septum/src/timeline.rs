//! Timeline - per-id event list kept in chronological order.
//!
//! A timeline is a doubly-linked list of nodes, each holding one shared
//! event. Insertion scans from the head and places the new node before the
//! first event with a strictly later timestamp, so events with equal
//! timestamps keep their insertion order.
//!
//! The timer queue of the [`Nexus`](crate::Nexus) is a timeline too, with
//! the reserved id [`TIMER_QUEUE_ID`](crate::nexus::TIMER_QUEUE_ID).

use crate::event::EventRef;
use crate::node::{Iter, NodeList};
use crate::range::{Range, Ranger};
use tracing::trace;

/// Chronologically ordered list of events sharing a timeline id.
#[derive(Debug)]
pub struct Timeline {
    id: u64,
    nodes: NodeList<EventRef>,
}

impl Timeline {
    pub(crate) fn with_capacity(id: u64, capacity: usize) -> Self {
        Self {
            id,
            nodes: NodeList::with_capacity(capacity),
        }
    }

    /// Returns the timeline id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the number of events in the timeline.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the timeline holds no events.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the earliest event.
    pub fn first(&self) -> Option<&EventRef> {
        self.nodes.head().and_then(|id| self.nodes.get(id))
    }

    /// Returns the latest event.
    pub fn last(&self) -> Option<&EventRef> {
        self.nodes.tail().and_then(|id| self.nodes.get(id))
    }

    /// Inserts the event in timestamp order. Linear in the timeline length.
    pub(crate) fn insert(&mut self, event: EventRef) {
        trace!("Inserting event {} into timeline {}", event.id(), self.id);
        let later = self
            .nodes
            .find(|existing| existing.timestamp() > event.timestamp());
        match later {
            Some(at) => {
                let inserted = self.nodes.insert_before(at, event);
                debug_assert!(inserted.is_some());
            }
            None => {
                self.nodes.push_back(event);
            }
        }
    }

    /// Unlinks the first event with the given id. Returns whether one was
    /// found.
    pub(crate) fn remove_by_id(&mut self, event_id: u64) -> bool {
        match self.nodes.find(|existing| existing.id() == event_id) {
            Some(node) => {
                self.nodes.unlink(node);
                trace!("Removed event {} from timeline {}", event_id, self.id);
                true
            }
            None => false,
        }
    }

    pub(crate) fn pop_front(&mut self) -> Option<EventRef> {
        self.nodes.pop_front()
    }
}

impl Ranger for Timeline {
    fn range(&self) -> Box<dyn Range + '_> {
        Box::new(TimelineRange {
            nodes: self.nodes.iter(),
            current: None,
        })
    }
}

struct TimelineRange<'a> {
    nodes: Iter<'a, EventRef>,
    current: Option<&'a EventRef>,
}

impl Range for TimelineRange<'_> {
    fn advance(&mut self) -> bool {
        self.current = self.nodes.next();
        self.current.is_some()
    }

    fn event(&self) -> Option<&EventRef> {
        self.current
    }
}
