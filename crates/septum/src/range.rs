//! Restartable iteration over ordered event sequences.
//!
//! A [`Ranger`] is anything that can hand out a fresh [`Range`] cursor:
//! timelines, the timer queue, plain slices ([`to_range`]) and lazily
//! filtered views ([`filter_by`]). Every call to [`Ranger::range`] starts an
//! independent traversal from the beginning.
//!
//! # Cursor Protocol
//!
//! ```text
//! let mut cursor = ranger.range();
//! while cursor.advance() {
//!     let event = cursor.event();   // Some(..) after a true advance()
//! }
//! // cursor.event() is None again once advance() returned false
//! ```
//!
//! A cursor borrows its source, so the source cannot be mutated while a
//! traversal is in progress.

use crate::event::EventRef;
use crate::filter::Filter;

/// Cursor over an ordered event sequence.
pub trait Range {
    /// Moves to the next event. Returns `false` once the sequence is
    /// exhausted.
    fn advance(&mut self) -> bool;

    /// Returns the current event.
    ///
    /// `None` before the first [`Range::advance`] and after an `advance`
    /// that returned `false`.
    fn event(&self) -> Option<&EventRef>;
}

/// Source of [`Range`] cursors.
pub trait Ranger {
    /// Returns a fresh cursor positioned before the first event.
    fn range(&self) -> Box<dyn Range + '_>;

    /// Adapts a fresh cursor into a standard iterator of shared events.
    fn events(&self) -> Events<'_> {
        Events {
            inner: self.range(),
        }
    }
}

impl<R: Ranger + ?Sized> Ranger for &R {
    fn range(&self) -> Box<dyn Range + '_> {
        (**self).range()
    }
}

/// Iterator over the events of one traversal. See [`Ranger::events`].
pub struct Events<'a> {
    inner: Box<dyn Range + 'a>,
}

impl Iterator for Events<'_> {
    type Item = EventRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.inner.advance() {
            self.inner.event().cloned()
        } else {
            None
        }
    }
}

/// Drains one traversal of `source` into a vector, in order.
pub fn to_slice<R: Ranger + ?Sized>(source: &R) -> Vec<EventRef> {
    let mut events = Vec::with_capacity(4);
    let mut cursor = source.range();
    while cursor.advance() {
        if let Some(event) = cursor.event() {
            events.push(EventRef::clone(event));
        }
    }
    events
}

/// Adapts a slice of events into a [`Ranger`].
pub fn to_range(events: &[EventRef]) -> SliceRanger<'_> {
    SliceRanger { events }
}

/// Creates a [`Ranger`] yielding only the events of `source` accepted by
/// `filter`.
///
/// Filtering is lazy: nothing is materialized, source order is kept and the
/// filter runs at most once per source event.
pub fn filter_by<S: Ranger, F: Filter>(source: S, filter: F) -> Where<S, F> {
    Where { source, filter }
}

/// [`Ranger`] over a borrowed slice. See [`to_range`].
#[derive(Debug, Clone, Copy)]
pub struct SliceRanger<'a> {
    events: &'a [EventRef],
}

impl Ranger for SliceRanger<'_> {
    fn range(&self) -> Box<dyn Range + '_> {
        Box::new(SliceRange {
            events: self.events,
            next: 0,
            current: None,
        })
    }
}

struct SliceRange<'a> {
    events: &'a [EventRef],
    next: usize,
    current: Option<&'a EventRef>,
}

impl Range for SliceRange<'_> {
    fn advance(&mut self) -> bool {
        self.current = self.events.get(self.next);
        if self.current.is_some() {
            self.next += 1;
        }
        self.current.is_some()
    }

    fn event(&self) -> Option<&EventRef> {
        self.current
    }
}

/// Lazily filtered [`Ranger`]. See [`filter_by`].
pub struct Where<S, F> {
    source: S,
    filter: F,
}

impl<S: Ranger, F: Filter> Ranger for Where<S, F> {
    fn range(&self) -> Box<dyn Range + '_> {
        Box::new(WhereRange {
            inner: self.source.range(),
            filter: &self.filter,
            matched: false,
        })
    }
}

struct WhereRange<'a, F> {
    inner: Box<dyn Range + 'a>,
    filter: &'a F,
    matched: bool,
}

impl<F: Filter> Range for WhereRange<'_, F> {
    fn advance(&mut self) -> bool {
        while self.inner.advance() {
            if let Some(event) = self.inner.event() {
                if self.filter.accept(event) {
                    self.matched = true;
                    return true;
                }
            }
        }
        self.matched = false;
        false
    }

    fn event(&self) -> Option<&EventRef> {
        if self.matched {
            self.inner.event()
        } else {
            None
        }
    }
}
