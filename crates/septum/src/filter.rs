//! Event predicates used by [`filter_by`](crate::filter_by) and pipeline
//! segments.

use crate::event::Event;

/// Decides whether an event is selected.
///
/// Implemented for every `Fn(&Event) -> bool`, so closures can be passed
/// wherever a filter is expected.
pub trait Filter {
    /// Returns `true` if the event is selected.
    fn accept(&self, event: &Event) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Event) -> bool,
{
    fn accept(&self, event: &Event) -> bool {
        self(event)
    }
}

/// Filter that selects every event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptAll;

impl Filter for AcceptAll {
    fn accept(&self, _event: &Event) -> bool {
        true
    }
}

/// Filter that selects events of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFilter {
    kind: String,
}

impl KindFilter {
    /// Creates a filter matching `kind` exactly.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

impl Filter for KindFilter {
    fn accept(&self, event: &Event) -> bool {
        event.kind() == self.kind
    }
}
