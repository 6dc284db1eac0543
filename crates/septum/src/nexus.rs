//! Nexus - owner of all timelines and the timer queue.
//!
//! The [`Nexus`] maps timeline ids to [`Timeline`]s, creating them on first
//! reference and never dropping them, and keeps one extra timeline as the
//! global timer queue.
//!
//! # Timer Events
//!
//! [`Nexus::add_timer`] admits an event into its timeline like
//! [`Nexus::add_event`] and then links the same event into the timer queue
//! through a second, independent node:
//!
//! ```text
//! timeline 7:  ... → [e] → ...        (removed by Nexus::remove)
//! timer queue: ... → [e] → ...        (removed by Nexus::remove_expired_timer)
//! ```
//!
//! Removing the event from its timeline leaves the timer node in place, so
//! the event can still be reported as expired later.
//!
//! # Example
//!
//! ```rust,ignore
//! use septum::{Nexus, SystemEnvironment};
//!
//! let mut nexus = Nexus::new(SystemEnvironment::default());
//! let event = nexus.add_timer(7, deadline, "Timeout", Vec::new());
//!
//! if let Some(expired) = nexus.remove_expired_timer(Utc::now()) {
//!     nexus.remove(&expired);
//! }
//! ```

use crate::environment::{Environment, SystemEnvironment};
use crate::event::{Event, EventData, EventRef, Timestamp};
use crate::range::Ranger;
use crate::timeline::Timeline;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Id of the internal timer queue; never valid for user events.
pub const TIMER_QUEUE_ID: u64 = 0;

/// Default initial node capacity of a newly created timeline.
pub const DEFAULT_TIMELINE_CAPACITY: usize = 16;

/// Default initial node capacity of the timer queue.
pub const DEFAULT_TIMER_CAPACITY: usize = 64;

/// Configuration for a [`Nexus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NexusConfig {
    /// Initial node capacity reserved for each timeline on creation.
    ///
    /// Timelines grow past this as needed. Default: 16.
    pub timeline_capacity: usize,

    /// Initial node capacity reserved for the timer queue. Default: 64.
    pub timer_capacity: usize,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            timeline_capacity: DEFAULT_TIMELINE_CAPACITY,
            timer_capacity: DEFAULT_TIMER_CAPACITY,
        }
    }
}

impl NexusConfig {
    /// Sets the initial capacity of new timelines.
    pub fn with_timeline_capacity(mut self, capacity: usize) -> Self {
        self.timeline_capacity = capacity;
        self
    }

    /// Sets the initial capacity of the timer queue.
    pub fn with_timer_capacity(mut self, capacity: usize) -> Self {
        self.timer_capacity = capacity;
        self
    }
}

/// Snapshot of Nexus occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NexusStats {
    /// Number of timelines created so far.
    pub timelines: usize,
    /// Events across all timelines.
    pub events: usize,
    /// Nodes in the timer queue.
    pub timers: usize,
}

/// Brings all timelines and the timer queue together.
///
/// Not thread-safe: callers sharing a Nexus across threads must provide
/// their own locking.
pub struct Nexus<E: Environment = SystemEnvironment> {
    environment: E,
    timelines: HashMap<u64, Timeline>,
    timers: Timeline,
    config: NexusConfig,
}

impl<E: Environment> Nexus<E> {
    /// Creates a Nexus with the default configuration.
    pub fn new(environment: E) -> Self {
        Self::with_config(environment, NexusConfig::default())
    }

    /// Creates a Nexus with a custom configuration.
    pub fn with_config(environment: E, config: NexusConfig) -> Self {
        Self {
            environment,
            timelines: HashMap::new(),
            timers: Timeline::with_capacity(TIMER_QUEUE_ID, config.timer_capacity),
            config,
        }
    }

    /// Returns the environment.
    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// Returns the configuration.
    pub fn config(&self) -> &NexusConfig {
        &self.config
    }

    /// Returns the timeline for `timeline_id`, creating it if needed.
    ///
    /// # Panics
    ///
    /// Panics if `timeline_id` is 0, which is reserved for the timer queue.
    pub fn timeline(&mut self, timeline_id: u64) -> &Timeline {
        check_timeline_id(timeline_id);
        self.timeline_mut(timeline_id)
    }

    /// Returns the timeline for `timeline_id` if it has been created.
    pub fn find_timeline(&self, timeline_id: u64) -> Option<&Timeline> {
        self.timelines.get(&timeline_id)
    }

    /// Returns the timer queue, earliest deadline first.
    pub fn timers(&self) -> &Timeline {
        &self.timers
    }

    /// Adds a new event to the indicated timeline.
    ///
    /// The event id and receive time come from the environment.
    ///
    /// # Panics
    ///
    /// Panics if `timeline_id` is 0.
    pub fn add_event(
        &mut self,
        timeline_id: u64,
        timestamp: impl Into<Timestamp>,
        kind: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> EventRef {
        check_timeline_id(timeline_id);
        let event = Rc::new(Event::new(
            self.environment.next_event_id(),
            timeline_id,
            kind,
            timestamp,
            self.environment.now(),
            data,
        ));
        self.timeline_mut(timeline_id).insert(Rc::clone(&event));
        event
    }

    /// Adds a new event to the indicated timeline and to the timer queue.
    ///
    /// # Panics
    ///
    /// Panics if `timeline_id` is 0.
    pub fn add_timer(
        &mut self,
        timeline_id: u64,
        timestamp: impl Into<Timestamp>,
        kind: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> EventRef {
        let event = self.add_event(timeline_id, timestamp, kind, data);
        trace!("Registering timer for event {}", event.id());
        self.timers.insert(Rc::clone(&event));
        event
    }

    /// Adds an event described by `data`. See [`Nexus::add_event`].
    pub fn add_event_data(&mut self, data: EventData) -> EventRef {
        self.add_event(data.timeline, data.timestamp, data.kind, data.data)
    }

    /// Adds a timer event described by `data`. See [`Nexus::add_timer`].
    pub fn add_timer_data(&mut self, data: EventData) -> EventRef {
        self.add_timer(data.timeline, data.timestamp, data.kind, data.data)
    }

    /// Returns the timer with the earliest deadline without removing it.
    pub fn peek_next_timer(&self) -> Option<&EventRef> {
        self.timers.first()
    }

    /// Removes and returns the earliest timer if `now` is strictly after its
    /// timestamp.
    ///
    /// Only the timer-queue node is removed; the event stays in its
    /// timeline.
    pub fn remove_expired_timer(&mut self, now: DateTime<Utc>) -> Option<EventRef> {
        let now: Timestamp = now.into();
        let head = self.timers.first()?;
        if now > *head.timestamp() {
            let expired = self.timers.pop_front()?;
            debug!(
                "Timer expired: event {} on timeline {} at {}",
                expired.id(),
                expired.timeline(),
                expired.timestamp()
            );
            return Some(expired);
        }
        None
    }

    /// Removes every timer that has expired at `now`, earliest first.
    pub fn drain_expired_timers(&mut self, now: DateTime<Utc>) -> Vec<EventRef> {
        let mut expired = Vec::new();
        while let Some(event) = self.remove_expired_timer(now) {
            expired.push(event);
        }
        expired
    }

    /// Removes the event from its timeline.
    ///
    /// The timer queue is not touched. Returns `false` if the event is not
    /// (or no longer) in its timeline.
    pub fn remove(&mut self, event: &Event) -> bool {
        // Lookup only: a timeline that was never created holds no events, so
        // creating it here would only add an empty entry to stats().
        match self.timelines.get_mut(&event.timeline()) {
            Some(timeline) => timeline.remove_by_id(event.id()),
            None => false,
        }
    }

    /// Removes every event yielded by one traversal of `source` from its
    /// timeline. Returns the number of events removed.
    pub fn remove_range<R: Ranger + ?Sized>(&mut self, source: &R) -> usize {
        let mut count = 0;
        let mut cursor = source.range();
        while cursor.advance() {
            if let Some(event) = cursor.event() {
                if self.remove(event) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Returns current occupancy figures.
    pub fn stats(&self) -> NexusStats {
        NexusStats {
            timelines: self.timelines.len(),
            events: self.timelines.values().map(Timeline::len).sum(),
            timers: self.timers.len(),
        }
    }

    fn timeline_mut(&mut self, timeline_id: u64) -> &mut Timeline {
        let capacity = self.config.timeline_capacity;
        self.timelines.entry(timeline_id).or_insert_with(|| {
            debug!("Creating timeline {}", timeline_id);
            Timeline::with_capacity(timeline_id, capacity)
        })
    }
}

fn check_timeline_id(timeline_id: u64) {
    if timeline_id == TIMER_QUEUE_ID {
        panic!(
            "Invalid timeline id: {} is reserved for the timer queue",
            timeline_id
        );
    }
}
