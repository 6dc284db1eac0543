//! Pipeline - ordered, mutable chain of event processing steps.
//!
//! Each segment pairs a [`Filter`] with a [`Process`] step. Processing an
//! event walks the chain in order; a segment whose filter accepts the event
//! runs its step, and the first step error aborts the walk and is returned
//! to the caller unchanged.
//!
//! Segments are addressed by [`SegmentId`] handles and can be inserted after
//! any segment, appended at the end or deleted while the pipeline is in use.
//!
//! # Example
//!
//! ```rust,ignore
//! use septum::{Event, KindFilter, Pipeline};
//!
//! let mut pipeline: Pipeline<String> = Pipeline::new(|e: &Event| -> Result<(), String> {
//!     println!("saw {}", e.kind());
//!     Ok(())
//! });
//! pipeline.append_filtered(KindFilter::new("Alarm"), |_: &Event| -> Result<(), String> {
//!     Err("alarm raised".to_string())
//! });
//!
//! pipeline.process(&event)?;
//! ```

use crate::error::PipelineError;
use crate::event::Event;
use crate::filter::{AcceptAll, Filter};
use crate::node::{NodeId, NodeList};
use tracing::debug;

/// A processing step.
///
/// Implemented for every `FnMut(&Event) -> Result<(), E>`.
pub trait Process<E> {
    /// Processes the event.
    fn process(&mut self, event: &Event) -> Result<(), E>;
}

impl<E, F> Process<E> for F
where
    F: FnMut(&Event) -> Result<(), E>,
{
    fn process(&mut self, event: &Event) -> Result<(), E> {
        self(event)
    }
}

/// Handle to one segment of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(NodeId);

struct Segment<E> {
    filter: Box<dyn Filter>,
    process: Box<dyn Process<E>>,
}

/// Ordered chain of (filter, process) segments.
///
/// `E` is the error type of the process steps.
pub struct Pipeline<E = Box<dyn std::error::Error + Send + Sync>> {
    segments: NodeList<Segment<E>>,
}

impl<E> Default for Pipeline<E> {
    fn default() -> Self {
        Self {
            segments: NodeList::new(),
        }
    }
}

impl<E> Pipeline<E> {
    /// Creates a pipeline whose first step accepts every event.
    pub fn new<P>(process: P) -> Self
    where
        P: Process<E> + 'static,
    {
        Self::new_filtered(AcceptAll, process)
    }

    /// Creates a pipeline whose first step is filtered.
    pub fn new_filtered<F, P>(filter: F, process: P) -> Self
    where
        F: Filter + 'static,
        P: Process<E> + 'static,
    {
        let mut pipeline = Self::default();
        pipeline.append_filtered(filter, process);
        pipeline
    }

    /// Returns the first segment.
    pub fn head(&self) -> Option<SegmentId> {
        self.segments.head().map(SegmentId)
    }

    /// Returns the segment following `segment`, or `None` at the end (or if
    /// `segment` has been deleted).
    pub fn next(&self, segment: SegmentId) -> Option<SegmentId> {
        self.segments.next(segment.0).map(SegmentId)
    }

    /// Returns `true` if `segment` is still part of this pipeline.
    pub fn contains(&self, segment: SegmentId) -> bool {
        self.segments.contains(segment.0)
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the pipeline has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends an unfiltered step at the end of the pipeline.
    pub fn append<P>(&mut self, process: P) -> SegmentId
    where
        P: Process<E> + 'static,
    {
        self.append_filtered(AcceptAll, process)
    }

    /// Appends a filtered step at the end of the pipeline.
    pub fn append_filtered<F, P>(&mut self, filter: F, process: P) -> SegmentId
    where
        F: Filter + 'static,
        P: Process<E> + 'static,
    {
        SegmentId(self.segments.push_back(Segment::new(filter, process)))
    }

    /// Inserts an unfiltered step immediately after `segment`.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is not part of this pipeline.
    pub fn insert_after<P>(&mut self, segment: SegmentId, process: P) -> SegmentId
    where
        P: Process<E> + 'static,
    {
        self.insert_after_filtered(segment, AcceptAll, process)
    }

    /// Inserts a filtered step immediately after `segment`.
    ///
    /// # Panics
    ///
    /// Panics if `segment` is not part of this pipeline.
    pub fn insert_after_filtered<F, P>(
        &mut self,
        segment: SegmentId,
        filter: F,
        process: P,
    ) -> SegmentId
    where
        F: Filter + 'static,
        P: Process<E> + 'static,
    {
        match self
            .segments
            .insert_after(segment.0, Segment::new(filter, process))
        {
            Some(node) => SegmentId(node),
            None => panic!("Segment {:?} is not part of this pipeline", segment),
        }
    }

    /// Removes `segment`, splicing its neighbours together.
    ///
    /// Returns `false` if the segment was already deleted.
    pub fn delete(&mut self, segment: SegmentId) -> bool {
        self.segments.unlink(segment.0).is_some()
    }

    /// Runs the event through every segment, from the first to the last.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MissingEvent` if `event` is `None`, or
    /// `PipelineError::Step` with the error of the first failing step.
    /// Steps after a failing step do not run.
    pub fn process<'e>(
        &mut self,
        event: impl Into<Option<&'e Event>>,
    ) -> Result<(), PipelineError<E>> {
        let start = self.segments.head();
        self.run(start, event.into())
    }

    /// Runs the event through `start` and every segment after it.
    ///
    /// # Panics
    ///
    /// Panics if `start` is not part of this pipeline.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::process`].
    pub fn process_from<'e>(
        &mut self,
        start: SegmentId,
        event: impl Into<Option<&'e Event>>,
    ) -> Result<(), PipelineError<E>> {
        if !self.segments.contains(start.0) {
            panic!("Segment {:?} is not part of this pipeline", start);
        }
        self.run(Some(start.0), event.into())
    }

    fn run(
        &mut self,
        start: Option<NodeId>,
        event: Option<&Event>,
    ) -> Result<(), PipelineError<E>> {
        let event = event.ok_or(PipelineError::MissingEvent)?;

        let mut cursor = start;
        while let Some(node) = cursor {
            if let Some(segment) = self.segments.get_mut(node) {
                if segment.filter.accept(event) {
                    if let Err(err) = segment.process.process(event) {
                        debug!("Pipeline step failed for event {}, aborting", event.id());
                        return Err(PipelineError::Step(err));
                    }
                }
            }
            cursor = self.segments.next(node);
        }
        Ok(())
    }
}

impl<E> Segment<E> {
    fn new<F, P>(filter: F, process: P) -> Self
    where
        F: Filter + 'static,
        P: Process<E> + 'static,
    {
        Self {
            filter: Box::new(filter),
            process: Box::new(process),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::KindFilter;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct StepError(&'static str);

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn event(kind: &str) -> Event {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Event::new(1, 1, kind, ts, ts, Vec::new())
    }

    fn record(log: &Log, name: &'static str) -> impl FnMut(&Event) -> Result<(), StepError> {
        let log = Rc::clone(log);
        move |_: &Event| {
            log.borrow_mut().push(name);
            Ok(())
        }
    }

    fn fail(log: &Log, name: &'static str) -> impl FnMut(&Event) -> Result<(), StepError> {
        let log = Rc::clone(log);
        move |_: &Event| {
            log.borrow_mut().push(name);
            Err(StepError(name))
        }
    }

    #[test]
    fn test_runs_steps_in_order() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "one"));
        pipeline.append(record(&log, "two"));
        pipeline.append(record(&log, "three"));

        pipeline.process(&event("Any")).unwrap();
        assert_eq!(*log.borrow(), vec!["one", "two", "three"]);
        assert_eq!(pipeline.len(), 3);
    }

    #[test]
    fn test_failing_step_aborts_chain() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "one"));
        pipeline.append(fail(&log, "two"));
        pipeline.append(record(&log, "three"));

        let err = pipeline.process(&event("Any")).unwrap_err();
        assert_eq!(err, PipelineError::Step(StepError("two")));
        assert_eq!(*log.borrow(), vec!["one", "two"]);
    }

    #[test]
    fn test_missing_event() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "one"));
        assert_eq!(pipeline.process(None::<&Event>), Err(PipelineError::MissingEvent));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_filtered_steps_skip_rejected_events() {
        let log = Log::default();
        let mut pipeline = Pipeline::new_filtered(KindFilter::new("Alarm"), record(&log, "alarm"));
        pipeline.append(record(&log, "all"));
        pipeline.append_filtered(|e: &Event| e.kind() == "Tick", record(&log, "tick"));

        pipeline.process(&event("Tick")).unwrap();
        assert_eq!(*log.borrow(), vec!["all", "tick"]);

        log.borrow_mut().clear();
        pipeline.process(&event("Alarm")).unwrap();
        assert_eq!(*log.borrow(), vec!["alarm", "all"]);
    }

    #[test]
    fn test_rejected_failing_step_does_not_abort() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "one"));
        pipeline.append_filtered(KindFilter::new("Never"), fail(&log, "boom"));
        pipeline.append(record(&log, "three"));

        assert!(pipeline.process(&event("Any")).is_ok());
        assert_eq!(*log.borrow(), vec!["one", "three"]);
    }

    #[test]
    fn test_insert_after_and_next() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "a"));
        let c = pipeline.append(record(&log, "c"));
        let a = pipeline.head().unwrap();
        let b = pipeline.insert_after(a, record(&log, "b"));
        let d = pipeline.insert_after_filtered(c, KindFilter::new("Any"), record(&log, "d"));

        assert_eq!(pipeline.next(a), Some(b));
        assert_eq!(pipeline.next(b), Some(c));
        assert_eq!(pipeline.next(c), Some(d));
        assert_eq!(pipeline.next(d), None);

        pipeline.process(&event("Any")).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_delete_splices_neighbours() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "a"));
        let b = pipeline.append(record(&log, "b"));
        let c = pipeline.append(record(&log, "c"));
        let a = pipeline.head().unwrap();

        assert!(pipeline.delete(b));
        assert!(!pipeline.delete(b));
        assert!(!pipeline.contains(b));
        assert_eq!(pipeline.next(a), Some(c));

        pipeline.process(&event("Any")).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "c"]);
    }

    #[test]
    fn test_delete_head_moves_head() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "a"));
        let b = pipeline.append(record(&log, "b"));
        let a = pipeline.head().unwrap();

        pipeline.delete(a);
        assert_eq!(pipeline.head(), Some(b));

        pipeline.delete(b);
        assert!(pipeline.is_empty());
        assert!(pipeline.process(&event("Any")).is_ok());

        let c = pipeline.append(record(&log, "c"));
        assert_eq!(pipeline.head(), Some(c));
    }

    #[test]
    fn test_process_from_middle() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "a"));
        let b = pipeline.append(record(&log, "b"));
        pipeline.append(record(&log, "c"));

        pipeline.process_from(b, &event("Any")).unwrap();
        assert_eq!(*log.borrow(), vec!["b", "c"]);
    }

    #[test]
    #[should_panic(expected = "not part of this pipeline")]
    fn test_insert_after_deleted_segment_panics() {
        let log = Log::default();
        let mut pipeline = Pipeline::new(record(&log, "a"));
        let b = pipeline.append(record(&log, "b"));
        pipeline.delete(b);
        pipeline.insert_after(b, record(&log, "c"));
    }

    #[test]
    fn test_steps_can_mutate_captured_state() {
        let mut pipeline: Pipeline<StepError> = Pipeline::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        pipeline.append(move |e: &Event| -> Result<(), StepError> {
            sink.borrow_mut().push(e.kind().to_string());
            Ok(())
        });

        pipeline.process(&event("First")).unwrap();
        pipeline.process(&event("Second")).unwrap();
        assert_eq!(*seen.borrow(), vec!["First", "Second"]);
    }

    #[test]
    fn test_boxed_error_default() {
        type BoxError = Box<dyn std::error::Error + Send + Sync>;
        let mut pipeline: Pipeline = Pipeline::new(|_: &Event| -> Result<(), BoxError> {
            Err("disk full".into())
        });
        let err = pipeline.process(&event("Any")).unwrap_err();
        assert_eq!(err.to_string(), "Pipeline step failed: disk full");
    }
}
