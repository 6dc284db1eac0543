//! Septum - In-Process Event Timeline Engine
//!
//! This crate keeps timestamped events in per-id timelines, schedules timers,
//! and routes events through mutable processing pipelines.
//!
//! # Components
//!
//! - [`Event`]: Immutable timestamped record with a compact binary encoding
//! - [`Timeline`]: Chronologically ordered event list
//! - [`Nexus`]: Registry of timelines plus the timer queue
//! - [`Ranger`] / [`Range`]: Restartable cursors, lazily filtered with [`filter_by`]
//! - [`Pipeline`]: Ordered chain of filtered processing steps
//!
//! # Example
//!
//! ```rust,ignore
//! use septum::{filter_by, to_slice, Event, Nexus, Pipeline};
//!
//! let mut nexus = Nexus::new(SystemEnvironment::default());
//! nexus.add_event(1, now, "DoorOpened", b"front".to_vec());
//! nexus.add_timer(1, now + Duration::seconds(30), "DoorTimeout", Vec::new());
//!
//! // Select every door event of timeline 1
//! let doors = to_slice(&filter_by(nexus.timeline(1), |e: &Event| e.kind().starts_with("Door")));
//!
//! // Fire due timers through a pipeline
//! let mut pipeline: Pipeline<String> = Pipeline::new(|e: &Event| -> Result<(), String> {
//!     println!("timer {} fired", e.kind());
//!     Ok(())
//! });
//! for timer in nexus.drain_expired_timers(Utc::now()) {
//!     pipeline.process(&*timer)?;
//! }
//! ```

#![deny(missing_docs)]

pub mod environment;
pub mod error;
pub mod event;
pub mod filter;
pub mod nexus;
mod node;
pub mod pipeline;
pub mod range;
pub mod timeline;

pub use environment::{Environment, ManualEnvironment, SystemEnvironment};
pub use error::{EventError, PipelineError, Result};
pub use event::{Event, EventData, EventRef, EventView, Timestamp};
pub use filter::{AcceptAll, Filter, KindFilter};
pub use nexus::{Nexus, NexusConfig, NexusStats, TIMER_QUEUE_ID};
pub use pipeline::{Pipeline, Process, SegmentId};
pub use range::{filter_by, to_range, to_slice, Events, Range, Ranger, SliceRanger, Where};
pub use timeline::Timeline;
