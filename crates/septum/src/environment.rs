//! Clock and event id source consumed by the [`Nexus`](crate::Nexus).
//!
//! The environment is an explicit value handed to the Nexus constructor. It
//! is created once before first use and must stay alive as long as the
//! Nexus holding it. There is no process-wide instance.

use chrono::{DateTime, Duration, Utc};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Abstracts the current time and event id generation.
pub trait Environment {
    /// Returns the current time in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the next event id.
    ///
    /// Ids are strictly increasing and never reused, also under concurrent
    /// callers.
    fn next_event_id(&self) -> u64;
}

impl<E: Environment + ?Sized> Environment for &E {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn next_event_id(&self) -> u64 {
        (**self).next_event_id()
    }
}

impl<E: Environment + ?Sized> Environment for Rc<E> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn next_event_id(&self) -> u64 {
        (**self).next_event_id()
    }
}

impl<E: Environment + ?Sized> Environment for Arc<E> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn next_event_id(&self) -> u64 {
        (**self).next_event_id()
    }
}

/// Wall-clock environment with an atomic id counter.
#[derive(Debug, Default)]
pub struct SystemEnvironment {
    next_event_id: AtomicU64,
}

impl SystemEnvironment {
    /// Creates an environment whose first event id is `seed + 1`.
    pub fn new(seed: u64) -> Self {
        Self {
            next_event_id: AtomicU64::new(seed),
        }
    }
}

impl Environment for SystemEnvironment {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn next_event_id(&self) -> u64 {
        self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Environment with a manually driven clock.
///
/// Useful for tests and for embedders that replay events against their own
/// notion of time.
#[derive(Debug)]
pub struct ManualEnvironment {
    now: Mutex<DateTime<Utc>>,
    next_event_id: AtomicU64,
}

impl ManualEnvironment {
    /// Creates an environment frozen at `now` whose first event id is
    /// `seed + 1`.
    pub fn new(now: DateTime<Utc>, seed: u64) -> Self {
        Self {
            now: Mutex::new(now),
            next_event_id: AtomicU64::new(seed),
        }
    }

    /// Sets the current time.
    pub fn set_now(&self, now: DateTime<Utc>) {
        let mut current = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *current = now;
    }

    /// Moves the clock forward (or backward, for a negative `delta`).
    pub fn advance(&self, delta: Duration) {
        let mut current = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *current += delta;
    }
}

impl Environment for ManualEnvironment {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn next_event_id(&self) -> u64 {
        self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    #[test]
    fn test_system_environment_ids_start_above_seed() {
        let env = SystemEnvironment::new(41);
        assert_eq!(env.next_event_id(), 42);
        assert_eq!(env.next_event_id(), 43);
    }

    #[test]
    fn test_system_environment_default_seed() {
        let env = SystemEnvironment::default();
        assert_eq!(env.next_event_id(), 1);
    }

    #[test]
    fn test_system_environment_now_is_current() {
        let env = SystemEnvironment::default();
        let before = Utc::now();
        let now = env.now();
        assert!(now >= before);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let env = Arc::new(SystemEnvironment::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let env = Arc::clone(&env);
                thread::spawn(move || (0..250).map(|_| env.next_event_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 1000);
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&1000));
    }

    #[test]
    fn test_manual_environment_clock() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let env = ManualEnvironment::new(start, 0);
        assert_eq!(env.now(), start);

        env.advance(Duration::seconds(90));
        assert_eq!(env.now(), start + Duration::seconds(90));

        env.set_now(start);
        assert_eq!(env.now(), start);
    }

    #[test]
    fn test_environment_through_references() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let env = Rc::new(ManualEnvironment::new(start, 10));
        let shared = Rc::clone(&env);
        assert_eq!(shared.next_event_id(), 11);
        assert_eq!((&*env).next_event_id(), 12);
    }
}
