//! Minimal discrete-event scheduling interface and a reference event list.
//!
//! Arrival processes only need to schedule, cancel and reschedule their own
//! next-arrival event; the event loop that pops events and dispatches them
//! belongs to the caller. [`EventList`] is a small ordered implementation
//! used by the replication driver and the tests.
use std::collections::{BTreeMap, HashMap};

/// Handle of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

/// Simulation clock plus event scheduling.
pub trait Scheduler {
    /// Current simulation time.
    fn now(&self) -> f64;

    /// Schedule an event `delay ≥ 0` time units from now.
    fn schedule(&mut self, delay: f64) -> EventId;

    /// Cancel a pending event; returns `false` if it was not pending.
    fn cancel(&mut self, id: EventId) -> bool;

    /// Move a pending event to `delay` from now; returns `false` if it was
    /// not pending.
    fn reschedule(&mut self, id: EventId, delay: f64) -> bool;

    /// Absolute time of a pending event.
    fn event_time(&self, id: EventId) -> Option<f64>;
}

/// Time-ordered event list with FIFO tie-breaking.
///
/// Times are non-negative, so their IEEE bit patterns order like the
/// values themselves and serve as `BTreeMap` keys.
#[derive(Debug, Clone, Default)]
pub struct EventList {
    now: f64,
    next_seq: u64,
    queue: BTreeMap<(u64, u64), EventId>,
    keys: HashMap<EventId, (u64, u64)>,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every pending event and rewind the clock to zero.
    pub fn reset(&mut self) {
        self.now = 0.0;
        self.queue.clear();
        self.keys.clear();
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<f64> {
        self.queue.keys().next().map(|&(bits, _)| f64::from_bits(bits))
    }

    /// Remove the earliest event and advance the clock to its time.
    pub fn pop(&mut self) -> Option<(f64, EventId)> {
        let (&key, &id) = self.queue.iter().next()?;
        self.queue.remove(&key);
        self.keys.remove(&id);
        self.now = f64::from_bits(key.0);
        Some((self.now, id))
    }

    /// Advance the clock without firing anything; `time` must not precede
    /// the current clock or the earliest pending event.
    pub fn advance_to(&mut self, time: f64) {
        debug_assert!(time >= self.now);
        self.now = time;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn insert(&mut self, id: EventId, time: f64) {
        let key = (time.max(0.0).to_bits(), self.next_seq);
        self.next_seq += 1;
        self.queue.insert(key, id);
        self.keys.insert(id, key);
    }
}

impl Scheduler for EventList {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule(&mut self, delay: f64) -> EventId {
        let id = EventId(self.next_seq);
        self.insert(id, self.now + delay.max(0.0));
        id
    }

    fn cancel(&mut self, id: EventId) -> bool {
        match self.keys.remove(&id) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    fn reschedule(&mut self, id: EventId, delay: f64) -> bool {
        if !self.cancel(id) {
            return false;
        }
        self.insert(id, self.now + delay.max(0.0));
        true
    }

    fn event_time(&self, id: EventId) -> Option<f64> {
        self.keys.get(&id).map(|&(bits, _)| f64::from_bits(bits))
    }
}
