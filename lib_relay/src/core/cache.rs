//! # Observation Cache
//!
//! Prevents duplicate updates within a single relay instance. The sink
//! cannot cheaply dedupe on its side, so we memoize the last faction list
//! delivered per (date, system) and only resend when it changes.
//!
//! The cache is date-scoped: it only ever holds entries for one date, and
//! observing any other date wipes it. That is a deliberately crude TTL — it
//! assumes the relay runs continuously close to real time, and it bounds
//! memory by discarding all history whenever a day boundary is crossed
//! (which is also when the upstream tick makes prior data authoritative).

use std::collections::HashMap;

use crate::journal::event::Faction;

/// Date-scoped memo of the last delivered faction list per system.
#[derive(Debug, Default)]
pub struct ObservationCache {
    /// The single date the entries below belong to.
    date: Option<String>,
    entries: HashMap<String, Vec<Faction>>,
}

impl ObservationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `snapshot` for (`date`, `system`) differs from what
    /// was last committed, i.e. the observation should be delivered.
    ///
    /// A date other than the held one evicts every existing entry before
    /// reporting a miss.
    pub fn should_send(&mut self, date: &str, system: &str, snapshot: &[Faction]) -> bool {
        if self.date.as_deref() != Some(date) {
            self.entries.clear();
            self.date = Some(date.to_owned());
            return true;
        }
        match self.entries.get(system) {
            None => true,
            Some(cached) => cached != snapshot,
        }
    }

    /// Records `snapshot` as delivered for (`date`, `system`).
    ///
    /// A commit whose date no longer matches the held date is silently
    /// dropped; the next `should_send` for that key reports a miss, which
    /// at worst costs one redundant delivery, never a lost one.
    pub fn commit(&mut self, date: &str, system: &str, snapshot: Vec<Faction>) {
        if self.date.as_deref() == Some(date) {
            self.entries.insert(system.to_owned(), snapshot);
        }
    }

    /// Number of systems memoized for the held date.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
