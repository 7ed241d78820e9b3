//! Pending deadlines, at most one per holder.
//!
//! The table is the only source of truth for which timers exist. Drivers ask
//! [`Deadlines::next_due`] when to wake up and the session calls
//! [`Deadlines::take_due`] when they do, so a deadline that was replaced or
//! cancelled simply is not there to fire.

use crate::PlayerId;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, instrument};

/// Deadline table keyed by the player who must act.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deadlines {
    pending: BTreeMap<PlayerId, Instant>,
}

impl Deadlines {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `holder`'s deadline, cancelling any previous one for that holder.
    ///
    /// Returns the cancelled instant, if any.
    #[instrument(skip(self))]
    pub fn arm(&mut self, holder: &str, at: Instant) -> Option<Instant> {
        let replaced = self.pending.insert(holder.to_string(), at);
        if replaced.is_some() {
            debug!(holder, "Replaced pending deadline");
        }
        replaced
    }

    /// Cancels every deadline, then sets `holder`'s.
    ///
    /// Used when only one player may hold a deadline at a time.
    #[instrument(skip(self))]
    pub fn arm_exclusive(&mut self, holder: &str, at: Instant) {
        self.pending.clear();
        self.pending.insert(holder.to_string(), at);
    }

    /// Cancels every deadline.
    pub fn disarm_all(&mut self) {
        self.pending.clear();
    }

    /// The pending deadline for `holder`.
    pub fn get(&self, holder: &str) -> Option<Instant> {
        self.pending.get(holder).copied()
    }

    /// Number of pending deadlines.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when no deadline is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The earliest pending instant.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Removes and returns every holder whose deadline is at or before `now`.
    ///
    /// Ordered by instant, ties broken by holder id.
    #[instrument(skip(self))]
    pub fn take_due(&mut self, now: Instant) -> Vec<PlayerId> {
        let mut due: Vec<(Instant, PlayerId)> = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(holder, at)| (*at, holder.clone()))
            .collect();
        due.sort();

        for (_, holder) in &due {
            self.pending.remove(holder);
        }

        due.into_iter().map(|(_, holder)| holder).collect()
    }
}
