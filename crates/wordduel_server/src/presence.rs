//! Live per-mode connection counts.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use strum::IntoEnumIterator;
use tracing::{debug, instrument, warn};
use wordduel::GameMode;

/// Counts open match connections per mode.
#[derive(Debug, Clone)]
pub struct Presence {
    counts: Arc<Mutex<BTreeMap<GameMode, usize>>>,
}

impl Presence {
    /// Creates a tracker with every mode at zero.
    pub fn new() -> Self {
        Self {
            counts: Arc::new(Mutex::new(GameMode::iter().map(|mode| (mode, 0)).collect())),
        }
    }

    /// Records a new connection.
    #[instrument(skip(self))]
    pub fn connect(&self, mode: GameMode) {
        self.update(mode, |count| count + 1);
    }

    /// Records a closed connection.
    #[instrument(skip(self))]
    pub fn disconnect(&self, mode: GameMode) {
        self.update(mode, |count| count.saturating_sub(1));
    }

    /// Current counts for every mode.
    pub fn snapshot(&self) -> BTreeMap<GameMode, usize> {
        match self.counts.lock() {
            Ok(counts) => counts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Current count for one mode.
    pub fn count(&self, mode: GameMode) -> usize {
        self.snapshot().get(&mode).copied().unwrap_or(0)
    }

    fn update(&self, mode: GameMode, f: impl FnOnce(usize) -> usize) {
        let mut counts = match self.counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => {
                warn!("Presence lock poisoned");
                poisoned.into_inner()
            }
        };
        let count = counts.entry(mode).or_insert(0);
        *count = f(*count);
        debug!(%mode, count = *count, "Presence updated");
    }
}

impl Default for Presence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_mode() {
        let presence = Presence::new();
        presence.connect(GameMode::Coop);
        presence.connect(GameMode::Coop);
        presence.connect(GameMode::Race);
        presence.disconnect(GameMode::Coop);

        assert_eq!(presence.count(GameMode::Coop), 1);
        assert_eq!(presence.count(GameMode::Race), 1);
    }

    #[test]
    fn test_never_goes_negative() {
        let presence = Presence::new();
        presence.disconnect(GameMode::Race);
        assert_eq!(presence.count(GameMode::Race), 0);
        assert_eq!(presence.snapshot().len(), 2);
    }
}
