use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::debug;

use crate::cue::Cue;
use crate::error::{Result, SubweaveError};

pub const DEFAULT_CAPACITY: usize = 100;

/// Deep copy of a cue list taken before a mutation
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub cues: Vec<Cue>,
    pub taken_at: DateTime<Utc>,
}

/// Bounded undo stack of timeline snapshots
///
/// Callers push the pre-mutation state. When full, the oldest snapshot is
/// dropped. Snapshots are owned copies: later edits to the timeline never
/// reach them.
#[derive(Debug)]
pub struct HistoryStack {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStack {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a copy of `cues`
    pub fn push(&mut self, cues: &[Cue]) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            debug!("History full, dropped oldest snapshot");
        }
        self.entries.push_back(Snapshot {
            cues: cues.to_vec(),
            taken_at: Utc::now(),
        });
    }

    /// Undo one step
    ///
    /// Discards the newest snapshot and returns a copy of the one below it,
    /// which stays on the stack. When nothing is left after the discard the
    /// result is [`SubweaveError::HistoryEmpty`] and the caller keeps its
    /// current state.
    pub fn pop_and_restore(&mut self) -> Result<Vec<Cue>> {
        self.entries.pop_back();

        match self.entries.back() {
            Some(snapshot) => {
                debug!(
                    "Restoring snapshot of {} cues taken at {}",
                    snapshot.cues.len(),
                    snapshot.taken_at.to_rfc3339()
                );
                Ok(snapshot.cues.clone())
            }
            None => Err(SubweaveError::HistoryEmpty),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues(label: &str) -> Vec<Cue> {
        vec![Cue::new("00:00:01.000", "00:00:02.000", label)]
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut history = HistoryStack::default();
        for i in 0..101 {
            history.push(&cues(&i.to_string()));
        }
        assert_eq!(history.len(), 100);

        // Unwind to the bottom: snapshot "0" was evicted, so "1" is the last one restored
        let mut last = None;
        while let Ok(restored) = history.pop_and_restore() {
            last = Some(restored[0].text.clone());
        }
        assert_eq!(last.as_deref(), Some("1"));
    }

    #[test]
    fn test_empty_history() {
        let mut history = HistoryStack::new(10);
        assert!(matches!(history.pop_and_restore(), Err(SubweaveError::HistoryEmpty)));
    }

    #[test]
    fn test_single_snapshot_cannot_be_restored() {
        let mut history = HistoryStack::new(10);
        history.push(&cues("a"));
        assert!(matches!(history.pop_and_restore(), Err(SubweaveError::HistoryEmpty)));
        assert!(history.is_empty());
    }

    #[test]
    fn test_restore_keeps_top_on_stack() {
        let mut history = HistoryStack::new(10);
        history.push(&cues("a"));
        history.push(&cues("b"));
        history.push(&cues("c"));

        assert_eq!(history.pop_and_restore().unwrap()[0].text, "b");
        assert_eq!(history.len(), 2);
        assert_eq!(history.pop_and_restore().unwrap()[0].text, "a");
        assert_eq!(history.len(), 1);
        assert!(history.pop_and_restore().is_err());
    }

    #[test]
    fn test_snapshots_are_isolated() {
        let mut history = HistoryStack::new(10);
        let mut live = cues("before");
        history.push(&live);
        history.push(&live);

        live[0].text = "after".to_string();
        assert_eq!(history.pop_and_restore().unwrap()[0].text, "before");
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let history = HistoryStack::new(0);
        assert_eq!(history.capacity(), 1);
    }
}
