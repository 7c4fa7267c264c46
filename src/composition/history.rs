//! Composition history — a linear version list with truncate-on-branch.
//!
//! Pushing while positioned in the past discards everything after the
//! current entry, the same way an editor's undo history branches.

use std::time::{SystemTime, UNIX_EPOCH};

use super::Composition;

const MAX_HISTORY_DEPTH: usize = 100;

/// One saved version of the composition.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub description: String,
    pub state: Composition,
}

/// Linear version history of a composition.
#[derive(Debug, Clone, Default)]
pub struct CompositionHistory {
    entries: Vec<HistoryEntry>,
    index: Option<usize>,
}

impl CompositionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new version and make it current. Drops any redo entries.
    pub fn push(&mut self, state: Composition, description: impl Into<String>) {
        self.push_at(state, description, now_ms());
    }

    /// Record a new version with an explicit timestamp.
    pub fn push_at(&mut self, state: Composition, description: impl Into<String>, timestamp_ms: u64) {
        let keep = self.index.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push(HistoryEntry {
            timestamp_ms,
            description: description.into(),
            state,
        });
        if self.entries.len() > MAX_HISTORY_DEPTH {
            self.entries.remove(0);
        }
        self.index = Some(self.entries.len() - 1);
    }

    /// Jump to a specific version. Returns `None` if `index` is out of range.
    pub fn restore(&mut self, index: usize) -> Option<&Composition> {
        if index >= self.entries.len() {
            return None;
        }
        self.index = Some(index);
        Some(&self.entries[index].state)
    }

    /// Step back one version.
    pub fn undo(&mut self) -> Option<&Composition> {
        let previous = self.index?.checked_sub(1)?;
        self.restore(previous)
    }

    /// Step forward one version.
    pub fn redo(&mut self) -> Option<&Composition> {
        let next = self.index? + 1;
        self.restore(next)
    }

    /// The current version, if any.
    pub fn current(&self) -> Option<&Composition> {
        self.index.map(|i| &self.entries[i].state)
    }

    /// Position of the current version.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// All recorded versions, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::test_fixture::composition;

    fn version(bpm: u32) -> Composition {
        composition(bpm, vec![])
    }

    #[test]
    fn new_history_is_empty() {
        let history = CompositionHistory::new();
        assert!(history.is_empty());
        assert!(history.current().is_none());
        assert_eq!(history.index(), None);
    }

    #[test]
    fn push_moves_to_latest() {
        let mut history = CompositionHistory::new();
        history.push(version(100), "Initial Generation");
        history.push(version(110), "Manual Edit");
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), Some(1));
        assert_eq!(history.current().unwrap().bpm, 110);
    }

    #[test]
    fn undo_and_redo() {
        let mut history = CompositionHistory::new();
        history.push(version(100), "a");
        history.push(version(110), "b");

        assert_eq!(history.undo().unwrap().bpm, 100);
        assert!(history.undo().is_none());
        assert_eq!(history.redo().unwrap().bpm, 110);
        assert!(history.redo().is_none());
    }

    #[test]
    fn push_after_restore_truncates_future() {
        let mut history = CompositionHistory::new();
        history.push_at(version(100), "a", 1);
        history.push_at(version(110), "b", 2);
        history.push_at(version(120), "c", 3);

        history.restore(0).unwrap();
        history.push_at(version(90), "branch", 4);

        assert_eq!(history.len(), 2);
        let descriptions: Vec<&str> = history
            .entries()
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["a", "branch"]);
        assert_eq!(history.current().unwrap().bpm, 90);
    }

    #[test]
    fn restore_out_of_range() {
        let mut history = CompositionHistory::new();
        history.push(version(100), "a");
        assert!(history.restore(3).is_none());
        assert_eq!(history.index(), Some(0));
    }

    #[test]
    fn depth_is_capped() {
        let mut history = CompositionHistory::new();
        for i in 0..(MAX_HISTORY_DEPTH as u32 + 10) {
            history.push_at(version(60 + i), format!("v{i}"), i as u64);
        }
        assert_eq!(history.len(), MAX_HISTORY_DEPTH);
        assert_eq!(history.entries()[0].description, "v10");
        assert_eq!(history.index(), Some(MAX_HISTORY_DEPTH - 1));
    }
}
