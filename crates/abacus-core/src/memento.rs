//! History snapshots used by undo and redo

use crate::calculation::Calculation;

/// Immutable copy of the history at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    history: Vec<Calculation>,
}

impl HistorySnapshot {
    /// Captures a value copy of `history`
    pub fn capture(history: &[Calculation]) -> Self {
        Self { history: history.to_vec() }
    }

    pub fn history(&self) -> &[Calculation] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Consumes the snapshot, yielding the stored history
    pub fn into_history(self) -> Vec<Calculation> {
        self.history
    }
}
