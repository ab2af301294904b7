//! Snapshot-based undo/redo.
//!
//! Snapshots are [`Graph`] clones. Nodes and edges sit behind `Rc`, so a
//! snapshot costs one pointer per element and only elements mutated
//! afterwards are ever copied.

use crate::error::HistoryError;
use crate::graph::Graph;
use std::collections::VecDeque;
use tracing::{debug, warn};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo: VecDeque<Graph>,
    redo: Vec<Graph>,
    capacity: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryManager {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the state of `graph` before a mutation is applied.
    pub fn record(&mut self, graph: &Graph) {
        self.push(graph.snapshot());
    }

    /// Push a snapshot taken before a mutation. Clears the redo stack and drops
    /// the oldest entry once the capacity is exceeded.
    pub fn push(&mut self, snapshot: Graph) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        self.redo.clear();
        debug!(undo = self.undo.len(), "history snapshot pushed");
    }

    /// Restore the most recent snapshot into `live`, moving the current state
    /// onto the redo stack.
    ///
    /// A snapshot failing its integrity check is discarded and `live` is left
    /// untouched.
    pub fn undo(&mut self, live: &mut Graph) -> Result<(), HistoryError> {
        let snapshot = self.undo.pop_back().ok_or(HistoryError::NothingToUndo)?;
        if let Err(err) = snapshot.check_integrity() {
            warn!(%err, "discarding corrupt undo snapshot");
            return Err(HistoryError::CorruptSnapshot(err));
        }
        self.redo.push(std::mem::replace(live, snapshot));
        Ok(())
    }

    /// Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self, live: &mut Graph) -> Result<(), HistoryError> {
        let snapshot = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        if let Err(err) = snapshot.check_integrity() {
            warn!(%err, "discarding corrupt redo snapshot");
            return Err(HistoryError::CorruptSnapshot(err));
        }
        self.undo.push_back(std::mem::replace(live, snapshot));
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
