//! Commit history and snapshot undo/redo.
//!
//! Every commit replaces the whole state, so undo keeps the state before
//! and after each commit and swaps snapshots instead of computing inverse
//! updates.

use flow_core::{ActionType, FlowState, FlowStateUpdate};

/// A committed update, as seen by middlewares through `MiddlewareContext::history`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub update: FlowStateUpdate,
    pub action_types: Vec<ActionType>,
}

/// Bounded log of committed updates, oldest first.
#[derive(Debug, Clone)]
pub struct CommitLog {
    entries: Vec<HistoryEntry>,
    max_len: usize,
}

impl CommitLog {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_len,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.max_len {
            self.entries.remove(0);
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    before: FlowState,
    after: FlowState,
}

/// Undo/redo stacks of whole-state snapshots.
#[derive(Debug, Clone)]
pub struct UndoStack {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    /// Maximum undo depth.
    max_depth: usize,
}

impl UndoStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Record one transition. Clears the redo stack.
    pub fn record(&mut self, before: FlowState, after: FlowState) {
        self.undo_stack.push(Snapshot { before, after });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// The state to restore for undo, if any.
    pub fn undo(&mut self) -> Option<&FlowState> {
        let snapshot = self.undo_stack.pop()?;
        self.redo_stack.push(snapshot);
        self.redo_stack.last().map(|s| &s.before)
    }

    /// The state to restore for redo, if any.
    pub fn redo(&mut self) -> Option<&FlowState> {
        let snapshot = self.redo_stack.pop()?;
        self.undo_stack.push(snapshot);
        self.undo_stack.last().map(|s| &s.after)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
