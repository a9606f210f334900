//! The model boundary: the owned state plus change notification.
//!
//! Rendering layers depend only on `ModelAdapter`. The engine reads the
//! current state from it and writes each committed state back through
//! `set_state`; nothing else in the engine mutates the model.

use crate::history::UndoStack;
use flow_core::{CoreError, Edge, FlowState, Metadata, Node};

pub type ListenerId = usize;

/// Called with the new state after every change.
pub type ChangeListener = Box<dyn FnMut(&FlowState)>;

pub trait ModelAdapter {
    fn state(&self) -> &FlowState;

    /// Replace the whole state and notify listeners.
    fn set_state(&mut self, state: FlowState);

    fn on_change(&mut self, listener: ChangeListener) -> ListenerId;

    /// Returns `false` when `id` was not registered.
    fn unregister_on_change(&mut self, id: ListenerId) -> bool;

    /// Restore the previous state. Returns `false` when there is nothing to undo.
    fn undo(&mut self) -> bool;

    fn redo(&mut self) -> bool;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Drop listeners and history. The state stays readable.
    fn destroy(&mut self);

    fn nodes(&self) -> &[Node] {
        &self.state().nodes
    }

    fn edges(&self) -> &[Edge] {
        &self.state().edges
    }

    fn metadata(&self) -> &Metadata {
        &self.state().metadata
    }

    fn update_nodes(&mut self, f: &mut dyn FnMut(&[Node]) -> Vec<Node>) {
        let nodes = f(&self.state().nodes);
        let mut next = self.state().clone();
        next.nodes = nodes;
        self.set_state(next);
    }

    fn update_edges(&mut self, f: &mut dyn FnMut(&[Edge]) -> Vec<Edge>) {
        let edges = f(&self.state().edges);
        let mut next = self.state().clone();
        next.edges = edges;
        self.set_state(next);
    }

    fn set_metadata(&mut self, f: &mut dyn FnMut(&Metadata) -> Metadata) {
        let metadata = f(&self.state().metadata);
        let mut next = self.state().clone();
        next.metadata = metadata;
        self.set_state(next);
    }

    fn to_json(&self) -> Result<String, CoreError> {
        self.state().to_json()
    }
}

// ─── In-memory model ─────────────────────────────────────────────────────

/// A `ModelAdapter` holding the state in memory with snapshot undo.
pub struct InMemoryModel {
    state: FlowState,
    history: UndoStack,
    listeners: Vec<(ListenerId, ChangeListener)>,
    next_listener: ListenerId,
}

impl InMemoryModel {
    pub fn new(state: FlowState, history_depth: usize) -> Self {
        Self {
            state,
            history: UndoStack::new(history_depth),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn from_json(json: &str, history_depth: usize) -> Result<Self, CoreError> {
        Ok(Self::new(FlowState::from_json(json)?, history_depth))
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.state);
        }
    }
}

impl Default for InMemoryModel {
    fn default() -> Self {
        Self::new(FlowState::default(), 100)
    }
}

impl ModelAdapter for InMemoryModel {
    fn state(&self) -> &FlowState {
        &self.state
    }

    fn set_state(&mut self, state: FlowState) {
        if state == self.state {
            return;
        }
        let before = std::mem::replace(&mut self.state, state);
        self.history.record(before, self.state.clone());
        self.notify();
    }

    fn on_change(&mut self, listener: ChangeListener) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unregister_on_change(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo().cloned() else {
            return false;
        };
        self.state = previous;
        self.notify();
        true
    }

    fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo().cloned() else {
            return false;
        };
        self.state = next;
        self.notify();
        true
    }

    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn destroy(&mut self) {
        self.listeners.clear();
        self.history.clear();
    }
}
