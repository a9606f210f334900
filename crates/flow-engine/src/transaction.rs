//! Hierarchical transactions with savepoints.
//!
//! Transactions live in an arena and refer to each other by `TransactionId`,
//! so a parent and its children never own one another. The manager tracks
//! the innermost open transaction; `begin` opens a child of it and `end`
//! makes its parent active again. The arena is cleared when the outermost
//! transaction ends.

use crate::error::{EngineError, Result};
use flow_core::{ActionType, FlowStateUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedUpdate {
    pub update: FlowStateUpdate,
    pub action_type: ActionType,
}

/// A transaction's queue folded into one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedUpdates {
    pub merged_update: FlowStateUpdate,
    pub commands_count: usize,
    /// Distinct action types in first-queued order.
    pub action_types: Vec<ActionType>,
}

#[derive(Debug)]
struct TransactionRecord {
    name: String,
    parent: Option<TransactionId>,
    children: Vec<TransactionId>,
    queue: Vec<QueuedUpdate>,
    /// Savepoint names with the queue length they recorded, oldest first.
    savepoints: Vec<(String, usize)>,
    rolled_back: bool,
    ended: bool,
}

#[derive(Debug, Default)]
pub struct TransactionManager {
    records: Vec<TransactionRecord>,
    active: Option<TransactionId>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction as a child of the active one, and make it active.
    pub fn begin(&mut self, name: &str) -> TransactionId {
        let id = TransactionId(self.records.len());
        let parent = self.active;
        self.records.push(TransactionRecord {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            queue: Vec::new(),
            savepoints: Vec::new(),
            rolled_back: false,
            ended: false,
        });
        if let Some(parent) = parent {
            self.records[parent.0].children.push(id);
        }
        self.active = Some(id);
        log::debug!("transaction '{name}' begin (depth {})", self.depth(id));
        id
    }

    pub fn active(&self) -> Option<TransactionId> {
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn name(&self, id: TransactionId) -> &str {
        self.records.get(id.0).map_or("", |r| r.name.as_str())
    }

    pub fn parent(&self, id: TransactionId) -> Option<TransactionId> {
        self.records.get(id.0).and_then(|r| r.parent)
    }

    fn depth(&self, id: TransactionId) -> usize {
        std::iter::successors(Some(id), |t| self.parent(*t)).count()
    }

    fn record_mut(&mut self, id: TransactionId) -> Result<&mut TransactionRecord> {
        self.records
            .get_mut(id.0)
            .ok_or_else(|| EngineError::TransactionRolledBack(format!("#{}", id.0)))
    }

    pub fn queue_update(
        &mut self,
        id: TransactionId,
        update: FlowStateUpdate,
        action_type: ActionType,
    ) -> Result<()> {
        let record = self.record_mut(id)?;
        if record.rolled_back || record.ended {
            return Err(EngineError::TransactionRolledBack(record.name.clone()));
        }
        record.queue.push(QueuedUpdate {
            update,
            action_type,
        });
        Ok(())
    }

    /// Record the current queue length under `name`. Re-adding a name
    /// moves it to the current position.
    pub fn add_savepoint(&mut self, id: TransactionId, name: &str) -> Result<()> {
        let record = self.record_mut(id)?;
        if record.rolled_back || record.ended {
            return Err(EngineError::TransactionRolledBack(record.name.clone()));
        }
        record.savepoints.retain(|(n, _)| n != name);
        let len = record.queue.len();
        record.savepoints.push((name.to_string(), len));
        Ok(())
    }

    /// Truncate the queue to the savepoint's length and forget every
    /// savepoint recorded after it.
    pub fn rollback_to_savepoint(&mut self, id: TransactionId, name: &str) -> Result<()> {
        let record = self.record_mut(id)?;
        let Some(index) = record.savepoints.iter().position(|(n, _)| n == name) else {
            return Err(EngineError::UnknownSavepoint(name.to_string()));
        };
        let len = record.savepoints[index].1;
        record.queue.truncate(len);
        record.savepoints.truncate(index + 1);
        log::debug!("transaction '{}' rolled back to '{name}'", record.name);
        Ok(())
    }

    /// Discard the queue of `id` and of every transaction nested in it.
    pub fn rollback(&mut self, id: TransactionId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(record) = self.records.get_mut(current.0) else {
                continue;
            };
            record.rolled_back = true;
            record.queue.clear();
            record.savepoints.clear();
            pending.extend(record.children.iter().copied());
        }
        log::debug!("transaction '{}' rolled back", self.name(id));
    }

    pub fn is_rolled_back(&self, id: TransactionId) -> bool {
        self.records.get(id.0).is_some_and(|r| r.rolled_back)
    }

    /// Own queue non-empty, or any live child has changes.
    pub fn has_changes(&self, id: TransactionId) -> bool {
        let Some(record) = self.records.get(id.0) else {
            return false;
        };
        if record.rolled_back {
            return false;
        }
        let live = |child: &TransactionId| self.records.get(child.0).is_some_and(|c| !c.ended);
        !record.queue.is_empty()
            || record
                .children
                .iter()
                .any(|child| live(child) && self.has_changes(*child))
    }

    pub fn queue(&self, id: TransactionId) -> &[QueuedUpdate] {
        self.records
            .get(id.0)
            .map(|r| r.queue.as_slice())
            .unwrap_or_default()
    }

    pub fn merged_updates(&self, id: TransactionId) -> MergedUpdates {
        let Some(record) = self.records.get(id.0).filter(|r| !r.rolled_back) else {
            return MergedUpdates::default();
        };
        let mut merged = MergedUpdates {
            commands_count: record.queue.len(),
            ..Default::default()
        };
        for queued in &record.queue {
            merged.merged_update.merge(queued.update.clone());
            if !merged.action_types.contains(&queued.action_type) {
                merged.action_types.push(queued.action_type);
            }
        }
        merged
    }

    /// Updates queued along the active chain, outermost first. This is what
    /// a command emitted now would see on top of the committed state.
    pub fn pending_updates(&self) -> Vec<&FlowStateUpdate> {
        let mut chain: Vec<TransactionId> =
            std::iter::successors(self.active, |t| self.parent(*t)).collect();
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|id| self.records.get(id.0))
            .flat_map(|r| r.queue.iter().map(|q| &q.update))
            .collect()
    }

    /// Replay this queue onto the parent's. No-op when rolled back or top-level.
    pub fn merge_to_parent(&mut self, id: TransactionId) -> Result<()> {
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        if self.is_rolled_back(id) {
            return Ok(());
        }
        let queue = std::mem::take(&mut self.record_mut(id)?.queue);
        let parent_record = self.record_mut(parent)?;
        if parent_record.rolled_back || parent_record.ended {
            return Err(EngineError::TransactionRolledBack(parent_record.name.clone()));
        }
        parent_record.queue.extend(queue);
        Ok(())
    }

    /// Close `id`. Its parent becomes active again; closing the outermost
    /// transaction clears the arena.
    pub fn end(&mut self, id: TransactionId) {
        let parent = self.parent(id);
        if let Some(record) = self.records.get_mut(id.0) {
            record.ended = true;
        }
        self.active = parent;
        if parent.is_none() {
            self.records.clear();
        }
    }
}
