//! The engine facade.
//!
//! `FlowCore` owns the model adapter, the middleware chain, the routing
//! manager and the command handler, and drives the data flow:
//!
//! - **Command → Update**: `emit` resolves a command against the current
//!   state into a `FlowStateUpdate` plus its action type.
//! - **Update → Pipeline**: the update runs through the middleware chain,
//!   which may rewrite or cancel it.
//! - **Pipeline → Model**: the final state is written to the model in one
//!   `set_state`, the diff is computed and subscribers are notified.
//!
//! Inside a transaction the resolved updates are queued instead, and the
//! merged result goes through the pipeline once when the outermost
//! transaction finishes. Transactions hold `&mut FlowCore`, so no other
//! command can interleave with an open one.

use crate::commands::{Command, CommandHandler};
use crate::config::FlowConfig;
use crate::error::Result;
use crate::history::{CommitLog, HistoryEntry};
use crate::middleware::{ChainOutcome, MiddlewareChain, MiddlewareContext};
use crate::model::{InMemoryModel, ModelAdapter};
use crate::transaction::{TransactionId, TransactionManager};
use flow_core::routing::{EdgeRouting, EdgeRoutingManager};
use flow_core::{ActionType, Difference, EdgeId, FlowState, FlowStateUpdate, Point, diff_states};
use serde_json::Value;

pub type SubscriptionId = usize;

/// Delivered to subscribers after every commit, undo and redo.
#[derive(Debug, Clone, Copy)]
pub struct CommitEvent<'a> {
    pub final_state: &'a FlowState,
    pub diff: &'a [Difference],
    pub action_types: &'a [ActionType],
    /// Committed updates, oldest first, including this one.
    pub history: &'a [HistoryEntry],
}

type Subscriber = Box<dyn FnMut(&CommitEvent<'_>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    Committed,
    /// Queued in the active transaction.
    Queued,
    /// A middleware cancelled the command.
    Cancelled { by: String },
    /// The command had nothing to change.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    /// Nested transaction folded into its parent.
    Merged,
    RolledBack,
    Cancelled { by: String },
    /// Finished without queueing anything.
    Empty,
}

pub struct FlowCore {
    config: FlowConfig,
    model: Box<dyn ModelAdapter>,
    middlewares: MiddlewareChain,
    routing: EdgeRoutingManager,
    handler: CommandHandler,
    transactions: TransactionManager,
    history: CommitLog,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
}

impl FlowCore {
    /// Engine over an empty in-memory model.
    pub fn new(config: FlowConfig) -> Self {
        let state = FlowState::new(
            Vec::new(),
            Vec::new(),
            config.initial_metadata.clone().unwrap_or_default(),
        );
        let model = InMemoryModel::new(state, config.history_depth);
        Self::with_model(config, model)
    }

    pub fn with_model(config: FlowConfig, model: impl ModelAdapter + 'static) -> Self {
        Self {
            routing: EdgeRoutingManager::new(&config.routing),
            handler: CommandHandler::new(config.clone()),
            history: CommitLog::new(config.history_depth),
            config,
            model: Box::new(model),
            middlewares: MiddlewareChain::default(),
            transactions: TransactionManager::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Replace the middleware chain, e.g. with one from `create_middlewares`.
    pub fn with_middlewares(mut self, middlewares: MiddlewareChain) -> Self {
        self.middlewares = middlewares;
        self
    }

    /// Run an empty `Init` update through the pipeline so middlewares can
    /// normalize a freshly loaded state (edges get routed, for instance).
    pub fn init(&mut self) -> Result<EmitOutcome> {
        self.run_pipeline(FlowStateUpdate::default(), vec![ActionType::Init])
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn emit(&mut self, command: Command) -> Result<EmitOutcome> {
        if let Some(id) = self.transactions.active() {
            return self.emit_in(id, command);
        }
        let name = command.name();
        let Some((update, action)) = self.handler.resolve(self.model.state(), command)? else {
            log::debug!("'{name}' changed nothing");
            return Ok(EmitOutcome::Skipped);
        };
        self.run_pipeline(update, vec![action])
    }

    /// `emit` for a command given by wire name and JSON payload.
    pub fn emit_named(&mut self, name: &str, payload: Value) -> Result<EmitOutcome> {
        self.emit(Command::from_named(name, payload)?)
    }

    fn emit_in(&mut self, id: TransactionId, command: Command) -> Result<EmitOutcome> {
        let pending = self.pending_state();
        match self.handler.resolve(&pending, command)? {
            Some((update, action)) => {
                self.transactions.queue_update(id, update, action)?;
                Ok(EmitOutcome::Queued)
            }
            None => Ok(EmitOutcome::Skipped),
        }
    }

    /// The model state with every update queued along the active
    /// transaction chain applied.
    fn pending_state(&self) -> FlowState {
        let mut state = self.model.state().clone();
        for update in self.transactions.pending_updates() {
            state.apply(update);
        }
        state
    }

    fn run_pipeline(
        &mut self,
        update: FlowStateUpdate,
        action_types: Vec<ActionType>,
    ) -> Result<EmitOutcome> {
        let initial_state = self.model.state().clone();
        let ctx = MiddlewareContext::new(
            &initial_state,
            &update,
            self.history.entries(),
            &action_types,
            &initial_state.metadata.middlewares_config,
            &self.routing,
        );
        match self.middlewares.execute(ctx)? {
            ChainOutcome::Cancelled(by) => Ok(EmitOutcome::Cancelled { by }),
            ChainOutcome::Proceed { update, state } => {
                self.commit(&initial_state, update, state, action_types)?;
                Ok(EmitOutcome::Committed)
            }
        }
    }

    fn commit(
        &mut self,
        previous: &FlowState,
        update: FlowStateUpdate,
        state: FlowState,
        action_types: Vec<ActionType>,
    ) -> Result<()> {
        let diff = diff_states(previous, &state)?;
        log::debug!("commit {action_types:?}: {} differences", diff.len());
        self.model.set_state(state);
        self.history.push(HistoryEntry {
            update,
            action_types: action_types.clone(),
        });
        self.notify(&diff, &action_types);
        Ok(())
    }

    fn notify(&mut self, diff: &[Difference], action_types: &[ActionType]) {
        let event = CommitEvent {
            final_state: self.model.state(),
            diff,
            action_types,
            history: self.history.entries(),
        };
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&event);
        }
    }

    // ─── Transactions ────────────────────────────────────────────────────

    /// Run `f` as a transaction. Commands emitted through the scope are
    /// queued; when `f` returns `Ok` at the top level the merged update is
    /// committed through the pipeline in one step. An `Err` rolls the
    /// transaction back and is returned unchanged.
    pub fn transaction<F>(&mut self, name: &str, f: F) -> Result<TransactionOutcome>
    where
        F: FnOnce(&mut TransactionScope<'_>) -> Result<()>,
    {
        let id = self.transactions.begin(name);
        let result = f(&mut TransactionScope { core: self, id });
        if let Err(e) = result {
            log::debug!("transaction '{name}' failed: {e}");
            self.transactions.rollback(id);
            self.transactions.end(id);
            return Err(e);
        }
        if self.transactions.is_rolled_back(id) {
            self.transactions.end(id);
            return Ok(TransactionOutcome::RolledBack);
        }
        if self.transactions.parent(id).is_some() {
            let merged = self.transactions.merge_to_parent(id);
            self.transactions.end(id);
            merged?;
            return Ok(TransactionOutcome::Merged);
        }

        let merged = self.transactions.merged_updates(id);
        self.transactions.end(id);
        if merged.commands_count == 0 {
            return Ok(TransactionOutcome::Empty);
        }
        log::debug!(
            "transaction '{name}' commit: {} commands {:?}",
            merged.commands_count,
            merged.action_types
        );
        Ok(
            match self.run_pipeline(merged.merged_update, merged.action_types)? {
                EmitOutcome::Cancelled { by } => TransactionOutcome::Cancelled { by },
                _ => TransactionOutcome::Committed,
            },
        )
    }

    // ─── Undo / redo ─────────────────────────────────────────────────────

    /// Restore the state before the last commit. Returns `false` when the
    /// model has nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        self.step_history(ActionType::Undo)
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.step_history(ActionType::Redo)
    }

    fn step_history(&mut self, action: ActionType) -> Result<bool> {
        let before = self.model.state().clone();
        let stepped = match action {
            ActionType::Redo => self.model.redo(),
            _ => self.model.undo(),
        };
        if !stepped {
            return Ok(false);
        }
        let diff = diff_states(&before, self.model.state())?;
        self.notify(&diff, &[action]);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.model.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.model.can_redo()
    }

    // ─── Subscriptions ───────────────────────────────────────────────────

    pub fn subscribe(&mut self, f: impl FnMut(&CommitEvent<'_>) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn state(&self) -> &FlowState {
        self.model.state()
    }

    pub fn model(&self) -> &dyn ModelAdapter {
        self.model.as_ref()
    }

    /// Direct model access. Changes made here skip the pipeline.
    pub fn model_mut(&mut self) -> &mut dyn ModelAdapter {
        self.model.as_mut()
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.names()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn routing(&self) -> &EdgeRoutingManager {
        &self.routing
    }

    pub fn routing_mut(&mut self) -> &mut EdgeRoutingManager {
        &mut self.routing
    }

    pub fn register_routing(&mut self, routing: impl EdgeRouting + 'static) {
        self.routing.register_routing(routing);
    }

    /// SVG path of an edge through its routing.
    pub fn edge_path(&self, id: EdgeId) -> Option<String> {
        self.routing.path_for(self.model.state(), id)
    }

    /// Point at `percentage` (0..1) along an edge.
    pub fn edge_point_at(&self, id: EdgeId, percentage: f64) -> Option<Point> {
        self.model
            .state()
            .edge(id)
            .map(|edge| self.routing.compute_point_on_path(edge, percentage))
    }

    /// Tear down the model and drop every subscriber.
    pub fn destroy(&mut self) {
        self.subscribers.clear();
        self.history.clear();
        self.model.destroy();
    }
}

impl Default for FlowCore {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

// ─── Transaction scope ───────────────────────────────────────────────────

/// Handle passed to a transaction callback.
pub struct TransactionScope<'a> {
    core: &'a mut FlowCore,
    id: TransactionId,
}

impl TransactionScope<'_> {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.core.transactions.name(self.id)
    }

    /// Resolve `command` against the pending state and queue its update.
    pub fn emit(&mut self, command: Command) -> Result<EmitOutcome> {
        self.core.emit_in(self.id, command)
    }

    pub fn emit_named(&mut self, name: &str, payload: Value) -> Result<EmitOutcome> {
        self.emit(Command::from_named(name, payload)?)
    }

    /// Queue a raw update, bypassing the command handler.
    pub fn queue(&mut self, update: FlowStateUpdate, action_type: ActionType) -> Result<()> {
        self.core.transactions.queue_update(self.id, update, action_type)
    }

    pub fn add_savepoint(&mut self, name: &str) -> Result<()> {
        self.core.transactions.add_savepoint(self.id, name)
    }

    pub fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.core.transactions.rollback_to_savepoint(self.id, name)
    }

    /// Discard everything queued here and in nested transactions. Later
    /// emits through this scope fail with `TransactionRolledBack`.
    pub fn rollback(&mut self) {
        self.core.transactions.rollback(self.id);
    }

    pub fn has_changes(&self) -> bool {
        self.core.transactions.has_changes(self.id)
    }

    pub fn queued(&self) -> usize {
        self.core.transactions.queue(self.id).len()
    }

    /// The state commands in this scope are resolved against.
    pub fn state(&self) -> FlowState {
        self.core.pending_state()
    }

    /// Open a nested transaction. On success it merges into this one.
    pub fn transaction<F>(&mut self, name: &str, f: F) -> Result<TransactionOutcome>
    where
        F: FnOnce(&mut TransactionScope<'_>) -> Result<()>,
    {
        self.core.transaction(name, f)
    }
}
