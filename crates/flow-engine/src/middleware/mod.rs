//! Middleware pipeline.
//!
//! A command's proposed update passes through an ordered chain of
//! middlewares before it is committed. Each one may rewrite the update, then
//! either lets the chain continue (`Flow::Proceed`) or discards the whole
//! command (`Flow::Cancel`). Returning an error aborts the command and
//! reaches the caller of `emit`. Nothing is applied to the model until the
//! last middleware has proceeded.

mod edges_routing;
mod group_children_move;
mod logger;
mod read_only;
mod snap;

pub use edges_routing::EdgesRoutingMiddleware;
pub use group_children_move::GroupChildrenMoveMiddleware;
pub use logger::LoggerMiddleware;
pub use read_only::ReadOnlyMiddleware;
pub use snap::{NodePositionSnapMiddleware, NodeRotationSnapMiddleware};

use crate::error::Result;
use crate::history::HistoryEntry;
use flow_core::routing::EdgeRoutingManager;
use flow_core::{ActionType, FlowState, FlowStateUpdate, MiddlewaresConfig, NodeId};
use std::collections::HashSet;

/// What a middleware decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Proceed,
    Cancel,
}

/// Everything a middleware may look at, and the update it may rewrite.
pub struct MiddlewareContext<'a> {
    /// Committed state before this command.
    pub initial_state: &'a FlowState,
    /// `initial_state` with the current `update` applied. Refreshed after
    /// each middleware proceeds.
    pub state: FlowState,
    /// The update as the command produced it.
    pub initial_update: &'a FlowStateUpdate,
    /// The proposal being shaped by the chain.
    pub update: FlowStateUpdate,
    /// Previously committed updates, oldest first.
    pub history: &'a [HistoryEntry],
    pub action_types: &'a [ActionType],
    pub config: &'a MiddlewaresConfig,
    pub routing: &'a EdgeRoutingManager,
}

impl<'a> MiddlewareContext<'a> {
    pub fn new(
        initial_state: &'a FlowState,
        initial_update: &'a FlowStateUpdate,
        history: &'a [HistoryEntry],
        action_types: &'a [ActionType],
        config: &'a MiddlewaresConfig,
        routing: &'a EdgeRoutingManager,
    ) -> Self {
        Self {
            initial_state,
            state: initial_state.applied(initial_update),
            initial_update,
            update: initial_update.clone(),
            history,
            action_types,
            config,
            routing,
        }
    }

    pub fn is_action(&self, action: ActionType) -> bool {
        self.action_types.contains(&action)
    }

    /// Nodes added, removed or patched by the current proposal.
    pub fn touched_node_ids(&self) -> HashSet<NodeId> {
        self.update.touched_node_ids()
    }

    /// Append to the proposal and refresh `state`.
    pub fn merge_update(&mut self, extra: FlowStateUpdate) {
        if extra.is_empty() {
            return;
        }
        self.state.apply(&extra);
        self.update.merge(extra);
    }
}

pub trait Middleware {
    fn name(&self) -> &str;

    fn execute(&self, ctx: &mut MiddlewareContext<'_>) -> Result<Flow>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Proceed {
        update: FlowStateUpdate,
        state: FlowState,
    },
    /// Name of the middleware that cancelled.
    Cancelled(String),
}

// ─── Chain ───────────────────────────────────────────────────────────────

/// Middlewares in execution order.
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn execute(&self, mut ctx: MiddlewareContext<'_>) -> Result<ChainOutcome> {
        for middleware in &self.middlewares {
            let name = middleware.name();
            log::trace!("middleware '{name}' for {:?}", ctx.action_types);
            match middleware.execute(&mut ctx)? {
                Flow::Proceed => {
                    ctx.state = ctx.initial_state.applied(&ctx.update);
                }
                Flow::Cancel => {
                    log::debug!("middleware '{name}' cancelled {:?}", ctx.action_types);
                    return Ok(ChainOutcome::Cancelled(name.to_string()));
                }
            }
        }
        Ok(ChainOutcome::Proceed {
            update: ctx.update,
            state: ctx.state,
        })
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        MiddlewareList::defaults().build()
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────

/// Ordered list builder that splices custom middlewares around the
/// built-ins by name.
pub struct MiddlewareList {
    items: Vec<Box<dyn Middleware>>,
}

impl MiddlewareList {
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// `readOnly`, `nodeRotationSnap`, `nodePositionSnap`,
    /// `groupChildrenMove`, `edgesRouting`, `logger`.
    pub fn defaults() -> Self {
        Self::empty()
            .push(ReadOnlyMiddleware)
            .push(NodeRotationSnapMiddleware)
            .push(NodePositionSnapMiddleware)
            .push(GroupChildrenMoveMiddleware)
            .push(EdgesRoutingMiddleware)
            .push(LoggerMiddleware)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|m| m.name() == name)
    }

    pub fn push(mut self, middleware: impl Middleware + 'static) -> Self {
        self.items.push(Box::new(middleware));
        self
    }

    /// Insert before `anchor`, or at the end when `anchor` is absent.
    pub fn insert_before(mut self, anchor: &str, middleware: impl Middleware + 'static) -> Self {
        let index = self.position(anchor).unwrap_or_else(|| {
            log::warn!("middleware '{anchor}' not found, appending");
            self.items.len()
        });
        self.items.insert(index, Box::new(middleware));
        self
    }

    /// Insert after `anchor`, or at the end when `anchor` is absent.
    pub fn insert_after(mut self, anchor: &str, middleware: impl Middleware + 'static) -> Self {
        let index = self.position(anchor).map_or_else(
            || {
                log::warn!("middleware '{anchor}' not found, appending");
                self.items.len()
            },
            |i| i + 1,
        );
        self.items.insert(index, Box::new(middleware));
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.items.retain(|m| m.name() != name);
        self
    }

    /// Swap the middleware called `name` for another, keeping its slot.
    pub fn replace(mut self, name: &str, middleware: impl Middleware + 'static) -> Self {
        match self.position(name) {
            Some(index) => self.items[index] = Box::new(middleware),
            None => log::warn!("middleware '{name}' not found, nothing replaced"),
        }
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|m| m.name()).collect()
    }

    pub fn build(self) -> MiddlewareChain {
        MiddlewareChain {
            middlewares: self.items,
        }
    }
}

/// Build a chain by editing the default list.
pub fn create_middlewares(f: impl FnOnce(MiddlewareList) -> MiddlewareList) -> MiddlewareChain {
    f(MiddlewareList::defaults()).build()
}
