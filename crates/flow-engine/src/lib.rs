pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod middleware;
pub mod model;
pub mod transaction;

pub use commands::{Command, CommandHandler, NodePosition, ZOrderDirection};
pub use config::{FlowConfig, TreeLayoutConfig, ZoomConfig};
pub use engine::{
    CommitEvent, EmitOutcome, FlowCore, SubscriptionId, TransactionOutcome, TransactionScope,
};
pub use error::{EngineError, Result};
pub use history::HistoryEntry;
pub use middleware::{
    Flow, Middleware, MiddlewareChain, MiddlewareContext, MiddlewareList, create_middlewares,
};
pub use model::{InMemoryModel, ModelAdapter};
pub use transaction::{MergedUpdates, TransactionId, TransactionManager};

// Re-export the data model so embedders need a single dependency
pub use flow_core;
