pub mod config;
pub mod diff;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod routing;

pub use config::MiddlewaresConfig;
pub use diff::{Difference, PathKey, diff_states};
pub use error::CoreError;
pub use geometry::{Point, Rect, Size};
pub use id::{EdgeId, NodeId, PortId};
pub use model::*;
pub use routing::{EdgeRouting, EdgeRoutingManager, RoutingConfig, RoutingContext};
