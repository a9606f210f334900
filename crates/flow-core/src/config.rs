//! Per-middleware configuration, stored in `Metadata::middlewares_config`.
//!
//! Each built-in middleware reads only its own section. Sections are typed
//! so a misspelled option fails at deserialization instead of being ignored.

use crate::geometry::Size;
use crate::model::ActionType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MiddlewaresConfig {
    pub read_only: ReadOnlyConfig,
    pub node_position_snap: NodePositionSnapConfig,
    pub node_rotation_snap: NodeRotationSnapConfig,
    pub group_children_move: GroupChildrenMoveConfig,
    pub edges_routing: EdgesRoutingConfig,
    pub logger: LoggerConfig,
}

/// Blocks mutating actions while enabled, except the listed ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadOnlyConfig {
    pub enabled: bool,
    pub allowed_actions: Vec<ActionType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodePositionSnapConfig {
    pub enabled: bool,
    pub step: Size,
}

impl Default for NodePositionSnapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            step: Size::new(10.0, 10.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeRotationSnapConfig {
    pub enabled: bool,
    /// Degrees.
    pub step: f64,
}

impl Default for NodeRotationSnapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            step: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupChildrenMoveConfig {
    pub enabled: bool,
}

impl Default for GroupChildrenMoveConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgesRoutingConfig {
    pub enabled: bool,
    /// Recompute label positions along the routed path.
    pub place_labels: bool,
}

impl Default for EdgesRoutingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            place_labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
