//! Engine-wide configuration.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```
//! let cfg = flow_engine::FlowConfig::from_json(r#"{ "historyDepth": 10 }"#).unwrap();
//! assert_eq!(cfg.history_depth, 10);
//! assert_eq!(cfg.paste_offset, 20.0);
//! ```

use crate::error::Result;
use flow_core::Metadata;
use flow_core::routing::RoutingConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    pub routing: RoutingConfig,
    /// Undo depth of the in-memory model, also the number of committed
    /// updates middlewares can look back on.
    pub history_depth: usize,
    pub zoom: ZoomConfig,
    /// Offset applied to pasted items when no position is given.
    pub paste_offset: f64,
    pub tree_layout: TreeLayoutConfig,
    /// Metadata of the initial, empty state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_metadata: Option<Metadata>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            history_depth: 100,
            zoom: ZoomConfig::default(),
            paste_offset: 20.0,
            tree_layout: TreeLayoutConfig::default(),
            initial_metadata: None,
        }
    }
}

impl FlowConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self { min: 0.1, max: 10.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeLayoutConfig {
    /// Vertical gap between consecutive levels.
    pub level_gap: f64,
    /// Horizontal gap between nodes of one level.
    pub sibling_gap: f64,
}

impl Default for TreeLayoutConfig {
    fn default() -> Self {
        Self {
            level_gap: 100.0,
            sibling_gap: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_sections_fill_defaults() {
        let cfg = FlowConfig::from_json(
            r#"{
                "routing": { "defaultRouting": "bezier", "bezier": { "controlOffset": 40 } },
                "zoom": { "max": 4 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.routing.default_routing, "bezier");
        assert_eq!(cfg.routing.bezier.control_offset, 40.0);
        assert_eq!(cfg.routing.orthogonal.first_last_segment_length, 20.0);
        assert_eq!(cfg.zoom, ZoomConfig { min: 0.1, max: 4.0 });
        assert_eq!(cfg.history_depth, 100);
    }

    #[test]
    fn unknown_shape_is_an_error() {
        assert!(FlowConfig::from_json(r#"{ "historyDepth": "lots" }"#).is_err());
    }
}
