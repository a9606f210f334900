//! The command catalogue and its resolution into state updates.
//!
//! A `Command` is intent. `CommandHandler::resolve` turns it into the
//! `FlowStateUpdate` it would cause against a given state, together with
//! the `ActionType` middlewares dispatch on. Resolution never mutates the
//! state; commands that would change nothing resolve to `None`.

mod clipboard;
mod edges;
mod layout;
mod nodes;
mod selection;

use crate::config::FlowConfig;
use crate::error::{EngineError, Result};
use flow_core::{
    ActionType, Edge, EdgeId, EdgeUpdate, FlowState, FlowStateUpdate, Node, NodeId, NodeUpdate,
    Point, PortId, Size,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use clipboard::Clipboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZOrderDirection {
    BringToFront,
    SendToBack,
}

/// An absolute position for one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: NodeId,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "name",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    AddNodes {
        nodes: Vec<Node>,
    },
    DeleteNodes {
        ids: Vec<NodeId>,
    },
    UpdateNode(NodeUpdate),
    UpdateNodes {
        nodes: Vec<NodeUpdate>,
    },
    AddEdges {
        edges: Vec<Edge>,
    },
    DeleteEdges {
        ids: Vec<EdgeId>,
    },
    UpdateEdge(EdgeUpdate),
    UpdateEdges {
        edges: Vec<EdgeUpdate>,
    },
    MoveNodes {
        nodes: Vec<NodePosition>,
    },
    MoveNodesBy {
        ids: Vec<NodeId>,
        delta: Point,
    },
    /// End of a drag: dropped nodes join the group under them.
    MoveNodesStop {
        ids: Vec<NodeId>,
    },
    ResizeNode {
        id: NodeId,
        size: Size,
        #[serde(default)]
        position: Option<Point>,
    },
    RotateNodeBy {
        id: NodeId,
        /// Degrees, clockwise.
        angle: f64,
    },
    /// Rotate by the angle swept from `handle` to `pointer` around the
    /// node's center.
    RotateNodeTo {
        id: NodeId,
        handle: Point,
        pointer: Point,
    },
    StartLinking {
        source: NodeId,
        #[serde(default)]
        source_port: Option<PortId>,
    },
    MoveTemporaryEdge {
        position: Point,
    },
    FinishLinking {
        #[serde(default)]
        target: Option<NodeId>,
        #[serde(default)]
        target_port: Option<PortId>,
    },
    Select {
        #[serde(default)]
        nodes: Vec<NodeId>,
        #[serde(default)]
        edges: Vec<EdgeId>,
    },
    Deselect {
        #[serde(default)]
        nodes: Vec<NodeId>,
        #[serde(default)]
        edges: Vec<EdgeId>,
    },
    DeselectAll,
    /// Make exactly these items selected.
    ChangeSelection {
        #[serde(default)]
        nodes: Vec<NodeId>,
        #[serde(default)]
        edges: Vec<EdgeId>,
    },
    Copy,
    Paste {
        #[serde(default)]
        position: Option<Point>,
    },
    DeleteSelection,
    ClearModel,
    ChangeZOrder {
        ids: Vec<NodeId>,
        direction: ZOrderDirection,
    },
    HighlightGroup {
        id: NodeId,
    },
    HighlightGroupClear,
    TreeLayout,
    MoveViewportBy {
        delta: Point,
    },
    Zoom {
        scale: f64,
        /// Screen point kept fixed while zooming.
        #[serde(default)]
        center: Option<Point>,
    },
}

impl Command {
    /// Every command name accepted by `from_named`.
    pub const NAMES: &'static [&'static str] = &[
        "addNodes",
        "deleteNodes",
        "updateNode",
        "updateNodes",
        "addEdges",
        "deleteEdges",
        "updateEdge",
        "updateEdges",
        "moveNodes",
        "moveNodesBy",
        "moveNodesStop",
        "resizeNode",
        "rotateNodeBy",
        "rotateNodeTo",
        "startLinking",
        "moveTemporaryEdge",
        "finishLinking",
        "select",
        "deselect",
        "deselectAll",
        "changeSelection",
        "copy",
        "paste",
        "deleteSelection",
        "clearModel",
        "changeZOrder",
        "highlightGroup",
        "highlightGroupClear",
        "treeLayout",
        "moveViewportBy",
        "zoom",
    ];

    /// Build a command from its wire name and JSON payload. A null payload
    /// stands for "no arguments": unit commands take none, and commands whose
    /// fields all have defaults (`paste`, `select`, ...) take an empty one.
    pub fn from_named(name: &str, payload: Value) -> Result<Self> {
        if !Self::NAMES.contains(&name) {
            return Err(EngineError::UnknownCommand(name.to_string()));
        }
        let parse = |payload: Option<Value>| {
            let mut wire = serde_json::Map::new();
            wire.insert("name".into(), Value::String(name.to_string()));
            if let Some(payload) = payload {
                wire.insert("payload".into(), payload);
            }
            serde_json::from_value::<Command>(Value::Object(wire))
        };
        let parsed = if payload.is_null() {
            parse(None).or_else(|_| parse(Some(Value::Object(serde_json::Map::new()))))
        } else {
            parse(Some(payload))
        };
        parsed.map_err(|e| EngineError::InvalidPayload {
            command: name.to_string(),
            message: e.to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::AddNodes { .. } => "addNodes",
            Command::DeleteNodes { .. } => "deleteNodes",
            Command::UpdateNode(_) => "updateNode",
            Command::UpdateNodes { .. } => "updateNodes",
            Command::AddEdges { .. } => "addEdges",
            Command::DeleteEdges { .. } => "deleteEdges",
            Command::UpdateEdge(_) => "updateEdge",
            Command::UpdateEdges { .. } => "updateEdges",
            Command::MoveNodes { .. } => "moveNodes",
            Command::MoveNodesBy { .. } => "moveNodesBy",
            Command::MoveNodesStop { .. } => "moveNodesStop",
            Command::ResizeNode { .. } => "resizeNode",
            Command::RotateNodeBy { .. } => "rotateNodeBy",
            Command::RotateNodeTo { .. } => "rotateNodeTo",
            Command::StartLinking { .. } => "startLinking",
            Command::MoveTemporaryEdge { .. } => "moveTemporaryEdge",
            Command::FinishLinking { .. } => "finishLinking",
            Command::Select { .. } => "select",
            Command::Deselect { .. } => "deselect",
            Command::DeselectAll => "deselectAll",
            Command::ChangeSelection { .. } => "changeSelection",
            Command::Copy => "copy",
            Command::Paste { .. } => "paste",
            Command::DeleteSelection => "deleteSelection",
            Command::ClearModel => "clearModel",
            Command::ChangeZOrder { .. } => "changeZOrder",
            Command::HighlightGroup { .. } => "highlightGroup",
            Command::HighlightGroupClear => "highlightGroupClear",
            Command::TreeLayout => "treeLayout",
            Command::MoveViewportBy { .. } => "moveViewportBy",
            Command::Zoom { .. } => "zoom",
        }
    }
}

/// A resolved command: the update it proposes and its action type.
pub type Resolution = Option<(FlowStateUpdate, ActionType)>;

fn resolved(update: FlowStateUpdate, action: ActionType) -> Resolution {
    (!update.is_empty()).then_some((update, action))
}

// ─── Handler ─────────────────────────────────────────────────────────────

/// Resolves commands against a state. Owns the clipboard, the only state a
/// command keeps outside the model.
pub struct CommandHandler {
    config: FlowConfig,
    clipboard: Clipboard,
}

impl CommandHandler {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            clipboard: Clipboard::default(),
        }
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn resolve(&mut self, state: &FlowState, command: Command) -> Result<Resolution> {
        log::debug!("resolve '{}'", command.name());
        match command {
            Command::AddNodes { nodes: added } => nodes::add_nodes(state, added),
            Command::DeleteNodes { ids } => {
                Ok(nodes::delete_nodes(state, &ids, ActionType::DeleteNodes))
            }
            Command::UpdateNode(patch) => nodes::update_nodes(state, vec![patch]),
            Command::UpdateNodes { nodes: patches } => nodes::update_nodes(state, patches),
            Command::AddEdges { edges: added } => edges::add_edges(state, added),
            Command::DeleteEdges { ids } => Ok(edges::delete_edges(state, &ids)),
            Command::UpdateEdge(patch) => edges::update_edges(state, vec![patch]),
            Command::UpdateEdges { edges: patches } => edges::update_edges(state, patches),
            Command::MoveNodes { nodes: moves } => nodes::move_nodes(state, &moves),
            Command::MoveNodesBy { ids, delta } => nodes::move_nodes_by(state, &ids, delta),
            Command::MoveNodesStop { ids } => Ok(nodes::move_nodes_stop(state, &ids)),
            Command::ResizeNode { id, size, position } => {
                nodes::resize_node(state, id, size, position)
            }
            Command::RotateNodeBy { id, angle } => nodes::rotate_node_by(state, id, angle),
            Command::RotateNodeTo { id, handle, pointer } => {
                nodes::rotate_node_to(state, id, handle, pointer)
            }
            Command::StartLinking { source, source_port } => {
                edges::start_linking(state, source, source_port)
            }
            Command::MoveTemporaryEdge { position } => {
                Ok(edges::move_temporary_edge(state, position))
            }
            Command::FinishLinking {
                target,
                target_port,
            } => Ok(edges::finish_linking(state, target, target_port)),
            Command::Select {
                nodes: node_ids,
                edges: edge_ids,
            } => Ok(selection::set_selected(state, &node_ids, &edge_ids, true)),
            Command::Deselect {
                nodes: node_ids,
                edges: edge_ids,
            } => Ok(selection::set_selected(state, &node_ids, &edge_ids, false)),
            Command::DeselectAll => Ok(selection::deselect_all(state)),
            Command::ChangeSelection {
                nodes: node_ids,
                edges: edge_ids,
            } => Ok(selection::change_selection(state, &node_ids, &edge_ids)),
            Command::Copy => {
                self.clipboard = Clipboard::capture(state);
                Ok(None)
            }
            Command::Paste { position } => {
                Ok(self.clipboard.paste(state, position, self.config.paste_offset))
            }
            Command::DeleteSelection => Ok(clipboard::delete_selection(state)),
            Command::ClearModel => Ok(clipboard::clear_model(state)),
            Command::ChangeZOrder { ids, direction } => {
                Ok(nodes::change_z_order(state, &ids, direction))
            }
            Command::HighlightGroup { id } => selection::highlight_group(state, id),
            Command::HighlightGroupClear => Ok(selection::highlight_group_clear(state)),
            Command::TreeLayout => Ok(layout::tree_layout(state, &self.config.tree_layout)),
            Command::MoveViewportBy { delta } => Ok(layout::move_viewport_by(state, delta)),
            Command::Zoom { scale, center } => {
                Ok(layout::zoom(state, scale, center, &self.config.zoom))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn named_commands_parse_camel_case_payloads() {
        let cmd = Command::from_named(
            "resizeNode",
            json!({ "id": "a", "size": { "width": 10, "height": 20 } }),
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::ResizeNode {
                id: NodeId::intern("a"),
                size: Size::new(10.0, 20.0),
                position: None,
            }
        );
        let cmd =
            Command::from_named("startLinking", json!({ "source": "a", "sourcePort": "out" }))
                .unwrap();
        assert_eq!(cmd.name(), "startLinking");
        assert_eq!(
            Command::from_named("deselectAll", Value::Null).unwrap(),
            Command::DeselectAll
        );
    }

    #[test]
    fn null_payload_means_default_arguments() {
        assert_eq!(
            Command::from_named("paste", Value::Null).unwrap(),
            Command::Paste { position: None }
        );
        assert_eq!(
            Command::from_named("select", Value::Null).unwrap(),
            Command::Select {
                nodes: vec![],
                edges: vec![],
            }
        );
        assert!(matches!(
            Command::from_named("moveNodesBy", Value::Null),
            Err(EngineError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn unknown_names_and_bad_payloads_are_errors() {
        assert!(matches!(
            Command::from_named("explode", json!({})),
            Err(EngineError::UnknownCommand(name)) if name == "explode"
        ));
        assert!(matches!(
            Command::from_named("moveNodesBy", json!({ "ids": ["a"] })),
            Err(EngineError::InvalidPayload { command, .. }) if command == "moveNodesBy"
        ));
    }

    #[test]
    fn every_listed_name_round_trips_through_name() {
        let samples = [
            Command::DeselectAll,
            Command::Copy,
            Command::TreeLayout,
            Command::HighlightGroupClear,
            Command::Zoom {
                scale: 2.0,
                center: None,
            },
        ];
        for cmd in samples {
            assert!(Command::NAMES.contains(&cmd.name()));
            let wire = serde_json::to_value(&cmd).unwrap();
            assert_eq!(wire["name"], json!(cmd.name()));
        }
    }
}
