//! Core data model for a diagram: nodes, edges, ports and viewport metadata.
//!
//! A `FlowState` is the full snapshot the engine passes around. It is only
//! ever advanced by applying a `FlowStateUpdate`, a partial and additive
//! description of a transition. Updates compose by concatenation, which is
//! what lets transactions fold many commands into one commit.

use crate::config::MiddlewaresConfig;
use crate::error::CoreError;
use crate::geometry::{Point, Rect, Size, rotate_point};
use crate::id::{EdgeId, NodeId, PortId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Free-form user data attached to nodes and edges.
pub type Data = Map<String, Value>;

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ─── Ports ───────────────────────────────────────────────────────────────

/// The side of a node a port sits on; also the direction an edge leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl PortSide {
    const CLOCKWISE: [PortSide; 4] = [
        PortSide::Top,
        PortSide::Right,
        PortSide::Bottom,
        PortSide::Left,
    ];

    pub fn opposite(self) -> Self {
        match self {
            PortSide::Top => PortSide::Bottom,
            PortSide::Right => PortSide::Left,
            PortSide::Bottom => PortSide::Top,
            PortSide::Left => PortSide::Right,
        }
    }

    /// The side this one faces after rotating its node by `angle` degrees,
    /// quantized to quarter turns.
    pub fn rotated(self, angle: f64) -> Self {
        let quarter_turns = (angle / 90.0).round().rem_euclid(4.0) as usize;
        let index = Self::CLOCKWISE
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default();
        Self::CLOCKWISE[(index + quarter_turns) % 4]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Source,
    Target,
    #[default]
    Both,
}

/// A connection point on a node. Ports are not owned independently; they are
/// addressed as `(node_id, port_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    pub side: PortSide,
    #[serde(rename = "type", default)]
    pub port_type: PortType,
    /// Top-left of the port relative to the node's top-left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

impl Port {
    pub fn new(id: &str, side: PortSide, port_type: PortType) -> Self {
        Self {
            id: PortId::intern(id),
            side,
            port_type,
            position: None,
            size: None,
        }
    }
}

/// An absolute anchor an edge starts or ends at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortLocation {
    pub point: Point,
    pub side: PortSide,
}

impl PortLocation {
    pub const fn new(point: Point, side: PortSide) -> Self {
        Self { point, side }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Degrees, clockwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub data: Data,
    /// Parent group node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resizable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotatable: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub highlighted: bool,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub ports: SmallVec<[Port; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_order: Option<i32>,
}

impl Node {
    pub fn new(id: &str, position: Point) -> Self {
        Self {
            id: NodeId::intern(id),
            position,
            size: None,
            angle: None,
            node_type: None,
            data: Data::new(),
            group_id: None,
            is_group: false,
            resizable: None,
            rotatable: None,
            selected: false,
            highlighted: false,
            ports: SmallVec::new(),
            z_order: None,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    pub fn group(mut self) -> Self {
        self.is_group = true;
        self
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group_id = Some(NodeId::intern(group));
        self
    }

    pub fn angle(&self) -> f64 {
        self.angle.unwrap_or(0.0)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size.unwrap_or_default())
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable.unwrap_or(true)
    }

    pub fn is_rotatable(&self) -> bool {
        self.rotatable.unwrap_or(true)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Absolute location of `port`, or of the midpoint of `fallback_side`
    /// when the node has no such port. Honours the node's rotation.
    pub fn port_location(&self, port: Option<PortId>, fallback_side: PortSide) -> PortLocation {
        let bounds = self.bounds();
        let (point, side) = match port.and_then(|id| self.port(id)) {
            Some(Port {
                position: Some(offset),
                size,
                side,
                ..
            }) => {
                let size = size.unwrap_or_default();
                let point = Point::new(
                    bounds.x + offset.x + size.width / 2.0,
                    bounds.y + offset.y + size.height / 2.0,
                );
                (point, *side)
            }
            Some(p) => (side_midpoint(&bounds, p.side), p.side),
            None => (side_midpoint(&bounds, fallback_side), fallback_side),
        };
        let angle = self.angle();
        PortLocation::new(
            rotate_point(point, bounds.center(), angle),
            side.rotated(angle),
        )
    }
}

fn side_midpoint(bounds: &Rect, side: PortSide) -> Point {
    let c = bounds.center();
    match side {
        PortSide::Top => Point::new(c.x, bounds.y),
        PortSide::Right => Point::new(bounds.right(), c.y),
        PortSide::Bottom => Point::new(c.x, bounds.bottom()),
        PortSide::Left => Point::new(bounds.x, c.y),
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Points are recomputed from node and port positions.
    #[default]
    Auto,
    /// Points are authoritative and never recomputed.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    /// Fraction of the path length, 0..1.
    pub position_on_edge: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Computed by edge routing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    /// `NodeId::empty()` while a link is in progress.
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<PortId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<PortId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(default)]
    pub routing_mode: RoutingMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub labels: SmallVec<[Label; 2]>,
    #[serde(default)]
    pub data: Data,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_arrowhead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_arrowhead: Option<String>,
    /// Free endpoint used when there is no source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<Point>,
    /// Free endpoint used when there is no target node (dangling link).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<Point>,
}

impl Edge {
    pub fn new(id: &str, source: &str, target: &str) -> Self {
        Self {
            id: EdgeId::intern(id),
            source: NodeId::intern(source),
            target: NodeId::intern(target),
            source_port: None,
            target_port: None,
            routing: None,
            routing_mode: RoutingMode::Auto,
            points: Vec::new(),
            labels: SmallVec::new(),
            data: Data::new(),
            selected: false,
            source_arrowhead: None,
            target_arrowhead: None,
            source_position: None,
            target_position: None,
        }
    }

    pub fn with_routing(mut self, routing: &str) -> Self {
        self.routing = Some(routing.to_string());
        self
    }

    pub fn with_ports(mut self, source_port: &str, target_port: &str) -> Self {
        self.source_port = Some(PortId::intern(source_port));
        self.target_port = Some(PortId::intern(target_port));
        self
    }

    pub fn is_manual(&self) -> bool {
        self.routing_mode == RoutingMode::Manual
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

// ─── Metadata ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            width: None,
            height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub middlewares_config: MiddlewaresConfig,
    /// The edge being drawn by an in-progress link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_edge: Option<Edge>,
    /// Caller-defined keys, merged last-write-wins like the typed ones.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─── Actions ─────────────────────────────────────────────────────────────

/// The kind of state transition a command produced. Middlewares dispatch on
/// these, and the read-only policy allow-lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    Init,
    AddNodes,
    DeleteNodes,
    UpdateNode,
    MoveNodes,
    MoveNodesStop,
    Resize,
    Rotate,
    AddEdges,
    DeleteEdges,
    UpdateEdge,
    StartLinking,
    MoveTemporaryEdge,
    FinishLinking,
    ChangeSelection,
    Paste,
    DeleteSelection,
    ClearModel,
    ChangeZOrder,
    HighlightGroup,
    TreeLayout,
    MoveViewport,
    Zoom,
    Undo,
    Redo,
}

impl ActionType {
    /// Whether the action changes diagram content (as opposed to view state).
    pub fn is_mutating(self) -> bool {
        !matches!(
            self,
            ActionType::Init
                | ActionType::ChangeSelection
                | ActionType::HighlightGroup
                | ActionType::MoveViewport
                | ActionType::Zoom
        )
    }
}

// ─── Partial updates ─────────────────────────────────────────────────────

/// Partial node update. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub group_id: Option<Option<NodeId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resizable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotatable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<SmallVec<[Port; 4]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_order: Option<i32>,
}

impl NodeUpdate {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            position: None,
            size: None,
            angle: None,
            node_type: None,
            data: None,
            group_id: None,
            is_group: None,
            resizable: None,
            rotatable: None,
            selected: None,
            highlighted: None,
            ports: None,
            z_order: None,
        }
    }

    pub fn position(id: NodeId, position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::new(id)
        }
    }

    pub fn selected(id: NodeId, selected: bool) -> Self {
        Self {
            selected: Some(selected),
            ..Self::new(id)
        }
    }

    /// Overwrite only the fields this update carries.
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(position) = self.position {
            node.position = position;
        }
        if self.size.is_some() {
            node.size = self.size;
        }
        if self.angle.is_some() {
            node.angle = self.angle;
        }
        if self.node_type.is_some() {
            node.node_type = self.node_type.clone();
        }
        if let Some(data) = &self.data {
            node.data = data.clone();
        }
        if let Some(group_id) = self.group_id {
            node.group_id = group_id;
        }
        if let Some(is_group) = self.is_group {
            node.is_group = is_group;
        }
        if self.resizable.is_some() {
            node.resizable = self.resizable;
        }
        if self.rotatable.is_some() {
            node.rotatable = self.rotatable;
        }
        if let Some(selected) = self.selected {
            node.selected = selected;
        }
        if let Some(highlighted) = self.highlighted {
            node.highlighted = highlighted;
        }
        if let Some(ports) = &self.ports {
            node.ports = ports.clone();
        }
        if self.z_order.is_some() {
            node.z_order = self.z_order;
        }
    }
}

/// Partial edge update. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeUpdate {
    pub id: EdgeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub source_port: Option<Option<PortId>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub target_port: Option<Option<PortId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_mode: Option<RoutingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<SmallVec<[Label; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_arrowhead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_arrowhead: Option<String>,
}

impl EdgeUpdate {
    pub fn new(id: EdgeId) -> Self {
        Self {
            id,
            source: None,
            target: None,
            source_port: None,
            target_port: None,
            routing: None,
            routing_mode: None,
            points: None,
            labels: None,
            data: None,
            selected: None,
            source_arrowhead: None,
            target_arrowhead: None,
        }
    }

    pub fn selected(id: EdgeId, selected: bool) -> Self {
        Self {
            selected: Some(selected),
            ..Self::new(id)
        }
    }

    pub fn apply_to(&self, edge: &mut Edge) {
        if let Some(source) = self.source {
            edge.source = source;
        }
        if let Some(target) = self.target {
            edge.target = target;
        }
        if let Some(port) = self.source_port {
            edge.source_port = port;
        }
        if let Some(port) = self.target_port {
            edge.target_port = port;
        }
        if self.routing.is_some() {
            edge.routing = self.routing.clone();
        }
        if let Some(mode) = self.routing_mode {
            edge.routing_mode = mode;
        }
        if let Some(points) = &self.points {
            edge.points = points.clone();
        }
        if let Some(labels) = &self.labels {
            edge.labels = labels.clone();
        }
        if let Some(data) = &self.data {
            edge.data = data.clone();
        }
        if let Some(selected) = self.selected {
            edge.selected = selected;
        }
        if self.source_arrowhead.is_some() {
            edge.source_arrowhead = self.source_arrowhead.clone();
        }
        if self.target_arrowhead.is_some() {
            edge.target_arrowhead = self.target_arrowhead.clone();
        }
    }
}

/// Partial metadata update, merged key by key with last-write-wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetadataUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middlewares_config: Option<MiddlewaresConfig>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub temporary_edge: Option<Option<Edge>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.viewport.is_none()
            && self.middlewares_config.is_none()
            && self.temporary_edge.is_none()
            && self.extra.is_empty()
    }

    /// Fold `later` into `self`; keys present in `later` win.
    pub fn merge(&mut self, later: MetadataUpdate) {
        if later.viewport.is_some() {
            self.viewport = later.viewport;
        }
        if later.middlewares_config.is_some() {
            self.middlewares_config = later.middlewares_config;
        }
        if later.temporary_edge.is_some() {
            self.temporary_edge = later.temporary_edge;
        }
        self.extra.extend(later.extra);
    }

    pub fn apply_to(&self, metadata: &mut Metadata) {
        if let Some(viewport) = self.viewport {
            metadata.viewport = viewport;
        }
        if let Some(config) = &self.middlewares_config {
            metadata.middlewares_config = config.clone();
        }
        if let Some(edge) = &self.temporary_edge {
            metadata.temporary_edge = edge.clone();
        }
        for (key, value) in &self.extra {
            metadata.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A partial, additive description of a state transition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowStateUpdate {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes_to_add: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes_to_remove: Vec<NodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes_to_update: Vec<NodeUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edges_to_add: Vec<Edge>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edges_to_remove: Vec<EdgeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edges_to_update: Vec<EdgeUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_update: Option<MetadataUpdate>,
}

impl FlowStateUpdate {
    pub fn is_empty(&self) -> bool {
        self.nodes_to_add.is_empty()
            && self.nodes_to_remove.is_empty()
            && self.nodes_to_update.is_empty()
            && self.edges_to_add.is_empty()
            && self.edges_to_remove.is_empty()
            && self.edges_to_update.is_empty()
            && self.metadata_update.as_ref().is_none_or(MetadataUpdate::is_empty)
    }

    pub fn with_metadata(metadata_update: MetadataUpdate) -> Self {
        Self {
            metadata_update: Some(metadata_update),
            ..Default::default()
        }
    }

    /// Append `later` after this update: arrays concatenate in order,
    /// metadata keys are last-write-wins.
    pub fn merge(&mut self, later: FlowStateUpdate) {
        self.nodes_to_add.extend(later.nodes_to_add);
        self.nodes_to_remove.extend(later.nodes_to_remove);
        self.nodes_to_update.extend(later.nodes_to_update);
        self.edges_to_add.extend(later.edges_to_add);
        self.edges_to_remove.extend(later.edges_to_remove);
        self.edges_to_update.extend(later.edges_to_update);
        if let Some(meta) = later.metadata_update {
            match &mut self.metadata_update {
                Some(existing) => existing.merge(meta),
                None => self.metadata_update = Some(meta),
            }
        }
    }

    /// Ids of every node this update adds, removes or modifies.
    pub fn touched_node_ids(&self) -> HashSet<NodeId> {
        self.nodes_to_add
            .iter()
            .map(|n| n.id)
            .chain(self.nodes_to_remove.iter().copied())
            .chain(self.nodes_to_update.iter().map(|u| u.id))
            .collect()
    }
}

// ─── Flow state ──────────────────────────────────────────────────────────

/// The full snapshot: nodes, edges and metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl FlowState {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>, metadata: Metadata) -> Self {
        Self {
            nodes,
            edges,
            metadata,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Direct children of a group node.
    pub fn children_of(&self, group: NodeId) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.group_id == Some(group))
    }

    /// Every node nested under `group`, depth first.
    pub fn descendants_of(&self, group: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![group];
        let mut seen = HashSet::from([group]);
        while let Some(current) = stack.pop() {
            for child in self.children_of(current) {
                if seen.insert(child.id) {
                    out.push(child.id);
                    stack.push(child.id);
                }
            }
        }
        out
    }

    pub fn selected_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.selected)
    }

    pub fn selected_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.selected)
    }

    /// Apply an update in place: additions, then partial updates, then
    /// removals, then metadata.
    pub fn apply(&mut self, update: &FlowStateUpdate) {
        self.nodes.extend(update.nodes_to_add.iter().cloned());
        for patch in &update.nodes_to_update {
            if let Some(node) = self.nodes.iter_mut().find(|n| n.id == patch.id) {
                patch.apply_to(node);
            }
        }
        if !update.nodes_to_remove.is_empty() {
            let removed: HashSet<NodeId> = update.nodes_to_remove.iter().copied().collect();
            self.nodes.retain(|n| !removed.contains(&n.id));
        }

        self.edges.extend(update.edges_to_add.iter().cloned());
        for patch in &update.edges_to_update {
            if let Some(edge) = self.edges.iter_mut().find(|e| e.id == patch.id) {
                patch.apply_to(edge);
            }
        }
        if !update.edges_to_remove.is_empty() {
            let removed: HashSet<EdgeId> = update.edges_to_remove.iter().copied().collect();
            self.edges.retain(|e| !removed.contains(&e.id));
        }

        if let Some(meta) = &update.metadata_update {
            meta.apply_to(&mut self.metadata);
        }
    }

    /// A copy of this state with `update` applied.
    #[must_use]
    pub fn applied(&self, update: &FlowStateUpdate) -> FlowState {
        let mut next = self.clone();
        next.apply(update);
        next
    }

    /// Check id uniqueness and group references.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id) {
                return Err(CoreError::DuplicateNode(node.id));
            }
        }
        for node in &self.nodes {
            if let Some(group) = node.group_id
                && !self.node(group).is_some_and(|g| g.is_group)
            {
                return Err(CoreError::InvalidGroup {
                    node: node.id,
                    group,
                });
            }
        }
        let mut edge_ids = HashSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(edge.id) {
                return Err(CoreError::DuplicateEdge(edge.id));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a persisted state.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let state: FlowState = serde_json::from_str(json)?;
        state.validate()?;
        Ok(state)
    }
}
