use crate::connection::{check_structure, LinkValidator};
use crate::error::{GraphError, ValidationError};
use crate::geometry::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

pub type NodeId = String;
pub type PortId = String;
pub type EdgeId = String;

/// Node parameters. Owned by the node-kind catalog and never interpreted here.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// What kind of value travels along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Data,
    Condition,
    Config,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Condition => write!(f, "condition"),
            Self::Config => write!(f, "config"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// A typed, directional connection point. Ids are unique per node and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub label: Option<String>,
    pub signal_type: SignalType,
    pub direction: PortDirection,
}

impl Port {
    pub fn input(id: impl Into<PortId>, signal_type: SignalType) -> Self {
        Self {
            id: id.into(),
            label: None,
            signal_type,
            direction: PortDirection::Input,
        }
    }

    pub fn output(id: impl Into<PortId>, signal_type: SignalType) -> Self {
        Self {
            id: id.into(),
            label: None,
            signal_type,
            direction: PortDirection::Output,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One end of an edge: a node and one of its ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node_id: NodeId,
    pub port_id: PortId,
}

impl PortRef {
    pub fn new(node_id: impl Into<NodeId>, port_id: impl Into<PortId>) -> Self {
        Self {
            node_id: node_id.into(),
            port_id: port_id.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.port_id)
    }
}

/// A strategy building block placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: String,
    pub category: String,
    pub position: Point,
    pub size: Size,
    pub params: Params,
    pub is_anchor: bool,
    pub ports: Vec<Port>,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        kind: impl Into<String>,
        category: impl Into<String>,
        size: Size,
        ports: Vec<Port>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            category: category.into(),
            position: Point::default(),
            size,
            params: Params::new(),
            is_anchor: false,
            ports,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position.clamp_non_negative();
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn as_anchor(mut self) -> Self {
        self.is_anchor = true;
        self
    }

    /// Bounding box in logical space.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Port ids must be unique within each direction.
    pub fn check_ports(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for port in &self.ports {
            if !seen.insert((port.id.as_str(), port.direction)) {
                return Err(GraphError::DuplicatePort {
                    node_id: self.id.clone(),
                    port_id: port.id.clone(),
                    direction: port.direction,
                });
            }
        }
        Ok(())
    }

    pub fn port(&self, port_id: &str, direction: PortDirection) -> Option<&Port> {
        self.ports
            .iter()
            .find(|p| p.direction == direction && p.id == port_id)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Port> + '_ {
        self.ports.iter().filter(|p| p.direction == PortDirection::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Port> + '_ {
        self.ports.iter().filter(|p| p.direction == PortDirection::Output)
    }

    /// Center of a port. Inputs sit on the left edge, outputs on the right edge,
    /// spaced evenly top to bottom in declaration order.
    pub fn port_center(&self, port_id: &str, direction: PortDirection) -> Option<Point> {
        let mut count = 0usize;
        let mut index = None;
        for port in self.ports.iter().filter(|p| p.direction == direction) {
            if port.id == port_id {
                index = Some(count);
            }
            count += 1;
        }
        let index = index?;
        let rect = self.rect();
        let x = match direction {
            PortDirection::Input => rect.left,
            PortDirection::Output => rect.right,
        };
        let y = rect.top + rect.height() * (index + 1) as f64 / (count + 1) as f64;
        Some(Point::new(x, y))
    }
}

/// A typed, directed connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: PortRef,
    pub target: PortRef,
    pub signal_type: SignalType,
}

impl Edge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source.node_id == node_id || self.target.node_id == node_id
    }

    pub fn connects(&self, source: &PortRef, target: &PortRef) -> bool {
        self.source == *source && self.target == *target
    }
}

/// The strategy graph: nodes, their ports, and the edges between them.
///
/// Nodes and edges are held behind `Rc` so that [`Graph::snapshot`] shares every
/// unchanged element with the live graph. Mutation goes through `Rc::make_mut`,
/// which copies only the element being changed.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Rc<Node>>,
    edges: Vec<Rc<Edge>>,
    next_edge: u64,
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().map(|n| n.as_ref())
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().map(|e| e.as_ref())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.as_ref())
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id).map(|e| e.as_ref())
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index(id).is_some()
    }

    pub fn anchor(&self) -> Option<&Node> {
        self.nodes().find(|n| n.is_anchor)
    }

    fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, GraphError> {
        let index = self
            .node_index(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        Ok(Rc::make_mut(&mut self.nodes[index]))
    }

    /// Insert a node. Fails if the id is taken, a port id repeats within a
    /// direction, or a second anchor is added.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.contains_node(&node.id) {
            return Err(GraphError::DuplicateId(node.id));
        }
        node.check_ports()?;
        if node.is_anchor {
            if let Some(anchor) = self.anchor() {
                return Err(GraphError::AnchorExists(anchor.id.clone()));
            }
        }
        self.nodes.push(Rc::new(node));
        Ok(())
    }

    /// Remove a node and every edge touching it.
    ///
    /// Returns the ids of the removed edges so callers can update derived state.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<EdgeId>, GraphError> {
        let index = self
            .node_index(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        if self.nodes[index].is_anchor {
            return Err(GraphError::AnchorProtected(id.to_string()));
        }
        let removed = self.edges_touching(id);
        self.edges.retain(|e| !e.touches(id));
        self.nodes.remove(index);
        Ok(removed)
    }

    /// Move a node, clamping to non-negative coordinates. Returns the applied position.
    pub fn move_node(&mut self, id: &str, position: Point) -> Result<Point, GraphError> {
        let clamped = position.clamp_non_negative();
        let node = self.node_mut(id)?;
        node.position = clamped;
        Ok(clamped)
    }

    /// Set one parameter, returning the previous value if any.
    pub fn set_param(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, GraphError> {
        let node = self.node_mut(id)?;
        Ok(node.params.insert(key.into(), value))
    }

    /// Replace the whole parameter map, returning the old one.
    pub fn replace_params(&mut self, id: &str, params: Params) -> Result<Params, GraphError> {
        let node = self.node_mut(id)?;
        Ok(std::mem::replace(&mut node.params, params))
    }

    /// Validate and insert an edge from an output port to an input port.
    ///
    /// On rejection the graph is left untouched and the reason is returned.
    pub fn add_edge(&mut self, source: PortRef, target: PortRef) -> Result<EdgeId, ValidationError> {
        let signal_type = check_structure(self, &source, &target)?;
        let id = self.next_edge_id();
        self.edges.push(Rc::new(Edge {
            id: id.clone(),
            source,
            target,
            signal_type,
        }));
        Ok(id)
    }

    /// Like [`add_edge`](Self::add_edge), with an additional caller-supplied rule.
    ///
    /// Structural rules always run first, so a custom validator can only narrow
    /// what is accepted.
    pub fn add_edge_with<V>(
        &mut self,
        source: PortRef,
        target: PortRef,
        validator: &V,
    ) -> Result<EdgeId, ValidationError>
    where
        V: LinkValidator + ?Sized,
    {
        check_structure(self, &source, &target)?;
        validator.validate(self, &source, &target).into_result()?;
        self.add_edge(source, target)
    }

    /// Insert a fully formed edge, keeping its id. Used when loading documents.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edge(&edge.id).is_some() {
            return Err(GraphError::DuplicateId(edge.id));
        }
        let signal_type = check_structure(self, &edge.source, &edge.target)?;
        if signal_type != edge.signal_type {
            return Err(ValidationError::TypeMismatch {
                expected: signal_type,
                found: edge.signal_type,
            }
            .into());
        }
        self.edges.push(Rc::new(edge));
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.to_string()))?;
        let edge = self.edges.remove(index);
        Ok(Rc::try_unwrap(edge).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Look up a port. Returns `None` rather than failing when anything is missing.
    pub fn find_port(&self, node_id: &str, port_id: &str, direction: PortDirection) -> Option<&Port> {
        self.node(node_id)?.port(port_id, direction)
    }

    pub fn port_center(&self, port: &PortRef, direction: PortDirection) -> Option<Point> {
        self.node(&port.node_id)?.port_center(&port.port_id, direction)
    }

    /// Ids of every edge with an endpoint on `node_id`.
    pub fn edges_touching(&self, node_id: &str) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.touches(node_id))
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn edge_between(&self, source: &PortRef, target: &PortRef) -> Option<&Edge> {
        self.edges().find(|e| e.connects(source, target))
    }

    /// A copy of the graph for undo history. Unchanged nodes and edges are shared.
    pub fn snapshot(&self) -> Graph {
        self.clone()
    }

    fn next_edge_id(&mut self) -> EdgeId {
        loop {
            self.next_edge += 1;
            let id = format!("e{}", self.next_edge);
            if self.edge(&id).is_none() {
                return id;
            }
        }
    }

    /// Verify every structural invariant of the graph.
    pub fn check_integrity(&self) -> Result<(), GraphError> {
        let mut node_ids = HashSet::new();
        let mut anchors = 0;
        for node in self.nodes() {
            if !node_ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateId(node.id.clone()));
            }
            if node.is_anchor {
                anchors += 1;
            }
            node.check_ports()?;
        }
        if anchors > 1 {
            return Err(GraphError::Integrity(format!("{anchors} anchor nodes")));
        }

        let mut edge_ids = HashSet::new();
        let mut pairs = HashSet::new();
        for edge in self.edges() {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(GraphError::DuplicateId(edge.id.clone()));
            }
            if !pairs.insert((&edge.source, &edge.target)) {
                return Err(GraphError::Integrity(format!(
                    "edge '{}' duplicates {} -> {}",
                    edge.id, edge.source, edge.target
                )));
            }
            if edge.source.node_id == edge.target.node_id {
                return Err(GraphError::Integrity(format!("edge '{}' is a self-loop", edge.id)));
            }
            let source = self
                .find_port(&edge.source.node_id, &edge.source.port_id, PortDirection::Output)
                .ok_or_else(|| {
                    GraphError::Integrity(format!("edge '{}' has a dangling source {}", edge.id, edge.source))
                })?;
            let target = self
                .find_port(&edge.target.node_id, &edge.target.port_id, PortDirection::Input)
                .ok_or_else(|| {
                    GraphError::Integrity(format!("edge '{}' has a dangling target {}", edge.id, edge.target))
                })?;
            if source.signal_type != edge.signal_type || target.signal_type != edge.signal_type {
                return Err(GraphError::Integrity(format!(
                    "edge '{}' carries {} between {} and {} ports",
                    edge.id, edge.signal_type, source.signal_type, target.signal_type
                )));
            }
        }
        Ok(())
    }

    /// Push an edge without validation. Only for building corrupt fixtures in tests.
    #[cfg(test)]
    pub(crate) fn push_edge_unchecked(&mut self, edge: Edge) {
        self.edges.push(Rc::new(edge));
    }
}
