//! Discrete, undoable editing actions.
//!
//! Every action snapshots the graph, attempts the mutation, and records the
//! snapshot only when the mutation succeeded. A failed action leaves both the
//! graph and the history untouched.

use crate::catalog::Catalog;
use crate::connection::{AnchorPortValidator, ConnectionValidator, ResolvedConnection};
use crate::error::{GraphError, HistoryError, PersistenceError, ValidationError};
use crate::geometry::Point;
use crate::graph::{Edge, EdgeId, Graph, Node, NodeId, PortDirection, PortRef};
use crate::history::HistoryManager;
use crate::persistence::{load_graph, save_graph, LoadReport};
use crate::selection::SelectionManager;
use crate::settings::EditorSettings;
use std::collections::HashMap;
use tracing::{debug, warn};

/// What a delete action removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Removed {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl Removed {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// One editing session: the live graph plus everything needed to edit it.
#[derive(Debug, Clone)]
pub struct Session {
    graph: Graph,
    selection: SelectionManager,
    history: HistoryManager,
    validator: ConnectionValidator,
    catalog: Catalog,
    settings: EditorSettings,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Catalog::strategy_defaults(), EditorSettings::default())
    }
}

impl Session {
    /// A session with an empty graph. Call [`ensure_anchor`](Self::ensure_anchor)
    /// to place the anchor node.
    pub fn new(catalog: Catalog, settings: EditorSettings) -> Self {
        Self {
            graph: Graph::new(),
            selection: SelectionManager::new(),
            history: HistoryManager::new(settings.history_capacity),
            validator: ConnectionValidator::new(catalog.preferred_anchor_ports()),
            catalog,
            settings,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn validator(&self) -> &ConnectionValidator {
        &self.validator
    }

    /// Direct graph access for gestures, which manage their own history entry.
    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub(crate) fn selection_mut(&mut self) -> &mut SelectionManager {
        &mut self.selection
    }

    pub(crate) fn push_history(&mut self, snapshot: Graph) {
        self.history.push(snapshot);
    }

    pub(crate) fn graph_and_validator(&mut self) -> (&mut Graph, &ConnectionValidator) {
        (&mut self.graph, &self.validator)
    }

    /// Place the anchor node if the graph has none. Not recorded in history.
    pub fn ensure_anchor(&mut self) -> Result<Option<NodeId>, GraphError> {
        if self.graph.anchor().is_some() {
            return Ok(None);
        }
        let template = self
            .catalog
            .anchor_template()
            .ok_or_else(|| GraphError::UnknownKind("anchor".into()))?;
        let id = self.next_node_id(&template.kind);
        let node = template.instantiate(id.clone(), self.settings.anchor_position);
        self.graph.add_node(node)?;
        debug!(node = %id, "placed anchor node");
        Ok(Some(id))
    }

    /// A fresh id of the form `<kind>_<n>`.
    pub fn next_node_id(&self, kind: &str) -> NodeId {
        (1u64..)
            .map(|n| format!("{kind}_{n}"))
            .find(|id| !self.graph.contains_node(id))
            .unwrap_or_else(|| format!("{kind}_{}", self.graph.node_count() + 1))
    }

    /// Create a node of `kind` from the catalog.
    pub fn place_node(&mut self, kind: &str, position: Point) -> Result<NodeId, GraphError> {
        let id = self.next_node_id(kind);
        let node = self.catalog.instantiate(kind, id.clone(), position)?;
        self.add_node(node)?;
        Ok(id)
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        let before = self.graph.snapshot();
        self.graph.add_node(node)?;
        self.history.push(before);
        Ok(())
    }

    /// Remove a node and its edges. The anchor is refused.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<EdgeId>, GraphError> {
        let before = self.graph.snapshot();
        let removed = self.graph.remove_node(id)?;
        self.history.push(before);
        self.selection.retain_existing(&self.graph);
        Ok(removed)
    }

    /// Delete the selected nodes as one action, or the selected edge when no
    /// node is selected. The anchor is skipped.
    pub fn delete_selection(&mut self) -> Result<Removed, GraphError> {
        let ids: Vec<NodeId> = self
            .selection
            .ordered_ids(&self.graph)
            .into_iter()
            .filter(|id| self.graph.node(id).is_some_and(|n| !n.is_anchor))
            .collect();

        if ids.is_empty() {
            return Ok(match self.delete_selected_edge()? {
                Some(edge) => Removed {
                    nodes: Vec::new(),
                    edges: vec![edge.id],
                },
                None => Removed::default(),
            });
        }

        let before = self.graph.snapshot();
        let mut removed = Removed::default();
        for id in ids {
            match self.graph.remove_node(&id) {
                Ok(edges) => {
                    removed.edges.extend(edges);
                    removed.nodes.push(id);
                }
                Err(err) => {
                    self.graph = before;
                    return Err(err);
                }
            }
        }
        self.history.push(before);
        self.selection.retain_existing(&self.graph);
        Ok(removed)
    }

    /// Validate and insert an edge.
    ///
    /// Config edges into the anchor bind to the source kind's preferred port,
    /// whichever anchor port was asked for.
    pub fn connect(&mut self, source: PortRef, target: PortRef) -> Result<EdgeId, ValidationError> {
        let target = self.anchor_target(&source, target);
        let before = self.graph.snapshot();
        let rule = AnchorPortValidator::new(self.validator.preferred_ports());
        let id = self.graph.add_edge_with(source, target, &rule)?;
        self.history.push(before);
        Ok(id)
    }

    fn anchor_target(&self, source: &PortRef, target: PortRef) -> PortRef {
        let redirected = self
            .graph
            .find_port(&source.node_id, &source.port_id, PortDirection::Output)
            .and_then(|port| {
                self.validator
                    .redirect_target(&self.graph, source, &target, port.signal_type)
            });
        match redirected {
            Some(preferred) => {
                debug!(from = %target, to = %preferred, "redirecting connection to preferred anchor port");
                preferred
            }
            None => target,
        }
    }

    pub fn connect_resolved(&mut self, connection: &ResolvedConnection) -> Result<EdgeId, ValidationError> {
        self.connect(connection.source.clone(), connection.target.clone())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, GraphError> {
        let before = self.graph.snapshot();
        let edge = self.graph.remove_edge(id)?;
        self.history.push(before);
        self.selection.retain_existing(&self.graph);
        Ok(edge)
    }

    pub fn delete_selected_edge(&mut self) -> Result<Option<Edge>, GraphError> {
        match self.selection.selected_edge().map(str::to_string) {
            Some(id) => self.remove_edge(&id).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_param(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, GraphError> {
        let before = self.graph.snapshot();
        let previous = self.graph.set_param(id, key, value)?;
        self.history.push(before);
        Ok(previous)
    }

    /// Copy the selected nodes and the edges among them, offset by
    /// `clone_offset`. The copies become the selection.
    pub fn clone_selection(&mut self) -> Result<Vec<NodeId>, GraphError> {
        let originals: Vec<Node> = self
            .selection
            .ordered_ids(&self.graph)
            .iter()
            .filter_map(|id| self.graph.node(id))
            .filter(|n| !n.is_anchor)
            .cloned()
            .collect();
        if originals.is_empty() {
            return Ok(Vec::new());
        }

        let before = self.graph.snapshot();
        let offset = self.settings.clone_offset;
        let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
        for original in &originals {
            let id = self.next_node_id(&original.kind);
            let mut copy = original.clone();
            copy.id = id.clone();
            copy.position = original.position.offset(offset, offset);
            if let Err(err) = self.graph.add_node(copy) {
                self.graph = before;
                return Err(err);
            }
            mapping.insert(original.id.clone(), id);
        }

        let internal: Vec<(PortRef, PortRef)> = self
            .graph
            .edges()
            .filter_map(|e| {
                let source = mapping.get(&e.source.node_id)?;
                let target = mapping.get(&e.target.node_id)?;
                Some((
                    PortRef::new(source.clone(), e.source.port_id.clone()),
                    PortRef::new(target.clone(), e.target.port_id.clone()),
                ))
            })
            .collect();
        for (source, target) in internal {
            if let Err(reason) = self.graph.add_edge(source, target) {
                self.graph = before;
                return Err(reason.into());
            }
        }

        self.history.push(before);
        let clones: Vec<NodeId> = originals.iter().filter_map(|n| mapping.get(&n.id).cloned()).collect();
        self.selection.replace_selection(clones.iter().cloned());
        Ok(clones)
    }

    pub fn select_node(&mut self, id: &str, extend: bool) -> Result<(), GraphError> {
        if !self.graph.contains_node(id) {
            return Err(GraphError::NodeNotFound(id.to_string()));
        }
        self.selection.handle_interaction(id, extend);
        Ok(())
    }

    pub fn select_edge(&mut self, id: &str) -> Result<(), GraphError> {
        if self.graph.edge(id).is_none() {
            return Err(GraphError::EdgeNotFound(id.to_string()));
        }
        self.selection.select_edge(id);
        Ok(())
    }

    pub fn select_all(&mut self) {
        let ids: Vec<NodeId> = self.graph.nodes().map(|n| n.id.clone()).collect();
        self.selection.replace_selection(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn undo(&mut self) -> Result<(), HistoryError> {
        self.history.undo(&mut self.graph)?;
        self.selection.retain_existing(&self.graph);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), HistoryError> {
        self.history.redo(&mut self.graph)?;
        self.selection.retain_existing(&self.graph);
        Ok(())
    }

    /// Replace the graph with a stored document. History and selection are
    /// cleared, and an anchor is placed if the document has none.
    pub fn load_json(&mut self, json: &str) -> Result<LoadReport, PersistenceError> {
        let (graph, report) = load_graph(json, &self.catalog)?;
        self.graph = graph;
        self.history.clear();
        self.selection.clear();
        if let Err(err) = self.ensure_anchor() {
            warn!(%err, "loaded graph has no anchor and none could be placed");
        }
        Ok(report)
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        save_graph(&self.graph)
    }

    /// Lay the graph out left to right as one undoable action.
    #[cfg(feature = "layout")]
    pub fn arrange(&mut self) -> Result<usize, GraphError> {
        let positions = crate::layout::arrange(&self.graph, self.settings.anchor_position);
        if positions.is_empty() {
            return Ok(0);
        }
        let before = self.graph.snapshot();
        for (id, position) in &positions {
            if let Err(err) = self.graph.move_node(id, *position) {
                self.graph = before;
                return Err(err);
            }
        }
        self.history.push(before);
        tracing::info!(nodes = positions.len(), "arranged strategy graph");
        Ok(positions.len())
    }
}
