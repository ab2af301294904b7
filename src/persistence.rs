//! The JSON document a strategy graph is stored as.
//!
//! ```json
//! { "nodes": [{ "id", "kind", "category", "x", "y", "isAnchor", "params" }],
//!   "edges": [{ "id", "source": { "nodeId", "portId" }, "target": { ... }, "signalType" }] }
//! ```
//!
//! Ports and sizes are not stored; they come from the [`Catalog`] entry for
//! each node's kind. Older documents may store edges as
//! `{ "from", "to", "fromPort"?, "toPort"? }`; those are normalized on load.

use crate::catalog::{Catalog, PreferredAnchorPorts};
use crate::connection::{AnchorPortValidator, LinkValidator};
use crate::error::{GraphError, PersistenceError};
use crate::geometry::Point;
use crate::graph::{Edge, EdgeId, Graph, Node, NodeId, Params, PortDirection, PortId, PortRef, SignalType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: String,
    #[serde(default)]
    pub category: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub is_anchor: bool,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source: PortRef,
    pub target: PortRef,
    pub signal_type: SignalType,
}

/// The pre-typed edge shape. Missing ports are inferred on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEdgeRecord {
    #[serde(default)]
    pub id: Option<EdgeId>,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub from_port: Option<PortId>,
    #[serde(default)]
    pub to_port: Option<PortId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum StoredEdge {
    Canonical(EdgeRecord),
    Legacy(LegacyEdgeRecord),
}

#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    nodes: Vec<NodeRecord>,
    /// Parsed one by one so a malformed edge is skipped, not fatal.
    #[serde(default)]
    edges: Vec<serde_json::Value>,
}

/// A graph in its canonical stored form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphDocument {
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            nodes: graph
                .nodes()
                .map(|n| NodeRecord {
                    id: n.id.clone(),
                    kind: n.kind.clone(),
                    category: n.category.clone(),
                    x: n.position.x,
                    y: n.position.y,
                    is_anchor: n.is_anchor,
                    params: n.params.clone(),
                })
                .collect(),
            edges: graph
                .edges()
                .map(|e| EdgeRecord {
                    id: e.id.clone(),
                    source: e.source.clone(),
                    target: e.target.clone(),
                    signal_type: e.signal_type,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// An edge left out of a loaded graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEdge {
    /// Position in the document's `edges` array.
    pub index: usize,
    pub reason: String,
}

/// What happened while loading a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub nodes: usize,
    pub edges: usize,
    /// Legacy edges converted to the canonical shape.
    pub normalized: usize,
    pub skipped: Vec<SkippedEdge>,
}

pub fn save_graph(graph: &Graph) -> Result<String, PersistenceError> {
    GraphDocument::from_graph(graph).to_json()
}

/// Parse a document and rebuild the graph.
///
/// Node failures (unknown kind, duplicate id, second anchor) abort the load.
/// Edge failures skip that edge and are listed in the report. That includes
/// malformed edge records and config edges bound to the wrong anchor port.
pub fn load_graph(json: &str, catalog: &Catalog) -> Result<(Graph, LoadReport), PersistenceError> {
    let stored: StoredDocument = serde_json::from_str(json)?;
    let preferred = catalog.preferred_anchor_ports();
    let mut graph = Graph::new();
    let mut report = LoadReport::default();

    for record in stored.nodes {
        graph.add_node(node_from_record(record, catalog)?)?;
        report.nodes += 1;
    }

    let edges: Vec<Result<StoredEdge, serde_json::Error>> =
        stored.edges.into_iter().map(serde_json::from_value).collect();
    let mut used: HashSet<EdgeId> = edges
        .iter()
        .filter_map(|e| match e {
            Ok(StoredEdge::Canonical(r)) => Some(r.id.clone()),
            Ok(StoredEdge::Legacy(r)) => r.id.clone(),
            Err(_) => None,
        })
        .collect();
    let mut counter = 0u64;
    let anchor_rule = AnchorPortValidator::new(&preferred);

    for (index, parsed) in edges.into_iter().enumerate() {
        let edge = match parsed {
            Err(err) => Err(PersistenceError::from(err)),
            Ok(StoredEdge::Canonical(r)) => Ok(Edge {
                id: r.id,
                source: r.source,
                target: r.target,
                signal_type: r.signal_type,
            }),
            Ok(StoredEdge::Legacy(r)) => {
                let id = r.id.clone().unwrap_or_else(|| fresh_edge_id(&mut used, &mut counter));
                normalize_legacy(&graph, &r, id, &preferred).map(|edge| {
                    report.normalized += 1;
                    edge
                })
            }
        };
        let result = edge.and_then(|edge| {
            anchor_rule
                .validate(&graph, &edge.source, &edge.target)
                .into_result()
                .map_err(GraphError::from)?;
            graph.insert_edge(edge)?;
            Ok(())
        });
        match result {
            Ok(()) => report.edges += 1,
            Err(err) => {
                warn!(index, %err, "skipping edge while loading graph");
                report.skipped.push(SkippedEdge {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }

    graph.check_integrity()?;
    info!(
        nodes = report.nodes,
        edges = report.edges,
        skipped = report.skipped.len(),
        "loaded strategy graph"
    );
    Ok((graph, report))
}

fn node_from_record(record: NodeRecord, catalog: &Catalog) -> Result<Node, PersistenceError> {
    let mut node = catalog.instantiate(&record.kind, record.id, Point::new(record.x, record.y))?;
    if !record.category.is_empty() {
        node.category = record.category;
    }
    node.is_anchor |= record.is_anchor;
    node.params = record.params;
    Ok(node)
}

fn fresh_edge_id(used: &mut HashSet<EdgeId>, counter: &mut u64) -> EdgeId {
    loop {
        *counter += 1;
        let id = format!("e{counter}");
        if used.insert(id.clone()) {
            return id;
        }
    }
}

/// Resolve a legacy edge's ports.
///
/// The source is the named port or the first output of `from`. The target is
/// the named port; failing that, the preferred anchor port for config sources
/// wired into the anchor; failing that, the first input of `to` carrying the
/// source's signal type.
fn normalize_legacy(
    graph: &Graph,
    record: &LegacyEdgeRecord,
    id: EdgeId,
    preferred: &PreferredAnchorPorts,
) -> Result<Edge, PersistenceError> {
    let unresolved = || PersistenceError::UnresolvedLegacyEdge {
        from: record.from.clone(),
        to: record.to.clone(),
    };
    let from = graph.node(&record.from).ok_or_else(unresolved)?;
    let to = graph.node(&record.to).ok_or_else(unresolved)?;

    let source_port = match &record.from_port {
        Some(port_id) => from.port(port_id, PortDirection::Output),
        None => from.outputs().next(),
    }
    .ok_or_else(unresolved)?;
    let signal_type = source_port.signal_type;

    let target_port_id = match &record.to_port {
        Some(port_id) => Some(port_id.clone()),
        None => {
            let anchor_port = (to.is_anchor && signal_type == SignalType::Config)
                .then(|| preferred.get(&from.kind))
                .flatten();
            anchor_port.map(str::to_string).or_else(|| {
                to.inputs()
                    .find(|p| p.signal_type == signal_type)
                    .map(|p| p.id.clone())
            })
        }
    }
    .ok_or_else(unresolved)?;

    Ok(Edge {
        id,
        source: PortRef::new(from.id.clone(), source_port.id.clone()),
        target: PortRef::new(to.id.clone(), target_port_id),
        signal_type,
    })
}
