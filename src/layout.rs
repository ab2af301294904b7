//! Sugiyama auto-arrange for strategy graphs.
//!
//! Layered layout via the `rust-sugiyama` crate. Strategy graphs flow left to
//! right, from price sources through indicators and logic into the anchor.
//!
//! Requires the `layout` feature.

use std::collections::{HashMap, HashSet};

use crate::geometry::Point;
use crate::graph::{Graph, NodeId};

/// Layout direction for the Sugiyama algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    TopToBottom,
    /// Layers flow left to right (default).
    #[default]
    LeftToRight,
}

/// Configuration for the Sugiyama layout.
#[derive(Debug, Clone, Copy)]
pub struct SugiyamaConfig {
    /// Minimum spacing between vertices in a layer.
    pub vertex_spacing: f64,
    /// Minimum edge length between layers (0 uses the `rust-sugiyama` default).
    pub minimum_length: u32,
    pub direction: Direction,
}

impl Default for SugiyamaConfig {
    fn default() -> Self {
        Self {
            vertex_spacing: 60.0,
            minimum_length: 0,
            direction: Direction::LeftToRight,
        }
    }
}

/// Compute layered positions for the given node sizes and node-level edges.
///
/// Returned positions are top-left corners in the layout's own frame. Edges
/// naming unknown nodes are skipped; duplicate node ids keep the first size.
pub fn sugiyama_layout(
    edges: &[(NodeId, NodeId)],
    node_sizes: &[(NodeId, (f64, f64))],
    config: &SugiyamaConfig,
) -> Vec<(NodeId, Point)> {
    if node_sizes.is_empty() {
        return Vec::new();
    }

    let horizontal = config.direction == Direction::LeftToRight;

    let mut id_to_idx: HashMap<&str, u32> = HashMap::new();
    let mut vertices: Vec<(u32, (f64, f64))> = Vec::with_capacity(node_sizes.len());
    let mut idx_to_id: Vec<&NodeId> = Vec::with_capacity(node_sizes.len());
    for (id, (w, h)) in node_sizes {
        if id_to_idx.contains_key(id.as_str()) {
            continue;
        }
        let idx = idx_to_id.len() as u32;
        id_to_idx.insert(id.as_str(), idx);
        idx_to_id.push(id);
        // Swap so the algorithm spaces layers along what becomes the x-axis.
        let size = if horizontal { (*h, *w) } else { (*w, *h) };
        vertices.push((idx, size));
    }

    let mapped_edges: Vec<(u32, u32)> = edges
        .iter()
        .filter_map(|(src, dst)| Some((*id_to_idx.get(src.as_str())?, *id_to_idx.get(dst.as_str())?)))
        .filter(|(src, dst)| src != dst)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut sg_config = rust_sugiyama::configure::Config {
        dummy_vertices: false,
        vertex_spacing: config.vertex_spacing,
        ..Default::default()
    };
    if config.minimum_length > 0 {
        sg_config.minimum_length = config.minimum_length;
    }

    let subgraphs = rust_sugiyama::from_vertices_and_edges(&vertices, &mapped_edges, &sg_config);

    let mut results = Vec::with_capacity(idx_to_id.len());
    for (layout, _width, _height) in &subgraphs {
        for &(idx, (x, y)) in layout {
            if let Some(id) = idx_to_id.get(idx) {
                let (px, py) = if horizontal { (y, x) } else { (x, y) };
                results.push(((*id).clone(), Point::new(px, py)));
            }
        }
    }
    results
}

/// Lay out every node of `graph` left to right, translated so the
/// top-left-most position lands on `origin`.
pub fn arrange(graph: &Graph, origin: Point) -> Vec<(NodeId, Point)> {
    arrange_with(graph, origin, &SugiyamaConfig::default())
}

pub fn arrange_with(graph: &Graph, origin: Point, config: &SugiyamaConfig) -> Vec<(NodeId, Point)> {
    let sizes: Vec<(NodeId, (f64, f64))> = graph
        .nodes()
        .map(|n| (n.id.clone(), (n.size.width, n.size.height)))
        .collect();
    let edges: Vec<(NodeId, NodeId)> = graph
        .edges()
        .map(|e| (e.source.node_id.clone(), e.target.node_id.clone()))
        .collect();

    let mut positions = sugiyama_layout(&edges, &sizes, config);
    let min_x = positions.iter().map(|(_, p)| p.x).fold(f64::INFINITY, f64::min);
    let min_y = positions.iter().map(|(_, p)| p.y).fold(f64::INFINITY, f64::min);
    if min_x.is_finite() && min_y.is_finite() {
        for (_, p) in &mut positions {
            *p = p.offset(origin.x - min_x, origin.y - min_y);
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::graph::PortRef;

    fn pos_map(positions: Vec<(NodeId, Point)>) -> HashMap<NodeId, Point> {
        positions.into_iter().collect()
    }

    fn sized(ids: &[&str]) -> Vec<(NodeId, (f64, f64))> {
        ids.iter().map(|id| (id.to_string(), (80.0, 40.0))).collect()
    }

    fn edge(a: &str, b: &str) -> (NodeId, NodeId) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_empty_input() {
        assert!(sugiyama_layout(&[], &[], &SugiyamaConfig::default()).is_empty());
    }

    #[test]
    fn test_default_flows_left_to_right() {
        let result = sugiyama_layout(&[edge("a", "b")], &sized(&["a", "b"]), &SugiyamaConfig::default());
        let pos = pos_map(result);
        assert!(pos["a"].x < pos["b"].x, "source should be in an earlier layer");
    }

    #[test]
    fn test_diamond_middle_layer_aligned() {
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")];
        let pos = pos_map(sugiyama_layout(&edges, &sized(&["a", "b", "c", "d"]), &SugiyamaConfig::default()));
        assert!(pos["a"].x < pos["d"].x);
        assert!((pos["b"].x - pos["c"].x).abs() < 1.0);
    }

    #[test]
    fn test_top_to_bottom_separates_in_y() {
        let config = SugiyamaConfig {
            direction: Direction::TopToBottom,
            ..Default::default()
        };
        let pos = pos_map(sugiyama_layout(&[edge("a", "b")], &sized(&["a", "b"]), &config));
        assert!(pos["a"].y < pos["b"].y);
    }

    #[test]
    fn test_unknown_edges_and_duplicate_ids_ignored() {
        let mut sizes = sized(&["a"]);
        sizes.push(("a".to_string(), (300.0, 300.0)));
        let result = sugiyama_layout(&[edge("a", "ghost")], &sizes, &SugiyamaConfig::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "a");
    }

    #[test]
    fn test_arrange_strategy_graph() {
        let catalog = Catalog::strategy_defaults();
        let mut graph = Graph::new();
        graph
            .add_node(catalog.instantiate("strategy", "strategy_1", Point::new(40.0, 40.0)).unwrap())
            .unwrap();
        graph
            .add_node(catalog.instantiate("price", "price_1", Point::new(900.0, 900.0)).unwrap())
            .unwrap();
        graph
            .add_node(catalog.instantiate("crossover", "crossover_1", Point::new(500.0, 20.0)).unwrap())
            .unwrap();
        graph
            .add_node(catalog.instantiate("buy", "buy_1", Point::new(0.0, 600.0)).unwrap())
            .unwrap();
        graph
            .add_edge(PortRef::new("price_1", "value"), PortRef::new("crossover_1", "fast"))
            .unwrap();
        graph
            .add_edge(PortRef::new("crossover_1", "out"), PortRef::new("buy_1", "when"))
            .unwrap();
        graph
            .add_edge(PortRef::new("buy_1", "signal"), PortRef::new("strategy_1", "entry"))
            .unwrap();

        let origin = Point::new(40.0, 40.0);
        let pos = pos_map(arrange(&graph, origin));
        assert_eq!(pos.len(), 4);
        assert!(pos["price_1"].x < pos["crossover_1"].x);
        assert!(pos["crossover_1"].x < pos["buy_1"].x);
        assert!(pos["buy_1"].x < pos["strategy_1"].x);

        let min_x = pos.values().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = pos.values().map(|p| p.y).fold(f64::INFINITY, f64::min);
        assert!((min_x - origin.x).abs() < 1e-9);
        assert!((min_y - origin.y).abs() < 1e-9);
    }
}
