//! Post-drag geometry: overlap repulsion and nearest-port auto-snap.
//!
//! Both run once when a drag gesture ends, never on intermediate frames.

use crate::connection::ConnectionValidator;
use crate::geometry::{Point, Rect};
use crate::graph::{EdgeId, Graph, NodeId, PortDirection, PortRef};
use std::collections::HashSet;
use tracing::debug;

/// A displacement applied to one node by the repulsion pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Push {
    pub node_id: NodeId,
    pub dx: f64,
    pub dy: f64,
}

/// The displacement `other` needs to sit at least `clearance` away from `moved`.
///
/// Returns `None` when the boxes are already clear on either axis. Otherwise the
/// push goes along the axis needing the smaller correction (horizontal on a tie),
/// away from the moved box's center. A push that would cross the origin is
/// flipped to the positive side instead, since positions are clamped there.
pub fn required_push(moved: &Rect, other: &Rect, clearance: f64) -> Option<(f64, f64)> {
    let gap_x = moved.gap_x(other);
    let gap_y = moved.gap_y(other);
    if gap_x >= clearance || gap_y >= clearance {
        return None;
    }

    let overlap_x = clearance - gap_x;
    let overlap_y = clearance - gap_y;
    let moved_center = moved.center();
    let other_center = other.center();

    if overlap_x <= overlap_y {
        let dx = if other_center.x >= moved_center.x {
            overlap_x
        } else if other.left - overlap_x >= 0.0 {
            -overlap_x
        } else {
            moved.right + clearance - other.left
        };
        Some((dx, 0.0))
    } else {
        let dy = if other_center.y >= moved_center.y {
            overlap_y
        } else if other.top - overlap_y >= 0.0 {
            -overlap_y
        } else {
            moved.bottom + clearance - other.top
        };
        Some((0.0, dy))
    }
}

/// Push every node outside `moved` away from each moved node, in a single pass.
///
/// Members of `moved` are never pushed. Returns the pushes applied, in order.
pub fn repel(graph: &mut Graph, moved: &[NodeId], clearance: f64) -> Vec<Push> {
    let group: HashSet<&str> = moved.iter().map(String::as_str).collect();
    let others: Vec<NodeId> = graph
        .nodes()
        .filter(|n| !group.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();

    let mut pushes = Vec::new();
    for moved_id in moved {
        let Some(moved_rect) = graph.node(moved_id).map(|n| n.rect()) else {
            continue;
        };
        for other_id in &others {
            let Some(other) = graph.node(other_id) else {
                continue;
            };
            let Some((dx, dy)) = required_push(&moved_rect, &other.rect(), clearance) else {
                continue;
            };
            let target = other.position.offset(dx, dy);
            if graph.move_node(other_id, target).is_ok() {
                debug!(node = %other_id, by = %moved_id, dx, dy, "repelled overlapping node");
                pushes.push(Push {
                    node_id: other_id.clone(),
                    dx,
                    dy,
                });
            }
        }
    }
    pushes
}

/// The closest eligible port pair between a dropped node and any other node.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapCandidate {
    pub source: PortRef,
    pub target: PortRef,
    pub distance: f64,
}

/// Search every port of `node_id` against every compatible port elsewhere.
///
/// Only pairs [`ConnectionValidator::is_snap_eligible`] accepts are considered.
/// The global minimum must be strictly below `radius`; the first pair found at
/// that distance wins.
pub fn find_snap(
    graph: &Graph,
    node_id: &str,
    validator: &ConnectionValidator,
    radius: f64,
) -> Option<SnapCandidate> {
    let dropped = graph.node(node_id)?;
    let mut best: Option<SnapCandidate> = None;

    for port in &dropped.ports {
        let Some(center) = dropped.port_center(&port.id, port.direction) else {
            continue;
        };
        for other in graph.nodes().filter(|n| n.id != node_id) {
            for candidate in other
                .ports
                .iter()
                .filter(|p| p.direction == port.direction.opposite() && p.signal_type == port.signal_type)
            {
                let Some(candidate_center) = other.port_center(&candidate.id, candidate.direction) else {
                    continue;
                };
                let distance = center.distance(candidate_center);
                if distance >= radius || best.as_ref().is_some_and(|b| distance >= b.distance) {
                    continue;
                }

                let ours = PortRef::new(dropped.id.clone(), port.id.clone());
                let theirs = PortRef::new(other.id.clone(), candidate.id.clone());
                let (source, target) = match port.direction {
                    PortDirection::Output => (ours, theirs),
                    PortDirection::Input => (theirs, ours),
                };
                if validator.is_snap_eligible(graph, &source, &target) {
                    best = Some(SnapCandidate {
                        source,
                        target,
                        distance,
                    });
                }
            }
        }
    }

    best
}

/// Create at most one edge from the dropped node to its nearest eligible port.
pub fn auto_snap(graph: &mut Graph, node_id: &str, validator: &ConnectionValidator, radius: f64) -> Option<EdgeId> {
    let candidate = find_snap(graph, node_id, validator, radius)?;
    match graph.add_edge(candidate.source.clone(), candidate.target.clone()) {
        Ok(id) => {
            debug!(
                edge = %id,
                source = %candidate.source,
                target = %candidate.target,
                distance = candidate.distance,
                "auto-snapped edge"
            );
            Some(id)
        }
        Err(reason) => {
            debug!(%reason, "auto-snap candidate rejected");
            None
        }
    }
}

/// Whether two boxes violate the clearance on both axes at once.
pub fn too_close(a: &Rect, b: &Rect, clearance: f64) -> bool {
    a.gap_x(b) < clearance && a.gap_y(b) < clearance
}

/// Positions of the given nodes, for restoring after a cancelled gesture.
pub fn positions_of(graph: &Graph, ids: &[NodeId]) -> Vec<(NodeId, Point)> {
    ids.iter()
        .filter_map(|id| graph.node(id).map(|n| (id.clone(), n.position)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PreferredAnchorPorts;
    use crate::geometry::Size;
    use crate::graph::{Node, Port, SignalType};

    fn block(id: &str, x: f64, y: f64, ports: Vec<Port>) -> Node {
        Node::new(id, "test", "test", Size::new(160.0, 80.0), ports).at(Point::new(x, y))
    }

    // ========================================================================
    // required_push()
    // ========================================================================

    #[test]
    fn test_touching_boxes_push_horizontally_on_tie() {
        // gapX = 0 and gapY = 0, clearance 10: overlapX == overlapY
        let moved = Rect::new(0.0, 0.0, 100.0, 100.0);
        let other = Rect::new(100.0, 100.0, 200.0, 200.0);
        assert_eq!(required_push(&moved, &other, 10.0), Some((10.0, 0.0)));
    }

    #[test]
    fn test_push_along_smaller_correction() {
        let moved = Rect::new(0.0, 0.0, 100.0, 100.0);
        // overlaps 80 on x but only 5 on y
        let other = Rect::new(20.0, 95.0, 120.0, 195.0);
        assert_eq!(required_push(&moved, &other, 10.0), Some((0.0, 15.0)));
    }

    #[test]
    fn test_push_away_from_moved_center() {
        let moved = Rect::new(200.0, 0.0, 300.0, 100.0);
        let other = Rect::new(110.0, 0.0, 205.0, 100.0);
        // gapX = -5, overlapX = 15, pushed left
        assert_eq!(required_push(&moved, &other, 10.0), Some((-15.0, 0.0)));
    }

    #[test]
    fn test_no_push_when_clear_on_one_axis() {
        let moved = Rect::new(0.0, 0.0, 100.0, 100.0);
        let other = Rect::new(50.0, 110.0, 150.0, 200.0);
        assert_eq!(required_push(&moved, &other, 10.0), None);
    }

    #[test]
    fn test_push_near_origin_flips_to_positive_side() {
        let moved = Rect::new(20.0, 0.0, 120.0, 100.0);
        let other = Rect::new(0.0, 0.0, 100.0, 100.0);
        let (dx, dy) = required_push(&moved, &other, 10.0).unwrap();
        assert_eq!(dy, 0.0);
        assert_eq!(dx, 130.0);
        let pushed = Rect::new(other.left + dx, 0.0, other.right + dx, 100.0);
        assert!(!too_close(&moved, &pushed, 10.0));
    }

    // ========================================================================
    // repel()
    // ========================================================================

    #[test]
    fn test_repel_pushes_only_non_group_nodes() {
        let mut graph = Graph::new();
        graph.add_node(block("moved", 100.0, 100.0, vec![])).unwrap();
        graph.add_node(block("mate", 150.0, 120.0, vec![])).unwrap();
        graph.add_node(block("other", 255.0, 100.0, vec![])).unwrap();

        let pushes = repel(&mut graph, &["moved".to_string(), "mate".to_string()], 10.0);

        assert!(pushes.iter().all(|p| p.node_id == "other"));
        assert_eq!(graph.node("mate").unwrap().position, Point::new(150.0, 120.0));
        let moved = graph.node("moved").unwrap().rect();
        let other = graph.node("other").unwrap().rect();
        assert!(!too_close(&moved, &other, 10.0));
    }

    #[test]
    fn test_repel_exact_clearance() {
        let mut graph = Graph::new();
        graph.add_node(block("a", 0.0, 0.0, vec![])).unwrap();
        graph.add_node(block("b", 160.0, 80.0, vec![])).unwrap();

        let pushes = repel(&mut graph, &["a".to_string()], 10.0);
        assert_eq!(
            pushes,
            vec![Push {
                node_id: "b".into(),
                dx: 10.0,
                dy: 0.0
            }]
        );
        assert_eq!(graph.node("b").unwrap().position, Point::new(170.0, 80.0));
    }

    // ========================================================================
    // auto_snap()
    // ========================================================================

    fn snap_graph(b_x: f64) -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node(block("a", 100.0, 100.0, vec![Port::output("out", SignalType::Data)]))
            .unwrap();
        graph
            .add_node(block("b", b_x, 100.0, vec![Port::input("in", SignalType::Data)]))
            .unwrap();
        graph
    }

    #[test]
    fn test_auto_snap_within_radius() {
        // b.in at (300, 140), a.out at (260, 140): 40 apart
        let mut graph = snap_graph(300.0);
        let validator = ConnectionValidator::default();
        let id = auto_snap(&mut graph, "b", &validator, 50.0).unwrap();
        let edge = graph.edge(&id).unwrap();
        assert_eq!(edge.source, PortRef::new("a", "out"));
        assert_eq!(edge.target, PortRef::new("b", "in"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_auto_snap_radius_is_strict() {
        let mut graph = snap_graph(310.0);
        assert!(auto_snap(&mut graph, "b", &ConnectionValidator::default(), 50.0).is_none());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_auto_snap_never_duplicates() {
        let mut graph = snap_graph(300.0);
        let validator = ConnectionValidator::default();
        assert!(auto_snap(&mut graph, "b", &validator, 50.0).is_some());
        assert!(auto_snap(&mut graph, "b", &validator, 50.0).is_none());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_auto_snap_ignores_type_mismatch() {
        let mut graph = Graph::new();
        graph
            .add_node(block("a", 100.0, 100.0, vec![Port::output("out", SignalType::Condition)]))
            .unwrap();
        graph
            .add_node(block("b", 270.0, 100.0, vec![Port::input("in", SignalType::Data)]))
            .unwrap();
        assert!(find_snap(&graph, "b", &ConnectionValidator::default(), 50.0).is_none());
    }

    #[test]
    fn test_auto_snap_respects_preferred_anchor_port() {
        let mut graph = Graph::new();
        graph
            .add_node(
                Node::new("stop", "stop_loss", "exit", Size::new(160.0, 80.0), vec![Port::output("config", SignalType::Config)])
                    .at(Point::new(100.0, 100.0)),
            )
            .unwrap();
        // anchor inputs: otherPort at y = 126.67, riskPort at y = 153.33
        graph
            .add_node(
                Node::new(
                    "anchor",
                    "strategy",
                    "strategy",
                    Size::new(160.0, 80.0),
                    vec![Port::input("otherPort", SignalType::Config), Port::input("riskPort", SignalType::Config)],
                )
                .at(Point::new(280.0, 100.0))
                .as_anchor(),
            )
            .unwrap();

        let mut table = PreferredAnchorPorts::default();
        table.insert("stop_loss", "riskPort");
        let validator = ConnectionValidator::new(table);

        let snap = find_snap(&graph, "stop", &validator, 50.0).unwrap();
        assert_eq!(snap.target, PortRef::new("anchor", "riskPort"));
    }

    #[test]
    fn test_find_snap_missing_node() {
        let graph = snap_graph(300.0);
        assert!(find_snap(&graph, "zzz", &ConnectionValidator::default(), 50.0).is_none());
    }
}
