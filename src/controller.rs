//! Pointer gestures over a [`Session`].
//!
//! The [`InteractionController`] is a small state machine: a press starts one
//! of four gestures (drag a node, drag the selected group, rubber-band select,
//! draw a connection), moves update it, and the release commits it. Exactly one
//! gesture can be active; a press while one is running returns
//! [`GestureOutcome::Busy`].
//!
//! Every pointer position is in the graph's logical space. Callers remove any
//! zoom or pan before calling in.
//!
//! Gestures never fail. Invalid input (a bad connection, a release over
//! nothing) ends the gesture and is reported through the outcome.

use crate::connection::PendingConnection;
use crate::error::ValidationError;
use crate::geometry::{Point, Rect};
use crate::graph::{EdgeId, Graph, NodeId, PortId, SignalType};
use crate::hit_test::{find_edge_at, find_node_at, find_port_at, nodes_in_marquee};
use crate::selection::SelectionManager;
use crate::session::Session;
use crate::spatial::{auto_snap, positions_of, repel, Push};
use std::fmt;
use tracing::{debug, warn};

/// A pointer event in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    pub position: Point,
    /// The "extend selection" modifier (usually shift).
    pub extend: bool,
}

impl PointerEvent {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            extend: false,
        }
    }

    pub fn extended(mut self) -> Self {
        self.extend = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Idle,
    DraggingNode,
    DraggingGroup,
    MarqueeSelecting,
    ConnectingEdge,
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DraggingNode => "dragging node",
            Self::DraggingGroup => "dragging group",
            Self::MarqueeSelecting => "marquee selecting",
            Self::ConnectingEdge => "connecting edge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct DragState {
    /// The node under the pointer at press.
    pub pressed: NodeId,
    pub origin: Point,
    /// Every dragged node with its position at press.
    pub starts: Vec<(NodeId, Point)>,
    /// Graph before the drag, held until the drag first crosses the epsilon.
    snapshot: Option<Graph>,
    /// Whether displacement has exceeded the epsilon.
    pub moved: bool,
}

impl DragState {
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.starts.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct MarqueeState {
    pub origin: Point,
    pub current: Point,
    /// Selection the marquee result is unioned with.
    base: Vec<NodeId>,
    /// Selection before the press, restored on cancel.
    previous: SelectionManager,
}

impl MarqueeState {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.origin, self.current)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectState {
    pub pending: PendingConnection,
    pub anchor_point: Point,
    pub current: Point,
}

#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    DraggingNode(DragState),
    DraggingGroup(DragState),
    MarqueeSelecting(MarqueeState),
    ConnectingEdge(ConnectState),
}

impl Gesture {
    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Idle => GestureKind::Idle,
            Gesture::DraggingNode(_) => GestureKind::DraggingNode,
            Gesture::DraggingGroup(_) => GestureKind::DraggingGroup,
            Gesture::MarqueeSelecting(_) => GestureKind::MarqueeSelecting,
            Gesture::ConnectingEdge(_) => GestureKind::ConnectingEdge,
        }
    }
}

/// What a pointer event did.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Nothing to do, e.g. a move while idle.
    Ignored,
    /// A press arrived while another gesture was active.
    Busy,
    Started(GestureKind),
    /// Selection changed without starting a gesture, or a marquee was updated.
    SelectionChanged,
    /// Dragged nodes moved.
    Moved,
    /// The connection preview followed the pointer.
    PreviewUpdated,
    /// A drag ended without crossing the epsilon.
    Clicked(NodeId),
    /// A drag ended after real movement.
    Dropped {
        nodes: Vec<NodeId>,
        pushes: Vec<Push>,
        snapped: Option<EdgeId>,
    },
    MarqueeFinished { selected: usize },
    Connected {
        edge: EdgeId,
        redirected_from: Option<PortId>,
    },
    ConnectionRejected(ValidationError),
    Cancelled(GestureKind),
}

impl GestureOutcome {
    /// Whether the graph itself (not just selection or overlays) may have changed.
    pub fn changes_graph(&self) -> bool {
        matches!(
            self,
            GestureOutcome::Moved
                | GestureOutcome::Clicked(_)
                | GestureOutcome::Dropped { .. }
                | GestureOutcome::Connected { .. }
                | GestureOutcome::Cancelled(GestureKind::DraggingNode | GestureKind::DraggingGroup)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    gesture: Gesture,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn kind(&self) -> GestureKind {
        self.gesture.kind()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// The live marquee rectangle, while rubber-band selecting.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::MarqueeSelecting(m) => Some(m.rect()),
            _ => None,
        }
    }

    /// Start point, pointer position, and signal type of a connection being drawn.
    pub fn connection_preview(&self) -> Option<(Point, Point, SignalType)> {
        match &self.gesture {
            Gesture::ConnectingEdge(c) => Some((c.anchor_point, c.current, c.pending.signal_type)),
            _ => None,
        }
    }

    /// Nodes currently being dragged.
    pub fn dragged_nodes(&self) -> Vec<NodeId> {
        match &self.gesture {
            Gesture::DraggingNode(d) | Gesture::DraggingGroup(d) => d.node_ids(),
            _ => Vec::new(),
        }
    }

    pub fn pointer_down(&mut self, session: &mut Session, event: PointerEvent) -> GestureOutcome {
        if !self.is_idle() {
            debug!(active = %self.kind(), "press ignored while a gesture is active");
            return GestureOutcome::Busy;
        }
        let settings = session.settings().clone();
        let position = event.position;

        if let Some(hit) = find_port_at(session.graph(), position, settings.port_hit_radius) {
            return match session.validator().begin(session.graph(), hit.port, hit.direction) {
                Ok(pending) => {
                    debug!(port = %pending.origin, "connection started");
                    self.gesture = Gesture::ConnectingEdge(ConnectState {
                        pending,
                        anchor_point: hit.center,
                        current: position,
                    });
                    GestureOutcome::Started(GestureKind::ConnectingEdge)
                }
                Err(reason) => {
                    debug!(%reason, "connection could not start");
                    GestureOutcome::Ignored
                }
            };
        }

        if let Some(node_id) = find_node_at(session.graph(), position).map(|n| n.id.clone()) {
            if event.extend {
                session.selection_mut().handle_interaction(&node_id, true);
                return GestureOutcome::SelectionChanged;
            }

            let group = session.selection().contains(&node_id) && session.selection().len() > 1;
            let ids = if group {
                session.selection().ordered_ids(session.graph())
            } else {
                session.selection_mut().handle_interaction(&node_id, false);
                vec![node_id.clone()]
            };
            let drag = DragState {
                pressed: node_id,
                origin: position,
                starts: positions_of(session.graph(), &ids),
                snapshot: Some(session.graph().snapshot()),
                moved: false,
            };
            let kind = if group {
                self.gesture = Gesture::DraggingGroup(drag);
                GestureKind::DraggingGroup
            } else {
                self.gesture = Gesture::DraggingNode(drag);
                GestureKind::DraggingNode
            };
            debug!(gesture = %kind, "drag started");
            return GestureOutcome::Started(kind);
        }

        if !event.extend {
            if let Some(edge) = find_edge_at(
                session.graph(),
                position,
                settings.edge_hover_distance,
                settings.bezier_offset,
                settings.edge_hit_samples,
            ) {
                session.selection_mut().select_edge(edge);
                return GestureOutcome::SelectionChanged;
            }
        }

        let previous = session.selection().clone();
        let base = if event.extend {
            session.selection().sorted_ids()
        } else {
            Vec::new()
        };
        session.selection_mut().replace_selection(base.iter().cloned());
        self.gesture = Gesture::MarqueeSelecting(MarqueeState {
            origin: position,
            current: position,
            base,
            previous,
        });
        GestureOutcome::Started(GestureKind::MarqueeSelecting)
    }

    pub fn pointer_move(&mut self, session: &mut Session, event: PointerEvent) -> GestureOutcome {
        let epsilon = session.settings().drag_epsilon;
        match &mut self.gesture {
            Gesture::Idle => GestureOutcome::Ignored,
            Gesture::DraggingNode(drag) | Gesture::DraggingGroup(drag) => {
                drag_to(session, drag, event.position, epsilon);
                GestureOutcome::Moved
            }
            Gesture::MarqueeSelecting(marquee) => {
                marquee.current = event.position;
                update_marquee(session, marquee);
                GestureOutcome::SelectionChanged
            }
            Gesture::ConnectingEdge(connect) => {
                connect.current = event.position;
                GestureOutcome::PreviewUpdated
            }
        }
    }

    pub fn pointer_up(&mut self, session: &mut Session, event: PointerEvent) -> GestureOutcome {
        let settings = session.settings().clone();
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => GestureOutcome::Ignored,
            Gesture::DraggingNode(mut drag) | Gesture::DraggingGroup(mut drag) => {
                drag_to(session, &mut drag, event.position, settings.drag_epsilon);
                if !drag.moved {
                    restore(session, &drag);
                    session.selection_mut().handle_interaction(&drag.pressed, false);
                    return GestureOutcome::Clicked(drag.pressed);
                }

                let nodes = drag.node_ids();
                let pushes = repel(session.graph_mut(), &nodes, settings.clearance);
                let (graph, validator) = session.graph_and_validator();
                let snapped = auto_snap(graph, &drag.pressed, validator, settings.snap_radius);
                debug!(nodes = nodes.len(), pushes = pushes.len(), snapped = snapped.is_some(), "drag dropped");
                GestureOutcome::Dropped { nodes, pushes, snapped }
            }
            Gesture::MarqueeSelecting(mut marquee) => {
                marquee.current = event.position;
                update_marquee(session, &marquee);
                GestureOutcome::MarqueeFinished {
                    selected: session.selection().len(),
                }
            }
            Gesture::ConnectingEdge(connect) => {
                let Some(hit) = find_port_at(session.graph(), event.position, settings.port_hit_radius) else {
                    debug!("connection released over empty canvas");
                    return GestureOutcome::Cancelled(GestureKind::ConnectingEdge);
                };
                let resolved = session
                    .validator()
                    .complete(session.graph(), &connect.pending, &hit.port, hit.direction);
                let resolved = match resolved {
                    Ok(resolved) => resolved,
                    Err(reason) => {
                        debug!(%reason, "connection rejected");
                        return GestureOutcome::ConnectionRejected(reason);
                    }
                };
                match session.connect_resolved(&resolved) {
                    Ok(edge) => {
                        debug!(%edge, source = %resolved.source, target = %resolved.target, "connection created");
                        GestureOutcome::Connected {
                            edge,
                            redirected_from: resolved.redirected_from,
                        }
                    }
                    Err(reason) => {
                        debug!(%reason, "connection rejected");
                        GestureOutcome::ConnectionRejected(reason)
                    }
                }
            }
        }
    }

    /// Force the controller back to idle, e.g. on lost pointer capture.
    ///
    /// A connection in progress is discarded and a marquee restores the prior
    /// selection. A drag that never crossed the epsilon is reverted; one that
    /// did keeps its positions and history entry but skips repulsion and snap.
    pub fn cancel(&mut self, session: &mut Session) -> GestureOutcome {
        let gesture = std::mem::take(&mut self.gesture);
        let kind = gesture.kind();
        match gesture {
            Gesture::Idle => return GestureOutcome::Ignored,
            Gesture::DraggingNode(drag) | Gesture::DraggingGroup(drag) => {
                if !drag.moved {
                    restore(session, &drag);
                }
            }
            Gesture::MarqueeSelecting(marquee) => {
                *session.selection_mut() = marquee.previous;
            }
            Gesture::ConnectingEdge(_) => {}
        }
        debug!(gesture = %kind, "gesture cancelled");
        GestureOutcome::Cancelled(kind)
    }
}

fn drag_to(session: &mut Session, drag: &mut DragState, position: Point, epsilon: f64) {
    let dx = position.x - drag.origin.x;
    let dy = position.y - drag.origin.y;
    if !drag.moved && (dx * dx + dy * dy).sqrt() > epsilon {
        drag.moved = true;
        if let Some(snapshot) = drag.snapshot.take() {
            session.push_history(snapshot);
        }
    }
    for (id, start) in &drag.starts {
        if let Err(err) = session.graph_mut().move_node(id, start.offset(dx, dy)) {
            warn!(%err, "dragged node disappeared");
        }
    }
}

fn restore(session: &mut Session, drag: &DragState) {
    for (id, start) in &drag.starts {
        if let Err(err) = session.graph_mut().move_node(id, *start) {
            warn!(%err, "could not restore dragged node");
        }
    }
}

fn update_marquee(session: &mut Session, marquee: &MarqueeState) {
    let mut ids = marquee.base.clone();
    ids.extend(nodes_in_marquee(&marquee.rect(), session.graph().nodes()));
    session.selection_mut().replace_selection(ids);
}
