//! Bridge from editor state to Slint models.
//!
//! [`RenderAdapter`] derives flat view rows from the graph (node boxes, edge
//! bezier paths colored by signal type, gesture overlays) and keeps bound
//! Slint `VecModel`s in sync with them.
//!
//! ```ignore
//! let mut render = RenderAdapter::new(settings.bezier_offset);
//! let nodes = Rc::new(VecModel::<UiNode>::default());
//! render.bind_node_model(nodes.clone(), |n| UiNode { id: n.id.as_str().into(), x: n.x as f32, .. });
//! window.set_nodes(ModelRc::from(nodes));
//!
//! let render = RefCell::new(render);
//! handle.after_update(move |editor| render.borrow_mut().update_from(editor));
//! ```

use crate::controller::InteractionController;
use crate::editor::StrategyEditor;
use crate::geometry::Rect;
use crate::graph::{EdgeId, Graph, NodeId, PortDirection, SignalType};
use crate::path::bezier_path;
use crate::selection::SelectionManager;
use slint::{Color, Model, SharedString, VecModel};
use std::marker::PhantomData;
use std::rc::Rc;

/// Link color for a signal type.
pub fn signal_color(signal_type: SignalType) -> Color {
    match signal_type {
        SignalType::Data => Color::from_rgb_u8(100, 180, 255),
        SignalType::Condition => Color::from_rgb_u8(255, 180, 80),
        SignalType::Config => Color::from_rgb_u8(170, 120, 255),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub kind: String,
    pub category: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub is_anchor: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeView {
    pub id: EdgeId,
    pub path_commands: String,
    pub color: Color,
    pub signal_type: SignalType,
    pub selected: bool,
}

/// Transient drawing for the active gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayView {
    pub marquee: Option<Rect>,
    /// Path and color of a connection being drawn.
    pub preview: Option<(String, Color)>,
}

trait ModelSyncer<T> {
    fn sync(&self, items: &[T]);
}

struct ConcreteModelSyncer<T, P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
    _item: PhantomData<fn(&T)>,
}

impl<T, P, F> ModelSyncer<T> for ConcreteModelSyncer<T, P, F>
where
    P: Clone + 'static,
    F: Fn(&T) -> P,
{
    fn sync(&self, items: &[T]) {
        for (i, item) in items.iter().enumerate() {
            let row = (self.constructor)(item);
            if i < self.model.row_count() {
                self.model.set_row_data(i, row);
            } else {
                self.model.push(row);
            }
        }
        while self.model.row_count() > items.len() {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

/// Derives view rows from editor state and pushes them into bound models.
pub struct RenderAdapter {
    bezier_offset: f64,
    nodes: Vec<NodeView>,
    edges: Vec<EdgeView>,
    overlay: OverlayView,
    node_syncer: Option<Box<dyn ModelSyncer<NodeView>>>,
    edge_syncer: Option<Box<dyn ModelSyncer<EdgeView>>>,
    selection_model: Option<Rc<VecModel<SharedString>>>,
}

impl RenderAdapter {
    pub fn new(bezier_offset: f64) -> Self {
        Self {
            bezier_offset,
            nodes: Vec::new(),
            edges: Vec::new(),
            overlay: OverlayView::default(),
            node_syncer: None,
            edge_syncer: None,
            selection_model: None,
        }
    }

    /// Keep `model` in sync with the node views on every update.
    pub fn bind_node_model<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&NodeView) -> P + 'static,
    {
        self.node_syncer = Some(Box::new(ConcreteModelSyncer {
            model,
            constructor,
            _item: PhantomData,
        }));
    }

    pub fn bind_edge_model<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&EdgeView) -> P + 'static,
    {
        self.edge_syncer = Some(Box::new(ConcreteModelSyncer {
            model,
            constructor,
            _item: PhantomData,
        }));
    }

    pub fn bind_selection_model(&mut self, model: Rc<VecModel<SharedString>>) {
        self.selection_model = Some(model);
    }

    pub fn nodes(&self) -> &[NodeView] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeView] {
        &self.edges
    }

    pub fn overlay(&self) -> &OverlayView {
        &self.overlay
    }

    pub fn update_from(&mut self, editor: &StrategyEditor) {
        self.update(editor.graph(), editor.selection(), editor.controller());
    }

    /// Recompute every view and sync bound models.
    pub fn update(&mut self, graph: &Graph, selection: &SelectionManager, controller: &InteractionController) {
        self.nodes = graph
            .nodes()
            .map(|n| NodeView {
                id: n.id.clone(),
                kind: n.kind.clone(),
                category: n.category.clone(),
                x: n.position.x,
                y: n.position.y,
                width: n.size.width,
                height: n.size.height,
                is_anchor: n.is_anchor,
                selected: selection.contains(&n.id),
            })
            .collect();

        self.edges = graph
            .edges()
            .filter_map(|e| {
                let start = graph.port_center(&e.source, PortDirection::Output)?;
                let end = graph.port_center(&e.target, PortDirection::Input)?;
                Some(EdgeView {
                    id: e.id.clone(),
                    path_commands: bezier_path(start, end, self.bezier_offset),
                    color: signal_color(e.signal_type),
                    signal_type: e.signal_type,
                    selected: selection.selected_edge() == Some(e.id.as_str()),
                })
            })
            .collect();

        self.overlay = OverlayView {
            marquee: controller.marquee_rect(),
            preview: controller
                .connection_preview()
                .map(|(start, current, signal)| (bezier_path(start, current, self.bezier_offset), signal_color(signal))),
        };

        if let Some(syncer) = &self.node_syncer {
            syncer.sync(&self.nodes);
        }
        if let Some(syncer) = &self.edge_syncer {
            syncer.sync(&self.edges);
        }
        if let Some(model) = &self.selection_model {
            selection.sync_to_model(model);
        }
    }
}
