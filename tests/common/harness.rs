//! Test harness driving a [`StrategyEditor`] through pointer gestures.
//!
//! Mirrors what a host window does: forward presses, moves and releases in
//! logical coordinates, and record the change notifications that come back.

#![allow(dead_code)]

use super::ChangeTracker;
use strategy_node_editor::{
    Catalog, EditorSettings, GestureOutcome, NodeId, NodeTemplate, Point, PointerEvent, PortDirection, PortRef,
    SignalType, StrategyEditor,
};

pub struct EditorHarness {
    pub editor: StrategyEditor,
    pub tracker: ChangeTracker,
}

impl EditorHarness {
    /// Built-in strategy catalog, default settings, anchor at (40, 40).
    pub fn new() -> Self {
        Self::with(Catalog::strategy_defaults(), EditorSettings::default())
    }

    pub fn with(catalog: Catalog, settings: EditorSettings) -> Self {
        let mut editor = StrategyEditor::new(catalog, settings).unwrap();
        let tracker = ChangeTracker::new();
        editor.on_change(tracker.listener());
        Self { editor, tracker }
    }

    /// A minimal catalog: `source` (output `out`, data), `sink` (input `in`,
    /// data), and a `hub` anchor parked at (1000, 1000) out of the way.
    pub fn plain() -> Self {
        let mut catalog = Catalog::new();
        catalog
            .register_template(NodeTemplate::new("hub", "strategy").input("cfg", SignalType::Config).anchor())
            .unwrap();
        catalog
            .register_template(NodeTemplate::new("source", "test").output("out", SignalType::Data))
            .unwrap();
        catalog
            .register_template(NodeTemplate::new("sink", "test").input("in", SignalType::Data))
            .unwrap();
        let settings = EditorSettings {
            anchor_position: Point::new(1000.0, 1000.0),
            ..EditorSettings::default()
        };
        Self::with(catalog, settings)
    }

    pub fn place(&mut self, kind: &str, x: f64, y: f64) -> NodeId {
        self.editor.place_node(kind, Point::new(x, y)).unwrap()
    }

    pub fn position(&self, id: &str) -> Point {
        self.editor.graph().node(id).unwrap().position
    }

    pub fn center(&self, id: &str) -> Point {
        self.editor.graph().node(id).unwrap().rect().center()
    }

    pub fn port(&self, node: &str, port: &str, direction: PortDirection) -> Point {
        self.editor
            .graph()
            .port_center(&PortRef::new(node, port), direction)
            .unwrap()
    }

    pub fn press(&mut self, at: Point) -> GestureOutcome {
        self.editor.pointer_down(PointerEvent::at(at.x, at.y))
    }

    pub fn shift_press(&mut self, at: Point) -> GestureOutcome {
        self.editor.pointer_down(PointerEvent::at(at.x, at.y).extended())
    }

    pub fn move_to(&mut self, at: Point) -> GestureOutcome {
        self.editor.pointer_move(PointerEvent::at(at.x, at.y))
    }

    pub fn release(&mut self, at: Point) -> GestureOutcome {
        self.editor.pointer_up(PointerEvent::at(at.x, at.y))
    }

    /// Press, move halfway, move to `to`, release.
    pub fn drag(&mut self, from: Point, to: Point) -> GestureOutcome {
        self.press(from);
        self.move_to(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
        self.move_to(to);
        self.release(to)
    }

    /// Drag a node by its center so its top-left ends at `top_left`.
    pub fn drag_node_to(&mut self, id: &str, top_left: Point) -> GestureOutcome {
        let start = self.position(id);
        let grab = self.center(id);
        let to = grab.offset(top_left.x - start.x, top_left.y - start.y);
        self.drag(grab, to)
    }

    pub fn click(&mut self, at: Point) -> GestureOutcome {
        self.press(at);
        self.release(at)
    }

    /// Draw a connection from one port to another with the pointer.
    pub fn draw_connection(
        &mut self,
        from: (&str, &str, PortDirection),
        to: (&str, &str, PortDirection),
    ) -> GestureOutcome {
        let start = self.port(from.0, from.1, from.2);
        let end = self.port(to.0, to.1, to.2);
        self.press(start);
        self.move_to(Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0));
        self.release(end)
    }
}
