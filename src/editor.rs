//! The editing engine as a host sees it.
//!
//! [`StrategyEditor`] pairs a [`Session`] with an [`InteractionController`] and
//! tells registered listeners what changed after every call, so a renderer
//! can redraw only what it must.

use crate::catalog::Catalog;
use crate::controller::{GestureKind, GestureOutcome, InteractionController, PointerEvent};
use crate::error::{GraphError, HistoryError, PersistenceError, ValidationError};
use crate::geometry::Point;
use crate::graph::{EdgeId, Graph, NodeId, PortRef};
use crate::persistence::LoadReport;
use crate::selection::SelectionManager;
use crate::session::{Removed, Session};
use crate::settings::EditorSettings;

/// What part of the editor state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    /// Nodes, edges, params or positions.
    Graph,
    Selection,
    /// The active gesture or its overlay (marquee, connection preview).
    Gesture,
}

type Listener = Box<dyn FnMut(ChangeEvent)>;

pub struct StrategyEditor {
    session: Session,
    controller: InteractionController,
    listeners: Vec<Listener>,
}

impl StrategyEditor {
    /// Start a session and place the anchor node.
    pub fn new(catalog: Catalog, settings: EditorSettings) -> Result<Self, GraphError> {
        let mut session = Session::new(catalog, settings);
        session.ensure_anchor()?;
        Ok(Self {
            session,
            controller: InteractionController::new(),
            listeners: Vec::new(),
        })
    }

    /// An editor over the built-in strategy catalog with default settings.
    pub fn strategy() -> Result<Self, GraphError> {
        Self::new(Catalog::strategy_defaults(), EditorSettings::default())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn graph(&self) -> &Graph {
        self.session.graph()
    }

    pub fn selection(&self) -> &SelectionManager {
        self.session.selection()
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn gesture(&self) -> GestureKind {
        self.controller.kind()
    }

    /// Register a listener called after every change.
    pub fn on_change(&mut self, listener: impl FnMut(ChangeEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: ChangeEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    /// Run `f` and report what it changed.
    fn tracked<T>(&mut self, graph_changed: impl Fn(&T) -> bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let selection = self.session.selection().clone();
        let gesture = self.controller.kind();
        let result = f(self);
        if graph_changed(&result) {
            self.emit(ChangeEvent::Graph);
        }
        if *self.session.selection() != selection {
            self.emit(ChangeEvent::Selection);
        }
        if self.controller.kind() != gesture {
            self.emit(ChangeEvent::Gesture);
        }
        result
    }

    fn gesture_event(&mut self, f: impl FnOnce(&mut InteractionController, &mut Session) -> GestureOutcome) -> GestureOutcome {
        let outcome = self.tracked(GestureOutcome::changes_graph, |editor| {
            f(&mut editor.controller, &mut editor.session)
        });
        let overlay_changed = matches!(outcome, GestureOutcome::PreviewUpdated)
            || (matches!(outcome, GestureOutcome::SelectionChanged)
                && self.controller.kind() == GestureKind::MarqueeSelecting);
        if overlay_changed {
            self.emit(ChangeEvent::Gesture);
        }
        outcome
    }

    pub fn pointer_down(&mut self, event: PointerEvent) -> GestureOutcome {
        self.gesture_event(|ctrl, session| ctrl.pointer_down(session, event))
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> GestureOutcome {
        self.gesture_event(|ctrl, session| ctrl.pointer_move(session, event))
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> GestureOutcome {
        self.gesture_event(|ctrl, session| ctrl.pointer_up(session, event))
    }

    pub fn cancel_gesture(&mut self) -> GestureOutcome {
        self.gesture_event(|ctrl, session| ctrl.cancel(session))
    }

    /// Actions never interleave with a gesture: any active one ends first.
    fn cancel_active(&mut self) {
        if !self.controller.is_idle() {
            self.cancel_gesture();
        }
    }

    pub fn place_node(&mut self, kind: &str, position: Point) -> Result<NodeId, GraphError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.place_node(kind, position))
    }

    pub fn remove_node(&mut self, id: &str) -> Result<Vec<EdgeId>, GraphError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.remove_node(id))
    }

    pub fn delete_selection(&mut self) -> Result<Removed, GraphError> {
        self.cancel_active();
        self.tracked(|r: &Result<Removed, _>| r.as_ref().is_ok_and(|r| !r.is_empty()), |e| {
            e.session.delete_selection()
        })
    }

    pub fn connect(&mut self, source: PortRef, target: PortRef) -> Result<EdgeId, ValidationError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.connect(source, target))
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<(), GraphError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.remove_edge(id).map(|_| ()))
    }

    pub fn set_param(&mut self, id: &str, key: &str, value: serde_json::Value) -> Result<(), GraphError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.set_param(id, key, value).map(|_| ()))
    }

    pub fn clone_selection(&mut self) -> Result<Vec<NodeId>, GraphError> {
        self.cancel_active();
        self.tracked(|r: &Result<Vec<NodeId>, _>| r.as_ref().is_ok_and(|ids| !ids.is_empty()), |e| {
            e.session.clone_selection()
        })
    }

    pub fn select_all(&mut self) {
        self.cancel_active();
        self.tracked(|_| false, |e| e.session.select_all());
    }

    pub fn select_edge(&mut self, id: &str) -> Result<(), GraphError> {
        self.cancel_active();
        self.tracked(|_| false, |e| e.session.select_edge(id))
    }

    pub fn clear_selection(&mut self) {
        self.cancel_active();
        self.tracked(|_| false, |e| e.session.clear_selection());
    }

    /// Undo the last action. An active gesture is cancelled first.
    pub fn undo(&mut self) -> Result<(), HistoryError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.undo())
    }

    pub fn redo(&mut self) -> Result<(), HistoryError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.redo())
    }

    pub fn load_json(&mut self, json: &str) -> Result<LoadReport, PersistenceError> {
        self.cancel_active();
        self.tracked(Result::is_ok, |e| e.session.load_json(json))
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        self.session.to_json()
    }

    #[cfg(feature = "layout")]
    pub fn arrange(&mut self) -> Result<usize, GraphError> {
        self.cancel_active();
        self.tracked(|r: &Result<usize, _>| r.as_ref().is_ok_and(|n| *n > 0), |e| e.session.arrange())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_editor() -> (StrategyEditor, Rc<RefCell<Vec<ChangeEvent>>>) {
        let mut editor = StrategyEditor::strategy().unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        editor.on_change(move |event| sink.borrow_mut().push(event));
        (editor, events)
    }

    #[test]
    fn test_new_editor_has_anchor() {
        let editor = StrategyEditor::strategy().unwrap();
        assert!(editor.graph().anchor().is_some());
        assert_eq!(editor.gesture(), GestureKind::Idle);
    }

    #[test]
    fn test_place_node_emits_graph_change() {
        let (mut editor, events) = recording_editor();
        editor.place_node("sma", Point::new(300.0, 300.0)).unwrap();
        assert_eq!(*events.borrow(), vec![ChangeEvent::Graph]);
    }

    #[test]
    fn test_failed_action_emits_nothing() {
        let (mut editor, events) = recording_editor();
        assert!(editor.place_node("martingale", Point::default()).is_err());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_drag_emits_selection_gesture_and_graph() {
        let (mut editor, events) = recording_editor();
        editor.place_node("sma", Point::new(300.0, 300.0)).unwrap();
        events.borrow_mut().clear();

        editor.pointer_down(PointerEvent::at(350.0, 320.0));
        assert_eq!(*events.borrow(), vec![ChangeEvent::Selection, ChangeEvent::Gesture]);

        events.borrow_mut().clear();
        editor.pointer_move(PointerEvent::at(400.0, 320.0));
        assert_eq!(*events.borrow(), vec![ChangeEvent::Graph]);

        events.borrow_mut().clear();
        editor.pointer_up(PointerEvent::at(400.0, 320.0));
        assert_eq!(*events.borrow(), vec![ChangeEvent::Graph, ChangeEvent::Gesture]);
    }

    #[test]
    fn test_undo_cancels_active_gesture() {
        let (mut editor, _) = recording_editor();
        editor.place_node("sma", Point::new(300.0, 300.0)).unwrap();
        editor.pointer_down(PointerEvent::at(350.0, 320.0));
        assert_eq!(editor.gesture(), GestureKind::DraggingNode);

        editor.undo().unwrap();
        assert_eq!(editor.gesture(), GestureKind::Idle);
        assert_eq!(editor.graph().node_count(), 1);
    }
}
