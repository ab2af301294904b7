//! Ready-made Slint callbacks for a shared editor.
//!
//! [`EditorHandle`] wraps a [`StrategyEditor`] in `Rc<RefCell<_>>` and hands
//! out closures matching the Slint-generated callback signatures, so wiring a
//! window up is one line per callback.
//!
//! ```ignore
//! let handle = EditorHandle::new(StrategyEditor::strategy()?);
//!
//! window.on_pointer_down(handle.pointer_down_callback());
//! window.on_pointer_move(handle.pointer_move_callback());
//! window.on_pointer_up(handle.pointer_up_callback());
//! window.on_undo(handle.undo_callback());
//!
//! let render = Rc::new(RefCell::new(RenderAdapter::new(50.0)));
//! handle.after_update({
//!     let render = render.clone();
//!     move |editor| render.borrow_mut().update_from(editor)
//! });
//! ```

use crate::controller::PointerEvent;
use crate::editor::StrategyEditor;
use crate::geometry::Point;
use slint::SharedString;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

type AfterUpdate = Rc<RefCell<Option<Box<dyn Fn(&StrategyEditor)>>>>;

/// Shared editor plus callback factories.
///
/// Clones share the same editor. The hook set with [`after_update`] runs after
/// every callback, once the editor is no longer mutably borrowed, so it may
/// read editor state freely.
///
/// [`after_update`]: EditorHandle::after_update
#[derive(Clone)]
pub struct EditorHandle {
    editor: Rc<RefCell<StrategyEditor>>,
    after: AfterUpdate,
}

impl EditorHandle {
    pub fn new(editor: StrategyEditor) -> Self {
        Self::with_editor(Rc::new(RefCell::new(editor)))
    }

    /// Wrap an editor that is already shared.
    pub fn with_editor(editor: Rc<RefCell<StrategyEditor>>) -> Self {
        Self {
            editor,
            after: Rc::new(RefCell::new(None)),
        }
    }

    pub fn editor(&self) -> Rc<RefCell<StrategyEditor>> {
        self.editor.clone()
    }

    /// Run `hook` after every callback produced by this handle or its clones.
    pub fn after_update(&self, hook: impl Fn(&StrategyEditor) + 'static) {
        *self.after.borrow_mut() = Some(Box::new(hook));
    }

    fn dispatch(editor: &RefCell<StrategyEditor>, after: &AfterUpdate, f: impl FnOnce(&mut StrategyEditor)) {
        f(&mut editor.borrow_mut());
        if let Some(hook) = after.borrow().as_ref() {
            hook(&editor.borrow());
        }
    }

    /// `(x: f32, y: f32, extend: bool)`; `extend` is the shift/ctrl modifier.
    pub fn pointer_down_callback(&self) -> impl Fn(f32, f32, bool) + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move |x, y, extend| {
            let event = PointerEvent {
                position: Point::new(x as f64, y as f64),
                extend,
            };
            Self::dispatch(&editor, &after, |e| {
                e.pointer_down(event);
            });
        }
    }

    pub fn pointer_move_callback(&self) -> impl Fn(f32, f32) + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move |x, y| {
            Self::dispatch(&editor, &after, |e| {
                e.pointer_move(PointerEvent::at(x as f64, y as f64));
            });
        }
    }

    pub fn pointer_up_callback(&self) -> impl Fn(f32, f32) + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move |x, y| {
            Self::dispatch(&editor, &after, |e| {
                e.pointer_up(PointerEvent::at(x as f64, y as f64));
            });
        }
    }

    pub fn cancel_callback(&self) -> impl Fn() + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move || {
            Self::dispatch(&editor, &after, |e| {
                e.cancel_gesture();
            });
        }
    }

    pub fn undo_callback(&self) -> impl Fn() + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move || {
            Self::dispatch(&editor, &after, |e| {
                if let Err(err) = e.undo() {
                    debug!(%err, "undo skipped");
                }
            });
        }
    }

    pub fn redo_callback(&self) -> impl Fn() + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move || {
            Self::dispatch(&editor, &after, |e| {
                if let Err(err) = e.redo() {
                    debug!(%err, "redo skipped");
                }
            });
        }
    }

    /// Deletes the selected nodes, or the selected edge when no node is selected.
    pub fn delete_callback(&self) -> impl Fn() + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move || {
            Self::dispatch(&editor, &after, |e| {
                if let Err(err) = e.delete_selection() {
                    debug!(%err, "delete rejected");
                }
            });
        }
    }

    /// `(kind: string, x: f32, y: f32)`, e.g. from a palette drop.
    pub fn place_node_callback(&self) -> impl Fn(SharedString, f32, f32) + Clone {
        let editor = self.editor.clone();
        let after = self.after.clone();
        move |kind, x, y| {
            Self::dispatch(&editor, &after, |e| {
                if let Err(err) = e.place_node(kind.as_str(), Point::new(x as f64, y as f64)) {
                    debug!(%err, kind = kind.as_str(), "placement rejected");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::GestureKind;
    use std::cell::Cell;

    fn handle() -> EditorHandle {
        EditorHandle::new(StrategyEditor::strategy().unwrap())
    }

    #[test]
    fn test_place_node_callback_adds_node() {
        let handle = handle();
        let place = handle.place_node_callback();
        place("sma".into(), 300.0, 300.0);
        place("martingale".into(), 0.0, 0.0);

        let editor = handle.editor();
        assert_eq!(editor.borrow().graph().node_count(), 2);
        assert!(editor.borrow().graph().contains_node("sma_1"));
    }

    #[test]
    fn test_pointer_callbacks_drive_a_drag() {
        let handle = handle();
        handle.place_node_callback()("sma".into(), 300.0, 300.0);

        handle.pointer_down_callback()(350.0, 320.0, false);
        assert_eq!(handle.editor().borrow().gesture(), GestureKind::DraggingNode);
        handle.pointer_move_callback()(400.0, 320.0);
        handle.pointer_up_callback()(400.0, 320.0);

        let editor = handle.editor();
        let editor = editor.borrow();
        assert_eq!(editor.gesture(), GestureKind::Idle);
        assert_eq!(editor.graph().node("sma_1").unwrap().position, Point::new(350.0, 300.0));
    }

    #[test]
    fn test_undo_redo_delete_callbacks() {
        let handle = handle();
        handle.place_node_callback()("rsi".into(), 300.0, 300.0);

        handle.undo_callback()();
        assert_eq!(handle.editor().borrow().graph().node_count(), 1);
        handle.undo_callback()();

        handle.redo_callback()();
        assert_eq!(handle.editor().borrow().graph().node_count(), 2);

        handle.pointer_down_callback()(350.0, 320.0, false);
        handle.pointer_up_callback()(350.0, 320.0);
        handle.delete_callback()();
        assert_eq!(handle.editor().borrow().graph().node_count(), 1);
    }

    #[test]
    fn test_after_update_runs_with_readable_editor() {
        let handle = handle();
        let seen = Rc::new(Cell::new(0usize));
        handle.after_update({
            let seen = seen.clone();
            move |editor| seen.set(editor.graph().node_count())
        });

        let place = handle.clone().place_node_callback();
        place("ema".into(), 300.0, 300.0);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_cancel_callback_ends_gesture() {
        let handle = handle();
        handle.pointer_down_callback()(600.0, 600.0, false);
        assert_eq!(handle.editor().borrow().gesture(), GestureKind::MarqueeSelecting);
        handle.cancel_callback()();
        assert_eq!(handle.editor().borrow().gesture(), GestureKind::Idle);
    }
}
