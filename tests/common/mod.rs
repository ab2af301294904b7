//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use std::cell::RefCell;
use std::rc::Rc;
use strategy_node_editor::ChangeEvent;

/// Records every change notification an editor emits.
#[derive(Default, Clone)]
pub struct ChangeTracker {
    pub events: Rc<RefCell<Vec<ChangeEvent>>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener closure suitable for `StrategyEditor::on_change`.
    pub fn listener(&self) -> impl FnMut(ChangeEvent) + 'static {
        let events = self.events.clone();
        move |event| events.borrow_mut().push(event)
    }

    pub fn count(&self, event: ChangeEvent) -> usize {
        self.events.borrow().iter().filter(|e| **e == event).count()
    }

    pub fn saw(&self, event: ChangeEvent) -> bool {
        self.count(event) > 0
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
