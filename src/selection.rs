//! Node and edge selection state.

use crate::graph::{EdgeId, Graph, NodeId};
use slint::{Model, SharedString, VecModel};
use std::collections::HashSet;

/// Selected nodes, plus at most one selected edge.
///
/// Selecting nodes clears the edge selection and vice versa.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionManager {
    selected: HashSet<NodeId>,
    edge: Option<EdgeId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click on a node. With `extend` held the node's membership is toggled;
    /// otherwise the selection collapses to just this node.
    pub fn handle_interaction(&mut self, id: &str, extend: bool) {
        self.edge = None;
        if extend {
            if !self.selected.remove(id) {
                self.selected.insert(id.to_string());
            }
        } else {
            if self.selected.len() == 1 && self.selected.contains(id) {
                return;
            }
            self.selected.clear();
            self.selected.insert(id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.edge = None;
    }

    /// Replace the node selection, e.g. with a marquee result.
    pub fn replace_selection<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.selected.clear();
        self.edge = None;
        self.selected.extend(ids);
    }

    pub fn extend<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.edge = None;
        self.selected.extend(ids);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.selected.iter()
    }

    /// Selected node ids in a stable order.
    pub fn sorted_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Selected node ids in the graph's z-order.
    pub fn ordered_ids(&self, graph: &Graph) -> Vec<NodeId> {
        graph
            .nodes()
            .filter(|n| self.selected.contains(&n.id))
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn select_edge(&mut self, id: impl Into<EdgeId>) {
        self.selected.clear();
        self.edge = Some(id.into());
    }

    pub fn selected_edge(&self) -> Option<&str> {
        self.edge.as_deref()
    }

    pub fn clear_edge(&mut self) -> Option<EdgeId> {
        self.edge.take()
    }

    /// Drop ids that no longer exist in `graph`, e.g. after undo.
    pub fn retain_existing(&mut self, graph: &Graph) {
        self.selected.retain(|id| graph.contains_node(id));
        if self.edge.as_deref().is_some_and(|e| graph.edge(e).is_none()) {
            self.edge = None;
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Sync the selected node ids into a Slint model, sorted.
    pub fn sync_to_model(&self, model: &VecModel<SharedString>) {
        let ids: Vec<SharedString> = self.sorted_ids().into_iter().map(SharedString::from).collect();
        let unchanged = model.row_count() == ids.len()
            && ids.iter().enumerate().all(|(i, id)| model.row_data(i).as_ref() == Some(id));
        if !unchanged {
            model.set_vec(ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::graph::{Node, Port, PortRef, SignalType};

    fn ids(selection: &SelectionManager) -> Vec<String> {
        selection.sorted_ids()
    }

    // ========================================================================
    // handle_interaction() - click semantics
    // ========================================================================

    #[test]
    fn test_click_selects_single() {
        let mut selection = SelectionManager::new();
        selection.handle_interaction("a", false);
        assert_eq!(ids(&selection), vec!["a"]);
    }

    #[test]
    fn test_click_collapses_multi_selection() {
        let mut selection = SelectionManager::new();
        selection.handle_interaction("a", true);
        selection.handle_interaction("b", true);
        assert_eq!(selection.len(), 2);

        selection.handle_interaction("a", false);
        assert_eq!(ids(&selection), vec!["a"]);
    }

    #[test]
    fn test_extend_toggles_membership() {
        let mut selection = SelectionManager::new();
        selection.handle_interaction("a", false);
        selection.handle_interaction("b", true);
        assert_eq!(ids(&selection), vec!["a", "b"]);

        selection.handle_interaction("a", true);
        assert_eq!(ids(&selection), vec!["b"]);

        selection.handle_interaction("b", true);
        assert!(selection.is_empty());
    }

    // ========================================================================
    // Edge selection
    // ========================================================================

    #[test]
    fn test_edge_and_node_selection_are_exclusive() {
        let mut selection = SelectionManager::new();
        selection.handle_interaction("a", false);
        selection.select_edge("e1");
        assert!(selection.is_empty());
        assert_eq!(selection.selected_edge(), Some("e1"));

        selection.handle_interaction("b", false);
        assert_eq!(selection.selected_edge(), None);
    }

    // ========================================================================
    // replace_selection() / retain_existing()
    // ========================================================================

    #[test]
    fn test_replace_selection() {
        let mut selection = SelectionManager::new();
        selection.handle_interaction("a", false);
        selection.replace_selection(vec!["b".to_string(), "c".to_string()]);
        assert_eq!(ids(&selection), vec!["b", "c"]);

        selection.replace_selection(Vec::new());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_retain_existing_drops_stale_ids() {
        let size = Size::new(160.0, 80.0);
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("a", "t", "t", size, vec![Port::output("o", SignalType::Data)]))
            .unwrap();
        graph
            .add_node(Node::new("b", "t", "t", size, vec![Port::input("i", SignalType::Data)]))
            .unwrap();
        let edge = graph.add_edge(PortRef::new("a", "o"), PortRef::new("b", "i")).unwrap();

        let mut selection = SelectionManager::new();
        selection.replace_selection(vec!["a".to_string(), "gone".to_string()]);
        selection.retain_existing(&graph);
        assert_eq!(ids(&selection), vec!["a"]);

        selection.select_edge(edge.clone());
        graph.remove_edge(&edge).unwrap();
        selection.retain_existing(&graph);
        assert_eq!(selection.selected_edge(), None);
    }

    // ========================================================================
    // sync_to_model() - Slint Model Synchronization
    // ========================================================================

    #[test]
    fn test_sync_to_model_sorted() {
        let model = VecModel::<SharedString>::default();
        let mut selection = SelectionManager::new();
        selection.replace_selection(vec!["sma_2".to_string(), "rsi_1".to_string()]);
        selection.sync_to_model(&model);

        assert_eq!(model.row_count(), 2);
        assert_eq!(model.row_data(0), Some(SharedString::from("rsi_1")));
        assert_eq!(model.row_data(1), Some(SharedString::from("sma_2")));
    }

    #[test]
    fn test_sync_to_model_clears_stale_rows() {
        let model = VecModel::from(vec![SharedString::from("old")]);
        let selection = SelectionManager::new();
        selection.sync_to_model(&model);
        assert_eq!(model.row_count(), 0);
    }
}
