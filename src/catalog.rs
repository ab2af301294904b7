//! Node kinds: the ports, size and default parameters each kind of block carries.
//!
//! A kind is described through the [`NodeKind`] capability trait and resolved
//! once into a [`NodeTemplate`] when registered. Everything downstream reads the
//! template, so no per-kind dispatch happens while editing.

use crate::error::{CatalogError, GraphError};
use crate::geometry::{Point, Size};
use crate::graph::{Node, NodeId, Params, Port, PortDirection, PortId, SignalType};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tracing::warn;

pub const DEFAULT_NODE_SIZE: Size = Size::new(160.0, 80.0);
pub const ANCHOR_NODE_SIZE: Size = Size::new(200.0, 180.0);

/// Describes one kind of strategy block.
pub trait NodeKind {
    fn kind(&self) -> &str;

    fn category(&self) -> &str;

    fn size(&self) -> Size {
        DEFAULT_NODE_SIZE
    }

    fn ports(&self) -> Vec<Port>;

    fn default_params(&self) -> Params {
        Params::new()
    }

    /// The anchor input a config output of this kind must connect to.
    fn preferred_anchor_port(&self) -> Option<&str> {
        None
    }

    fn is_anchor(&self) -> bool {
        false
    }
}

/// A resolved node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    pub kind: String,
    pub category: String,
    pub size: Size,
    pub ports: Vec<Port>,
    pub default_params: Params,
    pub preferred_anchor_port: Option<PortId>,
    pub is_anchor: bool,
}

impl NodeTemplate {
    pub fn new(kind: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            category: category.into(),
            size: DEFAULT_NODE_SIZE,
            ports: Vec::new(),
            default_params: Params::new(),
            preferred_anchor_port: None,
            is_anchor: false,
        }
    }

    /// Resolve any [`NodeKind`] into a template.
    pub fn from_kind<K: NodeKind + ?Sized>(kind: &K) -> Self {
        Self {
            kind: kind.kind().to_string(),
            category: kind.category().to_string(),
            size: kind.size(),
            ports: kind.ports(),
            default_params: kind.default_params(),
            preferred_anchor_port: kind.preferred_anchor_port().map(str::to_string),
            is_anchor: kind.is_anchor(),
        }
    }

    pub fn input(mut self, id: &str, signal_type: SignalType) -> Self {
        self.ports.push(Port::input(id, signal_type));
        self
    }

    pub fn output(mut self, id: &str, signal_type: SignalType) -> Self {
        self.ports.push(Port::output(id, signal_type));
        self
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.default_params.insert(key.to_string(), value);
        self
    }

    pub fn sized(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn prefers_anchor_port(mut self, port_id: &str) -> Self {
        self.preferred_anchor_port = Some(port_id.to_string());
        self
    }

    pub fn anchor(mut self) -> Self {
        self.is_anchor = true;
        self
    }

    /// Build a node of this kind.
    pub fn instantiate(&self, id: impl Into<NodeId>, position: Point) -> Node {
        let node = Node::new(id, self.kind.clone(), self.category.clone(), self.size, self.ports.clone())
            .at(position)
            .with_params(self.default_params.clone());
        if self.is_anchor {
            node.as_anchor()
        } else {
            node
        }
    }

    fn check_ports(&self) -> Result<(), CatalogError> {
        let mut seen: HashSet<(&str, PortDirection)> = HashSet::new();
        for port in &self.ports {
            if !seen.insert((port.id.as_str(), port.direction)) {
                return Err(CatalogError::DuplicatePort {
                    kind: self.kind.clone(),
                    port_id: port.id.clone(),
                    direction: port.direction,
                });
            }
        }
        Ok(())
    }
}

impl NodeKind for NodeTemplate {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn size(&self) -> Size {
        self.size
    }

    fn ports(&self) -> Vec<Port> {
        self.ports.clone()
    }

    fn default_params(&self) -> Params {
        self.default_params.clone()
    }

    fn preferred_anchor_port(&self) -> Option<&str> {
        self.preferred_anchor_port.as_deref()
    }

    fn is_anchor(&self) -> bool {
        self.is_anchor
    }
}

/// Source kind -> the single anchor input it belongs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferredAnchorPorts {
    ports: HashMap<String, PortId>,
}

impl PreferredAnchorPorts {
    pub fn insert(&mut self, kind: impl Into<String>, port_id: impl Into<PortId>) {
        self.ports.insert(kind.into(), port_id.into());
    }

    pub fn get(&self, kind: &str) -> Option<&str> {
        self.ports.get(kind).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// The set of node kinds available to an editing session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: HashMap<String, NodeTemplate>,
    order: Vec<String>,
    anchor_kind: Option<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<K: NodeKind + ?Sized>(&mut self, kind: &K) -> Result<(), CatalogError> {
        self.register_template(NodeTemplate::from_kind(kind))
    }

    pub fn register_template(&mut self, template: NodeTemplate) -> Result<(), CatalogError> {
        if self.templates.contains_key(&template.kind) {
            return Err(CatalogError::DuplicateKind(template.kind));
        }
        template.check_ports()?;
        if template.is_anchor {
            if let Some(existing) = &self.anchor_kind {
                return Err(CatalogError::AnchorKindExists {
                    existing: existing.clone(),
                    kind: template.kind,
                });
            }
            self.anchor_kind = Some(template.kind.clone());
        }
        self.order.push(template.kind.clone());
        self.templates.insert(template.kind.clone(), template);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&NodeTemplate> {
        self.templates.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.templates.contains_key(kind)
    }

    /// Templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &NodeTemplate> + '_ {
        self.order.iter().filter_map(|k| self.templates.get(k))
    }

    pub fn anchor_template(&self) -> Option<&NodeTemplate> {
        self.anchor_kind.as_deref().and_then(|k| self.templates.get(k))
    }

    pub fn instantiate(&self, kind: &str, id: impl Into<NodeId>, position: Point) -> Result<Node, GraphError> {
        self.get(kind)
            .map(|t| t.instantiate(id, position))
            .ok_or_else(|| GraphError::UnknownKind(kind.to_string()))
    }

    pub fn preferred_anchor_ports(&self) -> PreferredAnchorPorts {
        let mut table = PreferredAnchorPorts::default();
        for template in self.templates() {
            if let Some(port) = &template.preferred_anchor_port {
                table.insert(template.kind.clone(), port.clone());
            }
        }
        table
    }

    /// The built-in strategy blocks.
    pub fn strategy_defaults() -> Self {
        use SignalType::{Condition, Config, Data};

        let templates = [
            NodeTemplate::new("strategy", "strategy")
                .anchor()
                .sized(ANCHOR_NODE_SIZE)
                .input("entry", Condition)
                .input("exit", Condition)
                .input("stopLoss", Config)
                .input("takeProfit", Config)
                .input("sizing", Config)
                .param("name", json!("Untitled strategy")),
            // indicators
            NodeTemplate::new("price", "indicator")
                .output("value", Data)
                .param("field", json!("close")),
            NodeTemplate::new("sma", "indicator")
                .input("source", Data)
                .output("value", Data)
                .param("period", json!(20)),
            NodeTemplate::new("ema", "indicator")
                .input("source", Data)
                .output("value", Data)
                .param("period", json!(12)),
            NodeTemplate::new("rsi", "indicator")
                .input("source", Data)
                .output("value", Data)
                .param("period", json!(14)),
            NodeTemplate::new("macd", "indicator")
                .input("source", Data)
                .output("macd", Data)
                .output("signal", Data)
                .output("histogram", Data)
                .param("fast", json!(12))
                .param("slow", json!(26))
                .param("signal", json!(9)),
            NodeTemplate::new("bollinger", "indicator")
                .input("source", Data)
                .output("upper", Data)
                .output("middle", Data)
                .output("lower", Data)
                .param("period", json!(20))
                .param("stddev", json!(2.0)),
            // conditions
            NodeTemplate::new("crossover", "condition")
                .input("fast", Data)
                .input("slow", Data)
                .output("out", Condition)
                .param("direction", json!("above")),
            NodeTemplate::new("threshold", "condition")
                .input("value", Data)
                .output("out", Condition)
                .param("operator", json!(">"))
                .param("level", json!(70)),
            NodeTemplate::new("and", "condition")
                .input("a", Condition)
                .input("b", Condition)
                .output("out", Condition),
            NodeTemplate::new("or", "condition")
                .input("a", Condition)
                .input("b", Condition)
                .output("out", Condition),
            NodeTemplate::new("not", "condition")
                .input("in", Condition)
                .output("out", Condition),
            // actions
            NodeTemplate::new("buy", "action")
                .input("when", Condition)
                .output("signal", Condition)
                .param("orderType", json!("market")),
            NodeTemplate::new("sell", "action")
                .input("when", Condition)
                .output("signal", Condition)
                .param("orderType", json!("market")),
            // exit rules and sizing
            NodeTemplate::new("stop_loss", "exit")
                .output("config", Config)
                .param("percent", json!(2.0))
                .prefers_anchor_port("stopLoss"),
            NodeTemplate::new("take_profit", "exit")
                .output("config", Config)
                .param("percent", json!(4.0))
                .prefers_anchor_port("takeProfit"),
            NodeTemplate::new("trailing_stop", "exit")
                .output("config", Config)
                .param("percent", json!(1.5))
                .prefers_anchor_port("stopLoss"),
            NodeTemplate::new("fixed_fraction", "sizing")
                .output("config", Config)
                .param("fraction", json!(0.1))
                .prefers_anchor_port("sizing"),
        ];

        let mut catalog = Catalog::new();
        for template in templates {
            if let Err(err) = catalog.register_template(template) {
                warn!(%err, "skipping built-in node kind");
            }
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vwap;

    impl NodeKind for Vwap {
        fn kind(&self) -> &str {
            "vwap"
        }

        fn category(&self) -> &str {
            "indicator"
        }

        fn ports(&self) -> Vec<Port> {
            vec![Port::input("source", SignalType::Data), Port::output("value", SignalType::Data)]
        }
    }

    #[test]
    fn test_register_trait_implementation() {
        let mut catalog = Catalog::new();
        catalog.register(&Vwap).unwrap();
        let template = catalog.get("vwap").unwrap();
        assert_eq!(template.size, DEFAULT_NODE_SIZE);
        assert_eq!(template.ports.len(), 2);
        assert!(template.default_params.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_kind() {
        let mut catalog = Catalog::new();
        catalog.register(&Vwap).unwrap();
        assert_eq!(catalog.register(&Vwap), Err(CatalogError::DuplicateKind("vwap".into())));
    }

    #[test]
    fn test_register_rejects_duplicate_port() {
        let mut catalog = Catalog::new();
        let template = NodeTemplate::new("bad", "test")
            .input("x", SignalType::Data)
            .input("x", SignalType::Condition);
        assert!(matches!(
            catalog.register_template(template),
            Err(CatalogError::DuplicatePort { .. })
        ));

        // same id in opposite directions is allowed
        let template = NodeTemplate::new("ok", "test")
            .input("x", SignalType::Data)
            .output("x", SignalType::Data);
        assert!(catalog.register_template(template).is_ok());
    }

    #[test]
    fn test_register_rejects_second_anchor_kind() {
        let mut catalog = Catalog::strategy_defaults();
        let result = catalog.register_template(NodeTemplate::new("portfolio", "strategy").anchor());
        assert_eq!(
            result,
            Err(CatalogError::AnchorKindExists {
                existing: "strategy".into(),
                kind: "portfolio".into(),
            })
        );
    }

    #[test]
    fn test_instantiate_copies_template() {
        let catalog = Catalog::strategy_defaults();
        let node = catalog.instantiate("sma", "sma_1", Point::new(10.0, 20.0)).unwrap();
        assert_eq!(node.kind, "sma");
        assert_eq!(node.category, "indicator");
        assert_eq!(node.position, Point::new(10.0, 20.0));
        assert_eq!(node.params["period"], json!(20));
        assert!(!node.is_anchor);
    }

    #[test]
    fn test_instantiate_unknown_kind() {
        let catalog = Catalog::strategy_defaults();
        assert_eq!(
            catalog.instantiate("martingale", "m_1", Point::default()),
            Err(GraphError::UnknownKind("martingale".into()))
        );
    }

    #[test]
    fn test_strategy_defaults_contents() {
        let catalog = Catalog::strategy_defaults();
        for kind in [
            "strategy", "price", "sma", "ema", "rsi", "macd", "bollinger", "crossover", "threshold", "and",
            "or", "not", "buy", "sell", "stop_loss", "take_profit", "trailing_stop", "fixed_fraction",
        ] {
            assert!(catalog.contains(kind), "missing {kind}");
        }
        assert_eq!(catalog.templates().count(), 18);

        let anchor = catalog.anchor_template().unwrap();
        assert_eq!(anchor.kind, "strategy");
        assert!(anchor.ports.iter().all(|p| p.direction == PortDirection::Input));
    }

    #[test]
    fn test_preferred_anchor_ports_exist_on_anchor() {
        let catalog = Catalog::strategy_defaults();
        let anchor = catalog.anchor_template().unwrap();
        let table = catalog.preferred_anchor_ports();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("stop_loss"), Some("stopLoss"));
        assert_eq!(table.get("trailing_stop"), Some("stopLoss"));
        assert_eq!(table.get("fixed_fraction"), Some("sizing"));
        assert_eq!(table.get("sma"), None);

        for template in catalog.templates().filter(|t| t.preferred_anchor_port.is_some()) {
            let port = template.preferred_anchor_port.as_deref().unwrap();
            assert!(
                anchor
                    .ports
                    .iter()
                    .any(|p| p.id == port && p.signal_type == SignalType::Config),
                "{} prefers missing port {port}",
                template.kind
            );
        }
    }
}
