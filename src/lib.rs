//! # Strategy Node Editor
//!
//! The editing engine behind a visual trading-strategy builder. Users place
//! indicator, logic, action and risk nodes on a canvas, wire them with typed
//! connections, and feed everything into a single strategy anchor node.
//!
//! ## Features
//!
//! - **Typed Connections** - `data`, `condition` and `config` signals, validated
//!   before any edge is created
//! - **Gesture State Machine** - drag, group drag, marquee selection and
//!   connection drawing from raw pointer events
//! - **Spatial Behavior** - overlap repulsion and proximity auto-snap on drop
//! - **Bounded Undo/Redo** - copy-on-write graph snapshots, integrity-checked
//!   on restore
//! - **Persistence** - JSON save/load with normalization of the legacy edge format
//!
//! ## Quick Start
//!
//! ```ignore
//! use strategy_node_editor::{EditorHandle, RenderAdapter, StrategyEditor};
//!
//! let handle = EditorHandle::new(StrategyEditor::strategy()?);
//! window.on_pointer_down(handle.pointer_down_callback());
//! window.on_pointer_move(handle.pointer_move_callback());
//! window.on_pointer_up(handle.pointer_up_callback());
//! ```
//!
//! ## Layers
//!
//! - [`Graph`] - nodes, ports and edges with structural invariants
//! - [`Catalog`] - node kinds and the preferred anchor port table
//! - [`ConnectionValidator`] - two-phase connection checks with config redirect
//! - [`Session`] - graph + selection + history, one undoable action per call
//! - [`InteractionController`] - pointer gestures over a session
//! - [`StrategyEditor`] - session + controller + change notification
//! - [`RenderAdapter`] / [`EditorHandle`] - the Slint side

pub mod error;
pub mod geometry;
pub mod graph;
pub mod catalog;
pub mod connection;
pub mod path;
pub mod spatial;
pub mod selection;
pub mod history;
pub mod settings;
pub mod persistence;
pub mod session;
pub mod controller;
pub mod editor;
pub mod render;
pub mod callbacks;
#[cfg(feature = "layout")]
pub mod layout;

pub use error::{CatalogError, GraphError, HistoryError, PersistenceError, SettingsError, ValidationError};
pub use geometry::{Point, Rect, Size};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId, Params, Port, PortDirection, PortId, PortRef, SignalType};
pub use catalog::{Catalog, NodeKind, NodeTemplate, PreferredAnchorPorts};
pub use connection::{
    validate_link, AnchorPortValidator, BasicLinkValidator, CompositeValidator, ConnectionValidator,
    LinkValidator, NoDuplicatesValidator, PendingConnection, ResolvedConnection, SignalTypeValidator,
    ValidationResult,
};
pub use path::{bezier_path, CubicBezier};
pub use hit_test::{find_edge_at, find_node_at, find_port_at, nodes_in_marquee, NodeGeometry, PortHit};
pub use spatial::{auto_snap, find_snap, repel, Push, SnapCandidate};
pub use selection::SelectionManager;
pub use history::HistoryManager;
pub use settings::{load_settings, save_settings, EditorSettings};
pub use persistence::{load_graph, save_graph, GraphDocument, LoadReport};
pub use session::{Removed, Session};
pub use controller::{Gesture, GestureKind, GestureOutcome, InteractionController, PointerEvent};
pub use editor::{ChangeEvent, StrategyEditor};
pub use render::{signal_color, EdgeView, NodeView, OverlayView, RenderAdapter};
pub use callbacks::EditorHandle;
