use crate::error::SettingsError;
use crate::geometry::Point;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable constant of the editing engine, in logical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Minimum gap the repulsion pass keeps between node boxes.
    pub clearance: f64,
    /// Auto-snap creates an edge only when the closest port pair is nearer than this.
    pub snap_radius: f64,
    /// Displacement a drag must exceed before it counts as a move.
    pub drag_epsilon: f64,
    pub history_capacity: usize,
    pub port_hit_radius: f64,
    pub edge_hover_distance: f64,
    pub edge_hit_samples: usize,
    pub bezier_offset: f64,
    /// Offset applied to cloned nodes.
    pub clone_offset: f64,
    /// Where the anchor node is placed when a session starts without one.
    pub anchor_position: Point,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            clearance: 10.0,
            snap_radius: 50.0,
            drag_epsilon: 3.0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            port_hit_radius: 8.0,
            edge_hover_distance: 6.0,
            edge_hit_samples: 20,
            bezier_offset: 50.0,
            clone_offset: 30.0,
            anchor_position: Point::new(40.0, 40.0),
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

/// Read settings, as TOML when the path ends in `.toml` and JSON otherwise.
/// Missing fields take their defaults.
pub fn load_settings(path: impl AsRef<Path>) -> Result<EditorSettings, SettingsError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    if is_toml(path) {
        Ok(toml::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

pub fn save_settings(path: impl AsRef<Path>, settings: &EditorSettings) -> Result<(), SettingsError> {
    let path = path.as_ref();
    let text = if is_toml(path) {
        toml::to_string_pretty(settings)?
    } else {
        serde_json::to_string_pretty(settings)?
    };
    std::fs::write(path, text)?;
    Ok(())
}
