use crate::core::geo::LatLngBounds;
use serde::{Deserialize, Serialize};

/// Kinds of map events a control can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapEventKind {
    Load,
    MoveEnd,
}

/// Map event types that can be emitted by the map
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Style finished loading
    Load,
    /// Pan or zoom ended; carries the new viewport
    MoveEnd { bounds: LatLngBounds },
}

impl MapEvent {
    pub fn kind(&self) -> MapEventKind {
        match self {
            MapEvent::Load => MapEventKind::Load,
            MapEvent::MoveEnd { .. } => MapEventKind::MoveEnd,
        }
    }
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Enter,
    Escape,
    Other(u32),
}

/// Events raised by the plugin's own control surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlEvent {
    /// The toggle button was clicked
    ToggleClicked,
    /// The query input's text changed
    InputChanged(String),
    /// A key was pressed inside the query input
    KeyPress { key: KeyCode },
}

impl ControlEvent {
    /// True for Enter in the query input, which submits the template
    pub fn is_submit(&self) -> bool {
        matches!(self, ControlEvent::KeyPress { key: KeyCode::Enter })
    }
}
