//! # maplet-overpass
//!
//! A map plugin that queries OpenStreetMap through the Overpass API and
//! renders the results as styled layers of the host map's style document.
//!
//! The plugin keeps a toggle state, turns the current viewport into an
//! Overpass QL query, fetches features from the remote service and pushes
//! them into a GeoJSON source it injects into the style exactly once.

pub mod core;
pub mod data;
pub mod input;
pub mod plugins;
pub mod prelude;
pub mod query;
pub mod runtime;
pub mod style;
pub mod ui;

// Re-export public API
pub use core::{
    config::{ClientOptions, MissingReferencePolicy, OverpassOptions, StyleOptions},
    geo::{LatLng, LatLngBounds},
    map::{MapHost, MemoryMap, SharedHost},
};

pub use data::geojson::{FeatureCollection, GeoJsonFeature, GeoJsonGeometry};

pub use input::events::{ControlEvent, KeyCode, MapEvent, MapEventKind};

pub use plugins::{
    base::ControlTrait,
    fetch::{FetchOutcome, FetchStatus, FetchTicket},
    overpass::OverpassPlugin,
};

pub use query::{
    client::{OverpassClient, QueryClient},
    template::{substitute_bbox, BBOX_TOKEN},
};

pub use style::document::{StyleDocument, StyleLayer};

pub use ui::controls::{ButtonControl, ControlFactory, PluginControl, TextInputControl};

/// Initializes `env_logger` with `info` as the default level; `RUST_LOG` overrides it
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("No layer with source-layer '{0}' to insert after")]
    MissingReferenceLayer(String),

    #[error("Plugin is not attached to a map")]
    NotAttached,

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;
