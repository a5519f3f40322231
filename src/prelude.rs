//! Prelude module for common maplet-overpass types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use maplet_overpass::prelude::*;`

pub use crate::core::{
    config::{ClientOptions, MissingReferencePolicy, OverpassOptions, StyleOptions},
    geo::{LatLng, LatLngBounds},
    map::{MapHost, MemoryMap, SharedHost},
};

pub use crate::data::geojson::{FeatureCollection, GeoJsonFeature, GeoJsonGeometry};

pub use crate::input::events::{ControlEvent, KeyCode, MapEvent, MapEventKind};

pub use crate::plugins::{
    base::ControlTrait,
    fetch::{FetchOutcome, FetchStatus},
    overpass::OverpassPlugin,
};

pub use crate::query::{
    client::{OverpassClient, QueryClient},
    template::substitute_bbox,
};

pub use crate::runtime::{init_runtime, runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::style::document::{StyleDocument, StyleLayer};

pub use crate::ui::controls::{ControlFactory, DefaultControlFactory, PluginControl};

pub use crate::{Error as MapError, Result};

pub use std::sync::Arc;
