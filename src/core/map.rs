//! Host map boundary
//!
//! `MapHost` is everything the plugin needs from the renderer it is added
//! to. `MemoryMap` implements it in memory for headless use and tests.

use crate::{
    core::geo::LatLngBounds,
    data::geojson::FeatureCollection,
    input::events::{MapEvent, MapEventKind},
    style::document::StyleDocument,
    Error, Result,
};
use fxhash::FxHashMap;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operations the host renderer exposes to controls
pub trait MapHost: Send {
    /// Adds a named source definition to the style
    fn add_source(&mut self, name: &str, source: Value) -> Result<()>;

    /// Replaces the data of a GeoJSON source
    fn set_source_data(&mut self, name: &str, data: &FeatureCollection) -> Result<()>;

    /// Snapshot of the current style document
    fn style(&self) -> StyleDocument;

    /// Commits a style document back to the renderer
    fn set_style(&mut self, style: StyleDocument) -> Result<()>;

    /// Currently visible extent
    fn bounds(&self) -> LatLngBounds;

    /// Subscribes `listener` to events of `kind`
    fn on(&mut self, kind: MapEventKind, listener: &str);

    /// Removes a subscription made with `on`
    fn off(&mut self, kind: MapEventKind, listener: &str);
}

/// Host handle shared between a control and its in-flight fetches
pub type SharedHost = Arc<Mutex<dyn MapHost>>;

/// Locks the host, mapping a poisoned lock to a plugin error
pub fn lock_host(host: &SharedHost) -> Result<MutexGuard<'_, dyn MapHost + 'static>> {
    host.lock()
        .map_err(|_| Error::Plugin("map host lock poisoned".to_string()))
}

/// `{"type": "geojson", "data": <collection>}`
pub fn geojson_source(data: &FeatureCollection) -> Result<Value> {
    Ok(json!({
        "type": "geojson",
        "data": data.to_value()?,
    }))
}

/// In-memory host: a style document, a viewport and a listener table
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    style: StyleDocument,
    bounds: LatLngBounds,
    listeners: FxHashMap<MapEventKind, Vec<String>>,
    style_commits: usize,
}

impl MemoryMap {
    pub fn new(style: StyleDocument, bounds: LatLngBounds) -> Self {
        Self {
            style,
            bounds,
            listeners: FxHashMap::default(),
            style_commits: 0,
        }
    }

    /// Wraps the map for sharing with a plugin while keeping typed access
    pub fn into_shared(self) -> Arc<Mutex<MemoryMap>> {
        Arc::new(Mutex::new(self))
    }

    pub fn set_bounds(&mut self, bounds: LatLngBounds) {
        self.bounds = bounds;
    }

    /// Moves the viewport and returns the event the renderer would emit
    pub fn move_to(&mut self, bounds: LatLngBounds) -> MapEvent {
        self.bounds = bounds.clone();
        MapEvent::MoveEnd { bounds }
    }

    pub fn listeners(&self, kind: MapEventKind) -> Vec<&str> {
        self.listeners
            .get(&kind)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, kind: MapEventKind, listener: &str) -> bool {
        self.listeners(kind).contains(&listener)
    }

    /// Current data of a GeoJSON source
    pub fn source_data(&self, name: &str) -> Option<FeatureCollection> {
        let data = self.style.sources.get(name)?.get("data")?;
        serde_json::from_value(data.clone()).ok()
    }

    /// Number of `set_style` commits so far
    pub fn style_commits(&self) -> usize {
        self.style_commits
    }

    pub fn style_ref(&self) -> &StyleDocument {
        &self.style
    }
}

impl MapHost for MemoryMap {
    fn add_source(&mut self, name: &str, source: Value) -> Result<()> {
        if self.style.sources.contains_key(name) {
            return Err(Error::Plugin(format!("source '{}' already exists", name)));
        }
        log::debug!("adding source '{}'", name);
        self.style.sources.insert(name.to_string(), source);
        Ok(())
    }

    fn set_source_data(&mut self, name: &str, data: &FeatureCollection) -> Result<()> {
        let source = self
            .style
            .sources
            .get_mut(name)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::SourceNotFound(name.to_string()))?;
        source.insert("data".to_string(), data.to_value()?);
        Ok(())
    }

    fn style(&self) -> StyleDocument {
        self.style.clone()
    }

    fn set_style(&mut self, style: StyleDocument) -> Result<()> {
        self.style = style;
        self.style_commits += 1;
        Ok(())
    }

    fn bounds(&self) -> LatLngBounds {
        self.bounds.clone()
    }

    fn on(&mut self, kind: MapEventKind, listener: &str) {
        let names = self.listeners.entry(kind).or_default();
        if !names.iter().any(|name| name == listener) {
            names.push(listener.to_string());
        }
    }

    fn off(&mut self, kind: MapEventKind, listener: &str) {
        if let Some(names) = self.listeners.get_mut(&kind) {
            names.retain(|name| name != listener);
        }
    }
}
