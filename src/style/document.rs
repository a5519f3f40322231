//! Style document model
//!
//! The host renderer owns the style document. The plugin only reads a
//! snapshot, edits the copy and hands it back, so these types keep every
//! key they do not understand in `extra` and round-trip it untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const VISIBILITY: &str = "visibility";
pub const VISIBLE: &str = "visible";
pub const HIDDEN: &str = "none";

/// One rendering rule of the style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "source-layer", default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StyleLayer {
    pub fn new(id: impl Into<String>, layer_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layer_type: layer_type.into(),
            source: None,
            source_layer: None,
            paint: None,
            layout: None,
            filter: None,
            extra: Map::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    pub fn with_paint(mut self, paint: Map<String, Value>) -> Self {
        self.paint = Some(paint);
        self
    }

    pub fn with_layout(mut self, layout: Map<String, Value>) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Source names match by substring, so `overpass` also covers `overpass-2`
    pub fn uses_source(&self, source_name: &str) -> bool {
        self.source
            .as_deref()
            .is_some_and(|source| source.contains(source_name))
    }

    /// Layout visibility; layers without the flag are visible
    pub fn visibility(&self) -> &str {
        self.layout
            .as_ref()
            .and_then(|layout| layout.get(VISIBILITY))
            .and_then(Value::as_str)
            .unwrap_or(VISIBLE)
    }

    pub fn set_visible(&mut self, visible: bool) {
        let flag = if visible { VISIBLE } else { HIDDEN };
        self.layout
            .get_or_insert_with(Map::new)
            .insert(VISIBILITY.to_string(), Value::String(flag.to_string()));
    }
}

/// Declarative description of a map's sources and layers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
    #[serde(default)]
    pub sources: Map<String, Value>,
    #[serde(default)]
    pub layers: Vec<StyleLayer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StyleDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a style document from JSON
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// True when any source name contains `source_name`
    pub fn has_source(&self, source_name: &str) -> bool {
        self.sources.keys().any(|name| name.contains(source_name))
    }

    pub fn layer(&self, id: &str) -> Option<&StyleLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.id.as_str()).collect()
    }

    /// Layers drawing from sources whose name contains `source_name`
    pub fn layers_for_source<'a>(
        &'a self,
        source_name: &'a str,
    ) -> impl Iterator<Item = &'a StyleLayer> + 'a {
        self.layers
            .iter()
            .filter(move |layer| layer.uses_source(source_name))
    }

    /// Sets the visibility flag on every layer of the source and returns how many it touched
    pub fn set_source_visibility(&mut self, source_name: &str, visible: bool) -> usize {
        let mut touched = 0;
        for layer in self
            .layers
            .iter_mut()
            .filter(|layer| layer.uses_source(source_name))
        {
            layer.set_visible(visible);
            touched += 1;
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StyleDocument {
        StyleDocument::from_json_str(
            r##"{
                "version": 8,
                "name": "basic",
                "sources": {"composite": {"type": "vector", "url": "mapbox://streets"}},
                "layers": [
                    {"id": "background", "type": "background", "paint": {"background-color": "#fff"}},
                    {"id": "road-street", "type": "line", "source": "composite", "source-layer": "road",
                     "minzoom": 12}
                ]
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_keys_round_trip() {
        let style = sample();
        assert_eq!(style.extra.get("version"), Some(&json!(8)));
        assert_eq!(
            style.layer("road-street").unwrap().extra.get("minzoom"),
            Some(&json!(12))
        );

        let value = serde_json::to_value(&style).unwrap();
        assert_eq!(value["name"], json!("basic"));
        assert_eq!(value["layers"][1]["source-layer"], json!("road"));
        assert_eq!(value["layers"][1]["minzoom"], json!(12));
        assert!(value["layers"][0].get("source").is_none());
    }

    #[test]
    fn test_visibility_flags() {
        let mut style = sample();
        style.layers.push(StyleLayer::new("overpass line", "line").with_source("overpass"));

        assert_eq!(style.layer("overpass line").unwrap().visibility(), VISIBLE);
        assert_eq!(style.set_source_visibility("overpass", false), 1);
        assert_eq!(style.layer("overpass line").unwrap().visibility(), HIDDEN);
        assert_eq!(style.layer("road-street").unwrap().visibility(), VISIBLE);

        style.set_source_visibility("overpass", true);
        assert_eq!(style.layer("overpass line").unwrap().visibility(), VISIBLE);
    }

    #[test]
    fn test_source_name_matches_substring() {
        let mut style = sample();
        assert!(!style.has_source("overpass"));
        style
            .sources
            .insert("overpass-cafes".to_string(), json!({"type": "geojson"}));
        assert!(style.has_source("overpass"));
    }
}
