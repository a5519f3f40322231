//! Overlay layers injected into the host style

use crate::core::config::{MissingReferencePolicy, StyleOptions};
use crate::style::document::{StyleDocument, StyleLayer};
use crate::{Error, Result};
use serde_json::{json, Map, Value};

const LABEL_FONTS: [&str; 2] = ["Open Sans Semibold", "Arial Unicode MS Bold"];

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Builds the fill, line, circle and symbol layers for `source_name`
pub fn build_style_layers(options: &StyleOptions, source_name: &str) -> Vec<StyleLayer> {
    vec![
        StyleLayer::new(format!("{} fill", source_name), "fill")
            .with_source(source_name)
            .with_paint(object(json!({
                "fill-color": options.color,
                "fill-opacity": options.opacity,
            })))
            .with_filter(json!(["==", "$type", "Polygon"])),
        StyleLayer::new(format!("{} line", source_name), "line")
            .with_source(source_name)
            .with_paint(object(json!({
                "line-color": options.color,
                "line-width": options.size,
                "line-opacity": options.opacity,
            }))),
        StyleLayer::new(format!("{} circle", source_name), "circle")
            .with_source(source_name)
            .with_paint(object(json!({
                "circle-color": options.color,
                "circle-radius": options.size,
                "circle-opacity": options.opacity,
            }))),
        StyleLayer::new(format!("{} symbol", source_name), "symbol")
            .with_source(source_name)
            .with_layout(object(json!({
                "text-field": options.label,
                "text-size": options.label_size,
                "text-font": LABEL_FONTS,
                "text-anchor": "top",
            }))),
    ]
}

/// Layers to inject: the configured override, or the generated set
pub fn resolve_style_layers(options: &StyleOptions, source_name: &str) -> Vec<StyleLayer> {
    match &options.layers {
        Some(layers) => layers.clone(),
        None => build_style_layers(options, source_name),
    }
}

/// Index right after the last layer whose `source-layer` equals `reference`
pub fn insertion_index(style: &StyleDocument, reference: &str) -> Option<usize> {
    style
        .layers
        .iter()
        .rposition(|layer| layer.source_layer.as_deref() == Some(reference))
        .map(|index| index + 1)
}

/// Where the overlay goes for a given policy, `None` meaning "do not inject"
pub fn resolve_insertion(
    style: &StyleDocument,
    reference: &str,
    policy: MissingReferencePolicy,
) -> Result<Option<usize>> {
    match (insertion_index(style, reference), policy) {
        (Some(index), _) => Ok(Some(index)),
        (None, MissingReferencePolicy::Skip) => Ok(None),
        (None, MissingReferencePolicy::Append) => Ok(Some(style.layers.len())),
        (None, MissingReferencePolicy::Error) => {
            Err(Error::MissingReferenceLayer(reference.to_string()))
        }
    }
}

/// Returns a copy of `style` with `layers` spliced in at `index`
pub fn add_style_layers(style: &StyleDocument, layers: &[StyleLayer], index: usize) -> StyleDocument {
    let index = index.min(style.layers.len());
    let mut merged = Vec::with_capacity(style.layers.len() + layers.len());
    merged.extend_from_slice(&style.layers[..index]);
    merged.extend_from_slice(layers);
    merged.extend_from_slice(&style.layers[index..]);

    StyleDocument {
        layers: merged,
        ..style.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_style() -> StyleDocument {
        StyleDocument {
            layers: vec![
                StyleLayer::new("background", "background"),
                StyleLayer::new("road-minor", "line").with_source_layer("road"),
                StyleLayer::new("water", "fill").with_source_layer("water"),
                StyleLayer::new("road-major", "line").with_source_layer("road"),
                StyleLayer::new("poi-label", "symbol").with_source_layer("poi_label"),
            ],
            ..StyleDocument::default()
        }
    }

    #[test]
    fn test_build_style_layers() {
        let layers = build_style_layers(&StyleOptions::default(), "overpass");
        let ids: Vec<_> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["overpass fill", "overpass line", "overpass circle", "overpass symbol"]
        );
        assert!(layers.iter().all(|l| l.source.as_deref() == Some("overpass")));

        let fill = &layers[0];
        assert_eq!(fill.paint.as_ref().unwrap()["fill-color"], json!("#ff00ed"));
        assert_eq!(fill.paint.as_ref().unwrap()["fill-opacity"], json!(0.5));
        assert_eq!(fill.filter, Some(json!(["==", "$type", "Polygon"])));

        let line = &layers[1];
        assert_eq!(line.paint.as_ref().unwrap()["line-width"], json!(5.0));

        let circle = &layers[2];
        assert_eq!(circle.paint.as_ref().unwrap()["circle-radius"], json!(5.0));

        let symbol = &layers[3];
        let layout = symbol.layout.as_ref().unwrap();
        assert_eq!(layout["text-field"], json!("{name}"));
        assert_eq!(layout["text-size"], json!(10.0));
        assert_eq!(layout["text-font"], json!(LABEL_FONTS));
        assert_eq!(layout["text-anchor"], json!("top"));
    }

    #[test]
    fn test_layer_override_wins() {
        let options = StyleOptions {
            layers: Some(vec![StyleLayer::new("custom", "circle").with_source("overpass")]),
            ..StyleOptions::default()
        };
        let layers = resolve_style_layers(&options, "overpass");
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].id, "custom");
    }

    #[test]
    fn test_inserts_after_last_reference_layer() {
        let style = base_style();
        let layers = build_style_layers(&StyleOptions::default(), "overpass");
        let index = insertion_index(&style, "road").unwrap();
        assert_eq!(index, 4);

        let merged = add_style_layers(&style, &layers, index);
        assert_eq!(
            merged.layer_ids(),
            vec![
                "background",
                "road-minor",
                "water",
                "road-major",
                "overpass fill",
                "overpass line",
                "overpass circle",
                "overpass symbol",
                "poi-label",
            ]
        );
        // the input snapshot is left alone
        assert_eq!(style.layers.len(), 5);
    }

    #[test]
    fn test_missing_reference_policies() {
        let style = StyleDocument {
            layers: vec![StyleLayer::new("background", "background")],
            ..StyleDocument::default()
        };

        assert_eq!(insertion_index(&style, "road"), None);
        assert_eq!(
            resolve_insertion(&style, "road", MissingReferencePolicy::Skip).unwrap(),
            None
        );
        assert_eq!(
            resolve_insertion(&style, "road", MissingReferencePolicy::Append).unwrap(),
            Some(1)
        );
        assert!(matches!(
            resolve_insertion(&style, "road", MissingReferencePolicy::Error),
            Err(Error::MissingReferenceLayer(name)) if name == "road"
        ));
    }
}
