//! Bounding-box substitution for query templates

use crate::core::geo::LatLngBounds;

/// Placeholder replaced with the current viewport
pub const BBOX_TOKEN: &str = "{{bbox}}";

/// Replaces every `{{bbox}}` with `swLat,swLng,neLat,neLng`.
///
/// Templates without the token come back unchanged.
pub fn substitute_bbox(template: &str, bounds: &LatLngBounds) -> String {
    if !template.contains(BBOX_TOKEN) {
        return template.to_string();
    }
    template.replace(BBOX_TOKEN, &bounds.to_overpass_bbox())
}

/// Number of placeholders in a template
pub fn token_count(template: &str) -> usize {
    template.matches(BBOX_TOKEN).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> LatLngBounds {
        LatLngBounds::from_coords(40.705, -74.01, 40.72, -73.99)
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let template = "[out:json];(node({{bbox}});way({{bbox}}););out;";
        assert_eq!(token_count(template), 2);
        assert_eq!(
            substitute_bbox(template, &bounds()),
            "[out:json];(node(40.705,-74.01,40.72,-73.99);way(40.705,-74.01,40.72,-73.99););out;"
        );
    }

    #[test]
    fn test_template_without_token_is_unchanged() {
        let template = "[out:json];node(1,2,3,4);out;";
        assert_eq!(token_count(template), 0);
        assert_eq!(substitute_bbox(template, &bounds()), template);
    }

    #[test]
    fn test_similar_tokens_are_left_alone() {
        assert_eq!(
            substitute_bbox("{bbox} {{ bbox }}", &bounds()),
            "{bbox} {{ bbox }}"
        );
    }
}
