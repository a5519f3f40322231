//! Overpass JSON to GeoJSON conversion
//!
//! Nodes become points, ways become lines or polygons depending on their
//! tags, and multipolygon/boundary relations are assembled into
//! (multi)polygons from their member rings.

use crate::data::geojson::{FeatureCollection, GeoJsonFeature, GeoJsonGeometry};
use fxhash::{FxHashMap, FxHashSet};
use geo::Contains;
use geo_types::{LineString, Point, Polygon};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

type Position = [f64; 2];
type Ring = Vec<Position>;

/// Tags that do not make an otherwise plain vertex worth a feature
const UNINTERESTING_TAGS: [&str; 9] = [
    "source",
    "source_ref",
    "source:ref",
    "history",
    "attribution",
    "created_by",
    "tiger:county",
    "tiger:tlid",
    "tiger:upload_uuid",
];

/// Keys that turn any closed way into an area
const AREA_KEYS: [&str; 16] = [
    "building",
    "building:part",
    "landuse",
    "leisure",
    "amenity",
    "shop",
    "tourism",
    "historic",
    "military",
    "office",
    "craft",
    "place",
    "public_transport",
    "ruins",
    "area:highway",
    "aeroway",
];

/// Keys that are areas only for some values (`true`) or all but some (`false`)
const AREA_VALUES: [(&str, bool, &[&str]); 7] = [
    ("natural", false, &["coastline", "cliff", "ridge", "arete", "tree_row"]),
    ("man_made", false, &["cutline", "embankment", "pipeline"]),
    ("waterway", true, &["riverbank", "dock", "boatyard", "dam"]),
    ("power", true, &["plant", "substation", "generator", "transformer"]),
    ("railway", true, &["station", "turntable", "roundhouse", "platform"]),
    ("highway", true, &["services", "rest_area", "escape", "elevator"]),
    (
        "barrier",
        true,
        &["city_wall", "ditch", "hedge", "retaining_wall", "wall", "spikes"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
    #[serde(other)]
    Other,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Node => "node",
            ElementType::Way => "way",
            ElementType::Relation => "relation",
            ElementType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeometryPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeometryPoint {
    fn position(&self) -> Position {
        [self.lon, self.lat]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsmMember {
    #[serde(rename = "type")]
    pub member_type: ElementType,
    #[serde(rename = "ref")]
    pub reference: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Option<Vec<Option<GeometryPoint>>>,
}

/// One element of an Overpass `[out:json]` response
#[derive(Debug, Clone, Deserialize)]
pub struct OsmElement {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<GeometryPoint>,
    pub nodes: Option<Vec<i64>>,
    pub geometry: Option<Vec<Option<GeometryPoint>>>,
    pub members: Option<Vec<OsmMember>>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub timestamp: Option<String>,
    pub version: Option<u64>,
    pub changeset: Option<u64>,
    pub user: Option<String>,
    pub uid: Option<u64>,
}

impl OsmElement {
    fn feature_id(&self) -> String {
        format!("{}/{}", self.element_type.as_str(), self.id)
    }

    fn has_interesting_tags(&self) -> bool {
        self.tags
            .keys()
            .any(|key| !UNINTERESTING_TAGS.contains(&key.as_str()))
    }

    fn meta(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        if let Some(timestamp) = &self.timestamp {
            meta.insert("timestamp".to_string(), json!(timestamp));
        }
        if let Some(version) = self.version {
            meta.insert("version".to_string(), json!(version));
        }
        if let Some(changeset) = self.changeset {
            meta.insert("changeset".to_string(), json!(changeset));
        }
        if let Some(user) = &self.user {
            meta.insert("user".to_string(), json!(user));
        }
        if let Some(uid) = self.uid {
            meta.insert("uid".to_string(), json!(uid));
        }
        meta
    }

    fn inline_geometry(&self) -> Option<Ring> {
        self.geometry
            .as_ref()
            .map(|points| points.iter().flatten().map(GeometryPoint::position).collect())
    }
}

/// Body of an Overpass `[out:json]` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OsmElement>,
    /// Server-side runtime errors (timeouts, memory limits) end up here
    pub remark: Option<String>,
}

impl OverpassResponse {
    pub fn from_str(body: &str) -> crate::Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            crate::Error::ParseError(format!("invalid Overpass JSON (is the query [out:json]?): {}", e))
        })
    }
}

/// Whether a closed way with these tags is an area rather than a line
pub fn is_area(tags: &BTreeMap<String, String>) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("no") => return false,
        Some(_) => return true,
        None => {}
    }

    if AREA_KEYS.iter().any(|key| tags.contains_key(*key)) {
        return true;
    }

    AREA_VALUES.iter().any(|(key, whitelist, values)| {
        tags.get(*key).is_some_and(|value| {
            let listed = values.contains(&value.as_str());
            if *whitelist {
                listed
            } else {
                !listed
            }
        })
    })
}

fn is_closed(ring: &[Position]) -> bool {
    ring.len() >= 4 && ring.first() == ring.last()
}

/// Joins open way segments end to end into closed rings, dropping leftovers
fn join_rings(mut segments: Vec<Ring>) -> Vec<Ring> {
    let mut rings = Vec::new();
    segments.retain(|segment| segment.len() >= 2);

    while let Some(mut current) = segments.pop() {
        while !is_closed(&current) {
            let tail = match current.last() {
                Some(tail) => *tail,
                None => break,
            };
            let next = segments
                .iter()
                .position(|s| s.first() == Some(&tail) || s.last() == Some(&tail));
            match next {
                Some(index) => {
                    let mut segment = segments.swap_remove(index);
                    if segment.first() != Some(&tail) {
                        segment.reverse();
                    }
                    current.extend(segment.into_iter().skip(1));
                }
                None => break,
            }
        }

        if is_closed(&current) {
            rings.push(current);
        } else {
            log::debug!("dropping unclosed multipolygon ring of {} points", current.len());
        }
    }

    rings
}

fn to_geo_polygon(ring: &Ring) -> Polygon<f64> {
    Polygon::new(LineString::from(ring.clone()), vec![])
}

struct Converter<'a> {
    nodes: FxHashMap<i64, &'a OsmElement>,
    ways: FxHashMap<i64, &'a OsmElement>,
    way_vertices: FxHashSet<i64>,
    /// Ways already drawn as part of a multipolygon
    consumed_ways: FxHashSet<i64>,
    memberships: FxHashMap<(ElementType, i64), Vec<Value>>,
    flat_properties: bool,
}

impl<'a> Converter<'a> {
    fn new(elements: &'a [OsmElement], flat_properties: bool) -> Self {
        let mut nodes = FxHashMap::default();
        let mut ways = FxHashMap::default();
        let mut way_vertices = FxHashSet::default();
        let mut memberships: FxHashMap<(ElementType, i64), Vec<Value>> = FxHashMap::default();

        for element in elements {
            match element.element_type {
                ElementType::Node => {
                    nodes.insert(element.id, element);
                }
                ElementType::Way => {
                    ways.insert(element.id, element);
                    way_vertices.extend(element.nodes.iter().flatten().copied());
                }
                ElementType::Relation => {
                    for member in element.members.iter().flatten() {
                        memberships
                            .entry((member.member_type, member.reference))
                            .or_default()
                            .push(json!({
                                "role": member.role,
                                "rel": element.id,
                                "reltags": element.tags,
                            }));
                    }
                }
                ElementType::Other => {}
            }
        }

        Self {
            nodes,
            ways,
            way_vertices,
            consumed_ways: FxHashSet::default(),
            memberships,
            flat_properties,
        }
    }

    fn properties(&self, element: &OsmElement) -> Map<String, Value> {
        if self.flat_properties {
            let mut properties = element.meta();
            for (key, value) in &element.tags {
                properties.insert(key.clone(), json!(value));
            }
            properties.insert("id".to_string(), json!(element.feature_id()));
            return properties;
        }

        let relations = self
            .memberships
            .get(&(element.element_type, element.id))
            .cloned()
            .unwrap_or_default();
        let mut properties = Map::new();
        properties.insert("type".to_string(), json!(element.element_type.as_str()));
        properties.insert("id".to_string(), json!(element.id));
        properties.insert("tags".to_string(), json!(element.tags));
        properties.insert("relations".to_string(), Value::Array(relations));
        properties.insert("meta".to_string(), Value::Object(element.meta()));
        properties
    }

    fn feature(&self, element: &OsmElement, geometry: GeoJsonGeometry) -> GeoJsonFeature {
        GeoJsonFeature::new(geometry)
            .with_id(element.feature_id())
            .with_properties(self.properties(element))
    }

    fn way_positions(&self, way: &OsmElement) -> Ring {
        if let Some(ring) = way.inline_geometry() {
            return ring;
        }
        way.nodes
            .iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
            .filter_map(|node| Some([node.lon?, node.lat?]))
            .collect()
    }

    fn member_positions(&self, member: &OsmMember) -> Option<Ring> {
        if let Some(points) = &member.geometry {
            return Some(points.iter().flatten().map(GeometryPoint::position).collect());
        }
        self.ways
            .get(&member.reference)
            .map(|way| self.way_positions(way))
    }

    fn node_feature(&self, node: &OsmElement) -> Option<GeoJsonFeature> {
        if self.way_vertices.contains(&node.id) && !node.has_interesting_tags() {
            return None;
        }
        let coordinates = [node.lon?, node.lat?];
        Some(self.feature(node, GeoJsonGeometry::Point { coordinates }))
    }

    fn way_feature(&self, way: &OsmElement) -> Option<GeoJsonFeature> {
        if self.consumed_ways.contains(&way.id) && !way.has_interesting_tags() {
            return None;
        }

        let positions = self.way_positions(way);
        if positions.len() < 2 {
            return way
                .center
                .map(|center| self.feature(way, GeoJsonGeometry::Point { coordinates: center.position() }));
        }

        let geometry = if is_closed(&positions) && is_area(&way.tags) {
            GeoJsonGeometry::Polygon {
                coordinates: vec![positions],
            }
        } else {
            GeoJsonGeometry::LineString {
                coordinates: positions,
            }
        };
        Some(self.feature(way, geometry))
    }

    fn multipolygon(&self, relation: &OsmElement) -> Option<GeoJsonGeometry> {
        let mut outer_segments = Vec::new();
        let mut inner_segments = Vec::new();

        for member in relation.members.iter().flatten() {
            if member.member_type != ElementType::Way {
                continue;
            }
            let Some(positions) = self.member_positions(member) else {
                continue;
            };
            match member.role.as_str() {
                "inner" => inner_segments.push(positions),
                _ => outer_segments.push(positions),
            }
        }

        let outers = join_rings(outer_segments);
        if outers.is_empty() {
            return None;
        }

        let shapes: Vec<Polygon<f64>> = outers.iter().map(to_geo_polygon).collect();
        let mut polygons: Vec<Vec<Ring>> = outers.into_iter().map(|outer| vec![outer]).collect();

        for inner in join_rings(inner_segments) {
            let vertex = Point::new(inner[0][0], inner[0][1]);
            match shapes.iter().position(|shape| shape.contains(&vertex)) {
                Some(index) => polygons[index].push(inner),
                None => log::debug!("relation/{}: inner ring outside every outer ring", relation.id),
            }
        }

        if polygons.len() == 1 {
            Some(GeoJsonGeometry::Polygon {
                coordinates: polygons.remove(0),
            })
        } else {
            Some(GeoJsonGeometry::MultiPolygon {
                coordinates: polygons,
            })
        }
    }

    fn relation_feature(&mut self, relation: &OsmElement) -> Option<GeoJsonFeature> {
        let kind = relation.tags.get("type").map(String::as_str);
        if matches!(kind, Some("multipolygon") | Some("boundary")) {
            if let Some(geometry) = self.multipolygon(relation) {
                for member in relation.members.iter().flatten() {
                    if member.member_type == ElementType::Way {
                        self.consumed_ways.insert(member.reference);
                    }
                }
                return Some(self.feature(relation, geometry));
            }
        }

        relation
            .center
            .map(|center| self.feature(relation, GeoJsonGeometry::Point { coordinates: center.position() }))
    }
}

/// Converts an Overpass response into a GeoJSON FeatureCollection
pub fn to_feature_collection(response: &OverpassResponse, flat_properties: bool) -> FeatureCollection {
    let mut converter = Converter::new(&response.elements, flat_properties);

    // Relations go first so their member ways are known before ways are drawn
    let mut relations: FxHashMap<i64, GeoJsonFeature> = response
        .elements
        .iter()
        .filter(|element| element.element_type == ElementType::Relation)
        .filter_map(|relation| {
            converter
                .relation_feature(relation)
                .map(|feature| (relation.id, feature))
        })
        .collect();

    let features = response
        .elements
        .iter()
        .filter_map(|element| match element.element_type {
            ElementType::Node => converter.node_feature(element),
            ElementType::Way => converter.way_feature(element),
            ElementType::Relation => relations.remove(&element.id),
            ElementType::Other => None,
        })
        .collect();

    FeatureCollection::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(body: &str, flat: bool) -> FeatureCollection {
        to_feature_collection(&OverpassResponse::from_str(body).unwrap(), flat)
    }

    #[test]
    fn test_nodes_become_points() {
        let collection = convert(
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": 40.71, "lon": -74.0,
                 "tags": {"amenity": "cafe", "name": "Joe"}}
            ]}"#,
            true,
        );

        assert_eq!(collection.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.id, Some(json!("node/1")));
        assert_eq!(
            feature.geometry,
            Some(GeoJsonGeometry::Point {
                coordinates: [-74.0, 40.71]
            })
        );
        assert_eq!(feature.property("name"), Some(&json!("Joe")));
        assert_eq!(feature.property("id"), Some(&json!("node/1")));
    }

    #[test]
    fn test_plain_way_vertices_are_dropped() {
        let collection = convert(
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": 0.0, "lon": 0.0},
                {"type": "node", "id": 2, "lat": 0.0, "lon": 1.0, "tags": {"created_by": "JOSM"}},
                {"type": "node", "id": 3, "lat": 1.0, "lon": 1.0, "tags": {"highway": "crossing"}},
                {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"highway": "residential"}}
            ]}"#,
            true,
        );

        let ids: Vec<_> = collection
            .features
            .iter()
            .filter_map(|f| f.id.clone())
            .collect();
        assert_eq!(ids, vec![json!("node/3"), json!("way/10")]);
        assert_eq!(
            collection.features[1].geometry,
            Some(GeoJsonGeometry::LineString {
                coordinates: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]
            })
        );
    }

    #[test]
    fn test_closed_area_way_becomes_polygon() {
        let collection = convert(
            r#"{"elements": [
                {"type": "way", "id": 5, "tags": {"building": "yes"},
                 "geometry": [{"lat": 0, "lon": 0}, {"lat": 0, "lon": 1}, {"lat": 1, "lon": 1}, {"lat": 0, "lon": 0}]},
                {"type": "way", "id": 6, "tags": {"highway": "footway"},
                 "geometry": [{"lat": 0, "lon": 0}, {"lat": 0, "lon": 1}, {"lat": 1, "lon": 1}, {"lat": 0, "lon": 0}]}
            ]}"#,
            true,
        );

        assert_eq!(
            collection.features[0].geometry.as_ref().map(|g| g.filter_type()),
            Some("Polygon")
        );
        assert_eq!(
            collection.features[1].geometry.as_ref().map(|g| g.filter_type()),
            Some("LineString")
        );
    }

    #[test]
    fn test_area_tag_rules() {
        let tags = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };

        assert!(is_area(&tags(&[("landuse", "grass")])));
        assert!(is_area(&tags(&[("highway", "pedestrian"), ("area", "yes")])));
        assert!(!is_area(&tags(&[("building", "yes"), ("area", "no")])));
        assert!(is_area(&tags(&[("natural", "water")])));
        assert!(!is_area(&tags(&[("natural", "coastline")])));
        assert!(is_area(&tags(&[("waterway", "riverbank")])));
        assert!(!is_area(&tags(&[("waterway", "river")])));
        assert!(!is_area(&tags(&[("highway", "primary")])));
    }

    #[test]
    fn test_multipolygon_relation_with_hole() {
        let collection = convert(
            r#"{"elements": [
                {"type": "relation", "id": 7, "tags": {"type": "multipolygon", "landuse": "forest"},
                 "members": [
                    {"type": "way", "ref": 1, "role": "outer",
                     "geometry": [{"lat": 0, "lon": 0}, {"lat": 0, "lon": 10}, {"lat": 10, "lon": 10}]},
                    {"type": "way", "ref": 2, "role": "outer",
                     "geometry": [{"lat": 10, "lon": 10}, {"lat": 10, "lon": 0}, {"lat": 0, "lon": 0}]},
                    {"type": "way", "ref": 3, "role": "inner",
                     "geometry": [{"lat": 2, "lon": 2}, {"lat": 2, "lon": 3}, {"lat": 3, "lon": 3}, {"lat": 2, "lon": 2}]}
                 ]}
            ]}"#,
            true,
        );

        assert_eq!(collection.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.id, Some(json!("relation/7")));
        match feature.geometry.as_ref().unwrap() {
            GeoJsonGeometry::Polygon { coordinates } => {
                assert_eq!(coordinates.len(), 2);
                assert_eq!(coordinates[0].len(), 5);
                assert_eq!(coordinates[0].first(), coordinates[0].last());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_properties() {
        let collection = convert(
            r#"{"elements": [
                {"type": "node", "id": 9, "lat": 1, "lon": 2, "version": 3, "user": "mapper",
                 "tags": {"shop": "bakery"}},
                {"type": "relation", "id": 20, "tags": {"type": "route"},
                 "members": [{"type": "node", "ref": 9, "role": "stop"}]}
            ]}"#,
            false,
        );

        assert_eq!(collection.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.property("type"), Some(&json!("node")));
        assert_eq!(feature.property("id"), Some(&json!(9)));
        assert_eq!(feature.property("tags"), Some(&json!({"shop": "bakery"})));
        assert_eq!(
            feature.property("meta"),
            Some(&json!({"version": 3, "user": "mapper"}))
        );
        assert_eq!(
            feature.property("relations"),
            Some(&json!([{"role": "stop", "rel": 20, "reltags": {"type": "route"}}]))
        );
    }

    #[test]
    fn test_center_output() {
        let collection = convert(
            r#"{"elements": [
                {"type": "way", "id": 4, "center": {"lat": 5.5, "lon": 6.5}, "tags": {"amenity": "school"}}
            ]}"#,
            true,
        );
        assert_eq!(
            collection.features[0].geometry,
            Some(GeoJsonGeometry::Point {
                coordinates: [6.5, 5.5]
            })
        );
    }

    #[test]
    fn test_remark_and_bad_body() {
        let response = OverpassResponse::from_str(
            r#"{"elements": [], "remark": "runtime error: Query timed out"}"#,
        )
        .unwrap();
        assert!(response.remark.is_some());

        assert!(OverpassResponse::from_str("<?xml version=\"1.0\"?><osm/>").is_err());
    }
}
