use crate::core::geo::{LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

impl GeoJsonGeometry {
    /// Name used by style filters (`$type`): Point, LineString or Polygon
    pub fn filter_type(&self) -> &'static str {
        match self {
            GeoJsonGeometry::Point { .. } | GeoJsonGeometry::MultiPoint { .. } => "Point",
            GeoJsonGeometry::LineString { .. } | GeoJsonGeometry::MultiLineString { .. } => {
                "LineString"
            }
            GeoJsonGeometry::Polygon { .. } | GeoJsonGeometry::MultiPolygon { .. } => "Polygon",
            GeoJsonGeometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    fn extend_bounds(&self, bounds: &mut Option<LatLngBounds>) {
        let mut push = |position: &[f64; 2]| {
            let point = LatLng::new(position[1], position[0]);
            match bounds {
                Some(b) => {
                    b.south_west.lat = b.south_west.lat.min(point.lat);
                    b.south_west.lng = b.south_west.lng.min(point.lng);
                    b.north_east.lat = b.north_east.lat.max(point.lat);
                    b.north_east.lng = b.north_east.lng.max(point.lng);
                }
                None => *bounds = Some(LatLngBounds::new(point, point)),
            }
        };

        match self {
            GeoJsonGeometry::Point { coordinates } => push(coordinates),
            GeoJsonGeometry::LineString { coordinates }
            | GeoJsonGeometry::MultiPoint { coordinates } => coordinates.iter().for_each(push),
            GeoJsonGeometry::Polygon { coordinates }
            | GeoJsonGeometry::MultiLineString { coordinates } => {
                coordinates.iter().flatten().for_each(push)
            }
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(push)
            }
            GeoJsonGeometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.extend_bounds(bounds);
                }
            }
        }
    }
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct GeoJsonFeature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl GeoJsonFeature {
    pub fn new(geometry: GeoJsonGeometry) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Looks up a single property value
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }
}

/// The payload of a GeoJSON source: always replaced wholesale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<GeoJsonFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<GeoJsonFeature>) -> Self {
        Self { features }
    }

    /// `{"type": "FeatureCollection", "features": []}`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Parses a FeatureCollection from a raw JSON string
    pub fn from_str(geojson_str: &str) -> crate::Result<Self> {
        serde_json::from_str(geojson_str)
            .map_err(|e| crate::Error::ParseError(format!("Invalid GeoJSON: {}", e)))
    }

    /// Converts into the JSON value stored as a source's `data`
    pub fn to_value(&self) -> crate::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Gets the bounding box of all features
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut bounds = None;
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            geometry.extend_bounds(&mut bounds);
        }
        bounds
    }
}
