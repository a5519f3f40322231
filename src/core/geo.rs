use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// GeoJSON position order (`[lng, lat]`)
    pub fn to_position(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Parses `"south,west,north,east"`, the same order Overpass uses
    pub fn parse(input: &str) -> crate::Result<Self> {
        let parts = input
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| crate::Error::ParseError(format!("invalid bounding box '{}': {}", input, e)))?;

        match parts.as_slice() {
            [south, west, north, east] => {
                let bounds = Self::from_coords(*south, *west, *north, *east);
                if !bounds.south_west.is_valid() || !bounds.north_east.is_valid() {
                    return Err(crate::Error::ParseError(format!(
                        "bounding box '{}' is outside [-90,90] x [-180,180]",
                        input
                    )));
                }
                Ok(bounds)
            }
            _ => Err(crate::Error::ParseError(format!(
                "bounding box '{}' needs exactly four values",
                input
            ))),
        }
    }

    /// Overpass bbox literal: `swLat,swLng,neLat,neLng`.
    ///
    /// Numbers use their shortest round-trip form, so `40.70` renders as `40.7`.
    pub fn to_overpass_bbox(&self) -> String {
        [
            self.south_west.lat,
            self.south_west.lng,
            self.north_east.lat,
            self.north_east.lng,
        ]
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
    }
}

impl Default for LatLngBounds {
    fn default() -> Self {
        Self::from_coords(-90.0, -180.0, 90.0, 180.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_creation() {
        let coord = LatLng::new(40.7128, -74.0060);
        assert_eq!(coord.lat, 40.7128);
        assert_eq!(coord.lng, -74.0060);
        assert!(coord.is_valid());
        assert_eq!(coord.to_position(), [-74.0060, 40.7128]);
    }

    #[test]
    fn test_overpass_bbox_order() {
        let bounds = LatLngBounds::from_coords(40.705, -74.01, 40.72, -73.99);
        assert_eq!(bounds.to_overpass_bbox(), "40.705,-74.01,40.72,-73.99");
    }

    #[test]
    fn test_parse_bounds() {
        let bounds = LatLngBounds::parse("1.5, 2, 3, 4.25").unwrap();
        assert_eq!(bounds, LatLngBounds::from_coords(1.5, 2.0, 3.0, 4.25));

        assert!(LatLngBounds::parse("1,2,3").is_err());
        assert!(LatLngBounds::parse("a,b,c,d").is_err());
        assert!(LatLngBounds::parse("91,0,92,1").is_err());
        assert!(LatLngBounds::parse("0,-181,1,0").is_err());
    }
}
