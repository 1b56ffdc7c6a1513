use serde::{Deserialize, Serialize};

/// Two coordinates closer than this on both axes are treated as the same
/// spot (roughly 50 m at mid-latitudes).
pub const PROXIMITY_TOLERANCE_DEG: f32 = 0.0005;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f32,
  #[serde(alias = "longitude")]
  pub lon: f32,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f32, lon: f32) -> Self {
    Self { lat, lon }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    -90.0 < self.lat && self.lat < 90.0 && -180.0 < self.lon && self.lon < 180.0
  }

  /// Whether `other` lies within the proximity tolerance on both axes.
  #[must_use]
  pub fn within_tolerance(&self, other: &Self) -> bool {
    (self.lat - other.lat).abs() < PROXIMITY_TOLERANCE_DEG
      && (self.lon - other.lon).abs() < PROXIMITY_TOLERANCE_DEG
  }
}

impl std::fmt::Display for WGS84Coordinate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:.4}, {:.4}", self.lat, self.lon)
  }
}

#[must_use]
pub fn distance_in_meters(coord1: WGS84Coordinate, coord2: WGS84Coordinate) -> f32 {
  let d_lat = (coord2.lat - coord1.lat).to_radians();
  let d_lon = (coord2.lon - coord1.lon).to_radians();
  let a = f32::sin(d_lat / 2.0) * f32::sin(d_lat / 2.0)
    + f32::cos(coord1.lat.to_radians())
      * f32::cos(coord2.lat.to_radians())
      * f32::sin(d_lon / 2.0)
      * f32::sin(d_lon / 2.0);
  let c = 2.0 * f32::atan2(a.sqrt(), (1.0 - a).sqrt());
  6_371_000.0 * c
}

/// An axis-aligned geographic bounding box.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
  pub min_lat: f32,
  pub max_lat: f32,
  pub min_lon: f32,
  pub max_lon: f32,
}

impl BoundingBox {
  #[must_use]
  pub fn new(min_lat: f32, min_lon: f32, max_lat: f32, max_lon: f32) -> Self {
    Self {
      min_lat,
      max_lat,
      min_lon,
      max_lon,
    }
  }

  #[must_use]
  pub fn contains(&self, coord: WGS84Coordinate) -> bool {
    (self.min_lat..=self.max_lat).contains(&coord.lat)
      && (self.min_lon..=self.max_lon).contains(&coord.lon)
  }

  #[must_use]
  pub fn center(&self) -> WGS84Coordinate {
    WGS84Coordinate {
      lat: f32::midpoint(self.min_lat, self.max_lat),
      lon: f32::midpoint(self.min_lon, self.max_lon),
    }
  }

  /// Nominatim `viewbox` parameter: `left,top,right,bottom`.
  #[must_use]
  pub fn viewbox_param(&self) -> String {
    format!(
      "{},{},{},{}",
      self.min_lon, self.max_lat, self.max_lon, self.min_lat
    )
  }

  /// Overpass bbox filter: `south,west,north,east`.
  #[must_use]
  pub fn overpass_param(&self) -> String {
    format!(
      "{},{},{},{}",
      self.min_lat, self.min_lon, self.max_lat, self.max_lon
    )
  }
}
