pub mod cache;
pub mod coordinator;
pub mod providers;

use crate::geo::{BoundingBox, WGS84Coordinate};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Which path a search result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchSource {
  /// Structured place search.
  Geocode,
  /// AI grounding suggestion, resolved to coordinates afterwards.
  Grounding,
  /// Direct coordinate input, no network involved.
  Coordinate,
}

/// A candidate place returned by the search pipeline. Ephemeral; selecting
/// one turns it into a POI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
  pub name: String,
  pub position: WGS84Coordinate,
  pub place_id: Option<u64>,
  pub category: Option<String>,
  pub kind: Option<String>,
  pub source: SearchSource,
}

impl SearchResult {
  /// Key used to collapse the same place reported by both providers:
  /// provider-assigned id when present, normalized display name otherwise.
  #[must_use]
  pub fn dedup_key(&self) -> String {
    match self.place_id {
      Some(id) => format!("id:{id}"),
      None => format!("name:{}", self.name.trim().to_lowercase()),
    }
  }

  /// The leading segment of a comma-separated display name.
  #[must_use]
  pub fn short_name(&self) -> &str {
    self.name.split(',').next().unwrap_or(&self.name).trim()
  }
}

impl Display for SearchResult {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.name, self.position)
  }
}

/// Structured address fields from a reverse lookup, most specific first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReverseAddress {
  pub display_name: Option<String>,
  pub amenity: Option<String>,
  pub shop: Option<String>,
  pub tourism: Option<String>,
  pub road: Option<String>,
}

impl ReverseAddress {
  /// Most specific available label: amenity/shop/tourism tag, then road,
  /// then the first segment of the raw display name.
  #[must_use]
  pub fn best_label(&self) -> Option<String> {
    self
      .amenity
      .clone()
      .or_else(|| self.shop.clone())
      .or_else(|| self.tourism.clone())
      .or_else(|| self.road.clone())
      .or_else(|| {
        self
          .display_name
          .as_ref()
          .and_then(|n| n.split(',').next())
          .map(|s| s.trim().to_string())
      })
      .filter(|l| !l.is_empty())
  }
}

/// Structured text → place search plus reverse geocoding.
#[async_trait::async_trait]
pub trait GeocodeProvider: Send + Sync {
  /// Human-readable name of the provider.
  fn name(&self) -> &str;

  /// Search for places matching `query`, biased to `viewbox`.
  async fn search(
    &self,
    query: &str,
    viewbox: &BoundingBox,
    limit: usize,
  ) -> Result<Vec<SearchResult>>;

  /// Reverse geocode a coordinate.
  async fn reverse(&self, position: WGS84Coordinate) -> Result<Option<ReverseAddress>>;
}

/// Generative place-name suggestions near a bias point. Returns bare names
/// that still need geocoding.
#[async_trait::async_trait]
pub trait GroundingProvider: Send + Sync {
  fn name(&self) -> &str;

  async fn suggest(
    &self,
    query: &str,
    bias: WGS84Coordinate,
    max_results: usize,
  ) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(name: &str, place_id: Option<u64>) -> SearchResult {
    SearchResult {
      name: name.to_string(),
      position: WGS84Coordinate::new(52.14, 11.64),
      place_id,
      category: None,
      kind: None,
      source: SearchSource::Geocode,
    }
  }

  #[test]
  fn dedup_key_prefers_place_id() {
    assert_eq!(result("Edeka Nord", Some(42)).dedup_key(), "id:42");
    assert_eq!(result("Edeka Nord", None).dedup_key(), "name:edeka nord");
    assert_eq!(result("  EDEKA Nord ", None).dedup_key(), "name:edeka nord");
  }

  #[test]
  fn best_label_fallback_order() {
    let mut addr = ReverseAddress {
      display_name: Some("Listemannstraße 4, Magdeburg, Germany".to_string()),
      amenity: None,
      shop: Some("Edeka".to_string()),
      tourism: None,
      road: Some("Listemannstraße".to_string()),
    };
    assert_eq!(addr.best_label().as_deref(), Some("Edeka"));
    addr.shop = None;
    assert_eq!(addr.best_label().as_deref(), Some("Listemannstraße"));
    addr.road = None;
    assert_eq!(addr.best_label().as_deref(), Some("Listemannstraße 4"));
    addr.display_name = None;
    assert_eq!(addr.best_label(), None);
  }

  #[test]
  fn short_name_takes_first_segment() {
    let r = result("Edeka City, Breiter Weg, Magdeburg", None);
    assert_eq!(r.short_name(), "Edeka City");
  }
}
