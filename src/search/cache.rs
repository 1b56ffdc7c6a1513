use std::collections::HashMap;

use super::SearchResult;

/// Normalized cache key for a query: trimmed and lowercased.
#[must_use]
pub fn normalize_query(query: &str) -> String {
  query.trim().to_lowercase()
}

/// Session-scoped memo of search results keyed by normalized query text.
/// Entries are never invalidated; the query space of a single survey
/// session is small. The coordinator serializes writes.
#[derive(Debug, Default)]
pub struct SearchCache {
  entries: HashMap<String, Vec<SearchResult>>,
}

impl SearchCache {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn get(&self, normalized: &str) -> Option<Vec<SearchResult>> {
    self.entries.get(normalized).cloned()
  }

  pub fn insert(&mut self, normalized: String, results: Vec<SearchResult>) {
    self.entries.insert(normalized, results);
  }

  #[must_use]
  pub fn contains(&self, normalized: &str) -> bool {
    self.entries.contains_key(normalized)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geo::WGS84Coordinate;
  use crate::search::SearchSource;

  #[test]
  fn normalization_trims_and_lowercases() {
    assert_eq!(normalize_query("  Edeka City "), "edeka city");
  }

  #[test]
  fn insert_then_get_round_trips() {
    let mut cache = SearchCache::new();
    assert!(cache.get("edeka").is_none());
    cache.insert(
      "edeka".to_string(),
      vec![SearchResult {
        name: "Edeka Nord".to_string(),
        position: WGS84Coordinate::new(52.14, 11.62),
        place_id: Some(1),
        category: None,
        kind: None,
        source: SearchSource::Geocode,
      }],
    );
    let hit = cache.get("edeka").unwrap();
    assert_eq!(hit.len(), 1);
    assert_eq!(hit[0].name, "Edeka Nord");
    assert_eq!(cache.len(), 1);
  }
}
