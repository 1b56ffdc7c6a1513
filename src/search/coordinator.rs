use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use itertools::Itertools;

use super::cache::{SearchCache, normalize_query};
use super::providers::CoordinateParser;
use super::{GeocodeProvider, GroundingProvider, SearchResult, SearchSource};
use crate::geo::{BoundingBox, WGS84Coordinate};

/// Queries shorter than this (after trimming) are not searched.
pub const MIN_QUERY_LEN: usize = 3;
const GEOCODE_LIMIT: usize = 6;
const GROUNDING_MAX: usize = 3;

/// Geographic bias applied to every query of a session.
#[derive(Debug, Clone)]
pub struct SearchBias {
  pub viewbox: BoundingBox,
  pub center: WGS84Coordinate,
  /// Appended to queries that do not already mention it, for geocoding
  /// precision.
  pub locality: String,
}

/// Outcome of one coordinator invocation.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
  /// Query was below the minimum length; nothing was done.
  TooShort,
  /// The merged, deduplicated result list.
  Results(Vec<SearchResult>),
  /// A newer search was issued while this one was in flight; its partial
  /// results were dropped and nothing was cached.
  Superseded,
}

/// Orchestrates the geocode and grounding providers for one session.
///
/// All mutable state (cache, generation counter) is owned here; the
/// coordinator is constructed once per session and dropped with it.
/// Supersession is cooperative: each invocation claims a generation and
/// re-checks it after every await point before touching shared state.
pub struct SearchCoordinator {
  geocoder: Arc<dyn GeocodeProvider>,
  grounding: Arc<dyn GroundingProvider>,
  bias: SearchBias,
  cache: Mutex<SearchCache>,
  generation: AtomicU64,
  coordinate_parser: CoordinateParser,
}

impl SearchCoordinator {
  #[must_use]
  pub fn new(
    geocoder: Arc<dyn GeocodeProvider>,
    grounding: Arc<dyn GroundingProvider>,
    bias: SearchBias,
  ) -> Self {
    Self {
      geocoder,
      grounding,
      bias,
      cache: Mutex::new(SearchCache::new()),
      generation: AtomicU64::new(0),
      coordinate_parser: CoordinateParser::new(),
    }
  }

  fn is_current(&self, generation: u64) -> bool {
    self.generation.load(Ordering::SeqCst) == generation
  }

  /// Append the locality suffix unless the query already mentions it.
  fn refine(&self, raw: &str) -> String {
    if raw.to_lowercase().contains(&self.bias.locality.to_lowercase()) {
      raw.to_string()
    } else {
      format!("{raw}, {}", self.bias.locality)
    }
  }

  #[must_use]
  pub fn is_cached(&self, query: &str) -> bool {
    self.cache.lock().unwrap().contains(&normalize_query(query))
  }

  /// Run one search. Issuing a new search while a previous one is in
  /// flight supersedes it: the older invocation returns
  /// [`SearchOutcome::Superseded`] and never writes the cache.
  pub async fn search(&self, query: &str) -> SearchOutcome {
    let raw = query.trim();
    if raw.chars().count() < MIN_QUERY_LEN {
      return SearchOutcome::TooShort;
    }

    // Direct coordinate input needs neither cache nor network.
    if let Some(result) = self.coordinate_parser.parse(raw, &self.bias.viewbox) {
      log::info!("parsed coordinate input '{raw}' -> {}", result.position);
      return SearchOutcome::Results(vec![result]);
    }

    let key = normalize_query(raw);
    if let Some(hit) = self.cache.lock().unwrap().get(&key) {
      log::debug!("cache hit for '{key}' ({} results)", hit.len());
      return SearchOutcome::Results(hit);
    }

    let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
    let refined = self.refine(raw);
    log::debug!("searching '{refined}' (generation {my_generation})");

    let geocode_fut = async {
      match self
        .geocoder
        .search(&refined, &self.bias.viewbox, GEOCODE_LIMIT)
        .await
      {
        Ok(results) => results,
        Err(e) => {
          log::warn!("geocode provider '{}' failed: {e}", self.geocoder.name());
          Vec::new()
        }
      }
    };
    let grounding_fut = async {
      match self
        .grounding
        .suggest(raw, self.bias.center, GROUNDING_MAX)
        .await
      {
        Ok(names) => names,
        Err(e) => {
          log::warn!(
            "grounding provider '{}' failed: {e}",
            self.grounding.name()
          );
          Vec::new()
        }
      }
    };
    let (geocode_results, suggested_names) = tokio::join!(geocode_fut, grounding_fut);

    if !self.is_current(my_generation) {
      log::debug!("search '{key}' superseded after provider round");
      return SearchOutcome::Superseded;
    }

    let grounded = self.resolve_names(suggested_names).await;

    if !self.is_current(my_generation) {
      log::debug!("search '{key}' superseded during name resolution");
      return SearchOutcome::Superseded;
    }

    // Grounding-derived results come first; first occurrence wins the
    // dedup so a place reported by both providers keeps the AI tag.
    let merged: Vec<SearchResult> = grounded
      .into_iter()
      .chain(geocode_results)
      .unique_by(SearchResult::dedup_key)
      .collect();

    {
      let mut cache = self.cache.lock().unwrap();
      if !self.is_current(my_generation) {
        return SearchOutcome::Superseded;
      }
      cache.insert(key.clone(), merged.clone());
    }

    log::debug!("search '{key}' completed with {} results", merged.len());
    SearchOutcome::Results(merged)
  }

  /// Geocode each suggested name independently (limit 1); failures are
  /// treated as "no result for this name".
  async fn resolve_names(&self, names: Vec<String>) -> Vec<SearchResult> {
    let mut tasks = tokio::task::JoinSet::new();
    for (index, name) in names.into_iter().enumerate() {
      let geocoder = Arc::clone(&self.geocoder);
      let viewbox = self.bias.viewbox;
      let query = self.refine(&name);
      tasks.spawn(async move {
        let resolved = match geocoder.search(&query, &viewbox, 1).await {
          Ok(mut results) if !results.is_empty() => Some(results.swap_remove(0)),
          Ok(_) => None,
          Err(e) => {
            log::debug!("grounded name '{query}' did not geocode: {e}");
            None
          }
        };
        (index, resolved)
      });
    }

    let mut slots: Vec<Option<SearchResult>> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
      if let Ok((index, resolved)) = joined {
        if slots.len() <= index {
          slots.resize(index + 1, None);
        }
        slots[index] = resolved.map(|mut r| {
          r.source = SearchSource::Grounding;
          r
        });
      }
    }
    slots.into_iter().flatten().collect()
  }
}
