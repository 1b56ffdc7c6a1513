use std::sync::Arc;
use std::time::Duration;

use crate::geo::WGS84Coordinate;
use crate::locale::{Language, point_placeholder};
use crate::search::GeocodeProvider;

/// Delay between dispatching consecutive batch lookups. Exists only to
/// respect the upstream rate limit; correctness does not depend on it.
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(250);

/// Resolves coordinates to display names. Never fails: any error or empty
/// response degrades to a localized placeholder so a POI always ends up
/// named.
pub struct ReverseResolver {
  geocoder: Arc<dyn GeocodeProvider>,
  language: Language,
  stagger: Duration,
}

impl ReverseResolver {
  #[must_use]
  pub fn new(geocoder: Arc<dyn GeocodeProvider>, language: Language) -> Self {
    Self {
      geocoder,
      language,
      stagger: DEFAULT_STAGGER,
    }
  }

  /// Override the dispatch stagger (tests use zero).
  #[must_use]
  pub fn with_stagger(mut self, stagger: Duration) -> Self {
    self.stagger = stagger;
    self
  }

  /// Resolve one coordinate. `fallback_index` is the 1-based position used
  /// in the placeholder name when the lookup yields nothing.
  pub async fn resolve(&self, position: WGS84Coordinate, fallback_index: usize) -> String {
    match self.geocoder.reverse(position).await {
      Ok(Some(address)) => address
        .best_label()
        .unwrap_or_else(|| point_placeholder(self.language, fallback_index)),
      Ok(None) => point_placeholder(self.language, fallback_index),
      Err(e) => {
        log::warn!("reverse lookup for {position} failed: {e}");
        point_placeholder(self.language, fallback_index)
      }
    }
  }

  /// Resolve a batch of coordinates concurrently. Dispatch is staggered by
  /// index to respect the upstream rate limit, but the output order is
  /// always the input order regardless of completion order.
  pub async fn resolve_batch(&self, positions: &[WGS84Coordinate]) -> Vec<String> {
    let mut tasks = tokio::task::JoinSet::new();
    for (index, position) in positions.iter().copied().enumerate() {
      let geocoder = Arc::clone(&self.geocoder);
      let language = self.language;
      let delay = self.stagger * u32::try_from(index).unwrap_or(u32::MAX);
      tasks.spawn(async move {
        tokio::time::sleep(delay).await;
        let name = match geocoder.reverse(position).await {
          Ok(Some(address)) => address.best_label(),
          Ok(None) => None,
          Err(e) => {
            log::warn!("reverse lookup for {position} failed: {e}");
            None
          }
        };
        (
          index,
          name.unwrap_or_else(|| point_placeholder(language, index + 1)),
        )
      });
    }

    let mut names: Vec<String> = (1..=positions.len())
      .map(|n| point_placeholder(self.language, n))
      .collect();
    while let Some(joined) = tasks.join_next().await {
      if let Ok((index, name)) = joined {
        names[index] = name;
      }
    }
    names
  }
}
