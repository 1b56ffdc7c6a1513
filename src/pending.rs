use crate::geo::WGS84Coordinate;
use crate::poi::{PoiCollection, PoiId};
use crate::resolve::ReverseResolver;

/// Unconfirmed map clicks accumulated before being committed as POIs.
/// Markers have no identity beyond their position; a second click within
/// proximity tolerance removes the first (set-toggle, not an append log).
#[derive(Debug, Default)]
pub struct PendingMarkerBatch {
  markers: Vec<WGS84Coordinate>,
}

impl PendingMarkerBatch {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Toggle a marker at `position`: remove the existing marker within
  /// tolerance, or append a new one.
  pub fn toggle(&mut self, position: WGS84Coordinate) {
    if let Some(index) = self
      .markers
      .iter()
      .position(|m| m.within_tolerance(&position))
    {
      self.markers.remove(index);
      log::debug!("pending marker near {position} toggled off");
    } else {
      self.markers.push(position);
      log::debug!("pending marker added at {position}");
    }
  }

  /// Resolve every pending marker to a name and append the whole batch to
  /// `pois` in input order. Nothing is appended until all resolutions have
  /// settled (success or placeholder fallback), so an interleaved
  /// `discard_all` can never observe a half-applied batch. The batch is
  /// cleared afterwards and the last appended POI becomes active.
  pub async fn confirm_all(
    &mut self,
    resolver: &ReverseResolver,
    pois: &mut PoiCollection,
  ) -> Vec<PoiId> {
    if self.markers.is_empty() {
      return Vec::new();
    }
    let names = resolver.resolve_batch(&self.markers).await;
    let ids = pois.add_batch(names.into_iter().zip(self.markers.iter().copied()));
    self.markers.clear();
    log::info!("confirmed {} pending markers", ids.len());
    ids
  }

  /// Drop all pending markers without touching the POI collection.
  pub fn discard_all(&mut self) {
    self.markers.clear();
  }

  #[must_use]
  pub fn markers(&self) -> &[WGS84Coordinate] {
    &self.markers
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.markers.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.markers.is_empty()
  }
}
