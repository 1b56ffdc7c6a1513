use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::WGS84Coordinate;
use crate::locale::FREQUENCY_BAND_COUNT;

/// How a location is usually reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
  Walking,
  Cycling,
  EBike,
  Tram,
  Bus,
  CarDriver,
  CarPassenger,
  EScooter,
  Train,
  Motorbike,
  Taxi,
  CarSharing,
  BikeSharing,
}

impl TransportMode {
  #[must_use]
  pub fn all() -> &'static [TransportMode] {
    &[
      TransportMode::Walking,
      TransportMode::Cycling,
      TransportMode::EBike,
      TransportMode::Tram,
      TransportMode::Bus,
      TransportMode::CarDriver,
      TransportMode::CarPassenger,
      TransportMode::EScooter,
      TransportMode::Train,
      TransportMode::Motorbike,
      TransportMode::Taxi,
      TransportMode::CarSharing,
      TransportMode::BikeSharing,
    ]
  }
}

/// Opaque POI identifier, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoiId(u64);

impl std::fmt::Display for PoiId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "poi-{}", self.0)
  }
}

/// A confirmed, named point of interest. `id` and `position` are immutable
/// after creation; re-adding at the same spot activates the existing POI
/// instead of moving it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poi {
  pub id: PoiId,
  pub name: String,
  pub position: WGS84Coordinate,
  pub transport_mode: Option<TransportMode>,
  pub frequency_index: usize,
}

impl Poi {
  /// A POI is complete once its transport mode is set; the frequency always
  /// has a default and never blocks completeness.
  #[must_use]
  pub fn is_complete(&self) -> bool {
    self.transport_mode.is_some()
  }
}

/// Collection bounds and completeness policy. The strict default requires
/// every POI to be complete before submission; looser survey variants flip
/// `strict_completeness` off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyPolicy {
  pub min_pois: usize,
  pub max_pois: usize,
  pub strict_completeness: bool,
}

impl Default for SurveyPolicy {
  fn default() -> Self {
    Self {
      min_pois: 3,
      max_pois: 6,
      strict_completeness: true,
    }
  }
}

/// Non-blocking submission status for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
  /// `n` more locations are needed.
  NeedMore(usize),
  /// `n` locations over the maximum.
  TooMany(usize),
  /// `n` locations still lack a transport mode.
  Incomplete(usize),
  Ready,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoiError {
  #[error("the collection already holds the maximum of {max} locations")]
  AtCapacity { max: usize },
  #[error("no POI with id {0}")]
  UnknownId(PoiId),
  #[error("a POI name must not be blank")]
  BlankName,
  #[error("frequency index {index} is out of range")]
  FrequencyOutOfRange { index: usize },
}

/// Result of a manual click-add: either a new POI or activation of an
/// existing one within proximity tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAdd {
  Added(PoiId),
  Activated(PoiId),
}

/// The validated POI aggregate: insertion-ordered, with at most one active
/// (focused) entry and policy-governed submission readiness. Invariant
/// violations reject the mutation and leave the collection unchanged.
#[derive(Debug)]
pub struct PoiCollection {
  pois: Vec<Poi>,
  active: Option<PoiId>,
  next_id: u64,
  policy: SurveyPolicy,
}

impl Default for PoiCollection {
  fn default() -> Self {
    Self::new(SurveyPolicy::default())
  }
}

impl PoiCollection {
  #[must_use]
  pub fn new(policy: SurveyPolicy) -> Self {
    Self {
      pois: Vec::new(),
      active: None,
      next_id: 0,
      policy,
    }
  }

  #[must_use]
  pub fn policy(&self) -> SurveyPolicy {
    self.policy
  }

  fn mint(&mut self, name: String, position: WGS84Coordinate) -> PoiId {
    self.next_id += 1;
    let id = PoiId(self.next_id);
    self.pois.push(Poi {
      id,
      name,
      position,
      transport_mode: None,
      frequency_index: 0,
    });
    id
  }

  /// Add a search- or hint-originated POI. Not deduplicated by position: a
  /// user may deliberately add a second POI near an existing one from
  /// search. The new POI becomes active.
  pub fn add(&mut self, name: &str, position: WGS84Coordinate) -> Result<PoiId, PoiError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(PoiError::BlankName);
    }
    if self.pois.len() >= self.policy.max_pois {
      return Err(PoiError::AtCapacity {
        max: self.policy.max_pois,
      });
    }
    let id = self.mint(name.to_string(), position);
    self.active = Some(id);
    Ok(id)
  }

  /// Add from a manual click. A click within proximity tolerance of an
  /// existing POI activates it instead of creating a near-duplicate.
  pub fn add_click(
    &mut self,
    name: &str,
    position: WGS84Coordinate,
  ) -> Result<ClickAdd, PoiError> {
    if let Some(existing) = self.find_near(position) {
      let id = existing.id;
      self.active = Some(id);
      return Ok(ClickAdd::Activated(id));
    }
    self.add(name, position).map(ClickAdd::Added)
  }

  /// Append a confirmed pending batch in one step, in input order. The
  /// batch is applied as a whole even if it pushes the collection past the
  /// maximum; `readiness` then reports the overshoot until the user prunes.
  /// The last appended POI becomes active.
  pub fn add_batch(
    &mut self,
    items: impl IntoIterator<Item = (String, WGS84Coordinate)>,
  ) -> Vec<PoiId> {
    let ids: Vec<PoiId> = items
      .into_iter()
      .map(|(name, position)| self.mint(name, position))
      .collect();
    if let Some(last) = ids.last() {
      self.active = Some(*last);
    }
    ids
  }

  /// Remove a POI. Removing the active one clears the active focus.
  pub fn remove(&mut self, id: PoiId) -> bool {
    let before = self.pois.len();
    self.pois.retain(|p| p.id != id);
    let removed = self.pois.len() < before;
    if removed && self.active == Some(id) {
      self.active = None;
    }
    removed
  }

  /// Focus a POI for editing, or clear the focus with `None`. At most one
  /// POI is active at a time.
  pub fn set_active(&mut self, id: Option<PoiId>) -> bool {
    match id {
      Some(id) if self.get(id).is_none() => false,
      other => {
        self.active = other;
        true
      }
    }
  }

  pub fn rename(&mut self, id: PoiId, new_name: &str) -> Result<(), PoiError> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
      return Err(PoiError::BlankName);
    }
    let poi = self.get_mut(id)?;
    poi.name = new_name.to_string();
    Ok(())
  }

  pub fn update_transport_mode(
    &mut self,
    id: PoiId,
    mode: Option<TransportMode>,
  ) -> Result<(), PoiError> {
    self.get_mut(id)?.transport_mode = mode;
    Ok(())
  }

  pub fn update_frequency(&mut self, id: PoiId, index: usize) -> Result<(), PoiError> {
    if index >= FREQUENCY_BAND_COUNT {
      return Err(PoiError::FrequencyOutOfRange { index });
    }
    self.get_mut(id)?.frequency_index = index;
    Ok(())
  }

  pub fn clear_all(&mut self) {
    self.pois.clear();
    self.active = None;
  }

  #[must_use]
  pub fn get(&self, id: PoiId) -> Option<&Poi> {
    self.pois.iter().find(|p| p.id == id)
  }

  fn get_mut(&mut self, id: PoiId) -> Result<&mut Poi, PoiError> {
    self
      .pois
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or(PoiError::UnknownId(id))
  }

  /// The first POI within proximity tolerance of `position`, if any.
  #[must_use]
  pub fn find_near(&self, position: WGS84Coordinate) -> Option<&Poi> {
    self.pois.iter().find(|p| p.position.within_tolerance(&position))
  }

  #[must_use]
  pub fn active(&self) -> Option<PoiId> {
    self.active
  }

  #[must_use]
  pub fn active_poi(&self) -> Option<&Poi> {
    self.active.and_then(|id| self.get(id))
  }

  #[must_use]
  pub fn pois(&self) -> &[Poi] {
    &self.pois
  }

  pub fn iter(&self) -> impl Iterator<Item = &Poi> {
    self.pois.iter()
  }

  #[must_use]
  pub fn count(&self) -> usize {
    self.pois.len()
  }

  #[must_use]
  pub fn completed_count(&self) -> usize {
    self.pois.iter().filter(|p| p.is_complete()).count()
  }

  #[must_use]
  pub fn is_submittable(&self) -> bool {
    matches!(self.readiness(), Readiness::Ready)
  }

  #[must_use]
  pub fn readiness(&self) -> Readiness {
    let count = self.count();
    if count < self.policy.min_pois {
      Readiness::NeedMore(self.policy.min_pois - count)
    } else if count > self.policy.max_pois {
      Readiness::TooMany(count - self.policy.max_pois)
    } else if self.policy.strict_completeness && self.completed_count() < count {
      Readiness::Incomplete(count - self.completed_count())
    } else {
      Readiness::Ready
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  fn pos(lat: f32, lon: f32) -> WGS84Coordinate {
    WGS84Coordinate::new(lat, lon)
  }

  #[allow(clippy::cast_precision_loss)]
  fn filled(n: usize) -> PoiCollection {
    let mut c = PoiCollection::default();
    let ids = c.add_batch(
      (0..n).map(|i| (format!("Place {i}"), pos(52.0 + i as f32 * 0.01, 11.6))),
    );
    for id in ids {
      c.update_transport_mode(id, Some(TransportMode::Cycling)).unwrap();
    }
    c
  }

  #[rstest]
  #[case(0, false)]
  #[case(1, false)]
  #[case(2, false)]
  #[case(3, true)]
  #[case(4, true)]
  #[case(6, true)]
  #[case(7, false)]
  fn submittable_only_between_min_and_max(#[case] n: usize, #[case] expected: bool) {
    assert_eq!(filled(n).is_submittable(), expected, "{n} complete POIs");
  }

  #[test]
  fn readiness_reports_the_gap() {
    assert_eq!(filled(1).readiness(), Readiness::NeedMore(2));
    assert_eq!(filled(7).readiness(), Readiness::TooMany(1));
    assert_eq!(filled(4).readiness(), Readiness::Ready);
  }

  #[test]
  fn strictness_gates_on_completeness() {
    let mut c = filled(3);
    let id = c.pois()[0].id;
    c.update_transport_mode(id, None).unwrap();
    assert_eq!(c.readiness(), Readiness::Incomplete(1));
    assert!(!c.is_submittable());

    let mut loose = PoiCollection::new(SurveyPolicy {
      strict_completeness: false,
      ..SurveyPolicy::default()
    });
    loose.add_batch((0..3).map(|i| (format!("P{i}"), pos(52.0, 11.6))));
    assert!(loose.is_submittable());
  }

  #[test]
  fn single_active_poi() {
    let mut c = PoiCollection::default();
    let a = c.add("A", pos(52.10, 11.60)).unwrap();
    let b = c.add("B", pos(52.20, 11.70)).unwrap();
    // The most recently added POI is active.
    assert_eq!(c.active(), Some(b));
    assert!(c.set_active(Some(a)));
    assert_eq!(c.active(), Some(a));
    assert!(c.set_active(Some(b)));
    assert_eq!(c.active(), Some(b));
    // Removing the active POI clears the focus.
    assert!(c.remove(b));
    assert_eq!(c.active(), None);
    // Unknown ids are rejected without clearing the current focus.
    c.set_active(Some(a));
    assert!(!c.set_active(Some(b)));
    assert_eq!(c.active(), Some(a));
  }

  #[test]
  fn click_add_activates_existing_within_tolerance() {
    let mut c = PoiCollection::default();
    let a = c.add("Campus", pos(52.1400, 11.6400)).unwrap();
    c.set_active(None);

    let outcome = c.add_click("Campus again", pos(52.1402, 11.6401)).unwrap();
    assert_eq!(outcome, ClickAdd::Activated(a));
    assert_eq!(c.count(), 1);
    assert_eq!(c.active(), Some(a));

    let outcome = c.add_click("Nordpark", pos(52.15, 11.63)).unwrap();
    assert!(matches!(outcome, ClickAdd::Added(_)));
    assert_eq!(c.count(), 2);
  }

  #[test]
  fn search_adds_are_not_position_deduplicated() {
    let mut c = PoiCollection::default();
    c.add("Edeka", pos(52.14, 11.64)).unwrap();
    c.add("Kiosk next door", pos(52.1401, 11.6401)).unwrap();
    assert_eq!(c.count(), 2);
  }

  #[test]
  fn capacity_is_enforced_for_single_adds() {
    let mut c = filled(6);
    assert_eq!(
      c.add("One too many", pos(52.5, 11.9)),
      Err(PoiError::AtCapacity { max: 6 })
    );
    assert_eq!(c.count(), 6);
    // A confirmed batch may transiently overshoot.
    c.add_batch(vec![("Batch".to_string(), pos(52.6, 11.9))]);
    assert_eq!(c.count(), 7);
    assert_eq!(c.readiness(), Readiness::TooMany(1));
  }

  #[test]
  fn rename_rejects_blank_names() {
    let mut c = PoiCollection::default();
    let id = c.add("Edeka", pos(52.14, 11.64)).unwrap();
    assert_eq!(c.rename(id, "   "), Err(PoiError::BlankName));
    assert_eq!(c.get(id).unwrap().name, "Edeka");
    c.rename(id, " Edeka City ").unwrap();
    assert_eq!(c.get(id).unwrap().name, "Edeka City");
  }

  #[test]
  fn frequency_index_is_validated() {
    let mut c = PoiCollection::default();
    let id = c.add("Edeka", pos(52.14, 11.64)).unwrap();
    assert_eq!(c.get(id).unwrap().frequency_index, 0);
    c.update_frequency(id, 3).unwrap();
    assert_eq!(c.get(id).unwrap().frequency_index, 3);
    assert_eq!(
      c.update_frequency(id, 4),
      Err(PoiError::FrequencyOutOfRange { index: 4 })
    );
    assert_eq!(c.get(id).unwrap().frequency_index, 3);
  }

  #[test]
  fn clear_all_resets_everything() {
    let mut c = filled(4);
    assert!(c.active().is_some());
    c.clear_all();
    assert_eq!(c.count(), 0);
    assert_eq!(c.active(), None);
    assert!(!c.is_submittable());
  }
}
