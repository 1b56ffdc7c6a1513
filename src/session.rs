use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::geo::{BoundingBox, WGS84Coordinate};
use crate::locale::{
  Language, frequency_label, summary_footer, summary_line, summary_no_transport, summary_prefix,
  transport_label,
};
use crate::pending::PendingMarkerBatch;
use crate::poi::{PoiCollection, PoiError, PoiId};
use crate::resolve::ReverseResolver;
use crate::search::coordinator::{SearchBias, SearchCoordinator, SearchOutcome};
use crate::search::providers::{GeminiProvider, NominatimProvider};
use crate::search::{GeocodeProvider, GroundingProvider, SearchResult};
use crate::viewport::{AreaProvider, FetchOutcome, OverpassProvider, PoiHint, ViewportPoiFetcher};

/// One participant's survey session. Owns all mutable subsystem state
/// (search cache, generation counter, pending markers, POI collection) for
/// a well-defined lifecycle: constructed once, dropped on session end.
pub struct SurveySession {
  pub search: SearchCoordinator,
  pub resolver: ReverseResolver,
  pub pending: PendingMarkerBatch,
  pub pois: PoiCollection,
  pub viewport: ViewportPoiFetcher,
  pub language: Language,
}

impl SurveySession {
  /// Build a session against the live services named in `config`.
  #[must_use]
  pub fn new(config: &Config) -> Self {
    let geocoder: Arc<dyn GeocodeProvider> =
      Arc::new(NominatimProvider::new(config.nominatim_url.clone()));
    let grounding: Arc<dyn GroundingProvider> = Arc::new(GeminiProvider::new(
      config.gemini_api_key.clone(),
      config.locality.clone(),
    ));
    let area: Arc<dyn AreaProvider> = Arc::new(OverpassProvider::new(config.overpass_url.clone()));
    Self::with_providers(geocoder, grounding, area, config)
  }

  /// Build a session with explicit providers (tests use mocks here).
  #[must_use]
  pub fn with_providers(
    geocoder: Arc<dyn GeocodeProvider>,
    grounding: Arc<dyn GroundingProvider>,
    area: Arc<dyn AreaProvider>,
    config: &Config,
  ) -> Self {
    let bias = SearchBias {
      viewbox: config.region,
      center: config.center,
      locality: config.locality.clone(),
    };
    Self {
      search: SearchCoordinator::new(Arc::clone(&geocoder), grounding, bias),
      resolver: ReverseResolver::new(geocoder, config.language),
      pending: PendingMarkerBatch::new(),
      pois: PoiCollection::new(config.policy),
      viewport: ViewportPoiFetcher::new(area),
      language: config.language,
    }
  }

  /// Run a search for the current text-input value. Debouncing keystrokes
  /// is the input collaborator's job.
  pub async fn search(&self, query: &str) -> SearchOutcome {
    self.search.search(query).await
  }

  /// A map click (already filtered to the survey region by the map
  /// collaborator) toggles a pending marker and drops the editing focus.
  pub fn handle_map_click(&mut self, position: WGS84Coordinate) {
    self.pending.toggle(position);
    self.pois.set_active(None);
  }

  /// Promote all pending markers to POIs. Returns the new ids; the last
  /// one is active so the presentation layer can recenter on it.
  pub async fn confirm_pending(&mut self) -> Vec<PoiId> {
    self
      .pending
      .confirm_all(&self.resolver, &mut self.pois)
      .await
  }

  pub fn discard_pending(&mut self) {
    self.pending.discard_all();
  }

  /// Add the POI for a selected search result; the leading segment of the
  /// display name becomes the initial POI name.
  pub fn select_search_result(&mut self, result: &SearchResult) -> Result<PoiId, PoiError> {
    self.pois.add(result.short_name(), result.position)
  }

  /// Add the POI for a selected background hint, skipping reverse
  /// resolution entirely.
  pub fn select_hint(&mut self, hint: &PoiHint) -> Result<PoiId, PoiError> {
    self.pois.add(&hint.name, hint.position)
  }

  /// Forwarded map "move end" event.
  pub async fn viewport_settled(&mut self, bounds: BoundingBox, zoom: u8) -> FetchOutcome {
    self.viewport.on_viewport_settled(bounds, zoom).await
  }

  /// Render the numbered mobility-profile summary in `lang`. Empty
  /// collection renders to an empty string.
  #[must_use]
  pub fn summary(&self, lang: Language) -> String {
    if self.pois.count() == 0 {
      return String::new();
    }
    let mut text = format!("{}\n\n", summary_prefix(lang));
    for (i, poi) in self.pois.iter().enumerate() {
      let mode = poi
        .transport_mode
        .map_or_else(|| summary_no_transport(lang), |m| transport_label(lang, m));
      let freq = frequency_label(lang, poi.frequency_index);
      text.push_str(&summary_line(lang, i + 1, &poi.name, mode, freq));
      text.push('\n');
    }
    text.push('\n');
    text.push_str(summary_footer(lang));
    text
  }

  /// Bundle both summary renderings for the research backend. The actual
  /// transmission is a fire-and-forget concern of the embedding page.
  #[must_use]
  pub fn submission_payload(&self) -> SubmissionPayload {
    SubmissionPayload {
      summary_en: self.summary(Language::En),
      summary_de: self.summary(Language::De),
      poi_count: self.pois.count(),
      generated_at: Utc::now(),
    }
  }
}

/// The localized profile text pair handed to the backend on submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload {
  pub summary_en: String,
  pub summary_de: String,
  pub poi_count: usize,
  pub generated_at: DateTime<Utc>,
}
