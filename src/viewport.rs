use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::{BoundingBox, WGS84Coordinate};

/// Fetches are suppressed below this zoom level; background POI density is
/// meaningless zoomed far out.
pub const MIN_FETCH_ZOOM: u8 = 15;
/// Minimum time between two area fetches.
pub const FETCH_COOLDOWN: Duration = Duration::from_secs(3);
const MAX_HINTS: usize = 60;

/// A lightweight background suggestion. Selecting one adds a POI with the
/// given name directly, skipping reverse resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiHint {
  pub name: String,
  pub position: WGS84Coordinate,
}

/// Area query for named points inside a bounding box.
#[async_trait::async_trait]
pub trait AreaProvider: Send + Sync {
  fn name(&self) -> &str;

  async fn nearby(&self, bounds: &BoundingBox) -> Result<Vec<PoiHint>>;
}

/// Overpass API provider returning named amenity/shop/tourism nodes.
pub struct OverpassProvider {
  base_url: String,
  client: surf::Client,
}

impl OverpassProvider {
  #[must_use]
  pub fn new(base_url: Option<String>) -> Self {
    let client: surf::Client = surf::Config::new()
      .set_timeout(Some(Duration::from_secs(10)))
      .try_into()
      .expect("client");
    Self {
      base_url: base_url.unwrap_or_else(|| "https://overpass-api.de/api/interpreter".to_string()),
      client,
    }
  }
}

/// Extracts named nodes from an Overpass response body. Unnamed nodes and
/// rows without coordinates are dropped.
fn parse_elements(body: &Value) -> Vec<PoiHint> {
  let Some(elements) = body["elements"].as_array() else {
    return Vec::new();
  };
  elements
    .iter()
    .filter_map(|e| {
      let name = e["tags"]["name"].as_str()?;
      #[allow(clippy::cast_possible_truncation)]
      let lat = e["lat"].as_f64()? as f32;
      #[allow(clippy::cast_possible_truncation)]
      let lon = e["lon"].as_f64()? as f32;
      Some(PoiHint {
        name: name.to_string(),
        position: WGS84Coordinate::new(lat, lon),
      })
    })
    .take(MAX_HINTS)
    .collect()
}

#[async_trait::async_trait]
impl AreaProvider for OverpassProvider {
  fn name(&self) -> &'static str {
    "Overpass"
  }

  async fn nearby(&self, bounds: &BoundingBox) -> Result<Vec<PoiHint>> {
    let bbox = bounds.overpass_param();
    let query = format!(
      "[out:json][timeout:10];(node[\"amenity\"][\"name\"]({bbox});node[\"shop\"][\"name\"]({bbox});node[\"tourism\"][\"name\"]({bbox}););out body {MAX_HINTS};"
    );

    // Overpass error pages come back as HTML; parsing the body ourselves
    // keeps a malformed response from looking like anything but Err.
    let raw = self
      .client
      .post(&self.base_url)
      .header("Content-Type", "application/x-www-form-urlencoded")
      .body(format!("data={}", urlencoding::encode(&query)))
      .recv_string()
      .await
      .map_err(|e| anyhow!("Overpass request failed: {}", e))?;

    let body: Value =
      serde_json::from_str(&raw).map_err(|e| anyhow!("Overpass returned a non-JSON body: {}", e))?;
    Ok(parse_elements(&body))
  }
}

/// Outcome of one viewport-settled cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Hints were replaced; carries the new count.
  Updated(usize),
  /// Zoomed out too far for useful density data.
  SkippedZoom,
  /// A fetch ran less than a cooldown window ago.
  SkippedCooldown,
  /// Upstream failed or returned garbage; the cycle was abandoned and the
  /// previous hints kept.
  Failed,
}

/// Listens to settled map viewports and keeps a throttled, wholesale-
/// replaced list of background POI hints.
pub struct ViewportPoiFetcher {
  provider: Arc<dyn AreaProvider>,
  min_zoom: u8,
  cooldown: Duration,
  last_fetch: Option<Instant>,
  hints: Vec<PoiHint>,
}

impl ViewportPoiFetcher {
  #[must_use]
  pub fn new(provider: Arc<dyn AreaProvider>) -> Self {
    Self {
      provider,
      min_zoom: MIN_FETCH_ZOOM,
      cooldown: FETCH_COOLDOWN,
      last_fetch: None,
      hints: Vec::new(),
    }
  }

  #[must_use]
  pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
    self.cooldown = cooldown;
    self
  }

  #[must_use]
  pub fn with_min_zoom(mut self, min_zoom: u8) -> Self {
    self.min_zoom = min_zoom;
    self
  }

  /// Handle a debounced "viewport settled" event from the map collaborator.
  pub async fn on_viewport_settled(&mut self, bounds: BoundingBox, zoom: u8) -> FetchOutcome {
    if zoom < self.min_zoom {
      log::debug!("skipping area fetch at zoom {zoom}");
      return FetchOutcome::SkippedZoom;
    }
    if let Some(last) = self.last_fetch
      && last.elapsed() < self.cooldown
    {
      log::debug!("skipping area fetch, cooldown active");
      return FetchOutcome::SkippedCooldown;
    }
    // Stamp the attempt, not the success: a failing upstream should not be
    // hammered on every settle event either.
    self.last_fetch = Some(Instant::now());

    match self.provider.nearby(&bounds).await {
      Ok(hints) => {
        log::debug!("area fetch returned {} hints", hints.len());
        self.hints = hints;
        FetchOutcome::Updated(self.hints.len())
      }
      Err(e) => {
        log::warn!("area fetch via '{}' abandoned: {e}", self.provider.name());
        FetchOutcome::Failed
      }
    }
  }

  #[must_use]
  pub fn hints(&self) -> &[PoiHint] {
    &self.hints
  }
}
