use super::{GeocodeProvider, GroundingProvider, ReverseAddress, SearchResult, SearchSource};
use crate::geo::{BoundingBox, WGS84Coordinate};
use anyhow::{Result, anyhow};
use regex::Regex;
use serde_json::{Value, json};
use std::time::Duration;
use surf::Config;
use surf_governor::GovernorMiddleware;

const USER_AGENT: &str = "mobipoi/0.1 (mobility survey tool)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn rate_limited_client(per_second: u32) -> surf::Client {
  let client: surf::Client = Config::new()
    .set_timeout(Some(REQUEST_TIMEOUT))
    .try_into()
    .expect("client");
  client.with(GovernorMiddleware::per_second(per_second).expect("rate limit"))
}

/// Built-in parser for direct coordinate input, checked before any network
/// search is attempted.
pub struct CoordinateParser {
  decimal_regex: Regex,
  dms_regex: Regex,
}

impl Default for CoordinateParser {
  fn default() -> Self {
    Self::new()
  }
}

impl CoordinateParser {
  #[must_use]
  pub fn new() -> Self {
    Self {
      // Matches: "52.5, 13.4" or "52.5,13.4" or "52.5 13.4"
      decimal_regex: Regex::new(r"^\s*(-?\d+\.?\d*)\s*[,\s]\s*(-?\d+\.?\d*)\s*$").unwrap(),
      // Matches: "52°30'N 13°24'E" or "52° 30' N, 13° 24' E"
      dms_regex: Regex::new(r"^\s*(\d+)°\s*(\d+)'\s*([NS])\s*[,\s]\s*(\d+)°\s*(\d+)'\s*([EW])\s*$")
        .unwrap(),
    }
  }

  /// Try to interpret `input` as a coordinate inside the survey region.
  #[must_use]
  pub fn parse(&self, input: &str, region: &BoundingBox) -> Option<SearchResult> {
    let coord = self.parse_decimal(input).or_else(|| self.parse_dms(input))?;
    if !region.contains(coord) {
      log::debug!("coordinate input {coord} lies outside the survey region");
      return None;
    }
    Some(SearchResult {
      name: format!("{:.4}°, {:.4}°", coord.lat, coord.lon),
      position: coord,
      place_id: None,
      category: None,
      kind: None,
      source: SearchSource::Coordinate,
    })
  }

  fn parse_decimal(&self, input: &str) -> Option<WGS84Coordinate> {
    let caps = self.decimal_regex.captures(input)?;
    let lat: f32 = caps.get(1)?.as_str().parse().ok()?;
    let lon: f32 = caps.get(2)?.as_str().parse().ok()?;
    let coord = WGS84Coordinate::new(lat, lon);
    coord.is_valid().then_some(coord)
  }

  fn parse_dms(&self, input: &str) -> Option<WGS84Coordinate> {
    let caps = self.dms_regex.captures(input)?;

    let lat_deg: f32 = caps.get(1)?.as_str().parse().ok()?;
    let lat_min: f32 = caps.get(2)?.as_str().parse().ok()?;
    let lat_dir = caps.get(3)?.as_str();

    let lon_deg: f32 = caps.get(4)?.as_str().parse().ok()?;
    let lon_min: f32 = caps.get(5)?.as_str().parse().ok()?;
    let lon_dir = caps.get(6)?.as_str();

    let mut lat = lat_deg + lat_min / 60.0;
    let mut lon = lon_deg + lon_min / 60.0;

    if lat_dir == "S" {
      lat = -lat;
    }
    if lon_dir == "W" {
      lon = -lon;
    }

    Some(WGS84Coordinate::new(lat, lon))
  }
}

/// OpenStreetMap Nominatim provider.
pub struct NominatimProvider {
  base_url: String,
  client: surf::Client,
}

impl NominatimProvider {
  #[must_use]
  pub fn new(base_url: Option<String>) -> Self {
    Self {
      base_url: base_url.unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string()),
      // Nominatim's usage policy caps at one request per second; the
      // staggered batch dispatch stays under this with headroom.
      client: rate_limited_client(2),
    }
  }
}

/// Rows without coordinates are skipped rather than failing the whole body.
fn parse_search_body(body: &Value, limit: usize) -> Vec<SearchResult> {
  let Some(items) = body.as_array() else {
    return Vec::new();
  };
  let mut results = Vec::new();
  for item in items {
    if let (Some(lat), Some(lon), Some(display_name)) = (
      item["lat"].as_str().and_then(|s| s.parse::<f32>().ok()),
      item["lon"].as_str().and_then(|s| s.parse::<f32>().ok()),
      item["display_name"].as_str(),
    ) {
      results.push(SearchResult {
        name: display_name.to_string(),
        position: WGS84Coordinate::new(lat, lon),
        place_id: item["place_id"].as_u64(),
        category: item["class"].as_str().map(std::string::ToString::to_string),
        kind: item["type"].as_str().map(std::string::ToString::to_string),
        source: SearchSource::Geocode,
      });
      if results.len() >= limit {
        break;
      }
    }
  }
  results
}

fn parse_reverse_body(body: &Value) -> Option<ReverseAddress> {
  let display_name = body["display_name"].as_str()?;
  let address = &body["address"];
  let field = |key: &str| {
    address[key]
      .as_str()
      .map(std::string::ToString::to_string)
      .filter(|s| !s.is_empty())
  };
  Some(ReverseAddress {
    display_name: Some(display_name.to_string()),
    amenity: field("amenity"),
    shop: field("shop"),
    tourism: field("tourism"),
    road: field("road"),
  })
}

#[async_trait::async_trait]
impl GeocodeProvider for NominatimProvider {
  fn name(&self) -> &'static str {
    "OpenStreetMap Nominatim"
  }

  async fn search(
    &self,
    query: &str,
    viewbox: &BoundingBox,
    limit: usize,
  ) -> Result<Vec<SearchResult>> {
    let url = format!(
      "{}/search?format=json&limit={}&viewbox={}&bounded=1&q={}",
      self.base_url,
      limit,
      viewbox.viewbox_param(),
      urlencoding::encode(query)
    );

    let response = self
      .client
      .get(&url)
      .header("User-Agent", USER_AGENT)
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Nominatim search request failed: {}", e))?;

    Ok(parse_search_body(&response, limit))
  }

  async fn reverse(&self, position: WGS84Coordinate) -> Result<Option<ReverseAddress>> {
    let url = format!(
      "{}/reverse?format=json&lat={}&lon={}&addressdetails=1",
      self.base_url, position.lat, position.lon
    );

    let response = self
      .client
      .get(&url)
      .header("User-Agent", USER_AGENT)
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Nominatim reverse request failed: {}", e))?;

    Ok(parse_reverse_body(&response))
  }
}

/// Gemini generate-content provider with the Google-Maps grounding tool.
/// Returns bare place names only; coordinates come from a follow-up geocode.
pub struct GeminiProvider {
  api_key: Option<String>,
  base_url: String,
  model: String,
  locality: String,
  client: surf::Client,
}

impl GeminiProvider {
  #[must_use]
  pub fn new(api_key: Option<String>, locality: String) -> Self {
    Self {
      api_key,
      base_url: "https://generativelanguage.googleapis.com".to_string(),
      model: "gemini-2.5-flash".to_string(),
      locality,
      client: rate_limited_client(2),
    }
  }

  #[must_use]
  pub fn with_base_url(mut self, base_url: String) -> Self {
    self.base_url = base_url;
    self
  }
}

/// Pulls grounding-chunk titles out of a generate-content response. Any
/// shape deviation yields an empty list.
fn extract_grounding_titles(body: &Value, max_results: usize) -> Vec<String> {
  let chunks = &body["candidates"][0]["groundingMetadata"]["groundingChunks"];
  let Some(chunks) = chunks.as_array() else {
    return Vec::new();
  };
  chunks
    .iter()
    .filter_map(|c| c["maps"]["title"].as_str())
    .map(std::string::ToString::to_string)
    .filter(|t| !t.trim().is_empty())
    .take(max_results)
    .collect()
}

#[async_trait::async_trait]
impl GroundingProvider for GeminiProvider {
  fn name(&self) -> &'static str {
    "Gemini grounding"
  }

  async fn suggest(
    &self,
    query: &str,
    bias: WGS84Coordinate,
    max_results: usize,
  ) -> Result<Vec<String>> {
    let Some(api_key) = &self.api_key else {
      log::debug!("no Gemini API key configured, skipping grounding suggestions");
      return Ok(Vec::new());
    };

    let prompt = format!(
      "STRICT GEOGRAPHIC FILTER: Identify up to {max_results} official points of interest \
       for \"{query}\" located exclusively inside the city limits of {}. \
       Do not return results outside the city. Return names only.",
      self.locality
    );
    let body = json!({
      "contents": [{ "parts": [{ "text": prompt }] }],
      "tools": [{ "googleMaps": {} }],
      "toolConfig": {
        "retrievalConfig": {
          "latLng": { "latitude": bias.lat, "longitude": bias.lon }
        }
      }
    });

    let url = format!(
      "{}/v1beta/models/{}:generateContent",
      self.base_url, self.model
    );
    let response = self
      .client
      .post(&url)
      .header("x-goog-api-key", api_key.as_str())
      .header("User-Agent", USER_AGENT)
      .body(surf::Body::from_json(&body).map_err(|e| anyhow!("request body: {}", e))?)
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Gemini grounding request failed: {}", e))?;

    Ok(extract_grounding_titles(&response, max_results))
  }
}
