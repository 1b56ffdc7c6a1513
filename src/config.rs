use std::path::PathBuf;

use dirs::home_dir;
use log::error;

use crate::geo::{BoundingBox, WGS84Coordinate};
use crate::locale::Language;
use crate::poi::SurveyPolicy;

/// Locality suffix and grounding filter for the canonical survey region.
const DEFAULT_LOCALITY: &str = "Magdeburg";
/// OVGU campus / Wissenschaftshafen area.
const DEFAULT_CENTER: WGS84Coordinate = WGS84Coordinate {
  lat: 52.1396,
  lon: 11.6456,
};

fn default_region() -> BoundingBox {
  BoundingBox::new(50.9, 10.5, 53.1, 13.2)
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  pub nominatim_url: Option<String>,
  pub overpass_url: Option<String>,
  /// Read from the environment only; never written to the config file.
  #[serde(skip)]
  pub gemini_api_key: Option<String>,
  pub locality: String,
  pub center: WGS84Coordinate,
  pub region: BoundingBox,
  pub policy: SurveyPolicy,
  pub language: Language,
}

impl Config {
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();
    let default = Self::default();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&default);

    if merged.config_path.is_some() && from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  /// Defaults without any filesystem or environment access, for tests and
  /// embedding.
  #[must_use]
  pub fn offline_defaults() -> Self {
    Self {
      config_path: None,
      ..Self::default()
    }
  }

  fn from_env() -> Self {
    let language = match std::env::var("MOBIPOI_LANGUAGE").ok().as_deref() {
      Some("en" | "EN") => Language::En,
      _ => Language::default(),
    };
    Self {
      config_path: std::env::var("MOBIPOI_CONFIG").ok().map(PathBuf::from),
      nominatim_url: std::env::var("MOBIPOI_NOMINATIM_URL").ok(),
      overpass_url: std::env::var("MOBIPOI_OVERPASS_URL").ok(),
      gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
      locality: std::env::var("MOBIPOI_LOCALITY").unwrap_or_default(),
      language,
      ..Self::offline_defaults()
    }
  }

  fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    self.nominatim_url = self.nominatim_url.or(other.nominatim_url.clone());
    self.overpass_url = self.overpass_url.or(other.overpass_url.clone());
    self.gemini_api_key = self.gemini_api_key.or(other.gemini_api_key.clone());
    if self.locality.is_empty() {
      self.locality = other.locality.clone();
    }
    if self.language == Language::default() && other.language != Language::default() {
      self.language = other.language;
    }
    // Region, center and policy are file-configured only; the env layer
    // carries the defaults, so "still default" means "take the other".
    let default = Self::default();
    if self.region == default.region {
      self.region = other.region;
    }
    if self.center == default.center {
      self.center = other.center;
    }
    if self.policy == default.policy {
      self.policy = other.policy;
    }
    self
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("MOBIPOI_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("mobipoi")))?;
    let config_path = config_path.join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()?
  }

  fn init_cfg_file(&self) {
    let Some(path) = &self.config_path else { return };
    if !path.exists() {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create config directory: {e}");
      });
    }
    let path = path.join("config.json");
    if !path.exists() {
      match serde_json::to_string_pretty(self) {
        Ok(config) => {
          let _ = std::fs::write(path, config).inspect_err(|e| {
            error!("Failed to write config file: {e}");
          });
        }
        Err(_) => error!("Failed to serialize config"),
      }
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      config_path: home_dir().map(|p| p.join(".config").join("mobipoi")),
      nominatim_url: None,
      overpass_url: None,
      gemini_api_key: None,
      locality: DEFAULT_LOCALITY.to_string(),
      center: DEFAULT_CENTER,
      region: default_region(),
      policy: SurveyPolicy::default(),
      language: Language::default(),
    }
  }
}
