use serde::{Deserialize, Serialize};

use crate::poi::TransportMode;

/// Survey languages. German is the default audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
  #[default]
  De,
  En,
}

/// Number of visit-frequency bands, ordered occasional → daily.
pub const FREQUENCY_BAND_COUNT: usize = 4;

#[must_use]
pub fn frequency_label(lang: Language, index: usize) -> &'static str {
  const EN: [&str; FREQUENCY_BAND_COUNT] =
    ["Occasionally", "2-3 days/week", "4-5 days/week", "Daily"];
  const DE: [&str; FREQUENCY_BAND_COUNT] =
    ["Gelegentlich", "2-3 Tage/Woche", "4-5 Tage/Woche", "Täglich"];
  let index = index.min(FREQUENCY_BAND_COUNT - 1);
  match lang {
    Language::En => EN[index],
    Language::De => DE[index],
  }
}

#[must_use]
pub fn transport_label(lang: Language, mode: TransportMode) -> &'static str {
  match (lang, mode) {
    (Language::En, TransportMode::Walking) => "Walking",
    (Language::En, TransportMode::Cycling) => "Cycling",
    (Language::En, TransportMode::EBike) => "E-Bike",
    (Language::En, TransportMode::Tram) => "Tram",
    (Language::En, TransportMode::Bus) => "Bus",
    (Language::En, TransportMode::CarDriver) => "Car (Driver)",
    (Language::En, TransportMode::CarPassenger) => "Car (Passenger)",
    (Language::En, TransportMode::EScooter) => "E-Scooter",
    (Language::En, TransportMode::Train) => "Train/S-Bahn",
    (Language::En, TransportMode::Motorbike) => "Motorbike",
    (Language::En, TransportMode::Taxi) => "Taxi",
    (Language::En, TransportMode::CarSharing) => "Car Sharing",
    (Language::En, TransportMode::BikeSharing) => "Bike Sharing",
    (Language::De, TransportMode::Walking) => "Zu Fuß",
    (Language::De, TransportMode::Cycling) => "Fahrrad",
    (Language::De, TransportMode::EBike) => "E-Bike",
    (Language::De, TransportMode::Tram) => "Straßenbahn",
    (Language::De, TransportMode::Bus) => "Bus",
    (Language::De, TransportMode::CarDriver) => "Auto (Fahrer)",
    (Language::De, TransportMode::CarPassenger) => "Auto (Beifahrer)",
    (Language::De, TransportMode::EScooter) => "E-Scooter",
    (Language::De, TransportMode::Train) => "Zug/S-Bahn",
    (Language::De, TransportMode::Motorbike) => "Motorrad",
    (Language::De, TransportMode::Taxi) => "Taxi",
    (Language::De, TransportMode::CarSharing) => "Car-Sharing",
    (Language::De, TransportMode::BikeSharing) => "Leihrad",
  }
}

/// Placeholder name for a point whose reverse lookup yielded nothing.
/// `n` is 1-based.
#[must_use]
pub fn point_placeholder(lang: Language, n: usize) -> String {
  match lang {
    Language::En => format!("Point {n}"),
    Language::De => format!("Punkt {n}"),
  }
}

#[must_use]
pub fn summary_prefix(lang: Language) -> &'static str {
  match lang {
    Language::En => "Your current mobility profile for the Magdeburg region:",
    Language::De => "Ihr aktuelles Mobilitätsprofil für die Region Magdeburg:",
  }
}

#[must_use]
pub fn summary_footer(lang: Language) -> &'static str {
  match lang {
    Language::En => "Your input is critical for urban and campus development.",
    Language::De => "Ihre Angaben sind entscheidend für die Stadt- und Campusentwicklung.",
  }
}

#[must_use]
pub fn summary_no_transport(lang: Language) -> &'static str {
  match lang {
    Language::En => "undefined transport mode",
    Language::De => "nicht angegebenes Verkehrsmittel",
  }
}

#[must_use]
pub fn summary_line(lang: Language, n: usize, name: &str, mode: &str, freq: &str) -> String {
  match lang {
    Language::En => format!(
      "{n}. You visit **{name}** primarily by **{mode}**, with a frequency of **{freq}**."
    ),
    Language::De => format!(
      "{n}. Sie besuchen **{name}** hauptsächlich mit dem **{mode}**, mit einer Häufigkeit von **{freq}**."
    ),
  }
}
