use clap::{Parser, Subcommand};
use mobipoi::config::Config;
use mobipoi::geo::{BoundingBox, WGS84Coordinate};
use mobipoi::search::coordinator::SearchOutcome;
use mobipoi::session::SurveySession;

#[derive(Parser)]
#[command(name = "mobipoi", about = "Exercise the POI pipeline against live services")]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run a combined geocode + grounding search.
  Search { query: String },
  /// Reverse geocode a coordinate to a display name.
  Reverse { lat: f32, lon: f32 },
  /// Fetch background POI hints for a bounding box.
  Nearby {
    min_lat: f32,
    min_lon: f32,
    max_lat: f32,
    max_lon: f32,
    #[arg(long, default_value_t = 16)]
    zoom: u8,
  },
}

#[tokio::main]
async fn main() {
  env_logger::init();
  let args = Args::parse();
  let config = Config::new();
  let mut session = SurveySession::new(&config);

  match args.command {
    Command::Search { query } => match session.search(&query).await {
      SearchOutcome::Results(results) => {
        for (i, result) in results.iter().enumerate() {
          println!("{:>2}. [{:?}] {result}", i + 1, result.source);
        }
      }
      SearchOutcome::TooShort => println!("query too short (minimum 3 characters)"),
      SearchOutcome::Superseded => println!("superseded"),
    },
    Command::Reverse { lat, lon } => {
      let name = session
        .resolver
        .resolve(WGS84Coordinate::new(lat, lon), 1)
        .await;
      println!("{name}");
    }
    Command::Nearby {
      min_lat,
      min_lon,
      max_lat,
      max_lon,
      zoom,
    } => {
      let bounds = BoundingBox::new(min_lat, min_lon, max_lat, max_lon);
      let outcome = session.viewport_settled(bounds, zoom).await;
      println!("fetch: {outcome:?}");
      for hint in session.viewport.hints() {
        println!("  {} ({})", hint.name, hint.position);
      }
    }
  }
}
