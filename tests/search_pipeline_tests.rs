use std::sync::{Arc, Mutex};
use std::time::Duration;

use mobipoi::geo::{BoundingBox, WGS84Coordinate};
use mobipoi::search::coordinator::{SearchBias, SearchCoordinator, SearchOutcome};
use mobipoi::search::{
  GeocodeProvider, GroundingProvider, ReverseAddress, SearchResult, SearchSource,
};

fn bias() -> SearchBias {
  SearchBias {
    viewbox: BoundingBox::new(50.9, 10.5, 53.1, 13.2),
    center: WGS84Coordinate::new(52.1396, 11.6456),
    locality: "Magdeburg".to_string(),
  }
}

fn place(name: &str, lat: f32, lon: f32, place_id: u64) -> SearchResult {
  SearchResult {
    name: name.to_string(),
    position: WGS84Coordinate::new(lat, lon),
    place_id: Some(place_id),
    category: None,
    kind: None,
    source: SearchSource::Geocode,
  }
}

/// Geocoder answering from a prefix-matched script, recording every query.
/// An optional per-prefix delay simulates a slow upstream.
struct ScriptedGeocoder {
  calls: Mutex<Vec<String>>,
  script: Vec<(&'static str, Vec<SearchResult>)>,
  delay: Option<(&'static str, Duration)>,
}

impl ScriptedGeocoder {
  fn call_count(&self, query: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|q| q.as_str() == query)
      .count()
  }
}

#[async_trait::async_trait]
impl GeocodeProvider for ScriptedGeocoder {
  fn name(&self) -> &'static str {
    "scripted"
  }

  async fn search(
    &self,
    query: &str,
    _viewbox: &BoundingBox,
    limit: usize,
  ) -> anyhow::Result<Vec<SearchResult>> {
    self.calls.lock().unwrap().push(query.to_string());
    if let Some((prefix, delay)) = &self.delay
      && query.to_lowercase().starts_with(&prefix.to_lowercase())
    {
      tokio::time::sleep(*delay).await;
    }
    let lowered = query.to_lowercase();
    for (prefix, results) in &self.script {
      if lowered.starts_with(&prefix.to_lowercase()) {
        let mut results = results.clone();
        results.truncate(limit);
        return Ok(results);
      }
    }
    Ok(Vec::new())
  }

  async fn reverse(
    &self,
    _position: WGS84Coordinate,
  ) -> anyhow::Result<Option<ReverseAddress>> {
    Ok(None)
  }
}

struct ScriptedGrounding {
  names: Vec<&'static str>,
  calls: Mutex<usize>,
}

#[async_trait::async_trait]
impl GroundingProvider for ScriptedGrounding {
  fn name(&self) -> &'static str {
    "scripted"
  }

  async fn suggest(
    &self,
    _query: &str,
    _bias: WGS84Coordinate,
    max_results: usize,
  ) -> anyhow::Result<Vec<String>> {
    *self.calls.lock().unwrap() += 1;
    Ok(
      self
        .names
        .iter()
        .take(max_results)
        .map(std::string::ToString::to_string)
        .collect(),
    )
  }
}

fn results_of(outcome: SearchOutcome) -> Vec<SearchResult> {
  match outcome {
    SearchOutcome::Results(results) => results,
    other => panic!("expected results, got {other:?}"),
  }
}

#[tokio::test]
async fn repeated_query_hits_cache_not_network() {
  let geocoder = Arc::new(ScriptedGeocoder {
    calls: Mutex::new(Vec::new()),
    script: vec![("edeka", vec![place("Edeka Nord, Magdeburg", 52.14, 11.62, 101)])],
    delay: None,
  });
  let grounding = Arc::new(ScriptedGrounding {
    names: vec![],
    calls: Mutex::new(0),
  });
  let coordinator = SearchCoordinator::new(
    Arc::clone(&geocoder) as Arc<dyn GeocodeProvider>,
    Arc::clone(&grounding) as Arc<dyn GroundingProvider>,
    bias(),
  );

  let first = results_of(coordinator.search("Edeka").await);
  let second = results_of(coordinator.search("Edeka").await);

  assert_eq!(first.len(), 1);
  assert_eq!(second.len(), first.len());
  assert_eq!(second[0].name, first[0].name);
  assert_eq!(second[0].place_id, first[0].place_id);
  // One provider round-trip each, despite two searches.
  assert_eq!(geocoder.call_count("Edeka, Magdeburg"), 1);
  assert_eq!(*grounding.calls.lock().unwrap(), 1);
  assert!(coordinator.is_cached("Edeka"));
}

#[tokio::test]
async fn cache_serves_concurrent_repeats() {
  let geocoder = Arc::new(ScriptedGeocoder {
    calls: Mutex::new(Vec::new()),
    script: vec![("edeka", vec![place("Edeka Nord, Magdeburg", 52.14, 11.62, 101)])],
    delay: None,
  });
  let coordinator = SearchCoordinator::new(
    Arc::clone(&geocoder) as Arc<dyn GeocodeProvider>,
    Arc::new(ScriptedGrounding {
      names: vec![],
      calls: Mutex::new(0),
    }),
    bias(),
  );

  results_of(coordinator.search("Edeka").await);
  let outcomes =
    futures::future::join_all((0..4).map(|_| coordinator.search("Edeka"))).await;
  for outcome in outcomes {
    assert_eq!(results_of(outcome).len(), 1);
  }
  assert_eq!(geocoder.call_count("Edeka, Magdeburg"), 1);
}

#[tokio::test]
async fn newer_search_supersedes_older_one() {
  let geocoder = Arc::new(ScriptedGeocoder {
    calls: Mutex::new(Vec::new()),
    script: vec![
      ("edeka c", vec![place("Edeka City, Magdeburg", 52.13, 11.63, 202)]),
      ("edeka", vec![place("Edeka Nord, Magdeburg", 52.14, 11.62, 101)]),
    ],
    // Only the broader first query is slow.
    delay: Some(("edeka, magdeburg", Duration::from_millis(300))),
  });
  let grounding = Arc::new(ScriptedGrounding {
    names: vec![],
    calls: Mutex::new(0),
  });
  let coordinator = Arc::new(SearchCoordinator::new(
    geocoder as Arc<dyn GeocodeProvider>,
    grounding as Arc<dyn GroundingProvider>,
    bias(),
  ));

  let older = {
    let coordinator = Arc::clone(&coordinator);
    tokio::spawn(async move { coordinator.search("Edeka").await })
  };
  // Let the first search claim its generation and hit the slow provider.
  tokio::time::sleep(Duration::from_millis(50)).await;

  let newer = results_of(coordinator.search("Edeka C").await);
  assert_eq!(newer[0].name, "Edeka City, Magdeburg");

  // The older invocation observes the newer generation and yields nothing,
  // no matter that its response arrives last.
  assert!(matches!(older.await.unwrap(), SearchOutcome::Superseded));
  assert!(coordinator.is_cached("Edeka C"));
  assert!(!coordinator.is_cached("Edeka"));
}

#[tokio::test]
async fn shared_place_is_deduplicated_across_providers() {
  let geocoder = Arc::new(ScriptedGeocoder {
    calls: Mutex::new(Vec::new()),
    script: vec![
      ("edeka nord", vec![place("Edeka Nord, Magdeburg", 52.14, 11.62, 101)]),
      (
        "edeka",
        vec![
          place("Edeka Nord, Magdeburg", 52.14, 11.62, 101),
          place("Edeka City, Magdeburg", 52.13, 11.63, 202),
        ],
      ),
    ],
    delay: None,
  });
  let grounding = Arc::new(ScriptedGrounding {
    names: vec!["Edeka Nord"],
    calls: Mutex::new(0),
  });
  let coordinator = SearchCoordinator::new(
    geocoder as Arc<dyn GeocodeProvider>,
    grounding as Arc<dyn GroundingProvider>,
    bias(),
  );

  let results = results_of(coordinator.search("Edeka").await);

  let nord_count = results
    .iter()
    .filter(|r| r.place_id == Some(101))
    .count();
  assert_eq!(nord_count, 1, "shared place must appear exactly once");
  assert_eq!(results.len(), 2);
  // First occurrence wins: the grounding-derived entry leads the list and
  // keeps its source tag.
  assert_eq!(results[0].place_id, Some(101));
  assert_eq!(results[0].source, SearchSource::Grounding);
  assert_eq!(results[1].source, SearchSource::Geocode);
}

#[tokio::test]
async fn geocode_results_survive_grounding_failure() {
  struct BrokenGrounding;
  #[async_trait::async_trait]
  impl GroundingProvider for BrokenGrounding {
    fn name(&self) -> &'static str {
      "broken"
    }
    async fn suggest(
      &self,
      _query: &str,
      _bias: WGS84Coordinate,
      _max_results: usize,
    ) -> anyhow::Result<Vec<String>> {
      anyhow::bail!("quota exhausted")
    }
  }

  let geocoder = Arc::new(ScriptedGeocoder {
    calls: Mutex::new(Vec::new()),
    script: vec![("edeka", vec![place("Edeka Nord, Magdeburg", 52.14, 11.62, 101)])],
    delay: None,
  });
  let coordinator = SearchCoordinator::new(
    geocoder as Arc<dyn GeocodeProvider>,
    Arc::new(BrokenGrounding),
    bias(),
  );

  let results = results_of(coordinator.search("Edeka").await);
  assert_eq!(results.len(), 1);
  assert_eq!(results[0].place_id, Some(101));
  // The partial list is still cached.
  assert!(coordinator.is_cached("Edeka"));
}

#[tokio::test]
async fn both_providers_failing_yields_empty_not_error() {
  struct BrokenGeocoder;
  #[async_trait::async_trait]
  impl GeocodeProvider for BrokenGeocoder {
    fn name(&self) -> &'static str {
      "broken"
    }
    async fn search(
      &self,
      _query: &str,
      _viewbox: &BoundingBox,
      _limit: usize,
    ) -> anyhow::Result<Vec<SearchResult>> {
      anyhow::bail!("connection reset")
    }
    async fn reverse(
      &self,
      _position: WGS84Coordinate,
    ) -> anyhow::Result<Option<ReverseAddress>> {
      anyhow::bail!("connection reset")
    }
  }

  let coordinator = SearchCoordinator::new(
    Arc::new(BrokenGeocoder),
    Arc::new(ScriptedGrounding {
      names: vec![],
      calls: Mutex::new(0),
    }),
    bias(),
  );
  let results = results_of(coordinator.search("Edeka").await);
  assert!(results.is_empty());
}
