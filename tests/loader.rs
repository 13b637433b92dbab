//! Integration tests for cache-first loading against a mock OpenF1 server

use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pitwall::cache::{FileStore, KeyValueStore, MemoryStore, TtlCache};
use pitwall::fetch::{Fetcher, RetryPolicy};
use pitwall::openf1::{fastest_lap_key, Endpoints, FastestLap, LoadError, Loader, SessionKind};

fn loader_for<S: KeyValueStore>(server: &MockServer, store: S) -> Loader<S> {
    paced_loader_for(server, store, Duration::ZERO)
}

fn paced_loader_for<S: KeyValueStore>(server: &MockServer, store: S, pacing: Duration) -> Loader<S> {
    let fetcher = Fetcher::new().with_policy(RetryPolicy::new(2, Duration::from_millis(5)));
    Loader::new(
        fetcher,
        TtlCache::new(store),
        Endpoints::new(format!("{}/v1", server.uri())),
    )
    .with_pacing(pacing)
}

/// Three practice sessions in 2024, keys 1..=3
async fn mount_three_sessions(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"session_key": 1, "date_start": "2024-05-01T10:00:00+00:00"},
            {"session_key": 2, "date_start": "2024-05-02T10:00:00+00:00"},
            {"session_key": 3, "date_start": "2024-05-03T10:00:00+00:00"}
        ])))
        .mount(server)
        .await;
}

fn practice_payload(year: i32) -> serde_json::Value {
    json!([
        {
            "session_key": 9683,
            "session_name": "Practice 1",
            "session_type": "Practice",
            "date_start": format!("{}-03-14T01:30:00+00:00", year),
            "year": year,
            "circuit_short_name": "Melbourne",
            "gmt_offset": "11:00:00"
        }
    ])
}

#[tokio::test]
async fn test_miss_fetches_then_serves_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .and(query_param("year", "2025"))
        .and(query_param("session_type", "Practice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(practice_payload(2025)))
        .expect(1)
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());

    let first = loader.practice_sessions(2025).await.unwrap();
    let second = loader.practice_sessions(2025).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].session_key, 9683);
}

#[tokio::test]
async fn test_payload_is_cached_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(practice_payload(2025)))
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());
    loader.practice_sessions(2025).await.unwrap();

    let cached = loader.cache().get("f1PracticeSessions_2025", 60).unwrap();
    assert_eq!(cached, practice_payload(2025));
    assert_eq!(cached[0]["gmt_offset"], "11:00:00");
}

#[tokio::test]
async fn test_cross_year_cache_triggers_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .and(query_param("year", "2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(practice_payload(2024)))
        .expect(1)
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());
    loader
        .cache()
        .set(
            "f1PracticeSessions_2024",
            &json!([{"session_key": 1, "date": "2023-11-01T10:00:00"}]),
        )
        .unwrap();

    let sessions = loader.practice_sessions(2024).await.unwrap();

    assert_eq!(sessions[0].year, Some(2024));
    assert_eq!(
        loader.cache().get("f1PracticeSessions_2024", 60),
        Some(practice_payload(2024))
    );
}

#[tokio::test]
async fn test_corrupt_cache_entry_falls_back_to_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/drivers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"driver_number": 1, "full_name": "Max VERSTAPPEN", "name_acronym": "VER", "team_name": "Red Bull Racing"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    store.set("f1Drivers_9158", "{{{").unwrap();
    let loader = loader_for(&server, store);

    let drivers = loader.drivers(9158).await.unwrap();

    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0].name_acronym.as_deref(), Some("VER"));
}

#[tokio::test]
async fn test_exhausted_rate_limit_yields_empty_list_and_no_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());
    let sessions = loader.sessions(2025, SessionKind::Race).await.unwrap();

    assert!(sessions.is_empty());
    assert!(loader.cache().store().get("f1RaceSessions_2025").is_none());
}

#[tokio::test]
async fn test_upstream_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());
    let err = loader.drivers(9158).await.unwrap_err();

    match err {
        LoadError::Fetch(fetch) => assert_eq!(fetch.status(), Some(500)),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unexpected_shape_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "No results found."})))
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());
    let err = loader.sessions(2025, SessionKind::Sprint).await.unwrap_err();

    assert!(matches!(err, LoadError::Decode { .. }));
    assert!(loader.cache().store().get("f1SprintSessions_2025").is_none());
}

#[tokio::test]
async fn test_fastest_laps_for_season() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .and(query_param("session_name", "Race"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"session_key": 100, "session_name": "Race", "date_start": "2024-03-02T15:00:00+00:00"},
            {"session_key": 200, "session_name": "Race", "date_start": "2024-03-09T17:00:00+00:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/laps"))
        .and(query_param("session_key", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"session_key": 100, "driver_number": 1, "lap_number": 1, "lap_duration": null},
            {"session_key": 100, "driver_number": 1, "lap_number": 39, "lap_duration": 92.608},
            {"session_key": 100, "driver_number": 16, "lap_number": 40, "lap_duration": 93.1}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/laps"))
        .and(query_param("session_key", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/drivers"))
        .and(query_param("session_key", "100"))
        .and(query_param("driver_number", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"driver_number": 1, "name_acronym": "VER", "full_name": "Max VERSTAPPEN"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());
    let entries = loader.fastest_laps(2024, SessionKind::Race).await.unwrap();

    assert_eq!(entries.len(), 2);
    let first = entries[0].fastest_lap.as_ref().expect("First race has laps");
    assert_eq!(first.driver_number, 1);
    assert_eq!(first.lap_number, 39);
    assert_eq!(
        first.driver.as_ref().and_then(|d| d.name_acronym.as_deref()),
        Some("VER")
    );
    assert!(entries[1].fastest_lap.is_none());

    // Second pass is served entirely from cache for the first race
    let cached = loader.fastest_lap(100).await.unwrap();
    assert_eq!(cached.as_ref(), Some(first));
}

#[tokio::test]
async fn test_fastest_laps_continue_after_session_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"session_key": 1, "date_start": "2024-05-01T10:00:00+00:00"},
            {"session_key": 2, "date_start": "2024-05-08T10:00:00+00:00"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/laps"))
        .and(query_param("session_key", "1"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/laps"))
        .and(query_param("session_key", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"session_key": 2, "driver_number": 63, "lap_number": 5, "lap_duration": 80.5}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/drivers"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let loader = loader_for(&server, MemoryStore::new());
    let entries = loader.fastest_laps(2024, SessionKind::Practice).await.unwrap();

    assert!(entries[0].fastest_lap.is_none());
    let second = entries[1].fastest_lap.as_ref().unwrap();
    assert_eq!(second.driver_number, 63);
    assert!(second.driver.is_none(), "Failed driver lookup leaves details empty");
}

#[tokio::test]
async fn test_file_backed_cache_persists_across_loaders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(practice_payload(2025)))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let first = loader_for(&server, FileStore::with_dir(temp_dir.path().to_path_buf()));
    first.practice_sessions(2025).await.unwrap();

    let second = loader_for(&server, FileStore::with_dir(temp_dir.path().to_path_buf()));
    let sessions = second.practice_sessions(2025).await.unwrap();

    assert_eq!(sessions.len(), 1);
    assert!(temp_dir
        .path()
        .join("entries")
        .join("f1PracticeSessions_2025.json")
        .exists());
}

#[tokio::test]
async fn test_uncached_session_lookups_are_paced() {
    let server = MockServer::start().await;
    mount_three_sessions(&server).await;
    // No timed laps, so no driver lookups and no pause inside a session
    Mock::given(method("GET"))
        .and(path("/v1/laps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(3)
        .mount(&server)
        .await;

    let loader = paced_loader_for(&server, MemoryStore::new(), Duration::from_millis(50));
    let start = Instant::now();
    let entries = loader.fastest_laps(2024, SessionKind::Practice).await.unwrap();

    assert_eq!(entries.len(), 3);
    // One pause before each lookup after the first
    assert!(
        start.elapsed() >= Duration::from_millis(100),
        "elapsed {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_cached_session_lookups_are_not_paced() {
    let server = MockServer::start().await;
    mount_three_sessions(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/laps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let loader = paced_loader_for(&server, MemoryStore::new(), Duration::from_millis(1000));
    for session_key in 1..=3 {
        let lap = FastestLap {
            session_key,
            driver_number: 44,
            lap_number: 10,
            lap_duration: 90.0 + session_key as f64,
            driver: None,
        };
        loader.cache().set(&fastest_lap_key(session_key), &lap).unwrap();
    }

    let start = Instant::now();
    let entries = loader.fastest_laps(2024, SessionKind::Practice).await.unwrap();

    assert!(entries.iter().all(|e| e.fastest_lap.is_some()));
    assert!(
        start.elapsed() < Duration::from_millis(1000),
        "warm cache should not pause, elapsed {:?}",
        start.elapsed()
    );
}
