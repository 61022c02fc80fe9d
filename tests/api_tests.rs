//! Integration tests for the HTTP collaborators using wiremock.

use city_weather::api::{ApiClient, ApiError, Endpoints};
use city_weather::search::{PageRequest, fetch_page};
use city_weather::state::Units;
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(Endpoints::with_base(&server.uri()), "test-key").unwrap()
}

fn record(name: &str, country: &str, timezone: &str) -> serde_json::Value {
    serde_json::json!({
        "fields": { "name": name, "cou_name_en": country, "timezone": timezone }
    })
}

fn current(name: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "coord": { "lat": 38.72, "lon": -9.14 },
        "main": {
            "temp": temp,
            "feels_like": temp - 1.0,
            "temp_min": temp - 4.0,
            "temp_max": temp + 3.0,
            "humidity": 60,
            "pressure": 1015
        },
        "weather": [{ "id": 801, "description": "few clouds" }],
        "wind": { "speed": 4.1 }
    })
}

fn forecast(slots: usize) -> serde_json::Value {
    let list: Vec<_> = (0..slots)
        .map(|i| {
            serde_json::json!({
                "dt": 1_714_564_800 + i as i64 * 3 * 3600,
                "main": { "temp_min": 10.0 + i as f64, "temp_max": 20.0 + i as f64 },
                "weather": [{ "id": 500, "description": format!("slot {i}") }]
            })
        })
        .collect();
    serde_json::json!({ "list": list })
}

async fn mount_search(server: &MockServer, q: &str, records: Vec<serde_json::Value>, nhits: u64) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": records,
            "nhits": nhits
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Search pages
// ============================================================================

#[tokio::test]
async fn test_fetch_page_enriches_cities() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "lis",
        vec![
            record("Lisbon", "Portugal", "Europe/Lisbon"),
            record("Lisburn", "United Kingdom", "Europe/London"),
        ],
        45,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Lisbon"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current("Lisbon", 20.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Lisburn"))
        .respond_with(ResponseTemplate::new(404).set_body_string("city not found"))
        .mount(&server)
        .await;

    let request = PageRequest {
        query: "lis".into(),
        page: 1,
        generation: 1,
    };
    let result = fetch_page(&client(&server), &request).await.unwrap();

    assert_eq!(result.total, 45);
    assert!(result.has_more);
    assert_eq!(result.cities.len(), 2);
    assert_eq!(result.cities[0].high_temp, Some(23.0));
    assert_eq!(result.cities[0].low_temp, Some(16.0));
    assert_eq!(result.cities[1].name, "Lisburn");
    assert_eq!(result.cities[1].high_temp, None);
}

#[tokio::test]
async fn test_enrichment_runs_concurrently_and_keeps_order() {
    let server = MockServer::start().await;
    let names = ["Porto", "Portimao", "Portalegre", "Porto Santo"];
    mount_search(
        &server,
        "por",
        names
            .iter()
            .map(|name| record(name, "Portugal", "Europe/Lisbon"))
            .collect(),
        4,
    )
    .await;

    // Slowest first, so completion order is the reverse of page order
    for (i, name) in names.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", *name))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(current(name, 10.0 + i as f64))
                    .set_delay(Duration::from_millis(700 - i as u64 * 200)),
            )
            .mount(&server)
            .await;
    }

    let request = PageRequest {
        query: "por".into(),
        page: 1,
        generation: 1,
    };
    let started = Instant::now();
    let result = fetch_page(&client(&server), &request).await.unwrap();
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(1400),
        "enrichment took {:?}",
        elapsed
    );
    let got: Vec<_> = result.cities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(got, names.to_vec());
    let highs: Vec<_> = result.cities.iter().map(|c| c.high_temp).collect();
    assert_eq!(highs, vec![Some(13.0), Some(14.0), Some(15.0), Some(16.0)]);
}

#[tokio::test]
async fn test_enrichment_missing_fields_leaves_city_bare() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "fun",
        vec![record("Funchal", "Portugal", "Atlantic/Madeira")],
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Funchal",
            "main": { "temp": 21.0, "temp_min": 18.0 }
        })))
        .mount(&server)
        .await;

    let request = PageRequest {
        query: "fun".into(),
        page: 1,
        generation: 1,
    };
    let result = fetch_page(&client(&server), &request).await.unwrap();

    assert_eq!(result.cities.len(), 1);
    assert_eq!(result.cities[0].high_temp, None);
    assert_eq!(result.cities[0].low_temp, None);
}

#[tokio::test]
async fn test_browse_page_sorts_by_population() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("sort", "population"))
        .and(query_param("rows", "50"))
        .and(query_param("start", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [record("Tokyo", "Japan", "Asia/Tokyo")],
            "nhits": 100
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let request = PageRequest {
        query: String::new(),
        page: 2,
        generation: 3,
    };
    let result = fetch_page(&client(&server), &request).await.unwrap();

    assert_eq!(result.cities.len(), 1);
    assert!(!result.has_more);
}

#[tokio::test]
async fn test_search_failure_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server).search_cities("x", 20, 0).await;
    assert!(matches!(result, Err(ApiError::Request(_))));
}

// ============================================================================
// Suggestions
// ============================================================================

#[tokio::test]
async fn test_suggestions_are_distinct() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "San"))
        .and(query_param("rows", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [
                record("San Jose", "Costa Rica", "America/Costa_Rica"),
                record("San Jose", "United States", "America/Los_Angeles"),
                record("Santiago", "Chile", "America/Santiago"),
            ],
            "nhits": 3
        })))
        .mount(&server)
        .await;

    let names = client(&server).fetch_suggestions("San").await.unwrap();
    assert_eq!(names, vec!["San Jose".to_string(), "Santiago".to_string()]);
}

#[tokio::test]
async fn test_blank_suggestion_term_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let names = client(&server).fetch_suggestions("   ").await.unwrap();
    assert!(names.is_empty());
}

// ============================================================================
// Detail weather
// ============================================================================

#[tokio::test]
async fn test_city_weather_with_forecast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Lisbon"))
        .and(query_param("units", "imperial"))
        .and(query_param("appid", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current("Lisbon", 68.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", "Lisbon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast(40)))
        .mount(&server)
        .await;

    let weather = client(&server)
        .fetch_city_weather("Lisbon", Units::Imperial)
        .await
        .unwrap();

    assert_eq!(weather.current.name, "Lisbon");
    assert_eq!(weather.current.temp, 68.0);
    assert_eq!(weather.current.condition_id, Some(801));
    assert_eq!(weather.forecast.len(), 5);
    assert_eq!(weather.forecast[1].description, "slot 8");
    assert_eq!(weather.forecast[1].high, 28.0);
}

#[tokio::test]
async fn test_city_weather_failure_messages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current("Lisbon", 20.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_city_weather("Lisbon", Units::Metric)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch forecast");

    let err = client(&server)
        .fetch_city_weather("  ", Units::Metric)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid city name.");
}

#[tokio::test]
async fn test_coords_weather_error_includes_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "1.5"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast(8)))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_coords_weather(1.5, 2.5, Units::Metric)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Weather API error (401): Invalid API key");
}

// ============================================================================
// Reverse geocoding and geolocation
// ============================================================================

#[tokio::test]
async fn test_reverse_geocode_prefers_city_then_town() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": { "town": "Sintra", "village": "Colares" }
        })))
        .mount(&server)
        .await;

    let place = client(&server).reverse_geocode(38.8, -9.39).await;
    assert_eq!(place, "Sintra");
}

#[tokio::test]
async fn test_reverse_geocode_falls_back_to_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let place = client(&server).reverse_geocode(38.72256, -9.139337).await;
    assert_eq!(place, "38.7226, -9.1393");
}

#[tokio::test]
async fn test_geolocate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "lat": 41.15,
            "lon": -8.61
        })))
        .mount(&server)
        .await;

    let position = client(&server).geolocate().await.unwrap();
    assert_eq!(position, (41.15, -8.61));
}

#[tokio::test]
async fn test_geolocate_missing_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "fail" })),
        )
        .mount(&server)
        .await;

    let err = client(&server).geolocate().await.unwrap_err();
    assert!(matches!(err, ApiError::MissingField("lat")));
}
