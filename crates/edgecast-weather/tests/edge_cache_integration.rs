//! End-to-end handler behaviour against mocked geolocation and forecast services.

use edgecast_core::Config;
use edgecast_weather::{Clock, EdgeHandler, MemoryCacheStore, RecordSource};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedClock(AtomicI64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

async fn mock_upstreams() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.2.3.4/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 10, "longitude": 20, "country_name": "X", "city": "Y"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current_weather": {"temperature": 15, "weathercode": 1, "windspeed": 2},
            "hourly": {"relativehumidity_2m": [50]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    server
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.upstream.geolocation_url = server.uri();
    config.upstream.weather_url = server.uri();
    config
}

#[tokio::test]
async fn test_first_call_fetches_second_call_hits_cache() {
    let server = mock_upstreams().await;
    let store = Arc::new(MemoryCacheStore::new());
    let clock = Arc::new(FixedClock(AtomicI64::new(1_700_000_000_000)));

    let handler = EdgeHandler::from_config(&config_for(&server), store.clone())
        .unwrap()
        .with_clock(clock.clone());

    let first = serde_json::to_value(handler.handle("1.2.3.4").await).unwrap();

    assert_eq!(first["ip"], "1.2.3.4");
    assert_eq!(first["country"], "X");
    assert_eq!(first["city"], "Y");
    assert_eq!(first["latitude"], 10.0);
    assert_eq!(first["longitude"], 20.0);
    assert_eq!(
        first["weather"],
        serde_json::json!({
            "temp": 15.0,
            "feels_like": 15.0,
            "humidity": 50.0,
            "wind_speed": 2.0,
            "main": "Clear",
            "description": "基本晴朗"
        })
    );
    assert_eq!(first["cached"], false);
    assert_eq!(first["source"], "api-call");
    assert_eq!(first["timezone"], "Asia/Shanghai");
    assert!(store.peek("weather:1.2.3.4").is_some());

    clock.0.fetch_add(120_000, Ordering::SeqCst);
    let second = handler.handle("1.2.3.4").await;

    assert!(second.record.cached);
    assert_eq!(second.record.source, RecordSource::EdgeCache);

    let mut second = serde_json::to_value(second).unwrap();
    let mut first = first;
    for body in [&mut first, &mut second] {
        let obj = body.as_object_mut().unwrap();
        obj.remove("latency");
        obj.remove("cached");
        obj.remove("source");
    }
    assert_eq!(first, second);
}

async fn mount_location(server: &MockServer, ip: &str, city: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/json/", ip)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 10, "longitude": 20, "country_name": "X", "city": city
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_keys_are_per_ip() {
    let server = MockServer::start().await;
    mount_location(&server, "10.0.0.1", "Alpha").await;
    mount_location(&server, "10.0.0.2", "Beta").await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current_weather": {"temperature": 15, "weathercode": 1, "windspeed": 2},
            "hourly": {"relativehumidity_2m": [50]}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCacheStore::new());
    let clock = Arc::new(FixedClock(AtomicI64::new(1_700_000_000_000)));
    let handler = EdgeHandler::from_config(&config_for(&server), store.clone())
        .unwrap()
        .with_clock(clock);

    let first = handler.handle("10.0.0.1").await;
    assert_eq!(first.record.source, RecordSource::ApiCall);

    // a cached entry for 10.0.0.1 must not answer 10.0.0.2
    let other = handler.handle("10.0.0.2").await;
    assert_eq!(other.record.source, RecordSource::ApiCall);
    assert!(!other.record.cached);
    assert_eq!(other.record.ip, "10.0.0.2");
    assert_eq!(other.record.city, "Beta");

    let again = handler.handle("10.0.0.1").await;
    assert_eq!(again.record.source, RecordSource::EdgeCache);
    assert_eq!(again.record.city, "Alpha");

    assert_eq!(store.len(), 2);
    assert!(store.peek("weather:10.0.0.1").is_some());
    assert!(store.peek("weather:10.0.0.2").is_some());
}

#[tokio::test]
async fn test_fallback_keeps_ip_and_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCacheStore::new());
    let handler = EdgeHandler::from_config(&config_for(&server), store.clone()).unwrap();

    let a = handler.handle("10.0.0.1").await;
    let b = handler.handle("10.0.0.2").await;

    assert!(a.is_fallback());
    assert!(b.is_fallback());
    assert_eq!(a.record.ip, "10.0.0.1");
    assert_eq!(b.record.ip, "10.0.0.2");
    assert_eq!(a.record.weather, b.record.weather);
    assert!(store.is_empty());
}
