//! HTTP-level tests: a real listener on a random port, upstreams mocked with wiremock.

use edgecast_core::Config;
use edgecast_weather::MemoryCacheStore;
use std::net::SocketAddr;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_app(config: Config) -> SocketAddr {
    let store = Arc::new(MemoryCacheStore::new());
    let app = edgecast_server::app(&config, store).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.upstream.geolocation_url = server.uri();
    config.upstream.weather_url = server.uri();
    config
}

async fn mount_forecast(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "timezone": "Europe/Paris",
            "current_weather": {"temperature": 15, "weathercode": 1, "windspeed": 2},
            "hourly": {"relativehumidity_2m": [50]}
        })))
        .mount(server)
        .await;
}

async fn mount_location(server: &MockServer, ip: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/json/", ip)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 48.85, "longitude": 2.35, "country_name": "France", "city": "Paris"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_weather_live_then_cached() {
    let server = MockServer::start().await;
    mount_location(&server, "1.2.3.4", 1).await;
    mount_forecast(&server).await;

    let addr = spawn_app(config_for(&server)).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/api/weather", addr);

    let first = client
        .get(&url)
        .header("x-real-ip", "1.2.3.4")
        .send()
        .await
        .unwrap();

    assert_eq!(first.status(), 200);
    assert_eq!(
        first.headers()["cache-control"].to_str().unwrap(),
        "public, max-age=300"
    );
    assert!(first.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: serde_json::Value = first.json().await.unwrap();
    assert_eq!(body["ip"], "1.2.3.4");
    assert_eq!(body["city"], "Paris");
    assert_eq!(body["timezone"], "Europe/Paris");
    assert_eq!(body["source"], "api-call");
    assert_eq!(body["cached"], false);
    assert!(body["latency"].is_u64());

    let second: serde_json::Value = client
        .get(&url)
        .header("x-forwarded-for", "1.2.3.4, 172.16.0.1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(second["source"], "edge-cache");
    assert_eq!(second["cached"], true);
    assert_eq!(second["weather"], body["weather"]);
    assert_eq!(second["timestamp"], body["timestamp"]);
}

#[tokio::test]
async fn test_weather_without_headers_uses_default_ip() {
    let server = MockServer::start().await;
    mount_location(&server, "8.8.8.8", 1).await;
    mount_forecast(&server).await;

    let addr = spawn_app(config_for(&server)).await;
    let body: serde_json::Value = reqwest::get(format!("http://{}/api/weather", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["ip"], "8.8.8.8");
}

#[tokio::test]
async fn test_weather_fallback_is_still_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let addr = spawn_app(config_for(&server)).await;
    let response = reqwest::Client::new()
        .get(format!("http://{}/api/weather", addr))
        .header("x-real-ip", "1.2.3.4")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("cache-control").is_none());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["cached"], false);
    assert_eq!(body["city"], "北京");
    assert_eq!(body["weather"]["description"], "晴朗");
    assert!(body["error"].is_string());
    assert!(body["timestamp"].is_i64());
    assert!(body["latitude"].is_f64());
}

#[tokio::test]
async fn test_health() {
    let addr = spawn_app(Config::default()).await;
    let text = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn test_static_page_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>edgecast</h1>").unwrap();

    let mut config = Config::default();
    config.server.static_dir = Some(dir.path().to_path_buf());

    let addr = spawn_app(config).await;
    let text = reqwest::get(format!("http://{}/", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(text, "<h1>edgecast</h1>");
}
