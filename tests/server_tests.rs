//! HTTP surface tests: the router is served on a local port and queried
//! with reqwest, with a fake browser behind the pipeline.


use axum::http::StatusCode;
use browser_helpers::{market_page, market_pipeline, FakeBrowser};
use feed_helpers::{local_client, spawn_app, spawn_feed};
use psx_scraper::config::Environment;
use psx_scraper::models::{ErrorResponse, HealthResponse, ScrapeResponse};
use psx_scraper::pipeline::EnrichmentPolicy;
use psx_scraper::server::{router, AppState, SERVICE_STATUS};
use serde_json::json;

async fn serve(browser: &FakeBrowser, names_url: &str, environment: Environment) -> String {
    let pipeline = market_pipeline(browser, names_url, EnrichmentPolicy::Required, 1);
    let addr = spawn_app(router(AppState::new(pipeline, environment))).await;
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health_reports_status_and_version() {
    let browser = FakeBrowser::default();
    let base = serve(&browser, "http://127.0.0.1:1/symbols", Environment::Production).await;

    let response = local_client().get(&base).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = response.json().await.unwrap();
    assert_eq!(health.status, SERVICE_STATUS);
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    // liveness never touches the browser
    assert_eq!(browser.launches(), 0);
}

#[tokio::test]
async fn test_scrape_success_payload() {
    let feed = spawn_feed(
        StatusCode::OK,
        json!([
            {"symbol": "BBB", "name": "Beta Inc"},
            {"symbol": "MARI", "name": "Mari Petroleum"}
        ]),
    )
    .await;
    let browser = FakeBrowser::serving(market_page(&[
        ("AAA", "0"),
        ("BBB", "123.4"),
        ("", "50"),
        ("MARI", "2,450.00"),
    ]));
    let base = serve(&browser, &feed.url, Environment::Production).await;

    let response = local_client()
        .get(format!("{}/api/scrape-kse100", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["stocks"][0], json!({"symbol": "BBB", "name": "Beta Inc", "price": 123.4}));
    assert!(body.get("warnings").is_none());

    let payload: ScrapeResponse = serde_json::from_value(body).unwrap();
    assert_eq!(payload.count, payload.stocks.len());
    assert_eq!(payload.count, 2);
    assert_eq!(payload.stocks[1].price, 2450.0);
    assert!(chrono::DateTime::parse_from_rfc3339(&payload.timestamp).is_ok());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_navigation_timeout_returns_generic_failure() {
    let browser = FakeBrowser::timing_out();
    let base = serve(&browser, "http://127.0.0.1:1/symbols", Environment::Production).await;

    let response = local_client()
        .get(format!("{}/api/scrape-kse100", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let payload: ErrorResponse = response.json().await.unwrap();
    assert!(!payload.success);
    assert!(payload.error.contains("Timed out"));
    assert!(payload.stack.is_none());
    assert_eq!(browser.launches(), 1);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_development_errors_carry_diagnostics() {
    let feed = spawn_feed(StatusCode::BAD_GATEWAY, json!({"error": "upstream"})).await;
    let browser = FakeBrowser::serving(market_page(&[("PSO", "170.30")]));
    let base = serve(&browser, &feed.url, Environment::Development).await;

    let response = local_client()
        .get(format!("{}/api/scrape-kse100", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let payload: ErrorResponse = response.json().await.unwrap();
    assert!(payload.error.starts_with("symbol name feed failed"));
    assert!(payload.stack.unwrap().contains("502"));
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let browser = FakeBrowser::default();
    let base = serve(&browser, "http://127.0.0.1:1/symbols", Environment::Production).await;

    let response = local_client()
        .get(&base)
        .header("Origin", "https://dashboard.example")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
