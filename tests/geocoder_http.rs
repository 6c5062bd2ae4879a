//! HTTP geocoder against a local stand-in for the geocoding service

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use serde_json::{Value, json};

use skillshop::config::GeocoderConfig;
use skillshop::{Coordinates, GeocodeError, Geocoder, NominatimGeocoder};

const CLIENT_ID: &str = "skillshop-test";

async fn fake_search(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if agent != CLIENT_ID {
        return Err(StatusCode::FORBIDDEN);
    }

    match params.get("q").map(String::as_str) {
        Some("Leeds") => Ok(Json(json!([
            {"lat": "53.7996", "lon": "-1.5491", "display_name": "Leeds, West Yorkshire, England"},
            {"lat": "33.5487", "lon": "-86.5444", "display_name": "Leeds, Alabama"}
        ]))),
        Some("SW1A 1AA") => Ok(Json(json!([
            {"lat": "51.5010", "lon": "-0.1416", "display_name": "Buckingham Palace"}
        ]))),
        Some("slow") => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(Json(json!([])))
        }
        Some("broken") => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Ok(Json(json!([]))),
    }
}

async fn spawn_fake_service() -> String {
    let app = Router::new().route("/search", get(fake_search));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn geocoder() -> NominatimGeocoder {
    let config = GeocoderConfig {
        base_url: spawn_fake_service().await,
        client_id: CLIENT_ID.to_string(),
        timeout_seconds: 1,
        max_retries: 0,
    };
    NominatimGeocoder::new(&config).unwrap()
}

#[tokio::test]
async fn test_resolves_first_match() {
    let geocoder = geocoder().await;
    let coords = geocoder.resolve("Leeds").await.unwrap();
    assert_eq!(coords, Coordinates::new(53.7996, -1.5491));
}

#[tokio::test]
async fn test_postcode_with_space_is_encoded() {
    let geocoder = geocoder().await;
    let coords = geocoder.resolve("  SW1A 1AA ").await.unwrap();
    assert_eq!(coords, Coordinates::new(51.5010, -0.1416));
}

#[tokio::test]
async fn test_no_match() {
    let geocoder = geocoder().await;
    let err = geocoder.resolve("Atlantis").await.unwrap_err();
    assert_eq!(
        err,
        GeocodeError::NoMatch {
            query: "Atlantis".to_string()
        }
    );
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let geocoder = geocoder().await;
    let err = geocoder.resolve("broken").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Unavailable { .. }));
}

#[tokio::test]
async fn test_timeout_is_unavailable() {
    let geocoder = geocoder().await;
    let started = std::time::Instant::now();
    let err = geocoder.resolve("slow").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Unavailable { .. }));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    let config = GeocoderConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        client_id: CLIENT_ID.to_string(),
        timeout_seconds: 1,
        max_retries: 0,
    };
    let geocoder = NominatimGeocoder::new(&config).unwrap();
    let err = geocoder.resolve("Leeds").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Unavailable { .. }));
}
