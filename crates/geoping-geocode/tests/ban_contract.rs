//! Contract Test: BAN Geocoder
//!
//! Runs the geocoder against a local stand-in for the search API.
//!
//! Constraints verified:
//! - The address is sent as the `q` parameter with `limit=1`
//! - The first feature's `[lon, lat]` becomes latitude/longitude
//! - Non-success statuses and empty results are geocoding errors

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use geoping_core::Error;
use geoping_core::traits::Geocoder;
use geoping_geocode::BanGeocoder;
use serde_json::{Value, json};
use std::collections::HashMap;

async fn search(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
    if params.get("limit").map(String::as_str) != Some("1") {
        return Err(StatusCode::BAD_REQUEST);
    }
    match params.get("q").map(String::as_str) {
        Some("8 place bellecour lyon") => Ok(Json(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [4.8320, 45.7578]},
                "properties": {"label": "8 Place Bellecour 69002 Lyon"}
            }]
        }))),
        Some("busy") => Err(StatusCode::TOO_MANY_REQUESTS),
        Some(_) => Ok(Json(json!({"type": "FeatureCollection", "features": []}))),
        None => Err(StatusCode::BAD_REQUEST),
    }
}

async fn start_stub() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/search/", get(search));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn first_match_is_returned() {
    let base = start_stub().await;
    let geocoder = BanGeocoder::with_base_url(base).unwrap();

    let result = geocoder.geocode("8 place bellecour lyon").await.unwrap();
    assert_eq!(result.latitude, 45.7578);
    assert_eq!(result.longitude, 4.8320);
    assert_eq!(result.label, "8 Place Bellecour 69002 Lyon");
}

#[tokio::test]
async fn unknown_address_is_geocode_error() {
    let base = start_stub().await;
    let geocoder = BanGeocoder::with_base_url(format!("{}/", base)).unwrap();

    let err = geocoder.geocode("221b baker street").await.unwrap_err();
    assert!(matches!(err, Error::Geocode(_)), "got {:?}", err);
}

#[tokio::test]
async fn error_status_is_geocode_error() {
    let base = start_stub().await;
    let geocoder = BanGeocoder::with_base_url(base).unwrap();

    let err = geocoder.geocode("busy").await.unwrap_err();
    assert!(matches!(err, Error::Geocode(_)));
}

#[tokio::test]
async fn empty_address_is_rejected_locally() {
    let geocoder = BanGeocoder::with_base_url("http://127.0.0.1:9").unwrap();
    let err = geocoder.geocode("   ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
