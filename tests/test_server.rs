//! End-to-end tests for the HTTP surface, driven through the router with
//! stubbed detection backends.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use roadwatch::server::{AppState, router};
use tower::ServiceExt;

const BOUNDARY: &str = "roadwatch-test-boundary";

async fn test_app(pothole_confs: &[f32], waste_confs: &[f32]) -> (Router, tempfile::TempDir) {
    let (db, dir) = create_test_store().await;
    let state = AppState {
        detector: make_detector(pothole_confs, waste_confs),
        db,
    };
    (router(state), dir)
}

fn multipart_body(image_bytes: &[u8], latitude: Option<f64>, longitude: Option<f64>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"upload.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(image_bytes);
    body.extend_from_slice(b"\r\n");

    for (name, value) in [("latitude", latitude), ("longitude", longitude)] {
        if let Some(value) = value {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn detect_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = test_app(&[], &[]).await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_detect_submits_a_report() {
    let (app, _dir) = test_app(&[0.8], &[]).await;

    let body = multipart_body(&create_test_image_png(), Some(48.137), Some(11.575));
    let response = app.clone().oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Report submitted successfully"
    );

    // The stored report comes back through the nearby query.
    let response = app
        .oneshot(
            Request::get("/api/nearby-damage-point?lat=48.137&lon=11.575&radius_km=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let items = body_json(response).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["damage_type"], "PotHole");
    assert_eq!(items[0]["latitude"], 48.137);
}

#[tokio::test]
async fn test_stored_image_is_served_over_http() {
    let (app, _dir) = test_app(&[0.8], &[]).await;

    let body = multipart_body(&create_test_image_png(), Some(48.137), Some(11.575));
    let response = app.clone().oneshot(detect_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/nearby-damage-point?lat=48.137&lon=11.575&radius_km=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let items = body_json(response).await;
    let fname = items[0]["image"].as_str().unwrap().to_owned();

    // The image reference resolves under /images/.
    let response = app
        .oneshot(
            Request::get(format!("/images/{fname}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn test_unknown_image_is_not_found() {
    let (app, _dir) = test_app(&[], &[]).await;

    let response = app
        .oneshot(
            Request::get("/images/no-such-image.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detect_without_coordinates_is_accepted() {
    let (app, _dir) = test_app(&[], &[0.6]).await;

    let body = multipart_body(&create_test_image_png(), None, None);
    let response = app.clone().oneshot(detect_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Without coordinates the report never matches a nearby query.
    let response = app
        .oneshot(
            Request::get("/api/nearby-damage-point?lat=0&lon=0&radius_km=10000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let items = body_json(response).await;
    assert_eq!(items.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_detect_rejects_undecodable_upload() {
    let (app, _dir) = test_app(&[0.8], &[]).await;

    let body = multipart_body(b"definitely not an image", None, None);
    let response = app.oneshot(detect_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("decode"));
}

#[tokio::test]
async fn test_detect_rejects_missing_file_field() {
    let (app, _dir) = test_app(&[], &[]).await;

    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"latitude\"\r\n\r\n1.0\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let response = app.oneshot(detect_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_nearby_requires_center_coordinates() {
    let (app, _dir) = test_app(&[], &[]).await;

    let response = app
        .oneshot(
            Request::get("/api/nearby-damage-point?radius_km=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
