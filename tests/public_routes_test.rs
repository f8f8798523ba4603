mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;

use common::{london_trip, FixedImageSource, ScriptedProvider, TestApp};
use trip_planner_api::services::image_lookup::ImageSource;

#[actix_rt::test]
#[serial]
async fn test_health_check() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/health").to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert!(body["status"] == "ok" || body["status"] == "degraded");
    assert_eq!(body["services"]["memory"]["status"], "ok");
    assert!(body["services"]["generation"].is_object());
}

#[actix_rt::test]
#[serial]
async fn test_pending_state_round_trip() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::put()
        .uri("/api/sessions/visitor-1/pending")
        .set_json(&json!({
            "tripInput": london_trip(),
            "partialResults": [{ "name": "Porto", "country": "Portugal" }],
            "pendingFavorite": "Porto"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/sessions/visitor-1/pending")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pendingFavorite"], "Porto");
    assert_eq!(body["partialResults"][0]["name"], "Porto");
    assert_eq!(body["tripInput"]["homeCity"], "London");

    let req = test::TestRequest::get()
        .uri("/api/sessions/someone-else/pending")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri("/api/sessions/visitor-1/pending")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/sessions/visitor-1/pending")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
#[serial]
async fn test_pending_state_rejects_invalid_trip() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let mut trip = london_trip();
    trip["travelers"] = json!(0);
    let req = test::TestRequest::put()
        .uri("/api/sessions/visitor-1/pending")
        .set_json(&json!({ "tripInput": trip }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_rt::test]
#[serial]
async fn test_destination_image_found() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/destination-image?name=Porto&country=Portugal")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["url"], "https://upload.wikimedia.org/Ribeira_Porto.jpg");
}

#[actix_rt::test]
#[serial]
async fn test_destination_image_rejects_non_photos() {
    let test_app = TestApp::with_parts(
        ScriptedProvider::new(),
        vec![
            Arc::new(FixedImageSource(vec![
                "https://upload.wikimedia.org/Grandes_Armes_de_Paris_Coat_of_arms.svg.png",
            ])) as Arc<dyn ImageSource>,
            Arc::new(FixedImageSource(vec![])),
        ],
    );
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/destination-image?name=Paris&country=France")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
#[serial]
async fn test_destination_image_requires_name() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/destination-image?country=Portugal")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
#[serial]
async fn test_bad_token_is_rejected_even_on_public_routes() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
