use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use service_area_engine::api::rest::router;
use service_area_engine::state::AppState;
use tower::ServiceExt;

fn setup() -> axum::Router {
    let state = AppState::new(1024, 100, Duration::from_secs(30));
    router(Arc::new(state))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn patch_request(uri: &str, body: Value) -> Request<Body> {
    json_request("PATCH", uri, body)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_store(app: &axum::Router, name: &str, lat: f64, lng: f64) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/stores",
            json!({ "name": name, "location": { "lat": lat, "lng": lng } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn create_courier(app: &axum::Router, name: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": name, "max_delivery_km": 5.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

/// Closed square ring of roughly `half_side_deg` around a point.
fn square(lat: f64, lng: f64, half_side_deg: f64) -> Value {
    json!([
        { "lat": lat - half_side_deg, "lng": lng - half_side_deg },
        { "lat": lat - half_side_deg, "lng": lng + half_side_deg },
        { "lat": lat + half_side_deg, "lng": lng + half_side_deg },
        { "lat": lat + half_side_deg, "lng": lng - half_side_deg },
        { "lat": lat - half_side_deg, "lng": lng - half_side_deg },
    ])
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["regions"], 0);
    assert_eq!(body["stores"], 0);
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["tracked_couriers"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("tracked_couriers"));
    assert!(body.contains("notification_failures_total"));
}

#[tokio::test]
async fn store_circle_and_zone_at_same_point_match_at_zero_distance() {
    let app = setup();
    let store_id = create_store(&app, "Kadikoy", 41.0, 29.0).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/regions",
            json!({
                "type": "Circle",
                "owner_id": store_id,
                "center": { "lat": 41.0, "lng": 29.0 },
                "radius_meters": 2000.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let circle = body_json(response).await;
    assert_eq!(circle["type"], "Circle");
    assert_eq!(circle["owner_id"], store_id.as_str());
    assert!(circle["area_square_meters"].as_f64().unwrap() > 12_000_000.0);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/regions",
            json!({
                "type": "CourierZone",
                "name": "Kadikoy zone",
                "center": { "lat": 41.0, "lng": 29.0 },
                "single_package_radius_meters": 2000.0,
                "multi_package_radius_meters": 5000.0,
                "max_delivery_km": 5.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/proximity")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let analyses = body.as_array().unwrap();
    assert_eq!(analyses.len(), 1);

    let nearby = analyses[0]["nearby_stores"].as_array().unwrap();
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0]["store_id"], store_id.as_str());
    assert!(nearby[0]["distance_meters"].as_f64().unwrap() < 0.001);
    assert_eq!(nearby[0]["within_single"], true);
    assert_eq!(nearby[0]["within_multi"], true);
}

#[tokio::test]
async fn stationary_samples_produce_one_waiting_point() {
    let app = setup();
    let courier_id = create_courier(&app, "Mehmet").await;

    let offsets = [0.0, 0.00002, -0.00002, 0.00001, 0.0];
    for (i, offset) in offsets.iter().enumerate() {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/couriers/{courier_id}/samples"),
                json!({
                    "coordinate": { "lat": 39.0 + offset, "lng": 32.0 },
                    "timestamp_millis": i as i64 * 40_000
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_request(&format!("/couriers/{courier_id}/waiting-points")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["start_millis"], 0);
    assert_eq!(points[0]["end_millis"], 160_000);
    assert_eq!(points[0]["duration_millis"], 160_000);

    let response = app
        .oneshot(get_request(&format!("/couriers/{courier_id}/history")))
        .await
        .unwrap();
    let history = body_json(response).await;
    assert_eq!(history.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn out_of_order_sample_is_rejected() {
    let app = setup();
    let courier_id = create_courier(&app, "Elif").await;
    let uri = format!("/couriers/{courier_id}/samples");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "coordinate": { "lat": 39.0, "lng": 32.0 }, "timestamp_millis": 60_000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "coordinate": { "lat": 39.0, "lng": 32.0 }, "timestamp_millis": 1_000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn sample_for_unknown_courier_returns_404() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers/00000000-0000-0000-0000-000000000000/samples",
            json!({ "coordinate": { "lat": 39.0, "lng": 32.0 } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saving_two_point_polygon_keeps_editor_state() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(post_empty("/editor/sessions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    assert_eq!(session["state"]["state"], "Idle");
    let commands = format!("/editor/sessions/{}/commands", session["id"].as_str().unwrap());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &commands,
            json!({ "command": "BeginPolygon", "name": "Center", "kind": "ServiceArea" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for lng in [29.0, 29.01] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &commands,
                json!({ "command": "Click", "point": { "lat": 41.0, "lng": lng } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(json_request("POST", &commands, json!({ "command": "Save" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = body_json(response).await;
    assert!(error["error"].as_str().unwrap().contains("vertices"));

    let response = app
        .clone()
        .oneshot(get_request(&commands.replace("/commands", "")))
        .await
        .unwrap();
    let session = body_json(response).await;
    assert_eq!(session["state"]["state"], "DrawingPolygon");
    assert_eq!(session["state"]["points"].as_array().unwrap().len(), 2);

    let response = app.oneshot(get_request("/regions")).await.unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn editor_closes_polygon_on_click_near_first_point() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(post_empty("/editor/sessions"))
        .await
        .unwrap();
    let session = body_json(response).await;
    let commands = format!("/editor/sessions/{}/commands", session["id"].as_str().unwrap());

    app.clone()
        .oneshot(json_request(
            "POST",
            &commands,
            json!({ "command": "BeginPolygon", "name": "Center", "kind": "ServiceArea" }),
        ))
        .await
        .unwrap();

    let clicks = [(41.0, 29.0), (41.0, 29.01), (41.01, 29.01), (41.00005, 29.00005)];
    let mut last = Value::Null;
    for (lat, lng) in clicks {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &commands,
                json!({ "command": "Click", "point": { "lat": lat, "lng": lng } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        last = body_json(response).await;
    }

    assert_eq!(last["state"]["state"], "Idle");
    assert_eq!(last["committed"]["type"], "Polygon");
    assert_eq!(last["committed"]["vertices"].as_array().unwrap().len(), 4);

    let response = app
        .oneshot(get_request("/regions?kind=Polygon"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn undo_outside_drawing_is_a_conflict() {
    let app = setup();
    let response = app
        .clone()
        .oneshot(post_empty("/editor/sessions"))
        .await
        .unwrap();
    let session = body_json(response).await;
    let commands = format!("/editor/sessions/{}/commands", session["id"].as_str().unwrap());

    let response = app
        .oneshot(json_request("POST", &commands, json!({ "command": "Undo" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn zone_inside_block_area_is_rejected() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/regions",
            json!({ "type": "BlockArea", "name": "Airport", "vertices": square(40.0, 30.0, 0.01) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/regions",
            json!({
                "type": "CourierZone",
                "name": "Runway",
                "center": { "lat": 40.0, "lng": 30.0 },
                "single_package_radius_meters": 1000.0,
                "multi_package_radius_meters": 3000.0,
                "max_delivery_km": 5.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error = body_json(response).await;
    assert!(error["error"].as_str().unwrap().contains("Airport"));

    let response = app
        .oneshot(get_request("/regions?kind=CourierZone"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn circle_radius_bounds_are_enforced() {
    let app = setup();
    let store_id = create_store(&app, "Besiktas", 41.04, 29.0).await;

    let circle = |radius: f64| {
        json!({
            "type": "Circle",
            "owner_id": store_id,
            "center": { "lat": 41.04, "lng": 29.0 },
            "radius_meters": radius
        })
    };

    let response = app
        .clone()
        .oneshot(json_request("POST", "/regions", circle(99.9)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/regions", circle(50_000.1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/regions", circle(50_000.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(patch_request(
            &format!("/regions/{store_id}"),
            json!({ "radius_meters": 100.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["radius_meters"], 100.0);
}

#[tokio::test]
async fn circle_for_unknown_store_returns_404() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/regions",
            json!({
                "type": "Circle",
                "owner_id": "00000000-0000-0000-0000-000000000000",
                "center": { "lat": 41.0, "lng": 29.0 },
                "radius_meters": 2000.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn coverage_reports_block_areas() {
    let app = setup();

    for (kind, name, half_side) in [("Polygon", "City", 0.1), ("BlockArea", "Port", 0.01)] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/regions",
                json!({ "type": kind, "name": name, "vertices": square(38.0, 27.0, half_side) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_request("/coverage?lat=38.05&lng=27.05"))
        .await
        .unwrap();
    let report = body_json(response).await;
    assert_eq!(report["deliverable"], true);

    let response = app
        .clone()
        .oneshot(get_request("/coverage?lat=38.0&lng=27.0"))
        .await
        .unwrap();
    let report = body_json(response).await;
    assert_eq!(report["deliverable"], false);
    assert_eq!(report["blocked_by"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get_request("/coverage?lat=91.0&lng=27.0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn missing_region_returns_404() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(get_request("/regions/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/regions/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tracking_stop_is_idempotent() {
    let app = setup();
    let courier_id = create_courier(&app, "Can").await;

    let response = app
        .clone()
        .oneshot(post_empty(&format!("/couriers/{courier_id}/tracking/start")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["tracking"], true);

    let response = app
        .clone()
        .oneshot(get_request("/health"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["tracked_couriers"], 1);

    for expected_change in [true, false] {
        let response = app
            .clone()
            .oneshot(post_empty(&format!("/couriers/{courier_id}/tracking/stop")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["tracking"], false);
        assert_eq!(body["changed"], expected_change);
    }
}

#[tokio::test]
async fn going_offline_stops_tracking() {
    let app = setup();
    let courier_id = create_courier(&app, "Deniz").await;

    app.clone()
        .oneshot(post_empty(&format!("/couriers/{courier_id}/tracking/start")))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(patch_request(
            &format!("/couriers/{courier_id}/status"),
            json!({ "status": "Offline" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "Offline");

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(body_json(response).await["tracked_couriers"], 0);
}

#[tokio::test]
async fn create_store_with_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/stores", json!({ "name": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sample_timestamps_outside_clock_window_return_422() {
    let app = setup();
    let courier_id = create_courier(&app, "Selin").await;
    let uri = format!("/couriers/{courier_id}/samples");
    let next_day = chrono::Utc::now().timestamp_millis() + 86_400_000;

    for timestamp_millis in [i64::MIN, -1, next_day, i64::MAX] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &uri,
                json!({
                    "coordinate": { "lat": 39.0, "lng": 32.0 },
                    "timestamp_millis": timestamp_millis
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let response = app
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "coordinate": { "lat": 39.0, "lng": 32.0 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn going_offline_drops_waiting_point_series() {
    let app = setup();
    let courier_id = create_courier(&app, "Burak").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/couriers/{courier_id}/samples"),
            json!({ "coordinate": { "lat": 39.0, "lng": 32.0 }, "timestamp_millis": 0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get_request("/metrics")).await.unwrap();
    assert!(body_string(response).await.contains(&courier_id));

    app.clone()
        .oneshot(patch_request(
            &format!("/couriers/{courier_id}/status"),
            json!({ "status": "Offline" }),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert!(!body_string(response).await.contains(&courier_id));
}
