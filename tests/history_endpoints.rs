//! Integration tests for the history endpoints and result persistence,
//! with Supabase's PostgREST API mocked by `wiremock`.

use std::collections::HashMap;
use std::time::Duration;

use actix_web::{App, http::StatusCode, http::header::CONTENT_TYPE, test, web};
use deepfake_server::{AppState, DetectorConfig, ServerConfig, handlers};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn state(mock: &MockServer, vars: &[(&str, String)]) -> AppState {
    state_with_store_timeout(mock, vars, Duration::from_secs(5))
}

fn state_with_store_timeout(
    mock: &MockServer,
    vars: &[(&str, String)],
    store_timeout: Duration,
) -> AppState {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let server = ServerConfig::from_lookup(|key| map.get(key).cloned()).expect("valid config");
    let detector = DetectorConfig {
        api_key: Some("test-key".to_string()),
        preferred_model: Some("m1".to_string()),
        fallback_models: Vec::new(),
        api_bases: vec![format!("{}/v1beta", mock.uri())],
        endpoint_override: None,
        probe_budget: Some(Duration::from_secs(10)),
        attempt_timeout: Duration::from_secs(5),
        store_timeout,
    };
    AppState::new(detector, &server).expect("state builds")
}

fn supabase_vars(mock: &MockServer) -> Vec<(&'static str, String)> {
    vec![
        ("SUPABASE_URL", mock.uri()),
        ("SUPABASE_SERVICE_ROLE_KEY", "service-key".to_string()),
    ]
}

async fn call(state: AppState, req: test::TestRequest) -> (StatusCode, Value) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(handlers::configure_routes),
    )
    .await;
    let resp = test::call_service(&app, req.to_request()).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

#[actix_web::test]
async fn test_history_unavailable_without_store() {
    let mock = MockServer::start().await;

    let (status, body) = call(state(&mock, &[]), test::TestRequest::get().uri("/api/history")).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"], "Supabase not configured on server");

    let (status, _) = call(state(&mock, &[]), test::TestRequest::delete().uri("/api/history")).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[actix_web::test]
async fn test_history_rejects_out_of_range_limit() {
    let mock = MockServer::start().await;
    let (status, _) = call(
        state(&mock, &supabase_vars(&mock)),
        test::TestRequest::get().uri("/api/history?limit=500"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_history_malformed_limit_is_json_error() {
    let mock = MockServer::start().await;
    let (status, body) = call(
        state(&mock, &supabase_vars(&mock)),
        test::TestRequest::get().uri("/api/history?limit=abc"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_history_lists_newest_first() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/file_results"))
        .and(header("apikey", "service-key"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 9, "file": "b.mp4", "result": "Fake", "confidence": 0.7, "created_at": "2024-05-02T09:00:00+00:00" },
            { "id": 8, "file": "a.png", "result": "Real", "confidence": 0.6, "created_at": "2024-05-01T09:00:00+00:00" }
        ])))
        .expect(1)
        .mount(&mock)
        .await;

    let (status, body) = call(
        state(&mock, &supabase_vars(&mock)),
        test::TestRequest::get().uri("/api/history?limit=2"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], 9);
    assert_eq!(body["data"][1]["file"], "a.png");
}

#[actix_web::test]
async fn test_history_tolerates_null_columns() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/file_results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 4, "file": "c.png", "result": "Real", "confidence": 0.9, "created_at": "2024-05-02T09:00:00+00:00" },
            { "id": 3, "file": "d.png", "result": null, "confidence": null, "created_at": null }
        ])))
        .mount(&mock)
        .await;

    let (status, body) = call(
        state(&mock, &supabase_vars(&mock)),
        test::TestRequest::get().uri("/api/history"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"][1]["id"], 3);
    assert_eq!(body["data"][1]["confidence"], 0.0);
}

#[actix_web::test]
async fn test_history_store_failure_is_server_error() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/file_results"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock)
        .await;

    let (status, _) = call(
        state(&mock, &supabase_vars(&mock)),
        test::TestRequest::get().uri("/api/history"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn test_clear_history_reports_count() {
    let mock = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/file_results"))
        .and(query_param("id", "neq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "file": "a.png", "result": "Real", "confidence": 0.5 },
            { "id": 2, "file": "b.png", "result": "Fake", "confidence": 0.9 }
        ])))
        .expect(1)
        .mount(&mock)
        .await;

    let (status, body) = call(
        state(&mock, &supabase_vars(&mock)),
        test::TestRequest::delete().uri("/api/history"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "deleted": true, "count": 2 }));
}

#[actix_web::test]
async fn test_detect_persists_when_enabled() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/m1:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [ { "content": { "parts": [
                { "text": "{\"result\": \"Real\", \"confidence\": 0.66}" }
            ] } } ]
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/file_results"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 42,
            "file": "face.png",
            "result": "Real",
            "confidence": 0.66,
            "created_at": "2024-05-03T12:00:00+00:00"
        }])))
        .expect(1)
        .mount(&mock)
        .await;

    let mut vars = supabase_vars(&mock);
    vars.push(("SUPABASE_ENABLE", "true".to_string()));

    let (status, body) = call(state(&mock, &vars), upload_png("----history-boundary")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Real");
    assert_eq!(body["id"], 42);
    assert!(body["created_at"].is_string());
}

fn upload_png(boundary: &str) -> test::TestRequest {
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"face.png\"\r\n\
         Content-Type: image/png\r\n\r\npng\r\n--{boundary}--\r\n"
    );
    test::TestRequest::post()
        .uri("/api/detect")
        .insert_header((CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}")))
        .set_payload(body)
}

#[actix_web::test]
async fn test_detect_returns_unstored_result_when_store_stalls() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/m1:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [ { "content": { "parts": [
                { "text": "{\"result\": \"Fake\", \"confidence\": 0.71}" }
            ] } } ]
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/file_results"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([{ "id": 1, "file": "face.png", "result": "Fake", "confidence": 0.71 }]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock)
        .await;

    let mut vars = supabase_vars(&mock);
    vars.push(("SUPABASE_ENABLE", "true".to_string()));
    let app_state = state_with_store_timeout(&mock, &vars, Duration::from_millis(300));

    let started = std::time::Instant::now();
    let (status, body) = call(app_state, upload_png("----stall-boundary")).await;

    assert!(started.elapsed() < Duration::from_secs(8), "took {:?}", started.elapsed());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Fake");
    assert_eq!(body["confidence"], 0.71);
    assert!(body.get("id").is_none());
}
