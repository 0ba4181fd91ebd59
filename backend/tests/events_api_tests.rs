//! HTTP tests for the child event endpoints, role guards and origin policy.

#![cfg(feature = "http-server")]

mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use dreamers::api::DocumentId;
use dreamers::db::FullRepository;
use dreamers::http::{create_router, AppState, GatewaySessionResolver};
use std::sync::Arc;

fn app(repo: Arc<dyn FullRepository>) -> Router {
    create_router(
        AppState::new(repo).with_sessions(GatewaySessionResolver::new(support::TEST_SECRET)),
    )
}

fn request(method: Method, uri: &str, role: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder
            .header("x-gateway-secret", support::TEST_SECRET)
            .header("x-user-id", "coach-1")
            .header("x-user-role", role);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

fn events_uri(child_id: DocumentId) -> String {
    format!("/api/children/{}/events", child_id)
}

#[tokio::test]
async fn test_create_event_returns_201_with_defaults() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            &events_uri(child_id),
            Some("pro"),
            Some(r#"{"type":"sleep_start","startTime":"2024-01-01T20:00:00.000Z"}"#),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let event = &body["event"];
    assert_eq!(event["source"], "manual");
    assert_eq!(event["type"], "sleep_start");
    assert_eq!(event["startTime"], "2024-01-01T20:00:00.000Z");
    assert_eq!(event["childId"], child_id.to_hex());
    assert!(event.get("endTime").is_none());
    assert!(event.get("parentEventId").is_none());
    assert_eq!(event["id"].as_str().unwrap().len(), 24);
}

#[tokio::test]
async fn test_list_events_envelope() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);

    for start in ["2024-01-02T06:00:00Z", "2024-01-01T20:00:00Z"] {
        let body = json!({"type": "sleep_start", "startTime": start}).to_string();
        let (status, _) = send(
            &router,
            request(Method::POST, &events_uri(child_id), Some("admin"), Some(&body)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &router,
        request(Method::GET, &events_uri(child_id), Some("pro"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["limit"], 500);
    assert_eq!(body["events"][0]["startTime"], "2024-01-01T20:00:00.000Z");
}

#[tokio::test]
async fn test_list_query_errors() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);
    let base = events_uri(child_id);

    let cases = [
        (format!("{base}?from=%20%20"), "from must not be empty"),
        (format!("{base}?to=yesterday"), "to must be a valid ISO date"),
        (
            format!("{base}?from=2024-01-02T00:00:00Z&to=2024-01-01T00:00:00Z"),
            "from must be earlier than to",
        ),
        (format!("{base}?type=nap"), "Invalid event type"),
    ];

    for (uri, expected) in cases {
        let (status, body) = send(&router, request(Method::GET, &uri, Some("pro"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], expected, "{uri}");
    }
}

#[tokio::test]
async fn test_invalid_child_id_and_missing_child() {
    let (_, repo) = support::local_repo();
    let router = app(repo);

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/children/not-an-id/events", Some("pro"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid childId");

    let (status, body) = send(
        &router,
        request(Method::GET, &events_uri(DocumentId::generate()), Some("pro"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Child not found");
}

#[tokio::test]
async fn test_create_payload_errors() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);
    let uri = events_uri(child_id);

    let cases = [
        ("{not json", "Invalid JSON payload"),
        ("[1,2]", "Payload must be an object"),
        (
            r#"{"type":"night_wake","startTime":"2024-01-01T20:00:00Z","parentEventId":"xyz"}"#,
            "parentEventId must be a valid identifier",
        ),
        (
            r#"{"type":"sleep_start","startTime":"2024-01-01T20:00:00Z","meta":"nope"}"#,
            "meta must be an object",
        ),
    ];

    for (payload, expected) in cases {
        let (status, body) =
            send(&router, request(Method::POST, &uri, Some("pro"), Some(payload))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["error"], expected, "{payload}");
    }
}

#[tokio::test]
async fn test_create_validation_failure_lists_details() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            &events_uri(child_id),
            Some("pro"),
            Some(r#"{"type":"sleep_start","startTime":"2024-01-01T20:00:00Z","endTime":"2024-01-01T19:00:00Z"}"#),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid event payload");
    assert_eq!(body["details"], json!(["endTime: must be later than startTime"]));
}

#[tokio::test]
async fn test_missing_parent_is_400() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);
    let body = json!({
        "type": "night_wake",
        "startTime": "2024-01-02T02:00:00Z",
        "parentEventId": DocumentId::generate().to_hex()
    })
    .to_string();

    let (status, body) = send(
        &router,
        request(Method::POST, &events_uri(child_id), Some("pro"), Some(&body)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "parentEventId not found for the provided child");
}

#[tokio::test]
async fn test_night_wake_flow() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);
    let uri = events_uri(child_id);

    let (_, block) = send(
        &router,
        request(
            Method::POST,
            &uri,
            Some("pro"),
            Some(r#"{"type":"sleep_start","startTime":"2024-01-01T20:00:00Z"}"#),
        ),
    )
    .await;
    let block_id = block["event"]["id"].as_str().unwrap().to_string();

    let inside = json!({
        "type": "night_wake",
        "startTime": "2024-01-02T02:00:00Z",
        "parentEventId": block_id
    })
    .to_string();
    let (status, body) = send(&router, request(Method::POST, &uri, Some("pro"), Some(&inside))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["event"]["parentEventId"], block_id.as_str());

    let before = json!({
        "type": "night_wake",
        "startTime": "2024-01-01T19:00:00Z",
        "parentEventId": block_id
    })
    .to_string();
    let (status, body) = send(&router, request(Method::POST, &uri, Some("pro"), Some(&before))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().unwrap();
    assert!(details
        .iter()
        .any(|d| d.as_str().unwrap().starts_with("startTime:")));
}

#[tokio::test]
async fn test_patch_flow() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);

    let (_, created) = send(
        &router,
        request(
            Method::POST,
            &events_uri(child_id),
            Some("pro"),
            Some(r#"{"type":"sleep_start","startTime":"2024-01-01T20:00:00Z","endTime":"2024-01-02T06:00:00Z"}"#),
        ),
    )
    .await;
    let event_uri = format!(
        "{}/{}",
        events_uri(child_id),
        created["event"]["id"].as_str().unwrap()
    );

    let (status, body) = send(
        &router,
        request(Method::PATCH, &event_uri, Some("pro"), Some(r#"{"endTime":null}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["event"].get("endTime").is_none());
    assert!(body["event"]["updatedAt"].is_string());

    let (status, body) = send(
        &router,
        request(Method::PATCH, &event_uri, Some("pro"), Some("{}")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payload must not be empty");

    let (status, body) = send(
        &router,
        request(
            Method::PATCH,
            &event_uri,
            Some("pro"),
            Some(r#"{"childId":"x","notes":"y","source":"sensor"}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported fields in payload");
    assert_eq!(body["fields"], json!(["childId", "notes"]));

    let (status, body) = send(
        &router,
        request(Method::PATCH, &event_uri, Some("pro"), Some(r#"{"startTime":12}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "startTime must be an ISO string");
}

#[tokio::test]
async fn test_patch_shape_errors_precede_lookup() {
    let (_, repo) = support::local_repo();
    let router = app(repo);
    // Neither child nor event exist; the payload error still wins.
    let uri = format!(
        "/api/children/{}/events/{}",
        DocumentId::generate(),
        DocumentId::generate()
    );

    let (status, body) = send(
        &router,
        request(Method::PATCH, &uri, Some("pro"), Some(r#"{"type":"nap"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid event type");

    let (status, body) = send(
        &router,
        request(Method::PATCH, "/api/children/abc/events/def", Some("pro"), Some("{}")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid childId");
}

#[tokio::test]
async fn test_patch_unknown_event_is_404() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);
    let uri = format!("{}/{}", events_uri(child_id), DocumentId::generate());

    let (status, body) = send(
        &router,
        request(Method::PATCH, &uri, Some("pro"), Some(r#"{"source":"imported"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");
}

#[tokio::test]
async fn test_role_guards() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);
    let uri = events_uri(child_id);

    let (status, body) = send(&router, request(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized"}));

    let (status, body) = send(&router, request(Method::GET, &uri, Some("user"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "Forbidden"}));

    // Unknown roles resolve to the lowest one.
    let (status, _) = send(&router, request(Method::GET, &uri, Some("coach"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &router,
        request(Method::GET, "/api/users/debug", Some("pro"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_forged_identity_without_secret_is_unauthorized() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);

    let req = Request::builder()
        .uri(events_uri(child_id))
        .header("x-gateway-secret", "wrong")
        .header("x-user-id", "intruder")
        .header("x-user-role", "admin")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_origin_policy() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);

    let mut req = request(Method::GET, &events_uri(child_id), Some("pro"), None);
    req.headers_mut()
        .insert("origin", "https://evil.example".parse().unwrap());
    let response = router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response
            .headers()
            .get("strict-transport-security")
            .unwrap(),
        "max-age=63072000; includeSubDomains; preload"
    );
    assert_eq!(body_json(response).await, json!({"error": "Forbidden origin"}));

    let mut req = request(Method::GET, &events_uri(child_id), Some("pro"), None);
    req.headers_mut().insert(
        "origin",
        "https://happy-dreamers-pr-7.vercel.app".parse().unwrap(),
    );
    let response = router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "https://happy-dreamers-pr-7.vercel.app"
    );
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn test_preflight_is_204_without_session() {
    let (_, repo) = support::local_repo();
    let router = app(repo);

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/children/65e0e6335dffb466f21a1c01/events")
        .header("origin", "https://happy-dreamers.app")
        .header("access-control-request-headers", "content-type, x-user-id")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-headers")
            .unwrap(),
        "content-type, x-user-id"
    );
    assert!(response
        .headers()
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("PATCH"));
}

#[tokio::test]
async fn test_same_origin_request_skips_cors() {
    let (_, repo) = support::local_repo();
    let child_id = support::seed_child(repo.as_ref()).await;
    let router = app(repo);

    let mut req = request(Method::GET, &events_uri(child_id), Some("pro"), None);
    req.headers_mut()
        .insert("host", "api.internal:8080".parse().unwrap());
    req.headers_mut()
        .insert("origin", "http://api.internal:8080".parse().unwrap());
    let response = router.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
