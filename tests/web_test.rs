#![cfg(feature = "web")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use barcode_desk::app::{AppState, SESSION_COOKIE, router};
use barcode_desk::config::Config;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app(dir: &TempDir) -> Router {
    test_app_with_ttl(dir, Duration::from_secs(600))
}

fn test_app_with_ttl(dir: &TempDir, session_ttl: Duration) -> Router {
    let config = Config {
        bind_addr: "127.0.0.1:0".to_string(),
        data_file: dir.path().join("barcode_database.xlsx"),
        session_ttl,
    };
    router(Arc::new(AppState::from_config(&config)))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let token = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        });
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, token, json)
}

#[tokio::test]
async fn index_page_is_served() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("Barcode Desk"));
}

#[tokio::test]
async fn full_issue_edit_delete_cycle() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, token, body) = send(&app, "POST", "/api/session", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let token = token.expect("session cookie");

    let (status, _, body) = send(&app, "POST", "/api/barcode", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let barcode = body["pending_barcode"].as_str().unwrap().to_string();
    assert!(barcode.starts_with("88061987"));

    let fields = json!({"part_code": "P-1", "name": "Shirt", "color": "Red", "size": "S"});
    let (status, _, body) = send(&app, "POST", "/api/records", Some(&token), Some(fields)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"][0]["barcode"], barcode.as_str());
    assert_eq!(body["records"][0]["name"], "Shirt");
    assert_eq!(body["pending_barcode"], Value::Null);

    let changes = json!({"color": "Green"});
    let uri = format!("/api/records/{}", barcode);
    let (status, _, body) = send(&app, "PUT", &uri, Some(&token), Some(changes)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"][0]["color"], "Green");
    assert_eq!(body["records"][0]["size"], "S");

    let (status, _, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn issue_without_barcode_is_a_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);
    let (_, token, _) = send(&app, "POST", "/api/session", None, None).await;

    let fields = json!({"part_code": "P-1"});
    let (status, _, body) = send(&app, "POST", "/api/records", token.as_deref(), Some(fields)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["notices"][0]["level"], "error");
    assert_eq!(body["notices"][0]["text"], "Generate a barcode first.");
}

#[tokio::test]
async fn edit_of_unknown_barcode_is_not_found() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);
    let (_, token, _) = send(&app, "POST", "/api/session", None, None).await;

    let (status, _, _) = send(
        &app,
        "PUT",
        "/api/records/8806198700000",
        token.as_deref(),
        Some(json!({"name": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_client_gets_conflict_until_session_ends() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);
    let (_, token, _) = send(&app, "POST", "/api/session", None, None).await;
    let token = token.unwrap();

    let (status, cookie, body) = send(&app, "POST", "/api/barcode", None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(cookie, None);
    assert_eq!(body["notices"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["notices"][0]["text"],
        "Another user is currently connected. Please try again later."
    );

    let (status, _, _) = send(&app, "POST", "/api/session/end", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, other, _) = send(&app, "POST", "/api/session", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(other.unwrap(), token);
}

#[tokio::test]
async fn csv_export_lists_records() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);
    let (_, token, _) = send(&app, "POST", "/api/session", None, None).await;
    let token = token.unwrap();
    let (_, _, body) = send(&app, "POST", "/api/barcode", Some(&token), None).await;
    let barcode = body["pending_barcode"].as_str().unwrap().to_string();
    send(&app, "POST", "/api/records", Some(&token), Some(json!({"name": "Cap"}))).await;

    let request = Request::builder()
        .uri("/api/export/csv")
        .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("barcode,part_code,name,color,size,created_at,updated_at\n"));
    assert!(csv.contains(&format!("{},,Cap,,,", barcode)));
}

#[tokio::test]
async fn rejected_request_without_cookie_leaves_desk_open() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, cookie, _) = send(
        &app,
        "PUT",
        "/api/records/8806198700000",
        None,
        Some(json!({"name": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(cookie, None);

    let (status, token, _) = send(&app, "POST", "/api/session", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(token.is_some());
}

#[tokio::test]
async fn issue_after_expiry_does_not_lock_out_clients() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with_ttl(&dir, Duration::from_millis(50));
    let (_, token, _) = send(&app, "POST", "/api/session", None, None).await;
    let token = token.unwrap();
    send(&app, "POST", "/api/barcode", Some(&token), None).await;

    tokio::time::sleep(Duration::from_millis(120)).await;

    let fields = json!({"name": "Shirt"});
    let (status, _, body) = send(&app, "POST", "/api/records", Some(&token), Some(fields)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["notices"][0]["text"], "Generate a barcode first.");

    let (status, again, _) = send(&app, "POST", "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let again = again.unwrap();
    assert_ne!(again, token);

    send(&app, "POST", "/api/session/end", Some(&again), None).await;
    let (status, other, _) = send(&app, "POST", "/api/session", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(other.is_some());
}
