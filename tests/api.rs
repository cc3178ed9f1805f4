//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use voicechat_gateway::{ApiServerBuilder, Error, NewUser, RecordClient, UserPatch};

mod common;
use common::{build_test_router, setup_test_db, spawn_server};

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn alice() -> Value {
    json!({
        "fullName": "Alice Smith",
        "email": "alice@example.com",
        "phone": "555-0100",
        "address": "1 Main St"
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_create_user() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "POST", "/api/users", Some(alice())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(json["id"].is_string());
    assert_eq!(json["fullName"], "Alice Smith");
    assert_eq!(json["email"], "alice@example.com");
    assert_eq!(json["createdAt"], json["updatedAt"]);
}

#[tokio::test]
async fn test_create_missing_field_is_rejected() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "fullName": "Bob", "email": "bob@example.com", "phone": "1" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Address is required");

    let (_, list) = send(&app, "GET", "/api/users", None).await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = build_test_router(setup_test_db());

    let (status, _) = send(&app, "POST", "/api/users", Some(alice())).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut duplicate = alice();
    duplicate["fullName"] = json!("Another Alice");
    duplicate["email"] = json!("Alice@Example.com");
    let (status, json) = send(&app, "POST", "/api/users", Some(duplicate)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].is_string());

    let (_, list) = send(&app, "GET", "/api/users", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = build_test_router(setup_test_db());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_partial_update_keeps_other_fields() {
    let app = build_test_router(setup_test_db());

    let (_, created) = send(&app, "POST", "/api/users", Some(alice())).await;
    let id = created["id"].as_str().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/users/{id}"),
        Some(json!({ "phone": "555-0199" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], "555-0199");
    assert_eq!(updated["fullName"], "Alice Smith");
    assert_eq!(updated["address"], "1 Main St");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);

    let (_, fetched) = send(&app, "GET", &format!("/api/users/{id}"), None).await;
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_update_to_taken_email_is_rejected() {
    let app = build_test_router(setup_test_db());

    send(&app, "POST", "/api/users", Some(alice())).await;
    let mut bob = alice();
    bob["email"] = json!("bob@example.com");
    let (_, bob) = send(&app, "POST", "/api/users", Some(bob)).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", bob["id"].as_str().unwrap()),
        Some(json!({ "email": "alice@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/api/users/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["message"].is_string());

    let (status, _) = send(&app, "DELETE", "/api/users/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/does-not-exist",
        Some(json!({ "phone": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user() {
    let app = build_test_router(setup_test_db());

    let (_, created) = send(&app, "POST", "/api/users", Some(alice())).await;
    let uri = format!("/api/users/{}", created["id"].as_str().unwrap());

    let (status, json) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "User deleted successfully");

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let app = build_test_router(setup_test_db());

    for (name, email) in [("First", "first@example.com"), ("Second", "second@example.com")] {
        let mut body = alice();
        body["fullName"] = json!(name);
        body["email"] = json!(email);
        let (status, _) = send(&app, "POST", "/api/users", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, json) = send(&app, "GET", "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["fullName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Second", "First"]);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = build_test_router(setup_test_db());

    let (status, json) = send(&app, "GET", "/api/nothing-here", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Route not found");
}

async fn get_raw(app: &axum::Router, uri: &str, origin: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_static_ui_keeps_api_errors_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>ui</html>").unwrap();

    let app = ApiServerBuilder::new(setup_test_db(), 0)
        .static_dir(Some(dir.path().to_path_buf()))
        .build()
        .unwrap()
        .router();

    for uri in ["/api/nothing-here", "/api/users/abc/extra"] {
        let (status, json) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(json["message"], "Route not found", "{uri}");
    }

    let (status, json) = send(&app, "GET", "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_array());

    let index = get_raw(&app, "/index.html", None).await;
    assert_eq!(index.status(), StatusCode::OK);
    assert_eq!(body_text(index).await, "<html>ui</html>");

    // client-side routes fall back to the index page
    let deep = get_raw(&app, "/records/recent", None).await;
    assert_eq!(body_text(deep).await, "<html>ui</html>");
}

#[tokio::test]
async fn test_cors_allows_single_configured_origin() {
    let app = ApiServerBuilder::new(setup_test_db(), 0)
        .cors_origin("http://localhost:5173".to_string())
        .build()
        .unwrap()
        .router();

    for origin in ["http://localhost:5173", "http://evil.example"] {
        let response = get_raw(&app, "/api/users", Some(origin)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }
}

#[tokio::test]
async fn test_record_client_against_live_server() {
    let server = spawn_server().await;
    let client = RecordClient::new(&server.url()).unwrap();

    let created = client
        .create(&NewUser {
            full_name: "Carol".to_string(),
            email: "carol@example.com".to_string(),
            phone: "555-0123".to_string(),
            address: "3 Elm St".to_string(),
        })
        .await
        .unwrap();

    let listed = client.list().await.unwrap();
    assert_eq!(listed, vec![created.clone()]);

    let updated = client
        .update(
            &created.id,
            &UserPatch {
                address: Some("4 Oak Ave".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.address, "4 Oak Ave");
    assert_eq!(client.get(&created.id).await.unwrap(), updated);

    let invalid = client
        .create(&NewUser {
            email: "not-an-email".to_string(),
            ..NewUser::default()
        })
        .await;
    assert!(matches!(invalid, Err(Error::Validation(_))));

    let message = client.delete(&created.id).await.unwrap();
    assert_eq!(message, "User deleted successfully");
    assert!(matches!(client.get(&created.id).await, Err(Error::NotFound(_))));
}
