use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use helpdesk_backend::{
    config::Config,
    database::{
        seed,
        store::{JsonStore, Query, Table},
    },
    routes, AppState,
};
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    store: JsonStore,
    _dir: TempDir,
}

async fn setup_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        database_path: dir.path().join("database.json"),
        api_rps: 1000,
        public_rps: 1000,
        ..Config::default()
    };

    let store = JsonStore::open(&config.database_path).await.expect("store");
    seed::seed_demo_users(&store).await.expect("seed");

    let state = AppState::new(store.clone(), &config);
    TestApp {
        app: routes::build_router(state, &config),
        store,
        _dir: dir,
    }
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, body)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn register(app: &Router, name: &str, email: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": name, "email": email, "password": "secret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn create_ticket(app: &Router, token: &str, title: &str) -> JsonValue {
    let (status, body) = call(
        app,
        "POST",
        "/api/tickets",
        Some(token),
        Some(json!({
            "title": title,
            "description": "Details",
            "category": "Hardware",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body
}

#[tokio::test]
async fn health_is_public() {
    let t = setup_app().await;
    for path in ["/health", "/api/health"] {
        let (status, body) = call(&t.app, "GET", path, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    let (status, body) = call(&t.app, "GET", "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/tickets"].is_object());
}

#[tokio::test]
async fn login_rejects_unknown_email_and_wrong_password() {
    let t = setup_app().await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ghost@helpdesk.local", "password": "whatever"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, _) = call(
        &t.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "admin@helpdesk.local", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_is_unique_and_role_is_not_client_controlled() {
    let t = setup_app().await;

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Mallory",
            "email": "mallory@corp.io",
            "password": "secret-pass",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = call(
        &t.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Again", "email": "MALLORY@corp.io", "password": "secret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    let (status, _) = call(
        &t.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Short", "email": "short@corp.io", "password": "123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let t = setup_app().await;

    let (status, body) = call(&t.app, "GET", "/api/tickets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_authorization");

    let (status, body) = call(&t.app, "GET", "/api/tickets", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    let token = login(&t.app, "user@helpdesk.local", "user").await;
    let (status, body) = call(&t.app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "user@helpdesk.local");

    let (status, _) = call(&t.app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&t.app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ticket_creation_appends_one_record() {
    let t = setup_app().await;
    let token = login(&t.app, "user@helpdesk.local", "user").await;

    let ticket = create_ticket(&t.app, &token, "Laptop will not boot").await;
    assert_eq!(ticket["ticket_number"], "TKT-000001");
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["priority"], "medium");
    assert_eq!(ticket["category"], "hardware");

    let count = t.store.count(Table::Tickets, &Query::new()).await.unwrap();
    assert_eq!(count, 1);

    let second = create_ticket(&t.app, &token, "VPN drops").await;
    assert_eq!(second["ticket_number"], "TKT-000002");
}

#[tokio::test]
async fn status_filter_and_transitions() {
    let t = setup_app().await;
    let user = login(&t.app, "user@helpdesk.local", "user").await;
    let agent = login(&t.app, "support@helpdesk.local", "support").await;

    let first = create_ticket(&t.app, &user, "Printer offline").await;
    create_ticket(&t.app, &user, "Password reset").await;
    let id = first["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/status", id),
        Some(&agent),
        Some(json!({"status": "In Progress", "note": "On it"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["history"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &t.app,
        "GET",
        "/api/tickets?status=in_progress",
        Some(&agent),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());

    let (status, body) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/status", id),
        Some(&agent),
        Some(json!({"status": "open"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot move ticket from in_progress to open");

    // requester cannot drive the queue
    let (status, _) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/status", id),
        Some(&user),
        Some(json!({"status": "resolved"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/rating", id),
        Some(&user),
        Some(json!({"score": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/status", id),
        Some(&agent),
        Some(json!({"status": "resolved"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["resolved_at"].is_string());

    let (status, body) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/status", id),
        Some(&user),
        Some(json!({"status": "closed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["closed_at"].is_string());

    let (status, body) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/rating", id),
        Some(&user),
        Some(json!({"score": 4, "feedback": "Quick fix"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"]["score"], 4);

    let (status, body) = call(&t.app, "GET", "/api/tickets/stats", Some(&agent), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["by_status"]["closed"], 1);
    assert_eq!(body["rated"], 1);
}

#[tokio::test]
async fn users_only_see_their_own_tickets() {
    let t = setup_app().await;
    let alice = register(&t.app, "Alice", "alice@corp.io").await;
    let bob = register(&t.app, "Bob", "bob@corp.io").await;

    let ticket = create_ticket(&t.app, &alice, "Monitor flickers").await;
    let id = ticket["id"].as_str().unwrap();

    let (status, _) = call(&t.app, "GET", &format!("/api/tickets/{}", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &t.app,
        "POST",
        &format!("/api/tickets/{}/comments", id),
        Some(&bob),
        Some(json!({"body": "me too"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&t.app, "GET", "/api/tickets", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    // created_by filter is ignored for non-staff
    let alice_id = ticket["created_by"].as_str().unwrap();
    let (_, body) = call(
        &t.app,
        "GET",
        &format!("/api/tickets?created_by={}", alice_id),
        Some(&bob),
        None,
    )
    .await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = call(&t.app, "GET", &format!("/api/tickets/{}", id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Monitor flickers");
}

#[tokio::test]
async fn role_gates_on_admin_routes() {
    let t = setup_app().await;
    let user = login(&t.app, "user@helpdesk.local", "user").await;
    let admin = login(&t.app, "admin@helpdesk.local", "admin").await;

    let (status, body) = call(&t.app, "GET", "/api/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = call(
        &t.app,
        "PUT",
        "/api/settings/maintenance_mode",
        Some(&user),
        Some(json!({"value": true})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &t.app,
        "PUT",
        "/api/settings/maintenance_mode",
        Some(&admin),
        Some(json!({"value": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&t.app, "GET", "/api/settings", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maintenance_mode"], true);

    let (status, body) = call(&t.app, "GET", "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn staff_can_export_tickets() {
    let t = setup_app().await;
    let user = login(&t.app, "user@helpdesk.local", "user").await;
    let agent = login(&t.app, "support@helpdesk.local", "support").await;
    create_ticket(&t.app, &user, "Keyboard missing keys").await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/tickets/export")
        .header(header::AUTHORIZATION, format!("Bearer {}", agent))
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let (status, _) = call(&t.app, "GET", "/api/tickets/export", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_input_is_a_json_bad_request() {
    let t = setup_app().await;
    let user = login(&t.app, "user@helpdesk.local", "user").await;
    let agent = login(&t.app, "support@helpdesk.local", "support").await;
    let ticket = create_ticket(&t.app, &user, "Keyboard").await;
    let id = ticket["id"].as_str().unwrap().to_string();

    let cases = [
        (
            "POST",
            format!("/api/tickets/{}/status", id),
            agent.as_str(),
            Some(json!({"status": "done"})),
        ),
        ("POST", "/api/tickets".to_string(), user.as_str(), Some(json!({"title": "a"}))),
        (
            "POST",
            format!("/api/tickets/{}/rating", id),
            user.as_str(),
            Some(json!({"score": 300})),
        ),
        ("GET", "/api/tickets?status=done".to_string(), agent.as_str(), None),
        ("GET", "/api/tickets/not-a-uuid".to_string(), agent.as_str(), None),
        ("GET", "/api/users?role=wizard".to_string(), agent.as_str(), None),
    ];

    for (method, uri, token, body) in cases {
        let (status, body) = call(&t.app, method, &uri, Some(token), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert!(body["error"].is_string(), "{} {} -> {}", method, uri, body);
    }

    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn put_with_null_assignee_unassigns() {
    let t = setup_app().await;
    let user = login(&t.app, "user@helpdesk.local", "user").await;
    let agent = login(&t.app, "support@helpdesk.local", "support").await;
    let (_, me) = call(&t.app, "GET", "/api/auth/me", Some(&agent), None).await;
    let ticket = create_ticket(&t.app, &user, "Headset").await;
    let uri = format!("/api/tickets/{}", ticket["id"].as_str().unwrap());

    let (status, body) = call(
        &t.app,
        "PUT",
        &uri,
        Some(&agent),
        Some(json!({"assigned_to": me["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["assigned_to"], me["id"]);

    let (status, body) = call(
        &t.app,
        "PUT",
        &uri,
        Some(&agent),
        Some(json!({"assigned_to": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["assigned_to"].is_null());
}
