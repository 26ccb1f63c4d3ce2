use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use accounts_api::auth::AuthSettings;
use accounts_api::presenter::LinkTemplates;
use accounts_api::repository::TokenRepository;
use accounts_api::service::AccountService;
use accounts_api::sqlite_repo::SqliteRepository;
use accounts_api::{build_app, db, AppState};

// -- Helpers ------------------------------------------------------------------

const OPERATOR_PASSWORD: &str = "operator-secret";

async fn setup_app() -> axum::Router {
    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    let repo = Arc::new(SqliteRepository::new(pool));
    let tokens: Arc<dyn TokenRepository> = repo.clone();
    let state = AppState {
        accounts: AccountService::new(repo),
        tokens,
        auth: Arc::new(AuthSettings {
            client_id: "ios-client".into(),
            client_secret: "ios".into(),
            client_scopes: vec!["read".into(), "write".into()],
            operator_username: "admin".into(),
            operator_password: OPERATOR_PASSWORD.into(),
            token_ttl_secs: 86_400,
            refresh_ttl_secs: 30 * 86_400,
        }),
        links: LinkTemplates::new("http://localhost:3000"),
    };
    build_app(state)
}

fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"))
    )
}

fn admin_auth() -> String {
    basic_auth("admin", OPERATOR_PASSWORD)
}

async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let has_body = body.is_some();
    let body_str = body.map(|b| b.to_string()).unwrap_or_default();
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    if has_body {
        builder = builder.header("content-type", "application/json");
    }

    let req = builder.body(Body::from(body_str)).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn form_request(
    app: &axum::Router,
    uri: &str,
    authorization: Option<&str>,
    form: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");

    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }

    let req = builder.body(Body::from(form.to_string())).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_account(app: &axum::Router, username: &str, password: &str) -> Value {
    let (status, body) = json_request(
        app,
        "POST",
        "/api/accounts/add",
        None,
        Some(json!({
            "username": username,
            "password": password,
            "email": format!("{username}@x.com"),
            "age": 25,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn obtain_token(app: &axum::Router, username: &str, password: &str) -> Value {
    let form = format!("grant_type=password&username={username}&password={password}");
    let (status, body) =
        form_request(app, "/oauth/token", Some(&basic_auth("ios-client", "ios")), &form).await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn link_rels(resource: &Value) -> Vec<&str> {
    resource["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["rel"].as_str().unwrap())
        .collect()
}

// -- Account CRUD -------------------------------------------------------------

#[tokio::test]
async fn test_create_account_assigns_id_and_withholds_password() {
    let app = setup_app().await;

    let body = create_account(&app, "alice", "p1").await;

    assert_eq!(body["account"]["username"], "alice");
    assert_eq!(body["account"]["email"], "alice@x.com");
    assert!(body["account"]["id"].as_i64().unwrap() > 0);
    assert!(body["account"].get("password").is_none());
    assert_eq!(link_rels(&body), vec!["add", "self", "update", "delete"]);
    assert_eq!(
        body["links"][1]["href"],
        "http://localhost:3000/api/accounts/alice"
    );
}

#[tokio::test]
async fn test_create_ignores_client_supplied_id() {
    let app = setup_app().await;

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/accounts/add",
        None,
        Some(json!({ "id": 424242, "username": "alice", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(body["account"]["id"].as_i64().unwrap(), 424242);
}

#[tokio::test]
async fn test_duplicate_create_is_rejected() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/accounts/add",
        None,
        Some(json!({ "username": "alice", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user already exists");

    // original record untouched
    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/alice",
        Some(&admin_auth()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["email"], "alice@x.com");
}

#[tokio::test]
async fn test_create_rejects_overlong_username() {
    let app = setup_app().await;

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/accounts/add",
        None,
        Some(json!({ "username": "this-username-is-way-too-long", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "username must be 1-20 characters");
}

#[tokio::test]
async fn test_get_unknown_username_is_400() {
    let app = setup_app().await;

    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/ghost",
        Some(&admin_auth()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user does not exist");
}

#[tokio::test]
async fn test_update_overwrites_wholesale() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, body) = json_request(
        &app,
        "PUT",
        "/api/accounts/update",
        Some(&admin_auth()),
        // no email: the stored one must be cleared, not kept
        Some(json!({ "username": "alice", "password": "p2", "age": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["age"], 30);
    assert!(body["account"]["email"].is_null());
    assert!(body["account"].get("password").is_none());

    let (_, body) = json_request(
        &app,
        "GET",
        "/api/accounts/alice",
        Some(&admin_auth()),
        None,
    )
    .await;
    assert_eq!(body["account"]["age"], 30);
    assert!(body["account"]["email"].is_null());
}

#[tokio::test]
async fn test_update_unknown_username_is_400() {
    let app = setup_app().await;

    let (status, body) = json_request(
        &app,
        "PUT",
        "/api/accounts/update",
        Some(&admin_auth()),
        Some(json!({ "username": "ghost", "age": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user does not exist");
}

#[tokio::test]
async fn test_delete_returns_snapshot_then_lookup_fails() {
    let app = setup_app().await;
    let created = create_account(&app, "alice", "p1").await;

    let (status, body) = json_request(
        &app,
        "DELETE",
        "/api/accounts/alice",
        Some(&admin_auth()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["id"], created["account"]["id"]);
    assert_eq!(body["account"]["email"], "alice@x.com");

    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/alice",
        Some(&admin_auth()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user does not exist");
}

#[tokio::test]
async fn test_list_wraps_every_account() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;
    create_account(&app, "bob", "p2").await;

    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/",
        Some(&admin_auth()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["account"]["username"], "alice");
    assert_eq!(link_rels(&items[1]), vec!["add", "self", "update", "delete"]);
    assert_eq!(
        body["links"][0]["href"],
        "http://localhost:3000/api/accounts/"
    );
}

// -- Authorization ------------------------------------------------------------

#[tokio::test]
async fn test_admin_routes_require_credentials() {
    let app = setup_app().await;

    let (status, _) = json_request(&app, "GET", "/api/accounts/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_ordinary_users() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/",
        Some(&basic_auth("alice", "p1")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "admin role required");
}

#[tokio::test]
async fn test_wrong_password_is_401() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, _) = json_request(
        &app,
        "GET",
        "/api/accounts/",
        Some(&basic_auth("alice", "wrong")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsupported_auth_scheme_is_400() {
    let app = setup_app().await;

    let (status, _) = json_request(
        &app,
        "GET",
        "/api/accounts/",
        Some("Digest whatever"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Token issuance and /me ----------------------------------------------------

#[tokio::test]
async fn test_password_grant_then_me() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let token = obtain_token(&app, "alice", "p1").await;
    assert_eq!(token["token_type"], "bearer");
    assert_eq!(token["scope"], "read write");
    assert_eq!(token["expires_in"].as_i64().unwrap(), 86_400);
    let access = token["access_token"].as_str().unwrap();

    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/me",
        Some(&format!("Bearer {access}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["username"], "alice");
    assert!(body["account"].get("password").is_none());
}

#[tokio::test]
async fn test_password_grant_with_bad_user_credentials() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, body) = form_request(
        &app,
        "/oauth/token",
        Some(&basic_auth("ios-client", "ios")),
        "grant_type=password&username=alice&password=wrong",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid username or password");
}

#[tokio::test]
async fn test_token_endpoint_rejects_unknown_client() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, _) = form_request(
        &app,
        "/oauth/token",
        Some(&basic_auth("ios-client", "wrong-secret")),
        "grant_type=password&username=alice&password=p1",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = form_request(
        &app,
        "/oauth/token",
        None,
        "grant_type=password&username=alice&password=p1",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_client_credentials_accepted_in_form_body() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, body) = form_request(
        &app,
        "/oauth/token",
        None,
        "grant_type=password&username=alice&password=p1&client_id=ios-client&client_secret=ios",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn test_unsupported_grant_type_is_400() {
    let app = setup_app().await;

    let (status, body) = form_request(
        &app,
        "/oauth/token",
        Some(&basic_auth("ios-client", "ios")),
        "grant_type=client_credentials",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unsupported grant_type: client_credentials");
}

#[tokio::test]
async fn test_scope_outside_client_registration_is_400() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, body) = form_request(
        &app,
        "/oauth/token",
        Some(&basic_auth("ios-client", "ios")),
        "grant_type=password&username=alice&password=p1&scope=read%20delete",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid scope");
}

#[tokio::test]
async fn test_refresh_grant_rotates_access_token() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let token = obtain_token(&app, "alice", "p1").await;
    let old_access = token["access_token"].as_str().unwrap().to_string();
    let refresh = token["refresh_token"].as_str().unwrap();

    let (status, rotated) = form_request(
        &app,
        "/oauth/token",
        Some(&basic_auth("ios-client", "ios")),
        &format!("grant_type=refresh_token&refresh_token={refresh}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_access = rotated["access_token"].as_str().unwrap();
    assert_ne!(new_access, old_access);
    assert_eq!(rotated["refresh_token"].as_str().unwrap(), refresh);

    // the fresh token works, the replaced one no longer resolves
    let (status, _) = json_request(
        &app,
        "GET",
        "/api/accounts/me",
        Some(&format!("Bearer {new_access}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = json_request(
        &app,
        "GET",
        "/api/accounts/me",
        Some(&format!("Bearer {old_access}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_bearer_not_basic() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/me",
        Some(&basic_auth("alice", "p1")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "client role required");
}

#[tokio::test]
async fn test_me_with_unknown_token_is_401() {
    let app = setup_app().await;

    let (status, _) = json_request(
        &app,
        "GET",
        "/api/accounts/me",
        Some("Bearer not-a-real-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_after_account_deleted_is_400() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;
    let token = obtain_token(&app, "alice", "p1").await;
    let access = token["access_token"].as_str().unwrap().to_string();

    let (status, _) = json_request(
        &app,
        "DELETE",
        "/api/accounts/alice",
        Some(&admin_auth()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // the token still authenticates, but its user has no account anymore
    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/me",
        Some(&format!("Bearer {access}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user does not exist");
}

#[tokio::test]
async fn test_operator_token_reaches_admin_routes() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let token = obtain_token(&app, "admin", OPERATOR_PASSWORD).await;
    let access = token["access_token"].as_str().unwrap();

    let (status, body) = json_request(
        &app,
        "GET",
        "/api/accounts/alice",
        Some(&format!("Bearer {access}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["username"], "alice");
}

#[tokio::test]
async fn test_ordinary_user_token_cannot_reach_admin_routes() {
    let app = setup_app().await;
    create_account(&app, "alice", "p1").await;

    let token = obtain_token(&app, "alice", "p1").await;
    let access = token["access_token"].as_str().unwrap();

    let (status, _) = json_request(
        &app,
        "GET",
        "/api/accounts/",
        Some(&format!("Bearer {access}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Health -------------------------------------------------------------------

#[tokio::test]
async fn test_health_check() {
    let app = setup_app().await;

    let (status, body) = json_request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
