//! Handler tests for the users domain
//!
//! The full `/users` + `/admin` router over in-memory repositories and an
//! in-memory session store, so these run without Docker:
//! - Envelope shape and HTTP status per error code
//! - Session cookie and bearer token handling
//! - Role checks on the admin routes

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum_helpers::{InMemorySessionStore, JwtConfig, JwtRedisAuth};
use chrono::Utc;
use domain_users::clock::SystemClock;
use domain_users::handlers::{self, UsersState};
use domain_users::notify::CodeSenders;
use domain_users::password::hash_password;
use domain_users::repository::{
    InMemoryLoginHistoryRepository, InMemoryUserRepository, InMemoryVerificationCodeRepository,
};
use domain_users::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_utils::TestDataBuilder;
use tower::ServiceExt; // For oneshot()

const SECRET: &str = "handler-test-secret-that-is-long-enough";
const PASSWORD: &str = "s3cret-pass";

struct TestApp {
    router: Router,
    users: Arc<InMemoryUserRepository>,
    codes: Arc<InMemoryVerificationCodeRepository>,
    history: Arc<InMemoryLoginHistoryRepository>,
}

impl TestApp {
    fn new() -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let codes = Arc::new(InMemoryVerificationCodeRepository::new());
        let history = Arc::new(InMemoryLoginHistoryRepository::new());
        let clock = Arc::new(SystemClock);

        let verification =
            VerificationService::new(codes.clone(), CodeSenders::disabled(), clock.clone());
        let state = UsersState {
            users: UserService::new(users.clone(), history.clone(), verification, clock),
            admin: AdminService::new(users.clone(), history.clone()),
            auth: JwtRedisAuth::with_store(
                Arc::new(InMemorySessionStore::new()),
                &JwtConfig::new(SECRET).unwrap(),
            ),
            secure_cookies: false,
        };

        Self {
            router: handlers::router(state),
            users,
            codes,
            history,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, json_body(response.into_body()).await)
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, token, body)).await
    }

    async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request("PUT", uri, token, body)).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(bare_request("GET", uri, token)).await
    }

    /// Sends a code to `phone`, reads it back from the store and registers.
    async fn register(&self, account: &str, phone: &str) -> i64 {
        let (status, _) = self
            .post("/users/send-code", None, json!({ "target": phone }))
            .await;
        assert_eq!(status, StatusCode::OK);

        let code = self.codes.codes_for(phone).await.pop().unwrap().code;
        let (status, body) = self
            .post(
                "/users/register",
                None,
                json!({
                    "account": account,
                    "password": PASSWORD,
                    "checkPassword": PASSWORD,
                    "phone": phone,
                    "verificationCode": code,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body["data"].as_i64().unwrap()
    }

    async fn login(&self, account: &str) -> String {
        let (status, body) = self
            .post(
                "/users/login",
                None,
                json!({ "account": account, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    async fn seed_admin(&self, id: i64, account: &str) {
        let now = Utc::now();
        self.users
            .insert(User {
                id,
                username: Some("Administrator".to_string()),
                account: account.to_string(),
                avatar_url: None,
                gender: None,
                password: hash_password(PASSWORD).unwrap(),
                phone: None,
                email: None,
                status: 0,
                role: Role::Admin,
                deleted: false,
                create_time: now,
                update_time: now,
            })
            .await;
    }
}

fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_register_login_and_current_user() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("register_login_current");
    let account = data.account("main");
    let phone = data.phone(1);

    let id = app.register(&account, &phone).await;
    let token = app.login(&account).await;

    let (status, body) = app.get("/users/current", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], 20000);
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["account"], account.as_str());
    assert_eq!(body["data"]["phone"], phone.as_str());
    assert_eq!(body["data"]["role"], "USER");
    assert!(body["data"].get("password").is_none());

    let history = app.history.all().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_id, Some(id));
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("login_cookie");
    let account = data.account("main");
    app.register(&account, &data.phone(1)).await;

    let request = json_request(
        "POST",
        "/users/login",
        None,
        json!({ "account": account, "password": PASSWORD }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("access_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=900"));

    // The cookie alone authenticates.
    let token_pair = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/users/current")
        .header(header::COOKIE, token_pair)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_is_rejected_and_recorded() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("wrong_password");
    let account = data.account("main");
    app.register(&account, &data.phone(1)).await;

    let (status, body) = app
        .post(
            "/users/login",
            None,
            json!({ "account": account, "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 40100);
    assert_eq!(body["description"], "wrong account or password");

    let history = app.history.all().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].login_status, 1);
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("register_mismatch");

    let (status, body) = app
        .post(
            "/users/register",
            None,
            json!({
                "account": data.account("main"),
                "password": PASSWORD,
                "checkPassword": "something-else",
                "phone": data.phone(1),
                "verificationCode": "123456",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 40000);
}

#[tokio::test]
async fn test_register_rejects_wrong_code() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("register_wrong_code");
    let phone = data.phone(1);

    app.post("/users/send-code", None, json!({ "target": phone }))
        .await;
    let code = app.codes.codes_for(&phone).await.pop().unwrap().code;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let (status, body) = app
        .post(
            "/users/register",
            None,
            json!({
                "account": data.account("main"),
                "password": PASSWORD,
                "checkPassword": PASSWORD,
                "phone": phone,
                "verificationCode": wrong,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["description"], "verification code is wrong or expired");
}

#[tokio::test]
async fn test_send_code_is_rate_limited() {
    let app = TestApp::new();
    let email = TestDataBuilder::from_test_name("send_code_rate").email("a");

    let (status, _) = app
        .post("/users/send-code", None, json!({ "target": email }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/users/send-code", None, json!({ "target": email }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["description"],
        "codes are being sent too frequently, try again later"
    );
    assert_eq!(app.codes.codes_for(&email).await.len(), 1);
}

#[tokio::test]
async fn test_send_code_only_issues_registration_codes() {
    let app = TestApp::new();
    let email = TestDataBuilder::from_test_name("send_code_purpose").email("a");

    let (status, body) = app
        .post(
            "/users/send-code",
            None,
            json!({ "target": email, "purpose": "RESET_PASSWORD" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["description"], "only REGISTER codes can be requested");
    assert!(app.codes.codes_for(&email).await.is_empty());

    let (status, _) = app
        .post(
            "/users/send-code",
            None,
            json!({ "target": email, "purpose": "REGISTER" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_send_code_rejects_unknown_target() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/users/send-code", None, json!({ "target": "not-a-target" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new();

    let (status, body) = app.get("/users/current", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 40100);
    assert_eq!(body["message"], "not logged in");

    let (status, _) = app.get("/users/current", Some("garbage.token.value")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("logout_revokes");
    let account = data.account("main");
    app.register(&account, &data.phone(1)).await;
    let token = app.login(&account).await;

    let (status, body) = app.post("/users/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());

    let (status, body) = app.get("/users/current", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["description"], "token has been revoked");
}

#[tokio::test]
async fn test_update_profile_and_change_password() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("profile_password");
    let account = data.account("main");
    app.register(&account, &data.phone(1)).await;
    let token = app.login(&account).await;

    let (status, body) = app
        .put(
            "/users/profile",
            Some(&token),
            json!({ "username": "Zixi", "gender": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "Zixi");
    assert_eq!(body["data"]["gender"], 1);

    let (status, _) = app
        .put("/users/profile", Some(&token), json!({ "gender": 7 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(
            "/users/password",
            Some(&token),
            json!({
                "oldPassword": PASSWORD,
                "newPassword": "brand-new-pass",
                "checkPassword": "brand-new-pass",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "change password failed: {body}");
    assert_eq!(body["data"], true);

    let (status, _) = app
        .post(
            "/users/login",
            None,
            json!({ "account": account, "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_own_login_history_is_paged() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("own_history");
    let account = data.account("main");
    app.register(&account, &data.phone(1)).await;
    app.login(&account).await;
    let token = app.login(&account).await;

    let (status, body) = app
        .get("/users/login-history?pageNum=1&pageSize=1", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("admin_forbidden");
    let account = data.account("main");
    app.register(&account, &data.phone(1)).await;
    let token = app.login(&account).await;

    let (status, body) = app.post("/admin/users/query", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 40101);

    let (status, _) = app.post("/admin/users/query", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_queries_and_disables_users() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("admin_manage");
    let admin_account = data.account("admin");
    app.seed_admin(1000, &admin_account).await;
    let admin_token = app.login(&admin_account).await;

    let account = data.account("member");
    let id = app.register(&account, &data.phone(1)).await;

    let (status, body) = app
        .post(
            "/admin/users/query",
            Some(&admin_token),
            json!({ "role": "USER", "pageNum": 1, "pageSize": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["records"][0]["account"], account.as_str());

    let (status, body) = app
        .put(
            &format!("/admin/users/{id}/status"),
            Some(&admin_token),
            json!({ "status": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], true);

    let (status, body) = app
        .post(
            "/users/login",
            None,
            json!({ "account": account, "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["description"], "account is disabled");

    let (status, _) = app
        .put(
            &format!("/admin/users/{id}/status"),
            Some(&admin_token),
            json!({ "status": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_role_change_and_soft_delete() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("admin_role_delete");
    let admin_account = data.account("admin");
    app.seed_admin(2000, &admin_account).await;
    let admin_token = app.login(&admin_account).await;

    let account = data.account("member");
    let id = app.register(&account, &data.phone(1)).await;

    let (status, _) = app
        .put(
            &format!("/admin/users/{id}/role"),
            Some(&admin_token),
            json!({ "role": "ADMIN" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/admin/users/{id}"), Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "ADMIN");

    let (status, body) = app
        .send(bare_request("DELETE", "/admin/users/2000", Some(&admin_token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "self delete: {body}");

    let (status, body) = app
        .send(bare_request("DELETE", &format!("/admin/users/{id}"), Some(&admin_token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], true);

    let (status, body) = app.get(&format!("/admin/users/{id}"), Some(&admin_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 40001);
}

#[tokio::test]
async fn test_admin_login_history_query() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("admin_history");
    let admin_account = data.account("admin");
    app.seed_admin(3000, &admin_account).await;
    let admin_token = app.login(&admin_account).await;

    let account = data.account("member");
    app.register(&account, &data.phone(1)).await;
    app.post(
        "/users/login",
        None,
        json!({ "account": account, "password": "wrong-password" }),
    )
    .await;

    let (status, body) = app
        .post(
            "/admin/login-history/query",
            Some(&admin_token),
            json!({ "account": account, "loginStatus": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(
        body["data"]["records"][0]["failReason"],
        "wrong account or password"
    );
}

#[tokio::test]
async fn test_invalid_path_id_is_params_error() {
    let app = TestApp::new();
    let data = TestDataBuilder::from_test_name("admin_bad_id");
    let admin_account = data.account("admin");
    app.seed_admin(4000, &admin_account).await;
    let admin_token = app.login(&admin_account).await;

    let (status, body) = app.get("/admin/users/abc", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 40000);
}
