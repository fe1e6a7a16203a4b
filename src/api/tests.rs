use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use super::create_router;
use crate::accounts::NewAccount;
use crate::config::Config;
use crate::db::{test_pool, Role};
use crate::AppState;

const PASSWORD: &str = "correct-horse";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let (pool, dir) = test_pool().await;
        let mut config = Config::default();
        config.auth.jwt_secret = Some("router-test-secret-router-test-secret".to_string());
        config.server.uploads_dir = dir.path().join("uploads");

        let state = Arc::new(AppState::new(config, pool));
        Self {
            router: create_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    /// Create a user directly and return a fresh token for it
    async fn login_as(&self, email: &str, role: Role) -> String {
        self.state
            .accounts
            .register(NewAccount {
                name: email.split('@').next().unwrap_or_default().to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                role,
            })
            .await
            .unwrap();
        self.state.accounts.login(email, PASSWORD).await.unwrap().token
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_class(&self, token: &str, title: &str, capacity: i64) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/instructor/classes",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": "Bring a towel",
                    "schedule_time": "2026-11-02 18:00",
                    "capacity": capacity,
                    "price": 12.5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_401_and_bad_token_is_403() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/classes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, body) = app
        .send(Method::GET, "/api/classes", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
}

#[tokio::test]
async fn test_student_is_forbidden_on_instructor_routes() {
    let app = TestApp::new().await;
    let student = app.login_as("sam@example.com", Role::Student).await;
    let id = "0b3f5a0e-8f6d-4a53-9a3e-2f0e6b1c9d10";

    let routes = [
        (Method::GET, "/api/instructor/classes".to_string()),
        (Method::GET, "/api/instructor/classes/mine".to_string()),
        (Method::DELETE, format!("/api/instructor/classes/{}", id)),
        (Method::GET, format!("/api/instructor/classes/{}/reservations", id)),
        (Method::GET, "/api/instructor/notifications".to_string()),
        (Method::GET, "/api/instructor/notifications/unread-count".to_string()),
        (Method::POST, format!("/api/instructor/notifications/{}/read", id)),
    ];
    for (method, uri) in routes {
        let (status, _) = app.send(method, &uri, Some(&student), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }

    let class_uri = format!("/api/instructor/classes/{}", id);
    let bodies = [
        (Method::POST, "/api/instructor/classes", None),
        (Method::POST, "/api/instructor/classes", Some(json!({"title": "x"}))),
        (
            Method::POST,
            "/api/instructor/classes",
            Some(json!({"title": "x", "schedule_time": "mon", "capacity": 1})),
        ),
        (Method::PUT, class_uri.as_str(), None),
        (Method::PUT, class_uri.as_str(), Some(json!({}))),
        (
            Method::PUT,
            class_uri.as_str(),
            Some(json!({"title": "x", "schedule_time": "mon", "capacity": 1})),
        ),
    ];
    for (method, uri, body) in bodies {
        let (status, _) = app.send(method.clone(), uri, Some(&student), body.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {} {:?}", method, uri, body);
    }
}

#[tokio::test]
async fn test_malformed_class_body_is_a_validation_error() {
    let app = TestApp::new().await;
    let teacher = app.login_as("t@example.com", Role::Instructor).await;
    let class_id = app.create_class(&teacher, "Yoga", 5).await;
    let class_uri = format!("/api/instructor/classes/{}", class_id);

    let bodies = [
        json!({"title": "Yoga", "schedule_time": "mon"}),
        json!({"title": "Yoga", "schedule_time": "mon", "capacity": "3"}),
    ];
    for body in bodies {
        for (method, uri) in [
            (Method::POST, "/api/instructor/classes"),
            (Method::PUT, class_uri.as_str()),
        ] {
            let (status, response) = app
                .send(method.clone(), uri, Some(&teacher), Some(body.clone()))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, body);
            assert_eq!(response["error"]["code"], "validation_error");
            assert!(response["error"]["details"]["body"].is_array());
        }
    }

    let (status, response) = app
        .send(Method::POST, "/api/instructor/classes", Some(&teacher), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_instructor_cannot_reserve() {
    let app = TestApp::new().await;
    let teacher = app.login_as("t@example.com", Role::Instructor).await;
    let class_id = app.create_class(&teacher, "Yoga", 5).await;

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/classes/{}/reserve", class_id),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_and_login_over_http() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ana",
                "email": "Ana@Example.com",
                "password": PASSWORD,
                "role": "instructor"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["email"], "ana@example.com");
    assert!(body.get("password_hash").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "instructor");
    let token = body["token"].as_str().unwrap();

    let (status, body) = app.send(Method::GET, "/api/users/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ana");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;
    app.login_as("dup@example.com", Role::Student).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Other",
                "email": "dup@example.com",
                "password": PASSWORD,
                "role": "student"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "x@example.com", "role": "employee"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    let details = &body["error"]["details"];
    assert!(details.get("name").is_some());
    assert!(details.get("password").is_some());
    assert!(details.get("role").is_some());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;
    app.login_as("sam@example.com", Role::Student).await;

    let (wrong_status, wrong_body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "sam@example.com", "password": "wrong-password"})),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ghost@example.com", "password": "wrong-password"})),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_body, unknown_body);

    let (status, _) = app
        .send(Method::POST, "/api/auth/login", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_flow() {
    let app = TestApp::new().await;
    let teacher = app.login_as("teacher@example.com", Role::Instructor).await;
    let student = app.login_as("sam@example.com", Role::Student).await;
    let class_id = app.create_class(&teacher, "Spin", 3).await;

    let (status, body) = app
        .send(Method::GET, "/api/classes?instructor=TEACH", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["reserved"], 0);

    let reserve_uri = format!("/api/classes/{}/reserve", class_id);
    let (status, body) = app
        .send(Method::POST, &reserve_uri, Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "confirmed");
    let reservation_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::POST, &reserve_uri, Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (_, body) = app
        .send(
            Method::GET,
            "/api/instructor/notifications/unread-count",
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(body["unread"], 1);

    let (_, roster) = app
        .send(
            Method::GET,
            &format!("/api/instructor/classes/{}/reservations", class_id),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(roster.as_array().unwrap().len(), 1);
    assert_eq!(roster[0]["student_email"], "sam@example.com");

    let (_, inbox) = app
        .send(Method::GET, "/api/instructor/notifications", Some(&teacher), None)
        .await;
    let notification_id = inbox[0]["id"].as_str().unwrap();
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/instructor/notifications/{}/read", notification_id),
            Some(&teacher),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/reservations/{}", reservation_id),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, mine) = app
        .send(Method::GET, "/api/classes/mine-reservations", Some(&student), None)
        .await;
    assert_eq!(mine[0]["status"], "cancelled");

    let (status, _) = app
        .send(Method::POST, &reserve_uri, Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_last_seat_goes_to_one_student() {
    let app = TestApp::new().await;
    let teacher = app.login_as("teacher@example.com", Role::Instructor).await;
    let first = app.login_as("first@example.com", Role::Student).await;
    let second = app.login_as("second@example.com", Role::Student).await;
    let class_id = app.create_class(&teacher, "Solo", 1).await;
    let uri = format!("/api/classes/{}/reserve", class_id);

    let (a, b) = tokio::join!(
        app.send(Method::POST, &uri, Some(&first), None),
        app.send(Method::POST, &uri, Some(&second), None),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn test_non_owner_update_and_delete_look_like_not_found() {
    let app = TestApp::new().await;
    let owner = app.login_as("owner@example.com", Role::Instructor).await;
    let intruder = app.login_as("intruder@example.com", Role::Instructor).await;
    let class_id = app.create_class(&owner, "Pilates", 4).await;
    let uri = format!("/api/instructor/classes/{}", class_id);
    let missing = "/api/instructor/classes/0b3f5a0e-8f6d-4a53-9a3e-2f0e6b1c9d10";

    let (foreign_status, foreign_body) = app.send(Method::DELETE, &uri, Some(&intruder), None).await;
    let (missing_status, missing_body) = app
        .send(Method::DELETE, missing, Some(&intruder), None)
        .await;
    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_body, missing_body);

    let (status, _) = app
        .send(
            Method::PUT,
            &uri,
            Some(&intruder),
            Some(json!({"title": "Mine now", "schedule_time": "mon", "capacity": 9})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(&owner),
            Some(json!({"title": "Pilates II", "schedule_time": "tue", "capacity": 6})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Pilates II");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reserve_unknown_or_malformed_class() {
    let app = TestApp::new().await;
    let student = app.login_as("sam@example.com", Role::Student).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/classes/0b3f5a0e-8f6d-4a53-9a3e-2f0e6b1c9d10/reserve",
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::POST, "/api/classes/42/reserve", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_photo_upload() {
    let app = TestApp::new().await;
    let token = app.login_as("pic@example.com", Role::Student).await;

    let boundary = "classbook-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\nfake-png-bytes\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::post("/api/users/photo")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = app.call(request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let photo = body["photo"].as_str().unwrap().to_string();
    assert!(photo.starts_with("avatar_") && photo.ends_with(".png"));
    assert!(app.state.accounts.uploads_dir().join(&photo).exists());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/uploads/{}", photo))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
