mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Days, Local};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use common::{get, send_json, test_config, TEST_SECRET};
use hostel_portal::api::auth::{issue_token, Claims};
use hostel_portal::build_app;
use hostel_portal::config::Config;
use hostel_portal::db::models::user::Role;
use hostel_portal::error::PENDING_APPROVAL_MESSAGE;
use hostel_portal::middleware::auth::{
    create_permission_cache, create_revocation_list, PermissionCache, UserPermissions,
};

/// Router over a pool that never connects, so only paths that stop before
/// the database are exercised here.
struct Harness {
    app: Router,
    permissions: PermissionCache,
}

impl Harness {
    fn new() -> Self {
        let config = Config::install(test_config());
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let permissions = create_permission_cache(Duration::from_secs(60));
        let revoked = create_revocation_list(Duration::from_secs(3600));
        let app = build_app(pool, permissions.clone(), revoked);
        Harness { app, permissions }
    }

    /// Registers a user in the permission cache and returns a bearer token for them.
    fn login_as(&self, role: Role, approved: bool) -> String {
        let user_id = Uuid::new_v4();
        self.permissions.insert(user_id, UserPermissions { user_id, role, approved });
        let claims = Claims::new(user_id, &format!("{}@nmims.edu", role), role, 3600);
        issue_token(&claims, TEST_SECRET).expect("token")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        common::send(&self.app, request).await
    }
}

#[tokio::test]
async fn liveness_does_not_need_the_database() {
    let harness = Harness::new();
    let (status, body) = harness.send(get("/health/live", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn catalog_is_public() {
    let harness = Harness::new();
    let (status, body) = harness.send(get("/catalog", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hostel_blocks"][0], "Block A");
    assert_eq!(body["data"]["store_categories"][2]["name"], "Gym Supplements");
}

#[tokio::test]
async fn openapi_document_lists_portal_routes() {
    let harness = Harness::new();
    let (status, body) = harness.send(get("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().expect("paths");
    let expected = [
        "/auth/signup",
        "/cleaning-requests",
        "/store-orders/{id}/status",
        "/approval-requests",
    ];
    for path in expected {
        assert!(paths.contains_key(path), "missing {path}");
    }
}

#[tokio::test]
async fn private_routes_require_a_token() {
    let harness = Harness::new();
    let (status, _) = harness.send(get("/dashboard", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authorization_header_is_rejected() {
    let harness = Harness::new();
    let request = Request::builder()
        .uri("/dashboard")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let (status, _) = harness.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let harness = Harness::new();
    let claims = Claims::new(Uuid::new_v4(), "student@nmims.edu", Role::Student, 3600);
    let forged = issue_token(&claims, "not-the-secret").unwrap();
    let (status, _) = harness.send(get("/dashboard", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_change_request_status() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Student, true);
    let uri = format!("/cleaning-requests/{}/status", Uuid::new_v4());
    let (status, _) = harness
        .send(send_json(Method::PATCH, &uri, Some(&token), json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admins_cannot_update_store_orders() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Admin, true);
    let uri = format!("/store-orders/{}/status", Uuid::new_v4());
    let (status, _) = harness
        .send(send_json(Method::PATCH, &uri, Some(&token), json!({ "status": "in-progress" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn vendors_cannot_update_appliance_complaints() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Vendor, true);
    let uri = format!("/appliance-complaints/{}/status", Uuid::new_v4());
    let (status, _) = harness
        .send(send_json(Method::PATCH, &uri, Some(&token), json!({ "status": "in-progress" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unapproved_admin_is_refused_with_pending_flag() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Admin, false);
    let uri = format!("/cleaning-requests/{}/status", Uuid::new_v4());
    let (status, body) = harness
        .send(send_json(Method::PATCH, &uri, Some(&token), json!({ "status": "in-progress" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], PENDING_APPROVAL_MESSAGE);
    assert_eq!(body["errors"]["pending_approval"], true);
}

#[tokio::test]
async fn unapproved_vendor_sees_no_dashboard() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Vendor, false);
    let (status, body) = harness.send(get("/dashboard", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errors"]["pending_approval"], true);
}

#[tokio::test]
async fn requests_cannot_be_moved_back_to_pending() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Admin, true);
    let uri = format!("/appliance-complaints/{}/status", Uuid::new_v4());
    let (status, _) = harness
        .send(send_json(Method::PATCH, &uri, Some(&token), json!({ "status": "pending" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_super_user_lists_approval_requests() {
    let harness = Harness::new();
    for role in [Role::Student, Role::Admin, Role::Vendor] {
        let token = harness.login_as(role, true);
        let (status, _) = harness.send(get("/approval-requests", Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{role} must not list approvals");
    }
}

#[tokio::test]
async fn admins_cannot_approve_accounts() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Admin, true);
    let uri = format!("/approval-requests/{}/approve", Uuid::new_v4());
    let (status, _) = harness.send(send_json(Method::POST, &uri, Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_students_submit_requests() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Vendor, true);
    let body = json!({
        "hostel_block": "Block A",
        "room_number": "304",
        "appliance": "Fan",
        "description": "Fan not working"
    });
    let (status, _) = harness
        .send(send_json(Method::POST, "/appliance-complaints", Some(&token), body))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn incomplete_cleaning_request_is_rejected() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Student, true);
    let body = json!({
        "hostel_block": "",
        "room_number": "304",
        "preferred_date": "2099-01-14",
        "preferred_time": "10:00 AM"
    });
    let (status, body) = harness
        .send(send_json(Method::POST, "/cleaning-requests", Some(&token), body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn cleaning_cannot_be_booked_in_the_past() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Student, true);
    let yesterday = Local::now().date_naive() - Days::new(1);
    let body = json!({
        "student_name": "Riya",
        "hostel_block": "Block A",
        "room_number": "304",
        "preferred_date": yesterday.to_string(),
        "preferred_time": "10:00 AM"
    });
    let (status, _) = harness
        .send(send_json(Method::POST, "/cleaning-requests", Some(&token), body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_order_items_must_match_category() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Student, true);
    let body = json!({
        "student_name": "Riya",
        "hostel_block": "Block B",
        "room_number": "12",
        "category": "Fruits",
        "items": [{ "name": "Stapler", "quantity": 1 }]
    });
    let (status, _) = harness
        .send(send_json(Method::POST, "/store-orders", Some(&token), body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn super_user_cannot_self_register() {
    let harness = Harness::new();
    let body = json!({
        "email": "root@nmims.edu",
        "password": "secret123",
        "full_name": "Root",
        "role": "super_user"
    });
    let (status, _) = harness.send(send_json(Method::POST, "/auth/signup", None, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn short_password_is_rejected_at_signup() {
    let harness = Harness::new();
    let body = json!({
        "email": "student@nmims.edu",
        "password": "12345",
        "full_name": "Riya",
        "role": "student"
    });
    let (status, _) = harness.send(send_json(Method::POST, "/auth/signup", None, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_login_is_a_validation_error() {
    let harness = Harness::new();
    let body = json!({ "email": "  ", "password": "" });
    let (status, _) = harness.send(send_json(Method::POST, "/auth/login", None, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_out_token_stops_working() {
    let harness = Harness::new();
    let token = harness.login_as(Role::Student, true);

    let (status, _) = harness
        .send(send_json(Method::POST, "/auth/logout", Some(&token), json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = harness.send(get("/dashboard", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Session has been signed out");
}
