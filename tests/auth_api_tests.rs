mod common;

use axum::http::StatusCode;
use serde_json::json;
use swachhta_prahari_backend::model::user::Role;

use common::{json_request, TestApp, TEST_PASSWORD};

#[tokio::test]
async fn test_login_then_me() {
    let app = TestApp::new();
    app.create_user("ops_admin", Role::Admin).await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "ops_admin", "password": TEST_PASSWORD })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    let token = body["data"]["token"].as_str().expect("access token").to_string();
    assert!(body["data"]["refreshToken"].is_string());

    let (status, body) = app.send(json_request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "ops_admin");
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_login_accepts_email_and_rejects_bad_password() {
    let app = TestApp::new();
    app.create_user("field_cam", Role::Camera).await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "field_cam@upsida.test", "password": TEST_PASSWORD })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "field_cam", "password": "wrong-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_inactive_user_cannot_login() {
    let app = TestApp::new();
    let mut user = app.create_user("retired", Role::Analyst).await;
    user.is_active = false;
    app.users.users.lock().unwrap()[0] = user;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "retired", "password": TEST_PASSWORD })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_validation_errors_are_listed() {
    let app = TestApp::new();
    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "ab", "password": "123" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = TestApp::new();
    let (status, body) = app.send(json_request("GET", "/api/auth/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (status, _) = app
        .send(json_request("GET", "/api/auth/me", Some("not-a-jwt"), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_opens_session() {
    let app = TestApp::new();
    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({
                "name": "Report Desk",
                "email": "Reports@Upsida.test",
                "username": "report_desk",
                "password": "desk-pass-1",
                "role": "reporting"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["user"]["email"], "reports@upsida.test");

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({
                "name": "Report Desk",
                "email": "reports@upsida.test",
                "username": "report_desk_2",
                "password": "desk-pass-1",
                "role": "reporting"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forgot_password_flow() {
    let app = TestApp::new();
    app.create_user("payroll_lead", Role::Payroll).await;
    let email = "payroll_lead@upsida.test";

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/update-password",
            None,
            Some(json!({ "email": email, "newPassword": "brand-new-1" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "OTP verification required");

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/get-otp",
            None,
            Some(json!({ "email": email, "purpose": "forgot-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = app.mailer.last_otp(email).expect("otp mailed");

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/verify-otp",
            None,
            Some(json!({ "email": email, "otp": "000000x", "purpose": "forgot-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/verify-otp",
            None,
            Some(json!({ "email": email, "otp": code, "purpose": "forgot-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/update-password",
            None,
            Some(json!({ "email": email, "newPassword": "brand-new-1" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "payroll_lead", "password": "brand-new-1" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_otp_for_unknown_user() {
    let app = TestApp::new();
    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/get-otp",
            None,
            Some(json!({ "email": "nobody@upsida.test", "purpose": "login" })),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let app = TestApp::new();
    let (status, body) = app.send(json_request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["env"], "development");

    let (status, body) = app.send(json_request("GET", "/api/nothing-here", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}
