use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::dto::auth_dto::{
    LoginRequest, OtpRequest, RefreshTokenRequest, SignupRequest, UpdatePasswordRequest, VerifyOtpRequest,
};
use crate::middlewares::CurrentUser;
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::util::error::HandlerError;
use crate::util::response::ApiResponse;
use crate::util::validated_json::ValidatedJson;

// Login
pub async fn login_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.login(payload).await?;
    Ok(ApiResponse::with_message("Login successful", res))
}

// Signup
pub async fn signup_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.signup(payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("User registered successfully", res)))
}

// OTP
pub async fn get_otp_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<OtpRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    service.request_otp(payload).await?;
    Ok(ApiResponse::message("OTP sent successfully"))
}

pub async fn verify_otp_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    service.verify_otp(payload).await?;
    Ok(ApiResponse::message("OTP verified successfully"))
}

// Password update after a forgot-password OTP
pub async fn update_password_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    service.update_password(payload).await?;
    Ok(ApiResponse::message("Password updated successfully"))
}

// Refresh Token
pub async fn refresh_token_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.refresh_token(&payload.refresh_token).await?;
    Ok(ApiResponse::ok(res))
}

pub async fn logout_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, HandlerError> {
    service.logout(&user.id).await?;
    Ok(ApiResponse::message("Logged out successfully"))
}

pub async fn me_handler(
    State(service): State<Arc<AuthServiceImpl>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let profile = service.me(&user.id).await?;
    Ok(ApiResponse::ok(profile))
}
