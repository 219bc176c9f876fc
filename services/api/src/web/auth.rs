//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, logout and password reset.

use crate::error::{ApiError, ApiResult};
use crate::web::dto::{MessageDto, UserDto};
use crate::web::extract::JsonBody;
use crate::web::state::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use workflow_core::ports::{OutgoingMail, PortError};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session";

/// Shortest password accepted at signup and reset.
pub const MIN_PASSWORD_LEN: usize = 8;

const RESET_ACK: &str = "If account exists, a reset link will be sent.";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    /// The session id, also set as the `session` cookie. Usable as a bearer token.
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Pulls the session id from the `session` cookie or an `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|id| !id.is_empty())
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Failed to parse password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn check_password_strength(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Creates a server-side session and returns its id with the matching cookie.
async fn start_session(state: &AppState, user_id: Uuid) -> ApiResult<(String, String)> {
    let auth_session_id = Uuid::new_v4().simple().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await?;

    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        ttl.num_seconds()
    );
    Ok((auth_session_id, cookie))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email);
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    check_password_strength(&req.password)?;
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let password_hash = hash_password(&req.password)?;
    let user = state.db.create_user(name, &email, &password_hash).await?;
    info!("New user signed up: {}", user.id);

    let (token, cookie) = start_session(&state, user.id).await?;
    let response = AuthResponse {
        user_id: user.id,
        email: user.email,
        name: user.name,
        token,
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(invalid());
    };

    let user_creds = match state
        .db
        .get_credentials_by_email(&normalize_email(&email))
        .await
    {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    let Some(hash) = user_creds.hashed_password.as_deref() else {
        return Err(invalid());
    };
    if !verify_password(&password, hash)? {
        return Err(invalid());
    }

    let (token, cookie) = start_session(&state, user_creds.user_id).await?;
    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
        name: user_creds.name,
        token,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /api/auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let auth_session_id = session_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("No session found".to_string()))?;

    state.db.delete_auth_session(auth_session_id).await?;

    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageDto::new("Logged out")),
    ))
}

/// GET /api/auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserDto),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> ApiResult<Json<UserDto>> {
    let user = state.db.get_user_by_id(user_id).await?;
    Ok(Json(user.summary().into()))
}

/// POST /api/auth/forgot-password - Mail a password reset link
///
/// Answers the same way whether or not the account exists.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageDto),
        (status = 400, description = "Email missing")
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageDto>> {
    let email = req.email.as_deref().map(normalize_email).unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required!"));
    }

    let user = match state.db.get_user_by_email(&email).await {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => return Ok(Json(MessageDto::new(RESET_ACK))),
        Err(e) => return Err(e.into()),
    };

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(state.config.reset_token_ttl_minutes);
    state.db.set_reset_token(user.id, &token, expires_at).await?;

    let reset_url = format!("{}/reset-password?token={}", state.config.public_url, token);
    let mail = OutgoingMail {
        to: user.email.clone(),
        subject: "Reset Password - Workflow App".to_string(),
        html_body: format!(
            "<p>You requested a password reset.</p>\n\
             <a href=\"{}\">Click here to reset password</a>\n\
             <p>Link expires in {} minutes.</p>",
            reset_url, state.config.reset_token_ttl_minutes
        ),
    };
    if let Err(e) = state.mailer.send(mail).await {
        error!("Failed to send reset mail to {}: {:?}", user.id, e);
        return Err(ApiError::Internal("Failed to send reset mail".to_string()));
    }

    Ok(Json(MessageDto::new(RESET_ACK)))
}

/// POST /api/auth/reset-password - Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageDto),
        (status = 400, description = "Missing fields or invalid/expired token")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> ApiResult<Json<MessageDto>> {
    let (Some(token), Some(password)) = (
        req.token.filter(|t| !t.trim().is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };
    check_password_strength(&password)?;

    let password_hash = hash_password(&password)?;
    match state
        .db
        .reset_password(token.trim(), &password_hash, Utc::now())
        .await
    {
        Ok(user_id) => {
            info!("Password reset for user {}", user_id);
            Ok(Json(MessageDto::new("Password reset is done successfully")))
        }
        Err(PortError::NotFound(_)) => Err(ApiError::bad_request("Invalid or expired token")),
        Err(e) => Err(e.into()),
    }
}
