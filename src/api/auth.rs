use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::task;

use super::validation::{check_email, check_password, check_username};
use super::{ApiError, ApiResponse, AppState, AuthResponse, UserDto};
use crate::db::RegisterOutcome;
use crate::db::repositories::user::hash_password;

// ============================================================================
// Request Types
// ============================================================================

/// Missing fields deserialize to empty strings so the validators report
/// them as field errors instead of the body being rejected wholesale.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    /// Username, or email matched case-insensitively.
    pub identifier: String,
    pub password: String,
}

/// Authenticated caller, resolved by the middleware and threaded to every
/// handler through request extensions. All store operations are scoped by
/// this id.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser {
    pub id: i32,
}

// ============================================================================
// Middleware
// ============================================================================

/// Validates `Authorization: Bearer <token>` and stashes the resolved
/// user id in the request. No session state, no revocation; the token is
/// the whole story.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(request.headers()) else {
        return Err(ApiError::unauthorized("Missing bearer token"));
    };

    let claims = state
        .shared
        .tokens
        .verify(&token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    tracing::Span::current().record("user_id", claims.sub);
    request.extensions_mut().insert(CurrentUser { id: claims.sub });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    Some(token.trim().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = Vec::new();
    if let Err(e) = check_username(&payload.username) {
        errors.push(e);
    }
    if let Err(e) = check_email(&payload.email) {
        errors.push(e);
    }
    if let Err(e) = check_password(&payload.password) {
        errors.push(e);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let security = state.config().read().await.security.clone();
    let password = payload.password.clone();
    let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing task panicked: {e}")))??;

    let outcome = state
        .store()
        .register_user(&payload.username, &payload.email, password_hash)
        .await?;

    let user = match outcome {
        RegisterOutcome::Created(user) => user,
        RegisterOutcome::IdentityTaken => return Err(ApiError::IdentityTaken),
    };

    let token = state
        .shared
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    tracing::info!("Registered user {} (id {})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse {
            token,
            user: UserDto::from(user),
        })),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    if payload.identifier.is_empty() || payload.password.is_empty() {
        return Err(ApiError::InvalidCredentials);
    }

    // Unknown identifier and wrong password take the same path out.
    let user = state
        .store()
        .verify_credentials(&payload.identifier, &payload.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let token = state
        .shared
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    Ok(Json(ApiResponse::success(AuthResponse {
        token,
        user: UserDto::from(user),
    })))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .store()
        .get_user(current.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}
