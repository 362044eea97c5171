use axum::{Extension, Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use super::super::AppState;
use super::super::auth::{AuthToken, AuthUser};
use crate::error::ApiError;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "a valid email address is required"))]
    email: String,
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "a valid email address is required"))]
    email: String,
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    if state
        .db
        .get_user_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::validation("email", "email is already registered"));
    }

    let user = state
        .db
        .create_user(
            &payload.email,
            &payload.name,
            &payload.password,
            &state.config.auth_secret,
        )
        .await?;
    let (token, session) = state
        .db
        .create_session(&user.id, &state.config.auth_secret, state.config.session_ttl_secs)
        .await?;

    tracing::info!("registered user {}", user.email);
    Ok(Json(json!({
        "success": true,
        "user": user,
        "token": token,
        "expiresAt": session.expires_at,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    let user = state
        .db
        .verify_login(&payload.email, &payload.password, &state.config.auth_secret)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let (token, session) = state
        .db
        .create_session(&user.id, &state.config.auth_secret, state.config.session_ttl_secs)
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "token": token,
        "expiresAt": session.expires_at,
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(AuthToken(token)): Extension<AuthToken>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .delete_session(&token, &state.config.auth_secret)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn profile(
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "success": true, "user": user })))
}
