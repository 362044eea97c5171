use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::ApiError;
use crate::store::types::UserRecord;

/// The authenticated user, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserRecord);

/// The raw bearer token the request carried, kept for logout revocation.
#[derive(Debug, Clone)]
pub struct AuthToken(pub String);

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let raw_token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let raw_token = match raw_token {
        Some(t) => t,
        None => {
            return ApiError::Unauthorized(
                "Missing or invalid Authorization header. Use: Bearer <token>".to_string(),
            )
            .into_response();
        }
    };

    let user = match state
        .db
        .validate_session(&raw_token, &state.config.auth_secret)
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ApiError::Unauthorized("Invalid or expired session token".to_string())
                .into_response();
        }
        Err(e) => return ApiError::Internal(e).into_response(),
    };

    req.extensions_mut().insert(AuthUser(user));
    req.extensions_mut().insert(AuthToken(raw_token));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_state;
    use axum::http::StatusCode;
    use axum::{Extension, Json, Router, middleware, routing::get};
    use serde_json::json;
    use tower::util::ServiceExt;

    fn protected_app(state: AppState) -> Router {
        Router::new()
            .route(
                "/auth/profile",
                get(|Extension(AuthUser(user)): Extension<AuthUser>| async move {
                    Json(json!({ "email": user.email })).into_response()
                }),
            )
            .layer(middleware::from_fn_with_state(
                state.clone(),
                super::require_auth,
            ))
            .with_state(state)
    }

    async fn request_status(app: Router, headers: Vec<(&str, String)>) -> StatusCode {
        let mut builder = Request::builder().uri("/auth/profile");
        for (k, v) in headers {
            builder = builder.header(k, v);
        }
        let req = builder.body(Body::empty()).expect("request should build");
        app.oneshot(req)
            .await
            .expect("oneshot should succeed")
            .status()
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let (state, _) = test_state().await;
        let status = request_status(protected_app(state), vec![]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let (state, _) = test_state().await;
        let status = request_status(
            protected_app(state),
            vec![("authorization", "Bearer tfk_0000".to_string())],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_bearer_token_passes() {
        let (state, token) = test_state().await;
        let status = request_status(
            protected_app(state),
            vec![("authorization", format!("Bearer {}", token))],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn token_without_bearer_prefix_is_rejected() {
        let (state, token) = test_state().await;
        let status = request_status(protected_app(state), vec![("authorization", token)]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
