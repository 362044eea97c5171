use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use super::AppState;
use super::auth;
use super::handlers::{auth as auth_handlers, projects, test_cases, workflows};
use super::rate_limit;

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_endpoint))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .with_state(state.clone());

    let authed_routes = Router::new()
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/profile", get(auth_handlers::profile))
        .route(
            "/conversational-workflow",
            post(workflows::create_workflow),
        )
        .route(
            "/conversational-workflow/user/in-progress",
            get(workflows::list_in_progress),
        )
        .route(
            "/conversational-workflow/user/completed",
            get(workflows::list_completed),
        )
        .route("/conversational-workflow/{id}/chat", post(workflows::chat))
        .route(
            "/conversational-workflow/{id}/status",
            get(workflows::status),
        )
        .route(
            "/conversational-workflow/{id}/complete",
            post(workflows::complete),
        )
        .route(
            "/conversational-workflow/{id}/reopen",
            post(workflows::reopen),
        )
        .route(
            "/conversational-workflow/{id}/summit",
            get(workflows::summit_get)
                .post(workflows::summit_create)
                .patch(workflows::summit_update),
        )
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/create-and-start", post(projects::create_and_start))
        .route("/projects/{id}", get(projects::get_project))
        .route("/projects/{id}/start", post(projects::start_workflow))
        .route("/projects/{id}/chat", post(projects::chat))
        .route("/projects/{id}/complete", post(projects::complete))
        .route("/test-cases/generate", post(test_cases::generate))
        .route(
            "/test-cases/workflow/{id}",
            get(test_cases::list_for_workflow),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .layer(build_cors())
        .with_state(state);

    public_routes.merge(authed_routes)
}

async fn health_endpoint() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}
