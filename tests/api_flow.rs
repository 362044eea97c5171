//! End-to-end conversation flow against the real router with a scripted
//! gateway: register, create a workflow, talk each phase to readiness,
//! advance explicitly, submit the summit summary, and generate test cases.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use testforge::ai::{ChatMessage, LlmGateway};
use testforge::config::Config;
use testforge::store::Database;
use testforge::web::{AppState, build_api_router};

struct ScriptedGateway {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }

    fn push_reply(&self, text: &str, kind: &str) {
        self.replies.lock().unwrap().push_back(
            json!({ "aiResponse": text, "messageType": kind }).to_string(),
        );
    }

    fn push_raw(&self, raw: &str) {
        self.replies.lock().unwrap().push_back(raw.to_string());
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted gateway exhausted"))
    }
}

fn test_config() -> Config {
    Config {
        port: 0,
        app_env: "test".to_string(),
        database_url: ":memory:".to_string(),
        auth_secret: "integration-secret-0123456789".to_string(),
        session_ttl_secs: 3600,
        openai_api_key: String::new(),
        openai_base_url: "http://127.0.0.1:0/unused".to_string(),
        openai_model: "mock".to_string(),
        openai_max_tokens: 256,
        rate_limit_window_ms: 60_000,
        rate_limit_max: 10_000,
    }
}

struct Harness {
    state: AppState,
    gateway: Arc<ScriptedGateway>,
    token: String,
}

impl Harness {
    async fn start(db_path: &str) -> Self {
        let gateway = Arc::new(ScriptedGateway::new());
        let db = Database::open(db_path).expect("database should open");
        let state = AppState::new(test_config(), db, gateway.clone());

        let mut harness = Self {
            state,
            gateway,
            token: String::new(),
        };
        let (status, body) = harness
            .request(
                Method::POST,
                "/auth/register",
                Some(json!({
                    "email": "qa@example.com",
                    "name": "QA Engineer",
                    "password": "integration-pass"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        harness.token = body["token"].as_str().unwrap().to_string();
        harness
    }

    fn app(&self) -> Router {
        build_api_router(self.state.clone())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
            None => Body::empty(),
        };
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if !self.token.is_empty() {
            builder = builder.header("authorization", format!("Bearer {}", self.token));
        }
        let req = builder.body(body).unwrap();
        let resp = self.app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap_or(json!({}));
        (status, json)
    }

    /// Three substantial user turns; the third should raise readiness.
    async fn talk_phase_to_ready(&self, workflow_id: &str) {
        for i in 0..3 {
            self.gateway
                .push_reply("Noted, tell me more about the edge cases.", "QUESTION");
            let content = format!("turn {} {}", i, "detail ".repeat(60));
            let (status, body) = self
                .request(
                    Method::POST,
                    &format!("/conversational-workflow/{}/chat", workflow_id),
                    Some(json!({ "content": content })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "chat failed: {}", body);
        }
    }
}

fn temp_db_path(name: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(format!("{}.db", name));
    (dir, path.to_string_lossy().into_owned())
}

#[tokio::test]
async fn full_workflow_lifecycle() {
    let (_dir, db_path) = temp_db_path("lifecycle");
    let harness = Harness::start(&db_path).await;

    // Create.
    let (status, body) = harness
        .request(
            Method::POST,
            "/conversational-workflow",
            Some(json!({
                "title": "Saved card checkout",
                "description": "Checkout rework",
                "epicContent": "As a shopper I want to pay with a saved card so checkout is faster"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let workflow_id = body["workflow"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["workflow"]["phase"], "ANALYSIS");

    // A thin first turn does not complete the phase.
    harness.gateway.push_reply("What is in scope?", "QUESTION");
    let (status, body) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/chat", workflow_id),
            Some(json!({ "content": "just cards" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phaseComplete"], false);
    assert_eq!(body["status"], "IN_PROGRESS");

    // Completing is rejected until the evaluator is satisfied.
    let (status, _) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/complete", workflow_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Earn readiness; the phase itself must not move.
    harness.talk_phase_to_ready(&workflow_id).await;
    let (_, body) = harness
        .request(
            Method::GET,
            &format!("/conversational-workflow/{}/status", workflow_id),
            None,
        )
        .await;
    assert_eq!(body["workflow"]["status"], "READY_TO_ADVANCE");
    assert_eq!(body["workflow"]["phase"], "ANALYSIS");
    assert!(body["workflow"]["completeness"]["overallScore"].as_u64().unwrap() >= 70);

    // Explicit advance: ANALYSIS -> STRATEGY.
    let (status, body) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/complete", workflow_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflow"]["phase"], "STRATEGY");
    assert_eq!(body["workflow"]["status"], "IN_PROGRESS");
    assert_eq!(body["workflow"]["completeness"]["overallScore"], 0);

    // STRATEGY and TEST_PLANNING each have to be earned again.
    harness.talk_phase_to_ready(&workflow_id).await;
    let (_, body) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/complete", workflow_id),
            None,
        )
        .await;
    assert_eq!(body["workflow"]["phase"], "TEST_PLANNING");

    harness.talk_phase_to_ready(&workflow_id).await;
    let (_, body) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/complete", workflow_id),
            None,
        )
        .await;
    assert_eq!(body["workflow"]["phase"], "COMPLETED");
    assert_eq!(body["workflow"]["status"], "COMPLETED");

    // Chat is closed once completed.
    let (status, _) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/chat", workflow_id),
            Some(json!({ "content": "one more thing" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Listings reflect the finished state.
    let (_, body) = harness
        .request(Method::GET, "/conversational-workflow/user/completed", None)
        .await;
    assert_eq!(body["workflows"].as_array().unwrap().len(), 1);
    let (_, body) = harness
        .request(Method::GET, "/conversational-workflow/user/in-progress", None)
        .await;
    assert_eq!(body["workflows"].as_array().unwrap().len(), 0);

    // Summit: generated by the gateway, then edited.
    harness
        .gateway
        .push_raw(r#"{"title": "Readiness report", "content": "All three phases are covered."}"#);
    let (status, body) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/summit", workflow_id),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "summit failed: {}", body);
    assert_eq!(body["summary"]["title"], "Readiness report");

    let (_, body) = harness
        .request(
            Method::GET,
            &format!("/conversational-workflow/{}/status", workflow_id),
            None,
        )
        .await;
    assert_eq!(body["workflow"]["status"], "SUBMITTED");

    let (status, body) = harness
        .request(
            Method::PATCH,
            &format!("/conversational-workflow/{}/summit", workflow_id),
            Some(json!({ "content": "Edited after review." })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["content"], "Edited after review.");
    assert_eq!(body["summary"]["title"], "Readiness report");

    // Test-case generation from the finished workflow.
    harness.gateway.push_raw(
        r#"{"testCases": [
            {"title": "Pay with saved card", "steps": ["Add card", "Checkout"], "expectedResult": "Order placed", "priority": "HIGH"},
            {"title": "Expired saved card", "steps": ["Use expired card"], "expectedResult": "Clear error shown", "priority": "MEDIUM"}
        ]}"#,
    );
    let (status, body) = harness
        .request(
            Method::POST,
            "/test-cases/generate",
            Some(json!({ "workflowId": workflow_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "generate failed: {}", body);
    assert_eq!(body["testCases"].as_array().unwrap().len(), 2);

    let (_, body) = harness
        .request(
            Method::GET,
            &format!("/test-cases/workflow/{}", workflow_id),
            None,
        )
        .await;
    assert_eq!(body["testCases"].as_array().unwrap().len(), 2);
    assert_eq!(body["testCases"][0]["title"], "Pay with saved card");
}

#[tokio::test]
async fn project_flavor_mirrors_workflow_flow() {
    let (_dir, db_path) = temp_db_path("projects");
    let harness = Harness::start(&db_path).await;

    let (status, body) = harness
        .request(
            Method::POST,
            "/projects/create-and-start",
            Some(json!({
                "name": "Payments",
                "description": "Payment rails",
                "epicContent": "Refund flows must be covered end to end"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "create-and-start failed: {}", body);
    let project_id = body["project"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["workflow"]["projectId"].as_str(), Some(body["project"]["id"].as_str().unwrap()));

    // A second concurrent start is rejected.
    let (status, _) = harness
        .request(
            Method::POST,
            &format!("/projects/{}/start", project_id),
            Some(json!({ "epicContent": "another epic" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Project chat routes to the active workflow.
    harness
        .gateway
        .push_reply("Which refund types exist?", "QUESTION");
    let (status, body) = harness
        .request(
            Method::POST,
            &format!("/projects/{}/chat", project_id),
            Some(json!({ "content": "Full and partial refunds are both supported today" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "project chat failed: {}", body);
    assert_eq!(body["aiResponse"], "Which refund types exist?");

    // Project complete is gated on readiness like the workflow route.
    let (status, _) = harness
        .request(
            Method::POST,
            &format!("/projects/{}/complete", project_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_model_output_is_a_hard_upstream_error() {
    let (_dir, db_path) = temp_db_path("contract");
    let harness = Harness::start(&db_path).await;

    let (_, body) = harness
        .request(
            Method::POST,
            "/conversational-workflow",
            Some(json!({ "title": "W", "epicContent": "seed epic" })),
        )
        .await;
    let workflow_id = body["workflow"]["id"].as_str().unwrap().to_string();

    harness
        .gateway
        .push_raw("Certainly! Here are my thoughts, in prose.");
    let (status, _) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/chat", workflow_id),
            Some(json!({ "content": "hello there" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // The next well-formed turn still works; the failed turn burned no state
    // beyond the user message itself.
    harness.gateway.push_reply("Back on track.", "ANSWER");
    let (status, _) = harness
        .request(
            Method::POST,
            &format!("/conversational-workflow/{}/chat", workflow_id),
            Some(json!({ "content": "trying again" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
