#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::{Request, Response};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use isomind_dashboard::{AppState, Config, router};

pub const VALID_TOKEN: &str = "valid-access-token";
const MAX_SIZE: usize = 1024 * 1024;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The dashboard wired to one mock server standing in for the
/// orchestrator and Supabase alike.
pub struct TestContext {
    pub mock_server: MockServer,
    pub state: Arc<AppState>,
    pub app: Router,
}

impl TestContext {
    pub async fn new() -> Self {
        init_logging();
        let mock_server = MockServer::start().await;
        let config = Config {
            orchestrator_base_url: mock_server.uri(),
            supabase_url: mock_server.uri(),
            supabase_anon_key: "anon-key".to_string(),
            request_timeout_secs: 5,
            ..Config::default()
        };
        Self::with_config(mock_server, config)
    }

    pub fn with_config(mock_server: MockServer, config: Config) -> Self {
        let state = Arc::new(AppState::new(config).unwrap());
        let app = router(state.clone());
        Self {
            mock_server,
            state,
            app,
        }
    }

    /// Accepts `VALID_TOKEN` and rejects every other access token.
    pub async fn mock_identity(&self) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", format!("Bearer {}", VALID_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-1",
                "email": "ops@isomind.ai"
            })))
            .with_priority(1)
            .mount(&self.mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "msg": "invalid JWT"
            })))
            .with_priority(5)
            .mount(&self.mock_server)
            .await;
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(signed_in(Request::builder().uri(uri)).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(
            signed_in(Request::builder().method("POST").uri(uri))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

pub fn signed_in(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header(COOKIE, format!("isomind-access-token={}", VALID_TOKEN))
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), MAX_SIZE).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), MAX_SIZE).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
