//! Mock upstream API and request helpers shared by the integration tests
//!
//! Tests queue responses on the mock before each request and inspect what
//! the proxy sent afterwards.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower::ServiceExt;

use keyguard_proxy::{router, AppConfig, EntryPoint, ProxyState};

pub const API_KEY: &str = "sk-test-key";

/// A response the mock will serve for the next upstream call
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.to_string().into_bytes(),
        }
    }

    pub fn audio(bytes: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: "audio/mpeg".to_string(),
            body: bytes.to_vec(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }
}

/// A request received by the mock upstream
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
struct UpstreamState {
    response_queue: VecDeque<MockResponse>,
    received_requests: Vec<ReceivedRequest>,
}

type SharedUpstreamState = Arc<Mutex<UpstreamState>>;

pub struct MockUpstream {
    pub url: String,
    state: SharedUpstreamState,
}

impl MockUpstream {
    /// Bind to an ephemeral port and serve in the background
    pub async fn start() -> Self {
        let state = SharedUpstreamState::default();
        let app = Router::new()
            .fallback(handle_upstream)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn push(&self, response: MockResponse) {
        self.state.lock().unwrap().response_queue.push_back(response);
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.state.lock().unwrap().received_requests.clone()
    }
}

async fn handle_upstream(State(state): State<SharedUpstreamState>, request: Request<Body>) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body_bytes = to_bytes(request.into_body(), usize::MAX).await.unwrap_or_default();
    let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    let mock = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(ReceivedRequest {
            method,
            path,
            authorization,
            body,
        });
        state
            .response_queue
            .pop_front()
            .unwrap_or_else(|| MockResponse::json(500, json!({"error": "no mock queued"})))
    };

    Response::builder()
        .status(StatusCode::from_u16(mock.status).unwrap())
        .header("Content-Type", mock.content_type)
        .body(Body::from(mock.body))
        .unwrap()
        .into_response()
}

/// Proxy router pointed at `upstream_url`
pub fn proxy_app(upstream_url: &str, api_key: Option<&str>, entry_point: EntryPoint) -> Router {
    let mut config = AppConfig::default();
    config.upstream.url = upstream_url.to_string();
    config.upstream.api_key = api_key.map(str::to_string);
    router(ProxyState::new(config, entry_point).unwrap())
}

pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(app: Router, request: Request<Body>) -> ProxyResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    ProxyResponse {
        status,
        headers,
        body,
    }
}

pub fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn chat_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test001",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

pub const ENTRY_POINTS: [EntryPoint; 2] = [EntryPoint::Server, EntryPoint::Function];
