//! Long-running proxy server

use axum::{
    extract::State,
    http::Method,
    middleware::{self, Next},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::cors;
use super::function::function_router;
use super::handler::ProxyHandler;
use super::operation::{ModelDefaults, Operation};
use super::{EntryPoint, ProxyError};
use crate::config::AppConfig;

/// Shared state for the proxy
#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<AppConfig>,
    pub http_client: reqwest::Client,
    pub entry_point: EntryPoint,
    pub defaults: Arc<ModelDefaults>,
}

impl ProxyState {
    pub fn new(config: AppConfig, entry_point: EntryPoint) -> Result<Self, reqwest::Error> {
        let http_client = build_http_client()?;
        let defaults = ModelDefaults::resolve(&config.upstream, entry_point);
        Ok(Self {
            config: Arc::new(config),
            http_client,
            entry_point,
            defaults: Arc::new(defaults),
        })
    }
}

/// Build the upstream HTTP client. Transport defaults apply; no timeout
/// override.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
}

/// Routes for the configured entry point
pub fn router(state: ProxyState) -> Router {
    match state.entry_point {
        EntryPoint::Server => server_router(state),
        EntryPoint::Function => function_router(state),
    }
}

/// Routes for the long-running server: health check plus both operations,
/// every response readable from any origin. OPTIONS is answered for every
/// path before routing.
pub fn server_router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler).fallback(method_not_allowed))
        .route(Operation::Chat.path(), post(chat_handler).fallback(method_not_allowed))
        .route(Operation::Speech.path(), post(tts_handler).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors::allow_origin_layer())
                .layer(middleware::from_fn(answer_preflight)),
        )
        .with_state(state)
}

/// Run the proxy server
pub async fn run_server(
    config: AppConfig,
    entry_point: EntryPoint,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    if config.upstream.credential().is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; chat and tts requests will fail until it is");
    }

    let state = ProxyState::new(config, entry_point)?;
    let upstream_url = state.config.upstream.base_url().to_string();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("keyguard-proxy ({}) listening on http://{}", entry_point, addr);
    tracing::info!("Forwarding to {}", upstream_url);

    Ok(axum::serve(listener, app).await?)
}

/// Health check endpoint
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn chat_handler(State(state): State<ProxyState>, req: axum::extract::Request) -> axum::response::Response {
    ProxyHandler::new(state).handle(Operation::Chat, req).await
}

async fn tts_handler(State(state): State<ProxyState>, req: axum::extract::Request) -> axum::response::Response {
    ProxyHandler::new(state).handle(Operation::Speech, req).await
}

/// Short-circuit preflights on any path; never reaches a route
async fn answer_preflight(req: axum::extract::Request, next: Next) -> axum::response::Response {
    if req.method() == Method::OPTIONS {
        return cors::preflight_response();
    }
    next.run(req).await
}

async fn method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}

async fn not_found() -> ProxyError {
    ProxyError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        server_router(ProxyState::new(AppConfig::default(), EntryPoint::Server).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_get_on_operation_is_method_not_allowed() {
        let response = app()
            .oneshot(Request::get("/api/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = app()
            .oneshot(Request::get("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn test_post_on_health_is_method_not_allowed() {
        let response = app()
            .oneshot(Request::post("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn test_options_answered_on_every_path() {
        for path in ["/api/health", "/api/chat", "/api/unknown"] {
            let request = Request::builder()
                .method(Method::OPTIONS)
                .uri(path)
                .body(Body::empty())
                .unwrap();
            let response = app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
            assert_eq!(
                response
                    .headers()
                    .get(axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS)
                    .unwrap(),
                "Content-Type"
            );
        }
    }

    #[test]
    fn test_router_follows_entry_point() {
        let state = ProxyState::new(AppConfig::default(), EntryPoint::Function).unwrap();
        assert_eq!(state.defaults.chat_model, "gpt-3.5-turbo");
        let _ = router(state);
    }
}
