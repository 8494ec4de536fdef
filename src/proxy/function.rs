//! Serverless-style entry point
//!
//! Each operation is a single function that receives every request for its
//! path, whatever the method, and does its own preflight and method
//! handling. [`invoke`] is the function body; [`function_router`] mounts
//! both functions so they can also be served locally.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};

use super::cors;
use super::handler::ProxyHandler;
use super::operation::Operation;
use super::server::ProxyState;
use super::ProxyError;

/// Handle one invocation of an operation function
pub async fn invoke(state: ProxyState, operation: Operation, req: Request<Body>) -> Response {
    if req.method() == Method::OPTIONS {
        return cors::preflight_response();
    }

    let response = if req.method() != Method::POST {
        tracing::debug!(method = %req.method(), path = operation.path(), "Rejected non-POST invocation");
        ProxyError::MethodNotAllowed.into_response()
    } else {
        ProxyHandler::new(state).handle(operation, req).await
    };

    cors::allow_any_origin(response)
}

/// Routes for the function entry point. No health check.
pub fn function_router(state: ProxyState) -> Router {
    Router::new()
        .route(Operation::Chat.path(), any(chat_function))
        .route(Operation::Speech.path(), any(tts_function))
        .with_state(state)
}

async fn chat_function(State(state): State<ProxyState>, req: Request<Body>) -> Response {
    invoke(state, Operation::Chat, req).await
}

async fn tts_function(State(state): State<ProxyState>, req: Request<Body>) -> Response {
    invoke(state, Operation::Speech, req).await
}
