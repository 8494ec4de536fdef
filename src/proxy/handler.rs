//! Shared forwarding path used by both entry points

use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::time::Instant;
use tracing::Instrument;

use super::operation::{chat_reply, speech_reply, Operation, UpstreamPayload};
use super::server::ProxyState;
use super::ProxyError;

/// Forwards one frontend request upstream
pub struct ProxyHandler {
    state: ProxyState,
}

impl ProxyHandler {
    pub fn new(state: ProxyState) -> Self {
        Self { state }
    }

    /// Run one operation and always produce a response; errors are
    /// logged and rendered as the JSON envelope.
    pub async fn handle(&self, operation: Operation, req: Request<Body>) -> Response {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "forward",
            %request_id,
            operation = operation.name(),
            entry_point = %self.state.entry_point,
        );

        async move {
            let start = Instant::now();
            match self.forward(operation, req).await {
                Ok(response) => {
                    tracing::info!(
                        status = %response.status(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Request forwarded"
                    );
                    response
                }
                Err(e) => {
                    e.log();
                    e.into_response()
                }
            }
        }
        .instrument(span)
        .await
    }

    /// validate -> call upstream -> translate response
    async fn forward(&self, operation: Operation, req: Request<Body>) -> Result<Response, ProxyError> {
        let upstream = &self.state.config.upstream;
        let api_key = upstream.credential().ok_or(ProxyError::MissingCredential)?;

        let body = self.read_body(req).await?;
        let payload = UpstreamPayload::from_body(operation, &body, &self.state.defaults)?;

        let url = operation.upstream_url(upstream);
        tracing::debug!(url = %url, model = payload.model(), "Sending upstream request");

        let upstream_response = self
            .state
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = upstream_response.status();
        if !status.is_success() {
            // Best effort: whatever JSON upstream sent, or an empty object
            let details = upstream_response
                .json::<serde_json::Value>()
                .await
                .unwrap_or_else(|_| serde_json::json!({}));
            return Err(operation.upstream_error(status, details));
        }

        match operation {
            Operation::Chat => {
                let json: serde_json::Value = upstream_response.json().await?;
                Ok(chat_reply(&json))
            }
            Operation::Speech => {
                let audio = upstream_response.bytes().await?;
                tracing::debug!(audio_bytes = audio.len(), "Received synthesized audio");
                Ok(speech_reply(audio))
            }
        }
    }

    async fn read_body(&self, req: Request<Body>) -> Result<Bytes, ProxyError> {
        let limit = self.state.config.server.max_body_bytes;
        to_bytes(req.into_body(), limit).await.map_err(|e| {
            let inner = e.into_inner();
            if inner.is::<http_body_util::LengthLimitError>() {
                ProxyError::PayloadTooLarge
            } else {
                ProxyError::Body(inner.to_string())
            }
        })
    }
}
