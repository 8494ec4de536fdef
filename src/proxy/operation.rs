//! The two proxied operations and their request/response translation

use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use super::{EntryPoint, ProxyError};
use crate::api::{
    first_choice_text, parse_body, AudioFormat, ChatCompletionRequest, ChatReply, ChatRequest,
    Message, SpeechRequest, UpstreamSpeechRequest,
};
use crate::config::UpstreamConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Chat,
    Speech,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Chat => "chat",
            Operation::Speech => "tts",
        }
    }

    /// Frontend-facing route
    pub fn path(&self) -> &'static str {
        match self {
            Operation::Chat => "/api/chat",
            Operation::Speech => "/api/tts",
        }
    }

    pub fn upstream_url(&self, upstream: &UpstreamConfig) -> String {
        match self {
            Operation::Chat => upstream.chat_completions_url(),
            Operation::Speech => upstream.speech_url(),
        }
    }

    fn upstream_error_message(&self) -> &'static str {
        match self {
            Operation::Chat => "OpenAI error",
            Operation::Speech => "OpenAI TTS error",
        }
    }

    /// Wrap a non-success upstream reply
    pub fn upstream_error(&self, status: axum::http::StatusCode, details: Value) -> ProxyError {
        ProxyError::Upstream {
            status,
            message: self.upstream_error_message(),
            details,
        }
    }
}

/// Model and voice used when the frontend omits them
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefaults {
    pub chat_model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

impl ModelDefaults {
    pub fn resolve(upstream: &UpstreamConfig, entry_point: EntryPoint) -> Self {
        Self {
            chat_model: upstream
                .chat_model
                .clone()
                .unwrap_or_else(|| entry_point.default_chat_model().to_string()),
            tts_model: upstream.tts_model.clone(),
            tts_voice: upstream.tts_voice.clone(),
        }
    }
}

/// Body of the single outbound call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UpstreamPayload {
    Chat(ChatCompletionRequest),
    Speech(UpstreamSpeechRequest),
}

impl UpstreamPayload {
    /// Validate a frontend body and reshape it for the upstream API
    pub fn from_body(
        operation: Operation,
        body: &[u8],
        defaults: &ModelDefaults,
    ) -> Result<Self, ProxyError> {
        match operation {
            Operation::Chat => {
                let req: ChatRequest = parse_body(body);
                let user_prompt = req.user_prompt.ok_or(ProxyError::MissingField("userPrompt"))?;

                let mut messages = Vec::with_capacity(2);
                if let Some(system_prompt) = req.system_prompt {
                    messages.push(Message::system(system_prompt));
                }
                messages.push(Message::user(user_prompt));

                Ok(UpstreamPayload::Chat(ChatCompletionRequest {
                    model: req.model.unwrap_or_else(|| defaults.chat_model.clone()),
                    messages,
                }))
            }
            Operation::Speech => {
                let req: SpeechRequest = parse_body(body);
                let text = req.text.ok_or(ProxyError::MissingField("text"))?;

                Ok(UpstreamPayload::Speech(UpstreamSpeechRequest {
                    model: req.model.unwrap_or_else(|| defaults.tts_model.clone()),
                    input: text,
                    voice: req.voice.unwrap_or_else(|| defaults.tts_voice.clone()),
                    format: AudioFormat::Mp3,
                }))
            }
        }
    }

    pub fn model(&self) -> &str {
        match self {
            UpstreamPayload::Chat(req) => &req.model,
            UpstreamPayload::Speech(req) => &req.model,
        }
    }
}

/// Reshape a successful chat completion into `{text}`
pub fn chat_reply(upstream_json: &Value) -> Response {
    Json(ChatReply {
        text: first_choice_text(upstream_json),
    })
    .into_response()
}

/// Relay synthesized audio untouched
pub fn speech_reply(audio: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, AudioFormat::Mp3.mime_type()),
            (header::CACHE_CONTROL, "no-store"),
        ],
        audio,
    )
        .into_response()
}
