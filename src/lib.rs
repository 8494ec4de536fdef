//! keyguard-proxy: credential-hiding proxy for a generative AI HTTP API
//!
//! Features:
//! - Chat completion proxy (`POST /api/chat` -> `{text}`)
//! - Text-to-speech proxy (`POST /api/tts` -> `audio/mpeg`)
//! - Long-running server and serverless-style function entry points
//! - Credential injected server-side, never exposed to the browser

pub mod api;
pub mod config;
pub mod proxy;

pub use config::AppConfig;
pub use proxy::{router, run_server, EntryPoint, Operation, ProxyState};
