//! HTTP proxy: shared forwarding plus the two entry points

mod cors;
mod error;
pub mod function;
mod handler;
mod operation;
pub mod server;

use serde::{Deserialize, Serialize};

pub use error::ProxyError;
pub use handler::ProxyHandler;
pub use operation::{chat_reply, speech_reply, ModelDefaults, Operation, UpstreamPayload};
pub use server::{build_http_client, router, run_server, ProxyState};

/// How requests reach the forwarding logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    /// Long-running server with health check and CORS middleware
    #[default]
    Server,
    /// Per-operation function handlers that do their own method dispatch
    Function,
}

impl EntryPoint {
    /// Chat model used when neither the client nor the config names one.
    ///
    /// The two entry points have historically defaulted to different models
    /// and are kept that way.
    pub fn default_chat_model(&self) -> &'static str {
        match self {
            EntryPoint::Server => "gpt-4o-mini",
            EntryPoint::Function => "gpt-3.5-turbo",
        }
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryPoint::Server => write!(f, "server"),
            EntryPoint::Function => write!(f, "function"),
        }
    }
}
