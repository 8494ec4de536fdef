//! Frontend and upstream API types

mod frontend;
mod openai;

pub use frontend::*;
pub use openai::{
    first_choice_text, AudioFormat, ChatCompletionRequest, Message, Role,
    SpeechRequest as UpstreamSpeechRequest,
};
