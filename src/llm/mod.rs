pub mod anthropic;
pub mod client;
pub mod error;
pub mod parse;
pub mod prompts;

pub use anthropic::{AnthropicTransport, SseDecoder};
pub use client::{
    CompletionClient, CompletionMode, CompletionTransport, RetryPolicy, TokenSink, MAX_ATTEMPTS,
};
pub use error::{CompletionError, FailureKind, ServiceError, API_KEY_ENV};
pub use parse::{decode_finding, parse_findings};
pub use prompts::{build_analysis_prompt, SYSTEM_PROMPT};
