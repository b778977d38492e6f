//! HTTP transport for the Anthropic Messages API.

use super::client::{CompletionTransport, TokenSink};
use super::error::{CompletionError, FailureKind, ServiceError};
use crate::config::Config;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicTransport {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicTransport")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Error body shared by HTTP errors and in-stream `error` events
#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    error_type: String,
    #[serde(default)]
    message: String,
}

/// The subset of stream events we act on
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl AnthropicTransport {
    pub fn new(config: &Config, api_key: String) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(CompletionError::HttpClient)?;
        Ok(Self {
            http,
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    async fn send(&self, system: &str, user: &str, stream: bool) -> Result<reqwest::Response, ServiceError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [Message {
                role: "user",
                content: user,
            }],
            stream,
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|err| ServiceError::from_reqwest(&err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);
        Err(ServiceError::from_status(status.as_u16(), &message))
    }
}

#[async_trait]
impl CompletionTransport for AnthropicTransport {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ServiceError> {
        let response = self.send(system, user, false).await?;
        let text = response
            .text()
            .await
            .map_err(|err| ServiceError::from_reqwest(&err))?;
        let parsed: MessagesResponse = serde_json::from_str(&text).map_err(|err| {
            ServiceError::without_status(
                FailureKind::Unknown,
                &format!("Failed to parse response: {}", err),
            )
        })?;
        Ok(first_text_block(parsed))
    }

    async fn stream(
        &self,
        system: &str,
        user: &str,
        on_token: &mut TokenSink<'_>,
    ) -> Result<String, ServiceError> {
        let response = self.send(system, user, true).await?;
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut content = String::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|err| ServiceError::from_reqwest(&err))?;
            for payload in decoder.push_bytes(&chunk) {
                if apply_stream_payload(&payload, &mut content, on_token)? {
                    return Ok(content);
                }
            }
        }
        if let Some(payload) = decoder.finish() {
            apply_stream_payload(&payload, &mut content, on_token)?;
        }
        Ok(content)
    }
}

fn first_text_block(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .find(|block| block.block_type == "text")
        .and_then(|block| block.text)
        .unwrap_or_default()
}

/// Apply one SSE payload. Returns `Ok(true)` once the message is complete.
fn apply_stream_payload(
    payload: &str,
    content: &mut String,
    on_token: &mut TokenSink<'_>,
) -> Result<bool, ServiceError> {
    let Ok(event) = serde_json::from_str::<StreamEvent>(payload) else {
        return Ok(false);
    };
    match event {
        StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        } => {
            on_token(&text);
            content.push_str(&text);
            Ok(false)
        }
        StreamEvent::MessageStop => Ok(true),
        StreamEvent::Error { error } => Err(stream_error(&error)),
        StreamEvent::ContentBlockDelta { .. } | StreamEvent::Other => Ok(false),
    }
}

/// Map an in-stream error event onto the status the API would have returned.
fn stream_error(error: &ApiError) -> ServiceError {
    let status = match error.error_type.as_str() {
        "overloaded_error" => Some(529),
        "rate_limit_error" => Some(429),
        "api_error" => Some(500),
        "invalid_request_error" => Some(400),
        "authentication_error" => Some(401),
        "permission_error" => Some(403),
        "not_found_error" => Some(404),
        _ => None,
    };
    match status {
        Some(status) => ServiceError::from_status(status, &error.message),
        None => ServiceError::without_status(FailureKind::Unknown, &error.message),
    }
}

/// Incremental server-sent-events decoder.
///
/// Feed it arbitrary chunks; it hands back the `data:` payload of every
/// completed event. Multi-line data is joined with `\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Trailing bytes of a UTF-8 sequence split across chunks
    pending: Vec<u8>,
    buffer: String,
    event_data: String,
}

impl SseDecoder {
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let text = match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            Err(err) if err.error_len().is_none() => {
                let valid = err.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        };
        self.push(&text)
    }

    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() {
                if !self.event_data.is_empty() {
                    payloads.push(std::mem::take(&mut self.event_data));
                }
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                if !self.event_data.is_empty() {
                    self.event_data.push('\n');
                }
                self.event_data.push_str(data.strip_prefix(' ').unwrap_or(data));
            }
        }

        payloads
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if let Some(data) = self.buffer.trim_end().strip_prefix("data:") {
            if !self.event_data.is_empty() {
                self.event_data.push('\n');
            }
            self.event_data.push_str(data.trim_start());
        }
        self.buffer.clear();
        let data = std::mem::take(&mut self.event_data);
        if data.trim().is_empty() {
            None
        } else {
            Some(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_payloads(payloads: &[&str]) -> (Result<String, ServiceError>, Vec<String>) {
        let mut tokens = Vec::new();
        let mut content = String::new();
        let mut sink = |t: &str| tokens.push(t.to_string());
        let mut result = Ok(content.clone());
        for payload in payloads {
            match apply_stream_payload(payload, &mut content, &mut sink) {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        let result = result.map(|_| content);
        (result, tokens)
    }

    #[test]
    fn test_sse_decoder_handles_split_chunks_and_crlf() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push("event: content_block_delta\r\nda").is_empty());
        assert!(decoder.push("ta: {\"a\":1}\r\n").is_empty());
        let payloads = decoder.push("\r\ndata: second\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_sse_decoder_reassembles_split_utf8() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: \u{00e9}t\u{00e9}\n\n".as_bytes();
        // Split inside the first two-byte sequence.
        assert!(decoder.push_bytes(&bytes[..7]).is_empty());
        let payloads = decoder.push_bytes(&bytes[7..]);
        assert_eq!(payloads, vec!["\u{00e9}t\u{00e9}".to_string()]);
    }

    #[test]
    fn test_sse_decoder_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push("data: one\ndata: two\n\n");
        assert_eq!(payloads, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn test_sse_decoder_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push("data: {\"type\":\"message_stop\"}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("{\"type\":\"message_stop\"}"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_text_deltas_accumulate_and_reach_sink() {
        let (result, tokens) = run_payloads(&[
            r#"{"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"[{\"title\""}}"#,
            r#"{"type":"ping"}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":":\"X\"}]"}}"#,
            r#"{"type":"message_stop"}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"ignored"}}"#,
        ]);
        assert_eq!(result.unwrap(), r#"[{"title":"X"}]"#);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_overloaded_stream_event_is_retryable() {
        let (result, tokens) = run_payloads(&[
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"["}}"#,
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        ]);
        let err = result.unwrap_err();
        assert_eq!(err.status, Some(529));
        assert!(err.is_retryable());
        assert_eq!(tokens, vec!["[".to_string()]);
    }

    #[test]
    fn test_unknown_stream_error_is_not_retryable() {
        let (result, _) = run_payloads(&[r#"{"type":"error","error":{"type":"weird","message":"?"}}"#]);
        let err = result.unwrap_err();
        assert_eq!(err.status, None);
        assert_eq!(err.kind, FailureKind::Unknown);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_first_text_block_skips_other_blocks() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"[]"}]}"#,
        )
        .unwrap();
        assert_eq!(first_text_block(parsed), "[]");

        let empty: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(first_text_block(empty), "");
    }

    #[test]
    fn test_request_body_shape() {
        let body = MessagesRequest {
            model: "claude-sonnet-4-6",
            max_tokens: 8192,
            system: "sys",
            messages: [Message {
                role: "user",
                content: "hi",
            }],
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["system"], "sys");
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn test_transport_debug_hides_api_key() {
        let transport = AnthropicTransport::new(&Config::default(), "sk-secret".to_string()).unwrap();
        assert!(!format!("{transport:?}").contains("sk-secret"));
    }
}
