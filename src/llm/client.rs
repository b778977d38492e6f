//! Completion client: one logical "complete(system, user) -> text" call with
//! retry and exponential backoff wrapped around a pluggable transport.
//!
//! Streaming and buffered calls share the same retry loop. A stream that
//! fails part way is restarted from scratch, so the token sink can see the
//! same prefix more than once: tokens are delivered at least once and are
//! meant for progress display, while the returned text is delivered exactly
//! once and is the only source of truth.

use super::anthropic::AnthropicTransport;
use super::error::{CompletionError, ServiceError};
use crate::config::Config;
use async_trait::async_trait;
use std::time::Duration;

/// Total attempts per call, including the first one
pub const MAX_ATTEMPTS: u32 = 3;
/// Delay before the second attempt; doubles for each later attempt
pub const INITIAL_BACKOFF_SECS: u64 = 2;
const BACKOFF_MULTIPLIER: u64 = 2;

/// Receives incremental text while a streamed completion is in flight.
pub type TokenSink<'a> = dyn FnMut(&str) + Send + 'a;

/// Remote completion service boundary.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Single buffered request; returns the full completion text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ServiceError>;

    /// Single streamed request; calls `on_token` for every text delta and
    /// returns the accumulated text.
    async fn stream(
        &self,
        system: &str,
        user: &str,
        on_token: &mut TokenSink<'_>,
    ) -> Result<String, ServiceError>;
}

/// How often and how patiently to retry rate-limited calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: Duration::from_secs(INITIAL_BACKOFF_SECS),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt `attempt` (0-based): 2s, 4s, 8s, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = BACKOFF_MULTIPLIER.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(u32::try_from(factor).unwrap_or(u32::MAX))
    }
}

/// Delivery mode for a completion call
pub enum CompletionMode<'a, 'b> {
    Buffered,
    Streaming(&'a mut TokenSink<'b>),
}

/// Completion client owning its transport and retry policy.
pub struct CompletionClient<T = AnthropicTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl CompletionClient<AnthropicTransport> {
    /// Validate the credential and build the HTTP transport.
    ///
    /// Fails with [`CompletionError::MissingCredential`] before any network
    /// traffic when `ANTHROPIC_API_KEY` is unset or blank.
    pub fn from_config(config: &Config) -> Result<Self, CompletionError> {
        let api_key = Config::api_key().ok_or(CompletionError::MissingCredential)?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &Config, api_key: String) -> Result<Self, CompletionError> {
        if api_key.trim().is_empty() {
            return Err(CompletionError::MissingCredential);
        }
        let transport = AnthropicTransport::new(config, api_key)?;
        Ok(Self::new(transport, RetryPolicy::default()))
    }
}

impl<T: CompletionTransport> CompletionClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one completion, retrying the whole attempt on 429/529.
    ///
    /// Any other failure is returned immediately without sleeping.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        mut mode: CompletionMode<'_, '_>,
    ) -> Result<String, CompletionError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            let result = match &mut mode {
                CompletionMode::Buffered => self.transport.complete(system, user).await,
                CompletionMode::Streaming(sink) => {
                    self.transport.stream(system, user, &mut **sink).await
                }
            };

            let err = match result {
                Ok(text) => {
                    if attempt > 0 {
                        tracing::debug!(attempt = attempt + 1, "completion succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::debug!(kind = %err.kind, status = ?err.status, "non-retryable completion failure");
                return Err(CompletionError::Service(err));
            }

            if attempt + 1 >= max_attempts {
                return Err(CompletionError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: err,
                });
            }

            let delay = self.policy.backoff(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts,
                status = ?err.status,
                delay_secs = delay.as_secs(),
                "completion rate limited, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Buffered completion
    pub async fn complete_buffered(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        self.complete(system, user, CompletionMode::Buffered).await
    }

    /// Streamed completion; see the module docs for the token delivery contract.
    pub async fn complete_streaming(
        &self,
        system: &str,
        user: &str,
        on_token: &mut TokenSink<'_>,
    ) -> Result<String, CompletionError> {
        self.complete(system, user, CompletionMode::Streaming(on_token))
            .await
    }
}
