//! Gateway to the external chat-completion endpoint.
//!
//! Queries the local engines can't resolve are forwarded here with a rendered survey context.

pub mod client;
pub mod error;
pub mod types;

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use client::{ChatProvider, CompletionClient};

pub use error::CompletionError;
pub use types::*;

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, CompletionError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Completion client plus retry with exponential backoff.
pub struct CompletionGateway {
    client: CompletionClient,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl ChatGateway for CompletionGateway {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, CompletionError> {
        CompletionGateway::chat(self, req).await
    }
}

impl CompletionGateway {
    pub fn from_env() -> Result<Self, CompletionError> {
        let client = CompletionClient::from_env()?;
        Ok(Self {
            client,
            config: GatewayConfig::default(),
        })
    }

    pub fn with_config(client: CompletionClient, config: GatewayConfig) -> Self {
        Self { client, config }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, CompletionError> {
        let mut attempt = 0;
        loop {
            match self.client.chat(&req).await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        endpoint = %self.client.endpoint(),
                        attempt,
                        code = err.code(),
                        error = %err,
                        "completion failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u64.pow(attempt.min(5));
    base * multiplier as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(base, 9), Duration::from_millis(3200));
    }
}
