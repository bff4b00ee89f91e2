//! Ollama provider for local open-source models.
//!
//! Ollama must be running locally (default: http://localhost:11434) or at the
//! address in `OLLAMA_HOST`.

mod client;

pub use client::{ChatClient, ChunkStream, ClientError, OllamaClient};

use async_trait::async_trait;
use futures::{stream, TryStreamExt};
use specify_core::types::DEFAULT_OLLAMA_HOST;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::types::build_messages;
use crate::{Provider, TextStream};

/// Registry name of this provider.
pub const PROVIDER_NAME: &str = "ollama";

/// Failure descriptions containing any of these are connectivity problems.
const CONNECTION_KEYWORDS: &[&str] = &[
    "connection",
    "refused",
    "timeout",
    "timed out",
    "unreachable",
    "network",
    "dns",
    "host",
    "name or service not known",
];

/// Ollama provider for local models.
pub struct OllamaProvider<C = OllamaClient> {
    /// Settings this provider was created with.
    config: ProviderConfig,

    /// Server address, for error messages.
    host: String,

    /// Chat client; owned for the provider's lifetime.
    client: C,
}

impl OllamaProvider {
    /// Create a provider talking HTTP to `config.base_url()` or the default host.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let host = config
            .base_url()
            .unwrap_or(DEFAULT_OLLAMA_HOST)
            .to_string();
        let client = OllamaClient::new(host.clone(), config.timeout())
            .map_err(|e| ProviderError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            host,
            client,
        })
    }
}

impl<C: ChatClient> OllamaProvider<C> {
    /// Create a provider over an explicit chat client.
    pub fn with_client(config: ProviderConfig, client: C) -> Self {
        let host = config
            .base_url()
            .unwrap_or(DEFAULT_OLLAMA_HOST)
            .to_string();
        Self {
            config,
            host,
            client,
        }
    }

    /// Server address.
    pub fn host(&self) -> &str {
        &self.host
    }

    fn classify(&self, error: ClientError) -> ProviderError {
        classify_failure(&self.host, error.message())
    }
}

/// Map a failure description to a connection or response error.
pub fn classify_failure(host: &str, description: &str) -> ProviderError {
    let lowered = description.to_lowercase();
    if CONNECTION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        ProviderError::connection(format!(
            "Failed to connect to Ollama at {host}: {description}"
        ))
    } else {
        ProviderError::response(format!("Ollama API error: {description}"))
    }
}

#[async_trait]
impl<C: ChatClient> Provider for OllamaProvider<C> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn generate(&self, prompt: &str, rules: &str) -> Result<String> {
        let messages = build_messages(prompt, rules);
        debug!(model = self.config.model(), messages = messages.len(), "generating");

        let content = self
            .client
            .chat(self.config.model(), &messages)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(content.unwrap_or_default())
    }

    fn stream<'a>(&'a self, prompt: &str, rules: &str) -> TextStream<'a> {
        let messages = build_messages(prompt, rules);
        let open = async move {
            debug!(model = self.config.model(), messages = messages.len(), "opening stream");
            self.client.chat_stream(self.config.model(), &messages).await
        };

        Box::pin(
            stream::once(open)
                .try_flatten()
                .map_err(move |e| self.classify(e)),
        )
    }

    async fn validate_connection(&self) -> bool {
        match self.client.list_models().await {
            Ok(models) => {
                debug!(host = %self.host, models = models.len(), "Ollama is reachable");
                true
            }
            Err(e) => {
                debug!(host = %self.host, error = %e, "Ollama is not reachable");
                false
            }
        }
    }
}
