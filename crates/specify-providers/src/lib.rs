//! LLM provider layer for Specify.
//!
//! This crate defines what a backend must offer and how one is chosen:
//! - [`Provider`]: the capability set every backend implements
//! - [`ProviderConfig`]: validated connection settings
//! - [`ProviderRegistry`]: name-keyed constructors, with a process-wide
//!   [`default_registry`] that has the built-in backends registered
//! - [`ollama`]: the local Ollama backend
//!
//! # Example
//!
//! ```rust,ignore
//! use specify_providers::{default_registry, Provider, ProviderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProviderConfig::from_env("ollama", "llama3.2")?;
//!     let provider = default_registry().create("ollama", config)?;
//!
//!     let text = provider.generate("Describe a todo app", "Be concise.").await?;
//!     println!("{text}");
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
pub mod ollama;
mod registry;
mod types;

pub use config::{
    ProviderConfig, ProviderConfigBuilder, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
    MAX_RETRIES_RANGE, TIMEOUT_RANGE,
};
pub use error::{ProviderError, Result};
pub use ollama::OllamaProvider;
pub use registry::{default_registry, ProviderConstructor, ProviderRegistry};
pub use types::*;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Text chunks of a streamed response, borrowing the provider that made it.
pub type TextStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// An LLM backend that turns a prompt and rules into text.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry name of the backend.
    fn name(&self) -> &str;

    /// Settings this provider was created with.
    fn config(&self) -> &ProviderConfig;

    /// Generate a complete response.
    ///
    /// `rules` becomes a system message when non-empty; `prompt` is sent as
    /// the user message. A response with no content yields `""`.
    async fn generate(&self, prompt: &str, rules: &str) -> Result<String>;

    /// Stream a response chunk by chunk.
    ///
    /// Nothing is sent until the stream is first polled. Dropping the stream
    /// cancels the request; a new call starts a new one.
    fn stream<'a>(&'a self, prompt: &str, rules: &str) -> TextStream<'a>;

    /// Whether the backend is reachable. Failures are reported as `false`.
    async fn validate_connection(&self) -> bool;
}
