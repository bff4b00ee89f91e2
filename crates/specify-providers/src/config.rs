//! Validated connection settings for a provider.

use std::time::Duration;

use serde::Deserialize;
use specify_core::env;
use specify_core::types::DEFAULT_OLLAMA_HOST;
use specify_core::{ProviderKind, SecretString};
use url::Url;

use crate::error::{ProviderError, Result};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 60;

/// Accepted request timeout range in seconds.
pub const TIMEOUT_RANGE: std::ops::RangeInclusive<i64> = 1..=300;

/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Accepted retry budget range.
pub const MAX_RETRIES_RANGE: std::ops::RangeInclusive<i64> = 0..=10;

/// Configuration for one backend connection.
///
/// Every constructor validates all fields, so a value of this type is always
/// within range. `timeout` and `max_retries` are advisory: they are handed to
/// the backend client or the caller, nothing in this crate retries.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawProviderConfig")]
pub struct ProviderConfig {
    model: String,
    api_key: Option<SecretString>,
    base_url: Option<String>,
    timeout_secs: u32,
    max_retries: u32,
}

/// Unvalidated wire form; signed so negative values reach validation.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProviderConfig {
    model: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout: Option<i64>,
    #[serde(default)]
    max_retries: Option<i64>,
}

impl TryFrom<RawProviderConfig> for ProviderConfig {
    type Error = ProviderError;

    fn try_from(raw: RawProviderConfig) -> Result<Self> {
        let model = raw.model.trim();
        if model.is_empty() {
            return Err(ProviderError::validation("model cannot be empty"));
        }

        let timeout = raw.timeout.unwrap_or(i64::from(DEFAULT_TIMEOUT_SECS));
        if !TIMEOUT_RANGE.contains(&timeout) {
            return Err(ProviderError::validation(format!(
                "timeout must be between {} and {} seconds, got {timeout}",
                TIMEOUT_RANGE.start(),
                TIMEOUT_RANGE.end()
            )));
        }

        let max_retries = raw.max_retries.unwrap_or(i64::from(DEFAULT_MAX_RETRIES));
        if !MAX_RETRIES_RANGE.contains(&max_retries) {
            return Err(ProviderError::validation(format!(
                "max_retries must be between {} and {}, got {max_retries}",
                MAX_RETRIES_RANGE.start(),
                MAX_RETRIES_RANGE.end()
            )));
        }

        let base_url = raw.base_url.as_deref().map(normalize_base_url).transpose()?;

        Ok(Self {
            model: model.to_string(),
            api_key: raw.api_key.map(SecretString::new),
            base_url,
            // Both ranges fit in u32.
            timeout_secs: timeout as u32,
            max_retries: max_retries as u32,
        })
    }
}

impl ProviderConfig {
    /// Start building a configuration for `model`.
    pub fn builder(model: impl Into<String>) -> ProviderConfigBuilder {
        ProviderConfigBuilder {
            raw: RawProviderConfig {
                model: model.into(),
                ..Default::default()
            },
        }
    }

    /// Configuration for `model` with every other field at its default.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Self::builder(model).build()
    }

    /// Parse and validate a JSON object. Unknown fields are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ProviderError::validation(e.to_string()))
    }

    /// Build a configuration from environment variables.
    ///
    /// Hosted providers require their API key variable. Ollama reads the
    /// optional `OLLAMA_HOST` as its base URL and never takes a credential.
    pub fn from_env(provider: &str, model: &str) -> Result<Self> {
        Self::from_env_with(provider, model, env::get_var)
    }

    /// [`ProviderConfig::from_env`] with an explicit variable lookup.
    pub fn from_env_with<F>(provider: &str, model: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind: ProviderKind = provider.parse().map_err(|_| {
            ProviderError::config(format!(
                "Unknown provider: {provider}. Valid providers: {}",
                ProviderKind::valid_names()
            ))
        })?;

        let var = kind.env_var();
        if kind.is_local() {
            let host = lookup(var).unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
            return Self::builder(model).base_url(host).build();
        }

        let api_key = lookup(var).ok_or_else(|| {
            ProviderError::config(format!(
                "Environment variable {var} is not set. Please set it with your {} API key.",
                display_name(kind)
            ))
        })?;
        Self::builder(model).api_key(api_key).build()
    }

    /// Model identifier, trimmed.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Credential, if any.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    /// Endpoint override, normalized without a trailing slash.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_secs))
    }

    /// Request timeout in whole seconds.
    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    /// Retry budget for callers that retry.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Builder for [`ProviderConfig`]; validation happens in [`build`](Self::build).
pub struct ProviderConfigBuilder {
    raw: RawProviderConfig,
}

impl ProviderConfigBuilder {
    /// Set the credential.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.raw.api_key = Some(key.into());
        self
    }

    /// Set the endpoint. A missing scheme defaults to `http://`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.raw.base_url = Some(url.into());
        self
    }

    /// Set the request timeout in seconds (1 to 300).
    pub fn timeout(mut self, secs: u32) -> Self {
        self.raw.timeout = Some(i64::from(secs));
        self
    }

    /// Set the retry budget (0 to 10).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.raw.max_retries = Some(i64::from(retries));
        self
    }

    /// Validate all fields and produce the configuration.
    pub fn build(self) -> Result<ProviderConfig> {
        ProviderConfig::try_from(self.raw)
    }
}

fn display_name(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "OpenAI",
        ProviderKind::Anthropic => "Anthropic",
        ProviderKind::Ollama => "Ollama",
    }
}

/// Trim, add a default scheme, check that it parses, drop a trailing slash.
fn normalize_base_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::validation("base_url cannot be empty"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ProviderError::validation(format!("invalid base_url '{trimmed}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProviderError::validation(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(candidate.trim_end_matches('/').to_string())
}
