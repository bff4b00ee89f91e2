//! The closed set of LLM backends Specify knows about.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Default address of a local Ollama server.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// A supported LLM provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {
    /// Anthropic hosted models.
    Anthropic,
    /// Local inference through Ollama.
    Ollama,
    /// OpenAI hosted models.
    OpenAi,
}

impl ProviderKind {
    /// Every supported provider, in alphabetical order of name (also the `Ord` order).
    pub const ALL: [ProviderKind; 3] = [Self::Anthropic, Self::Ollama, Self::OpenAi];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Environment variable consulted when no local value is stored.
    ///
    /// For Ollama this is the server address rather than a credential.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Ollama => crate::env::vars::OLLAMA_HOST,
            Self::OpenAi => crate::env::vars::OPENAI_API_KEY,
            Self::Anthropic => crate::env::vars::ANTHROPIC_API_KEY,
        }
    }

    /// Whether this provider runs locally and needs no API key.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama)
    }

    /// Comma-separated list of valid names, for error messages.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    /// Parse a provider name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(ConfigError::UnknownProvider {
                name: s.to_string(),
                valid: Self::valid_names(),
            }),
        }
    }
}
