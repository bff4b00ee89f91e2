//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Environment variable names read by Specify.
pub mod vars {
    /// API key for OpenAI.
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

    /// API key for Anthropic.
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

    /// Address of the Ollama server.
    pub const OLLAMA_HOST: &str = "OLLAMA_HOST";

    /// Absolute path overriding the configuration directory.
    pub const SPECIFY_CONFIG_DIR: &str = "SPECIFY_CONFIG_DIR";

    /// Log filter for the `specify` binary.
    pub const SPECIFY_LOG: &str = "SPECIFY_LOG";
}
