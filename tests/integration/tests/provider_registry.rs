//! Registry and configuration integration tests.

use async_trait::async_trait;
use futures::stream;
use specify_providers::{
    Provider, ProviderConfig, ProviderError, ProviderRegistry, Result, TextStream,
};

/// Provider that upper-cases the prompt without any I/O.
struct ShoutProvider {
    config: ProviderConfig,
}

#[async_trait]
impl Provider for ShoutProvider {
    fn name(&self) -> &str {
        "shout"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn generate(&self, prompt: &str, _rules: &str) -> Result<String> {
        Ok(prompt.to_uppercase())
    }

    fn stream<'a>(&'a self, prompt: &str, _rules: &str) -> TextStream<'a> {
        let words: Vec<Result<String>> = prompt
            .split_whitespace()
            .map(|word| Ok(word.to_uppercase()))
            .collect();
        Box::pin(stream::iter(words))
    }

    async fn validate_connection(&self) -> bool {
        true
    }
}

fn shout(config: ProviderConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(ShoutProvider { config }))
}

#[tokio::test]
async fn test_registered_provider_is_created_with_config() {
    let registry = ProviderRegistry::new();
    registry.register("shout", shout).unwrap();

    let config = ProviderConfig::builder("  my-model  ")
        .timeout(30)
        .max_retries(0)
        .build()
        .unwrap();
    let provider = registry.create("SHOUT", config).unwrap();

    assert_eq!(provider.config().model(), "my-model");
    assert_eq!(provider.config().timeout_secs(), 30);
    assert_eq!(provider.generate("hello", "").await.unwrap(), "HELLO");
    assert!(provider.validate_connection().await);
}

#[tokio::test]
async fn test_stream_through_trait_object() {
    use futures::TryStreamExt;

    let registry = ProviderRegistry::new();
    registry.register("shout", shout).unwrap();
    let provider = registry
        .create("shout", ProviderConfig::new("m").unwrap())
        .unwrap();

    let chunks: Vec<String> = provider.stream("a b c", "").try_collect().await.unwrap();
    assert_eq!(chunks, vec!["A", "B", "C"]);
}

#[test]
fn test_duplicate_and_unknown_names() {
    let registry = ProviderRegistry::with_builtins();

    let err = registry.register("Ollama", shout).unwrap_err();
    assert!(matches!(err, ProviderError::Config(_)));

    registry.register("shout", shout).unwrap();
    let err = registry
        .create("openai", ProviderConfig::new("gpt-4").unwrap())
        .err()
        .unwrap();
    assert!(matches!(err, ProviderError::Config(_)));
    assert!(err.to_string().contains("Available providers: ollama, shout"));
}

#[test]
fn test_config_from_env_feeds_registry() {
    let config = ProviderConfig::from_env_with("ollama", "llama3.2", |_| None).unwrap();
    assert_eq!(config.base_url(), Some("http://localhost:11434"));

    let provider = ProviderRegistry::with_builtins()
        .create("ollama", config)
        .unwrap();
    assert_eq!(provider.name(), "ollama");
}

#[test]
fn test_hosted_provider_needs_key_in_env() {
    let err = ProviderConfig::from_env_with("openai", "gpt-4", |_| None).unwrap_err();
    assert!(err.to_string().contains("OPENAI_API_KEY"));

    let config = ProviderConfig::from_env_with("openai", "gpt-4", |name| {
        (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
    })
    .unwrap();
    assert_eq!(config.api_key().unwrap().expose_secret(), "sk-test");
}
