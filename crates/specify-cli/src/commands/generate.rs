//! `specify generate`: run a prompt through a provider and print the result.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use futures::StreamExt;
use specify_core::ProviderKind;
use specify_providers::{default_registry, Provider, ProviderConfig, DEFAULT_TIMEOUT_SECS};
use specify_secrets::{DecryptedSecret, SecretStore};
use tracing::info;

use super::open_store;

/// Model used with Ollama when `--model` is not given.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Generate command arguments.
#[derive(Args)]
pub struct GenerateArgs {
    /// Product description prompt
    #[arg(short, long)]
    pub prompt: String,

    /// LLM provider to use
    #[arg(long, default_value = "ollama")]
    pub provider: ProviderKind,

    /// Model to use (defaults to llama3.2 for Ollama)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Instructions sent as the system message
    #[arg(short, long, conflicts_with = "rules_file")]
    pub rules: Option<String>,

    /// Read the instructions from a file
    #[arg(long)]
    pub rules_file: Option<PathBuf>,

    /// Request timeout in seconds (1-300)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u32,

    /// Wait for the full response instead of streaming it
    #[arg(long)]
    pub no_stream: bool,
}

/// Run the generate command.
pub async fn run(args: GenerateArgs, config_dir: Option<String>) -> anyhow::Result<()> {
    let rules = load_rules(args.rules, args.rules_file.as_deref())?;

    let store = open_store(config_dir).await?;
    let credential = match store.get(args.provider.as_str()).await {
        Ok(secret) => Some(secret),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };

    let config = build_config(args.provider, args.model, credential, args.timeout)?;
    info!(provider = %args.provider, model = config.model(), "generating");
    let provider = default_registry().create(args.provider.as_str(), config)?;

    if args.no_stream {
        let text = provider.generate(&args.prompt, &rules).await?;
        println!("{text}");
    } else {
        print_stream(provider.as_ref(), &args.prompt, &rules).await?;
    }

    Ok(())
}

async fn print_stream(provider: &dyn Provider, prompt: &str, rules: &str) -> anyhow::Result<()> {
    let mut stream = provider.stream(prompt, rules);
    let mut stdout = std::io::stdout();

    while let Some(chunk) = stream.next().await {
        write!(stdout, "{}", chunk?)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

/// Inline rules, the contents of `rules_file`, or nothing.
fn load_rules(rules: Option<String>, rules_file: Option<&Path>) -> anyhow::Result<String> {
    match (rules, rules_file) {
        (Some(rules), _) => Ok(rules),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

/// Combine command-line options with the stored credential.
///
/// For Ollama the stored value is the server URL; hosted providers need a key.
fn build_config(
    provider: ProviderKind,
    model: Option<String>,
    credential: Option<DecryptedSecret>,
    timeout: u32,
) -> anyhow::Result<ProviderConfig> {
    let model = match model {
        Some(model) => model,
        None if provider.is_local() => DEFAULT_OLLAMA_MODEL.to_string(),
        None => anyhow::bail!("--model is required for {provider}"),
    };

    let mut builder = ProviderConfig::builder(model).timeout(timeout);
    builder = match (provider.is_local(), credential) {
        (true, Some(url)) => builder.base_url(url.expose()),
        (true, None) => builder,
        (false, Some(key)) => builder.api_key(key.expose()),
        (false, None) => anyhow::bail!(
            "No API key for {provider}. Set one with `specify config set-key --provider {provider}` \
             or export {}.",
            provider.env_var()
        ),
    };

    Ok(builder.build()?)
}
