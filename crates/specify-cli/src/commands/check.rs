//! `specify check`: probe whether a provider is reachable.

use clap::Args;
use console::style;
use specify_core::ProviderKind;
use specify_providers::{default_registry, ProviderConfig};
use specify_secrets::SecretStore;

use super::open_store;

/// Check command arguments.
#[derive(Args)]
pub struct CheckArgs {
    /// Provider to check
    #[arg(long, default_value = "ollama")]
    pub provider: ProviderKind,

    /// Model to configure the provider with
    #[arg(short, long, default_value = super::generate::DEFAULT_OLLAMA_MODEL)]
    pub model: String,
}

/// Run the check command.
pub async fn run(args: CheckArgs, config_dir: Option<String>) -> anyhow::Result<()> {
    let store = open_store(config_dir).await?;

    let mut builder = ProviderConfig::builder(&args.model);
    match store.get(args.provider.as_str()).await {
        Ok(value) if args.provider.is_local() => builder = builder.base_url(value.expose()),
        Ok(value) => builder = builder.api_key(value.expose()),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let provider = default_registry().create(args.provider.as_str(), builder.build()?)?;

    if provider.validate_connection().await {
        println!("{} {} is reachable", style("✓").green(), args.provider);
        Ok(())
    } else {
        println!("{} {} is not reachable", style("✗").red(), args.provider);
        anyhow::bail!("provider check failed")
    }
}
