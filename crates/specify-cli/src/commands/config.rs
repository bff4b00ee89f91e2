//! API key management commands.
//!
//! Provides `specify config set-key|get-key|list-keys|delete-key|migrate` for
//! the encrypted key store in `specify-secrets`.

use clap::Args;
use specify_core::{paths, ProviderKind};
use specify_secrets::{FileSecretStore, SecretStore};

use super::{open_store, warn_if_weak_binding};

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Store an API key (or, for Ollama, the server URL)
    SetKey {
        /// Provider the key belongs to
        #[arg(short, long)]
        provider: ProviderKind,

        /// Key value (if omitted, prompts for hidden input)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Show the key for a provider, masked unless --show is given
    GetKey {
        /// Provider to look up
        #[arg(short, long)]
        provider: ProviderKind,

        /// Print the full key
        #[arg(long)]
        show: bool,
    },

    /// List providers with a stored or environment key (masked)
    ListKeys,

    /// Delete a stored key
    DeleteKey {
        /// Provider whose key to delete
        #[arg(short, long)]
        provider: ProviderKind,
    },

    /// Encrypt a keys file written by an older version
    Migrate,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, config_dir: Option<String>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::SetKey { provider, key } => {
            let store = open_store(config_dir).await?;
            let value = match key {
                Some(v) => v,
                None => {
                    let prompt = if provider.is_local() {
                        format!("Enter {provider} server URL: ")
                    } else {
                        format!("Enter API key for {provider}: ")
                    };
                    rpassword::prompt_password(prompt)
                        .map_err(|e| anyhow::anyhow!("Failed to read key: {}", e))?
                }
            };

            store.store(provider.as_str(), &value).await?;
            warn_if_weak_binding(&store);

            println!("Key for '{}' stored successfully.", provider);
        }

        ConfigCommand::GetKey { provider, show } => {
            let store = open_store(config_dir).await?;
            let secret = store.get(provider.as_str()).await?;
            if show {
                println!("{}", secret.expose());
            } else {
                println!("{}", secret.masked());
            }
        }

        ConfigCommand::ListKeys => {
            let store = open_store(config_dir).await?;
            let keys = store.list().await?;

            if keys.is_empty() {
                println!("No keys configured.");
                println!("Add one with: specify config set-key --provider <name>");
            } else {
                println!("{:<12} {}", "PROVIDER", "KEY");
                println!("{}", "-".repeat(32));
                for (provider, masked) in &keys {
                    println!("{:<12} {}", provider.as_str(), masked);
                }
                println!("\n{} provider(s) configured.", keys.len());
            }
        }

        ConfigCommand::DeleteKey { provider } => {
            let store = open_store(config_dir).await?;
            store.delete(provider.as_str()).await?;
            println!("Key for '{}' deleted.", provider);
        }

        ConfigCommand::Migrate => migrate(config_dir).await?,
    }

    Ok(())
}

async fn migrate(config_dir: Option<String>) -> anyhow::Result<()> {
    let dir = paths::resolve_config_dir(config_dir)?;
    let store = FileSecretStore::new(&dir);

    if !store.keys_path().exists() {
        println!("No keys file at {}; nothing to migrate.", store.keys_path().display());
    } else if store.migrate().await? {
        warn_if_weak_binding(&store);
        println!("Keys file migrated to encrypted format.");
    } else {
        println!("Keys file is already encrypted: {}", store.keys_path().display());
    }
    Ok(())
}
