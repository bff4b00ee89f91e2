//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod generate;

use anyhow::Context;
use console::style;
use specify_core::paths;
use specify_secrets::FileSecretStore;

/// Open the credential store, migrating a legacy plaintext file first.
pub async fn open_store(config_dir: Option<String>) -> anyhow::Result<FileSecretStore> {
    let dir = paths::resolve_config_dir(config_dir)?;
    FileSecretStore::open(&dir)
        .await
        .with_context(|| format!("Failed to open key store in {}", dir.display()))
}

/// Tell the user when keys are bound to the weak hostname/user identifier.
pub fn warn_if_weak_binding(store: &FileSecretStore) {
    if store
        .crypto()
        .machine_id_source()
        .is_some_and(|source| source.is_fallback())
    {
        eprintln!(
            "{} no stable machine identifier was found; keys are bound to the hostname and \
             user name, which is easier to guess",
            style("warning:").yellow().bold()
        );
    }
}
