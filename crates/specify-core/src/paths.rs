//! Path resolution utilities.

use crate::env::{self, vars};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};

/// Name of the configuration directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".specify";

/// Name of the encrypted credential file.
pub const KEYS_FILE_NAME: &str = "keys.json";

/// Name of the key-derivation salt file.
pub const SALT_FILE_NAME: &str = ".salt";

/// Get the Specify configuration directory.
///
/// Honours `SPECIFY_CONFIG_DIR` when set, otherwise `~/.specify`.
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(env::get_var(vars::SPECIFY_CONFIG_DIR))
}

/// Resolve the configuration directory from an optional override.
///
/// A leading `~/` is expanded. Relative overrides are rejected since they
/// would move credentials with the working directory.
pub fn resolve_config_dir(override_dir: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        let path = expand_tilde(&dir);
        if !path.is_absolute() {
            return Err(ConfigError::validation(format!(
                "{} must be an absolute path, got: {dir}",
                vars::SPECIFY_CONFIG_DIR
            )));
        }
        return Ok(path);
    }

    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::validation("Could not determine home directory")
    })?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Path of the credential file inside `config_dir`.
pub fn keys_file(config_dir: &Path) -> PathBuf {
    config_dir.join(KEYS_FILE_NAME)
}

/// Path of the salt file inside `config_dir`.
pub fn salt_file(config_dir: &Path) -> PathBuf {
    config_dir.join(SALT_FILE_NAME)
}

/// Create `dir` (and parents) and restrict it to the owner on Unix.
///
/// An existing directory is left as it is.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
