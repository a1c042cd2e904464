//! Path resolution for mise-a-feu
//!
//! # Environment Variables
//!
//! - `MISE_A_FEU_CONFIG` - Deployment configuration file to use
//!
//! # Configuration File Priority
//!
//! 1. `--config <file>` on the command line
//! 2. `MISE_A_FEU_CONFIG` environment variable (clap reads it into `--config`)
//! 3. `~/.config/mise-a-feu/config.toml` (platform config directory)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming the deployment configuration file
pub const ENV_CONFIG: &str = "MISE_A_FEU_CONFIG";

/// Resolve the configuration file to load
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = expand_path(&path.to_string_lossy());
        log::debug!("Using config file: {}", path.display());
        return Ok(path);
    }

    let dir = dirs::config_dir().context("Could not determine config directory")?;
    let path = dir.join("mise-a-feu").join("config.toml");
    log::debug!("Using default config file: {}", path.display());
    Ok(path)
}

/// Expand `~` and environment variables in a path
///
/// Unknown variables are left as written.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}
