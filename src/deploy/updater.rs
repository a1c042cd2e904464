//! The host-side update command the orchestrator runs on every host

use crate::config::DeployConfig;
use crate::runner::shell_quote;

/// Invocation of `mise-a-feu update` on a remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterCommand {
    pub updater_path: String,
    pub manifest: String,
    pub build_host: String,
    pub domain: String,
    pub stack: String,
    pub verbose: bool,
    pub force: bool,
    pub web_callback: Option<String>,
}

impl UpdaterCommand {
    /// Command for `stack` with every other setting taken from `config`
    pub fn from_config(config: &DeployConfig, stack: &str) -> Self {
        Self {
            updater_path: config.updater_path.clone(),
            manifest: config.manifest.clone(),
            build_host: config.buildhost.clone(),
            domain: config.domain.clone(),
            stack: stack.to_string(),
            verbose: config.verbose,
            force: config.force,
            web_callback: config.webcallback.clone(),
        }
    }

    /// Shell command line, flags first, then the positional arguments.
    /// Every value is quoted for `sh`.
    pub fn render(&self) -> String {
        let mut command = format!("{} update ", shell_quote(&self.updater_path));
        if self.verbose {
            command.push_str("--verbose ");
        }
        if self.force {
            command.push_str("--force ");
        }
        if let Some(url) = &self.web_callback {
            command.push_str(&format!("--web-callback {} ", shell_quote(url)));
        }
        command.push_str(&format!(
            "{} {} {} {}",
            shell_quote(&self.manifest),
            shell_quote(&self.build_host),
            shell_quote(&self.domain),
            shell_quote(&self.stack)
        ));
        command
    }
}
