//! Deployment configuration
//!
//! One TOML file describes one environment (its file name is the
//! environment name recorded in the deployment history):
//!
//! ```toml
//! hosts = ["root@web-01", "root@web-02:2222"]
//! buildhost = "buildbot-64"
//! domain = "default"
//! webcallback = "http://dashboard/deployed"
//!
//! [[post_deployment]]
//! command = "service nginx reload"
//!
//! [[post_deployment]]
//! command = "/root/tools/warm-cache"
//! run_once_on = "root@web-01"
//! warn_only = true
//!
//! [notifications]
//! start = [{ message = "deploying {stack}", command = "logger '{message}'" }]
//! ```

use crate::paths;
use crate::runner::HostSpec;
use anyhow::{Context, Result, bail};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Immutable settings for one run, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    /// Target hosts, `[user@]host[:port]`
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Build server publishing the stacks
    #[serde(default)]
    pub buildhost: String,

    #[serde(default = "default_domain")]
    pub domain: String,

    /// Manifest path on the hosts
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Location of this executable on the hosts
    #[serde(default = "default_updater_path")]
    pub updater_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webcallback: Option<String>,

    /// Pass `--verbose` to the updater
    #[serde(default = "default_true")]
    pub verbose: bool,

    /// Pass `--force` to the updater
    #[serde(default)]
    pub force: bool,

    /// Deployment lock marker
    #[serde(default = "default_pidfile")]
    pub pidfile: String,

    #[serde(default = "default_history")]
    pub deployment_history: String,

    /// strftime format of history timestamps
    #[serde(default = "default_strf_format")]
    pub strf_format: String,

    #[serde(default)]
    pub use_utc: bool,

    /// Default for hooks that do not set `warn_only`
    #[serde(default)]
    pub warn_only: bool,

    /// Parallel host workers, 0 for one per host
    #[serde(default)]
    pub jobs: usize,

    #[serde(default = "default_ssh")]
    pub ssh: String,

    #[serde(default = "default_scp")]
    pub scp: String,

    /// ssh ConnectTimeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default)]
    pub post_deployment: Vec<PostDeployCommand>,

    #[serde(default)]
    pub notifications: Notifications,

    /// Environment name, taken from the configuration file name
    #[serde(skip)]
    pub environment: String,
}

/// A command run on the hosts once every host is reconciled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostDeployCommand {
    pub command: String,

    /// Only run on this host (matched against the host string as written)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_once_on: Option<String>,

    /// Tolerate a non-zero exit; falls back to the global `warn_only`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_only: Option<bool>,
}

impl PostDeployCommand {
    /// Check if this command runs on `host`
    pub fn applies_to(&self, host: &str) -> bool {
        self.run_once_on.as_deref().is_none_or(|only| only == host)
    }
}

/// Start and end notification sequences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notifications {
    #[serde(default)]
    pub start: Vec<Notification>,
    #[serde(default)]
    pub end: Vec<Notification>,
}

/// A local command announcing a deployment
///
/// `message` may use `{stack}`; `command` may use `{message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notification {
    pub message: String,
    pub command: String,
}

fn default_domain() -> String {
    buildhost::DEFAULT_DOMAIN.to_string()
}

fn default_manifest() -> String {
    "/root/tools/packages/manifests".to_string()
}

fn default_updater_path() -> String {
    "/root/tools/mise-a-feu".to_string()
}

fn default_pidfile() -> String {
    "~/.mise-a-feu.pid".to_string()
}

fn default_history() -> String {
    "~/.mise-a-feu.history".to_string()
}

fn default_strf_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_ssh() -> String {
    "ssh".to_string()
}

fn default_scp() -> String {
    "scp".to_string()
}

const fn default_connect_timeout() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            buildhost: String::new(),
            domain: default_domain(),
            manifest: default_manifest(),
            updater_path: default_updater_path(),
            webcallback: None,
            verbose: true,
            force: false,
            pidfile: default_pidfile(),
            deployment_history: default_history(),
            strf_format: default_strf_format(),
            use_utc: false,
            warn_only: false,
            jobs: 0,
            ssh: default_ssh(),
            scp: default_scp(),
            connect_timeout: default_connect_timeout(),
            post_deployment: Vec::new(),
            notifications: Notifications::default(),
            environment: String::new(),
        }
    }
}

impl DeployConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Could not read config file: {} (use --config or {})",
                path.display(),
                paths::ENV_CONFIG
            )
        })?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.environment = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would fail halfway through a deployment
    pub fn validate(&self) -> Result<()> {
        if self.buildhost.trim().is_empty() {
            bail!("'buildhost' must be set");
        }
        for host in &self.hosts {
            host.parse::<HostSpec>()?;
        }
        for (i, hook) in self.post_deployment.iter().enumerate() {
            if hook.command.trim().is_empty() {
                bail!("post_deployment[{i}]: empty command");
            }
        }
        if StrftimeItems::new(&self.strf_format).any(|item| matches!(item, Item::Error)) {
            bail!("Invalid strf_format '{}'", self.strf_format);
        }
        Ok(())
    }

    /// Parsed target hosts, in configuration order
    pub fn host_specs(&self) -> Result<Vec<HostSpec>> {
        self.hosts.iter().map(|h| h.parse()).collect()
    }

    /// Parsed target hosts, failing when there are none
    pub fn require_hosts(&self) -> Result<Vec<HostSpec>> {
        if self.hosts.is_empty() {
            bail!("No hosts configured: set 'hosts' in {}", self.environment);
        }
        self.host_specs()
    }

    pub fn pidfile_path(&self) -> PathBuf {
        paths::expand_path(&self.pidfile)
    }

    pub fn history_path(&self) -> PathBuf {
        paths::expand_path(&self.deployment_history)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Effective settings as `key: value` lines, sorted by key
    pub fn dump(&self) -> Result<Vec<String>> {
        let value = serde_json::to_value(self).context("Failed to serialize config")?;
        let mut lines: Vec<String> = value
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(s) => format!("{key}: {s}"),
                        other => format!("{key}: {other}"),
                    })
                    .collect()
            })
            .unwrap_or_default();
        lines.push(format!("environment: {}", self.environment));
        lines.sort();
        Ok(lines)
    }
}
