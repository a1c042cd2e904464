//! Recording command runner for orchestrator tests

use crate::runner::{CommandOutput, CommandRunner, HostSpec};
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Remote {
        host: String,
        command: String,
        sudo: bool,
    },
    Local {
        command: String,
        /// Whether the watched lock marker existed when the command ran
        lock_held: bool,
    },
    Copy {
        host: String,
        local: PathBuf,
        remote: String,
    },
}

/// Records every call and answers with canned results
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<Call>>>,
    failing_commands: Vec<String>,
    failing_hosts: Vec<String>,
    unreachable_hosts: Vec<String>,
    lock_path: Option<PathBuf>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `needle` exit with status 1
    pub fn failing_command(mut self, needle: &str) -> Self {
        self.failing_commands.push(needle.to_string());
        self
    }

    /// Every remote command on `host` exits with status 1
    pub fn failing_host(mut self, host: &str) -> Self {
        self.failing_hosts.push(host.to_string());
        self
    }

    /// Remote commands on `host` cannot be started
    pub fn unreachable_host(mut self, host: &str) -> Self {
        self.unreachable_hosts.push(host.to_string());
        self
    }

    /// Note whether `path` exists each time a local command runs
    pub fn watching_lock(mut self, path: &Path) -> Self {
        self.lock_path = Some(path.to_path_buf());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn local_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Local { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn remote_commands(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Remote { host, command, .. } => Some((host, command)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn answer(&self, command: &str, host: Option<&str>) -> CommandOutput {
        let failed = self.failing_commands.iter().any(|n| command.contains(n.as_str()))
            || host.is_some_and(|h| self.failing_hosts.iter().any(|f| f == h));
        if failed {
            CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: format!("{command}: failed\n"),
            }
        } else {
            CommandOutput {
                status: Some(0),
                stdout: format!("{command}: ok\n"),
                stderr: String::new(),
            }
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run_remote(&self, host: &HostSpec, command: &str, sudo: bool) -> Result<CommandOutput> {
        let name = host.to_string();
        self.record(Call::Remote {
            host: name.clone(),
            command: command.to_string(),
            sudo,
        });
        if self.unreachable_hosts.contains(&name) {
            bail!("ssh: connect to host {name} port 22: Connection refused");
        }
        Ok(self.answer(command, Some(&name)))
    }

    fn run_local(&self, command: &str) -> Result<CommandOutput> {
        let lock_held = self.lock_path.as_deref().is_some_and(Path::exists);
        self.record(Call::Local {
            command: command.to_string(),
            lock_held,
        });
        Ok(self.answer(command, None))
    }

    fn copy_to(&self, host: &HostSpec, local: &Path, remote_path: &str) -> Result<CommandOutput> {
        let name = host.to_string();
        self.record(Call::Copy {
            host: name.clone(),
            local: local.to_path_buf(),
            remote: remote_path.to_string(),
        });
        if self.unreachable_hosts.contains(&name) {
            bail!("ssh: connect to host {name} port 22: Connection refused");
        }
        Ok(self.answer(remote_path, Some(&name)))
    }
}
