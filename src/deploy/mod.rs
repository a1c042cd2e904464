//! Deployment orchestration
//!
//! A full deployment moves through these stages:
//!
//! 1. Take the fleet-wide lock (fail fast when another deployment holds it)
//! 2. Run the start notifications
//! 3. Run the updater on every host in parallel and wait for all of them
//! 4. Run the post-deployment hooks, host by host
//! 5. Append the history entry
//! 6. Release the lock, then run the end notifications
//!
//! The lock is released on every exit path after step 1.

pub mod history;
pub mod hooks;
pub mod lock;
pub mod notify;
pub mod updater;

#[cfg(test)]
pub mod testing;

pub use lock::DeploymentLock;
pub use updater::UpdaterCommand;

use crate::config::DeployConfig;
use crate::runner::{CommandOutput, CommandRunner, HostSpec, shell_quote};
use history::HistoryEntry;
use rayon::prelude::*;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a deployment stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lock,
    Deploy,
    PostDeploy,
    Record,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => f.write_str("lock"),
            Self::Deploy => f.write_str("deploy"),
            Self::PostDeploy => f.write_str("post-deploy"),
            Self::Record => f.write_str("record"),
        }
    }
}

/// A host that could not be brought to the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    pub host: String,
    pub message: String,
}

/// Orchestration failures
#[derive(Debug, Error)]
pub enum DeployError {
    /// Another deployment holds the lock; nothing was touched
    #[error(
        "Deployment in progress: {} (pid {}); remove the file if that deployment is gone",
        .path.display(),
        owner_label(.owner)
    )]
    DeploymentInProgress { path: PathBuf, owner: String },

    #[error("Deployment lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} host(s) failed: {}", .failures.len(), format_failures(.failures))]
    HostsFailed { failures: Vec<HostFailure> },

    #[error("Post-deployment command '{command}' failed on {host}: {message}")]
    HookFailure {
        host: String,
        command: String,
        message: String,
    },

    #[error("Could not record deployment in {}: {source}", .path.display())]
    History {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not start host workers: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
}

fn owner_label(owner: &str) -> &str {
    if owner.is_empty() { "unknown" } else { owner }
}

fn format_failures(failures: &[HostFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.host, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DeployError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::DeploymentInProgress { .. } | Self::Lock { .. } => Stage::Lock,
            Self::HostsFailed { .. } | Self::Workers(_) => Stage::Deploy,
            Self::HookFailure { .. } => Stage::PostDeploy,
            Self::History { .. } => Stage::Record,
        }
    }
}

/// Per-host outcome of a fan-out, in host order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<HostFailure>,
}

impl DeployReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Turn any host failure into [`DeployError::HostsFailed`]
    pub fn into_result(self) -> Result<Self, DeployError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DeployError::HostsFailed {
                failures: self.failed,
            })
        }
    }
}

/// Runs deployments against a fixed host set
pub struct Orchestrator<'a> {
    config: &'a DeployConfig,
    hosts: Vec<HostSpec>,
    runner: &'a dyn CommandRunner,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a DeployConfig, hosts: Vec<HostSpec>, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            hosts,
            runner,
        }
    }

    /// Full locked rollout of `stack`
    pub fn deploy(&self, stack: &str) -> Result<DeployReport, DeployError> {
        let lock = DeploymentLock::acquire(&self.config.pidfile_path())?;
        log::info!(
            "deploying stack {stack} to {} host(s) (lock {})",
            self.hosts.len(),
            lock.path().display()
        );

        notify::run_all(self.runner, &self.config.notifications.start, stack);

        let report = self.deploy_hosts(stack)?.into_result()?;
        self.post_deploy()?;
        self.record(stack)?;
        lock.release()?;

        notify::run_all(self.runner, &self.config.notifications.end, stack);
        Ok(report)
    }

    /// Run the configured updater for `stack` on every host, without locking
    pub fn deploy_hosts(&self, stack: &str) -> Result<DeployReport, DeployError> {
        let command = UpdaterCommand::from_config(self.config, stack);
        self.run_updater(&self.hosts, &command)
    }

    /// Run `command` under sudo on `hosts` in parallel
    ///
    /// Every host runs to completion; failures are collected in the report.
    pub fn run_updater(
        &self,
        hosts: &[HostSpec],
        command: &UpdaterCommand,
    ) -> Result<DeployReport, DeployError> {
        let line = command.render();
        log::debug!("updater command: {line}");
        self.fan_out(hosts, |host| {
            let output = self
                .runner
                .run_remote(host, &line, true)
                .map_err(|e| format!("{e:#}"))?;
            for out in output.stdout.lines() {
                log::info!("[{host}] out: {out}");
            }
            checked(output)
        })
    }

    /// Run the post-deployment hooks on every host
    pub fn post_deploy(&self) -> Result<usize, DeployError> {
        hooks::run_all(
            self.runner,
            &self.hosts,
            &self.config.post_deployment,
            self.config.warn_only,
        )
    }

    /// Install `local` as the updater at `remote_path` on every host
    ///
    /// The file is uploaded to `/tmp` first, then moved into place, owned by
    /// root and made `770` under sudo.
    pub fn push_updater(&self, local: &Path, remote_path: &str) -> Result<DeployReport, DeployError> {
        let upload = format!("/tmp/.mise-a-feu.upload.{}", std::process::id());
        let target = shell_quote(remote_path);
        let steps = [
            format!("mv {} {target}", shell_quote(&upload)),
            format!("chown root:root {target}"),
            format!("chmod 770 {target}"),
        ];

        self.fan_out(&self.hosts, |host| {
            let copied = self
                .runner
                .copy_to(host, local, &upload)
                .map_err(|e| format!("{e:#}"))?;
            checked(copied)?;
            for step in &steps {
                let output = self
                    .runner
                    .run_remote(host, step, true)
                    .map_err(|e| format!("{e:#}"))?;
                checked(output)?;
            }
            Ok(())
        })
    }

    fn record(&self, stack: &str) -> Result<(), DeployError> {
        let path = self.config.history_path();
        HistoryEntry::now(
            &self.config.environment,
            stack,
            &self.config.strf_format,
            self.config.use_utc,
        )
        .and_then(|entry| history::append(&path, &entry))
        .map_err(|source| DeployError::History {
            path: path.clone(),
            source,
        })?;
        log::debug!("recorded deployment in {}", path.display());
        Ok(())
    }

    fn fan_out<F>(&self, hosts: &[HostSpec], task: F) -> Result<DeployReport, DeployError>
    where
        F: Fn(&HostSpec) -> Result<(), String> + Sync,
    {
        let jobs = if self.config.jobs == 0 {
            hosts.len().max(1)
        } else {
            self.config.jobs
        };
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

        let outcomes: Vec<(String, Result<(), String>)> = pool.install(|| {
            hosts
                .par_iter()
                .map(|host| (host.to_string(), task(host)))
                .collect()
        });

        let mut report = DeployReport::default();
        for (host, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    log::info!("[{host}] done");
                    report.succeeded.push(host);
                }
                Err(message) => {
                    log::error!("[{host}] failed: {message}");
                    report.failed.push(HostFailure { host, message });
                }
            }
        }
        Ok(report)
    }
}

fn checked(output: CommandOutput) -> Result<(), String> {
    if output.success() {
        Ok(())
    } else {
        Err(output.failure_summary())
    }
}
