//! Command execution on the local machine and on remote hosts
//!
//! Remote commands go through `ssh`, file uploads through `scp`. Both run in
//! batch mode so a host that asks for a password fails instead of hanging.

use anyhow::{Context, Result, bail};
use std::fmt;
use std::path::Path;
use std::process::{Command, Output};
use std::str::FromStr;
use std::time::Duration;

/// A target host written as `[user@]host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl HostSpec {
    /// `user@host` or `host`, as ssh and scp expect it
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

impl FromStr for HostSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) if !user.is_empty() => (Some(user.to_string()), rest),
            Some(_) => bail!("Invalid host '{s}': empty user"),
            None => (None, s),
        };
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .with_context(|| format!("Invalid port in host '{s}'"))?;
                (host, Some(port))
            }
            None => (rest, None),
        };
        if host.is_empty() {
            bail!("Invalid host '{s}': empty host name");
        }
        Ok(Self {
            user,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination())?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Short description of a failure for reports
    pub fn failure_summary(&self) -> String {
        let status = self
            .status
            .map_or_else(|| "killed by signal".to_string(), |s| format!("exit status {s}"));
        let detail = self
            .stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .trim();
        if detail.is_empty() {
            status
        } else {
            format!("{status}: {detail}")
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Executes commands for the orchestrator
///
/// `Err` means the command could not be started at all; a command that ran
/// and exited non-zero is an `Ok` output with an unsuccessful status.
pub trait CommandRunner: Send + Sync {
    /// Run a shell command on `host`, under `sudo` when asked
    fn run_remote(&self, host: &HostSpec, command: &str, sudo: bool) -> Result<CommandOutput>;

    /// Run a shell command on this machine
    fn run_local(&self, command: &str) -> Result<CommandOutput>;

    /// Copy a local file to `remote_path` on `host`
    fn copy_to(&self, host: &HostSpec, local: &Path, remote_path: &str) -> Result<CommandOutput>;
}

/// Runner backed by the system `ssh`, `scp` and `sh`
pub struct SystemRunner {
    ssh: String,
    scp: String,
    connect_timeout: Duration,
}

impl SystemRunner {
    pub fn new(ssh: impl Into<String>, scp: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            ssh: ssh.into(),
            scp: scp.into(),
            connect_timeout,
        }
    }

    fn common_options(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
        ]
    }

    /// Arguments passed to ssh for a remote command
    fn ssh_args(&self, host: &HostSpec, command: &str, sudo: bool) -> Vec<String> {
        let mut args = self.common_options();
        if let Some(port) = host.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(host.destination());
        args.push("--".to_string());
        args.push(remote_command(command, sudo));
        args
    }

    /// Arguments passed to scp for an upload
    fn scp_args(&self, host: &HostSpec, local: &Path, remote_path: &str) -> Vec<String> {
        let mut args = self.common_options();
        if let Some(port) = host.port {
            args.push("-P".to_string());
            args.push(port.to_string());
        }
        args.push(local.display().to_string());
        args.push(format!("{}:{remote_path}", host.destination()));
        args
    }
}

impl CommandRunner for SystemRunner {
    fn run_remote(&self, host: &HostSpec, command: &str, sudo: bool) -> Result<CommandOutput> {
        log::debug!("[{host}] {}{command}", if sudo { "sudo: " } else { "run: " });
        capture(&self.ssh, &self.ssh_args(host, command, sudo))
    }

    fn run_local(&self, command: &str) -> Result<CommandOutput> {
        log::debug!("[localhost] local: {command}");
        capture("sh", &["-c".to_string(), command.to_string()])
    }

    fn copy_to(&self, host: &HostSpec, local: &Path, remote_path: &str) -> Result<CommandOutput> {
        log::debug!("[{host}] put: {} -> {remote_path}", local.display());
        capture(&self.scp, &self.scp_args(host, local, remote_path))
    }
}

/// Run a program and capture its output
fn capture(program: &str, args: &[String]) -> Result<CommandOutput> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", program, args.join(" ")))?;
    Ok(output.into())
}

/// Wrap a command for the remote shell
fn remote_command(command: &str, sudo: bool) -> String {
    if sudo {
        format!("sudo -n sh -c {}", shell_quote(command))
    } else {
        command.to_string()
    }
}

/// Quote a string for a POSIX shell
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_spec() {
        let host: HostSpec = "deploy@web-01:2222".parse().unwrap();
        assert_eq!(host.user.as_deref(), Some("deploy"));
        assert_eq!(host.host, "web-01");
        assert_eq!(host.port, Some(2222));
        assert_eq!(host.to_string(), "deploy@web-01:2222");

        let host: HostSpec = "web-02".parse().unwrap();
        assert_eq!(host.user, None);
        assert_eq!(host.port, None);
        assert_eq!(host.destination(), "web-02");
    }

    #[test]
    fn test_parse_host_spec_errors() {
        assert!("".parse::<HostSpec>().is_err());
        assert!("@web".parse::<HostSpec>().is_err());
        assert!("web:ssh".parse::<HostSpec>().is_err());
        assert!("web:99999".parse::<HostSpec>().is_err());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/root/tools/mise-a-feu"), "/root/tools/mise-a-feu");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_ssh_args() {
        let runner = SystemRunner::new("ssh", "scp", Duration::from_secs(10));
        let host: HostSpec = "root@web-01:2222".parse().unwrap();
        let args = runner.ssh_args(&host, "service nginx reload", true);
        assert_eq!(
            args,
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-p",
                "2222",
                "root@web-01",
                "--",
                "sudo -n sh -c 'service nginx reload'",
            ]
        );
    }

    #[test]
    fn test_scp_args_use_capital_port_flag() {
        let runner = SystemRunner::new("ssh", "scp", Duration::from_secs(5));
        let host: HostSpec = "web-01:2222".parse().unwrap();
        let args = runner.scp_args(&host, Path::new("/usr/bin/mise-a-feu"), "/tmp/upload");
        assert!(args.contains(&"-P".to_string()));
        assert_eq!(args.last().unwrap(), "web-01:/tmp/upload");
    }

    #[test]
    fn test_failure_summary() {
        let output = CommandOutput {
            status: Some(2),
            stdout: String::new(),
            stderr: "warning\ndpkg: error processing\n\n".to_string(),
        };
        assert!(!output.success());
        assert_eq!(output.failure_summary(), "exit status 2: dpkg: error processing");

        let output = CommandOutput {
            status: None,
            ..CommandOutput::default()
        };
        assert_eq!(output.failure_summary(), "killed by signal");
    }

    #[test]
    fn test_run_local_captures_status() {
        let runner = SystemRunner::new("ssh", "scp", Duration::from_secs(5));
        let output = runner.run_local("echo hello; exit 3").unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
    }
}
