//! Post-deployment commands

use super::DeployError;
use crate::config::PostDeployCommand;
use crate::runner::{CommandRunner, HostSpec};

/// Run every applicable hook on every host
///
/// Hosts are visited in order and each host runs its hooks in declared
/// order, one at a time. A hook restricted with `run_once_on` only runs on
/// the host written exactly that way. A failing hook that is not
/// `warn_only` stops everything that would have followed it.
///
/// Returns the number of hook invocations that ran.
pub fn run_all(
    runner: &dyn CommandRunner,
    hosts: &[HostSpec],
    hooks: &[PostDeployCommand],
    default_warn_only: bool,
) -> Result<usize, DeployError> {
    let mut ran = 0;
    for host in hosts {
        let name = host.to_string();
        for hook in hooks.iter().filter(|h| h.applies_to(&name)) {
            let warn_only = hook.warn_only.unwrap_or(default_warn_only);
            log::info!("[{name}] run: {}", hook.command);
            ran += 1;

            let failure = match runner.run_remote(host, &hook.command, false) {
                Ok(output) if output.success() => continue,
                Ok(output) => output.failure_summary(),
                Err(e) => format!("{e:#}"),
            };

            if warn_only {
                log::warn!("[{name}] '{}' failed, continuing: {failure}", hook.command);
                continue;
            }
            return Err(DeployError::HookFailure {
                host: name,
                command: hook.command.clone(),
                message: failure,
            });
        }
    }
    Ok(ran)
}
