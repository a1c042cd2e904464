use super::deploy::finish;
use super::system_runner;
use crate::Context;
use crate::deploy::Orchestrator;
use crate::ui;
use anyhow::{Context as _, Result};
use std::path::PathBuf;

/// Upload the updater executable to every host
pub fn run(ctx: &Context, updater_path: Option<String>, binary: Option<PathBuf>) -> Result<()> {
    let config = ctx.load_config()?;
    let hosts = config.require_hosts()?;
    let local = match binary {
        Some(path) => path,
        None => std::env::current_exe().context("Could not locate the running executable")?,
    };
    let remote = updater_path.unwrap_or_else(|| config.updater_path.clone());

    if !ctx.quiet {
        ui::header("Pushing updater");
        ui::kv("From", &local.display().to_string());
        ui::kv("To", &remote);
        println!();
    }

    let runner = system_runner(&config);
    let report = Orchestrator::new(&config, hosts, &runner).push_updater(&local, &remote)?;
    finish(ctx, report)
}
