//! Fleet-side commands: deploy, deploy-hosts, run-updater, post-deploy

use super::system_runner;
use crate::Context;
use crate::cli::RunUpdaterArgs;
use crate::deploy::{DeployError, DeployReport, Orchestrator, UpdaterCommand};
use crate::runner::HostSpec;
use crate::ui;
use anyhow::Result;
use colored::Colorize;

/// Full locked deployment
pub fn deploy(ctx: &Context, stack: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let hosts = config.require_hosts()?;
    let runner = system_runner(&config);
    let orchestrator = Orchestrator::new(&config, hosts, &runner);

    if !ctx.quiet {
        ui::header(&format!("Deploying {stack}"));
        ui::kv("Environment", &config.environment);
        ui::kv("Build host", &config.buildhost);
        ui::kv("Hosts", &config.hosts.join(", "));
        println!();
    }

    match orchestrator.deploy(stack) {
        Ok(report) => {
            print_report(ctx, &report);
            ui::success(&format!("Stack {stack} deployed to {} host(s)", report.total()));
            Ok(())
        }
        Err(e) => {
            print_failure(&e);
            Err(e.into())
        }
    }
}

/// Updater fan-out only
pub fn deploy_hosts(ctx: &Context, stack: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let hosts = config.require_hosts()?;
    let runner = system_runner(&config);

    let report = Orchestrator::new(&config, hosts, &runner).deploy_hosts(stack)?;
    finish(ctx, report)
}

/// Updater fan-out with explicit options
pub fn run_updater(ctx: &Context, args: RunUpdaterArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let hosts = if args.hosts.is_empty() {
        config.require_hosts()?
    } else {
        args.hosts
            .iter()
            .map(|h| h.parse::<HostSpec>())
            .collect::<Result<Vec<_>>>()?
    };

    let defaults = UpdaterCommand::from_config(&config, &args.stack);
    let command = UpdaterCommand {
        force: args.force,
        verbose: !args.no_verbose,
        web_callback: args.web_callback.or(defaults.web_callback),
        manifest: args.manifest.unwrap_or(defaults.manifest),
        updater_path: args.updater_path.unwrap_or(defaults.updater_path),
        ..defaults
    };

    let runner = system_runner(&config);
    let report = Orchestrator::new(&config, hosts.clone(), &runner).run_updater(&hosts, &command)?;
    finish(ctx, report)
}

/// Post-deployment commands only
pub fn post_deploy(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let hosts = config.require_hosts()?;
    let runner = system_runner(&config);

    match Orchestrator::new(&config, hosts, &runner).post_deploy() {
        Ok(ran) => {
            if !ctx.quiet {
                ui::success(&format!("{ran} post-deployment command(s) ran"));
            }
            Ok(())
        }
        Err(e) => {
            print_failure(&e);
            Err(e.into())
        }
    }
}

/// Print a fan-out report and fail when any host failed
pub(super) fn finish(ctx: &Context, report: DeployReport) -> Result<()> {
    print_report(ctx, &report);
    match report.into_result() {
        Ok(report) => {
            ui::success(&format!("{} host(s) done", report.total()));
            Ok(())
        }
        Err(e) => {
            print_failure(&e);
            Err(e.into())
        }
    }
}

fn print_report(ctx: &Context, report: &DeployReport) {
    if ctx.quiet {
        return;
    }
    for host in &report.succeeded {
        println!("  {} {}", "✓".green(), host);
    }
    for failure in &report.failed {
        println!("  {} {} - {}", "✗".red(), failure.host, failure.message.dimmed());
    }
}

fn print_failure(err: &DeployError) {
    ui::error(&format!("Deployment stopped at stage '{}'", err.stage()));
    match err {
        DeployError::HostsFailed { failures } => {
            for failure in failures {
                ui::dim(&format!("{}: {}", failure.host, failure.message));
            }
        }
        DeployError::DeploymentInProgress { .. } => {
            ui::warn("Another deployment holds the lock; no host was touched");
        }
        _ => {}
    }
}
