//! Host-side update: converge this machine onto a stack

use crate::Context;
use crate::cli::UpdateArgs;
use crate::host::HostServices;
use crate::ui;
use anyhow::{Context as _, Result};
use reconcile::{Engine, Manifest, ReconcileOptions, Target, UpdatePlan};
use std::time::Duration;

pub fn run(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let dpkg = dpkgkit::Client::new().context("dpkg is required to update this host")?;
    let build = buildhost::Client::with_timeout(Duration::from_secs(args.timeout));
    let services = HostServices::new(dpkg, build);

    let target = Target::new(args.buildhost)
        .with_domain(args.domain)
        .with_stack(args.stack);
    let options = ReconcileOptions {
        force: args.force,
        verbose: ctx.verbose > 0,
        staging_dir: args.staging_dir,
        web_callback: args.web_callback,
    };

    let plan = Engine::new(&services, &services, &services)
        .with_callback(&services)
        .reconcile(&manifest, &target, &options)
        .with_context(|| format!("Update to stack {} failed", target.stack))?;

    if args.json {
        println!("{}", plan_json(&plan)?);
    } else if !ctx.quiet {
        print_plan(&plan, &target);
    }
    Ok(())
}

/// The plan as a JSON object of package name to artifact file name
fn plan_json(plan: &UpdatePlan) -> Result<String> {
    Ok(serde_json::to_string_pretty(&plan.artifacts())?)
}

fn print_plan(plan: &UpdatePlan, target: &Target) {
    if plan.is_empty() {
        ui::success(&format!("Already on stack {}", target.stack));
        return;
    }

    ui::header(&format!("Updated to stack {}", target.stack));
    for (package, update) in plan.iter() {
        ui::kv(
            package,
            &ui::version_change(update.local_version.as_deref(), &update.remote_version),
        );
        ui::dim(&update.artifact);
    }
    println!();
    ui::success(&format!("{} package(s) updated", plan.len()));
}
