mod cli;
mod commands;
mod config;
mod deploy;
mod host;
mod paths;
mod runner;
mod ui;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::DeployConfig;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

impl Context {
    /// Load the deployment configuration selected on the command line
    pub fn load_config(&self) -> Result<DeployConfig> {
        let path = paths::config_file(self.config.as_deref())?;
        DeployConfig::load(&path)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    deploy::lock::install_interrupt_handler().context("Failed to install interrupt handler")?;

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match cli.command {
        Command::Update(args) => commands::update::run(&ctx, args),
        Command::Deploy { stack } => commands::deploy::deploy(&ctx, &stack),
        Command::DeployHosts { stack } => commands::deploy::deploy_hosts(&ctx, &stack),
        Command::RunUpdater(args) => commands::deploy::run_updater(&ctx, args),
        Command::PostDeploy => commands::deploy::post_deploy(&ctx),
        Command::PushUpdater {
            updater_path,
            binary,
        } => commands::push::run(&ctx, updater_path, binary),
        Command::ShowConfig => commands::config::show(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "mise-a-feu", &mut io::stdout());
            Ok(())
        }
    }
}
