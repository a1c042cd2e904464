use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mise-a-feu")]
#[command(version)]
#[command(about = "Converge a fleet of Debian hosts onto a published package stack", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (on `update`, also reports every package checked)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Deployment configuration file
    #[arg(short, long, global = true, env = crate::paths::ENV_CONFIG, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bring this host's packages to a stack (run on the host, as root)
    Update(UpdateArgs),

    /// Deploy a stack to every host: lock, update, hooks, history
    Deploy {
        /// Stack to deploy
        stack: String,
    },

    /// Run the updater on every host, without lock or hooks
    DeployHosts {
        /// Stack to deploy
        stack: String,
    },

    /// Run the updater on selected hosts with explicit options
    RunUpdater(RunUpdaterArgs),

    /// Run the post-deployment commands only
    PostDeploy,

    /// Install this executable as the updater on every host
    PushUpdater {
        /// Destination on the hosts (defaults to `updater_path` from the config)
        #[arg(long)]
        updater_path: Option<String>,

        /// Executable to upload (defaults to the running one)
        #[arg(long, value_name = "FILE")]
        binary: Option<PathBuf>,
    },

    /// Print the effective configuration, sorted by key
    ShowConfig,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Update (host side)
// ============================================================================

#[derive(Args)]
pub struct UpdateArgs {
    /// Manifest file, one package name per line
    pub manifest: PathBuf,

    /// Build server, `host[:port]`
    pub buildhost: String,

    /// Domain the stack is published under
    #[arg(default_value = buildhost::DEFAULT_DOMAIN)]
    pub domain: String,

    /// Stack to converge on
    #[arg(default_value = buildhost::DEFAULT_STACK)]
    pub stack: String,

    /// Reinstall every package, even when versions match
    #[arg(long)]
    pub force: bool,

    /// POST the updated package names to this URL when done
    #[arg(long, value_name = "URL")]
    pub web_callback: Option<String>,

    /// Directory artifacts are downloaded to
    #[arg(long, value_name = "DIR", default_value = buildhost::DEFAULT_STAGING_DIR)]
    pub staging_dir: PathBuf,

    /// Per-request timeout for the build server, in seconds
    #[arg(long, value_name = "SECS", default_value_t = buildhost::DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Print the update plan as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Run updater (orchestrator side)
// ============================================================================

#[derive(Args)]
pub struct RunUpdaterArgs {
    /// Stack to deploy
    pub stack: String,

    /// Host to run on, repeatable (defaults to every configured host)
    #[arg(long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Pass `--force` to the updater
    #[arg(long)]
    pub force: bool,

    /// Do not pass `--verbose` to the updater
    #[arg(long)]
    pub no_verbose: bool,

    /// Override the configured web callback
    #[arg(long, value_name = "URL")]
    pub web_callback: Option<String>,

    /// Override the manifest path on the hosts
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<String>,

    /// Override the updater location on the hosts
    #[arg(long, value_name = "PATH")]
    pub updater_path: Option<String>,
}
