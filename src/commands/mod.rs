pub mod config;
pub mod deploy;
pub mod push;
pub mod update;

use crate::config::DeployConfig;
use crate::runner::SystemRunner;

/// ssh/scp runner configured from the deployment settings
fn system_runner(config: &DeployConfig) -> SystemRunner {
    SystemRunner::new(&config.ssh, &config.scp, config.connect_timeout())
}
