//! Execution - apply a plan with one removal batch and one install batch

use crate::context::PackageManager;
use crate::error::Result;
use crate::types::UpdatePlan;
use std::path::Path;

/// Remove every planned package, then install every staged artifact
///
/// Both batches list their entries in package-name order. An empty plan
/// touches nothing. A failed removal skips the install; nothing already
/// removed is restored.
pub fn apply(plan: &UpdatePlan, staging_dir: &Path, manager: &dyn PackageManager) -> Result<()> {
    if plan.is_empty() {
        log::debug!("nothing to apply");
        return Ok(());
    }

    let packages = plan.packages();
    log::info!("removing packages: {}", packages.join(" "));
    manager.remove(&packages)?;

    let staged = plan.staged(staging_dir);
    log::info!(
        "installing packages: {}",
        staged
            .iter()
            .map(|a| a.path.display().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
    manager.install(&staged)
}
