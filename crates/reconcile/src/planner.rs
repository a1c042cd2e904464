//! Planning - decide which packages must change and stage their artifacts

use crate::context::{ArtifactFetcher, VersionSource};
use crate::error::Result;
use crate::manifest::Manifest;
use crate::types::{PlannedUpdate, ReconcileOptions, Target, UpdatePlan};

/// Whether a package must be replaced
///
/// An absent local version compares as the empty string.
pub fn needs_update(local: Option<&str>, remote: &str, force: bool) -> bool {
    force || local.unwrap_or_default() != remote
}

/// Build the update plan for a manifest
///
/// Packages are checked one at a time, in manifest order. Every package that
/// needs an update has its artifact resolved and downloaded into the staging
/// directory before the next package is checked. The first failing lookup
/// or download aborts the whole plan.
pub fn plan(
    manifest: &Manifest,
    target: &Target,
    options: &ReconcileOptions,
    versions: &dyn VersionSource,
    fetcher: &dyn ArtifactFetcher,
) -> Result<UpdatePlan> {
    let level = options.diagnostic_level();
    let mut plan = UpdatePlan::new();

    for package in manifest.packages() {
        let local = versions.local_version(package)?;
        let remote = versions.remote_version(target, package)?;
        log::log!(
            level,
            "{package}: local {} / stack {} {remote}",
            local.as_deref().unwrap_or("<none>"),
            target.stack
        );

        if !needs_update(local.as_deref(), &remote, options.force) {
            continue;
        }

        let artifact = fetcher.resolve_artifact_name(target, package, &remote)?;
        let written = fetcher.download(target, &artifact, &options.staging_dir)?;
        log::log!(
            level,
            "staged {artifact} ({} KiB) in {}",
            written / 1024,
            options.staging_dir.display()
        );

        plan.insert(
            package.clone(),
            PlannedUpdate {
                local_version: local,
                remote_version: remote,
                artifact,
            },
        );
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_update() {
        assert!(!needs_update(Some("1.0.0"), "1.0.0", false));
        assert!(needs_update(Some("1.0.0"), "1.0.0", true));
        assert!(needs_update(Some("0.0.9"), "1.0.0", false));
        assert!(needs_update(None, "1.0.0", false));
        assert!(!needs_update(None, "", false));
    }
}
