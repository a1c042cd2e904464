//! Host-side providers for the reconcile engine
//!
//! Local versions, removal and installation go through dpkg; stack
//! versions, artifacts and the completion callback go through the build
//! server.

use reconcile::{
    ArtifactFetcher, Batch, CompletionCallback, PackageManager, StagedArtifact, Target,
    VersionSource,
};
use std::path::Path;

/// dpkg plus build server, seen as the reconcile engine's providers
pub struct HostServices {
    dpkg: dpkgkit::Client,
    build: buildhost::Client,
}

impl HostServices {
    pub fn new(dpkg: dpkgkit::Client, build: buildhost::Client) -> Self {
        Self { dpkg, build }
    }
}

impl VersionSource for HostServices {
    fn local_version(&self, package: &str) -> reconcile::Result<Option<String>> {
        self.dpkg
            .installed_version(package)
            .map_err(|e| reconcile::Error::Query {
                package: package.to_string(),
                message: e.to_string(),
            })
    }

    fn remote_version(&self, target: &Target, package: &str) -> reconcile::Result<String> {
        self.build
            .remote_version(&target.build_host, &target.domain, &target.stack, package)
            .map_err(|e| lookup_error(package, e))
    }
}

impl ArtifactFetcher for HostServices {
    fn resolve_artifact_name(
        &self,
        target: &Target,
        package: &str,
        version: &str,
    ) -> reconcile::Result<String> {
        self.build
            .artifact_name(&target.build_host, package, version)
            .map_err(|e| lookup_error(package, e))
    }

    fn download(&self, target: &Target, file_name: &str, staging_dir: &Path) -> reconcile::Result<u64> {
        self.build
            .download(&target.build_host, file_name, staging_dir)
            .map_err(|e| reconcile::Error::Fetch {
                file_name: file_name.to_string(),
                message: e.to_string(),
            })
    }
}

impl PackageManager for HostServices {
    fn remove(&self, packages: &[String]) -> reconcile::Result<()> {
        self.dpkg
            .remove(packages)
            .map_err(|e| manager_error(Batch::Remove, &e))
    }

    fn install(&self, artifacts: &[StagedArtifact]) -> reconcile::Result<()> {
        let archives: Vec<dpkgkit::Archive> = artifacts
            .iter()
            .map(|a| dpkgkit::Archive::new(a.package.clone(), a.path.clone()))
            .collect();
        self.dpkg
            .install(&archives)
            .map_err(|e| manager_error(Batch::Install, &e))
    }
}

impl CompletionCallback for HostServices {
    fn notify(&self, url: &str, packages: &[String]) -> reconcile::Result<bool> {
        self.build
            .web_callback(url, packages)
            .map_err(|e| reconcile::Error::Callback {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// Map a build server lookup failure onto the reconcile taxonomy
fn lookup_error(package: &str, err: buildhost::Error) -> reconcile::Error {
    match err {
        buildhost::Error::NotFound { url } => reconcile::Error::NotFound {
            package: package.to_string(),
            message: url,
        },
        other => {
            log::debug!("{package}: {} ({})", other.category(), other.category().advice());
            reconcile::Error::RemoteUnavailable {
                package: package.to_string(),
                message: other.to_string(),
            }
        }
    }
}

fn manager_error(batch: Batch, err: &dpkgkit::Error) -> reconcile::Error {
    let category = err.category();
    if err.is_retryable() {
        log::warn!("dpkg {batch}: {}, try again later", category.description());
    } else {
        log::debug!("dpkg {batch}: {} - {}", category.description(), category.advice());
    }
    reconcile::Error::Manager {
        batch,
        status: err.exit_status(),
        message: err.to_string(),
    }
}
