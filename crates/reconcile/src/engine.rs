//! Per-host reconciliation

use crate::context::{ArtifactFetcher, CompletionCallback, NoCallback, PackageManager, VersionSource};
use crate::error::Result;
use crate::executor;
use crate::manifest::Manifest;
use crate::planner;
use crate::types::{ReconcileOptions, Target, UpdatePlan};

/// Converges one host onto a target stack
///
/// ```ignore
/// let engine = Engine::new(&versions, &fetcher, &manager).with_callback(&webhook);
/// let plan = engine.reconcile(&manifest, &target, &options)?;
/// ```
pub struct Engine<'a> {
    versions: &'a dyn VersionSource,
    fetcher: &'a dyn ArtifactFetcher,
    manager: &'a dyn PackageManager,
    callback: &'a dyn CompletionCallback,
}

impl<'a> Engine<'a> {
    /// Create an engine with no completion callback transport
    pub fn new(
        versions: &'a dyn VersionSource,
        fetcher: &'a dyn ArtifactFetcher,
        manager: &'a dyn PackageManager,
    ) -> Self {
        Self {
            versions,
            fetcher,
            manager,
            callback: &NoCallback,
        }
    }

    /// Use `callback` to deliver the webhook
    #[must_use]
    pub fn with_callback(mut self, callback: &'a dyn CompletionCallback) -> Self {
        self.callback = callback;
        self
    }

    /// Plan, stage and apply the updates `manifest` requires on this host
    ///
    /// Returns the applied plan. When `options.web_callback` is set the
    /// updated package names are posted to it afterwards; a failed or
    /// rejected callback is logged and never turns into an error.
    pub fn reconcile(
        &self,
        manifest: &Manifest,
        target: &Target,
        options: &ReconcileOptions,
    ) -> Result<UpdatePlan> {
        log::log!(
            options.diagnostic_level(),
            "checking {} packages against {}/{} on {}",
            manifest.len(),
            target.domain,
            target.stack,
            target.build_host
        );

        let plan = planner::plan(manifest, target, options, self.versions, self.fetcher)?;
        executor::apply(&plan, &options.staging_dir, self.manager)?;

        if let Some(url) = options.web_callback.as_deref() {
            self.send_callback(url, &plan);
        }

        Ok(plan)
    }

    fn send_callback(&self, url: &str, plan: &UpdatePlan) {
        log::debug!("calling web callback {url}");
        match self.callback.notify(url, &plan.packages()) {
            Ok(true) => log::debug!("web callback {url} acknowledged"),
            Ok(false) => log::warn!("web callback {url} was not acknowledged"),
            Err(e) => log::warn!("web callback failed: {e}"),
        }
    }
}
