//! Backend abstraction for dpkg operations.
//!
//! The [`Backend`] trait defines the interface to the local package database,
//! allowing for different implementations (real CLI, mock for testing).

pub mod dpkg;

use crate::error::{Error, Result};
use crate::types::{Archive, InstalledPackage, PackageState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Backend trait for dpkg operations.
///
/// Batch operations receive their arguments already ordered; a backend runs
/// exactly one command per call.
pub trait Backend: Send + Sync {
    /// Look up a package in the local database.
    ///
    /// Returns `Ok(None)` when the database has never heard of the package.
    fn query(&self, package: &str) -> Result<Option<InstalledPackage>>;

    /// Remove all packages in one command.
    fn remove(&self, packages: &[String]) -> Result<()>;

    /// Install all archives in one command, overwriting files owned by
    /// other packages.
    fn install(&self, archives: &[Archive]) -> Result<()>;
}

/// A recorded batch invocation on the [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `remove` with the package names in the order received
    Remove(Vec<String>),
    /// `install` with the archive paths in the order received
    Install(Vec<String>),
}

/// Mock backend for testing without touching the package database.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    packages: Arc<Mutex<HashMap<String, InstalledPackage>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    fail_remove: Option<i32>,
    fail_install: Option<i32>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installed package.
    pub fn with_installed(self, name: &str, version: &str) -> Self {
        self.packages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                InstalledPackage {
                    name: name.to_string(),
                    state: PackageState::Installed,
                    version: version.to_string(),
                },
            );
        self
    }

    /// Make `remove` fail with the given exit status.
    pub fn failing_remove(mut self, status: i32) -> Self {
        self.fail_remove = Some(status);
        self
    }

    /// Make `install` fail with the given exit status.
    pub fn failing_install(mut self, status: i32) -> Self {
        self.fail_install = Some(status);
        self
    }

    /// All batch invocations seen so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, invocation: Invocation) {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation);
    }
}

impl Backend for MockBackend {
    fn query(&self, package: &str) -> Result<Option<InstalledPackage>> {
        let packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(packages.get(package).cloned())
    }

    fn remove(&self, packages: &[String]) -> Result<()> {
        self.record(Invocation::Remove(packages.to_vec()));
        if let Some(status) = self.fail_remove {
            return Err(Error::from_dpkg_output("remove", Some(status), "mock failure"));
        }
        let mut installed = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        for name in packages {
            installed.remove(name);
        }
        Ok(())
    }

    fn install(&self, archives: &[Archive]) -> Result<()> {
        self.record(Invocation::Install(
            archives
                .iter()
                .map(|a| a.path.display().to_string())
                .collect(),
        ));
        if let Some(status) = self.fail_install {
            return Err(Error::from_dpkg_output("install", Some(status), "mock failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_query() {
        let mock = MockBackend::new().with_installed("pkg1", "0.0.9");
        let pkg = mock.query("pkg1").unwrap().unwrap();
        assert_eq!(pkg.installed_version(), Some("0.0.9"));
        assert!(mock.query("pkg2").unwrap().is_none());
    }

    #[test]
    fn test_mock_records_batches() {
        let mock = MockBackend::new().with_installed("pkg1", "0.0.9");
        mock.remove(&["pkg1".to_string()]).unwrap();
        mock.install(&[Archive::new("pkg1", "/tmp/pkg1-1.0.0-amd64.deb")])
            .unwrap();

        assert_eq!(
            mock.invocations(),
            vec![
                Invocation::Remove(vec!["pkg1".to_string()]),
                Invocation::Install(vec!["/tmp/pkg1-1.0.0-amd64.deb".to_string()]),
            ]
        );
        assert!(mock.query("pkg1").unwrap().is_none());
    }

    #[test]
    fn test_mock_failure_carries_status() {
        let mock = MockBackend::new().failing_install(2);
        let err = mock.install(&[Archive::new("pkg1", "/tmp/a.deb")]).unwrap_err();
        assert_eq!(err.exit_status(), Some(2));
    }
}
