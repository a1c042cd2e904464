//! Package manifests: one package name per line

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Ordered list of package names a host is expected to carry
///
/// Order is kept for logging only; duplicates are not removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    packages: Vec<String>,
}

impl Manifest {
    /// Read a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        log::debug!("reading from file: {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| Error::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Parse manifest text. Blank lines are ignored.
    pub fn parse(content: &str) -> Self {
        Self {
            packages: content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Build a manifest from package names
    pub fn from_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }

    /// Package names in manifest order
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Number of entries, duplicates included
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Check if the manifest lists nothing
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
