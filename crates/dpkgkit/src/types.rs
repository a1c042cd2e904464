//! Core types for dpkg operations.

use std::fmt;
use std::path::PathBuf;

/// Installation state reported by `dpkg-query` (`db:Status-Status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// Fully installed and configured
    Installed,
    /// Unpacked or partially configured, files are on disk
    Partial,
    /// Removed, only configuration files remain
    ConfigFiles,
    /// Known to the database but not installed
    NotInstalled,
}

impl PackageState {
    /// Parse the status word printed by dpkg-query.
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim() {
            "installed" => Some(Self::Installed),
            "unpacked" | "half-installed" | "half-configured" | "triggers-awaited"
            | "triggers-pending" => Some(Self::Partial),
            "config-files" => Some(Self::ConfigFiles),
            "not-installed" => Some(Self::NotInstalled),
            _ => None,
        }
    }

    /// Whether package files are present on disk.
    pub fn has_files(&self) -> bool {
        matches!(self, Self::Installed | Self::Partial)
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Self::Installed => "installed",
            Self::Partial => "partially installed",
            Self::ConfigFiles => "config-files",
            Self::NotInstalled => "not-installed",
        };
        f.write_str(word)
    }
}

/// A package as recorded in the local dpkg database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// Package name
    pub name: String,
    /// Installation state
    pub state: PackageState,
    /// Version string, empty when dpkg does not record one
    pub version: String,
}

impl InstalledPackage {
    /// Version of the files on disk, if any.
    pub fn installed_version(&self) -> Option<&str> {
        if self.state.has_files() && !self.version.is_empty() {
            Some(&self.version)
        } else {
            None
        }
    }
}

/// A downloaded `.deb` archive waiting to be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Package the archive provides
    pub package: String,
    /// Location of the archive on disk
    pub path: PathBuf,
}

impl Archive {
    /// Create a new archive reference.
    pub fn new(package: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
        }
    }
}
