//! Real dpkg backend using `dpkg` and `dpkg-query` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Archive, InstalledPackage, PackageState};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Query format: the full `Status` triple, a tab, then the version.
const SHOW_FORMAT: &str = "${Status}\\t${Version}\\n";

/// `dpkg-query` exit status when no package matched the pattern.
const QUERY_NO_MATCH: i32 = 1;

/// Backend that executes real `dpkg` commands.
pub struct DpkgBackend {
    /// Path to the dpkg executable
    dpkg_path: PathBuf,
    /// Path to the dpkg-query executable
    query_path: PathBuf,
}

impl DpkgBackend {
    /// Create a new DpkgBackend.
    ///
    /// Returns an error if dpkg is not installed.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dpkg_path: find_tool("dpkg")?,
            query_path: find_tool("dpkg-query")?,
        })
    }

    /// Create a backend from explicit executable paths.
    pub fn with_paths(dpkg_path: impl Into<PathBuf>, query_path: impl Into<PathBuf>) -> Self {
        Self {
            dpkg_path: dpkg_path.into(),
            query_path: query_path.into(),
        }
    }

    fn run(&self, program: &Path, args: &[&str]) -> Result<Output> {
        log::debug!("running: {} {}", program.display(), args.join(" "));
        Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .output()
            .map_err(|source| Error::Io {
                path: program.to_path_buf(),
                source,
            })
    }

    fn run_checked(&self, operation: &str, args: &[&str]) -> Result<()> {
        let output = self.run(&self.dpkg_path, args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_dpkg_output(operation, output.status.code(), &stderr));
        }

        Ok(())
    }
}

impl Backend for DpkgBackend {
    fn query(&self, package: &str) -> Result<Option<InstalledPackage>> {
        let output = self.run(
            &self.query_path,
            &["--show", &format!("--showformat={SHOW_FORMAT}"), package],
        )?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            if output.status.code() == Some(QUERY_NO_MATCH) && output.stdout.is_empty() {
                log::debug!("{package} is unknown to dpkg: {}", stderr.trim());
                return Ok(None);
            }
            return Err(Error::Query {
                package: package.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_show_output(package, &stdout).map(Some)
    }

    fn remove(&self, packages: &[String]) -> Result<()> {
        let mut args = vec!["-r"];
        args.extend(packages.iter().map(String::as_str));
        self.run_checked("remove", &args)
    }

    fn install(&self, archives: &[Archive]) -> Result<()> {
        let paths: Vec<String> = archives
            .iter()
            .map(|a| a.path.display().to_string())
            .collect();
        let mut args = vec!["--force-overwrite", "-i"];
        args.extend(paths.iter().map(String::as_str));
        self.run_checked("install", &args)
    }
}

/// Find a dpkg executable.
fn find_tool(name: &str) -> Result<PathBuf> {
    let standard = Path::new("/usr/bin").join(name);
    if standard.exists() {
        return Ok(standard);
    }

    which::which(name).map_err(|_| Error::DpkgNotFound)
}

/// Parse one line of `dpkg-query --show` output.
fn parse_show_output(package: &str, stdout: &str) -> Result<InstalledPackage> {
    let line = stdout.lines().next().unwrap_or_default();
    let (status, version) = line.split_once('\t').ok_or_else(|| Error::Query {
        package: package.to_string(),
        message: format!("unexpected dpkg-query output: {line:?}"),
    })?;

    // "install ok installed": the last word is the state
    let state_word = status.split_whitespace().last().unwrap_or_default();
    let state = PackageState::parse(state_word).ok_or_else(|| Error::Query {
        package: package.to_string(),
        message: format!("unknown package state: {state_word:?}"),
    })?;

    Ok(InstalledPackage {
        name: package.to_string(),
        state,
        version: version.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_output_installed() {
        let pkg = parse_show_output("python", "install ok installed\t2.7.3-0ubuntu2\n").unwrap();
        assert_eq!(pkg.state, PackageState::Installed);
        assert_eq!(pkg.installed_version(), Some("2.7.3-0ubuntu2"));
    }

    #[test]
    fn test_parse_show_output_removed() {
        let pkg = parse_show_output("nginx", "deinstall ok config-files\t1.18.0-6\n").unwrap();
        assert_eq!(pkg.state, PackageState::ConfigFiles);
        assert_eq!(pkg.installed_version(), None);
    }

    #[test]
    fn test_parse_show_output_unknown_state() {
        let err = parse_show_output("x", "install ok exploded\t1.0\n").unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
    }

    #[test]
    fn test_parse_show_output_malformed() {
        assert!(parse_show_output("x", "garbage").is_err());
        assert!(parse_show_output("x", "").is_err());
    }

    #[test]
    fn test_missing_executable_is_io_error() {
        let backend = DpkgBackend::with_paths("/nonexistent/dpkg", "/nonexistent/dpkg-query");
        let err = backend.query("pkg1").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        // `false` ignores its arguments and exits 1
        let backend = DpkgBackend::with_paths("false", "false");
        let err = backend.remove(&["pkg1".to_string()]).unwrap_err();
        assert_eq!(err.exit_status(), Some(1));
    }

    #[cfg(unix)]
    fn fake_query(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("dpkg-query");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_unknown_package_with_localized_message() {
        let dir = tempfile::tempdir().unwrap();
        let query = fake_query(
            dir.path(),
            "echo \"dpkg-query: aucun paquet ne correspond à $3\" >&2; exit 1",
        );
        let backend = DpkgBackend::with_paths("false", query);
        assert!(backend.query("ghost").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_query_runs_in_c_locale() {
        let dir = tempfile::tempdir().unwrap();
        let query = fake_query(dir.path(), "printf 'install ok installed\\t%s\\n' \"$LC_ALL\"");
        let backend = DpkgBackend::with_paths("false", query);
        let pkg = backend.query("pkg1").unwrap().unwrap();
        assert_eq!(pkg.installed_version(), Some("C"));
    }

    #[cfg(unix)]
    #[test]
    fn test_query_failure_other_than_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let query = fake_query(dir.path(), "echo 'dpkg-query: error: database locked' >&2; exit 2");
        let backend = DpkgBackend::with_paths("false", query);
        let err = backend.query("pkg1").unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
    }
}
