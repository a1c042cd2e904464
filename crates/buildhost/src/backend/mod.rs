//! Backend traits and implementations for HTTP access.
//!
//! The [`Backend`] trait is the transport seam: [`http::HttpBackend`] talks to
//! a real server, [`MockBackend`] answers from in-memory tables keyed by URL.
//!
//! ```
//! use buildhost::backend::{Backend, MockBackend};
//!
//! let mock = MockBackend::new().with_text(
//!     "http://buildhost/domains/default/stacks/latest/packages/test-package/version",
//!     "1.0.0\n",
//! );
//! let body = mock
//!     .get_text("http://buildhost/domains/default/stacks/latest/packages/test-package/version")
//!     .unwrap();
//! assert_eq!(body, "1.0.0\n");
//! ```

pub mod http;

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Backend trait for build server requests.
pub trait Backend: Send + Sync {
    /// GET a URL and return the body as text.
    fn get_text(&self, url: &str) -> Result<String>;

    /// GET a URL and write the body verbatim to `dest`, overwriting it.
    ///
    /// Returns the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;

    /// POST a JSON document and return the HTTP status.
    fn post_json(&self, url: &str, body: &str) -> Result<u16>;
}

/// Mock backend for testing without network access.
///
/// Unknown URLs answer with [`Error::NotFound`]; URLs registered with
/// [`MockBackend::unreachable`] answer with [`Error::RemoteUnavailable`].
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    statuses: HashMap<String, u16>,
    unreachable: Vec<String>,
    downloads: Arc<Mutex<Vec<(String, PathBuf)>>>,
    posts: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GET `url` with `body`.
    #[must_use]
    pub fn with_text(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.texts.insert(url.into(), body.into());
        self
    }

    /// Serve `data` for downloads of `url`.
    #[must_use]
    pub fn with_file(mut self, url: impl Into<String>, data: Vec<u8>) -> Self {
        self.files.insert(url.into(), data);
        self
    }

    /// Answer POST `url` with `status`.
    #[must_use]
    pub fn with_post_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.statuses.insert(url.into(), status);
        self
    }

    /// Fail every request to `url` at the transport level.
    #[must_use]
    pub fn unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.push(url.into());
        self
    }

    /// Downloads performed so far, as `(url, destination)`.
    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Posts performed so far, as `(url, body)`.
    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_reachable(&self, url: &str) -> Result<()> {
        if self.unreachable.iter().any(|u| u == url) {
            return Err(Error::RemoteUnavailable {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

impl Backend for MockBackend {
    fn get_text(&self, url: &str) -> Result<String> {
        self.check_reachable(url)?;
        self.texts.get(url).cloned().ok_or_else(|| Error::NotFound {
            url: url.to_string(),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.check_reachable(url)?;
        let data = self.files.get(url).ok_or_else(|| Error::NotFound {
            url: url.to_string(),
        })?;
        fs::write(dest, data).map_err(|e| Error::io(dest, e))?;
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), dest.to_path_buf()));
        Ok(data.len() as u64)
    }

    fn post_json(&self, url: &str, body: &str) -> Result<u16> {
        self.check_reachable(url)?;
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), body.to_string()));
        Ok(self.statuses.get(url).copied().unwrap_or(200))
    }
}
