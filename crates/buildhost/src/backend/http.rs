//! Plain HTTP backend.
//!
//! This module provides the [`HttpBackend`] implementation that talks to a
//! build server over blocking HTTP. Every request is bounded by a global
//! timeout so a wedged server cannot stall a rollout forever.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::DEFAULT_TIMEOUT;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Maximum artifact size (1 GiB covers the largest packages we ship).
const MAX_BODY_SIZE: u64 = 1024 * 1024 * 1024;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("mise-a-feu/", env!("CARGO_PKG_VERSION"));

/// HTTP backend.
///
/// # Example
///
/// ```no_run
/// use buildhost::backend::Backend;
/// use buildhost::backend::http::HttpBackend;
/// use std::time::Duration;
///
/// let backend = HttpBackend::with_timeout(Duration::from_secs(10));
/// let version = backend
///     .get_text("http://buildhost/domains/default/stacks/latest/packages/nginx/version")
///     .unwrap();
/// println!("{version}");
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
}

impl HttpBackend {
    /// Create a backend with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a backend with a custom per-request timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for HttpBackend {
    fn get_text(&self, url: &str) -> Result<String> {
        log::debug!("GET {url}");
        self.agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Error::from_ureq(url, e))?
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::from_ureq(url, e))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        log::debug!("GET {url} -> {}", dest.display());
        let mut response = self
            .agent
            .get(url)
            .header("Accept", "application/octet-stream")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Error::from_ureq(url, e))?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| Error::from_ureq(url, e))?;

        fs::write(dest, &bytes).map_err(|e| Error::io(dest, e))?;
        Ok(bytes.len() as u64)
    }

    fn post_json(&self, url: &str, body: &str) -> Result<u16> {
        log::debug!("POST {url} {body}");
        let result = self
            .agent
            .post(url)
            .header("content-type", "application/json")
            .header("User-Agent", USER_AGENT)
            .send(body);

        match result {
            Ok(response) => Ok(response.status().as_u16()),
            Err(ureq::Error::StatusCode(status)) => Ok(status),
            Err(e) => Err(Error::from_ureq(url, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// One-shot HTTP server answering a single request with `status` and
    /// `body`. Returns the base URL and a handle yielding the raw request.
    fn serve_once(status: &'static str, body: &'static [u8]) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut payload = vec![0u8; content_length];
            reader.read_exact(&mut payload).unwrap();
            request.push_str(&String::from_utf8_lossy(&payload));

            let header = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(header.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
            request
        });

        (format!("http://{addr}"), handle)
    }

    #[test]
    fn test_get_text() {
        let (base, handle) = serve_once("200 OK", b"hello world\n");
        let backend = HttpBackend::new();
        let body = backend.get_text(&format!("{base}/")).unwrap();
        assert_eq!(body, "hello world\n");
        handle.join().unwrap();
    }

    #[test]
    fn test_get_text_404_is_not_found() {
        let (base, handle) = serve_once("404 Not Found", b"");
        let backend = HttpBackend::new();
        let err = backend.get_text(&format!("{base}/missing")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        handle.join().unwrap();
    }

    #[test]
    fn test_download_writes_body() {
        let (base, handle) = serve_once("200 OK", b"hello world\n");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.deb");
        fs::write(&dest, b"stale contents that are longer").unwrap();

        let backend = HttpBackend::new();
        let written = backend.download(&format!("{base}/debs/file.deb"), &dest).unwrap();

        assert_eq!(written, 12);
        assert_eq!(fs::read(&dest).unwrap(), b"hello world\n");
        handle.join().unwrap();
    }

    #[test]
    fn test_post_json_returns_status() {
        let (base, handle) = serve_once("201 Created", b"");
        let backend = HttpBackend::new();
        let status = backend
            .post_json(&format!("{base}/hook"), r#"{"packages":["pkg1"]}"#)
            .unwrap();
        assert_eq!(status, 201);

        let request = handle.join().unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
    }

    #[test]
    fn test_unreachable_server() {
        // Bind then drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let backend = HttpBackend::with_timeout(Duration::from_secs(2));
        let err = backend.get_text(&format!("http://127.0.0.1:{port}/")).unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable { .. }));
    }
}
