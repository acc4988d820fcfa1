//! Read-only access to the static files a survey site is made of.
//!
//! Everything the site does is `GET`/`HEAD` against files hosted next to the
//! page, so the rest of the workspace only ever sees the [`Fetch`] trait.
//! Backends:
//! - [`MemoryFetch`]: in-memory files, used by tests.
//! - [`DirectoryFetch`]: a site checked out on disk (native only).
//! - [`HttpFetch`]: a deployed site over HTTP via reqwest (native only).
//! - the browser backend lives in the web app (gloo-net).

use std::future::Future;

pub mod memory;
pub mod url;

#[cfg(not(target_arch = "wasm32"))]
pub mod dir;
#[cfg(not(target_arch = "wasm32"))]
pub mod http;

pub use memory::MemoryFetch;
pub use url::*;

#[cfg(not(target_arch = "wasm32"))]
pub use dir::DirectoryFetch;
#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpFetch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    Status { url: String, status: u16 },
    /// The request never produced a response.
    Network { url: String, message: String },
    /// The body was not valid UTF-8 where text was expected.
    InvalidText { url: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::InvalidText { url } => url,
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status { url, status } => write!(f, "{url}: HTTP {status}"),
            FetchError::Network { url, message } => write!(f, "{url}: {message}"),
            FetchError::InvalidText { url } => write!(f, "{url}: body is not valid UTF-8"),
        }
    }
}

impl std::error::Error for FetchError {}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Progress callback: `(bytes_loaded, bytes_total_if_known)`.
pub type ProgressFn<'a> = dyn FnMut(u64, Option<u64>) + 'a;

/// Static-file access. Paths are site-relative (`projects/demo/metadata.json`)
/// or absolute URLs; backends decide how to resolve them.
///
/// Futures are not required to be `Send`: the browser backend runs on the
/// single-threaded event loop.
pub trait Fetch {
    /// Issues a `HEAD` request and returns the status code. Only transport
    /// failures are errors; a 404 is `Ok(404)`.
    fn head(&self, path: &str) -> impl Future<Output = Result<u16, FetchError>>;

    /// `GET` the body; non-2xx statuses are `FetchError::Status`.
    fn get_bytes(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>>;

    /// Like `get_bytes`, reporting progress as the body arrives. Backends
    /// without streaming support report once, at completion.
    fn get_bytes_with_progress(
        &self,
        path: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> {
        async move {
            let bytes = self.get_bytes(path).await?;
            let len = bytes.len() as u64;
            on_progress(len, Some(len));
            Ok(bytes)
        }
    }

    fn get_text(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> {
        async move {
            let bytes = self.get_bytes(path).await?;
            String::from_utf8(bytes).map_err(|_| FetchError::InvalidText {
                url: path.to_string(),
            })
        }
    }

    /// `true` when a `HEAD` answers 2xx; transport errors count as missing.
    fn exists(&self, path: &str) -> impl Future<Output = bool> {
        async move {
            match self.head(path).await {
                Ok(status) => is_success(status),
                Err(err) => {
                    tracing::debug!("HEAD {path} failed: {err}");
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Fetch, FetchError, MemoryFetch, is_success};

    #[test]
    fn success_range() {
        assert!(is_success(200));
        assert!(is_success(204));
        assert!(!is_success(304));
        assert!(!is_success(404));
    }

    #[test]
    fn error_accessors() {
        let err = FetchError::Status {
            url: "a/b".to_string(),
            status: 404,
        };
        assert!(err.is_not_found());
        assert_eq!(err.url(), "a/b");
        assert_eq!(err.to_string(), "a/b: HTTP 404");

        let err = FetchError::Network {
            url: "x".to_string(),
            message: "offline".to_string(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn default_text_and_progress() {
        let fetch = MemoryFetch::new().with_file("notes.txt", "hello");
        let text = pollster::block_on(fetch.get_text("notes.txt")).expect("text");
        assert_eq!(text, "hello");

        let mut seen = Vec::new();
        let bytes = pollster::block_on(
            fetch.get_bytes_with_progress("notes.txt", &mut |loaded: u64, total: Option<u64>| {
                seen.push((loaded, total));
            }),
        )
        .expect("bytes");
        assert_eq!(bytes.len(), 5);
        assert_eq!(seen, vec![(5, Some(5))]);
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let fetch = MemoryFetch::new().with_file("blob.bin", vec![0xff, 0xfe]);
        let err = pollster::block_on(fetch.get_text("blob.bin")).unwrap_err();
        assert_eq!(
            err,
            FetchError::InvalidText {
                url: "blob.bin".to_string()
            }
        );
    }

    #[test]
    fn exists_follows_head_status() {
        let fetch = MemoryFetch::new().with_file("a.json", "{}");
        assert!(pollster::block_on(fetch.exists("a.json")));
        assert!(!pollster::block_on(fetch.exists("b.json")));
    }
}
