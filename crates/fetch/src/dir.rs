use std::path::{Component, Path, PathBuf};

use crate::{Fetch, FetchError, strip_query};

/// Serves a site checked out on disk, the way a static host would.
///
/// `..` components are refused with a 403 so lookups never leave `root`.
#[derive(Debug, Clone)]
pub struct DirectoryFetch {
    root: PathBuf,
}

impl DirectoryFetch {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, u16> {
        let path = strip_query(path);
        let rel = Path::new(path.trim_start_matches('/'));
        let mut out = self.root.clone();
        for comp in rel.components() {
            match comp {
                Component::Normal(seg) => out.push(seg),
                Component::CurDir => {}
                _ => return Err(403),
            }
        }
        if path.is_empty() || path.ends_with('/') || out.is_dir() {
            out.push("index.html");
        }
        Ok(out)
    }
}

impl Fetch for DirectoryFetch {
    async fn head(&self, path: &str) -> Result<u16, FetchError> {
        Ok(match self.resolve(path) {
            Ok(file) if file.is_file() => 200,
            Ok(_) => 404,
            Err(status) => status,
        })
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let file = self.resolve(path).map_err(|status| FetchError::Status {
            url: path.to_string(),
            status,
        })?;
        match std::fs::read(&file) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(FetchError::Status {
                url: path.to_string(),
                status: 404,
            }),
            Err(err) => Err(FetchError::Network {
                url: path.to_string(),
                message: err.to_string(),
            }),
        }
    }
}
