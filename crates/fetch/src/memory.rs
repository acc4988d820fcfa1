use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::{Fetch, FetchError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
}

/// In-memory site: a path → bytes map plus a log of every request made.
///
/// Paths are normalized (leading `./` and `/` dropped) so `projects/a` and
/// `/projects/a` address the same file. A path ending in `/` resolves to its
/// `index.html`, like a static host would.
#[derive(Debug, Default)]
pub struct MemoryFetch {
    files: BTreeMap<String, Vec<u8>>,
    failing: BTreeMap<String, String>,
    log: RefCell<Vec<(Method, String)>>,
}

impl MemoryFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(path, body);
        self
    }

    /// Every request for `path` fails with a transport error.
    pub fn with_network_error(mut self, path: &str, message: &str) -> Self {
        self.failing.insert(normalize(path), message.to_string());
        self
    }

    pub fn insert(&mut self, path: &str, body: impl Into<Vec<u8>>) {
        self.files.insert(normalize(path), body.into());
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.files.remove(&normalize(path)).is_some()
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.log.borrow().clone()
    }

    pub fn request_count(&self, method: Method, path: &str) -> usize {
        let path = normalize(path);
        self.log
            .borrow()
            .iter()
            .filter(|(m, p)| *m == method && *p == path)
            .count()
    }

    fn lookup(&self, method: Method, path: &str) -> Result<Option<&Vec<u8>>, FetchError> {
        let key = normalize(path);
        self.log.borrow_mut().push((method, key.clone()));
        if let Some(message) = self.failing.get(&key) {
            return Err(FetchError::Network {
                url: path.to_string(),
                message: message.clone(),
            });
        }
        Ok(self.files.get(&key))
    }
}

impl Fetch for MemoryFetch {
    async fn head(&self, path: &str) -> Result<u16, FetchError> {
        Ok(match self.lookup(Method::Head, path)? {
            Some(_) => 200,
            None => 404,
        })
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        match self.lookup(Method::Get, path)? {
            Some(body) => Ok(body.clone()),
            None => Err(FetchError::Status {
                url: path.to_string(),
                status: 404,
            }),
        }
    }
}

fn normalize(path: &str) -> String {
    let mut p = path.trim();
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest;
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest;
        } else {
            break;
        }
    }
    if p.is_empty() || p.ends_with('/') {
        format!("{p}index.html")
    } else {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryFetch, Method, normalize};
    use crate::{Fetch, FetchError};

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize("./projects/a.json"), "projects/a.json");
        assert_eq!(normalize("/projects/a.json"), "projects/a.json");
        assert_eq!(normalize("projects/demo/"), "projects/demo/index.html");
        assert_eq!(normalize(""), "index.html");
    }

    #[test]
    fn head_and_get_are_logged() {
        let fetch = MemoryFetch::new().with_file("/a/b.json", "{}");
        assert_eq!(pollster::block_on(fetch.head("a/b.json")), Ok(200));
        assert_eq!(pollster::block_on(fetch.head("a/c.json")), Ok(404));
        let err = pollster::block_on(fetch.get_bytes("a/c.json")).unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(fetch.request_count(Method::Head, "a/b.json"), 1);
        assert_eq!(fetch.request_count(Method::Get, "a/c.json"), 1);
        assert_eq!(fetch.requests().len(), 3);
    }

    #[test]
    fn network_errors_are_transport_failures() {
        let fetch = MemoryFetch::new().with_network_error("down.json", "connection reset");
        let err = pollster::block_on(fetch.head("down.json")).unwrap_err();
        assert_eq!(
            err,
            FetchError::Network {
                url: "down.json".to_string(),
                message: "connection reset".to_string()
            }
        );
    }

    #[test]
    fn remove_drops_file() {
        let mut fetch = MemoryFetch::new().with_file("x", "1");
        assert!(fetch.remove("x"));
        assert!(!fetch.remove("x"));
        assert_eq!(pollster::block_on(fetch.head("x")), Ok(404));
    }
}
