use crate::{Fetch, FetchError, is_absolute_url, is_success, join_path};

/// A deployed site reached over HTTP. Site-relative paths are joined onto
/// `base_url`; absolute URLs are requested as-is.
///
/// reqwest needs a tokio runtime; the CLI provides one.
#[derive(Debug, Clone)]
pub struct HttpFetch {
    base_url: String,
    http: reqwest::Client,
}

impl HttpFetch {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        if is_absolute_url(path) {
            path.to_string()
        } else {
            join_path(&self.base_url, path)
        }
    }
}

impl Fetch for HttpFetch {
    async fn head(&self, path: &str) -> Result<u16, FetchError> {
        let url = self.url_for(path);
        let resp = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok(resp.status().as_u16())
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.clone(),
                message: e.to_string(),
            })?;
        let status = resp.status().as_u16();
        if !is_success(status) {
            return Err(FetchError::Status { url, status });
        }
        let body = resp.bytes().await.map_err(|e| FetchError::Network {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpFetch;

    #[test]
    fn joins_relative_paths_onto_base() {
        let fetch = HttpFetch::new("https://survey.example.org/site/");
        assert_eq!(
            fetch.url_for("projects/demo/metadata.json"),
            "https://survey.example.org/site/projects/demo/metadata.json"
        );
        assert_eq!(
            fetch.url_for("https://cdn.example.org/a.glb"),
            "https://cdn.example.org/a.glb"
        );
    }
}
