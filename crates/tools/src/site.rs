use fetch::{DirectoryFetch, Fetch, FetchError, HttpFetch, ProgressFn};

/// The site being inspected: a checkout on disk or a deployment.
#[derive(Debug)]
pub enum SiteFetch {
    Dir(DirectoryFetch),
    Http(HttpFetch),
}

impl SiteFetch {
    pub fn describe(&self) -> String {
        match self {
            SiteFetch::Dir(f) => f.root().display().to_string(),
            SiteFetch::Http(f) => f.base_url().to_string(),
        }
    }
}

impl Fetch for SiteFetch {
    async fn head(&self, path: &str) -> Result<u16, FetchError> {
        match self {
            SiteFetch::Dir(f) => f.head(path).await,
            SiteFetch::Http(f) => f.head(path).await,
        }
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        match self {
            SiteFetch::Dir(f) => f.get_bytes(path).await,
            SiteFetch::Http(f) => f.get_bytes(path).await,
        }
    }

    async fn get_bytes_with_progress(
        &self,
        path: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<Vec<u8>, FetchError> {
        match self {
            SiteFetch::Dir(f) => f.get_bytes_with_progress(path, on_progress).await,
            SiteFetch::Http(f) => f.get_bytes_with_progress(path, on_progress).await,
        }
    }
}
