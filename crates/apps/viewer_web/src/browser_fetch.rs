use fetch::{Fetch, FetchError, ProgressFn, is_success};
use gloo_net::http::{Method, Request, Response};
use wasm_bindgen::{JsCast, JsValue};

/// Same-origin requests through the browser's `fetch`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlooFetch;

fn network_error(url: &str, err: gloo_net::Error) -> FetchError {
    FetchError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn js_error(url: &str, err: &JsValue) -> FetchError {
    FetchError::Network {
        url: url.to_string(),
        message: err.as_string().unwrap_or_else(|| format!("{err:?}")),
    }
}

/// `Content-Length`, when the server sent a usable one.
fn content_length(header: Option<String>) -> Option<u64> {
    header?.trim().parse().ok().filter(|&len| len > 0)
}

/// Running body with progress callbacks per chunk.
struct Download<'a, 'p> {
    body: Vec<u8>,
    total: Option<u64>,
    on_progress: &'a mut ProgressFn<'p>,
}

impl<'a, 'p> Download<'a, 'p> {
    fn new(total: Option<u64>, on_progress: &'a mut ProgressFn<'p>) -> Self {
        let capacity = total.map_or(0, |t| t.min(64 << 20) as usize);
        Self {
            body: Vec::with_capacity(capacity),
            total,
            on_progress,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
        (self.on_progress)(self.body.len() as u64, self.total);
    }

    fn finish(self) -> Vec<u8> {
        let len = self.body.len() as u64;
        // The header can be wrong (compressed transfer); settle on the real size.
        if self.total != Some(len) {
            (self.on_progress)(len, Some(len));
        }
        self.body
    }
}

async fn send_get(path: &str) -> Result<Response, FetchError> {
    let resp = Request::get(path)
        .send()
        .await
        .map_err(|e| network_error(path, e))?;
    let status = resp.status();
    if !is_success(status) {
        return Err(FetchError::Status {
            url: path.to_string(),
            status,
        });
    }
    Ok(resp)
}

async fn read_stream(
    path: &str,
    stream: web_sys::ReadableStream,
    download: &mut Download<'_, '_>,
) -> Result<(), FetchError> {
    let reader: web_sys::ReadableStreamDefaultReader = stream.get_reader().unchecked_into();
    loop {
        let step = wasm_bindgen_futures::JsFuture::from(reader.read())
            .await
            .map_err(|e| js_error(path, &e))?;
        let done = js_sys::Reflect::get(&step, &JsValue::from_str("done"))
            .map_err(|e| js_error(path, &e))?;
        if done.as_bool().unwrap_or(true) {
            return Ok(());
        }
        let value = js_sys::Reflect::get(&step, &JsValue::from_str("value"))
            .map_err(|e| js_error(path, &e))?;
        download.push(&js_sys::Uint8Array::new(&value).to_vec());
    }
}

impl Fetch for GlooFetch {
    async fn head(&self, path: &str) -> Result<u16, FetchError> {
        let resp = Request::get(path)
            .method(Method::HEAD)
            .send()
            .await
            .map_err(|e| network_error(path, e))?;
        Ok(resp.status())
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let resp = send_get(path).await?;
        resp.binary().await.map_err(|e| network_error(path, e))
    }

    async fn get_bytes_with_progress(
        &self,
        path: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<Vec<u8>, FetchError> {
        let resp = send_get(path).await?;
        let total = content_length(resp.headers().get("content-length"));
        let mut download = Download::new(total, on_progress);
        match resp.body() {
            Some(stream) => read_stream(path, stream, &mut download).await?,
            None => {
                let bytes = resp.binary().await.map_err(|e| network_error(path, e))?;
                download.push(&bytes);
            }
        }
        Ok(download.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::{Download, content_length};

    #[test]
    fn parses_content_length() {
        assert_eq!(content_length(Some(" 2048 ".to_string())), Some(2048));
        assert_eq!(content_length(Some("0".to_string())), None);
        assert_eq!(content_length(Some("lots".to_string())), None);
        assert_eq!(content_length(None), None);
    }

    #[test]
    fn reports_progress_per_chunk() {
        let mut seen = Vec::new();
        let mut record = |loaded: u64, total: Option<u64>| seen.push((loaded, total));
        let mut download = Download::new(Some(6), &mut record);
        download.push(&[1, 2]);
        download.push(&[3, 4, 5, 6]);
        assert_eq!(download.finish(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(seen, vec![(2, Some(6)), (6, Some(6))]);
    }

    #[test]
    fn settles_on_actual_size_without_length() {
        let mut seen = Vec::new();
        let mut record = |loaded: u64, total: Option<u64>| seen.push((loaded, total));
        let mut download = Download::new(None, &mut record);
        download.push(&[9; 10]);
        assert_eq!(download.finish().len(), 10);
        assert_eq!(seen, vec![(10, None), (10, Some(10))]);
    }
}
