//! Small URL helpers for site-relative paths. These never touch the network
//! and only understand the subset of URL syntax static sites use.

/// `true` for `http:`, `https:`, `data:`, `blob:` and protocol-relative URLs.
pub fn is_absolute_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
        || lower.starts_with("blob:")
        || lower.starts_with("//")
}

/// Joins path segments with exactly one `/` between them.
pub fn join_path(base: &str, rel: &str) -> String {
    if base.is_empty() {
        return rel.trim_start_matches('/').to_string();
    }
    if rel.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        rel.trim_start_matches('/')
    )
}

/// Everything up to and including the last `/` (query and fragment dropped).
pub fn parent_dir(url: &str) -> &str {
    let url = strip_query(url);
    match url.rfind('/') {
        Some(idx) => &url[..=idx],
        None => "",
    }
}

pub fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Lowercased file extension of the last path segment, if any.
pub fn extension(url: &str) -> Option<String> {
    let path = strip_query(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolves `rel` against the file URL `base` (the way a glTF buffer URI is
/// resolved against the glTF file). Absolute URLs and root-relative paths
/// are returned unchanged. `.` and `..` segments are collapsed.
pub fn resolve_relative(base: &str, rel: &str) -> String {
    if is_absolute_url(rel) || rel.starts_with('/') {
        return rel.to_string();
    }
    let dir = parent_dir(base);
    let (prefix, dir_path) = split_origin(dir);

    let mut segments: Vec<&str> = dir_path.split('/').filter(|s| !s.is_empty()).collect();
    let leading_slash = dir_path.starts_with('/');
    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if leading_slash {
        format!("{prefix}/{joined}")
    } else {
        format!("{prefix}{joined}")
    }
}

// Splits `https://host/path` into (`https://host`, `/path`).
fn split_origin(url: &str) -> (&str, &str) {
    if let Some(scheme_end) = url.find("://") {
        let after = scheme_end + 3;
        match url[after..].find('/') {
            Some(idx) => url.split_at(after + idx),
            None => (url, ""),
        }
    } else {
        ("", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_detection() {
        assert!(is_absolute_url("https://example.com/a.glb"));
        assert!(is_absolute_url("data:application/octet-stream;base64,AAAA"));
        assert!(is_absolute_url("//cdn.example.com/x"));
        assert!(!is_absolute_url("projects/a.glb"));
        assert!(!is_absolute_url("/projects/a.glb"));
    }

    #[test]
    fn join_handles_slashes() {
        assert_eq!(join_path("projects", "demo"), "projects/demo");
        assert_eq!(join_path("projects/", "/demo"), "projects/demo");
        assert_eq!(join_path("", "/demo"), "demo");
        assert_eq!(join_path("projects", ""), "projects");
    }

    #[test]
    fn extension_ignores_query_and_case() {
        assert_eq!(extension("a/b/model.GLB?v=2").as_deref(), Some("glb"));
        assert_eq!(extension("model.obj#frag").as_deref(), Some("obj"));
        assert_eq!(extension("a.b/model"), None);
        assert_eq!(extension(".hidden"), None);
    }

    #[test]
    fn parent_dir_keeps_trailing_slash() {
        assert_eq!(parent_dir("projects/demo/model.gltf"), "projects/demo/");
        assert_eq!(parent_dir("model.gltf"), "");
        assert_eq!(parent_dir("https://h/x/y.gltf?q=1"), "https://h/x/");
    }

    #[test]
    fn resolves_relative_paths() {
        assert_eq!(
            resolve_relative("projects/demo/model.gltf", "model.bin"),
            "projects/demo/model.bin"
        );
        assert_eq!(
            resolve_relative("projects/demo/models/m.gltf", "../textures/t.png"),
            "projects/demo/textures/t.png"
        );
        assert_eq!(
            resolve_relative("https://h.io/p/demo/m.gltf", "./buf/m.bin"),
            "https://h.io/p/demo/buf/m.bin"
        );
        assert_eq!(
            resolve_relative("/site/m.gltf", "m.bin"),
            "/site/m.bin"
        );
        assert_eq!(
            resolve_relative("projects/demo/m.gltf", "https://cdn/x.bin"),
            "https://cdn/x.bin"
        );
    }
}
