use fetch::{Fetch, join_path};
use foundation::math::LatLon;
use serde::{Deserialize, Serialize};

use crate::metadata::{LayerSource, LayerSpec};

/// Site-level settings, read from an optional `site.json` next to the page.
/// Every field has a default so a bare static host works unconfigured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    /// Folder holding one sub-folder per project.
    pub projects_root: String,
    /// Folder names probed when no `projects.json` index is published.
    pub candidates: Vec<String>,
    /// Shared viewer page used when a project has no page of its own.
    pub viewer_page: String,
    /// `[lat, lon]` used when a project has no center.
    pub default_center: [f64; 2],
    pub default_zoom: f64,
    pub base_layers: Vec<LayerSpec>,
    pub draco_decoder_path: String,
}

pub const SITE_CONFIG_FILE: &str = "site.json";
pub const PROJECT_INDEX_FILE: &str = "projects.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const INDEX_FILE: &str = "index.html";

const DEFAULT_CANDIDATES: &[&str] = &[
    "demo-project",
    "sample-survey",
    "farm-survey",
    "construction-site",
    "bridge-inspection",
    "quarry-volume",
    "solar-farm",
    "coastal-erosion",
    "roof-inspection",
    "forest-canopy",
];

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            projects_root: "projects".to_string(),
            candidates: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            viewer_page: "viewer.html".to_string(),
            default_center: [0.0, 0.0],
            default_zoom: 2.0,
            base_layers: default_base_layers(),
            draco_decoder_path: "https://www.gstatic.com/draco/versioned/decoders/1.5.6/"
                .to_string(),
        }
    }
}

fn default_base_layers() -> Vec<LayerSpec> {
    vec![
        LayerSpec {
            id: "osm".to_string(),
            name: Some("OpenStreetMap".to_string()),
            source: LayerSource::Tile,
            url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            base: true,
            visible: Some(true),
            attribution: Some("© OpenStreetMap contributors".to_string()),
            subdomains: Some("abc".to_string()),
            max_zoom: Some(19),
        },
        LayerSpec {
            id: "satellite".to_string(),
            name: Some("Satellite".to_string()),
            source: LayerSource::Tile,
            url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
                .to_string(),
            base: true,
            visible: Some(false),
            attribution: Some("Tiles © Esri".to_string()),
            subdomains: None,
            max_zoom: Some(19),
        },
    ]
}

impl SiteConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Reads `site.json`; a missing or unreadable file yields the defaults.
    pub async fn load<F: Fetch>(fetch: &F) -> Self {
        let raw = match fetch.get_text(SITE_CONFIG_FILE).await {
            Ok(raw) => raw,
            Err(err) if err.is_not_found() => return Self::default(),
            Err(err) => {
                tracing::warn!("{SITE_CONFIG_FILE} unavailable, using defaults: {err}");
                return Self::default();
            }
        };
        match Self::from_json_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{SITE_CONFIG_FILE} is invalid, using defaults: {err}");
                Self::default()
            }
        }
    }

    pub fn default_center(&self) -> LatLon {
        LatLon::new(self.default_center[0], self.default_center[1])
    }

    pub fn project_dir(&self, name: &str) -> String {
        format!("{}/", join_path(&self.projects_root, name))
    }

    pub fn project_file(&self, name: &str, file: &str) -> String {
        join_path(&join_path(&self.projects_root, name), file)
    }

    pub fn metadata_path(&self, name: &str) -> String {
        self.project_file(name, METADATA_FILE)
    }

    pub fn index_path(&self, name: &str) -> String {
        self.project_file(name, INDEX_FILE)
    }

    pub fn project_index_path(&self) -> String {
        join_path(&self.projects_root, PROJECT_INDEX_FILE)
    }

    /// `<viewer_page>?project=<id>`
    pub fn viewer_url(&self, project_id: &str) -> String {
        format!("{}?project={}", self.viewer_page, encode_query_value(project_id))
    }
}

/// Percent-encodes everything outside the URL unreserved set.
pub fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Reverses [`encode_query_value`]; `+` is read as a space. Malformed
/// escapes are kept literally.
pub fn decode_query_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Value of `name` in a `?a=1&b=2` query string (leading `?` optional).
pub fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| decode_query_value(v))
}
