use fetch::{FetchError, resolve_relative};
use formats::ModelFormat;
use foundation::math::{LatLon, Vec3};
use serde::{Deserialize, Serialize};

/// `metadata.json` as published in a project folder. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub thumbnail: Option<String>,
    pub map_settings: Option<MapSettings>,
    pub model_settings: Option<ModelSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapSettings {
    /// `[lat, lon]`
    pub center: Option<[f64; 2]>,
    pub zoom: Option<f64>,
    pub layers: Vec<LayerSpec>,
    pub annotations: Vec<AnnotationSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerSource {
    /// XYZ raster tiles from a `{z}/{x}/{y}` URL template.
    #[default]
    Tile,
    #[serde(alias = "json")]
    GeoJson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub source: LayerSource,
    pub url: String,
    /// Base layers are mutually exclusive; overlays stack on top.
    #[serde(default)]
    pub base: bool,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default)]
    pub subdomains: Option<String>,
    #[serde(default)]
    pub max_zoom: Option<u8>,
}

impl LayerSpec {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Overlays default to visible; base layers only when marked so.
    pub fn initially_visible(&self) -> bool {
        self.visible.unwrap_or(!self.base)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "title")]
    pub name: String,
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

impl AnnotationSpec {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// A number (uniform) or `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleSetting {
    Uniform(f64),
    PerAxis([f64; 3]),
}

impl ScaleSetting {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            ScaleSetting::Uniform(s) => Vec3::new(s, s, s),
            ScaleSetting::PerAxis(a) => Vec3::from_array(a),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    #[serde(alias = "path")]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub model_type: Option<String>,
    pub use_draco: bool,
    pub draco_decoder_path: Option<String>,
    pub scale: Option<ScaleSetting>,
    /// Degrees about X, Y then Z.
    pub rotation: Option<[f64; 3]>,
    pub position: Option<[f64; 3]>,
    pub auto_rotate: bool,
    pub background_color: Option<String>,
}

impl ModelSettings {
    pub fn has_model(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// The declared `type`, else the URL extension. `None` when neither
    /// names a supported format.
    pub fn format(&self) -> Option<ModelFormat> {
        match self.model_type.as_deref() {
            Some(t) if !t.trim().is_empty() => ModelFormat::from_type_str(t),
            _ => self.url.as_deref().and_then(ModelFormat::from_url),
        }
    }

    pub fn scale_vec(&self) -> Vec3 {
        self.scale
            .map(ScaleSetting::to_vec3)
            .unwrap_or(Vec3::new(1.0, 1.0, 1.0))
    }

    pub fn rotation_rad(&self) -> Vec3 {
        let [x, y, z] = self.rotation.unwrap_or([0.0; 3]);
        Vec3::new(x.to_radians(), y.to_radians(), z.to_radians())
    }

    pub fn position_vec(&self) -> Vec3 {
        self.position.map(Vec3::from_array).unwrap_or(Vec3::ZERO)
    }
}

/// Which fallback tier produced a project's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    Json,
    Html,
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Folder name.
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    pub location: Option<String>,
    pub thumbnail: Option<String>,
    pub center: Option<LatLon>,
    pub zoom: Option<f64>,
    pub model: Option<ModelSettings>,
    pub layers: Vec<LayerSpec>,
    pub annotations: Vec<AnnotationSpec>,
    pub source: MetadataSource,
}

impl Project {
    /// Only an id and a title; every tier starts from this.
    pub fn derived(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: titleize(id),
            description: String::new(),
            date: None,
            location: None,
            thumbnail: None,
            center: None,
            zoom: None,
            model: None,
            layers: Vec::new(),
            annotations: Vec::new(),
            source: MetadataSource::Derived,
        }
    }

    /// Builds a project from `metadata.json`. Relative URLs (thumbnail,
    /// model, layers) are resolved against `metadata_path` so callers get
    /// site-relative paths.
    pub fn from_metadata(id: &str, metadata_path: &str, meta: ProjectMetadata) -> Self {
        let mut project = Self::derived(id);
        project.source = MetadataSource::Json;

        if let Some(title) = non_blank(meta.title) {
            project.title = title;
        }
        project.description = non_blank(meta.description).unwrap_or_default();
        project.date = non_blank(meta.date);
        project.location = non_blank(meta.location);
        project.thumbnail = non_blank(meta.thumbnail).map(|t| resolve_relative(metadata_path, &t));

        if let Some(map) = meta.map_settings {
            project.center = map
                .center
                .map(|[lat, lon]| LatLon::new(lat, lon))
                .filter(LatLon::is_valid);
            project.zoom = map.zoom;
            project.layers = map
                .layers
                .into_iter()
                .map(|mut layer| {
                    layer.url = resolve_relative(metadata_path, &layer.url);
                    layer
                })
                .collect();
            project.annotations = map.annotations;
        }

        project.model = meta.model_settings.map(|mut model| {
            model.url = non_blank(model.url).map(|u| resolve_relative(metadata_path, &u));
            model
        });

        project
    }

    pub fn has_model(&self) -> bool {
        self.model.as_ref().is_some_and(ModelSettings::has_model)
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Human title from a folder name: `-`, `_` and whitespace separate words,
/// and each word gets an upper-case first letter.
pub fn titleize(folder: &str) -> String {
    let words: Vec<String> = folder
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        folder.to_string()
    } else {
        words.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataError {
    Fetch(FetchError),
    Json(String),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Fetch(err) => write!(f, "{err}"),
            MetadataError::Json(msg) => write!(f, "invalid metadata.json: {msg}"),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<FetchError> for MetadataError {
    fn from(err: FetchError) -> Self {
        MetadataError::Fetch(err)
    }
}

pub fn parse_metadata(raw: &str) -> Result<ProjectMetadata, MetadataError> {
    serde_json::from_str(raw).map_err(|e| MetadataError::Json(e.to_string()))
}
