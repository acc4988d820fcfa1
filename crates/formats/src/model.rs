use fetch::url::extension;

/// Model container formats the viewer can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Glb,
    Gltf,
    Obj,
}

impl ModelFormat {
    /// Parses a `modelSettings.type` value; case-insensitive, leading `.` allowed.
    pub fn from_type_str(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "glb" => Some(ModelFormat::Glb),
            "gltf" => Some(ModelFormat::Gltf),
            "obj" => Some(ModelFormat::Obj),
            _ => None,
        }
    }

    /// Infers the format from a URL's file extension (query string ignored).
    pub fn from_url(url: &str) -> Option<Self> {
        extension(url).and_then(|ext| Self::from_type_str(&ext))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFormat::Glb => "glb",
            ModelFormat::Gltf => "gltf",
            ModelFormat::Obj => "obj",
        }
    }
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
