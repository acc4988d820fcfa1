use catalog::discovery::load_metadata;
use catalog::{
    LayerSource, MetadataSource, Project, SiteConfig, discover_projects, load_project,
    navigation_target,
};
use foundation::math::LatLon;
use fetch::Fetch;
use futures_util::future::join_all;
use scene::{LoadError, ModelRequest, NoDraco, load_model};
use serde::Serialize;

/// One row of `survey list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub source: &'static str,
    pub target: String,
    pub has_model: bool,
    pub layers: usize,
    pub annotations: usize,
}

pub fn source_name(source: MetadataSource) -> &'static str {
    match source {
        MetadataSource::Json => "metadata.json",
        MetadataSource::Html => "index.html",
        MetadataSource::Derived => "folder name",
    }
}

pub async fn list_projects<F: Fetch>(fetch: &F, config: &SiteConfig) -> Vec<ProjectSummary> {
    let projects = discover_projects(fetch, config).await;
    join_all(projects.iter().map(|project| async move {
        ProjectSummary {
            id: project.id.clone(),
            title: project.title.clone(),
            source: source_name(project.source),
            target: navigation_target(fetch, config, &project.id).await,
            has_model: project.has_model(),
            layers: project.layers.len(),
            annotations: project.annotations.len(),
        }
    }))
    .await
}

#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    /// `metadata.json` was missing or unreadable.
    MetadataFallback(MetadataSource),
    MissingThumbnail(String),
    UnsupportedModel(String),
    MissingModel(String),
    MissingLayer { id: String, url: String },
    /// `mapSettings.center` is out of range; the viewer ignores it.
    InvalidCenter([f64; 2]),
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Problem::MetadataFallback(source) => {
                write!(f, "no usable metadata.json, title taken from {}", source_name(*source))
            }
            Problem::MissingThumbnail(url) => write!(f, "thumbnail not found: {url}"),
            Problem::UnsupportedModel(url) => write!(f, "model type not supported: {url}"),
            Problem::MissingModel(url) => write!(f, "model not found: {url}"),
            Problem::MissingLayer { id, url } => write!(f, "layer {id}: {url} not found"),
            Problem::InvalidCenter([lat, lon]) => {
                write!(f, "map center [{lat}, {lon}] is not a valid coordinate")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectReport {
    pub id: String,
    pub problems: Vec<Problem>,
}

/// Checks every file a discovered project refers to.
pub async fn check_site<F: Fetch>(fetch: &F, config: &SiteConfig) -> Vec<ProjectReport> {
    let projects = discover_projects(fetch, config).await;
    join_all(projects.iter().map(|p| check_project(fetch, config, p))).await
}

pub async fn check_project<F: Fetch>(
    fetch: &F,
    config: &SiteConfig,
    project: &Project,
) -> ProjectReport {
    let mut problems = Vec::new();
    if project.source != MetadataSource::Json {
        problems.push(Problem::MetadataFallback(project.source));
    } else if let Ok(meta) = load_metadata(fetch, config, &project.id).await {
        // `Project` drops bad centers, so look at what the file says.
        let raw_center = meta.map_settings.and_then(|map| map.center);
        if let Some([lat, lon]) = raw_center {
            if !LatLon::new(lat, lon).is_valid() {
                problems.push(Problem::InvalidCenter([lat, lon]));
            }
        }
    }
    if let Some(thumb) = &project.thumbnail {
        if !fetch.exists(thumb).await {
            problems.push(Problem::MissingThumbnail(thumb.clone()));
        }
    }
    if let Some(request) = project.model.as_ref().and_then(ModelRequest::from_settings) {
        if request.format.is_none() {
            problems.push(Problem::UnsupportedModel(request.url));
        } else if !fetch.exists(&request.url).await {
            problems.push(Problem::MissingModel(request.url));
        }
    }
    // Tile layers are URL templates; only standalone files can be probed.
    for layer in project
        .layers
        .iter()
        .filter(|l| l.source == LayerSource::GeoJson)
    {
        if !fetch.exists(&layer.url).await {
            problems.push(Problem::MissingLayer {
                id: layer.id.clone(),
                url: layer.url.clone(),
            });
        }
    }
    ProjectReport {
        id: project.id.clone(),
        problems,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub url: String,
    pub format: String,
    pub vertices: usize,
    pub triangles: usize,
    /// Extent before placement.
    pub size: [f64; 3],
}

#[derive(Debug)]
pub enum ToolError {
    NoModel(String),
    Load(LoadError),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::NoModel(id) => write!(f, "project {id} has no model"),
            ToolError::Load(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<LoadError> for ToolError {
    fn from(err: LoadError) -> Self {
        ToolError::Load(err)
    }
}

/// Loads a project's model the way the viewer would, without a Draco
/// decoder.
pub async fn inspect_model<F: Fetch>(
    fetch: &F,
    config: &SiteConfig,
    project_id: &str,
) -> Result<ModelSummary, ToolError> {
    let project = load_project(fetch, config, project_id).await;
    let request = project
        .model
        .as_ref()
        .and_then(ModelRequest::from_settings)
        .ok_or_else(|| ToolError::NoModel(project_id.to_string()))?;

    let mesh = load_model(fetch, &NoDraco, &request, &mut |loaded, total| {
        tracing::debug!(loaded, ?total, "downloading model");
    })
    .await?;
    let size = mesh.bounds().size();
    Ok(ModelSummary {
        url: request.url.clone(),
        format: request
            .format
            .map(|f| f.as_str().to_string())
            .unwrap_or_default(),
        vertices: mesh.vertex_count(),
        triangles: mesh.triangle_count(),
        size: size.to_array(),
    })
}

#[cfg(test)]
mod tests {
    use super::{Problem, ToolError, check_site, inspect_model, list_projects};
    use catalog::{MetadataSource, SiteConfig};
    use fetch::MemoryFetch;
    use pollster::block_on;

    const METADATA: &str = r#"{
        "title": "Orchard",
        "thumbnail": "thumb.jpg",
        "mapSettings": {
            "center": [45.0, 7.0],
            "layers": [
                {"id": "ortho", "type": "tile", "url": "tiles/{z}/{x}/{y}.png"},
                {"id": "rows", "type": "geojson", "url": "rows.geojson"}
            ]
        },
        "modelSettings": {"url": "model.obj"}
    }"#;

    fn site() -> (MemoryFetch, SiteConfig) {
        let config = SiteConfig {
            candidates: vec!["orchard".to_string(), "barn".to_string(), "empty".to_string()],
            ..SiteConfig::default()
        };
        let fetch = MemoryFetch::new()
            .with_file("projects/orchard/metadata.json", METADATA)
            .with_file("projects/orchard/thumb.jpg", "jpg")
            .with_file(
                "projects/orchard/model.obj",
                "v 0 0 0\nv 2 0 0\nv 0 3 0\nf 1 2 3\n",
            )
            .with_file("projects/barn/index.html", "<title>Barn Roof</title>");
        (fetch, config)
    }

    #[test]
    fn check_reports_out_of_range_center() {
        let config = SiteConfig {
            candidates: vec!["pier".to_string()],
            ..SiteConfig::default()
        };
        let fetch = MemoryFetch::new().with_file(
            "projects/pier/metadata.json",
            r#"{"title": "Pier", "mapSettings": {"center": [120.0, 7.0]}}"#,
        );
        let reports = block_on(check_site(&fetch, &config));
        assert_eq!(reports[0].problems, vec![Problem::InvalidCenter([120.0, 7.0])]);
    }

    #[test]
    fn lists_discovered_projects() {
        let (fetch, config) = site();
        let rows = block_on(list_projects(&fetch, &config));
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["orchard", "barn"]);

        assert_eq!(rows[0].source, "metadata.json");
        assert!(rows[0].has_model);
        assert_eq!(rows[0].layers, 2);
        assert_eq!(rows[0].target, "viewer.html?project=orchard");

        assert_eq!(rows[1].title, "Barn Roof");
        assert_eq!(rows[1].target, "projects/barn/index.html");
    }

    #[test]
    fn check_reports_missing_files() {
        let (fetch, config) = site();
        let reports = block_on(check_site(&fetch, &config));
        assert_eq!(
            reports[0].problems,
            vec![Problem::MissingLayer {
                id: "rows".to_string(),
                url: "projects/orchard/rows.geojson".to_string(),
            }]
        );
        assert_eq!(
            reports[1].problems,
            vec![Problem::MetadataFallback(MetadataSource::Html)]
        );
    }

    #[test]
    fn inspects_models() {
        let (fetch, config) = site();
        let summary = block_on(inspect_model(&fetch, &config, "orchard")).expect("model loads");
        assert_eq!(summary.format, "obj");
        assert_eq!(summary.triangles, 1);
        assert_eq!(summary.size, [2.0, 3.0, 0.0]);

        let none = block_on(inspect_model(&fetch, &config, "barn"));
        assert!(matches!(none, Err(ToolError::NoModel(id)) if id == "barn"));
    }
}
