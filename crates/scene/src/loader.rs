use std::future::Future;

use fetch::{Fetch, FetchError, ProgressFn, resolve_relative};
use formats::{
    DecodedPrimitives, DracoPrimitive, GltfDocument, GltfError, Mesh, ModelFormat, ObjError,
    parse_obj,
};

use crate::model_viewer::ModelRequest;

/// Decodes Draco-compressed glTF primitives. The browser build wraps the
/// JavaScript decoder named by `dracoDecoderPath`.
pub trait DracoDecoder {
    fn decode(&self, primitive: &DracoPrimitive) -> impl Future<Output = Result<Mesh, String>>;
}

/// Used when `useDraco` is off: compressed primitives fail to load.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDraco;

impl DracoDecoder for NoDraco {
    async fn decode(&self, _primitive: &DracoPrimitive) -> Result<Mesh, String> {
        Err("no Draco decoder configured (set useDraco)".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Fetch(FetchError),
    /// Neither the declared type nor the URL extension is a known format.
    UnsupportedFormat(String),
    Obj(ObjError),
    Gltf(GltfError),
    Draco {
        mesh: usize,
        primitive: usize,
        message: String,
    },
    /// The file parsed but holds no triangles.
    Empty,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Fetch(err) => write!(f, "download failed: {err}"),
            LoadError::UnsupportedFormat(what) => write!(f, "unsupported model type: {what}"),
            LoadError::Obj(err) => write!(f, "invalid OBJ: {err}"),
            LoadError::Gltf(err) => write!(f, "invalid glTF: {err}"),
            LoadError::Draco {
                mesh,
                primitive,
                message,
            } => write!(f, "Draco decode failed for mesh {mesh} primitive {primitive}: {message}"),
            LoadError::Empty => write!(f, "model contains no geometry"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<FetchError> for LoadError {
    fn from(err: FetchError) -> Self {
        LoadError::Fetch(err)
    }
}

impl From<ObjError> for LoadError {
    fn from(err: ObjError) -> Self {
        LoadError::Obj(err)
    }
}

impl From<GltfError> for LoadError {
    fn from(err: GltfError) -> Self {
        LoadError::Gltf(err)
    }
}

/// Downloads and parses the model named by `request` into one mesh in model
/// space. Progress covers the main file only; external glTF buffers are
/// fetched afterwards, relative to the model URL.
pub async fn load_model<F: Fetch, D: DracoDecoder>(
    fetch: &F,
    draco: &D,
    request: &ModelRequest,
    on_progress: &mut ProgressFn<'_>,
) -> Result<Mesh, LoadError> {
    let format = request
        .format
        .ok_or_else(|| LoadError::UnsupportedFormat(request.url.clone()))?;
    let bytes = fetch.get_bytes_with_progress(&request.url, on_progress).await?;

    let mesh = match format {
        ModelFormat::Obj => {
            let text = String::from_utf8_lossy(&bytes);
            parse_obj(&text)?
        }
        ModelFormat::Glb | ModelFormat::Gltf => {
            let mut doc = GltfDocument::parse(&bytes)?;
            load_gltf_buffers(fetch, &request.url, &mut doc).await?;
            let decoded = decode_draco(draco, &doc).await?;
            doc.to_mesh(&decoded)?
        }
    };

    if mesh.is_empty() {
        return Err(LoadError::Empty);
    }
    tracing::info!(
        url = request.url.as_str(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "model loaded"
    );
    Ok(mesh)
}

async fn load_gltf_buffers<F: Fetch>(
    fetch: &F,
    model_url: &str,
    doc: &mut GltfDocument,
) -> Result<(), LoadError> {
    for (index, uri) in doc.pending_buffers() {
        let path = resolve_relative(model_url, &uri);
        tracing::debug!(buffer = index, path = path.as_str(), "fetching glTF buffer");
        let data = fetch.get_bytes(&path).await?;
        doc.set_buffer(index, data)?;
    }
    Ok(())
}

async fn decode_draco<D: DracoDecoder>(
    draco: &D,
    doc: &GltfDocument,
) -> Result<DecodedPrimitives, LoadError> {
    let mut decoded = DecodedPrimitives::new();
    if !doc.uses_draco() {
        return Ok(decoded);
    }
    for primitive in doc.draco_primitives()? {
        let mesh = draco
            .decode(&primitive)
            .await
            .map_err(|message| LoadError::Draco {
                mesh: primitive.mesh,
                primitive: primitive.primitive,
                message,
            })?;
        decoded.insert((primitive.mesh, primitive.primitive), mesh);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::{DracoDecoder, LoadError, NoDraco, load_model};
    use crate::model_viewer::ModelRequest;
    use fetch::MemoryFetch;
    use fetch::memory::Method;
    use formats::{DracoPrimitive, Mesh, ModelFormat};
    use pollster::block_on;

    const TETRA_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 3 2\nf 1 2 4\nf 1 4 3\nf 2 3 4\n";

    const TRIANGLE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "buffers": [{"uri": "bin/tri.bin", "byteLength": 36}],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}]
    }"#;

    const DRACO_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "extensionsUsed": ["KHR_draco_mesh_compression"],
        "extensionsRequired": ["KHR_draco_mesh_compression"],
        "buffers": [{"uri": "m.bin", "byteLength": 16}],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 16}],
        "meshes": [{"primitives": [{
            "attributes": {},
            "extensions": {"KHR_draco_mesh_compression": {
                "bufferView": 0, "attributes": {"POSITION": 0}
            }}
        }]}]
    }"#;

    fn triangle_bin() -> Vec<u8> {
        [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .iter()
            .flatten()
            .flat_map(|c| c.to_le_bytes())
            .collect()
    }

    fn request(url: &str) -> ModelRequest {
        ModelRequest::new(url, ModelFormat::from_url(url))
    }

    #[test]
    fn loads_obj_with_progress() {
        let fetch = MemoryFetch::new().with_file("projects/a/model.obj", TETRA_OBJ);
        let mut seen = Vec::new();
        let mesh = block_on(load_model(
            &fetch,
            &NoDraco,
            &request("projects/a/model.obj"),
            &mut |loaded, total| seen.push((loaded, total)),
        ))
        .expect("obj loads");
        assert_eq!(mesh.triangle_count(), 4);
        let len = TETRA_OBJ.len() as u64;
        assert_eq!(seen.last(), Some(&(len, Some(len))));
    }

    #[test]
    fn gltf_buffers_resolve_against_model_url() {
        let fetch = MemoryFetch::new()
            .with_file("projects/a/models/tri.gltf", TRIANGLE_GLTF)
            .with_file("projects/a/models/bin/tri.bin", triangle_bin());
        let mesh = block_on(load_model(
            &fetch,
            &NoDraco,
            &request("projects/a/models/tri.gltf"),
            &mut |_, _| {},
        ))
        .expect("gltf loads");
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(
            fetch.request_count(Method::Get, "projects/a/models/bin/tri.bin"),
            1
        );
    }

    #[test]
    fn errors_are_reported() {
        let fetch = MemoryFetch::new().with_file("empty.obj", "# nothing\n");

        let missing = block_on(load_model(&fetch, &NoDraco, &request("gone.glb"), &mut |_, _| {}));
        assert!(matches!(missing, Err(LoadError::Fetch(ref e)) if e.is_not_found()));

        let empty = block_on(load_model(&fetch, &NoDraco, &request("empty.obj"), &mut |_, _| {}));
        assert_eq!(empty, Err(LoadError::Empty));

        let unknown = block_on(load_model(&fetch, &NoDraco, &request("scan.ply"), &mut |_, _| {}));
        assert_eq!(
            unknown,
            Err(LoadError::UnsupportedFormat("scan.ply".to_string()))
        );
        // Nothing is downloaded for an unknown format.
        assert_eq!(fetch.request_count(Method::Get, "scan.ply"), 0);
    }

    struct CubeDecoder;

    impl DracoDecoder for CubeDecoder {
        async fn decode(&self, primitive: &DracoPrimitive) -> Result<Mesh, String> {
            assert_eq!(primitive.attributes.get("POSITION"), Some(&0));
            assert_eq!(primitive.data.len(), 16);
            Ok(Mesh::cube(1.0))
        }
    }

    #[test]
    fn draco_primitives_go_through_decoder() {
        let fetch = MemoryFetch::new()
            .with_file("m.gltf", DRACO_GLTF)
            .with_file("m.bin", vec![0u8; 16]);

        let mesh = block_on(load_model(&fetch, &CubeDecoder, &request("m.gltf"), &mut |_, _| {}))
            .expect("decoded");
        assert_eq!(mesh.triangle_count(), 12);

        let err = block_on(load_model(&fetch, &NoDraco, &request("m.gltf"), &mut |_, _| {}));
        assert!(matches!(
            err,
            Err(LoadError::Draco {
                mesh: 0,
                primitive: 0,
                ..
            })
        ));
    }
}
