//! glTF 2.0 geometry reader for `.gltf` (JSON) and `.glb` (binary container).
//!
//! Only what a viewer needs to draw a single lit mesh is read: triangle
//! primitives, float positions/normals, integer indices and the node
//! hierarchy. Materials, textures, skins and animations are ignored.
//!
//! Reading is split in two so callers can do I/O in between:
//! 1. [`GltfDocument::parse`] decodes the container and any embedded buffers.
//! 2. The caller fills in [`GltfDocument::pending_buffers`] (external `.bin`
//!    files) and decodes [`GltfDocument::draco_primitives`], then calls
//!    [`GltfDocument::to_mesh`].

use std::collections::BTreeMap;

use base64::Engine as _;
use foundation::math::{
    MAT4_IDENTITY, Mat4, Vec3, mat4_from_quat, mat4_mul, mat4_scale, mat4_translation,
};
use serde::Deserialize;

use crate::mesh::Mesh;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_HEADER_LEN: usize = 12;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_U8: u32 = 5121;
const COMPONENT_U16: u32 = 5123;
const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;

const MODE_TRIANGLES: u32 = 4;

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

const MAX_NODE_DEPTH: usize = 64;

/// Accessors without a bufferView are zero-filled; larger counts are refused.
const MAX_UNBACKED_ELEMENTS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
pub enum GltfError {
    NotGltf,
    UnsupportedVersion(u32),
    Truncated(&'static str),
    Json(String),
    RequiredExtension(String),
    MissingIndex { kind: &'static str, index: usize },
    UnresolvedBuffer { index: usize, uri: String },
    InvalidDataUri(String),
    UnsupportedAccessor { index: usize, reason: String },
    AccessorOutOfBounds(usize),
    DracoNotDecoded { mesh: usize, primitive: usize },
    NodeDepthExceeded,
    NoGeometry,
}

impl std::fmt::Display for GltfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GltfError::NotGltf => write!(f, "not a glTF document"),
            GltfError::UnsupportedVersion(v) => write!(f, "unsupported GLB version {v}"),
            GltfError::Truncated(what) => write!(f, "truncated GLB: {what}"),
            GltfError::Json(msg) => write!(f, "glTF JSON error: {msg}"),
            GltfError::RequiredExtension(ext) => write!(f, "required extension {ext} is not supported"),
            GltfError::MissingIndex { kind, index } => write!(f, "{kind} {index} does not exist"),
            GltfError::UnresolvedBuffer { index, uri } => {
                write!(f, "buffer {index} ({uri}) has not been loaded")
            }
            GltfError::InvalidDataUri(msg) => write!(f, "invalid data URI: {msg}"),
            GltfError::UnsupportedAccessor { index, reason } => {
                write!(f, "accessor {index}: {reason}")
            }
            GltfError::AccessorOutOfBounds(index) => {
                write!(f, "accessor {index} reads past the end of its buffer view")
            }
            GltfError::DracoNotDecoded { mesh, primitive } => {
                write!(f, "mesh {mesh} primitive {primitive} is Draco-compressed and was not decoded")
            }
            GltfError::NodeDepthExceeded => write!(f, "node hierarchy is too deep or cyclic"),
            GltfError::NoGeometry => write!(f, "document contains no triangle geometry"),
        }
    }
}

impl std::error::Error for GltfError {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Root {
    #[serde(default)]
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<SceneDef>,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    meshes: Vec<MeshDef>,
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(default)]
    buffer_views: Vec<BufferView>,
    #[serde(default)]
    buffers: Vec<Buffer>,
    #[serde(default)]
    extensions_required: Vec<String>,
    #[serde(default)]
    extensions_used: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SceneDef {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Node {
    #[serde(default)]
    children: Vec<usize>,
    mesh: Option<usize>,
    matrix: Option<[f64; 16]>,
    translation: Option<[f64; 3]>,
    rotation: Option<[f64; 4]>,
    scale: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MeshDef {
    #[serde(default)]
    primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Primitive {
    #[serde(default)]
    attributes: BTreeMap<String, usize>,
    indices: Option<usize>,
    mode: Option<u32>,
    #[serde(default)]
    extensions: PrimitiveExtensions,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PrimitiveExtensions {
    #[serde(rename = "KHR_draco_mesh_compression")]
    draco: Option<DracoExtension>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DracoExtension {
    buffer_view: usize,
    #[serde(default)]
    attributes: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: Option<usize>,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sparse: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Buffer {
    uri: Option<String>,
    #[allow(dead_code)]
    byte_length: usize,
}

/// A Draco-compressed primitive waiting for a decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DracoPrimitive {
    pub mesh: usize,
    pub primitive: usize,
    pub data: Vec<u8>,
    /// glTF attribute name to Draco attribute id.
    pub attributes: BTreeMap<String, u32>,
}

/// Decoded Draco geometry keyed by `(mesh, primitive)`.
pub type DecodedPrimitives = BTreeMap<(usize, usize), Mesh>;

#[derive(Debug, Clone)]
pub struct GltfDocument {
    root: Root,
    buffers: Vec<Option<Vec<u8>>>,
}

impl GltfDocument {
    /// Accepts either container; GLB is recognized by its magic.
    pub fn parse(bytes: &[u8]) -> Result<Self, GltfError> {
        if is_glb(bytes) {
            Self::from_glb(bytes)
        } else {
            Self::from_json(bytes, None)
        }
    }

    pub fn from_glb(bytes: &[u8]) -> Result<Self, GltfError> {
        if !is_glb(bytes) {
            return Err(GltfError::NotGltf);
        }
        if bytes.len() < GLB_HEADER_LEN {
            return Err(GltfError::Truncated("header"));
        }
        let version = read_u32(bytes, 4);
        if version != 2 {
            return Err(GltfError::UnsupportedVersion(version));
        }
        let total = (read_u32(bytes, 8) as usize).min(bytes.len());

        let mut json: Option<&[u8]> = None;
        let mut bin: Option<&[u8]> = None;
        let mut offset = GLB_HEADER_LEN;
        while total.saturating_sub(offset) >= 8 {
            let chunk_len = read_u32(bytes, offset) as usize;
            let chunk_type = read_u32(bytes, offset + 4);
            let start = offset + 8;
            let end = start
                .checked_add(chunk_len)
                .ok_or(GltfError::Truncated("chunk"))?;
            let data = bytes.get(start..end).ok_or(GltfError::Truncated("chunk"))?;
            match chunk_type {
                CHUNK_JSON if json.is_none() => json = Some(data),
                CHUNK_BIN if bin.is_none() => bin = Some(data),
                // Unknown chunks must be skipped.
                _ => {}
            }
            offset = end;
        }

        let json = json.ok_or(GltfError::Truncated("missing JSON chunk"))?;
        Self::from_json(json, bin.map(<[u8]>::to_vec))
    }

    fn from_json(json: &[u8], glb_bin: Option<Vec<u8>>) -> Result<Self, GltfError> {
        let root: Root = serde_json::from_slice(json).map_err(|e| GltfError::Json(e.to_string()))?;

        if let Some(ext) = root
            .extensions_required
            .iter()
            .find(|ext| ext.as_str() != DRACO_EXTENSION)
        {
            return Err(GltfError::RequiredExtension(ext.clone()));
        }

        let mut glb_bin = glb_bin;
        let mut buffers = Vec::with_capacity(root.buffers.len());
        for (index, buffer) in root.buffers.iter().enumerate() {
            let data = match buffer.uri.as_deref() {
                // Only the first buffer may refer to the GLB binary chunk.
                None if index == 0 => glb_bin.take(),
                None => None,
                Some(uri) if uri.starts_with("data:") => Some(decode_data_uri(uri)?),
                Some(_) => None,
            };
            buffers.push(data);
        }

        Ok(Self { root, buffers })
    }

    /// External buffers still to be fetched: `(buffer index, uri)`.
    pub fn pending_buffers(&self) -> Vec<(usize, String)> {
        self.root
            .buffers
            .iter()
            .enumerate()
            .filter(|(i, _)| self.buffers[*i].is_none())
            .filter_map(|(i, b)| b.uri.clone().map(|uri| (i, uri)))
            .collect()
    }

    pub fn set_buffer(&mut self, index: usize, data: Vec<u8>) -> Result<(), GltfError> {
        let slot = self.buffers.get_mut(index).ok_or(GltfError::MissingIndex {
            kind: "buffer",
            index,
        })?;
        *slot = Some(data);
        Ok(())
    }

    pub fn uses_draco(&self) -> bool {
        self.root.extensions_used.iter().any(|e| e == DRACO_EXTENSION)
            || self
                .root
                .meshes
                .iter()
                .flat_map(|m| &m.primitives)
                .any(|p| p.extensions.draco.is_some())
    }

    /// Compressed payloads for every Draco primitive. Buffers must be loaded.
    pub fn draco_primitives(&self) -> Result<Vec<DracoPrimitive>, GltfError> {
        let mut out = Vec::new();
        for (mesh_index, mesh) in self.root.meshes.iter().enumerate() {
            for (prim_index, prim) in mesh.primitives.iter().enumerate() {
                let Some(draco) = &prim.extensions.draco else {
                    continue;
                };
                let (bytes, _) = self.view_bytes(draco.buffer_view)?;
                out.push(DracoPrimitive {
                    mesh: mesh_index,
                    primitive: prim_index,
                    data: bytes.to_vec(),
                    attributes: draco.attributes.clone(),
                });
            }
        }
        Ok(out)
    }

    /// Flattens the default scene into one mesh in model space.
    pub fn to_mesh(&self, decoded: &DecodedPrimitives) -> Result<Mesh, GltfError> {
        let mut out = Mesh::new();

        if self.root.nodes.is_empty() {
            // Node-less documents: draw every mesh untransformed.
            for mesh_index in 0..self.root.meshes.len() {
                self.append_mesh(mesh_index, &MAT4_IDENTITY, decoded, &mut out)?;
            }
        } else {
            for root in self.root_nodes() {
                self.visit_node(root, MAT4_IDENTITY, 0, decoded, &mut out)?;
            }
        }

        if out.is_empty() {
            return Err(GltfError::NoGeometry);
        }
        Ok(out)
    }

    fn root_nodes(&self) -> Vec<usize> {
        let scene_index = self.root.scene.unwrap_or(0);
        if let Some(scene) = self.root.scenes.get(scene_index) {
            return scene.nodes.clone();
        }
        // No scenes: every node that is nobody's child is a root.
        let mut is_child = vec![false; self.root.nodes.len()];
        for node in &self.root.nodes {
            for &c in &node.children {
                if let Some(flag) = is_child.get_mut(c) {
                    *flag = true;
                }
            }
        }
        (0..self.root.nodes.len()).filter(|&i| !is_child[i]).collect()
    }

    fn visit_node(
        &self,
        index: usize,
        parent: Mat4,
        depth: usize,
        decoded: &DecodedPrimitives,
        out: &mut Mesh,
    ) -> Result<(), GltfError> {
        if depth > MAX_NODE_DEPTH {
            return Err(GltfError::NodeDepthExceeded);
        }
        let node = self.root.nodes.get(index).ok_or(GltfError::MissingIndex {
            kind: "node",
            index,
        })?;
        let world = mat4_mul(parent, node_matrix(node));
        if let Some(mesh_index) = node.mesh {
            self.append_mesh(mesh_index, &world, decoded, out)?;
        }
        for &child in &node.children {
            self.visit_node(child, world, depth + 1, decoded, out)?;
        }
        Ok(())
    }

    fn append_mesh(
        &self,
        mesh_index: usize,
        transform: &Mat4,
        decoded: &DecodedPrimitives,
        out: &mut Mesh,
    ) -> Result<(), GltfError> {
        let mesh = self.root.meshes.get(mesh_index).ok_or(GltfError::MissingIndex {
            kind: "mesh",
            index: mesh_index,
        })?;

        for (prim_index, prim) in mesh.primitives.iter().enumerate() {
            let mode = prim.mode.unwrap_or(MODE_TRIANGLES);
            if mode != MODE_TRIANGLES {
                tracing::debug!(mesh = mesh_index, primitive = prim_index, mode, "skipping non-triangle primitive");
                continue;
            }

            let mut part = if prim.extensions.draco.is_some() {
                decoded
                    .get(&(mesh_index, prim_index))
                    .cloned()
                    .ok_or(GltfError::DracoNotDecoded {
                        mesh: mesh_index,
                        primitive: prim_index,
                    })?
            } else {
                self.read_primitive(prim)?
            };

            if part.normals.len() != part.positions.len() {
                part.compute_normals();
            }
            part.transform(transform);
            out.append(part);
        }
        Ok(())
    }

    fn read_primitive(&self, prim: &Primitive) -> Result<Mesh, GltfError> {
        let Some(&position) = prim.attributes.get("POSITION") else {
            return Ok(Mesh::new());
        };
        let positions = self.read_vec3(position)?;
        let normals = match prim.attributes.get("NORMAL") {
            Some(&n) => self.read_vec3(n)?,
            None => Vec::new(),
        };
        let indices = match prim.indices {
            Some(i) => self.read_indices(i)?,
            None => (0..positions.len() as u32).collect(),
        };

        let mesh = Mesh {
            positions,
            normals,
            indices,
        };
        if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= mesh.positions.len()) {
            return Err(GltfError::UnsupportedAccessor {
                index: prim.indices.unwrap_or(position),
                reason: format!("index {bad} out of range"),
            });
        }
        Ok(mesh)
    }

    fn accessor(&self, index: usize) -> Result<&Accessor, GltfError> {
        let acc = self.root.accessors.get(index).ok_or(GltfError::MissingIndex {
            kind: "accessor",
            index,
        })?;
        if acc.buffer_view.is_none() && acc.count > MAX_UNBACKED_ELEMENTS {
            return Err(GltfError::UnsupportedAccessor {
                index,
                reason: format!("{} zero-filled elements is too many", acc.count),
            });
        }
        if acc.sparse.is_some() {
            return Err(GltfError::UnsupportedAccessor {
                index,
                reason: "sparse accessors are not supported".to_string(),
            });
        }
        Ok(acc)
    }

    fn buffer_data(&self, index: usize) -> Result<&[u8], GltfError> {
        match self.buffers.get(index) {
            Some(Some(data)) => Ok(data),
            Some(None) => Err(GltfError::UnresolvedBuffer {
                index,
                uri: self.root.buffers[index].uri.clone().unwrap_or_default(),
            }),
            None => Err(GltfError::MissingIndex {
                kind: "buffer",
                index,
            }),
        }
    }

    fn view_bytes(&self, index: usize) -> Result<(&[u8], Option<usize>), GltfError> {
        let view = self.root.buffer_views.get(index).ok_or(GltfError::MissingIndex {
            kind: "bufferView",
            index,
        })?;
        let buffer = self.buffer_data(view.buffer)?;
        let bytes = view
            .byte_offset
            .checked_add(view.byte_length)
            .and_then(|end| buffer.get(view.byte_offset..end))
            .ok_or(GltfError::Truncated("bufferView past end of buffer"))?;
        Ok((bytes, view.byte_stride))
    }

    /// Element byte ranges for an accessor; `None` bytes means all zeros.
    fn element_layout(
        &self,
        index: usize,
        element_size: usize,
    ) -> Result<Option<(&[u8], usize, usize)>, GltfError> {
        let acc = self.accessor(index)?;
        let Some(view_index) = acc.buffer_view else {
            return Ok(None);
        };
        let (bytes, stride) = self.view_bytes(view_index)?;
        let stride = stride.unwrap_or(element_size).max(element_size);
        if acc.count > 0 {
            let end = (acc.count - 1)
                .checked_mul(stride)
                .and_then(|span| span.checked_add(acc.byte_offset))
                .and_then(|span| span.checked_add(element_size));
            if end.is_none_or(|end| end > bytes.len()) {
                return Err(GltfError::AccessorOutOfBounds(index));
            }
        }
        Ok(Some((bytes, acc.byte_offset, stride)))
    }

    fn read_vec3(&self, index: usize) -> Result<Vec<[f32; 3]>, GltfError> {
        let acc = self.accessor(index)?;
        if acc.kind != "VEC3" || acc.component_type != COMPONENT_F32 {
            return Err(GltfError::UnsupportedAccessor {
                index,
                reason: format!("expected float VEC3, got {} ({})", acc.kind, acc.component_type),
            });
        }
        let Some((bytes, offset, stride)) = self.element_layout(index, 12)? else {
            return Ok(vec![[0.0; 3]; acc.count]);
        };
        Ok((0..acc.count)
            .map(|i| {
                let at = offset + i * stride;
                [
                    read_f32(bytes, at),
                    read_f32(bytes, at + 4),
                    read_f32(bytes, at + 8),
                ]
            })
            .collect())
    }

    fn read_indices(&self, index: usize) -> Result<Vec<u32>, GltfError> {
        let acc = self.accessor(index)?;
        if acc.kind != "SCALAR" {
            return Err(GltfError::UnsupportedAccessor {
                index,
                reason: format!("indices must be SCALAR, got {}", acc.kind),
            });
        }
        let size = match acc.component_type {
            COMPONENT_U8 => 1,
            COMPONENT_U16 => 2,
            COMPONENT_U32 => 4,
            other => {
                return Err(GltfError::UnsupportedAccessor {
                    index,
                    reason: format!("unsupported index component type {other}"),
                });
            }
        };
        let Some((bytes, offset, stride)) = self.element_layout(index, size)? else {
            return Ok(vec![0; acc.count]);
        };
        Ok((0..acc.count)
            .map(|i| {
                let at = offset + i * stride;
                match size {
                    1 => bytes[at] as u32,
                    2 => u16::from_le_bytes([bytes[at], bytes[at + 1]]) as u32,
                    _ => read_u32(bytes, at),
                }
            })
            .collect())
    }
}

pub fn is_glb(bytes: &[u8]) -> bool {
    bytes.starts_with(GLB_MAGIC)
}

fn node_matrix(node: &Node) -> Mat4 {
    if let Some(m) = node.matrix {
        let mut out = MAT4_IDENTITY;
        for (c, col) in out.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = m[c * 4 + r] as f32;
            }
        }
        return out;
    }
    let t = node.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO);
    let r = node.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]);
    let s = node
        .scale
        .map(Vec3::from_array)
        .unwrap_or(Vec3::new(1.0, 1.0, 1.0));
    mat4_mul(mat4_translation(t), mat4_mul(mat4_from_quat(r), mat4_scale(s)))
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, GltfError> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| GltfError::InvalidDataUri("missing ','".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(GltfError::InvalidDataUri(
            "only base64 data URIs are supported".to_string(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| GltfError::InvalidDataUri(e.to_string()))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_bits(read_u32(bytes, at))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{DecodedPrimitives, GltfDocument, GltfError, is_glb};
    use crate::mesh::Mesh;
    use base64::Engine as _;

    /// One triangle: 3 float positions followed by 3 u16 indices (+2 pad).
    pub(crate) fn triangle_bin() -> Vec<u8> {
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        bin
    }

    pub(crate) fn triangle_json(buffer_uri: Option<&str>, translation: [f32; 3]) -> String {
        let uri = buffer_uri
            .map(|u| format!(r#""uri": "{u}", "#))
            .unwrap_or_default();
        format!(
            r#"{{
              "asset": {{"version": "2.0"}},
              "scene": 0,
              "scenes": [{{"nodes": [0]}}],
              "nodes": [{{"mesh": 0, "translation": [{}, {}, {}]}}],
              "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1}}]}}],
              "buffers": [{{{uri}"byteLength": 44}}],
              "bufferViews": [
                {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
                {{"buffer": 0, "byteOffset": 36, "byteLength": 6}}
              ],
              "accessors": [
                {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}},
                {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
              ]
            }}"#,
            translation[0], translation[1], translation[2]
        )
    }

    pub(crate) fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        out.extend_from_slice(&bin);
        out
    }

    #[test]
    fn reads_glb_with_embedded_binary() {
        let bytes = glb(&triangle_json(None, [0.0, 0.0, 2.0]), &triangle_bin());
        assert!(is_glb(&bytes));

        let doc = GltfDocument::parse(&bytes).expect("parse");
        assert!(doc.pending_buffers().is_empty());
        assert!(!doc.uses_draco());

        let mesh = doc.to_mesh(&DecodedPrimitives::new()).expect("mesh");
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.positions[1], [1.0, 0.0, 2.0]);
        // Normals are synthesized when the primitive has none.
        assert_eq!(mesh.normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn decodes_data_uri_buffers() {
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(triangle_bin())
        );
        let json = triangle_json(Some(&uri), [0.0, 0.0, 0.0]);
        let doc = GltfDocument::parse(json.as_bytes()).expect("parse");
        assert!(doc.pending_buffers().is_empty());
        let mesh = doc.to_mesh(&DecodedPrimitives::new()).expect("mesh");
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn external_buffers_are_pending_until_set() {
        let json = triangle_json(Some("scene.bin"), [0.0, 0.0, 0.0]);
        let mut doc = GltfDocument::parse(json.as_bytes()).expect("parse");
        assert_eq!(doc.pending_buffers(), vec![(0, "scene.bin".to_string())]);
        assert!(matches!(
            doc.to_mesh(&DecodedPrimitives::new()),
            Err(GltfError::UnresolvedBuffer { index: 0, .. })
        ));

        doc.set_buffer(0, triangle_bin()).expect("set");
        assert!(doc.pending_buffers().is_empty());
        doc.to_mesh(&DecodedPrimitives::new()).expect("mesh");
    }

    #[test]
    fn draco_primitives_need_decoding() {
        let bin = vec![1u8, 2, 3, 4];
        let json = r#"{
          "asset": {"version": "2.0"},
          "extensionsUsed": ["KHR_draco_mesh_compression"],
          "extensionsRequired": ["KHR_draco_mesh_compression"],
          "nodes": [{"mesh": 0}],
          "meshes": [{"primitives": [{
            "attributes": {"POSITION": 0},
            "extensions": {"KHR_draco_mesh_compression": {
              "bufferView": 0, "attributes": {"POSITION": 0}}}
          }]}],
          "buffers": [{"byteLength": 4}],
          "bufferViews": [{"buffer": 0, "byteLength": 4}],
          "accessors": [{"componentType": 5126, "count": 3, "type": "VEC3"}]
        }"#;
        let doc = GltfDocument::parse(&glb(json, &bin)).expect("parse");
        assert!(doc.uses_draco());

        let prims = doc.draco_primitives().expect("draco");
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].data, bin);
        assert_eq!(prims[0].attributes.get("POSITION"), Some(&0));

        assert_eq!(
            doc.to_mesh(&DecodedPrimitives::new()).unwrap_err(),
            GltfError::DracoNotDecoded {
                mesh: 0,
                primitive: 0
            }
        );

        let mut decoded = DecodedPrimitives::new();
        decoded.insert((0, 0), Mesh::cube(1.0));
        let mesh = doc.to_mesh(&decoded).expect("mesh");
        assert_eq!(mesh.vertex_count(), 24);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            GltfDocument::parse(b"not json"),
            Err(GltfError::Json(_))
        ));

        let mut bytes = glb(&triangle_json(None, [0.0; 3]), &triangle_bin());
        bytes[4] = 1;
        assert_eq!(
            GltfDocument::parse(&bytes).unwrap_err(),
            GltfError::UnsupportedVersion(1)
        );

        let json = r#"{"asset":{"version":"2.0"},"extensionsRequired":["KHR_texture_basisu"]}"#;
        assert_eq!(
            GltfDocument::parse(json.as_bytes()).unwrap_err(),
            GltfError::RequiredExtension("KHR_texture_basisu".to_string())
        );

        let empty = r#"{"asset":{"version":"2.0"}}"#;
        let doc = GltfDocument::parse(empty.as_bytes()).expect("parse");
        assert_eq!(
            doc.to_mesh(&DecodedPrimitives::new()).unwrap_err(),
            GltfError::NoGeometry
        );
    }

    fn single_accessor_glb(view: &str, accessor: &str) -> Vec<u8> {
        let json = format!(
            r#"{{
              "asset": {{"version": "2.0"}},
              "nodes": [{{"mesh": 0}}],
              "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}}}]}}],
              "buffers": [{{"byteLength": 44}}],
              "bufferViews": [{view}],
              "accessors": [{accessor}]
            }}"#
        );
        glb(&json, &triangle_bin())
    }

    #[test]
    fn oversized_offsets_and_counts_are_errors() {
        let no_geometry = DecodedPrimitives::new();

        let huge_offset = single_accessor_glb(
            r#"{"buffer": 0, "byteOffset": 18446744073709551615, "byteLength": 36}"#,
            r#"{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}"#,
        );
        let doc = GltfDocument::parse(&huge_offset).expect("parse");
        assert_eq!(
            doc.to_mesh(&no_geometry).unwrap_err(),
            GltfError::Truncated("bufferView past end of buffer")
        );

        let huge_count = single_accessor_glb(
            r#"{"buffer": 0, "byteLength": 36}"#,
            r#"{"bufferView": 0, "componentType": 5126, "count": 18446744073709551615, "type": "VEC3"}"#,
        );
        let doc = GltfDocument::parse(&huge_count).expect("parse");
        assert_eq!(
            doc.to_mesh(&no_geometry).unwrap_err(),
            GltfError::AccessorOutOfBounds(0)
        );

        let huge_accessor_offset = single_accessor_glb(
            r#"{"buffer": 0, "byteLength": 36}"#,
            r#"{"bufferView": 0, "byteOffset": 18446744073709551615, "componentType": 5126, "count": 3, "type": "VEC3"}"#,
        );
        let doc = GltfDocument::parse(&huge_accessor_offset).expect("parse");
        assert_eq!(
            doc.to_mesh(&no_geometry).unwrap_err(),
            GltfError::AccessorOutOfBounds(0)
        );

        let unbacked = single_accessor_glb(
            r#"{"buffer": 0, "byteLength": 36}"#,
            r#"{"componentType": 5126, "count": 4000000000000000000, "type": "VEC3"}"#,
        );
        let doc = GltfDocument::parse(&unbacked).expect("parse");
        assert!(matches!(
            doc.to_mesh(&no_geometry),
            Err(GltfError::UnsupportedAccessor { index: 0, .. })
        ));

        let mut bad_chunk = glb(&triangle_json(None, [0.0; 3]), &triangle_bin());
        bad_chunk[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(
            GltfDocument::parse(&bad_chunk).unwrap_err(),
            GltfError::Truncated("chunk")
        );
    }
}
