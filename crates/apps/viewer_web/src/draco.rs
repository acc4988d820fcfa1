use formats::{DracoPrimitive, Mesh};
use scene::DracoDecoder;

/// Draco decoding through the page's JavaScript decoder. The page defines
/// `decodeDracoPrimitive(decoderPath, bytes, attributesJson)` resolving to
/// `{ positions: Float32Array, normals?: Float32Array, indices: Uint32Array }`.
#[derive(Debug, Clone)]
pub struct JsDraco {
    pub decoder_path: String,
}

impl JsDraco {
    pub fn new(decoder_path: impl Into<String>) -> Self {
        Self {
            decoder_path: decoder_path.into(),
        }
    }
}

/// Builds a mesh from flat decoder output, validating lengths. Missing or
/// mismatched normals are recomputed.
pub fn mesh_from_arrays(positions: &[f32], normals: Option<&[f32]>, indices: Vec<u32>) -> Result<Mesh, String> {
    if positions.len() % 3 != 0 {
        return Err(format!("{} position floats is not a multiple of 3", positions.len()));
    }
    let mut mesh = Mesh {
        positions: positions.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        normals: Vec::new(),
        indices,
    };
    match normals {
        Some(n) if n.len() == positions.len() => {
            mesh.normals = n.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        }
        _ => mesh.compute_normals(),
    }
    mesh.validate().map_err(|e| e.to_string())?;
    Ok(mesh)
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use super::{JsDraco, mesh_from_arrays};
    use formats::{DracoPrimitive, Mesh};
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(catch, js_name = decodeDracoPrimitive)]
        fn decode_draco_primitive(
            decoder_path: &str,
            data: &[u8],
            attributes_json: &str,
        ) -> Result<js_sys::Promise, JsValue>;
    }

    fn describe(err: &JsValue) -> String {
        err.as_string().unwrap_or_else(|| format!("{err:?}"))
    }

    fn field(obj: &JsValue, name: &str) -> Result<JsValue, String> {
        js_sys::Reflect::get(obj, &JsValue::from_str(name)).map_err(|e| describe(&e))
    }

    pub(super) async fn decode(draco: &JsDraco, primitive: &DracoPrimitive) -> Result<Mesh, String> {
        let attributes = serde_json::to_string(&primitive.attributes).map_err(|e| e.to_string())?;
        let promise = decode_draco_primitive(&draco.decoder_path, &primitive.data, &attributes)
            .map_err(|e| describe(&e))?;
        let out = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(|e| describe(&e))?;

        let positions = js_sys::Float32Array::new(&field(&out, "positions")?).to_vec();
        let normals = field(&out, "normals")?;
        let normals = (!normals.is_undefined() && !normals.is_null())
            .then(|| js_sys::Float32Array::new(&normals).to_vec());
        let indices = js_sys::Uint32Array::new(&field(&out, "indices")?).to_vec();
        mesh_from_arrays(&positions, normals.as_deref(), indices)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use super::JsDraco;
    use formats::{DracoPrimitive, Mesh};

    pub(super) async fn decode(_draco: &JsDraco, _primitive: &DracoPrimitive) -> Result<Mesh, String> {
        Err("Draco decoding is only available in the browser".to_string())
    }
}

impl DracoDecoder for JsDraco {
    async fn decode(&self, primitive: &DracoPrimitive) -> Result<Mesh, String> {
        imp::decode(self, primitive).await
    }
}

#[cfg(test)]
mod tests {
    use super::mesh_from_arrays;

    #[test]
    fn flat_arrays_become_a_mesh() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let mesh = mesh_from_arrays(&positions, Some(&normals), vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.normals[1], [0.0, 0.0, 1.0]);

        // No normals from the decoder: computed from the faces.
        let mesh = mesh_from_arrays(&positions, None, vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.normals.len(), 3);
    }

    #[test]
    fn malformed_output_is_an_error() {
        assert!(mesh_from_arrays(&[0.0, 1.0], None, vec![]).is_err());
        let positions = [0.0; 9];
        assert!(mesh_from_arrays(&positions, None, vec![0, 1, 7]).is_err());
    }
}
