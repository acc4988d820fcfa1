pub mod geojson;
pub mod gltf;
pub mod mesh;
pub mod model;
pub mod obj;

pub use geojson::*;
pub use gltf::{DecodedPrimitives, DracoPrimitive, GltfDocument, GltfError};
pub use mesh::*;
pub use model::*;
pub use obj::*;
