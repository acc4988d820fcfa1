pub mod camera;
pub mod loader;
pub mod model_viewer;

pub use camera::OrbitCamera;
pub use loader::{DracoDecoder, LoadError, NoDraco, load_model};
pub use model_viewer::*;
