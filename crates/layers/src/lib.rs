pub mod cache;
pub mod layer;
pub mod overlay;
pub mod registry;
pub mod symbology;
pub mod tiles;
pub mod viewport;

pub use cache::{TileCache, TileKey, TileState};
pub use layer::*;
pub use overlay::{DrawCommand, GeoJsonOverlay};
pub use registry::*;
pub use symbology::{OverlayStyle, css_rgba};
pub use tiles::{PlacedTile, TileSource, visible_tiles};
pub use viewport::MapViewport;
