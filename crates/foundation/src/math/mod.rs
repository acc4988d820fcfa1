pub mod mat;
pub mod mercator;
pub mod vec;

pub use mat::*;
pub use mercator::*;
pub use vec::*;
