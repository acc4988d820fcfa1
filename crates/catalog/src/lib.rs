//! Project catalog for a static survey site: site configuration, project
//! metadata, discovery and the persisted theme preference.

pub mod config;
pub mod discovery;
pub mod html;
pub mod metadata;
pub mod theme;

pub use config::*;
pub use discovery::{discover_projects, load_project, navigation_target};
pub use metadata::*;
pub use theme::*;
