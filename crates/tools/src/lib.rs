//! Maintenance commands for a survey site: what discovery finds, which
//! referenced files are missing, and whether a project's model loads.

pub mod report;
pub mod site;

pub use report::*;
pub use site::SiteFetch;
