//! Finding project folders on a static host and reading their metadata.
//!
//! Static hosts cannot list directories, so discovery works from a list of
//! candidate folder names: a published `projects.json`, else the configured
//! candidates. Each candidate is probed with `HEAD` and every folder that
//! answers is loaded through three tiers: `metadata.json`, then a scrape of
//! `index.html`, then a title derived from the folder name. Nothing here
//! fails as a whole; each failure degrades one project by one tier.

use std::collections::HashSet;

use fetch::Fetch;
use futures_util::future::join_all;

use crate::config::SiteConfig;
use crate::html;
use crate::metadata::{MetadataError, MetadataSource, Project, ProjectMetadata, parse_metadata};

/// Discovers and loads every project, in candidate order.
pub async fn discover_projects<F: Fetch>(fetch: &F, config: &SiteConfig) -> Vec<Project> {
    let names = candidate_names(fetch, config).await;
    let present = probe_candidates(fetch, config, &names).await;
    tracing::info!(
        candidates = names.len(),
        found = present.len(),
        "project discovery finished"
    );
    join_all(present.iter().map(|name| load_project(fetch, config, name))).await
}

/// Folder names to probe: `projects.json` when it is a JSON array of
/// names, otherwise `config.candidates`. Duplicates and names that would
/// escape the projects folder are dropped; order is kept.
pub async fn candidate_names<F: Fetch>(fetch: &F, config: &SiteConfig) -> Vec<String> {
    let index_path = config.project_index_path();
    let listed = match fetch.get_text(&index_path).await {
        Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(names) => Some(names),
            Err(err) => {
                tracing::warn!("{index_path} is not a list of folder names: {err}");
                None
            }
        },
        Err(err) => {
            tracing::debug!("no project index: {err}");
            None
        }
    };

    let names = listed.unwrap_or_else(|| config.candidates.clone());
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| {
            if !is_valid_folder_name(n) {
                tracing::warn!("ignoring project folder name {n:?}");
                return false;
            }
            true
        })
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// A single path segment: not empty, no separators, not `.`/`..`.
pub fn is_valid_folder_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '?', '#'])
}

/// Probes all names concurrently; returns those present, in input order.
pub async fn probe_candidates<F: Fetch>(
    fetch: &F,
    config: &SiteConfig,
    names: &[String],
) -> Vec<String> {
    let found = join_all(names.iter().map(|name| project_exists(fetch, config, name))).await;
    names
        .iter()
        .zip(found)
        .filter_map(|(name, present)| present.then(|| name.clone()))
        .collect()
}

/// A folder counts as a project when it has `metadata.json` or `index.html`.
pub async fn project_exists<F: Fetch>(fetch: &F, config: &SiteConfig, name: &str) -> bool {
    fetch.exists(&config.metadata_path(name)).await
        || fetch.exists(&config.index_path(name)).await
}

pub async fn load_metadata<F: Fetch>(
    fetch: &F,
    config: &SiteConfig,
    name: &str,
) -> Result<ProjectMetadata, MetadataError> {
    let raw = fetch.get_text(&config.metadata_path(name)).await?;
    parse_metadata(&raw)
}

/// Scrapes `index.html`. Any fetched page counts; missing fields stay `None`.
pub async fn load_html_metadata<F: Fetch>(
    fetch: &F,
    config: &SiteConfig,
    name: &str,
) -> Result<html::HtmlMetadata, MetadataError> {
    let page = fetch.get_text(&config.index_path(name)).await?;
    Ok(html::scrape(&page))
}

/// Loads one project through the fallback tiers. Never fails.
pub async fn load_project<F: Fetch>(fetch: &F, config: &SiteConfig, name: &str) -> Project {
    match load_metadata(fetch, config, name).await {
        Ok(meta) => return Project::from_metadata(name, &config.metadata_path(name), meta),
        Err(err) => tracing::debug!("{name}: metadata.json unavailable: {err}"),
    }

    match load_html_metadata(fetch, config, name).await {
        Ok(scraped) => {
            let mut project = Project::derived(name);
            project.source = MetadataSource::Html;
            if let Some(title) = scraped.title {
                project.title = title;
            }
            project.description = scraped.description.unwrap_or_default();
            project.center = scraped.center;
            return project;
        }
        Err(err) => tracing::warn!("{name}: no metadata, deriving title from folder name: {err}"),
    }

    Project::derived(name)
}

/// Where a project card links: the project's own `index.html` when the
/// host has one, else the shared viewer page.
pub async fn navigation_target<F: Fetch>(fetch: &F, config: &SiteConfig, project_id: &str) -> String {
    let page = config.index_path(project_id);
    if fetch.exists(&page).await {
        page
    } else {
        config.viewer_url(project_id)
    }
}
