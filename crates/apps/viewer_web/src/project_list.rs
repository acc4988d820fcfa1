use catalog::{MetadataSource, Project};
use wasm_bindgen::prelude::JsValue;

use crate::dom;

/// What one project card shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCard {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Date and location joined for the subtitle line.
    pub meta_line: String,
    pub thumbnail: Option<String>,
    pub href: String,
    pub badges: Vec<&'static str>,
}

impl ProjectCard {
    pub fn new(project: &Project, href: String) -> Self {
        let meta_line = [project.date.as_deref(), project.location.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" · ");
        let mut badges = Vec::new();
        if !project.layers.is_empty() {
            badges.push("Map");
        }
        if project.has_model() {
            badges.push("3D");
        }
        Self {
            id: project.id.clone(),
            title: project.title.clone(),
            description: if project.description.is_empty() && project.source != MetadataSource::Json {
                "No description available.".to_string()
            } else {
                project.description.clone()
            },
            meta_line,
            thumbnail: project.thumbnail.clone(),
            href,
            badges,
        }
    }
}

/// Replaces the children of `#<container_id>` with one card per project,
/// or an empty-state note. Text goes through `textContent`, never markup.
pub fn render(container_id: &str, cards: &[ProjectCard]) -> Result<(), JsValue> {
    let container = dom::element(container_id)?;
    container.set_text_content(None);

    if cards.is_empty() {
        let empty = dom::create("p", "project-list-empty", Some("No projects found."))?;
        container.append_child(&empty)?;
        return Ok(());
    }

    for card in cards {
        let link = dom::create("a", "project-card", None)?;
        link.set_attribute("href", &card.href)?;
        link.set_attribute("data-project", &card.id)?;

        if let Some(src) = &card.thumbnail {
            let img = dom::create("img", "project-thumb", None)?;
            img.set_attribute("src", src)?;
            img.set_attribute("alt", &card.title)?;
            img.set_attribute("loading", "lazy")?;
            link.append_child(&img)?;
        }

        let body = dom::create("div", "project-body", None)?;
        body.append_child(&dom::create("h3", "project-title", Some(&card.title))?.into())?;
        if !card.meta_line.is_empty() {
            body.append_child(&dom::create("p", "project-meta", Some(&card.meta_line))?.into())?;
        }
        if !card.description.is_empty() {
            body.append_child(&dom::create(
                "p",
                "project-description",
                Some(&card.description),
            )?.into())?;
        }
        if !card.badges.is_empty() {
            let badges = dom::create("div", "project-badges", None)?;
            for badge in &card.badges {
                badges.append_child(&dom::create("span", "badge", Some(badge))?.into())?;
            }
            body.append_child(&badges)?;
        }
        link.append_child(&body)?;
        container.append_child(&link)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ProjectCard;
    use catalog::{MetadataSource, ModelSettings, Project};

    #[test]
    fn card_from_full_metadata() {
        let mut project = Project::derived("farm-survey");
        project.source = MetadataSource::Json;
        project.title = "Farm Survey".to_string();
        project.date = Some("2024-04-02".to_string());
        project.location = Some("Kent".to_string());
        project.model = Some(ModelSettings {
            url: Some("projects/farm-survey/farm.glb".to_string()),
            ..ModelSettings::default()
        });

        let card = ProjectCard::new(&project, "viewer.html?project=farm-survey".to_string());
        assert_eq!(card.meta_line, "2024-04-02 · Kent");
        assert_eq!(card.badges, vec!["3D"]);
        assert_eq!(card.description, "");
    }

    #[test]
    fn derived_projects_get_placeholder_text() {
        let project = Project::derived("quarry_volume");
        let card = ProjectCard::new(&project, "projects/quarry_volume/index.html".to_string());
        assert_eq!(card.title, "Quarry Volume");
        assert_eq!(card.description, "No description available.");
        assert!(card.meta_line.is_empty());
        assert!(card.badges.is_empty());
    }
}
