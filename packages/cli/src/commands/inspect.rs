use crate::commands::{load_story, resolve};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use quire_editor::{orphaned_contextualizations, Story};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Exported story file
    pub input: PathBuf,

    /// Print the overview as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SectionLine {
    pub id: String,
    pub title: String,
    pub contextualizations: usize,
}

/// Summary of a story as shown by `inspect`
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoryOverview {
    pub id: String,
    pub title: String,
    pub template: String,
    pub sections: Vec<SectionLine>,

    /// Resource count per resource type
    pub resources: BTreeMap<String, usize>,
    pub contextualizers: usize,
    pub contextualizations: usize,
    pub orphaned: Vec<String>,
}

impl StoryOverview {
    pub fn of(story: &Story) -> Self {
        let mut per_section: BTreeMap<&str, usize> = BTreeMap::new();
        for contextualization in story.contextualizations.values() {
            if let Some(section_id) = &contextualization.section_id {
                *per_section.entry(section_id.as_str()).or_default() += 1;
            }
        }

        let sections = story
            .ordered_sections()
            .map(|section| SectionLine {
                id: section.id.clone(),
                title: section.title().to_string(),
                contextualizations: per_section.get(section.id.as_str()).copied().unwrap_or(0),
            })
            .collect();

        let mut resources = BTreeMap::new();
        for resource in story.resources.values() {
            *resources.entry(resource.metadata.kind.clone()).or_default() += 1;
        }

        Self {
            id: story.id.clone(),
            title: story.metadata.title.clone(),
            template: story.settings.template.clone(),
            sections,
            resources,
            contextualizers: story.contextualizers.len(),
            contextualizations: story.contextualizations.len(),
            orphaned: orphaned_contextualizations(story)
                .into_iter()
                .map(|c| c.id.clone())
                .collect(),
        }
    }

    fn print(&self) {
        let title = if self.title.is_empty() {
            "(untitled)"
        } else {
            self.title.as_str()
        };
        println!("{}", title.bright_white().bold());
        println!("  id:       {}", self.id);
        println!("  template: {}", self.template);
        println!();

        println!("{} ({})", "Sections".bright_blue().bold(), self.sections.len());
        for (index, section) in self.sections.iter().enumerate() {
            println!(
                "  {:>3}. {} {}",
                index + 1,
                section.title,
                format!("[{}, {} bound]", section.id, section.contextualizations).dimmed()
            );
        }
        println!();

        let total: usize = self.resources.values().sum();
        println!("{} ({})", "Resources".bright_blue().bold(), total);
        for (kind, count) in &self.resources {
            println!("  {:<10} {}", kind, count);
        }
        println!();

        println!(
            "{} {}   {} {}",
            "Contextualizers".bright_blue().bold(),
            self.contextualizers,
            "Contextualizations".bright_blue().bold(),
            self.contextualizations
        );

        if !self.orphaned.is_empty() {
            println!(
                "  {} orphaned: {}",
                "⚠️".yellow(),
                self.orphaned.join(", ")
            );
        }
    }
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let story = load_story(&resolve(cwd, &args.input))?;
    let overview = StoryOverview::of(&story);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        overview.print();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_editor::{Contextualization, Contextualizer, Resource, Section};
    use serde_json::Value;

    #[test]
    fn test_overview_follows_section_order() {
        let story = Story::new_default("s1")
            .with_title("Field notes")
            .create_section("a", Section::new("a", "Alpha"))
            .unwrap()
            .create_section("b", Section::new("b", "Beta"))
            .unwrap()
            .move_section(1, 0)
            .unwrap()
            .create_resource("r1", Resource::new("r1", "bib", Value::Null))
            .unwrap()
            .create_resource("r2", Resource::new("r2", "bib", Value::Null))
            .unwrap()
            .create_resource("r3", Resource::new("r3", "image", Value::Null))
            .unwrap()
            .create_contextualizer("cx1", Contextualizer::new("cx1", "bib"))
            .unwrap()
            .create_contextualization(
                "cz1",
                Contextualization::new("cz1", "r1", "cx1").in_section("a"),
            )
            .unwrap();

        let overview = StoryOverview::of(&story);
        let titles: Vec<&str> = overview.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Beta", "Alpha"]);
        assert_eq!(overview.sections[1].contextualizations, 1);
        assert_eq!(overview.resources.get("bib"), Some(&2));
        assert_eq!(overview.resources.get("image"), Some(&1));
        assert!(overview.orphaned.is_empty());
    }
}
