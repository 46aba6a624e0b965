//! # Story Commands
//!
//! One variant per entity store operation, consumed by exhaustive match.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: each command is one author action
//! 2. **Validated**: integrity is checked by the store before commit
//! 3. **Whole-record**: updates replace the full record (no field merge)
//! 4. **Lock-aware**: each command names the locations it needs
//!
//! ## Concurrency
//!
//! Commands on locations no other author holds are last-applied-wins at the
//! snapshot level. There is no text-level merge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::IntegrityError;
use crate::locks::LockLocation;
use crate::story::{Contextualization, Contextualizer, Resource, Section, Story, StoryMetadata};

/// Author actions on a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoryCommand {
    CreateSection {
        section_id: String,
        section: Section,
    },
    UpdateSection {
        section_id: String,
        section: Section,
    },
    DeleteSection {
        section_id: String,
    },
    ReorderSections {
        sections_order: Vec<String>,
    },

    CreateResource {
        resource_id: String,
        resource: Resource,
    },
    UpdateResource {
        resource_id: String,
        resource: Resource,
    },
    DeleteResource {
        resource_id: String,
    },

    CreateContextualizer {
        contextualizer_id: String,
        contextualizer: Contextualizer,
    },
    UpdateContextualizer {
        contextualizer_id: String,
        contextualizer: Contextualizer,
    },
    DeleteContextualizer {
        contextualizer_id: String,
    },

    CreateContextualization {
        contextualization_id: String,
        contextualization: Contextualization,
    },
    UpdateContextualization {
        contextualization_id: String,
        contextualization: Contextualization,
    },
    DeleteContextualization {
        contextualization_id: String,
    },

    UpdateMetadata {
        metadata: StoryMetadata,
    },
    UpdateMetadataField {
        key: String,
        value: Value,
    },
    SetCss {
        css: String,
    },
    SetTemplate {
        template: String,
    },
    SetSettingOption {
        field: String,
        value: Value,
    },
    SetCitationStyle {
        citation_style: String,
    },
    SetCitationLocale {
        citation_locale: String,
    },
}

impl StoryCommand {
    /// Apply the command, producing a new snapshot
    pub fn apply(&self, story: &Story) -> Result<Story, IntegrityError> {
        match self {
            StoryCommand::CreateSection { section_id, section } => {
                story.create_section(section_id, section.clone())
            }
            StoryCommand::UpdateSection { section_id, section } => {
                story.update_section(section_id, section.clone())
            }
            StoryCommand::DeleteSection { section_id } => story.delete_section(section_id),
            StoryCommand::ReorderSections { sections_order } => {
                story.reorder_sections(sections_order.clone())
            }

            StoryCommand::CreateResource { resource_id, resource } => {
                story.create_resource(resource_id, resource.clone())
            }
            StoryCommand::UpdateResource { resource_id, resource } => {
                story.update_resource(resource_id, resource.clone())
            }
            StoryCommand::DeleteResource { resource_id } => story.delete_resource(resource_id),

            StoryCommand::CreateContextualizer {
                contextualizer_id,
                contextualizer,
            } => story.create_contextualizer(contextualizer_id, contextualizer.clone()),
            StoryCommand::UpdateContextualizer {
                contextualizer_id,
                contextualizer,
            } => story.update_contextualizer(contextualizer_id, contextualizer.clone()),
            StoryCommand::DeleteContextualizer { contextualizer_id } => {
                story.delete_contextualizer(contextualizer_id)
            }

            StoryCommand::CreateContextualization {
                contextualization_id,
                contextualization,
            } => story.create_contextualization(contextualization_id, contextualization.clone()),
            StoryCommand::UpdateContextualization {
                contextualization_id,
                contextualization,
            } => story.update_contextualization(contextualization_id, contextualization.clone()),
            StoryCommand::DeleteContextualization {
                contextualization_id,
            } => story.delete_contextualization(contextualization_id),

            StoryCommand::UpdateMetadata { metadata } => Ok(story.update_metadata(metadata.clone())),
            StoryCommand::UpdateMetadataField { key, value } => {
                story.update_metadata_field(key, value.clone())
            }
            StoryCommand::SetCss { css } => Ok(story.set_css(css.as_str())),
            StoryCommand::SetTemplate { template } => Ok(story.set_template(template.as_str())),
            StoryCommand::SetSettingOption { field, value } => {
                Ok(story.set_setting_option(field, value.clone()))
            }
            StoryCommand::SetCitationStyle { citation_style } => {
                Ok(story.set_citation_style(citation_style.as_str()))
            }
            StoryCommand::SetCitationLocale { citation_locale } => {
                Ok(story.set_citation_locale(citation_locale.as_str()))
            }
        }
    }

    /// Locations that must not be held by another author for this command
    /// to be dispatched
    pub fn required_locations(&self) -> Vec<LockLocation> {
        match self {
            StoryCommand::UpdateSection { section_id, .. } => {
                vec![LockLocation::section(section_id.as_str())]
            }
            StoryCommand::CreateSection { .. } | StoryCommand::ReorderSections { .. } => {
                vec![LockLocation::SectionsOrder]
            }
            StoryCommand::DeleteSection { section_id } => vec![
                LockLocation::SectionsOrder,
                LockLocation::section(section_id.as_str()),
            ],

            StoryCommand::UpdateResource { resource_id, .. }
            | StoryCommand::DeleteResource { resource_id } => {
                vec![LockLocation::resource(resource_id.as_str())]
            }

            StoryCommand::UpdateMetadata { .. }
            | StoryCommand::UpdateMetadataField { .. }
            | StoryCommand::SetCss { .. }
            | StoryCommand::SetTemplate { .. }
            | StoryCommand::SetSettingOption { .. }
            | StoryCommand::SetCitationStyle { .. }
            | StoryCommand::SetCitationLocale { .. } => vec![LockLocation::StoryMetadata],

            StoryCommand::CreateResource { .. }
            | StoryCommand::CreateContextualizer { .. }
            | StoryCommand::UpdateContextualizer { .. }
            | StoryCommand::DeleteContextualizer { .. }
            | StoryCommand::CreateContextualization { .. }
            | StoryCommand::UpdateContextualization { .. }
            | StoryCommand::DeleteContextualization { .. } => Vec::new(),
        }
    }

    /// Debug name of the command
    pub fn name(&self) -> &'static str {
        match self {
            StoryCommand::CreateSection { .. } => "CreateSection",
            StoryCommand::UpdateSection { .. } => "UpdateSection",
            StoryCommand::DeleteSection { .. } => "DeleteSection",
            StoryCommand::ReorderSections { .. } => "ReorderSections",
            StoryCommand::CreateResource { .. } => "CreateResource",
            StoryCommand::UpdateResource { .. } => "UpdateResource",
            StoryCommand::DeleteResource { .. } => "DeleteResource",
            StoryCommand::CreateContextualizer { .. } => "CreateContextualizer",
            StoryCommand::UpdateContextualizer { .. } => "UpdateContextualizer",
            StoryCommand::DeleteContextualizer { .. } => "DeleteContextualizer",
            StoryCommand::CreateContextualization { .. } => "CreateContextualization",
            StoryCommand::UpdateContextualization { .. } => "UpdateContextualization",
            StoryCommand::DeleteContextualization { .. } => "DeleteContextualization",
            StoryCommand::UpdateMetadata { .. } => "UpdateMetadata",
            StoryCommand::UpdateMetadataField { .. } => "UpdateMetadataField",
            StoryCommand::SetCss { .. } => "SetCss",
            StoryCommand::SetTemplate { .. } => "SetTemplate",
            StoryCommand::SetSettingOption { .. } => "SetSettingOption",
            StoryCommand::SetCitationStyle { .. } => "SetCitationStyle",
            StoryCommand::SetCitationLocale { .. } => "SetCitationLocale",
        }
    }
}
