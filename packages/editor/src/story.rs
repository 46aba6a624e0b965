//! # Story Document
//!
//! The normalized in-memory representation of a story under edit.
//!
//! A story is a set of cross-referencing entities:
//!
//! ```text
//! Story
//!  ├── sections            sectionId → Section
//!  ├── sectionsOrder       [sectionId]           (display order)
//!  ├── resources           resourceId → Resource
//!  ├── contextualizers     contextualizerId → Contextualizer
//!  └── contextualizations  contextualizationId → Contextualization
//!                              ├── resourceId ───────→ resources
//!                              └── contextualizerId ─→ contextualizers
//! ```
//!
//! Collections sit behind `Arc` so a mutation clones only the collection it
//! touches. Unaffected collections stay pointer-equal between two snapshots,
//! which is what downstream change detection relies on.
//!
//! Unknown fields are kept in flattened `extra` maps so a story survives an
//! export/import round-trip without losing data it does not model.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::EntityKind;
use crate::order::SectionsOrder;

/// Shared, copy-on-write map from entity id to entity
pub type EntityMap<T> = Arc<BTreeMap<String, T>>;

/// Template applied to freshly created stories
pub const DEFAULT_TEMPLATE: &str = "garlic";

/// Suffix appended to the title of a duplicated story
pub const COPY_TITLE_SUFFIX: &str = " - copy";

/// An entity stored in one of the story collections
pub trait Entity: Clone {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// The full document under edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub metadata: StoryMetadata,
    pub settings: StorySettings,
    pub sections: EntityMap<Section>,
    pub sections_order: SectionsOrder,
    pub resources: EntityMap<Resource>,
    pub contextualizers: EntityMap<Contextualizer>,
    pub contextualizations: EntityMap<Contextualization>,
}

/// Title block of a story.
///
/// Optional text fields read `null` and absent alike; both export as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMetadata {
    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#abstract: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rendering settings. A `null` citation field exports as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySettings {
    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default)]
    pub css: String,

    #[serde(default)]
    pub styles_variables: Map<String, Value>,

    #[serde(default)]
    pub options: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_style: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_locale: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            template: default_template(),
            css: String::new(),
            styles_variables: Map::new(),
            options: Map::new(),
            citation_style: None,
            citation_locale: None,
            extra: Map::new(),
        }
    }
}

/// An ordered chapter of document content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,

    #[serde(default)]
    pub metadata: SectionMetadata,

    /// Rich text body; references contextualization ids inline
    #[serde(default)]
    pub contents: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMetadata {
    #[serde(default)]
    pub title: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: SectionMetadata {
                title: title.into(),
                extra: Map::new(),
            },
            contents: Value::Null,
            extra: Map::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }
}

/// A reusable asset attachable to content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub metadata: ResourceMetadata,

    /// Shape depends on `metadata.kind`
    #[serde(default)]
    pub data: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    /// `bib`, `image`, `table`, `glossary`, `embed`, ...
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            metadata: ResourceMetadata {
                kind: kind.into(),
                title: String::new(),
                description: None,
                source: None,
                extra: Map::new(),
            },
            data,
            extra: Map::new(),
        }
    }
}

/// Presentation configuration for how a resource appears at a binding point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contextualizer {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub config: Map<String, Value>,
}

impl Contextualizer {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            config: Map::new(),
        }
    }
}

/// Binding of a resource and a contextualizer into a content location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contextualization {
    pub id: String,
    pub resource_id: String,
    pub contextualizer_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contextualization {
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        contextualizer_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            contextualizer_id: contextualizer_id.into(),
            section_id: None,
            extra: Map::new(),
        }
    }

    pub fn in_section(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }
}

impl Entity for Section {
    const KIND: EntityKind = EntityKind::Section;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Resource {
    const KIND: EntityKind = EntityKind::Resource;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Contextualizer {
    const KIND: EntityKind = EntityKind::Contextualizer;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Contextualization {
    const KIND: EntityKind = EntityKind::Contextualization;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Story {
    /// Create an empty story with default settings
    pub fn new_default(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: StoryMetadata::default(),
            settings: StorySettings::default(),
            sections: EntityMap::default(),
            sections_order: SectionsOrder::default(),
            resources: EntityMap::default(),
            contextualizers: EntityMap::default(),
            contextualizations: EntityMap::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = title.into();
        self
    }

    /// Duplicate this story under a new id.
    ///
    /// Entity collections are shared with the source until either side
    /// mutates them.
    pub fn copy_with_id(&self, new_id: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.id = new_id.into();
        copy.metadata.title = format!("{}{}", self.metadata.title, COPY_TITLE_SUFFIX);
        copy
    }

    /// Sections in display order
    pub fn ordered_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections_order
            .iter()
            .filter_map(move |id| self.sections.get(id))
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contextualizer(&self, id: &str) -> Option<&Contextualizer> {
        self.contextualizers.get(id)
    }

    pub fn contextualization(&self, id: &str) -> Option<&Contextualization> {
        self.contextualizations.get(id)
    }
}
