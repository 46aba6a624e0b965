//! # Referential Integrity Engine
//!
//! Deletions trigger cascading effects to keep the four collections
//! mutually consistent. For example:
//! - Deleting a resource → drop the contextualizations that bind it, then
//!   the contextualizers only those contextualizations pointed to
//! - Deleting a contextualizer → drop the contextualizations that use it
//!
//! Cascades are computed as a [`CascadePlan`] first, then applied to the
//! snapshot under construction. Contextualizations always go before
//! contextualizers so no intermediate state holds a dangling reference.
//!
//! Section deletion does not cascade: contextualizations whose `sectionId`
//! points at a deleted section are reported by [`orphaned_contextualizations`]
//! and left in place.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::errors::{EntityKind, IntegrityError};
use crate::story::{Contextualization, Story};

/// Dependent entities to remove alongside a deleted entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadePlan {
    pub contextualizations: Vec<String>,
    pub contextualizers: Vec<String>,
}

impl CascadePlan {
    /// Plan the cascade of a resource deletion.
    ///
    /// Contextualizers are collected from the contextualizations bound to the
    /// resource; one that is still used by a surviving contextualization is
    /// kept.
    pub fn for_resource(story: &Story, resource_id: &str) -> Self {
        let mut contextualizations = Vec::new();
        let mut candidates = BTreeSet::new();

        for (id, contextualization) in story.contextualizations.iter() {
            if contextualization.resource_id == resource_id {
                contextualizations.push(id.clone());
                candidates.insert(contextualization.contextualizer_id.clone());
            }
        }

        let still_used: BTreeSet<&str> = story
            .contextualizations
            .values()
            .filter(|c| c.resource_id != resource_id)
            .map(|c| c.contextualizer_id.as_str())
            .collect();

        let contextualizers = candidates
            .into_iter()
            .filter(|id| story.contextualizers.contains_key(id))
            .filter(|id| !still_used.contains(id.as_str()))
            .collect();

        Self {
            contextualizations,
            contextualizers,
        }
    }

    /// Plan the cascade of a contextualizer deletion
    pub fn for_contextualizer(story: &Story, contextualizer_id: &str) -> Self {
        let contextualizations = story
            .contextualizations
            .iter()
            .filter(|(_, c)| c.contextualizer_id == contextualizer_id)
            .map(|(id, _)| id.clone())
            .collect();

        Self {
            contextualizations,
            contextualizers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contextualizations.is_empty() && self.contextualizers.is_empty()
    }

    /// Remove the planned entities from a snapshot under construction
    pub fn apply(&self, story: &mut Story) {
        if !self.contextualizations.is_empty() {
            let map = Arc::make_mut(&mut story.contextualizations);
            for id in &self.contextualizations {
                map.remove(id);
            }
        }

        if !self.contextualizers.is_empty() {
            let map = Arc::make_mut(&mut story.contextualizers);
            for id in &self.contextualizers {
                map.remove(id);
            }
        }
    }
}

/// Check that a contextualization references an existing resource and contextualizer
pub fn check_contextualization(
    story: &Story,
    contextualization: &Contextualization,
) -> Result<(), IntegrityError> {
    if !story.resources.contains_key(&contextualization.resource_id) {
        return Err(IntegrityError::DanglingReference {
            kind: EntityKind::Contextualization,
            id: contextualization.id.clone(),
            target_kind: EntityKind::Resource,
            target_id: contextualization.resource_id.clone(),
        });
    }

    if !story
        .contextualizers
        .contains_key(&contextualization.contextualizer_id)
    {
        return Err(IntegrityError::DanglingReference {
            kind: EntityKind::Contextualization,
            id: contextualization.id.clone(),
            target_kind: EntityKind::Contextualizer,
            target_id: contextualization.contextualizer_id.clone(),
        });
    }

    Ok(())
}

/// Every dangling reference held by a contextualization
pub fn dangling_references(story: &Story) -> Vec<IntegrityError> {
    story
        .contextualizations
        .values()
        .filter_map(|c| check_contextualization(story, c).err())
        .collect()
}

/// Contextualizations bound to a section that no longer exists
pub fn orphaned_contextualizations(story: &Story) -> Vec<&Contextualization> {
    story
        .contextualizations
        .values()
        .filter(|c| match &c.section_id {
            Some(section_id) => !story.sections.contains_key(section_id),
            None => false,
        })
        .collect()
}
