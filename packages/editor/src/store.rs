//! # Entity Store
//!
//! Invariant-preserving operations on a [`Story`] snapshot.
//!
//! Every operation is pure: it borrows the input snapshot, never mutates it,
//! and returns a new one. Collections the operation does not touch are
//! shared with the input (`Arc` clone), so a consumer can detect which parts
//! changed with a pointer comparison.
//!
//! ## Semantics
//!
//! - `create_*` fails with `DuplicateId` if the id is already taken
//! - `update_*` replaces the whole record; fails with `NotFound` if absent
//!   (there is no silent upsert)
//! - `delete_*` removes the record; resource and contextualizer deletions
//!   cascade through [`CascadePlan`]
//! - section creation and deletion keep `sectionsOrder` a permutation of
//!   the `sections` keys

use std::sync::Arc;

use serde_json::Value;

use crate::errors::IntegrityError;
use crate::integrity::{check_contextualization, CascadePlan};
use crate::order::check_permutation;
use crate::story::{
    Contextualization, Contextualizer, Entity, EntityMap, Resource, Section, Story, StoryMetadata,
};

fn check_key<T: Entity>(key: &str, entity: &T) -> Result<(), IntegrityError> {
    if entity.id() == key {
        Ok(())
    } else {
        Err(IntegrityError::IdMismatch {
            kind: T::KIND,
            key: key.to_string(),
            payload: entity.id().to_string(),
        })
    }
}

fn insert_new<T: Entity>(map: &mut EntityMap<T>, id: &str, entity: T) -> Result<(), IntegrityError> {
    check_key(id, &entity)?;
    if map.contains_key(id) {
        return Err(IntegrityError::DuplicateId {
            kind: T::KIND,
            id: id.to_string(),
        });
    }
    Arc::make_mut(map).insert(id.to_string(), entity);
    Ok(())
}

fn replace_existing<T: Entity>(
    map: &mut EntityMap<T>,
    id: &str,
    entity: T,
) -> Result<(), IntegrityError> {
    check_key(id, &entity)?;
    if !map.contains_key(id) {
        return Err(IntegrityError::not_found(T::KIND, id));
    }
    Arc::make_mut(map).insert(id.to_string(), entity);
    Ok(())
}

fn remove_existing<T: Entity>(map: &mut EntityMap<T>, id: &str) -> Result<T, IntegrityError> {
    if !map.contains_key(id) {
        return Err(IntegrityError::not_found(T::KIND, id));
    }
    Arc::make_mut(map)
        .remove(id)
        .ok_or_else(|| IntegrityError::not_found(T::KIND, id))
}

impl Story {
    // ---------------------------------------------------------------------
    // Sections
    // ---------------------------------------------------------------------

    /// Create a section and append it to the sections order
    pub fn create_section(&self, section_id: &str, section: Section) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        insert_new(&mut next.sections, section_id, section)?;
        next.sections_order.append(section_id);
        Ok(next)
    }

    pub fn update_section(&self, section_id: &str, section: Section) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        replace_existing(&mut next.sections, section_id, section)?;
        Ok(next)
    }

    /// Delete a section and splice it out of the sections order.
    ///
    /// Contextualizations bound inside the section are left as orphans.
    pub fn delete_section(&self, section_id: &str) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        remove_existing(&mut next.sections, section_id)?;
        next.sections_order.remove(section_id);
        Ok(next)
    }

    /// Replace the sections order; the new order must be a permutation of
    /// the current section ids
    pub fn reorder_sections(&self, new_order: Vec<String>) -> Result<Story, IntegrityError> {
        check_permutation(&new_order, &self.sections)?;
        let mut next = self.clone();
        next.sections_order.reorder(new_order);
        Ok(next)
    }

    /// Move the section at index `from` to index `to`
    pub fn move_section(&self, from: usize, to: usize) -> Result<Story, IntegrityError> {
        let new_order = self.sections_order.moved(from, to)?;
        self.reorder_sections(new_order)
    }

    // ---------------------------------------------------------------------
    // Resources
    // ---------------------------------------------------------------------

    pub fn create_resource(&self, resource_id: &str, resource: Resource) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        insert_new(&mut next.resources, resource_id, resource)?;
        Ok(next)
    }

    pub fn update_resource(&self, resource_id: &str, resource: Resource) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        replace_existing(&mut next.resources, resource_id, resource)?;
        Ok(next)
    }

    /// Delete a resource along with the contextualizations binding it and the
    /// contextualizers only those contextualizations used
    pub fn delete_resource(&self, resource_id: &str) -> Result<Story, IntegrityError> {
        if !self.resources.contains_key(resource_id) {
            return Err(IntegrityError::not_found(Resource::KIND, resource_id));
        }

        let plan = CascadePlan::for_resource(self, resource_id);
        let mut next = self.clone();
        plan.apply(&mut next);
        remove_existing(&mut next.resources, resource_id)?;

        tracing::debug!(
            resource_id,
            contextualizations = plan.contextualizations.len(),
            contextualizers = plan.contextualizers.len(),
            "Resource deleted with cascade"
        );
        Ok(next)
    }

    // ---------------------------------------------------------------------
    // Contextualizers
    // ---------------------------------------------------------------------

    pub fn create_contextualizer(
        &self,
        contextualizer_id: &str,
        contextualizer: Contextualizer,
    ) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        insert_new(&mut next.contextualizers, contextualizer_id, contextualizer)?;
        Ok(next)
    }

    pub fn update_contextualizer(
        &self,
        contextualizer_id: &str,
        contextualizer: Contextualizer,
    ) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        replace_existing(&mut next.contextualizers, contextualizer_id, contextualizer)?;
        Ok(next)
    }

    /// Delete a contextualizer and every contextualization that uses it
    pub fn delete_contextualizer(&self, contextualizer_id: &str) -> Result<Story, IntegrityError> {
        if !self.contextualizers.contains_key(contextualizer_id) {
            return Err(IntegrityError::not_found(Contextualizer::KIND, contextualizer_id));
        }

        let plan = CascadePlan::for_contextualizer(self, contextualizer_id);
        let mut next = self.clone();
        plan.apply(&mut next);
        remove_existing(&mut next.contextualizers, contextualizer_id)?;

        tracing::debug!(
            contextualizer_id,
            contextualizations = plan.contextualizations.len(),
            "Contextualizer deleted with cascade"
        );
        Ok(next)
    }

    // ---------------------------------------------------------------------
    // Contextualizations
    // ---------------------------------------------------------------------

    pub fn create_contextualization(
        &self,
        contextualization_id: &str,
        contextualization: Contextualization,
    ) -> Result<Story, IntegrityError> {
        check_contextualization(self, &contextualization)?;
        let mut next = self.clone();
        insert_new(&mut next.contextualizations, contextualization_id, contextualization)?;
        Ok(next)
    }

    pub fn update_contextualization(
        &self,
        contextualization_id: &str,
        contextualization: Contextualization,
    ) -> Result<Story, IntegrityError> {
        check_contextualization(self, &contextualization)?;
        let mut next = self.clone();
        replace_existing(&mut next.contextualizations, contextualization_id, contextualization)?;
        Ok(next)
    }

    pub fn delete_contextualization(&self, contextualization_id: &str) -> Result<Story, IntegrityError> {
        let mut next = self.clone();
        remove_existing(&mut next.contextualizations, contextualization_id)?;
        Ok(next)
    }

    // ---------------------------------------------------------------------
    // Metadata and settings
    // ---------------------------------------------------------------------

    pub fn update_metadata(&self, metadata: StoryMetadata) -> Story {
        let mut next = self.clone();
        next.metadata = metadata;
        next
    }

    /// Set one metadata field, leaving the others untouched.
    ///
    /// Known fields (`title`, `subtitle`, `authors`, `abstract`) must carry a
    /// value of the matching JSON type; any other key is stored as-is.
    pub fn update_metadata_field(&self, key: &str, value: Value) -> Result<Story, IntegrityError> {
        let mut fields = match serde_json::to_value(&self.metadata) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) | Err(_) => serde_json::Map::new(),
        };
        fields.insert(key.to_string(), value);

        let metadata: StoryMetadata = serde_json::from_value(Value::Object(fields)).map_err(|e| {
            IntegrityError::InvalidValue {
                field: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(self.update_metadata(metadata))
    }

    pub fn set_css(&self, css: impl Into<String>) -> Story {
        let mut next = self.clone();
        next.settings.css = css.into();
        next
    }

    pub fn set_template(&self, template: impl Into<String>) -> Story {
        let mut next = self.clone();
        next.settings.template = template.into();
        next
    }

    /// Set one template-dependent option
    pub fn set_setting_option(&self, field: &str, value: Value) -> Story {
        let mut next = self.clone();
        next.settings.options.insert(field.to_string(), value);
        next
    }

    pub fn set_citation_style(&self, citation_style: impl Into<String>) -> Story {
        let mut next = self.clone();
        next.settings.citation_style = Some(citation_style.into());
        next
    }

    pub fn set_citation_locale(&self, citation_locale: impl Into<String>) -> Story {
        let mut next = self.clone();
        next.settings.citation_locale = Some(citation_locale.into());
        next
    }

    /// Check the cross-collection invariants of this snapshot
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        check_permutation(self.sections_order.as_slice(), &self.sections)?;
        for (key, section) in self.sections.iter() {
            check_key(key, section)?;
        }
        for (key, resource) in self.resources.iter() {
            check_key(key, resource)?;
        }
        for (key, contextualizer) in self.contextualizers.iter() {
            check_key(key, contextualizer)?;
        }
        for (key, contextualization) in self.contextualizations.iter() {
            check_key(key, contextualization)?;
            check_contextualization(self, contextualization)?;
        }
        Ok(())
    }
}
