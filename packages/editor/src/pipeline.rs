//! # Editing Pipeline
//!
//! Coordinates one story's lifecycle: Lock check → Apply → Cascade → Commit
//!
//! The pipeline manages:
//! - The current story snapshot and its version
//! - The lock map consulted before every command
//! - Change detection between consecutive snapshots

use serde::Serialize;

use crate::commands::StoryCommand;
use crate::errors::IntegrityError;
use crate::locks::{LockLocation, LockMap, LockOutcome};
use crate::story::Story;

/// Top-level parts of a story snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Metadata,
    Settings,
    Sections,
    SectionsOrder,
    Resources,
    Contextualizers,
    Contextualizations,
}

/// Collections of `after` that differ from `before`.
///
/// Entity maps and the order are compared by pointer, so a collection left
/// untouched by a command is never reported.
pub fn changed_collections(before: &Story, after: &Story) -> Vec<Collection> {
    let mut changed = Vec::new();

    if before.metadata != after.metadata {
        changed.push(Collection::Metadata);
    }
    if before.settings != after.settings {
        changed.push(Collection::Settings);
    }
    if !std::sync::Arc::ptr_eq(&before.sections, &after.sections) {
        changed.push(Collection::Sections);
    }
    if !before.sections_order.ptr_eq(&after.sections_order) {
        changed.push(Collection::SectionsOrder);
    }
    if !std::sync::Arc::ptr_eq(&before.resources, &after.resources) {
        changed.push(Collection::Resources);
    }
    if !std::sync::Arc::ptr_eq(&before.contextualizers, &after.contextualizers) {
        changed.push(Collection::Contextualizers);
    }
    if !std::sync::Arc::ptr_eq(&before.contextualizations, &after.contextualizations) {
        changed.push(Collection::Contextualizations);
    }

    changed
}

/// Result of dispatching a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DispatchOutcome {
    /// The command was applied and a new snapshot committed
    Applied {
        version: u64,
        changed: Vec<Collection>,
    },

    /// Another author holds a location the command needs; nothing changed
    Blocked {
        location: LockLocation,
        holder: String,
    },
}

/// Owns one story snapshot and its lock map
pub struct EditPipeline {
    story: Story,
    locks: LockMap,
    version: u64,
}

impl EditPipeline {
    /// Create pipeline for story
    pub fn new(story: Story) -> Self {
        Self {
            story,
            locks: LockMap::new(),
            version: 0,
        }
    }

    /// Dispatch a command on behalf of `user_id`.
    ///
    /// This:
    /// 1. Checks the command's locations against the lock map
    /// 2. Applies the command (cascades included)
    /// 3. Commits the new snapshot and bumps the version
    ///
    /// An integrity failure leaves the current snapshot untouched.
    pub fn dispatch(
        &mut self,
        user_id: &str,
        command: StoryCommand,
    ) -> Result<DispatchOutcome, IntegrityError> {
        for location in command.required_locations() {
            if let Some(holder) = self.locks.holder(&self.story.id, &location) {
                if holder != user_id {
                    tracing::warn!(
                        story_id = %self.story.id,
                        user_id,
                        holder,
                        command = command.name(),
                        location = %location,
                        "Command blocked by lock"
                    );
                    return Ok(DispatchOutcome::Blocked {
                        holder: holder.to_string(),
                        location,
                    });
                }
            }
        }

        let next = command.apply(&self.story)?;
        let changed = changed_collections(&self.story, &next);

        self.story = next;
        self.version += 1;

        tracing::debug!(
            story_id = %self.story.id,
            user_id,
            command = command.name(),
            version = self.version,
            "Command applied"
        );

        Ok(DispatchOutcome::Applied {
            version: self.version,
            changed,
        })
    }

    pub fn enter_block(&mut self, user_id: &str, location: LockLocation) -> LockOutcome {
        let story_id = self.story.id.clone();
        self.locks.enter_block(&story_id, user_id, location)
    }

    pub fn leave_block(&mut self, user_id: &str, location: &LockLocation) -> bool {
        let story_id = self.story.id.clone();
        self.locks.leave_block(&story_id, user_id, location)
    }

    /// Release every lock held by a departing author
    pub fn leave_story(&mut self, user_id: &str) -> Vec<LockLocation> {
        let story_id = self.story.id.clone();
        self.locks.leave_story(&story_id, user_id)
    }

    /// Replace the snapshot wholesale (e.g. after a server round-trip).
    ///
    /// Locks are kept; the version is bumped.
    pub fn replace_story(&mut self, story: Story) -> u64 {
        self.story = story;
        self.version += 1;
        self.version
    }

    /// Get current story
    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn locks(&self) -> &LockMap {
        &self.locks
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
