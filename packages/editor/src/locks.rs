//! # Lock Coordinator
//!
//! Advisory locking over editable locations of a story.
//!
//! ```text
//! LockMap
//!  └── storyId → StoryLocks
//!                 └── userId → UserLocks [location, location, ...]
//! ```
//!
//! ## Semantics
//!
//! - Exclusive locations (`storyMetadata`, `sectionsOrder`, one section, one
//!   resource, ...) can be held by a single user at a time. A conflicting
//!   `enter_block` is rejected and changes nothing.
//! - Presence locations (`summary`, `library`, `design`) only record where a
//!   user is; any number of users may hold them.
//! - A user holds at most one location per kind. Entering another section
//!   moves that user's section lock, keeping its place in discovery order.
//! - `leave_block` on a location the user does not hold is a no-op.
//! - Nothing expires here: heartbeats and timeouts belong to the connection
//!   layer that feeds this map.
//!
//! Locks gate mutations at dispatch time (see [`crate::EditPipeline`]); the
//! entity store itself never looks at them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// An editable (or viewable) location inside a story
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "location")]
pub enum LockLocation {
    #[serde(rename = "summary")]
    Summary,

    #[serde(rename = "library")]
    Library,

    #[serde(rename = "design")]
    Design,

    #[serde(rename = "storyMetadata")]
    StoryMetadata,

    #[serde(rename = "sectionsOrder")]
    SectionsOrder,

    #[serde(rename = "sections")]
    Section {
        #[serde(rename = "blockId")]
        block_id: String,
    },

    #[serde(rename = "resources")]
    Resource {
        #[serde(rename = "blockId")]
        block_id: String,
    },

    #[serde(rename = "other")]
    Other { name: String },
}

impl LockLocation {
    pub fn section(block_id: impl Into<String>) -> Self {
        LockLocation::Section {
            block_id: block_id.into(),
        }
    }

    pub fn resource(block_id: impl Into<String>) -> Self {
        LockLocation::Resource {
            block_id: block_id.into(),
        }
    }

    /// Name of the location kind
    pub fn kind(&self) -> &str {
        match self {
            LockLocation::Summary => "summary",
            LockLocation::Library => "library",
            LockLocation::Design => "design",
            LockLocation::StoryMetadata => "storyMetadata",
            LockLocation::SectionsOrder => "sectionsOrder",
            LockLocation::Section { .. } => "sections",
            LockLocation::Resource { .. } => "resources",
            LockLocation::Other { .. } => "other",
        }
    }

    /// Whether both locations occupy the same per-user slot.
    ///
    /// A user holds one lock per kind; named `other` locations get one slot
    /// per name, so they never displace a built-in kind.
    fn same_slot(&self, other: &LockLocation) -> bool {
        match (self, other) {
            (LockLocation::Other { name: a }, LockLocation::Other { name: b }) => a == b,
            _ => self.kind() == other.kind(),
        }
    }

    /// Presence locations are shared; every other location is exclusive
    pub fn is_presence(&self) -> bool {
        matches!(
            self,
            LockLocation::Summary | LockLocation::Library | LockLocation::Design
        )
    }

    pub fn block_id(&self) -> Option<&str> {
        match self {
            LockLocation::Section { block_id } | LockLocation::Resource { block_id } => {
                Some(block_id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockLocation::Other { name } => write!(f, "other/{}", name),
            _ => match self.block_id() {
                Some(block_id) => write!(f, "{}/{}", self.kind(), block_id),
                None => f.write_str(self.kind()),
            },
        }
    }
}

/// Result of an `enter_block` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// The location is now held by the requesting user
    Granted,
    /// The requesting user already held it
    AlreadyHeld,
    /// Another user holds it; nothing changed
    Rejected { holder: String },
}

impl LockOutcome {
    pub fn is_granted(&self) -> bool {
        !matches!(self, LockOutcome::Rejected { .. })
    }
}

/// Locations held by one user, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserLocks(Vec<LockLocation>);

impl UserLocks {
    pub fn locations(&self) -> &[LockLocation] {
        &self.0
    }

    pub fn holds(&self, location: &LockLocation) -> bool {
        self.0.contains(location)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn slot_position(&self, location: &LockLocation) -> Option<usize> {
        self.0.iter().position(|held| held.same_slot(location))
    }
}

/// Lock records of every user present in one story
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLocks {
    #[serde(default)]
    pub locks: BTreeMap<String, UserLocks>,
}

impl StoryLocks {
    /// First user other than `user_id` holding `location`
    fn conflicting_holder(&self, user_id: &str, location: &LockLocation) -> Option<&str> {
        self.locks
            .iter()
            .find(|(holder, locks)| holder.as_str() != user_id && locks.holds(location))
            .map(|(holder, _)| holder.as_str())
    }
}

/// Presence record supplied by the connection layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveUser {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// userId → presence record
pub type ActiveUsers = BTreeMap<String, ActiveUser>;

/// An active user together with the locks held in a story
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAuthor<'a> {
    pub user_id: &'a str,
    pub user: &'a ActiveUser,
    pub locks: &'a [LockLocation],
}

/// Lock state of the story metadata as seen by one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataLockStatus {
    Open,
    EditedByYou,
    LockedBy(String),
}

/// Per-story lock map
#[derive(Debug, Clone, Default)]
pub struct LockMap {
    stories: HashMap<String, StoryLocks>,
}

impl LockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `location` for `user_id`
    pub fn enter_block(&mut self, story_id: &str, user_id: &str, location: LockLocation) -> LockOutcome {
        let story = self.stories.entry(story_id.to_string()).or_default();

        if !location.is_presence() {
            if let Some(holder) = story.conflicting_holder(user_id, &location) {
                tracing::warn!(
                    story_id,
                    user_id,
                    holder,
                    location = %location,
                    "Lock request rejected"
                );
                return LockOutcome::Rejected {
                    holder: holder.to_string(),
                };
            }
        }

        let user = story.locks.entry(user_id.to_string()).or_default();
        if user.holds(&location) {
            return LockOutcome::AlreadyHeld;
        }

        match user.slot_position(&location) {
            Some(index) => user.0[index] = location.clone(),
            None => user.0.push(location.clone()),
        }

        tracing::info!(story_id, user_id, location = %location, "Lock granted");
        LockOutcome::Granted
    }

    /// Release `location` if `user_id` holds it; returns whether anything changed
    pub fn leave_block(&mut self, story_id: &str, user_id: &str, location: &LockLocation) -> bool {
        let Some(story) = self.stories.get_mut(story_id) else {
            return false;
        };
        let Some(user) = story.locks.get_mut(user_id) else {
            return false;
        };
        let Some(index) = user.0.iter().position(|held| held == location) else {
            return false;
        };

        user.0.remove(index);
        if user.is_empty() {
            story.locks.remove(user_id);
        }
        if story.locks.is_empty() {
            self.stories.remove(story_id);
        }

        tracing::info!(story_id, user_id, location = %location, "Lock released");
        true
    }

    /// Release every lock `user_id` holds in a story
    pub fn leave_story(&mut self, story_id: &str, user_id: &str) -> Vec<LockLocation> {
        let Some(story) = self.stories.get_mut(story_id) else {
            return Vec::new();
        };
        let released = story
            .locks
            .remove(user_id)
            .map(|locks| locks.0)
            .unwrap_or_default();
        if story.locks.is_empty() {
            self.stories.remove(story_id);
        }

        if !released.is_empty() {
            tracing::info!(story_id, user_id, count = released.len(), "Left story");
        }
        released
    }

    pub fn story(&self, story_id: &str) -> Option<&StoryLocks> {
        self.stories.get(story_id)
    }

    /// Locations held by a user, in discovery order
    pub fn locks_of(&self, story_id: &str, user_id: &str) -> &[LockLocation] {
        self.stories
            .get(story_id)
            .and_then(|story| story.locks.get(user_id))
            .map(UserLocks::locations)
            .unwrap_or(&[])
    }

    /// A user holding `location`, if any
    pub fn holder(&self, story_id: &str, location: &LockLocation) -> Option<&str> {
        self.stories.get(story_id).and_then(|story| {
            story
                .locks
                .iter()
                .find(|(_, locks)| locks.holds(location))
                .map(|(user_id, _)| user_id.as_str())
        })
    }

    /// Users present in a story
    pub fn users(&self, story_id: &str) -> impl Iterator<Item = &str> {
        self.stories
            .get(story_id)
            .into_iter()
            .flat_map(|story| story.locks.keys().map(String::as_str))
    }

    /// sectionId → userId for every locked section of a story
    pub fn section_holders(&self, story_id: &str) -> BTreeMap<&str, &str> {
        let mut holders = BTreeMap::new();
        if let Some(story) = self.stories.get(story_id) {
            for (user_id, locks) in &story.locks {
                for location in locks.locations() {
                    if let LockLocation::Section { block_id } = location {
                        holders.insert(block_id.as_str(), user_id.as_str());
                    }
                }
            }
        }
        holders
    }

    /// Metadata lock state from the point of view of `user_id`
    pub fn metadata_status(&self, story_id: &str, user_id: &str) -> MetadataLockStatus {
        match self.holder(story_id, &LockLocation::StoryMetadata) {
            Some(holder) if holder == user_id => MetadataLockStatus::EditedByYou,
            Some(holder) => MetadataLockStatus::LockedBy(holder.to_string()),
            None => MetadataLockStatus::Open,
        }
    }

    /// Active users that hold at least one lock in a story
    pub fn active_authors<'a>(
        &'a self,
        story_id: &str,
        active_users: &'a ActiveUsers,
    ) -> Vec<ActiveAuthor<'a>> {
        let Some(story) = self.stories.get(story_id) else {
            return Vec::new();
        };
        active_users
            .iter()
            .filter_map(|(user_id, user)| {
                story.locks.get(user_id).map(|locks| ActiveAuthor {
                    user_id: user_id.as_str(),
                    user,
                    locks: locks.locations(),
                })
            })
            .collect()
    }
}
