//! # Quire Editor
//!
//! Core story editing engine for Quire.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ locks: who may edit which location          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ pipeline: StoryCommand dispatch             │
//! │  - Consult locks before applying            │
//! │  - Apply through the entity store           │
//! │  - Cascade deletions (integrity)            │
//! │  - Keep sectionsOrder a permutation (order) │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Story snapshot (structurally shared)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are immutable**: every operation returns a new `Story`
//! 2. **Untouched collections are shared**: change detection is a pointer compare
//! 3. **Integrity before commit**: a failed operation leaves no partial state
//! 4. **Advisory locks**: locks gate dispatch, never the store itself
//! 5. **Server authority**: a client projection defers to the server copy
//!
//! ## Usage
//!
//! ### Single-author editing
//!
//! ```rust
//! use quire_editor::{Section, Story};
//!
//! let story = Story::new_default("story-1")
//!     .create_section("intro", Section::new("intro", "Introduction"))?
//!     .create_section("body", Section::new("body", "Body"))?
//!     .move_section(1, 0)?;
//!
//! assert_eq!(story.sections_order.as_slice(), ["body", "intro"]);
//! # Ok::<(), quire_editor::IntegrityError>(())
//! ```
//!
//! ### Collaborative editing
//!
//! ```rust
//! use quire_editor::{DispatchOutcome, EditPipeline, LockLocation, Section, Story, StoryCommand};
//!
//! let story = Story::new_default("story-1")
//!     .create_section("intro", Section::new("intro", "Introduction"))?;
//! let mut pipeline = EditPipeline::new(story);
//!
//! pipeline.enter_block("ada", LockLocation::section("intro"));
//!
//! let outcome = pipeline.dispatch(
//!     "grace",
//!     StoryCommand::UpdateSection {
//!         section_id: "intro".into(),
//!         section: Section::new("intro", "Preface"),
//!     },
//! )?;
//! assert!(matches!(outcome, DispatchOutcome::Blocked { .. }));
//! # Ok::<(), quire_editor::IntegrityError>(())
//! ```

mod activity;
mod commands;
mod errors;
mod integrity;
mod locks;
mod order;
mod pipeline;
mod schema;
mod session;
mod store;
mod story;

pub use activity::{describe_activity, Activity};
pub use commands::StoryCommand;
pub use errors::{EntityKind, ImportError, IntegrityError};
pub use integrity::{
    check_contextualization, dangling_references, orphaned_contextualizations, CascadePlan,
};
pub use locks::{
    ActiveAuthor, ActiveUser, ActiveUsers, LockLocation, LockMap, LockOutcome,
    MetadataLockStatus, StoryLocks, UserLocks,
};
pub use order::{array_move, check_permutation, SectionsOrder};
pub use pipeline::{changed_collections, Collection, DispatchOutcome, EditPipeline};
pub use schema::{check_story, export_story, import_story, validate_story, SchemaViolation};
pub use session::{EditSession, PendingCommand};
pub use story::{
    Contextualization, Contextualizer, Entity, EntityMap, Resource, ResourceMetadata, Section,
    SectionMetadata, Story, StoryMetadata, StorySettings, COPY_TITLE_SUFFIX, DEFAULT_TEMPLATE,
};
