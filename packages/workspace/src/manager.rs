//! # Stories Manager
//!
//! The asynchronous boundary around the editor core.
//!
//! ```text
//!   author action
//!        ↓
//!   Workspace ──► StoryStore / CredentialService   (suspends: pending)
//!        ↓                  ↓
//!   StatusBoard ◄── success / failure              (auto-cleared)
//!        ↓
//!   StoriesState (stale results discarded)
//!        ↓
//!   broadcast::Sender<BroadcastUpdate> ──► other clients
//! ```
//!
//! Remote calls are never retried; a failure is recorded on the status board
//! and returned to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use quire_editor::{import_story, Story, StoryCommand};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::{RemoteError, WorkspaceError, WorkspaceResult};
use crate::remote::{Credential, CredentialService, StoryDirectory, StoryStore, StorySummary};
use crate::state::StoriesState;
use crate::status::{Phase, RemoteOperation, StatusBoard};
use crate::tokens::TokenStore;

pub const DEFAULT_STATUS_RESET_MS: u64 = 8000;

const BROADCAST_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    /// How long a success or failure message stays displayed
    pub status_reset_delay: Duration,

    /// Identifies this client in broadcast updates
    pub client_id: String,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            status_reset_delay: Duration::from_millis(DEFAULT_STATUS_RESET_MS),
            client_id: Uuid::new_v4().to_string(),
        }
    }
}

/// A change other clients need to hear about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum StoryEvent {
    Created { summary: StorySummary },
    Updated { story: Story },
    Deleted { story_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastUpdate {
    /// Client that produced the event
    pub origin: String,
    pub event: StoryEvent,

    /// Milliseconds since epoch
    pub timestamp: i64,
}

pub struct Workspace<S, C, T> {
    store: Arc<S>,
    credentials: Arc<C>,
    tokens: Mutex<T>,
    state: Mutex<StoriesState>,
    status: StatusBoard,
    events: broadcast::Sender<BroadcastUpdate>,
    options: WorkspaceOptions,
}

impl<S, C, T> Workspace<S, C, T>
where
    S: StoryStore,
    C: CredentialService,
    T: TokenStore,
{
    /// Create a workspace; loads the token store
    pub fn new(
        store: Arc<S>,
        credentials: Arc<C>,
        mut tokens: T,
        options: WorkspaceOptions,
    ) -> WorkspaceResult<Self> {
        tokens.init()?;
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);

        Ok(Self {
            store,
            credentials,
            tokens: Mutex::new(tokens),
            state: Mutex::new(StoriesState::new()),
            status: StatusBoard::new(options.status_reset_delay),
            events,
            options,
        })
    }

    async fn track<R, F>(&self, operation: RemoteOperation, call: F) -> Result<R, RemoteError>
    where
        F: Future<Output = Result<R, RemoteError>>,
    {
        self.status.record(operation, Phase::Pending, None);

        match call.await {
            Ok(value) => {
                tracing::info!(?operation, "Remote operation succeeded");
                self.status.record(operation, Phase::Success, None);
                Ok(value)
            }
            Err(error) => {
                tracing::warn!(?operation, %error, "Remote operation failed");
                self.status
                    .record(operation, Phase::Failure, Some(error.to_string()));
                Err(error)
            }
        }
    }

    fn token_for(&self, story_id: &str) -> WorkspaceResult<String> {
        self.tokens
            .lock()
            .get(story_id)
            .ok_or_else(|| WorkspaceError::MissingToken(story_id.to_string()))
    }

    fn publish(&self, event: StoryEvent) {
        let update = BroadcastUpdate {
            origin: self.options.client_id.clone(),
            event,
            timestamp: Utc::now().timestamp_millis(),
        };
        // no subscriber is fine
        let _ = self.events.send(update);
    }

    // ---------------------------------------------------------------------
    // Directory
    // ---------------------------------------------------------------------

    pub async fn fetch_all(&self) -> WorkspaceResult<StoryDirectory> {
        let directory = self
            .track(RemoteOperation::FetchAll, self.store.fetch_all())
            .await?;
        self.state.lock().set_directory(directory.clone());
        Ok(directory)
    }

    pub fn directory(&self) -> StoryDirectory {
        self.state.lock().directory().clone()
    }

    // ---------------------------------------------------------------------
    // Active story
    // ---------------------------------------------------------------------

    /// Fetch a story and make it active.
    ///
    /// Resolves to `None` when a later `open_story` or `close_story`
    /// superseded this one while it was in flight.
    pub async fn open_story(&self, story_id: &str) -> WorkspaceResult<Option<Story>> {
        let ticket = self.state.lock().request_active(story_id);
        let story = self
            .track(RemoteOperation::FetchStory, self.store.fetch(story_id))
            .await?;

        let applied = self.state.lock().resolve_active(&ticket, story.clone());
        Ok(applied.then_some(story))
    }

    pub fn close_story(&self) {
        self.state.lock().unset_active();
    }

    pub fn active_story(&self) -> Option<Story> {
        self.state.lock().active().cloned()
    }

    /// Replace the active story with the server copy
    pub async fn refresh_active(&self) -> WorkspaceResult<Option<Story>> {
        let ticket = {
            let mut state = self.state.lock();
            let story_id = state
                .active_id()
                .map(str::to_string)
                .ok_or(WorkspaceError::NoActiveStory)?;
            state.request_active(&story_id)
        };

        let story = self
            .track(RemoteOperation::UpdateStory, self.store.update(ticket.story_id()))
            .await?;

        let applied = self.state.lock().resolve_active(&ticket, story.clone());
        Ok(applied.then_some(story))
    }

    /// Run a command against the active story (local only; see `save_story`)
    pub fn apply_to_active(&self, command: &StoryCommand) -> WorkspaceResult<Story> {
        let mut state = self.state.lock();
        let next = {
            let active = state.active().ok_or(WorkspaceError::NoActiveStory)?;
            command.apply(active)?
        };
        tracing::debug!(story_id = %next.id, command = command.name(), "Applied to active story");
        state.replace_active(next.clone());
        Ok(next)
    }

    /// Publish the active story to the server
    pub async fn save_story(&self) -> WorkspaceResult<Story> {
        let story = self.active_story().ok_or(WorkspaceError::NoActiveStory)?;
        let token = self.token_for(&story.id)?;

        let saved = self
            .track(RemoteOperation::SaveStory, self.store.save(&story, &token))
            .await?;

        {
            let mut state = self.state.lock();
            state.replace_active(saved.clone());
            state.upsert_summary(StorySummary::of(&saved, Some(Utc::now())));
        }
        self.publish(StoryEvent::Updated {
            story: saved.clone(),
        });
        Ok(saved)
    }

    // ---------------------------------------------------------------------
    // Story lifecycle
    // ---------------------------------------------------------------------

    /// Create a story on the server protected by `password`
    pub async fn create_story(&self, story: Story, password: &str) -> WorkspaceResult<Story> {
        let credential = Credential::new(story.id.clone(), password);

        let (created, token) = self
            .track(RemoteOperation::CreateStory, async {
                let created = self.store.create(story).await?;
                let token = self.credentials.create_credential(&credential).await?;
                Ok::<_, RemoteError>((created, token))
            })
            .await?;

        self.tokens.lock().set(&created.id, &token)?;

        let summary = StorySummary::of(&created, Some(Utc::now()));
        self.state.lock().upsert_summary(summary.clone());
        self.publish(StoryEvent::Created { summary });
        Ok(created)
    }

    /// Duplicate a server story under a fresh id
    pub async fn copy_story(&self, story_id: &str, password: &str) -> WorkspaceResult<Story> {
        let copy = self
            .track(RemoteOperation::CopyStory, async {
                let source = self.store.fetch(story_id).await?;
                Ok::<_, RemoteError>(source.copy_with_id(Uuid::new_v4().to_string()))
            })
            .await?;

        self.create_story(copy, password).await
    }

    /// Delete a story and its credential
    pub async fn delete_story(&self, story_id: &str) -> WorkspaceResult<()> {
        let token = self.token_for(story_id)?;

        self.track(RemoteOperation::DeleteStory, async {
            self.store.delete(story_id, &token).await?;
            self.credentials.delete_credential(story_id, &token).await
        })
        .await?;

        self.tokens.lock().clear(story_id)?;
        self.state.lock().remove_story(story_id);
        self.publish(StoryEvent::Deleted {
            story_id: story_id.to_string(),
        });
        Ok(())
    }

    /// Parse an exported story and open it locally.
    ///
    /// An id already present in the directory is refused unless
    /// `overwrite` is set.
    pub fn import(&self, source: &str, overwrite: bool) -> WorkspaceResult<Story> {
        let story = import_story(source)?;

        let mut state = self.state.lock();
        if !overwrite && state.directory().contains_key(&story.id) {
            return Err(WorkspaceError::AlreadyExists(story.id));
        }
        let ticket = state.request_active(&story.id);
        state.resolve_active(&ticket, story.clone());
        Ok(story)
    }

    // ---------------------------------------------------------------------
    // Credentials
    // ---------------------------------------------------------------------

    pub async fn login(&self, story_id: &str, password: &str) -> WorkspaceResult<()> {
        let credential = Credential::new(story_id, password);
        let token = self
            .track(RemoteOperation::LoginStory, self.credentials.login(&credential))
            .await?;
        self.tokens.lock().set(story_id, &token)?;
        Ok(())
    }

    pub async fn change_password(&self, story_id: &str, new_password: &str) -> WorkspaceResult<()> {
        let token = self.token_for(story_id)?;
        let credential = Credential::new(story_id, new_password);

        let token = self
            .track(
                RemoteOperation::ChangePassword,
                self.credentials.reset_password(&credential, &token),
            )
            .await?;
        self.tokens.lock().set(story_id, &token)?;
        Ok(())
    }

    /// Drop the token of a story
    pub fn logout(&self, story_id: &str) -> WorkspaceResult<()> {
        self.tokens.lock().clear(story_id)?;
        Ok(())
    }

    pub fn has_token(&self, story_id: &str) -> bool {
        self.tokens.lock().get(story_id).is_some()
    }

    // ---------------------------------------------------------------------
    // Cross-client updates
    // ---------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastUpdate> {
        self.events.subscribe()
    }

    /// Merge an update published by another client.
    ///
    /// Own updates are ignored. A newer copy of the active story replaces
    /// it wholesale. Returns whether local state changed.
    pub fn apply_broadcast(&self, update: &BroadcastUpdate) -> bool {
        if update.origin == self.options.client_id {
            return false;
        }

        let mut state = self.state.lock();
        match &update.event {
            StoryEvent::Created { summary } => {
                state.upsert_summary(summary.clone());
                true
            }
            StoryEvent::Updated { story } => {
                state.upsert_summary(StorySummary::of(story, Some(Utc::now())));
                if state.active_id() == Some(story.id.as_str()) {
                    state.replace_active(story.clone());
                }
                true
            }
            StoryEvent::Deleted { story_id } => state.remove_story(story_id),
        }
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn client_id(&self) -> &str {
        &self.options.client_id
    }
}
