//! In-process story server.
//!
//! Implements both remote interfaces over shared maps. Used by the tests and
//! by embedders running without a server.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use quire_editor::Story;
use uuid::Uuid;

use crate::errors::RemoteError;
use crate::remote::{Credential, CredentialService, StoryDirectory, StoryStore, StorySummary};

struct StoredStory {
    story: Story,
    last_update: DateTime<Utc>,
}

#[derive(Default)]
struct BackendState {
    stories: BTreeMap<String, StoredStory>,
    /// story id → password
    passwords: HashMap<String, String>,
    /// token → story id
    tokens: HashMap<String, String>,
}

impl BackendState {
    fn issue_token(&mut self, story_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), story_id.to_string());
        token
    }

    fn revoke_tokens(&mut self, story_id: &str) {
        self.tokens.retain(|_, id| id != story_id);
    }

    fn authorize(&self, story_id: &str, token: &str) -> Result<(), RemoteError> {
        match self.tokens.get(token) {
            Some(id) if id == story_id => Ok(()),
            _ => Err(RemoteError::Unauthorized),
        }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<BackendState>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a story without going through credentials
    pub fn insert_story(&self, story: Story) {
        self.state.write().stories.insert(
            story.id.clone(),
            StoredStory {
                story,
                last_update: Utc::now(),
            },
        );
    }

    /// Simulate a lost connection: every call fails with a network error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn story_count(&self) -> usize {
        self.state.read().stories.len()
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Network("server unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoryStore for MemoryBackend {
    async fn fetch_all(&self) -> Result<StoryDirectory, RemoteError> {
        self.check_online()?;
        let state = self.state.read();
        Ok(state
            .stories
            .iter()
            .map(|(id, stored)| {
                (
                    id.clone(),
                    StorySummary::of(&stored.story, Some(stored.last_update)),
                )
            })
            .collect())
    }

    async fn fetch(&self, story_id: &str) -> Result<Story, RemoteError> {
        self.check_online()?;
        self.state
            .read()
            .stories
            .get(story_id)
            .map(|stored| stored.story.clone())
            .ok_or_else(|| RemoteError::NotFound(story_id.to_string()))
    }

    async fn create(&self, story: Story) -> Result<Story, RemoteError> {
        self.check_online()?;
        let mut state = self.state.write();
        if state.stories.contains_key(&story.id) {
            return Err(RemoteError::Conflict(story.id));
        }
        state.stories.insert(
            story.id.clone(),
            StoredStory {
                story: story.clone(),
                last_update: Utc::now(),
            },
        );
        Ok(story)
    }

    async fn save(&self, story: &Story, token: &str) -> Result<Story, RemoteError> {
        self.check_online()?;
        let mut state = self.state.write();
        state.authorize(&story.id, token)?;

        let stored = state
            .stories
            .get_mut(&story.id)
            .ok_or_else(|| RemoteError::NotFound(story.id.clone()))?;
        stored.story = story.clone();
        stored.last_update = Utc::now();
        Ok(story.clone())
    }

    async fn delete(&self, story_id: &str, token: &str) -> Result<String, RemoteError> {
        self.check_online()?;
        let mut state = self.state.write();
        state.authorize(story_id, token)?;

        state
            .stories
            .remove(story_id)
            .map(|_| story_id.to_string())
            .ok_or_else(|| RemoteError::NotFound(story_id.to_string()))
    }
}

#[async_trait]
impl CredentialService for MemoryBackend {
    async fn create_credential(&self, credential: &Credential) -> Result<String, RemoteError> {
        self.check_online()?;
        let mut state = self.state.write();
        if state.passwords.contains_key(&credential.id) {
            return Err(RemoteError::Conflict(credential.id.clone()));
        }
        state
            .passwords
            .insert(credential.id.clone(), credential.password.clone());
        Ok(state.issue_token(&credential.id))
    }

    async fn login(&self, credential: &Credential) -> Result<String, RemoteError> {
        self.check_online()?;
        let mut state = self.state.write();
        if state.passwords.get(&credential.id) != Some(&credential.password) {
            return Err(RemoteError::Unauthorized);
        }
        Ok(state.issue_token(&credential.id))
    }

    async fn reset_password(&self, credential: &Credential, token: &str) -> Result<String, RemoteError> {
        self.check_online()?;
        let mut state = self.state.write();
        state.authorize(&credential.id, token)?;

        state
            .passwords
            .insert(credential.id.clone(), credential.password.clone());
        state.revoke_tokens(&credential.id);
        Ok(state.issue_token(&credential.id))
    }

    async fn delete_credential(&self, story_id: &str, token: &str) -> Result<(), RemoteError> {
        self.check_online()?;
        let mut state = self.state.write();
        state.authorize(story_id, token)?;

        state.passwords.remove(story_id);
        state.revoke_tokens(story_id);
        Ok(())
    }
}
