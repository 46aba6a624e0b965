//! Interfaces of the remote collaborators.
//!
//! Every call suspends; the synchronous editor logic only ever runs on the
//! resolved payload.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quire_editor::{Story, StoryMetadata};
use serde::{Deserialize, Serialize};

use crate::errors::RemoteError;

/// Directory entry for one story on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySummary {
    pub id: String,
    pub metadata: StoryMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl StorySummary {
    pub fn of(story: &Story, last_update: Option<DateTime<Utc>>) -> Self {
        Self {
            id: story.id.clone(),
            metadata: story.metadata.clone(),
            last_update,
        }
    }
}

/// story id → summary
pub type StoryDirectory = BTreeMap<String, StorySummary>;

/// Story id and password pair sent to the credential service
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub password: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("password", &"***")
            .finish()
    }
}

#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn fetch_all(&self) -> Result<StoryDirectory, RemoteError>;

    async fn fetch(&self, story_id: &str) -> Result<Story, RemoteError>;

    async fn create(&self, story: Story) -> Result<Story, RemoteError>;

    /// Re-fetch a story to replace the local copy
    async fn update(&self, story_id: &str) -> Result<Story, RemoteError> {
        self.fetch(story_id).await
    }

    /// Publish a snapshot; the server echoes back what it stored
    async fn save(&self, story: &Story, token: &str) -> Result<Story, RemoteError>;

    /// Delete a story, resolving to its id
    async fn delete(&self, story_id: &str, token: &str) -> Result<String, RemoteError>;
}

/// Tokens are opaque bearer strings
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn create_credential(&self, credential: &Credential) -> Result<String, RemoteError>;

    async fn login(&self, credential: &Credential) -> Result<String, RemoteError>;

    async fn reset_password(&self, credential: &Credential, token: &str) -> Result<String, RemoteError>;

    async fn delete_credential(&self, story_id: &str, token: &str) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_hides_password() {
        let credential = Credential::new("story-1", "hunter2");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("story-1"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_summary_serialization() {
        let story = Story::new_default("s").with_title("Title");
        let summary = StorySummary::of(&story, None);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["id"], "s");
        assert_eq!(json["metadata"]["title"], "Title");
        assert!(json.get("lastUpdate").is_none());
    }
}
