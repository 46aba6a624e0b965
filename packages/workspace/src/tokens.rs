//! Access tokens, keyed by story id.
//!
//! The store is injected into the workspace; nothing reads tokens from an
//! ambient location.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::TokenStoreError;

/// Key-value store for story access tokens
///
/// Lifecycle: `init` on startup, `set` on credential change, `clear` on
/// logout or story deletion.
pub trait TokenStore: Send {
    fn init(&mut self) -> Result<(), TokenStoreError>;

    fn get(&self, story_id: &str) -> Option<String>;

    fn set(&mut self, story_id: &str, token: &str) -> Result<(), TokenStoreError>;

    fn clear(&mut self, story_id: &str) -> Result<(), TokenStoreError>;
}

/// Tokens that live as long as the process
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: BTreeMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn init(&mut self) -> Result<(), TokenStoreError> {
        Ok(())
    }

    fn get(&self, story_id: &str) -> Option<String> {
        self.tokens.get(story_id).cloned()
    }

    fn set(&mut self, story_id: &str, token: &str) -> Result<(), TokenStoreError> {
        self.tokens.insert(story_id.to_string(), token.to_string());
        Ok(())
    }

    fn clear(&mut self, story_id: &str) -> Result<(), TokenStoreError> {
        self.tokens.remove(story_id);
        Ok(())
    }
}

/// Tokens persisted as a JSON object in a file, rewritten on every change
#[derive(Debug)]
pub struct JsonFileTokenStore {
    path: PathBuf,
    tokens: BTreeMap<String, String>,
}

impl JsonFileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.tokens)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl TokenStore for JsonFileTokenStore {
    /// Load the file; a missing file is an empty store
    fn init(&mut self) -> Result<(), TokenStoreError> {
        if !self.path.exists() {
            self.tokens.clear();
            return Ok(());
        }
        let content = std::fs::read_to_string(&self.path)?;
        self.tokens = serde_json::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), count = self.tokens.len(), "Loaded tokens");
        Ok(())
    }

    fn get(&self, story_id: &str) -> Option<String> {
        self.tokens.get(story_id).cloned()
    }

    fn set(&mut self, story_id: &str, token: &str) -> Result<(), TokenStoreError> {
        self.tokens.insert(story_id.to_string(), token.to_string());
        self.persist()
    }

    fn clear(&mut self, story_id: &str) -> Result<(), TokenStoreError> {
        if self.tokens.remove(story_id).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
