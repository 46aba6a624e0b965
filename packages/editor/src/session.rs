//! # Edit Session Management
//!
//! One author's optimistic view of a story.
//!
//! An EditSession keeps the last snapshot confirmed by the server (`base`)
//! and a local projection (`story`) equal to `base` with every pending
//! command replayed on top. The projection can always be discarded and
//! rebuilt; the server copy wins.

use chrono::Utc;

use crate::commands::StoryCommand;
use crate::errors::IntegrityError;
use crate::story::Story;

/// Command waiting for server acknowledgment
#[derive(Debug, Clone)]
pub struct PendingCommand {
    /// Unique command ID (`{user}-{n}`)
    pub id: String,

    pub command: StoryCommand,

    /// When it was applied locally (milliseconds since epoch)
    pub timestamp: i64,
}

/// One author's edit session
pub struct EditSession {
    pub user_id: String,
    base: Story,
    story: Story,
    pending: Vec<PendingCommand>,
    next_seq: u64,
}

impl EditSession {
    pub fn new(user_id: impl Into<String>, story: Story) -> Self {
        Self {
            user_id: user_id.into(),
            base: story.clone(),
            story,
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    /// Apply a command to the local projection and queue it for the server.
    ///
    /// A command that fails locally is neither applied nor queued.
    pub fn apply_optimistic(&mut self, command: StoryCommand) -> Result<String, IntegrityError> {
        self.story = command.apply(&self.story)?;

        let id = format!("{}-{}", self.user_id, self.next_seq);
        self.next_seq += 1;

        self.pending.push(PendingCommand {
            id: id.clone(),
            command,
            timestamp: Utc::now().timestamp_millis(),
        });

        Ok(id)
    }

    /// The server accepted a command: fold it into the confirmed base.
    ///
    /// Returns `false` for an unknown id.
    pub fn confirm(&mut self, command_id: &str) -> bool {
        let Some(index) = self.pending.iter().position(|p| p.id == command_id) else {
            return false;
        };

        let confirmed = self.pending.remove(index);
        match confirmed.command.apply(&self.base) {
            Ok(base) => self.base = base,
            Err(error) => {
                // out-of-order confirmation; the next rebase brings the server copy
                tracing::debug!(
                    user_id = %self.user_id,
                    command_id,
                    %error,
                    "Confirmed command does not apply to base"
                );
            }
        }
        true
    }

    /// The server refused a command: drop it and rebuild the projection.
    ///
    /// Returns the ids of every pending command dropped, the rejected one
    /// first.
    pub fn reject(&mut self, command_id: &str) -> Vec<String> {
        let Some(index) = self.pending.iter().position(|p| p.id == command_id) else {
            return Vec::new();
        };

        let rejected = self.pending.remove(index);
        tracing::warn!(
            user_id = %self.user_id,
            command_id,
            command = rejected.command.name(),
            "Command rejected by server"
        );

        let mut dropped = vec![rejected.id];
        dropped.extend(self.replay());
        dropped
    }

    /// Rebase local state on the server copy.
    ///
    /// When the server sends an update, we:
    /// 1. Replace the base with the server's version
    /// 2. Replay pending commands on top
    ///
    /// Commands that no longer apply (e.g. their section was deleted by
    /// another author) are dropped; their ids are returned.
    pub fn rebase(&mut self, server_story: Story) -> Vec<String> {
        self.base = server_story;
        self.replay()
    }

    fn replay(&mut self) -> Vec<String> {
        let pending = std::mem::take(&mut self.pending);
        let mut story = self.base.clone();
        let mut dropped = Vec::new();

        for pc in pending {
            match pc.command.apply(&story) {
                Ok(next) => {
                    story = next;
                    self.pending.push(pc);
                }
                Err(error) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        command_id = %pc.id,
                        %error,
                        "Dropping pending command"
                    );
                    dropped.push(pc.id);
                }
            }
        }

        self.story = story;
        dropped
    }

    /// Local projection, pending commands included
    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Last snapshot confirmed by the server
    pub fn base(&self) -> &Story {
        &self.base
    }

    pub fn pending(&self) -> &[PendingCommand] {
        &self.pending
    }

    /// Get number of pending commands
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::Section;

    fn create(id: &str) -> StoryCommand {
        StoryCommand::CreateSection {
            section_id: id.into(),
            section: Section::new(id, id.to_uppercase()),
        }
    }

    #[test]
    fn test_session_creation() {
        let session = EditSession::new("client-1", Story::new_default("S"));

        assert_eq!(session.user_id, "client-1");
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.story(), session.base());
    }

    #[test]
    fn test_optimistic_commands() {
        let mut session = EditSession::new("client-1", Story::new_default("S"));

        let id = session.apply_optimistic(create("a")).unwrap();
        assert_eq!(id, "client-1-0");
        assert!(session.story().section("a").is_some());
        assert!(session.base().section("a").is_none());

        assert!(session.apply_optimistic(create("a")).is_err());
        assert_eq!(session.pending_count(), 1);
    }

    #[test]
    fn test_confirm_advances_base() {
        let mut session = EditSession::new("client-1", Story::new_default("S"));
        let id = session.apply_optimistic(create("a")).unwrap();

        assert!(session.confirm(&id));
        assert!(!session.confirm(&id));
        assert_eq!(session.pending_count(), 0);
        assert!(session.base().section("a").is_some());
    }

    #[test]
    fn test_reject_drops_dependent_commands() {
        let mut session = EditSession::new("client-1", Story::new_default("S"));
        let first = session.apply_optimistic(create("a")).unwrap();
        let second = session
            .apply_optimistic(StoryCommand::UpdateSection {
                section_id: "a".into(),
                section: Section::new("a", "Renamed"),
            })
            .unwrap();
        session.apply_optimistic(create("b")).unwrap();

        let dropped = session.reject(&first);
        assert_eq!(dropped, vec![first, second]);
        assert_eq!(session.pending_count(), 1);
        assert_eq!(session.story().sections_order.as_slice(), ["b".to_string()]);
    }

    #[test]
    fn test_rebase_replays_on_server_copy() {
        let mut session = EditSession::new("client-1", Story::new_default("S"));
        session.apply_optimistic(create("a")).unwrap();

        let server = Story::new_default("S")
            .create_section("z", Section::new("z", "Z"))
            .unwrap();
        let dropped = session.rebase(server);

        assert!(dropped.is_empty());
        assert_eq!(
            session.story().sections_order.as_slice(),
            ["z".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_rebase_drops_conflicting_command() {
        let mut session = EditSession::new("client-1", Story::new_default("S"));
        let id = session.apply_optimistic(create("a")).unwrap();

        // another author created the same section first
        let server = Story::new_default("S")
            .create_section("a", Section::new("a", "Theirs"))
            .unwrap();
        let dropped = session.rebase(server);

        assert_eq!(dropped, vec![id]);
        assert_eq!(session.story().section("a").unwrap().title(), "Theirs");
    }
}
