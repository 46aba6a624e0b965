use quire_editor::Story;

use crate::remote::{StoryDirectory, StorySummary};

/// Handle for an in-flight story fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    story_id: String,
}

impl FetchTicket {
    pub fn story_id(&self) -> &str {
        &self.story_id
    }
}

/// Stories directory plus the story open for editing
#[derive(Debug, Default)]
pub struct StoriesState {
    directory: StoryDirectory,
    active: Option<Story>,
    latest_request: Option<FetchTicket>,
    next_seq: u64,
}

impl StoriesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(&self) -> &StoryDirectory {
        &self.directory
    }

    pub fn set_directory(&mut self, directory: StoryDirectory) {
        self.directory = directory;
    }

    pub fn upsert_summary(&mut self, summary: StorySummary) {
        self.directory.insert(summary.id.clone(), summary);
    }

    /// Forget a story; closes it if it was active
    pub fn remove_story(&mut self, story_id: &str) -> bool {
        if self.active_id() == Some(story_id) {
            self.unset_active();
        }
        self.directory.remove(story_id).is_some()
    }

    /// Start fetching a story; any earlier ticket becomes stale
    pub fn request_active(&mut self, story_id: &str) -> FetchTicket {
        self.next_seq += 1;
        let ticket = FetchTicket {
            seq: self.next_seq,
            story_id: story_id.to_string(),
        };
        self.latest_request = Some(ticket.clone());
        ticket
    }

    /// Apply a fetched story if it still answers the latest request.
    ///
    /// Returns `false` (and changes nothing) for a stale result.
    pub fn resolve_active(&mut self, ticket: &FetchTicket, story: Story) -> bool {
        if self.latest_request.as_ref() != Some(ticket) || story.id != ticket.story_id {
            tracing::warn!(
                story_id = %story.id,
                requested = %ticket.story_id,
                "Discarding stale story fetch"
            );
            return false;
        }

        self.latest_request = None;
        self.active = Some(story);
        true
    }

    /// Replace the active story with a newer copy of the same story.
    ///
    /// Returns `false` when another story (or none) is active.
    pub fn replace_active(&mut self, story: Story) -> bool {
        if self.active_id() != Some(story.id.as_str()) {
            tracing::warn!(story_id = %story.id, "Discarding result for inactive story");
            return false;
        }
        self.active = Some(story);
        true
    }

    pub fn unset_active(&mut self) {
        self.active = None;
        self.latest_request = None;
    }

    pub fn active(&self) -> Option<&Story> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|story| story.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_request_wins() {
        let mut state = StoriesState::new();
        let first = state.request_active("a");
        let second = state.request_active("b");

        // "a" arrives last but was superseded
        assert!(state.resolve_active(&second, Story::new_default("b")));
        assert!(!state.resolve_active(&first, Story::new_default("a")));
        assert_eq!(state.active_id(), Some("b"));
    }

    #[test]
    fn test_result_for_other_story_is_discarded() {
        let mut state = StoriesState::new();
        let ticket = state.request_active("a");
        assert!(!state.resolve_active(&ticket, Story::new_default("z")));
        assert!(state.active().is_none());
    }

    #[test]
    fn test_closing_invalidates_pending_fetch() {
        let mut state = StoriesState::new();
        let ticket = state.request_active("a");
        state.unset_active();
        assert!(!state.resolve_active(&ticket, Story::new_default("a")));
    }

    #[test]
    fn test_replace_active_requires_same_story() {
        let mut state = StoriesState::new();
        let ticket = state.request_active("a");
        state.resolve_active(&ticket, Story::new_default("a"));

        assert!(!state.replace_active(Story::new_default("b")));
        assert!(state.replace_active(Story::new_default("a").with_title("New")));
        assert_eq!(state.active().unwrap().metadata.title, "New");
    }

    #[test]
    fn test_remove_active_story() {
        let mut state = StoriesState::new();
        let story = Story::new_default("a");
        state.upsert_summary(StorySummary::of(&story, None));
        let ticket = state.request_active("a");
        state.resolve_active(&ticket, story);

        assert!(state.remove_story("a"));
        assert!(state.active().is_none());
        assert!(state.directory().is_empty());
    }
}
