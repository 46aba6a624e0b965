//! Human-readable "who is editing what" status lines.

use std::fmt;

use crate::locks::{ActiveUsers, LockLocation, LockMap};
use crate::story::Story;

/// What a user is doing in a story, derived from the locks they hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    OnSummary { name: String },
    /// `title` is `None` when the section is not in the story anymore
    EditingSection { name: String, title: Option<String> },
    EditingSettings { name: String },
    WorkingOn { name: String, location: String },
    WorkingOnTwo { name: String, first: String, second: String },
    Idle { name: String },
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::OnSummary { name } => write!(f, "{} is here on the summary", name),
            Activity::EditingSection { name, title: Some(title) } => {
                write!(f, "{} is working on section \"{}\"", name, title)
            }
            Activity::EditingSection { name, title: None } => {
                write!(f, "{} is working on a section", name)
            }
            Activity::EditingSettings { name } => write!(f, "{} is editing story settings", name),
            Activity::WorkingOn { name, location } => write!(f, "{} is working on {}", name, location),
            Activity::WorkingOnTwo { name, first, second } => {
                write!(f, "{} is working on {} and {}", name, first, second)
            }
            Activity::Idle { name } => write!(f, "{} is nowhere, alone in the dark", name),
        }
    }
}

/// Describe the activity of a user holding `locks`.
///
/// Precedence: a lone summary lock is reported as presence on the summary;
/// a single other lock is named specifically; two or more other locks report
/// the first two in discovery order; no lock at all is idle.
pub fn describe_activity(name: &str, locks: &[LockLocation], story: Option<&Story>) -> Activity {
    let name = name.to_string();
    if locks.is_empty() {
        return Activity::Idle { name };
    }

    let others: Vec<&LockLocation> = locks
        .iter()
        .filter(|location| **location != LockLocation::Summary)
        .collect();

    match others.as_slice() {
        [] => Activity::OnSummary { name },
        [only] => match only {
            LockLocation::Section { block_id } => Activity::EditingSection {
                name,
                title: story
                    .and_then(|story| story.section(block_id))
                    .map(|section| section.title().to_string()),
            },
            LockLocation::StoryMetadata => Activity::EditingSettings { name },
            other => Activity::WorkingOn {
                name,
                location: other.kind().to_string(),
            },
        },
        [first, second, ..] => Activity::WorkingOnTwo {
            name,
            first: first.kind().to_string(),
            second: second.kind().to_string(),
        },
    }
}

impl LockMap {
    /// Describe what `user_id` is doing in a story.
    ///
    /// Users missing from `active_users` are named by their id.
    pub fn describe_activity(
        &self,
        story: &Story,
        user_id: &str,
        active_users: &ActiveUsers,
    ) -> Activity {
        let name = active_users
            .get(user_id)
            .map(|user| user.name.as_str())
            .unwrap_or(user_id);
        describe_activity(name, self.locks_of(&story.id, user_id), Some(story))
    }
}
