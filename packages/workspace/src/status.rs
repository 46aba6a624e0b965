//! Remote operation phases and their user-facing status messages.
//!
//! Terminal phases are cleared after a delay unless a newer phase of the
//! same operation was recorded in the meantime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteOperation {
    FetchAll,
    FetchStory,
    CreateStory,
    CopyStory,
    SaveStory,
    UpdateStory,
    DeleteStory,
    LoginStory,
    ChangePassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Pending,
    Success,
    Failure,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Pending)
    }
}

impl RemoteOperation {
    /// Status line shown while the operation is in `phase`
    pub fn message(self, phase: Phase) -> &'static str {
        use Phase::*;
        use RemoteOperation::*;

        match (self, phase) {
            (FetchAll, Pending) => "loading stories",
            (FetchAll, Success) => "stories are fetched",
            (FetchAll, Failure) => "stories could not be fetched",

            (FetchStory, Pending) => "loading story",
            (FetchStory, Success) => "story is fetched",
            (FetchStory, Failure) => "story is not found",

            (CreateStory, Pending) => "creating story",
            (CreateStory, Success) => "story is created",
            (CreateStory, Failure) => "story could not be created",

            (CopyStory, Pending) => "copying story",
            (CopyStory, Success) => "story is copied",
            (CopyStory, Failure) => "story could not be copied",

            (SaveStory, Pending) => "saving story",
            (SaveStory, Success) => "story is saved on server",
            (SaveStory, Failure) => "story could not export to server",

            (UpdateStory, Pending) => "updating from the distant server",
            (UpdateStory, Success) => "story is up to date",
            (UpdateStory, Failure) => "connection with distant server has failed",

            (DeleteStory, Pending) => "deleting story",
            (DeleteStory, Success) => "story is deleted",
            (DeleteStory, Failure) => "story could not be deleted",

            (LoginStory, Pending) => "login to story",
            (LoginStory, Success) => "password correct",
            (LoginStory, Failure) => "password incorrect",

            (ChangePassword, Pending) => "changing password",
            (ChangePassword, Success) => "password is changed",
            (ChangePassword, Failure) => "password could not be changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub phase: Phase,
    pub message: &'static str,

    /// Opaque error payload of a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip)]
    generation: u64,
}

#[derive(Default)]
struct Board {
    entries: HashMap<RemoteOperation, Status>,
    generation: u64,
}

/// Latest status of every remote operation
#[derive(Clone)]
pub struct StatusBoard {
    board: Arc<Mutex<Board>>,
    reset_delay: Duration,
}

impl StatusBoard {
    pub fn new(reset_delay: Duration) -> Self {
        Self {
            board: Arc::new(Mutex::new(Board::default())),
            reset_delay,
        }
    }

    /// Record a phase; terminal phases schedule their own reset
    pub fn record(&self, operation: RemoteOperation, phase: Phase, error: Option<String>) {
        let generation = {
            let mut board = self.board.lock();
            board.generation += 1;
            let generation = board.generation;
            board.entries.insert(
                operation,
                Status {
                    phase,
                    message: operation.message(phase),
                    error,
                    generation,
                },
            );
            generation
        };

        if phase.is_terminal() {
            self.schedule_reset(operation, generation);
        }
    }

    fn schedule_reset(&self, operation: RemoteOperation, generation: u64) {
        // without a runtime the status simply stays until overwritten
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let board = Arc::clone(&self.board);
        let delay = self.reset_delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut board = board.lock();
            let current = board.entries.get(&operation).map(|status| status.generation);
            if current == Some(generation) {
                board.entries.remove(&operation);
            }
        });
    }

    pub fn get(&self, operation: RemoteOperation) -> Option<Status> {
        self.board.lock().entries.get(&operation).cloned()
    }

    /// Every displayed status line
    pub fn messages(&self) -> Vec<(RemoteOperation, Status)> {
        let board = self.board.lock();
        board
            .entries
            .iter()
            .map(|(operation, status)| (*operation, status.clone()))
            .collect()
    }

    pub fn reset_delay(&self) -> Duration {
        self.reset_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(8000);

    #[test]
    fn test_messages() {
        assert_eq!(
            RemoteOperation::SaveStory.message(Phase::Success),
            "story is saved on server"
        );
        assert_eq!(
            RemoteOperation::UpdateStory.message(Phase::Failure),
            "connection with distant server has failed"
        );
        assert_eq!(
            RemoteOperation::LoginStory.message(Phase::Pending),
            "login to story"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_is_cleared() {
        let board = StatusBoard::new(DELAY);
        board.record(RemoteOperation::FetchStory, Phase::Pending, None);
        board.record(RemoteOperation::FetchStory, Phase::Success, None);
        assert_eq!(
            board.get(RemoteOperation::FetchStory).map(|s| s.message),
            Some("story is fetched")
        );

        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
        assert!(board.get(RemoteOperation::FetchStory).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_status_is_kept() {
        let board = StatusBoard::new(DELAY);
        board.record(RemoteOperation::SaveStory, Phase::Pending, None);

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(
            board.get(RemoteOperation::SaveStory).map(|s| s.phase),
            Some(Phase::Pending)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_status_survives_old_reset() {
        let board = StatusBoard::new(DELAY);
        board.record(RemoteOperation::SaveStory, Phase::Failure, Some("offline".into()));

        tokio::time::sleep(DELAY / 2).await;
        board.record(RemoteOperation::SaveStory, Phase::Success, None);

        // first reset fires here and must leave the newer status alone
        tokio::time::sleep(DELAY / 2 + Duration::from_millis(1)).await;
        let status = board.get(RemoteOperation::SaveStory).unwrap();
        assert_eq!(status.phase, Phase::Success);
        assert!(status.error.is_none());

        tokio::time::sleep(DELAY).await;
        assert!(board.get(RemoteOperation::SaveStory).is_none());
    }
}
