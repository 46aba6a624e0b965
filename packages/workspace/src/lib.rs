//! # Quire Workspace
//!
//! Async layer that connects edit sessions to a story server.
//!
//! ## Modules
//!
//! - `manager`: the [`Workspace`], which runs remote operations, keeps the
//!   active story in sync and broadcasts accepted commands to other clients
//! - `state`: the stories directory and which fetch is current
//! - `status`: per-operation progress, reset to idle after a delay
//! - `remote`: the story server and credential service interfaces
//! - `tokens`: access token persistence
//! - `memory`: an in-process server implementing both remote interfaces
//!
//! ## Usage
//!
//! ```ignore
//! let backend = Arc::new(MemoryBackend::new());
//! let workspace = Workspace::new(
//!     backend.clone(),
//!     backend,
//!     MemoryTokenStore::new(),
//!     WorkspaceOptions::default(),
//! )?;
//!
//! let directory = workspace.fetch_all().await?;
//! ```

pub mod errors;
pub mod manager;
pub mod memory;
pub mod remote;
pub mod state;
pub mod status;
pub mod tokens;

pub use errors::{RemoteError, TokenStoreError, WorkspaceError, WorkspaceResult};
pub use manager::{BroadcastUpdate, StoryEvent, Workspace, WorkspaceOptions, DEFAULT_STATUS_RESET_MS};
pub use memory::MemoryBackend;
pub use remote::{Credential, CredentialService, StoryDirectory, StoryStore, StorySummary};
pub use state::{FetchTicket, StoriesState};
pub use status::{Phase, RemoteOperation, Status, StatusBoard};
pub use tokens::{JsonFileTokenStore, MemoryTokenStore, TokenStore};
