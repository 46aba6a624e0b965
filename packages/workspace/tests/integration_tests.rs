use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quire_editor::{Section, Story, StoryCommand};
use quire_workspace::*;

type TestWorkspace = Workspace<MemoryBackend, MemoryBackend, MemoryTokenStore>;

fn workspace(backend: &Arc<MemoryBackend>, client_id: &str) -> TestWorkspace {
    Workspace::new(
        Arc::clone(backend),
        Arc::clone(backend),
        MemoryTokenStore::new(),
        WorkspaceOptions {
            status_reset_delay: Duration::from_millis(8000),
            client_id: client_id.to_string(),
        },
    )
    .unwrap()
}

/// Store whose fetches take a per-story amount of time
struct SlowStore {
    inner: MemoryBackend,
    delays: HashMap<String, Duration>,
}

#[async_trait]
impl StoryStore for SlowStore {
    async fn fetch_all(&self) -> Result<StoryDirectory, RemoteError> {
        self.inner.fetch_all().await
    }

    async fn fetch(&self, story_id: &str) -> Result<Story, RemoteError> {
        if let Some(delay) = self.delays.get(story_id) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.fetch(story_id).await
    }

    async fn create(&self, story: Story) -> Result<Story, RemoteError> {
        self.inner.create(story).await
    }

    async fn save(&self, story: &Story, token: &str) -> Result<Story, RemoteError> {
        self.inner.save(story, token).await
    }

    async fn delete(&self, story_id: &str, token: &str) -> Result<String, RemoteError> {
        self.inner.delete(story_id, token).await
    }
}

#[tokio::test]
async fn test_create_open_edit_save() {
    let backend = Arc::new(MemoryBackend::new());
    let ws = workspace(&backend, "c1");

    let story = Story::new_default("s1").with_title("First");
    ws.create_story(story, "secret").await.unwrap();
    assert!(ws.has_token("s1"));
    assert!(ws.directory().contains_key("s1"));

    ws.open_story("s1").await.unwrap().unwrap();
    ws.apply_to_active(&StoryCommand::CreateSection {
        section_id: "a".into(),
        section: Section::new("a", "Opening"),
    })
    .unwrap();

    let saved = ws.save_story().await.unwrap();
    assert!(saved.section("a").is_some());
    assert!(backend.fetch("s1").await.unwrap().section("a").is_some());

    let status = ws.status().get(RemoteOperation::SaveStory).unwrap();
    assert_eq!(status.message, "story is saved on server");
}

#[tokio::test]
async fn test_save_without_token_is_refused() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_story(Story::new_default("s1"));
    let ws = workspace(&backend, "c1");

    ws.open_story("s1").await.unwrap();
    assert!(matches!(
        ws.save_story().await,
        Err(WorkspaceError::MissingToken(id)) if id == "s1"
    ));
}

#[tokio::test]
async fn test_login_and_change_password() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = workspace(&backend, "c1");
    owner
        .create_story(Story::new_default("s1"), "old")
        .await
        .unwrap();

    let guest = workspace(&backend, "c2");
    assert!(matches!(
        guest.login("s1", "wrong").await,
        Err(WorkspaceError::Remote(RemoteError::Unauthorized))
    ));
    assert_eq!(
        guest.status().get(RemoteOperation::LoginStory).map(|s| s.message),
        Some("password incorrect")
    );

    guest.login("s1", "old").await.unwrap();
    guest.change_password("s1", "new").await.unwrap();

    // the owner's token was revoked by the reset
    owner.open_story("s1").await.unwrap();
    assert!(matches!(
        owner.save_story().await,
        Err(WorkspaceError::Remote(RemoteError::Unauthorized))
    ));
    owner.login("s1", "new").await.unwrap();
    assert!(owner.save_story().await.is_ok());
}

#[tokio::test]
async fn test_copy_story() {
    let backend = Arc::new(MemoryBackend::new());
    let ws = workspace(&backend, "c1");
    let original = Story::new_default("s1")
        .with_title("Field notes")
        .create_section("a", Section::new("a", "A"))
        .unwrap();
    ws.create_story(original, "pw").await.unwrap();

    let copy = ws.copy_story("s1", "pw2").await.unwrap();
    assert_ne!(copy.id, "s1");
    assert_eq!(copy.metadata.title, "Field notes - copy");
    assert!(copy.section("a").is_some());
    assert_eq!(backend.story_count(), 2);
    assert!(ws.has_token(&copy.id));
}

#[tokio::test]
async fn test_delete_story_clears_everything() {
    let backend = Arc::new(MemoryBackend::new());
    let ws = workspace(&backend, "c1");
    ws.create_story(Story::new_default("s1"), "pw").await.unwrap();
    ws.open_story("s1").await.unwrap();

    ws.delete_story("s1").await.unwrap();

    assert!(ws.active_story().is_none());
    assert!(!ws.has_token("s1"));
    assert!(ws.directory().is_empty());
    assert_eq!(backend.story_count(), 0);
}

#[tokio::test]
async fn test_remote_failure_is_reported_not_retried() {
    let backend = Arc::new(MemoryBackend::new());
    let ws = workspace(&backend, "c1");
    backend.set_offline(true);

    let err = ws.fetch_all().await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Remote(RemoteError::Network(_))));

    let status = ws.status().get(RemoteOperation::FetchAll).unwrap();
    assert_eq!(status.phase, Phase::Failure);
    assert!(status.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_status_message_auto_clears() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_story(Story::new_default("s1"));
    let ws = workspace(&backend, "c1");

    ws.open_story("s1").await.unwrap();
    assert!(ws.status().get(RemoteOperation::FetchStory).is_some());

    tokio::time::sleep(Duration::from_millis(8001)).await;
    assert!(ws.status().get(RemoteOperation::FetchStory).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stale_fetch_is_discarded() {
    let inner = MemoryBackend::new();
    inner.insert_story(Story::new_default("slow"));
    inner.insert_story(Story::new_default("fast"));
    let store = Arc::new(SlowStore {
        inner,
        delays: HashMap::from([
            ("slow".to_string(), Duration::from_millis(500)),
            ("fast".to_string(), Duration::from_millis(10)),
        ]),
    });
    let ws = Workspace::new(
        store,
        Arc::new(MemoryBackend::new()),
        MemoryTokenStore::new(),
        WorkspaceOptions::default(),
    )
    .unwrap();

    let (slow, fast) = tokio::join!(ws.open_story("slow"), async {
        // requested after "slow", answered before it
        tokio::time::sleep(Duration::from_millis(1)).await;
        ws.open_story("fast").await
    });

    assert!(slow.unwrap().is_none());
    assert_eq!(fast.unwrap().map(|story| story.id), Some("fast".to_string()));
    assert_eq!(ws.active_story().map(|story| story.id), Some("fast".to_string()));
}

#[tokio::test]
async fn test_broadcast_between_clients() {
    let backend = Arc::new(MemoryBackend::new());
    let alice = workspace(&backend, "alice");
    let bob = workspace(&backend, "bob");
    let mut alice_events = alice.subscribe();

    alice
        .create_story(Story::new_default("s1"), "pw")
        .await
        .unwrap();
    let created = alice_events.recv().await.unwrap();

    // own update is ignored, the other client merges it
    assert!(!alice.apply_broadcast(&created));
    assert!(bob.apply_broadcast(&created));
    assert!(bob.directory().contains_key("s1"));

    bob.open_story("s1").await.unwrap();
    alice.open_story("s1").await.unwrap();
    alice
        .apply_to_active(&StoryCommand::SetCss { css: "p {}".into() })
        .unwrap();
    alice.save_story().await.unwrap();

    let updated = alice_events.recv().await.unwrap();
    assert!(bob.apply_broadcast(&updated));
    assert_eq!(bob.active_story().unwrap().settings.css, "p {}");

    alice.delete_story("s1").await.unwrap();
    let deleted = alice_events.recv().await.unwrap();
    assert!(bob.apply_broadcast(&deleted));
    assert!(bob.active_story().is_none());
}

#[tokio::test]
async fn test_import_refuses_existing_id() {
    let backend = Arc::new(MemoryBackend::new());
    let ws = workspace(&backend, "c1");
    ws.create_story(Story::new_default("s1"), "pw").await.unwrap();

    let exported = quire_editor::export_story(&Story::new_default("s1").with_title("Imported")).unwrap();
    assert!(matches!(
        ws.import(&exported, false),
        Err(WorkspaceError::AlreadyExists(_))
    ));

    let imported = ws.import(&exported, true).unwrap();
    assert_eq!(imported.metadata.title, "Imported");
    assert_eq!(ws.active_story(), Some(imported));

    assert!(matches!(
        ws.import("{}", true),
        Err(WorkspaceError::Import(_))
    ));
}
