//! Fallback store trait and its JSON-file and in-memory implementations.

use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::types::{Notification, Post};

/// File holding the locally persisted post array.
pub const POSTS_FILE: &str = "local_posts.json";
/// File holding the locally persisted notification array.
pub const NOTIFS_FILE: &str = "local_notifs.json";

/// Durable local persistence for records lacking remote persistence.
///
/// Reads never fail: an absent or corrupt backing entry degrades to an empty
/// collection. Every mutation is a single synchronous read-modify-write with
/// no suspension point inside, so interleaved async callers cannot lose
/// updates.
pub trait FallbackStore: Send + Sync {
  /// All locally held posts, in stored order.
  fn posts(&self) -> Vec<Post>;

  /// Upsert by id: replace an existing post in place, else append.
  fn upsert_post(&self, post: &Post) -> Result<()>;

  /// Remove a post by id. Removing an absent id is a no-op.
  fn remove_post(&self, id: &str) -> Result<()>;

  /// Advance the view counter of a locally held post by one. A miss is a
  /// no-op; views are best-effort analytics.
  fn bump_post_views(&self, id: &str) -> Result<()>;

  /// All locally held notifications, newest first.
  fn notifications(&self) -> Vec<Notification>;

  /// Prepend a new notification, preserving newest-first order without a
  /// sort at read time.
  fn prepend_notification(&self, notif: &Notification) -> Result<()>;

  /// Clear the active flag of a notification. Idempotent; a miss is a no-op.
  fn deactivate_notification(&self, id: &str) -> Result<()>;

  /// Remove a notification by id. Removing an absent id is a no-op.
  fn remove_notification(&self, id: &str) -> Result<()>;
}

// ============================================================================
// JSON file store
// ============================================================================

/// File-backed store: two human-inspectable JSON arrays under the data
/// directory. No schema versioning; malformed content is treated as empty.
pub struct JsonFileStore {
  dir: PathBuf,
  // Serializes read-modify-write cycles across clones/threads
  lock: Mutex<()>,
}

impl JsonFileStore {
  /// Open the store at the default data directory.
  pub fn open() -> Result<Self> {
    Self::open_at(Self::default_dir()?)
  }

  /// Open the store at an explicit directory, creating it if needed.
  pub fn open_at(dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)
      .map_err(|e| eyre!("Failed to create data directory {}: {}", dir.display(), e))?;
    Ok(Self {
      dir,
      lock: Mutex::new(()),
    })
  }

  fn default_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;
    Ok(data_dir.join("syncpress"))
  }

  fn read_array<T: DeserializeOwned>(&self, file: &str) -> Vec<T> {
    let path = self.dir.join(file);
    match std::fs::read_to_string(&path) {
      Ok(contents) => match serde_json::from_str(&contents) {
        Ok(items) => items,
        Err(e) => {
          warn!(file, "local store entry is unparsable, treating as empty: {}", e);
          Vec::new()
        }
      },
      Err(_) => Vec::new(), // absent file: nothing persisted yet
    }
  }

  fn write_array<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
    let path = self.dir.join(file);
    let json = serde_json::to_string_pretty(items)
      .map_err(|e| eyre!("Failed to serialize local store entry: {}", e))?;
    std::fs::write(&path, json)
      .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
  }

  /// Path of the backing directory, for display in diagnostics.
  pub fn dir(&self) -> &Path {
    &self.dir
  }
}

impl FallbackStore for JsonFileStore {
  fn posts(&self) -> Vec<Post> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    self.read_array(POSTS_FILE)
  }

  fn upsert_post(&self, post: &Post) -> Result<()> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    let mut posts: Vec<Post> = self.read_array(POSTS_FILE);
    match posts.iter_mut().find(|p| p.id == post.id) {
      Some(existing) => *existing = post.clone(),
      None => posts.push(post.clone()),
    }
    self.write_array(POSTS_FILE, &posts)
  }

  fn remove_post(&self, id: &str) -> Result<()> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    let mut posts: Vec<Post> = self.read_array(POSTS_FILE);
    posts.retain(|p| p.id != id);
    self.write_array(POSTS_FILE, &posts)
  }

  fn bump_post_views(&self, id: &str) -> Result<()> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    let mut posts: Vec<Post> = self.read_array(POSTS_FILE);
    if let Some(post) = posts.iter_mut().find(|p| p.id == id) {
      post.views += 1;
      return self.write_array(POSTS_FILE, &posts);
    }
    Ok(())
  }

  fn notifications(&self) -> Vec<Notification> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    self.read_array(NOTIFS_FILE)
  }

  fn prepend_notification(&self, notif: &Notification) -> Result<()> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    let mut notifs: Vec<Notification> = self.read_array(NOTIFS_FILE);
    notifs.insert(0, notif.clone());
    self.write_array(NOTIFS_FILE, &notifs)
  }

  fn deactivate_notification(&self, id: &str) -> Result<()> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    let mut notifs: Vec<Notification> = self.read_array(NOTIFS_FILE);
    if let Some(notif) = notifs.iter_mut().find(|n| n.id == id) {
      notif.active = false;
      return self.write_array(NOTIFS_FILE, &notifs);
    }
    Ok(())
  }

  fn remove_notification(&self, id: &str) -> Result<()> {
    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    let mut notifs: Vec<Notification> = self.read_array(NOTIFS_FILE);
    notifs.retain(|n| n.id != id);
    self.write_array(NOTIFS_FILE, &notifs)
  }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Memory-backed store for tests and embedders that don't want disk state.
#[derive(Default)]
pub struct MemoryStore {
  posts: Mutex<Vec<Post>>,
  notifs: Mutex<Vec<Notification>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl FallbackStore for MemoryStore {
  fn posts(&self) -> Vec<Post> {
    self.posts.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  fn upsert_post(&self, post: &Post) -> Result<()> {
    let mut posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
    match posts.iter_mut().find(|p| p.id == post.id) {
      Some(existing) => *existing = post.clone(),
      None => posts.push(post.clone()),
    }
    Ok(())
  }

  fn remove_post(&self, id: &str) -> Result<()> {
    let mut posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
    posts.retain(|p| p.id != id);
    Ok(())
  }

  fn bump_post_views(&self, id: &str) -> Result<()> {
    let mut posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(post) = posts.iter_mut().find(|p| p.id == id) {
      post.views += 1;
    }
    Ok(())
  }

  fn notifications(&self) -> Vec<Notification> {
    self.notifs.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  fn prepend_notification(&self, notif: &Notification) -> Result<()> {
    let mut notifs = self.notifs.lock().unwrap_or_else(|e| e.into_inner());
    notifs.insert(0, notif.clone());
    Ok(())
  }

  fn deactivate_notification(&self, id: &str) -> Result<()> {
    let mut notifs = self.notifs.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(notif) = notifs.iter_mut().find(|n| n.id == id) {
      notif.active = false;
    }
    Ok(())
  }

  fn remove_notification(&self, id: &str) -> Result<()> {
    let mut notifs = self.notifs.lock().unwrap_or_else(|e| e.into_inner());
    notifs.retain(|n| n.id != id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{NotificationKind, SyncStatus};

  fn post(id: &str, title: &str) -> Post {
    Post {
      id: id.into(),
      title: title.into(),
      excerpt: "e".into(),
      content: "c".into(),
      category: "misc".into(),
      image_url: String::new(),
      tags: Vec::new(),
      download_url: None,
      button_text: None,
      button_link: None,
      created_at: "2024-01-01T00:00:00Z".into(),
      views: 0,
    }
  }

  fn notif(id: &str, message: &str) -> Notification {
    Notification {
      id: id.into(),
      message: message.into(),
      kind: NotificationKind::Info,
      button_text: None,
      button_link: None,
      active: true,
      created_at: "2024-01-01T00:00:00Z".into(),
      sync_status: SyncStatus::Local,
    }
  }

  #[test]
  fn upsert_replaces_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open_at(dir.path()).unwrap();

    store.upsert_post(&post("a", "first")).unwrap();
    store.upsert_post(&post("b", "second")).unwrap();
    store.upsert_post(&post("a", "first, edited")).unwrap();

    let posts = store.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "first, edited");
    assert_eq!(posts[1].title, "second");
  }

  #[test]
  fn corrupt_file_degrades_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(POSTS_FILE), "{not json").unwrap();
    let store = JsonFileStore::open_at(dir.path()).unwrap();

    assert!(store.posts().is_empty());
    // The store stays usable after the corrupt read
    store.upsert_post(&post("a", "recovered")).unwrap();
    assert_eq!(store.posts().len(), 1);
  }

  #[test]
  fn absent_files_read_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open_at(dir.path()).unwrap();
    assert!(store.posts().is_empty());
    assert!(store.notifications().is_empty());
  }

  #[test]
  fn notifications_are_prepended() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open_at(dir.path()).unwrap();

    store.prepend_notification(&notif("n1", "older")).unwrap();
    store.prepend_notification(&notif("n2", "newer")).unwrap();

    let notifs = store.notifications();
    assert_eq!(notifs[0].id, "n2");
    assert_eq!(notifs[1].id, "n1");
  }

  #[test]
  fn deactivate_is_idempotent_and_tolerates_misses() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open_at(dir.path()).unwrap();

    store.prepend_notification(&notif("n1", "hello")).unwrap();
    store.deactivate_notification("n1").unwrap();
    store.deactivate_notification("n1").unwrap();
    store.deactivate_notification("ghost").unwrap();

    assert!(!store.notifications()[0].active);
  }

  #[test]
  fn bump_views_advances_counter_and_ignores_misses() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open_at(dir.path()).unwrap();

    store.upsert_post(&post("a", "t")).unwrap();
    store.bump_post_views("a").unwrap();
    store.bump_post_views("a").unwrap();
    store.bump_post_views("ghost").unwrap();

    assert_eq!(store.posts()[0].views, 2);
  }

  #[test]
  fn on_disk_layout_is_a_camel_case_array() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open_at(dir.path()).unwrap();
    store.upsert_post(&post("a", "t")).unwrap();

    let raw = std::fs::read_to_string(dir.path().join(POSTS_FILE)).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(parsed.is_array());
    assert!(parsed[0].get("createdAt").is_some());
  }

  #[test]
  fn memory_store_matches_file_store_semantics() {
    let store = MemoryStore::new();
    store.upsert_post(&post("a", "t")).unwrap();
    store.upsert_post(&post("a", "t2")).unwrap();
    store.bump_post_views("a").unwrap();
    assert_eq!(store.posts().len(), 1);
    assert_eq!(store.posts()[0].views, 1);

    store.prepend_notification(&notif("n1", "m")).unwrap();
    store.prepend_notification(&notif("n2", "m")).unwrap();
    assert_eq!(store.notifications()[0].id, "n2");
    store.remove_notification("n2").unwrap();
    assert_eq!(store.notifications().len(), 1);
  }
}
