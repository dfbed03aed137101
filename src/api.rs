//! Unified access façade.
//!
//! The only surface presentation code calls. Every operation decides between
//! the remote adapter and the local fallback store, merges results where both
//! may hold data, and returns internal shapes only. Remote column names and
//! raw error objects never cross this boundary.

use chrono::{DateTime, NaiveDateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::remote::RemoteClient;
use crate::store::{FallbackStore, JsonFileStore};
use crate::types::{
  is_local_id, new_local_id, Notification, NotificationDraft, Post, PostDraft, PostPatch, Stats,
  SyncStatus,
};

/// Substituted when a blob upload fails or no remote is configured.
const PLACEHOLDER_IMAGE: &str =
  "https://images.unsplash.com/photo-1550751827-4bd374c3f58b?auto=format&fit=crop&q=80&w=1200";

/// Dual-mode data access: a remote relational store when configured and
/// reachable, a durable local fallback otherwise.
///
/// Write failures on create never drop the record: it lands in the local
/// store under a `local-` prefixed id instead. Read failures degrade to
/// whatever the local store holds.
pub struct Api<S: FallbackStore> {
  remote: Option<RemoteClient>,
  store: Arc<S>,
}

impl Api<JsonFileStore> {
  /// Build the façade from configuration, with the file-backed store.
  pub fn open(config: &Config) -> Result<Self> {
    let remote = config.remote.as_ref().map(RemoteClient::new).transpose()?;
    let store = match &config.data_dir {
      Some(dir) => JsonFileStore::open_at(dir)?,
      None => JsonFileStore::open()?,
    };
    Ok(Self::with_parts(remote, store))
  }
}

impl<S: FallbackStore> Api<S> {
  /// Assemble from explicit parts (used by tests and embedders).
  pub fn with_parts(remote: Option<RemoteClient>, store: S) -> Self {
    Self {
      remote,
      store: Arc::new(store),
    }
  }

  /// Remote client to use for a write against `id`, if any. Locally minted
  /// identifiers never travel to the remote store.
  fn remote_for(&self, id: &str) -> Option<&RemoteClient> {
    if is_local_id(id) {
      None
    } else {
      self.remote.as_ref()
    }
  }

  // ==========================================================================
  // Posts
  // ==========================================================================

  /// All posts from both stores, remote winning on id collision, newest
  /// first. A remote read failure degrades to local records only.
  pub async fn list_posts(&self) -> Result<Vec<Post>> {
    let mut remote_posts = Vec::new();
    if let Some(remote) = &self.remote {
      match remote.list_posts().await {
        Ok(posts) => remote_posts = posts,
        Err(e) => warn!("remote post fetch failed, serving local records only: {}", e),
      }
    }

    let mut merged = merge_by_id(remote_posts, self.store.posts(), |p| &p.id);
    sort_newest_first(&mut merged, |p| &p.created_at);
    Ok(merged)
  }

  /// Look a post up by id: remote first when configured, then the local
  /// store. A miss in both is `Ok(None)`, never an error.
  pub async fn get_post(&self, id: &str) -> Result<Option<Post>> {
    if let Some(remote) = &self.remote {
      match remote.get_post(id).await {
        Ok(Some(post)) => return Ok(Some(post)),
        Ok(None) => {}
        Err(e) => warn!("remote post lookup failed, falling back to local store: {}", e),
      }
    }
    Ok(self.store.posts().into_iter().find(|p| p.id == id))
  }

  /// Create a post. The remote store is attempted first when configured; on
  /// failure the record is persisted locally under a `local-` id instead of
  /// being dropped.
  pub async fn create_post(&self, draft: PostDraft) -> Result<Post> {
    if let Some(remote) = &self.remote {
      match remote.insert_post(&draft).await {
        Ok(post) => return Ok(post),
        Err(e) => warn!("remote insert failed, persisting post locally: {}", e),
      }
    }

    let post = Post {
      id: new_local_id(),
      title: draft.title,
      excerpt: draft.excerpt,
      content: draft.content,
      category: draft.category,
      image_url: draft.image_url,
      tags: draft.tags,
      download_url: draft.download_url,
      button_text: draft.button_text,
      button_link: draft.button_link,
      created_at: Utc::now().to_rfc3339(),
      views: 0,
    };
    self.store.upsert_post(&post)?;
    Ok(post)
  }

  /// Partial update. Remote failures propagate to the caller as normalized
  /// strings; a local miss is "Target resource not found".
  pub async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post> {
    if let Some(remote) = self.remote_for(id) {
      return remote.update_post(id, patch).await;
    }

    let mut post = self
      .store
      .posts()
      .into_iter()
      .find(|p| p.id == id)
      .ok_or_else(|| eyre!("Target resource not found"))?;
    patch.apply(&mut post);
    self.store.upsert_post(&post)?;
    Ok(post)
  }

  /// Delete from whichever stores hold a copy. The remote delete may fail
  /// and propagate; the local purge always runs for local-prefixed ids.
  pub async fn delete_post(&self, id: &str) -> Result<()> {
    if let Some(remote) = self.remote_for(id) {
      remote.delete_post(id).await?;
    }
    self.store.remove_post(id)
  }

  /// Best-effort view counter bump. Never fails the caller: the atomic
  /// remote increment is tried first, then a read-modify-write with the
  /// caller's known count (racy under concurrent viewers, acceptable for
  /// analytics), and finally the local copy is advanced.
  pub async fn increment_post_views(&self, id: &str, current_views: u64) -> Result<()> {
    if let Some(remote) = self.remote_for(id) {
      match remote.increment_views(id).await {
        Ok(()) => return Ok(()),
        Err(e) => {
          debug!("atomic increment unavailable, trying manual update: {}", e);
          if let Err(e) = remote.set_views(id, current_views + 1).await {
            debug!("manual view update failed, keeping local count only: {}", e);
          }
        }
      }
    }

    if let Err(e) = self.store.bump_post_views(id) {
      debug!("local view bump failed: {}", e);
    }
    Ok(())
  }

  // ==========================================================================
  // Notifications
  // ==========================================================================

  /// Notifications from both stores, remote winning on id collision, newest
  /// first. With `only_active` both the remote query and the merged set are
  /// filtered to active records.
  pub async fn list_notifications(&self, only_active: bool) -> Result<Vec<Notification>> {
    let mut remote_notifs = Vec::new();
    if let Some(remote) = &self.remote {
      match remote.list_notifications(only_active).await {
        Ok(notifs) => remote_notifs = notifs,
        Err(e) => warn!("remote notification fetch failed, serving local records only: {}", e),
      }
    }

    let local: Vec<Notification> = self
      .store
      .notifications()
      .into_iter()
      .map(|mut n| {
        n.sync_status = SyncStatus::Local;
        n
      })
      .collect();

    let mut merged = merge_by_id(remote_notifs, local, |n| &n.id);
    if only_active {
      merged.retain(|n| n.active);
    }
    sort_newest_first(&mut merged, |n| &n.created_at);
    Ok(merged)
  }

  /// Broadcast a notification. Remote failures (after the schema-mismatch
  /// retry inside the adapter) propagate so the operator sees them; without
  /// a remote the record is persisted locally, newest first.
  pub async fn save_notification(&self, draft: NotificationDraft) -> Result<Notification> {
    if let Some(remote) = &self.remote {
      return remote.insert_notification(&draft).await;
    }

    let notif = Notification {
      id: new_local_id(),
      message: draft.message,
      kind: draft.kind,
      button_text: draft.button_text,
      button_link: draft.button_link,
      active: true,
      created_at: Utc::now().to_rfc3339(),
      sync_status: SyncStatus::Local,
    };
    self.store.prepend_notification(&notif)?;
    Ok(notif)
  }

  /// Soft-delete: clear the active flag but keep the record in history.
  /// Idempotent: repeating the call leaves `active=false` and does not
  /// fail.
  pub async fn deactivate_notification(&self, id: &str) -> Result<()> {
    if let Some(remote) = self.remote_for(id) {
      return remote.deactivate_notification(id).await;
    }
    self.store.deactivate_notification(id)
  }

  /// Hard delete from whichever stores hold a copy.
  pub async fn delete_notification(&self, id: &str) -> Result<()> {
    if let Some(remote) = self.remote_for(id) {
      remote.delete_notification(id).await?;
    }
    self.store.remove_notification(id)
  }

  // ==========================================================================
  // Derived / auxiliary
  // ==========================================================================

  /// Aggregate dashboard figures derived from the merged post list.
  pub async fn fetch_stats(&self) -> Result<Stats> {
    let posts = self.list_posts().await?;
    let total_views = posts.iter().map(|p| p.views).sum();
    Ok(Stats {
      total_posts: posts.len(),
      total_views,
      storage_used_mb: estimate_storage_mb(posts.len()),
    })
  }

  /// Upload an image and return a publicly resolvable URL. Never fails the
  /// caller: any upload problem substitutes a fixed placeholder image.
  pub async fn upload_image(&self, file_name: &str, bytes: Vec<u8>, content_type: &str) -> String {
    if let Some(remote) = &self.remote {
      let name = unique_file_name(file_name);
      match remote.upload_image(&name, bytes, content_type).await {
        Ok(url) => return url,
        Err(e) => warn!("storage upload failed, substituting placeholder image: {}", e),
      }
    }
    format!("{}&t={}", PLACEHOLDER_IMAGE, Utc::now().timestamp_millis())
  }
}

impl<S: FallbackStore> Clone for Api<S> {
  fn clone(&self) -> Self {
    Self {
      remote: self.remote.clone(),
      store: Arc::clone(&self.store),
    }
  }
}

/// Remote records win on id collision; local records fill the gaps.
fn merge_by_id<T, F>(remote: Vec<T>, local: Vec<T>, id: F) -> Vec<T>
where
  F: Fn(&T) -> &str,
{
  let mut merged = remote;
  for item in local {
    if !merged.iter().any(|m| id(m) == id(&item)) {
      merged.push(item);
    }
  }
  merged
}

/// Stable sort by creation timestamp, newest first. Ties keep input order.
fn sort_newest_first<T, F>(items: &mut [T], created_at: F)
where
  F: Fn(&T) -> &str,
{
  items.sort_by(|a, b| parse_timestamp(created_at(b)).cmp(&parse_timestamp(created_at(a))));
}

/// Parse an ISO-8601 timestamp, tolerating the space-separated variant.
/// Unparsable values sort as the epoch, i.e. last.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc()))
    .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Rough storage figure for the dashboard, one decimal place.
fn estimate_storage_mb(post_count: usize) -> f64 {
  ((post_count as f64 * 0.4 + 1.2) * 10.0).round() / 10.0
}

/// Timestamped, whitespace-free object name for uploads.
fn unique_file_name(original: &str) -> String {
  let cleaned: String = original
    .chars()
    .map(|c| if c.is_whitespace() { '_' } else { c })
    .collect();
  format!("{}-{}", Utc::now().timestamp_millis(), cleaned)
}
