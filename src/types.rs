use serde::{Deserialize, Serialize};

/// Reserved prefix for identifiers minted without remote persistence.
///
/// The prefix is the only routing signal: update/delete/increment calls on an
/// id carrying it go straight to the local store, no network round-trip.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Returns true if the identifier was synthesized locally.
pub fn is_local_id(id: &str) -> bool {
  id.starts_with(LOCAL_ID_PREFIX)
}

/// Mint a new local identifier from the current wall clock plus a process
/// sequence number, so ids created in the same millisecond stay distinct.
pub fn new_local_id() -> String {
  use std::sync::atomic::{AtomicU64, Ordering};
  static SEQ: AtomicU64 = AtomicU64::new(0);
  let seq = SEQ.fetch_add(1, Ordering::Relaxed);
  format!(
    "{}{}-{}",
    LOCAL_ID_PREFIX,
    chrono::Utc::now().timestamp_millis(),
    seq
  )
}

/// A content post as the application sees it.
///
/// Serializes to camelCase JSON, which is also the on-disk layout of the
/// local fallback store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub id: String,
  pub title: String,
  pub excerpt: String,
  /// Markdown body.
  pub content: String,
  pub category: String,
  #[serde(default)]
  pub image_url: String,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub download_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub button_text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub button_link: Option<String>,
  /// ISO-8601 creation timestamp.
  #[serde(default)]
  pub created_at: String,
  #[serde(default)]
  pub views: u64,
}

/// Input for creating a post. Identifier, timestamp and view counter are
/// assigned by whichever store ends up owning the record.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
  pub title: String,
  pub excerpt: String,
  pub content: String,
  pub category: String,
  pub image_url: String,
  pub tags: Vec<String>,
  pub download_url: Option<String>,
  pub button_text: Option<String>,
  pub button_link: Option<String>,
}

/// Partial update for a post. `None` means "leave the field untouched";
/// absent fields are never sent to the remote store.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
  pub title: Option<String>,
  pub excerpt: Option<String>,
  pub content: Option<String>,
  pub category: Option<String>,
  pub image_url: Option<String>,
  pub tags: Option<Vec<String>>,
  pub download_url: Option<String>,
  pub button_text: Option<String>,
  pub button_link: Option<String>,
}

impl PostPatch {
  /// Apply the patch to an existing post, in place.
  pub fn apply(&self, post: &mut Post) {
    if let Some(v) = &self.title {
      post.title = v.clone();
    }
    if let Some(v) = &self.excerpt {
      post.excerpt = v.clone();
    }
    if let Some(v) = &self.content {
      post.content = v.clone();
    }
    if let Some(v) = &self.category {
      post.category = v.clone();
    }
    if let Some(v) = &self.image_url {
      post.image_url = v.clone();
    }
    if let Some(v) = &self.tags {
      post.tags = v.clone();
    }
    if let Some(v) = &self.download_url {
      post.download_url = Some(v.clone());
    }
    if let Some(v) = &self.button_text {
      post.button_text = Some(v.clone());
    }
    if let Some(v) = &self.button_link {
      post.button_link = Some(v.clone());
    }
  }
}

/// Severity/category of a broadcast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  #[default]
  Info,
  Success,
  Warning,
}

/// Where the copy of a record the caller is looking at came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
  /// Held by the remote store.
  Cloud,
  /// Only persisted in the local fallback store.
  #[default]
  Local,
}

/// A broadcast banner record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: String,
  pub message: String,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub button_text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub button_link: Option<String>,
  pub active: bool,
  #[serde(default)]
  pub created_at: String,
  /// Display-only provenance marker, never written to the remote store.
  #[serde(default)]
  pub sync_status: SyncStatus,
}

/// Input for broadcasting a notification. New notifications are always
/// created active.
#[derive(Debug, Clone, Default)]
pub struct NotificationDraft {
  pub message: String,
  pub kind: NotificationKind,
  pub button_text: Option<String>,
  pub button_link: Option<String>,
}

/// Aggregate figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub total_posts: usize,
  pub total_views: u64,
  /// Rough estimate, not metered from the remote service.
  pub storage_used_mb: f64,
}
