//! Serde types matching the remote table schemas.
//!
//! The hosted store uses snake_case column names; the application model uses
//! its own shape. Keeping wire rows separate from domain types means the
//! translation happens exactly once, at this boundary, in both directions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{
  Notification, NotificationDraft, NotificationKind, Post, PostDraft, PostPatch, SyncStatus,
};

// ============================================================================
// posts table
// ============================================================================

/// A row of the remote `posts` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRow {
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub excerpt: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub category: String,
  pub image_url: Option<String>,
  #[serde(default)]
  pub tags: Option<Vec<String>>,
  pub download_url: Option<String>,
  pub button_text: Option<String>,
  pub button_link: Option<String>,
  pub views: Option<u64>,
  pub created_at: Option<String>,
}

impl PostRow {
  /// Translate into the internal shape, defaulting absent optionals.
  pub fn into_post(self) -> Post {
    Post {
      id: self.id,
      title: self.title,
      excerpt: self.excerpt,
      content: self.content,
      category: self.category,
      image_url: self.image_url.unwrap_or_default(),
      tags: self.tags.unwrap_or_default(),
      download_url: self.download_url,
      button_text: self.button_text,
      button_link: self.button_link,
      created_at: self.created_at.unwrap_or_default(),
      views: self.views.unwrap_or(0),
    }
  }
}

/// Insert payload for the `posts` table.
///
/// Optional columns are serialized as explicit `null` when absent; the
/// remote schema owns id and created_at.
#[derive(Debug, Clone, Serialize)]
pub struct PostInsert {
  pub title: String,
  pub excerpt: String,
  pub content: String,
  pub category: String,
  pub image_url: String,
  pub tags: Vec<String>,
  pub download_url: Option<String>,
  pub button_text: Option<String>,
  pub button_link: Option<String>,
  pub views: u64,
}

impl PostInsert {
  pub fn from_draft(draft: &PostDraft) -> Self {
    Self {
      title: draft.title.clone(),
      excerpt: draft.excerpt.clone(),
      content: draft.content.clone(),
      category: draft.category.clone(),
      image_url: draft.image_url.clone(),
      tags: draft.tags.clone(),
      download_url: draft.download_url.clone(),
      button_text: draft.button_text.clone(),
      button_link: draft.button_link.clone(),
      views: 0,
    }
  }

  /// Required-column subset for the schema-mismatch retry.
  pub fn required_fields(&self) -> Value {
    json!({
      "title": self.title,
      "excerpt": self.excerpt,
      "content": self.content,
      "category": self.category,
      "views": self.views,
    })
  }
}

/// Partial update payload for the `posts` table.
///
/// Absent fields are skipped entirely so they never null-out remote values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostRowPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub excerpt: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub download_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub button_text: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub button_link: Option<String>,
}

impl From<&PostPatch> for PostRowPatch {
  fn from(patch: &PostPatch) -> Self {
    Self {
      title: patch.title.clone(),
      excerpt: patch.excerpt.clone(),
      content: patch.content.clone(),
      category: patch.category.clone(),
      image_url: patch.image_url.clone(),
      tags: patch.tags.clone(),
      download_url: patch.download_url.clone(),
      button_text: patch.button_text.clone(),
      button_link: patch.button_link.clone(),
    }
  }
}

// ============================================================================
// notifications table
// ============================================================================

/// A row of the remote `notifications` table.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRow {
  pub id: String,
  #[serde(default)]
  pub message: String,
  #[serde(default, rename = "type")]
  pub kind: NotificationKind,
  pub button_text: Option<String>,
  pub button_link: Option<String>,
  #[serde(default)]
  pub active: bool,
  pub created_at: Option<String>,
}

impl NotificationRow {
  /// Translate into the internal shape. Anything read off the wire is by
  /// definition cloud-held.
  pub fn into_notification(self) -> Notification {
    Notification {
      id: self.id,
      message: self.message,
      kind: self.kind,
      button_text: self.button_text,
      button_link: self.button_link,
      active: self.active,
      created_at: self.created_at.unwrap_or_default(),
      sync_status: SyncStatus::Cloud,
    }
  }
}

/// Insert payload for the `notifications` table. Broadcasts start active.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationInsert {
  pub message: String,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  pub button_text: Option<String>,
  pub button_link: Option<String>,
  pub active: bool,
}

impl NotificationInsert {
  pub fn from_draft(draft: &NotificationDraft) -> Self {
    Self {
      message: draft.message.clone(),
      kind: draft.kind,
      button_text: draft.button_text.clone(),
      button_link: draft.button_link.clone(),
      active: true,
    }
  }

  /// Required-column subset for the schema-mismatch retry (older remote
  /// schemas lack the button columns).
  pub fn required_fields(&self) -> Value {
    json!({
      "message": self.message,
      "type": self.kind,
      "active": self.active,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_post() -> Post {
    Post {
      id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".into(),
      title: "Release notes".into(),
      excerpt: "What changed".into(),
      content: "# Changes\n\n- things".into(),
      category: "engineering".into(),
      image_url: "https://cdn.example/cover.png".into(),
      tags: vec!["release".into(), "notes".into()],
      download_url: Some("https://cdn.example/bundle.zip".into()),
      button_text: Some("Download".into()),
      button_link: Some("https://example.com".into()),
      created_at: "2024-03-01T09:30:00+00:00".into(),
      views: 12,
    }
  }

  #[test]
  fn post_row_round_trips_through_wire_shape() {
    let post = sample_post();
    // Internal -> wire names -> internal must preserve every field.
    let wire = json!({
      "id": post.id,
      "title": post.title,
      "excerpt": post.excerpt,
      "content": post.content,
      "category": post.category,
      "image_url": post.image_url,
      "tags": post.tags,
      "download_url": post.download_url,
      "button_text": post.button_text,
      "button_link": post.button_link,
      "views": post.views,
      "created_at": post.created_at,
    });
    let row: PostRow = serde_json::from_value(wire).unwrap();
    assert_eq!(row.into_post(), post);
  }

  #[test]
  fn post_row_defaults_missing_optionals() {
    let row: PostRow = serde_json::from_value(json!({
      "id": "p1",
      "title": "t",
      "excerpt": "e",
      "content": "c",
      "category": "misc",
    }))
    .unwrap();
    let post = row.into_post();
    assert_eq!(post.tags, Vec::<String>::new());
    assert_eq!(post.views, 0);
    assert_eq!(post.image_url, "");
    assert_eq!(post.download_url, None);
  }

  #[test]
  fn insert_serializes_absent_optionals_as_null() {
    let insert = PostInsert::from_draft(&PostDraft {
      title: "t".into(),
      excerpt: "e".into(),
      content: "c".into(),
      category: "misc".into(),
      image_url: "https://img".into(),
      tags: vec![],
      ..Default::default()
    });
    let v = serde_json::to_value(&insert).unwrap();
    assert!(v["download_url"].is_null());
    assert!(v["button_text"].is_null());
    assert_eq!(v["views"], 0);
  }

  #[test]
  fn patch_skips_absent_fields() {
    let patch = PostPatch {
      title: Some("new title".into()),
      ..Default::default()
    };
    let v = serde_json::to_value(PostRowPatch::from(&patch)).unwrap();
    let obj = v.as_object().unwrap();
    assert_eq!(obj.len(), 1);
    assert_eq!(obj["title"], "new title");
  }

  #[test]
  fn notification_row_marks_cloud_provenance() {
    let row: NotificationRow = serde_json::from_value(json!({
      "id": "n1",
      "message": "maintenance window",
      "type": "warning",
      "active": true,
      "button_text": null,
      "button_link": null,
      "created_at": "2024-03-01T09:30:00+00:00",
    }))
    .unwrap();
    let n = row.into_notification();
    assert_eq!(n.sync_status, SyncStatus::Cloud);
    assert_eq!(n.kind, NotificationKind::Warning);
  }

  #[test]
  fn notification_required_subset_drops_button_columns() {
    let insert = NotificationInsert::from_draft(&NotificationDraft {
      message: "hello".into(),
      kind: NotificationKind::Info,
      button_text: Some("Go".into()),
      button_link: Some("https://example.com".into()),
    });
    let reduced = insert.required_fields();
    let obj = reduced.as_object().unwrap();
    assert!(obj.contains_key("message"));
    assert!(!obj.contains_key("button_text"));
    assert_eq!(reduced["active"], true);
  }
}
