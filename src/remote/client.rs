//! HTTP adapter for the hosted PostgREST-style store.
//!
//! All remote traffic goes through this client. Rows are translated at this
//! boundary (see [`super::rows`]) and every failure is normalized to a
//! descriptive string (see [`super::error`]) before it crosses out.

use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use tracing::warn;
use url::Url;

use crate::config::RemoteConfig;
use crate::types::{Notification, NotificationDraft, Post, PostDraft, PostPatch};

use super::error::{describe_remote_error, error_code, MISSING_COLUMN_CODE};
use super::rows::{NotificationInsert, NotificationRow, PostInsert, PostRow, PostRowPatch};

/// Bucket used for image uploads.
const IMAGES_BUCKET: &str = "images";

/// Client for the remote relational + blob store.
#[derive(Clone)]
pub struct RemoteClient {
  http: reqwest::Client,
  base: Url,
}

impl RemoteClient {
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    let mut base = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid remote store URL {}: {}", config.url, e))?;
    // Url::join treats a path without a trailing slash as a file
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(&config.anon_key)
      .map_err(|e| eyre!("Invalid API key value: {}", e))?;
    headers.insert("apikey", key);
    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key))
      .map_err(|e| eyre!("Invalid API key value: {}", e))?;
    headers.insert(AUTHORIZATION, bearer);

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint path {}: {}", path, e))
  }

  /// List all posts, newest first.
  pub async fn list_posts(&self) -> Result<Vec<Post>> {
    let mut url = self.endpoint("rest/v1/posts")?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("order", "created_at.desc");

    let rows: Vec<PostRow> = self.get_json(url).await?;
    Ok(rows.into_iter().map(PostRow::into_post).collect())
  }

  /// Get a single post by id. A miss is `Ok(None)`, never an error.
  pub async fn get_post(&self, id: &str) -> Result<Option<Post>> {
    let mut url = self.endpoint("rest/v1/posts")?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("id", &format!("eq.{}", id))
      .append_pair("limit", "1");

    let mut rows: Vec<PostRow> = self.get_json(url).await?;
    Ok(rows.pop().map(PostRow::into_post))
  }

  /// Insert a post, retrying once with the required column subset when the
  /// remote schema lacks the optional columns.
  pub async fn insert_post(&self, draft: &PostDraft) -> Result<Post> {
    let insert = PostInsert::from_draft(draft);
    let full = serde_json::to_value(&insert)?;
    let row = self
      .insert_with_schema_retry("rest/v1/posts", full, insert.required_fields())
      .await?;
    let row: PostRow = serde_json::from_value(row)
      .map_err(|e| eyre!("Failed to parse inserted post: {}", e))?;
    Ok(row.into_post())
  }

  /// Partial update of a post. Only fields present in the patch are sent.
  pub async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post> {
    let mut url = self.endpoint("rest/v1/posts")?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let body = serde_json::to_value(PostRowPatch::from(patch))?;
    let resp = self
      .http
      .patch(url)
      .header("Prefer", "return=representation")
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Remote update failed: {}", e))?;

    if !resp.status().is_success() {
      let err = read_error_body(resp).await;
      return Err(eyre!(describe_remote_error(&err)));
    }

    let mut rows: Vec<PostRow> = resp
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse updated post: {}", e))?;
    rows
      .pop()
      .map(PostRow::into_post)
      .ok_or_else(|| eyre!("Target resource not found"))
  }

  /// Delete a post by id.
  pub async fn delete_post(&self, id: &str) -> Result<()> {
    self.delete_row("rest/v1/posts", id).await
  }

  /// Atomic view-counter increment via the dedicated RPC.
  pub async fn increment_views(&self, id: &str) -> Result<()> {
    let url = self.endpoint("rest/v1/rpc/increment_views")?;
    let resp = self
      .http
      .post(url)
      .json(&json!({ "post_id": id }))
      .send()
      .await
      .map_err(|e| eyre!("Remote increment failed: {}", e))?;

    if !resp.status().is_success() {
      let err = read_error_body(resp).await;
      return Err(eyre!(describe_remote_error(&err)));
    }
    Ok(())
  }

  /// Read-modify-write fallback for the view counter. Concurrent viewers can
  /// under-count here; acceptable for an analytics figure.
  pub async fn set_views(&self, id: &str, views: u64) -> Result<()> {
    let mut url = self.endpoint("rest/v1/posts")?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let resp = self
      .http
      .patch(url)
      .json(&json!({ "views": views }))
      .send()
      .await
      .map_err(|e| eyre!("Remote update failed: {}", e))?;

    if !resp.status().is_success() {
      let err = read_error_body(resp).await;
      return Err(eyre!(describe_remote_error(&err)));
    }
    Ok(())
  }

  /// List notifications, newest first, optionally only active ones.
  pub async fn list_notifications(&self, only_active: bool) -> Result<Vec<Notification>> {
    let mut url = self.endpoint("rest/v1/notifications")?;
    {
      let mut q = url.query_pairs_mut();
      q.append_pair("select", "*");
      if only_active {
        q.append_pair("active", "eq.true");
      }
      q.append_pair("order", "created_at.desc");
    }

    let rows: Vec<NotificationRow> = self.get_json(url).await?;
    Ok(rows.into_iter().map(NotificationRow::into_notification).collect())
  }

  /// Insert a notification, with the same schema-mismatch retry as posts
  /// (older deployments lack the button columns).
  pub async fn insert_notification(&self, draft: &NotificationDraft) -> Result<Notification> {
    let insert = NotificationInsert::from_draft(draft);
    let full = serde_json::to_value(&insert)?;
    let row = self
      .insert_with_schema_retry("rest/v1/notifications", full, insert.required_fields())
      .await?;
    let row: NotificationRow = serde_json::from_value(row)
      .map_err(|e| eyre!("Failed to parse inserted notification: {}", e))?;
    Ok(row.into_notification())
  }

  /// Soft-delete: clear the active flag, keep the record queryable.
  pub async fn deactivate_notification(&self, id: &str) -> Result<()> {
    let mut url = self.endpoint("rest/v1/notifications")?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let resp = self
      .http
      .patch(url)
      .json(&json!({ "active": false }))
      .send()
      .await
      .map_err(|e| eyre!("Remote update failed: {}", e))?;

    if !resp.status().is_success() {
      let err = read_error_body(resp).await;
      return Err(eyre!(describe_remote_error(&err)));
    }
    Ok(())
  }

  /// Delete a notification by id.
  pub async fn delete_notification(&self, id: &str) -> Result<()> {
    self.delete_row("rest/v1/notifications", id).await
  }

  /// Upload an image to blob storage, returning its public URL.
  pub async fn upload_image(
    &self,
    file_name: &str,
    bytes: Vec<u8>,
    content_type: &str,
  ) -> Result<String> {
    let url = self.endpoint(&format!("storage/v1/object/{}/{}", IMAGES_BUCKET, file_name))?;
    let resp = self
      .http
      .post(url)
      .header("Content-Type", content_type)
      .body(bytes)
      .send()
      .await
      .map_err(|e| eyre!("Storage upload failed: {}", e))?;

    if !resp.status().is_success() {
      let err = read_error_body(resp).await;
      return Err(eyre!(describe_remote_error(&err)));
    }

    let public = self.endpoint(&format!(
      "storage/v1/object/public/{}/{}",
      IMAGES_BUCKET, file_name
    ))?;
    Ok(public.to_string())
  }

  async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
    let resp = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Remote fetch failed: {}", e))?;

    if !resp.status().is_success() {
      let err = read_error_body(resp).await;
      return Err(eyre!(describe_remote_error(&err)));
    }

    resp
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse remote response: {}", e))
  }

  /// Insert into `path`, retrying once with `reduced` when the failure is an
  /// unknown-column error. A successful retry is logged, not surfaced.
  async fn insert_with_schema_retry(
    &self,
    path: &str,
    full: Value,
    reduced: Value,
  ) -> Result<Value> {
    match self.try_insert(path, &full).await {
      Ok(row) => Ok(row),
      Err(err) if error_code(&err) == Some(MISSING_COLUMN_CODE) => {
        warn!(
          path,
          "remote schema is missing optional columns, retrying with required fields only"
        );
        self
          .try_insert(path, &reduced)
          .await
          .map_err(|e| eyre!(describe_remote_error(&e)))
      }
      Err(err) => Err(eyre!(describe_remote_error(&err))),
    }
  }

  /// Raw insert attempt. The error side carries the undigested error body so
  /// the caller can inspect the machine code before normalization.
  async fn try_insert(&self, path: &str, body: &Value) -> std::result::Result<Value, Value> {
    let url = match self.endpoint(path) {
      Ok(u) => u,
      Err(e) => return Err(Value::String(e.to_string())),
    };

    let resp = self
      .http
      .post(url)
      .header("Prefer", "return=representation")
      .json(body)
      .send()
      .await
      .map_err(|e| Value::String(format!("Remote insert failed: {}", e)))?;

    if !resp.status().is_success() {
      return Err(read_error_body(resp).await);
    }

    let rows: Vec<Value> = resp
      .json()
      .await
      .map_err(|e| Value::String(format!("Failed to parse insert response: {}", e)))?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| Value::String("Insert returned no rows".to_string()))
  }

  async fn delete_row(&self, path: &str, id: &str) -> Result<()> {
    let mut url = self.endpoint(path)?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let resp = self
      .http
      .delete(url)
      .send()
      .await
      .map_err(|e| eyre!("Remote delete failed: {}", e))?;

    if !resp.status().is_success() {
      let err = read_error_body(resp).await;
      return Err(eyre!(describe_remote_error(&err)));
    }
    Ok(())
  }
}

/// Read a failed response body as JSON, falling back to the raw text.
async fn read_error_body(resp: reqwest::Response) -> Value {
  let text = resp.text().await.unwrap_or_default();
  serde_json::from_str(&text).unwrap_or(Value::String(text))
}
