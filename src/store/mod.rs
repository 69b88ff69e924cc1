//! Revisioned document store.
//!
//! The core talks to persistence only through [`DocumentStore`]. Every call is
//! scoped to a namespace: one per wiki (`wiki_<id>`) plus the main namespace
//! holding wiki records. Writes and deletes are guarded by revision tokens;
//! the store is the only arbiter of concurrent writes to a record.

mod sqlite;
#[cfg(test)]
mod recording;

pub use sqlite::*;
#[cfg(test)]
pub use recording::RecordingStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::Record;

/// Namespace backing a single wiki.
pub fn wiki_db_name(wiki_id: &str) -> String {
    format!("wiki_{}", wiki_id)
}

/// Body and metadata of a document about to be written.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub kind: &'static str,
    pub schema_version: i64,
    pub body: Value,
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub rev: String,
    pub kind: String,
    pub schema_version: i64,
    pub body: Value,
}

/// Named views the store knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Live pages, ordered by title.
    PageIndex,
    /// Live pages whose direct parent is the key.
    ChildPages,
    /// Live page whose slug is the key.
    PageBySlug,
    /// Every revision record owned by the key page, newest first.
    PageHistory,
    /// Comments on the key page, oldest first.
    CommentsByPage,
    /// Wiki record whose slug is the key (main namespace).
    WikiBySlug,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::PageIndex => "page_index",
            View::ChildPages => "child_pages",
            View::PageBySlug => "page_by_slug",
            View::PageHistory => "page_history",
            View::CommentsByPage => "comments_by_page",
            View::WikiBySlug => "wiki_by_slug",
        }
    }

    pub fn requires_key(&self) -> bool {
        !matches!(self, View::PageIndex)
    }
}

/// Key and window for a view query. A `limit` of `None` returns every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub key: Option<String>,
    pub skip: i64,
    pub limit: Option<i64>,
}

impl ViewQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn window(mut self, skip: i64, limit: i64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewResult {
    /// Rows matching the key, ignoring the window.
    pub total_rows: i64,
    pub offset: i64,
    pub rows: Vec<StoredDocument>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `NotFound` if absent.
    async fn read(&self, db: &str, id: &str) -> Result<StoredDocument, AppError>;

    /// Create (empty `rev`) or update (matching `rev`) a document, returning
    /// the new revision token.
    async fn write(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        doc: NewDocument,
    ) -> Result<String, AppError>;

    /// Delete a document at `rev`, returning the tombstone revision.
    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<String, AppError>;

    /// Fetch several documents, in request order. Missing ids are skipped.
    async fn multi_read(&self, db: &str, ids: &[String]) -> Result<Vec<StoredDocument>, AppError>;

    async fn query_view(
        &self,
        db: &str,
        view: View,
        query: &ViewQuery,
    ) -> Result<ViewResult, AppError>;
}

/// Revision tokens look like `<generation>-<uuid>`.
pub fn revision_generation(rev: &str) -> Option<i64> {
    rev.split_once('-')
        .and_then(|(generation, _)| generation.parse().ok())
}

/// Token for the revision following `generation`.
pub fn next_revision(generation: i64) -> String {
    format!("{}-{}", generation + 1, uuid::Uuid::new_v4().simple())
}

/// Decode a stored document into its typed record, checking its kind.
pub fn decode<T: Record>(doc: StoredDocument) -> Result<T, AppError> {
    if doc.kind != T::KIND {
        return Err(AppError::NotFound(format!(
            "{} {} not found",
            T::KIND,
            doc.id
        )));
    }
    if doc.schema_version > T::SCHEMA_VERSION {
        return Err(AppError::Internal(format!(
            "{} {} has schema version {}, newer than supported {}",
            T::KIND,
            doc.id,
            doc.schema_version,
            T::SCHEMA_VERSION
        )));
    }
    let mut record: T = serde_json::from_value(doc.body)?;
    record.set_id(doc.id);
    record.set_rev(doc.rev);
    Ok(record)
}

/// Encode a typed record for writing.
pub fn encode<T: Record>(record: &T) -> Result<NewDocument, AppError> {
    let mut body = serde_json::to_value(record)?;
    // The token lives in the row; a copy in the body would go stale.
    if let Value::Object(map) = &mut body {
        map.remove("rev");
    }
    Ok(NewDocument {
        kind: T::KIND,
        schema_version: T::SCHEMA_VERSION,
        body,
    })
}

/// Read a typed record, returning it with its current revision.
pub async fn read_record<T: Record>(
    store: &dyn DocumentStore,
    db: &str,
    id: &str,
) -> Result<T, AppError> {
    let doc = store.read(db, id).await?;
    decode(doc)
}

/// Write a typed record under `id` at `rev`. The record must already carry
/// that id.
pub async fn write_record<T: Record>(
    store: &dyn DocumentStore,
    db: &str,
    id: &str,
    rev: &str,
    record: &T,
) -> Result<String, AppError> {
    if record.id() != id {
        return Err(AppError::Internal(format!(
            "{} record id {:?} does not match document id {:?}",
            T::KIND,
            record.id(),
            id
        )));
    }
    let doc = encode(record)?;
    store.write(db, id, rev, doc).await
}
