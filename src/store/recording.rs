//! SQLite store that records the calls passing through it.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    DocumentStore, NewDocument, SqliteDocumentStore, StoredDocument, View, ViewQuery, ViewResult,
};
use crate::errors::AppError;

pub struct RecordingStore {
    inner: SqliteDocumentStore,
    mutations: AtomicUsize,
    view_namespaces: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        Ok(Self {
            inner: SqliteDocumentStore::open(db_path).await?,
            mutations: AtomicUsize::new(0),
            view_namespaces: Mutex::new(Vec::new()),
        })
    }

    /// Writes plus deletes seen so far.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// View queries issued against namespaces starting with `prefix`.
    pub fn view_queries_in(&self, prefix: &str) -> usize {
        self.view_namespaces
            .lock()
            .unwrap()
            .iter()
            .filter(|ns| ns.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn read(&self, db: &str, id: &str) -> Result<StoredDocument, AppError> {
        self.inner.read(db, id).await
    }

    async fn write(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        doc: NewDocument,
    ) -> Result<String, AppError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.inner.write(db, id, rev, doc).await
    }

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<String, AppError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(db, id, rev).await
    }

    async fn multi_read(&self, db: &str, ids: &[String]) -> Result<Vec<StoredDocument>, AppError> {
        self.inner.multi_read(db, ids).await
    }

    async fn query_view(
        &self,
        db: &str,
        view: View,
        query: &ViewQuery,
    ) -> Result<ViewResult, AppError> {
        self.view_namespaces.lock().unwrap().push(db.to_string());
        self.inner.query_view(db, view, query).await
    }
}
