//! SQLite implementation of the document store.
//!
//! All namespaces share one `documents` table keyed by `(namespace, id)`.
//! Bodies are JSON text; views are evaluated with `json_extract`.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::{
    next_revision, revision_generation, DocumentStore, NewDocument, StoredDocument, View,
    ViewQuery, ViewResult,
};
use crate::errors::AppError;

const DOCUMENT_COLUMNS: &str = "id, rev, kind, schema_version, body";

/// Document store backed by a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create the documents table if it doesn't exist.
    async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                namespace TEXT NOT NULL,
                id TEXT NOT NULL,
                rev TEXT NOT NULL,
                kind TEXT NOT NULL,
                schema_version INTEGER NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_kind ON documents(namespace, kind);
            "#,
        )
        .execute(&self.pool)
        .await?;

        // One live page per slug; history snapshots share their page's slug
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_live_page_slug
            ON documents(namespace, json_extract(body, '$.slug'))
            WHERE kind = 'page' AND json_extract(body, '$.owningPage') = id;
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current revision of a document, if it exists.
    async fn current_rev(&self, db: &str, id: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT rev FROM documents WHERE namespace = ? AND id = ?")
            .bind(db)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("rev")))
    }

    /// Explain why a revision-guarded statement touched no row.
    async fn guard_failure(&self, db: &str, id: &str, rev: &str) -> AppError {
        match self.current_rev(db, id).await {
            Ok(Some(current)) => AppError::Conflict {
                message: format!(
                    "Document {} is at revision {}, not {}",
                    id, current, rev
                ),
                current_rev: Some(current),
            },
            Ok(None) => AppError::not_found("Document", id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn read(&self, db: &str, id: &str) -> Result<StoredDocument, AppError> {
        let sql = format!(
            "SELECT {} FROM documents WHERE namespace = ? AND id = ?",
            DOCUMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(db)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => document_from_row(&row),
            None => Err(AppError::not_found("Document", id)),
        }
    }

    async fn write(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        doc: NewDocument,
    ) -> Result<String, AppError> {
        if id.is_empty() {
            return Err(AppError::BadRequest("Document id is required".to_string()));
        }

        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(&doc.body)?;

        if rev.is_empty() {
            let new_rev = next_revision(0);
            let result = sqlx::query(
                "INSERT INTO documents (namespace, id, rev, kind, schema_version, body, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) ON CONFLICT(namespace, id) DO NOTHING",
            )
            .bind(db)
            .bind(id)
            .bind(&new_rev)
            .bind(doc.kind)
            .bind(doc.schema_version)
            .bind(&body)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, db, id))?;

            if result.rows_affected() == 0 {
                let current = self.current_rev(db, id).await?;
                return Err(AppError::Conflict {
                    message: format!("Document {} already exists", id),
                    current_rev: current,
                });
            }

            tracing::debug!(namespace = db, id, rev = %new_rev, "Created document");
            return Ok(new_rev);
        }

        let generation = revision_generation(rev)
            .ok_or_else(|| AppError::BadRequest(format!("Malformed revision token {:?}", rev)))?;
        let new_rev = next_revision(generation);

        // Conditional UPDATE on the revision closes the read-then-write race
        let result = sqlx::query(
            "UPDATE documents SET rev = ?, kind = ?, schema_version = ?, body = ?, updated_at = ? WHERE namespace = ? AND id = ? AND rev = ?",
        )
        .bind(&new_rev)
        .bind(doc.kind)
        .bind(doc.schema_version)
        .bind(&body)
        .bind(&now)
        .bind(db)
        .bind(id)
        .bind(rev)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, db, id))?;

        if result.rows_affected() == 0 {
            return Err(self.guard_failure(db, id, rev).await);
        }

        tracing::debug!(namespace = db, id, rev = %new_rev, "Updated document");
        Ok(new_rev)
    }

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<String, AppError> {
        let generation = revision_generation(rev)
            .ok_or_else(|| AppError::BadRequest(format!("Malformed revision token {:?}", rev)))?;

        let result = sqlx::query("DELETE FROM documents WHERE namespace = ? AND id = ? AND rev = ?")
            .bind(db)
            .bind(id)
            .bind(rev)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.guard_failure(db, id, rev).await);
        }

        tracing::debug!(namespace = db, id, "Deleted document");
        Ok(next_revision(generation))
    }

    async fn multi_read(&self, db: &str, ids: &[String]) -> Result<Vec<StoredDocument>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM documents WHERE namespace = ",
            DOCUMENT_COLUMNS
        ));
        builder.push_bind(db);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let doc = document_from_row(row)?;
            by_id.insert(doc.id.clone(), doc);
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn query_view(
        &self,
        db: &str,
        view: View,
        query: &ViewQuery,
    ) -> Result<ViewResult, AppError> {
        let key = match (&query.key, view.requires_key()) {
            (Some(key), true) => Some(key.as_str()),
            (None, true) => {
                return Err(AppError::BadRequest(format!(
                    "View {} requires a key",
                    view.name()
                )))
            }
            (_, false) => None,
        };
        let (filter, order) = view_sql(view);

        let count_sql = format!(
            "SELECT COUNT(*) AS total FROM documents WHERE namespace = ? AND {}",
            filter
        );
        let mut count_query = sqlx::query(&count_sql).bind(db);
        if let Some(key) = key {
            count_query = count_query.bind(key);
        }
        let total_rows: i64 = count_query.fetch_one(&self.pool).await?.get("total");

        let rows_sql = format!(
            "SELECT {} FROM documents WHERE namespace = ? AND {} ORDER BY {} LIMIT ? OFFSET ?",
            DOCUMENT_COLUMNS, filter, order
        );
        let mut rows_query = sqlx::query(&rows_sql).bind(db);
        if let Some(key) = key {
            rows_query = rows_query.bind(key);
        }
        let rows = rows_query
            .bind(query.limit.unwrap_or(-1))
            .bind(query.skip)
            .fetch_all(&self.pool)
            .await?;

        let rows = rows
            .iter()
            .map(document_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ViewResult {
            total_rows,
            offset: query.skip,
            rows,
        })
    }
}

/// WHERE fragment and ORDER BY clause for each view. Keyed views bind the
/// key as the second parameter, after the namespace.
fn view_sql(view: View) -> (&'static str, &'static str) {
    match view {
        View::PageIndex => (
            "kind = 'page' AND json_extract(body, '$.owningPage') = id",
            "json_extract(body, '$.title') COLLATE NOCASE, id",
        ),
        View::ChildPages => (
            "kind = 'page' AND json_extract(body, '$.owningPage') = id AND json_extract(body, '$.lineage[#-1]') = ?",
            "json_extract(body, '$.title') COLLATE NOCASE, id",
        ),
        View::PageBySlug => (
            "kind = 'page' AND json_extract(body, '$.owningPage') = id AND json_extract(body, '$.slug') = ?",
            "id",
        ),
        View::PageHistory => (
            "kind = 'page' AND json_extract(body, '$.owningPage') = ?",
            "json_extract(body, '$.timestamp') DESC, updated_at DESC, id",
        ),
        View::CommentsByPage => (
            "kind = 'comment' AND json_extract(body, '$.pageId') = ?",
            "json_extract(body, '$.createdTime'), id",
        ),
        View::WikiBySlug => (
            "kind = 'wiki' AND json_extract(body, '$.slug') = ?",
            "id",
        ),
    }
}

/// Unique index hits become `Duplicate`; everything else is a database error.
fn unique_violation(err: sqlx::Error, db: &str, id: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            tracing::debug!(namespace = db, id, "Unique key already taken");
            AppError::Duplicate(format!(
                "Document {} duplicates a unique key: {}",
                id,
                db_err.message()
            ))
        }
        _ => err.into(),
    }
}

fn document_from_row(row: &SqliteRow) -> Result<StoredDocument, AppError> {
    let body: String = row.get("body");
    Ok(StoredDocument {
        id: row.get("id"),
        rev: row.get("rev"),
        kind: row.get("kind"),
        schema_version: row.get("schema_version"),
        body: serde_json::from_str(&body)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_store() -> (SqliteDocumentStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteDocumentStore::open(&temp_dir.path().join("docs.sqlite"))
            .await
            .expect("Failed to open store");
        (store, temp_dir)
    }

    fn page_doc(title: &str, owning_page: &str, lineage: &[&str]) -> NewDocument {
        NewDocument {
            kind: "page",
            schema_version: 1,
            body: json!({
                "title": title,
                "slug": title.to_lowercase(),
                "owningPage": owning_page,
                "lineage": lineage,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        }
    }

    #[tokio::test]
    async fn test_write_read_update_delete() {
        let (store, _dir) = open_store().await;

        let rev1 = store
            .write("wiki_a", "p1", "", page_doc("One", "p1", &[]))
            .await
            .unwrap();
        assert_eq!(revision_generation(&rev1), Some(1));

        let doc = store.read("wiki_a", "p1").await.unwrap();
        assert_eq!(doc.rev, rev1);
        assert_eq!(doc.body["title"], "One");

        let rev2 = store
            .write("wiki_a", "p1", &rev1, page_doc("Uno", "p1", &[]))
            .await
            .unwrap();
        assert_eq!(revision_generation(&rev2), Some(2));

        // Stale token is rejected, not merged
        let err = store
            .write("wiki_a", "p1", &rev1, page_doc("Eins", "p1", &[]))
            .await
            .unwrap_err();
        match err {
            AppError::Conflict { current_rev, .. } => assert_eq!(current_rev, Some(rev2.clone())),
            other => panic!("expected conflict, got {other:?}"),
        }

        let tombstone = store.delete("wiki_a", "p1", &rev2).await.unwrap();
        assert_eq!(revision_generation(&tombstone), Some(3));
        assert!(matches!(
            store.read("wiki_a", "p1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_existing_id_conflicts() {
        let (store, _dir) = open_store().await;
        store
            .write("wiki_a", "p1", "", page_doc("One", "p1", &[]))
            .await
            .unwrap();
        let err = store
            .write("wiki_a", "p1", "", page_doc("One", "p1", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_live_page_slug_is_unique() {
        let (store, _dir) = open_store().await;
        store
            .write("wiki_a", "p1", "", page_doc("Intro", "p1", &[]))
            .await
            .unwrap();

        let err = store
            .write("wiki_a", "p2", "", page_doc("Intro", "p2", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)), "got {err:?}");
        assert!(matches!(
            store.read("wiki_a", "p2").await,
            Err(AppError::NotFound(_))
        ));

        // Snapshots and other namespaces may reuse the slug
        store
            .write("wiki_a", "snap", "", page_doc("Intro", "p1", &[]))
            .await
            .unwrap();
        store
            .write("wiki_b", "p2", "", page_doc("Intro", "p2", &[]))
            .await
            .unwrap();

        // Renaming onto a taken slug is refused too
        let rev = store
            .write("wiki_a", "p3", "", page_doc("Other", "p3", &[]))
            .await
            .unwrap();
        let err = store
            .write("wiki_a", "p3", &rev, page_doc("Intro", "p3", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let (store, _dir) = open_store().await;
        store
            .write("wiki_a", "p1", "", page_doc("One", "p1", &[]))
            .await
            .unwrap();
        assert!(matches!(
            store.read("wiki_b", "p1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_multi_read_keeps_request_order_and_skips_missing() {
        let (store, _dir) = open_store().await;
        for id in ["a", "b", "c"] {
            store
                .write("wiki_a", id, "", page_doc(id, id, &[]))
                .await
                .unwrap();
        }
        let ids = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
        let docs = store.multi_read("wiki_a", &ids).await.unwrap();
        let got: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(got, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_views() {
        let (store, _dir) = open_store().await;
        store
            .write("wiki_a", "root", "", page_doc("Root", "root", &[]))
            .await
            .unwrap();
        store
            .write("wiki_a", "kid", "", page_doc("Kid", "kid", &["root"]))
            .await
            .unwrap();
        // History snapshot of "kid": not live, owned by "kid"
        store
            .write("wiki_a", "snap", "", page_doc("Kid old", "kid", &["root"]))
            .await
            .unwrap();

        let index = store
            .query_view("wiki_a", View::PageIndex, &ViewQuery::all())
            .await
            .unwrap();
        let titles: Vec<_> = index.rows.iter().map(|d| d.body["title"].clone()).collect();
        assert_eq!(titles, vec![json!("Kid"), json!("Root")]);

        let children = store
            .query_view("wiki_a", View::ChildPages, &ViewQuery::key("root"))
            .await
            .unwrap();
        assert_eq!(children.total_rows, 1);
        assert_eq!(children.rows[0].id, "kid");

        let history = store
            .query_view("wiki_a", View::PageHistory, &ViewQuery::key("kid").window(0, 1))
            .await
            .unwrap();
        assert_eq!(history.total_rows, 2);
        assert_eq!(history.rows.len(), 1);

        let by_slug = store
            .query_view("wiki_a", View::PageBySlug, &ViewQuery::key("root"))
            .await
            .unwrap();
        assert_eq!(by_slug.rows[0].id, "root");

        let err = store
            .query_view("wiki_a", View::ChildPages, &ViewQuery::all())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
