//! Wiki records in the main namespace.

use std::sync::Arc;

use chrono::Utc;

use super::{new_id, slugify};
use crate::errors::AppError;
use crate::models::{CreateWikiRequest, WikiRecord};
use crate::store::{decode, read_record, write_record, DocumentStore, View, ViewQuery};

/// Reads and updates wiki records and resolves wiki slugs.
#[derive(Clone)]
pub struct WikiDirectory {
    store: Arc<dyn DocumentStore>,
    main_db_name: String,
}

impl WikiDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, main_db_name: impl Into<String>) -> Self {
        Self {
            store,
            main_db_name: main_db_name.into(),
        }
    }

    pub async fn read(&self, wiki_id: &str) -> Result<WikiRecord, AppError> {
        read_record(self.store.as_ref(), &self.main_db_name, wiki_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::not_found("Wiki", wiki_id),
                other => other,
            })
    }

    /// Revision-checked overwrite of a wiki record.
    pub async fn update(
        &self,
        wiki_id: &str,
        wiki_rev: &str,
        record: &mut WikiRecord,
    ) -> Result<String, AppError> {
        record.id = wiki_id.to_string();
        record.modified_time = Utc::now().to_rfc3339();
        let rev = write_record(
            self.store.as_ref(),
            &self.main_db_name,
            wiki_id,
            wiki_rev,
            record,
        )
        .await?;
        record.rev = rev.clone();
        Ok(rev)
    }

    /// Create a wiki record. The slug must not already be taken.
    pub async fn create(&self, request: CreateWikiRequest) -> Result<WikiRecord, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::BadRequest("Wiki name is required".to_string()));
        }
        let slug = slugify(request.slug.as_deref().unwrap_or(&request.name));
        if self.resolve_slug(&slug).await?.is_some() {
            return Err(AppError::Conflict {
                message: format!("Wiki slug {} is already taken", slug),
                current_rev: None,
            });
        }

        let now = Utc::now().to_rfc3339();
        let mut record = WikiRecord {
            id: new_id(),
            rev: String::new(),
            name: request.name,
            slug,
            description: request.description,
            home_page_id: String::new(),
            created_time: now.clone(),
            modified_time: now,
        };
        let rev = write_record(
            self.store.as_ref(),
            &self.main_db_name,
            &record.id,
            "",
            &record,
        )
        .await?;
        record.rev = rev;
        tracing::info!(wiki_id = %record.id, slug = %record.slug, "Created wiki");
        Ok(record)
    }

    /// Point the wiki at a new landing page (empty clears it).
    pub async fn set_home_page(
        &self,
        wiki_id: &str,
        home_page_id: &str,
    ) -> Result<WikiRecord, AppError> {
        let mut record = self.read(wiki_id).await?;
        let rev = record.rev.clone();
        record.home_page_id = home_page_id.to_string();
        self.update(wiki_id, &rev, &mut record).await?;
        Ok(record)
    }

    /// Wiki id for a slug, if any wiki uses it.
    pub async fn resolve_slug(&self, wiki_slug: &str) -> Result<Option<String>, AppError> {
        let result = self
            .store
            .query_view(
                &self.main_db_name,
                View::WikiBySlug,
                &ViewQuery::key(wiki_slug).window(0, 1),
            )
            .await?;
        match result.rows.into_iter().next() {
            Some(doc) => Ok(Some(decode::<WikiRecord>(doc)?.id)),
            None => Ok(None),
        }
    }
}
