//! Page and comment management core.
//!
//! [`Wiki`] is a short-lived handle over one wiki's namespace that knows how
//! pages and comments are laid out in the store. The managers built on top of
//! it add rendering, authorization and cross-record rules.

mod breadcrumbs;
mod comments;
mod directory;
mod pages;

pub use comments::*;
pub use directory::*;
pub use pages::*;

use chrono::Utc;

use crate::errors::AppError;
use crate::models::{
    Comment, CommentIndexPage, HistoryEntry, HistoryPage, Page, PageIndex, PageIndexEntry, Paging,
    Record,
};
use crate::store::{decode, read_record, wiki_db_name, write_record, DocumentStore, View, ViewQuery};

/// Upper bound on `-N` suffixes tried before falling back to a random one.
const MAX_SLUG_SUFFIX: usize = 100;

/// Lowercase ASCII alphanumerics separated by single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("page");
    }
    slug
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Handle on one wiki's namespace.
pub struct Wiki<'a> {
    store: &'a dyn DocumentStore,
    db: String,
}

impl<'a> Wiki<'a> {
    pub fn select(store: &'a dyn DocumentStore, wiki_id: &str) -> Self {
        Self {
            store,
            db: wiki_db_name(wiki_id),
        }
    }

    pub async fn page_index(&self) -> Result<PageIndex, AppError> {
        self.index_view(View::PageIndex, ViewQuery::all()).await
    }

    pub async fn child_page_index(&self, page_id: &str) -> Result<PageIndex, AppError> {
        self.index_view(View::ChildPages, ViewQuery::key(page_id))
            .await
    }

    async fn index_view(&self, view: View, query: ViewQuery) -> Result<PageIndex, AppError> {
        let result = self.store.query_view(&self.db, view, &query).await?;
        result
            .rows
            .into_iter()
            .map(|doc| decode::<Page>(doc).map(|page| PageIndexEntry::from(&page)))
            .collect()
    }

    /// Any page record by document id, live or historical.
    pub async fn read_page(&self, page_id: &str) -> Result<Page, AppError> {
        read_record(self.store, &self.db, page_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::not_found("Page", page_id),
                other => other,
            })
    }

    pub async fn read_page_by_slug(&self, slug: &str) -> Result<Page, AppError> {
        let result = self
            .store
            .query_view(&self.db, View::PageBySlug, &ViewQuery::key(slug).window(0, 1))
            .await?;
        match result.rows.into_iter().next() {
            Some(doc) => decode(doc),
            None => Err(AppError::not_found("Page with slug", slug)),
        }
    }

    /// Pages for the given ids, in lineage order. Ids that no longer resolve
    /// to a page are skipped.
    pub async fn read_multiple_pages(&self, ids: &[String]) -> Result<Vec<Page>, AppError> {
        self.store
            .multi_read(&self.db, ids)
            .await?
            .into_iter()
            .filter(|doc| doc.kind == Page::KIND)
            .map(decode)
            .collect()
    }

    /// Reject a lineage that would place `page_id` under one of its own
    /// descendants.
    async fn ensure_acyclic(&self, lineage: &[String], page_id: &str) -> Result<(), AppError> {
        if lineage.is_empty() {
            return Ok(());
        }
        for ancestor in self.read_multiple_pages(lineage).await? {
            if ancestor.lineage.iter().any(|id| id == page_id) {
                return Err(AppError::BadRequest(format!(
                    "page {} cannot be placed under its descendant {}",
                    page_id, ancestor.id
                )));
            }
        }
        Ok(())
    }

    /// Create (empty `page_rev`) or update the live record of a page.
    ///
    /// Updates overwrite the live record first and then keep the previous
    /// content as a history snapshot owned by the page.
    pub async fn save_page(
        &self,
        page: &mut Page,
        page_id: &str,
        page_rev: &str,
        editor: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now().to_rfc3339();
        page.editor = editor.to_string();
        page.timestamp = now;

        if page_rev.is_empty() {
            let id = if page_id.is_empty() {
                new_id()
            } else {
                page_id.to_string()
            };
            page.validate_lineage(&id)?;
            if !page_id.is_empty() {
                self.ensure_acyclic(&page.lineage, &id).await?;
            }
            page.id = id.clone();
            page.owning_page = id.clone();
            let base = if page.slug.is_empty() {
                slugify(&page.title)
            } else {
                slugify(&page.slug)
            };

            let rev = self.write_with_free_slug(page, &base, &id, "").await?;
            tracing::info!(namespace = %self.db, page_id = %id, %rev, "Created page");
            page.rev = rev.clone();
            return Ok(rev);
        }

        if page_id.is_empty() {
            return Err(AppError::BadRequest(
                "Page id is required to update a page".to_string(),
            ));
        }

        let previous = self.read_page(page_id).await?;
        if !previous.is_live() {
            return Err(AppError::BadRequest(
                "cannot overwrite a historical revision".to_string(),
            ));
        }

        page.validate_lineage(page_id)?;
        self.ensure_acyclic(&page.lineage, page_id).await?;
        page.id = page_id.to_string();
        page.owning_page = page_id.to_string();

        let rev = if page.slug.is_empty() || page.slug == previous.slug {
            page.slug = previous.slug.clone();
            write_record(self.store, &self.db, page_id, page_rev, page).await?
        } else {
            let base = slugify(&page.slug);
            self.write_with_free_slug(page, &base, page_id, page_rev).await?
        };
        page.rev = rev.clone();
        tracing::info!(namespace = %self.db, page_id, %rev, "Updated page");

        let mut snapshot = previous;
        snapshot.id = new_id();
        snapshot.owning_page = page_id.to_string();
        if let Err(e) = write_record(self.store, &self.db, &snapshot.id, "", &snapshot).await {
            tracing::warn!(
                namespace = %self.db,
                page_id,
                error = %e,
                "Failed to record page history snapshot"
            );
        }

        Ok(rev)
    }

    pub async fn delete_page(&self, page_id: &str, page_rev: &str) -> Result<String, AppError> {
        let rev = self.store.delete(&self.db, page_id, page_rev).await?;
        tracing::info!(namespace = %self.db, page_id, "Deleted page");
        Ok(rev)
    }

    /// Every revision record of the logical page, newest first.
    pub async fn history(&self, page_id: &str, paging: Paging) -> Result<HistoryPage, AppError> {
        let query = ViewQuery::key(page_id).window(paging.offset(), paging.num_per_page);
        let result = self
            .store
            .query_view(&self.db, View::PageHistory, &query)
            .await?;
        let rows = result
            .rows
            .into_iter()
            .map(|doc| decode::<Page>(doc).map(|page| HistoryEntry::from(&page)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HistoryPage {
            total_rows: result.total_rows,
            offset: result.offset,
            rows,
        })
    }

    /// Write the live page under the first free slug derived from `base`.
    /// The store's unique slug index settles races: a write that loses one
    /// moves on to the next suffix.
    async fn write_with_free_slug(
        &self,
        page: &mut Page,
        base: &str,
        page_id: &str,
        page_rev: &str,
    ) -> Result<String, AppError> {
        let mut from = 1;
        loop {
            let (slug, n) = self.free_slug(base, page_id, from).await?;
            page.slug = slug;
            match write_record(self.store, &self.db, page_id, page_rev, page).await {
                Err(AppError::Duplicate(_)) if n <= MAX_SLUG_SUFFIX => {
                    tracing::debug!(
                        namespace = %self.db,
                        page_id,
                        slug = %page.slug,
                        "Slug taken concurrently, retrying"
                    );
                    from = n + 1;
                }
                other => return other,
            }
        }
    }

    /// First free slug from suffix `from` on, with the suffix it used; a slug
    /// already held by `page_id` itself counts as free. Past
    /// `MAX_SLUG_SUFFIX` a random suffix is used.
    async fn free_slug(
        &self,
        base: &str,
        page_id: &str,
        from: usize,
    ) -> Result<(String, usize), AppError> {
        for n in from..=MAX_SLUG_SUFFIX {
            let candidate = if n == 1 {
                base.to_string()
            } else {
                format!("{}-{}", base, n)
            };
            match self.read_page_by_slug(&candidate).await {
                Ok(holder) if holder.id != page_id => continue,
                Ok(_) | Err(AppError::NotFound(_)) => return Ok((candidate, n)),
                Err(e) => return Err(e),
            }
        }
        Ok((
            format!("{}-{}", base, &new_id()[..8]),
            MAX_SLUG_SUFFIX + 1,
        ))
    }

    pub async fn read_comment(&self, comment_id: &str) -> Result<Comment, AppError> {
        read_record(self.store, &self.db, comment_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::not_found("Comment", comment_id),
                other => other,
            })
    }

    /// Create or update a comment. Updates keep the stored author, creation
    /// time and page.
    pub async fn save_comment(
        &self,
        comment: &mut Comment,
        comment_id: &str,
        comment_rev: &str,
        page_id: &str,
        author: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now().to_rfc3339();
        comment.modified_time = now.clone();

        if comment_rev.is_empty() {
            self.read_page(page_id).await?;
            let id = if comment_id.is_empty() {
                new_id()
            } else {
                comment_id.to_string()
            };
            comment.id = id.clone();
            comment.page_id = page_id.to_string();
            comment.author = author.to_string();
            comment.created_time = now;

            let rev = write_record(self.store, &self.db, &id, "", comment).await?;
            tracing::info!(namespace = %self.db, comment_id = %id, page_id, "Created comment");
            comment.rev = rev.clone();
            return Ok(rev);
        }

        let existing = self.read_comment(comment_id).await?;
        comment.id = comment_id.to_string();
        comment.page_id = existing.page_id;
        comment.author = existing.author;
        comment.created_time = existing.created_time;

        let rev = write_record(self.store, &self.db, comment_id, comment_rev, comment).await?;
        tracing::info!(namespace = %self.db, comment_id, "Updated comment");
        comment.rev = rev.clone();
        Ok(rev)
    }

    pub async fn delete_comment(
        &self,
        comment_id: &str,
        comment_rev: &str,
    ) -> Result<String, AppError> {
        let rev = self.store.delete(&self.db, comment_id, comment_rev).await?;
        tracing::info!(namespace = %self.db, comment_id, "Deleted comment");
        Ok(rev)
    }

    pub async fn comments_for_page(
        &self,
        page_id: &str,
        paging: Paging,
    ) -> Result<CommentIndexPage, AppError> {
        let query = ViewQuery::key(page_id).window(paging.offset(), paging.num_per_page);
        let result = self
            .store
            .query_view(&self.db, View::CommentsByPage, &query)
            .await?;
        let rows = result
            .rows
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<Comment>, _>>()?;
        Ok(CommentIndexPage {
            total_rows: result.total_rows,
            offset: result.offset,
            rows,
        })
    }
}
