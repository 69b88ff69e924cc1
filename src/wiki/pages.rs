//! Page lifecycle: index, read, save, delete and history.

use std::sync::Arc;

use super::{Wiki, WikiDirectory};
use crate::errors::AppError;
use crate::models::{CurrentUser, HistoryPage, Page, PageIndex, Paging};
use crate::render::Renderer;
use crate::store::DocumentStore;

/// Coordinates page persistence, rendering and the wiki's home page pointer.
#[derive(Clone)]
pub struct PageManager {
    store: Arc<dyn DocumentStore>,
    directory: WikiDirectory,
    renderer: Renderer,
}

impl PageManager {
    pub fn new(store: Arc<dyn DocumentStore>, directory: WikiDirectory, renderer: Renderer) -> Self {
        Self {
            store,
            directory,
            renderer,
        }
    }

    pub(super) fn wiki(&self, wiki_id: &str) -> Wiki<'_> {
        Wiki::select(self.store.as_ref(), wiki_id)
    }

    /// All live pages of the wiki, sorted by title.
    pub async fn index(&self, wiki_id: &str) -> Result<PageIndex, AppError> {
        self.wiki(wiki_id).page_index().await
    }

    /// Live pages whose direct parent is `page_id`.
    pub async fn child_index(&self, wiki_id: &str, page_id: &str) -> Result<PageIndex, AppError> {
        self.wiki(wiki_id).child_page_index(page_id).await
    }

    /// The page record with its current revision in `rev`.
    pub async fn read(&self, wiki_id: &str, page_id: &str) -> Result<Page, AppError> {
        self.wiki(wiki_id).read_page(page_id).await
    }

    /// Resolve a wiki slug and then a page slug within it. Returns the wiki id
    /// alongside the page.
    pub async fn read_by_slug(
        &self,
        wiki_slug: &str,
        page_slug: &str,
    ) -> Result<(String, Page), AppError> {
        let wiki_id = self
            .directory
            .resolve_slug(wiki_slug)
            .await?
            .ok_or_else(|| AppError::not_found("Wiki with slug", wiki_slug))?;
        let page = self.wiki(&wiki_id).read_page_by_slug(page_slug).await?;
        Ok((wiki_id, page))
    }

    /// Render the Markdown, then create (empty `page_rev`) or update the page.
    pub async fn save(
        &self,
        wiki_id: &str,
        page: &mut Page,
        page_id: &str,
        page_rev: &str,
        user: &CurrentUser,
    ) -> Result<String, AppError> {
        page.content.formatted = self.renderer.render(page.content.raw.clone()).await;
        self.wiki(wiki_id)
            .save_page(page, page_id, page_rev, user.username())
            .await
    }

    /// Delete the live record of a page.
    ///
    /// If the page is the wiki's home page the pointer is cleared first. The
    /// two writes are independent: when the delete fails after the clear
    /// succeeded, the pointer stays cleared and the delete error is returned.
    pub async fn delete(
        &self,
        wiki_id: &str,
        page_id: &str,
        page_rev: &str,
        user: &CurrentUser,
    ) -> Result<String, AppError> {
        let wiki = self.wiki(wiki_id);
        let page = wiki.read_page(page_id).await?;
        if page.owning_page != page_id {
            return Err(AppError::BadRequest(
                "cannot delete a historical revision".to_string(),
            ));
        }

        let mut record = self.directory.read(wiki_id).await?;
        if record.home_page_id == page_id {
            let wiki_rev = record.rev.clone();
            record.home_page_id.clear();
            self.directory.update(wiki_id, &wiki_rev, &mut record).await?;
            tracing::info!(
                wiki_id,
                page_id,
                user = user.username(),
                "Cleared home page before delete"
            );
        }

        wiki.delete_page(page_id, page_rev).await
    }

    /// One page of the revision history, newest first.
    pub async fn history(
        &self,
        wiki_id: &str,
        page_id: &str,
        page_num: i64,
        num_per_page: i64,
    ) -> Result<HistoryPage, AppError> {
        let paging = Paging::new(page_num, num_per_page)?;
        self.wiki(wiki_id).history(page_id, paging).await
    }
}
