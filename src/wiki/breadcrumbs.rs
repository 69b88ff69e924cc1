//! Ancestor trail for page navigation.

use super::PageManager;
use crate::errors::AppError;
use crate::models::{Breadcrumb, Page};

impl PageManager {
    /// Breadcrumbs from the root down to `page_id`.
    ///
    /// Ancestors above the direct parent are bulk-fetched from
    /// `lineage[..len - 1]`; the direct parent is then read through the page's
    /// own parent pointer, and the page itself is always the last crumb. Each
    /// crumb's `parent` is the second-to-last entry of that row's own lineage.
    /// Ancestors that no longer exist are left out of the trail.
    pub async fn breadcrumbs(
        &self,
        wiki_id: &str,
        page_id: &str,
    ) -> Result<Vec<Breadcrumb>, AppError> {
        let wiki = self.wiki(wiki_id);
        let page = wiki.read_page(page_id).await?;

        let mut rows: Vec<(String, Page)> = Vec::with_capacity(page.lineage.len() + 1);
        if page.lineage.len() > 1 {
            let ancestors = &page.lineage[..page.lineage.len() - 1];
            for ancestor in wiki.read_multiple_pages(ancestors).await? {
                rows.push((ancestor.id.clone(), ancestor));
            }
        }
        if let Some(parent_id) = page.parent_id() {
            match wiki.read_page(parent_id).await {
                Ok(parent) => rows.push((parent_id.to_string(), parent)),
                Err(AppError::NotFound(_)) => {
                    tracing::debug!(wiki_id, page_id, parent_id, "Parent page missing from trail")
                }
                Err(e) => return Err(e),
            }
        }
        rows.push((page_id.to_string(), page));

        Ok(rows
            .into_iter()
            .map(|(id, doc)| breadcrumb(wiki_id, id, &doc))
            .collect())
    }
}

fn breadcrumb(wiki_id: &str, page_id: String, doc: &Page) -> Breadcrumb {
    let parent = match doc.lineage.len() {
        n if n >= 2 => doc.lineage[n - 2].clone(),
        _ => String::new(),
    };
    Breadcrumb {
        name: doc.title.clone(),
        page_id,
        wiki_id: wiki_id.to_string(),
        parent,
    }
}
