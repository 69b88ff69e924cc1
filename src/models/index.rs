//! Listing and paging shapes returned by the index and history views.

use serde::{Deserialize, Serialize};

use super::{Comment, Page};
use crate::errors::AppError;

/// Summary row for a live page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageIndexEntry {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub owning_page: String,
    pub editor: String,
    pub timestamp: String,
}

impl From<&Page> for PageIndexEntry {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id.clone(),
            title: page.title.clone(),
            slug: page.slug.clone(),
            owning_page: page.owning_page.clone(),
            editor: page.editor.clone(),
            timestamp: page.timestamp.clone(),
        }
    }
}

pub type PageIndex = Vec<PageIndexEntry>;

/// One past (or current) revision of a logical page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub document_id: String,
    pub rev: String,
    pub title: String,
    pub editor: String,
    pub timestamp: String,
    pub content_size: usize,
}

impl From<&Page> for HistoryEntry {
    fn from(page: &Page) -> Self {
        Self {
            document_id: page.id.clone(),
            rev: page.rev.clone(),
            title: page.title.clone(),
            editor: page.editor.clone(),
            timestamp: page.timestamp.clone(),
            content_size: page.content.raw.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub total_rows: i64,
    pub offset: i64,
    pub rows: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentIndexPage {
    pub total_rows: i64,
    pub offset: i64,
    pub rows: Vec<Comment>,
}

/// Zero-based page number and page size for paged listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page_num: i64,
    pub num_per_page: i64,
}

impl Paging {
    pub fn new(page_num: i64, num_per_page: i64) -> Result<Self, AppError> {
        if page_num < 0 {
            return Err(AppError::BadRequest(format!(
                "pageNum must be >= 0, got {}",
                page_num
            )));
        }
        if num_per_page <= 0 {
            return Err(AppError::BadRequest(format!(
                "numPerPage must be > 0, got {}",
                num_per_page
            )));
        }
        Ok(Self {
            page_num,
            num_per_page,
        })
    }

    pub fn offset(&self) -> i64 {
        self.page_num.saturating_mul(self.num_per_page)
    }
}
