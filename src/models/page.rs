//! Page model and its derived breadcrumb row.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Content, Record};
use crate::errors::AppError;

/// A wiki page record. The live record has `owning_page == id`; every other
/// record with the same `owning_page` is an immutable history snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rev: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: Content,
    /// Ancestor ids, root first, excluding this page.
    #[serde(default)]
    pub lineage: Vec<String>,
    #[serde(default)]
    pub owning_page: String,
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Page {
    /// Whether this record is the current revision of its logical page.
    pub fn is_live(&self) -> bool {
        !self.id.is_empty() && self.owning_page == self.id
    }

    /// Id of the direct parent, if any.
    pub fn parent_id(&self) -> Option<&str> {
        self.lineage.last().map(String::as_str)
    }

    /// Reject lineages that mention the page itself or repeat an ancestor.
    pub fn validate_lineage(&self, page_id: &str) -> Result<(), AppError> {
        let mut seen = HashSet::with_capacity(self.lineage.len());
        for ancestor in &self.lineage {
            if ancestor.is_empty() {
                return Err(AppError::BadRequest(
                    "lineage contains an empty page id".to_string(),
                ));
            }
            if !page_id.is_empty() && ancestor == page_id {
                return Err(AppError::BadRequest(format!(
                    "page {} cannot be its own ancestor",
                    page_id
                )));
            }
            if !seen.insert(ancestor.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "lineage repeats ancestor {}",
                    ancestor
                )));
            }
        }
        Ok(())
    }
}

impl Record for Page {
    const KIND: &'static str = "page";
    const SCHEMA_VERSION: i64 = 1;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn set_rev(&mut self, rev: String) {
        self.rev = rev;
    }
}

/// One navigable step in a page's ancestor trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub name: String,
    pub page_id: String,
    pub wiki_id: String,
    pub parent: String,
}
