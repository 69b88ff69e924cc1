//! Comment model.

use serde::{Deserialize, Serialize};

use super::{Content, Record};

/// A comment attached to a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rev: String,
    #[serde(default)]
    pub page_id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub modified_time: String,
    #[serde(default)]
    pub content: Content,
}

impl Record for Comment {
    const KIND: &'static str = "comment";
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
