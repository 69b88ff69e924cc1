//! Wiki record model, stored in the main namespace keyed by wiki id.

use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rev: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Landing page id; empty when the wiki has none.
    #[serde(default)]
    pub home_page_id: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub modified_time: String,
}

impl Record for WikiRecord {
    const KIND: &'static str = "wiki";
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

/// Request body for creating a wiki record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWikiRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Request body for pointing a wiki at a new home page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetHomePageRequest {
    pub home_page_id: String,
}
