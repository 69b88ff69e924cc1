//! Data models for the wiki core.
//!
//! Each persisted entity implements [`Record`], which names its document kind
//! and schema version so the store can keep record shapes and in-core types
//! in lockstep.

mod comment;
mod index;
mod page;
mod principal;
mod wiki;

pub use comment::*;
pub use index::*;
pub use page::*;
pub use principal::*;
pub use wiki::*;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A document type with an explicit serialization contract.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Document kind stored beside the body.
    const KIND: &'static str;
    /// Version of the field set; bumped whenever the body shape changes.
    const SCHEMA_VERSION: i64;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn set_rev(&mut self, rev: String);
}

/// Markdown source plus its sanitized HTML rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub raw: String,
    /// Derived on every save; never taken from the caller.
    #[serde(default)]
    pub formatted: String,
}
