//! Wiki client seam.
//!
//! Tasks talk to the wiki exclusively through the [`Wiki`] trait. [`ApiWiki`] implements it
//! over the MediaWiki action API; tests provide their own in-memory implementation.

pub mod api;
pub mod error;
pub mod namespace;

pub use api::ApiWiki;
pub use error::WikiError;
pub use namespace::{Namespace, NamespaceManager};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub type Result<T> = std::result::Result<T, WikiError>;

/// How an edit changes the page text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditContent {
    Replace(String),
    Append(String),
    Prepend(String),
}

/// A single edit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub content: EditContent,
    pub summary: String,
}

impl Edit {
    pub fn replace(text: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            content: EditContent::Replace(text.into()),
            summary: summary.into(),
        }
    }

    pub fn append(text: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            content: EditContent::Append(text.into()),
            summary: summary.into(),
        }
    }

    pub fn prepend(text: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            content: EditContent::Prepend(text.into()),
            summary: summary.into(),
        }
    }
}

/// Operations the tasks need from a wiki.
///
/// List queries take a namespace filter; an empty filter means all namespaces. Batch queries
/// return maps keyed by the titles passed in.
#[async_trait]
pub trait Wiki: Send + Sync {
    /// Domain of this wiki, e.g. `en.wikipedia.org`
    fn domain(&self) -> &str;

    /// Logged in username, `None` for anonymous clients
    fn username(&self) -> Option<&str>;

    fn namespaces(&self) -> &NamespaceManager;

    async fn category_members(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>>;

    async fn what_transcludes_here(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>>;

    async fn links_on_page(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>>;

    /// Pages which redirect to `title`
    async fn redirects_to(&self, title: &str) -> Result<Vec<String>>;

    /// Wikitext of the latest revision, empty if the page does not exist
    async fn page_text(&self, title: &str) -> Result<String>;

    /// Author of the first revision of `title`
    async fn first_editor_of(&self, title: &str) -> Result<Option<String>>;

    /// IDs of revisions of `title` made between `start` and `end`, oldest first
    async fn revision_ids(
        &self,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<u64>>;

    /// Titles linked from the given revision
    async fn links_in_revision(&self, revid: u64) -> Result<Vec<String>>;

    /// Whether `title` has at least one log entry of type `action`, e.g. `delete/delete`
    async fn has_log_entry(&self, title: &str, action: &str) -> Result<bool>;

    async fn edit(&self, title: &str, edit: &Edit) -> Result<()>;

    async fn page_texts(&self, titles: &[String]) -> Result<HashMap<String, String>>;

    async fn exists(&self, titles: &[String]) -> Result<HashMap<String, bool>>;

    /// Duplicates of each file. With `shared_only`, only duplicates on the shared repository
    /// (Commons) are returned.
    async fn duplicate_files(
        &self,
        titles: &[String],
        shared_only: bool,
    ) -> Result<HashMap<String, Vec<String>>>;

    async fn what_links_here(&self, titles: &[String]) -> Result<HashMap<String, Vec<String>>>;

    async fn templates_on_page(&self, titles: &[String])
        -> Result<HashMap<String, Vec<String>>>;

    async fn categories_on_page(
        &self,
        titles: &[String],
    ) -> Result<HashMap<String, Vec<String>>>;

    /// Redirect target of each title, or the title itself when it is not a redirect
    async fn resolve_redirects(&self, titles: &[String]) -> Result<HashMap<String, String>>;

    /// Canonical form of each title
    async fn normalize_titles(&self, titles: &[String]) -> Result<HashMap<String, String>>;
}
