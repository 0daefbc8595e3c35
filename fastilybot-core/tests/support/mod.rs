//! In-memory wiki and fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fastilybot_core::cache::Cache;
use fastilybot_core::tasks::TaskContext;
use fastilybot_core::wiki::{
    Edit, EditContent, Namespace, NamespaceManager, Result, Wiki, WikiError,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A wiki whose contents are set up by the test. Edits are applied and recorded.
#[derive(Default)]
pub struct MemoryWiki {
    domain: String,
    username: Option<String>,
    namespaces: NamespaceManager,
    pages: Mutex<HashMap<String, String>>,
    category_members: HashMap<String, Vec<String>>,
    transclusions: HashMap<String, Vec<String>>,
    links: HashMap<String, Vec<String>>,
    redirects: HashMap<String, String>,
    first_editors: HashMap<String, String>,
    revisions: HashMap<String, Vec<u64>>,
    revision_links: HashMap<u64, Vec<String>>,
    logs: HashSet<(String, String)>,
    duplicates: HashMap<String, Vec<String>>,
    backlinks: HashMap<String, Vec<String>>,
    templates: HashMap<String, Vec<String>>,
    categories: HashMap<String, Vec<String>>,
    normalized: HashMap<String, String>,
    edits: Mutex<Vec<(String, Edit)>>,
    list_queries: AtomicUsize,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl MemoryWiki {
    /// Anonymous wiki
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            ..Self::default()
        }
    }

    pub fn logged_in(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_page(self, title: &str, text: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(title.to_string(), text.to_string());
        self
    }

    pub fn with_category(mut self, category: &str, members: &[&str]) -> Self {
        self.category_members
            .insert(category.to_string(), owned(members));
        self
    }

    pub fn with_transclusions(mut self, template: &str, pages: &[&str]) -> Self {
        self.transclusions
            .insert(template.to_string(), owned(pages));
        self
    }

    pub fn with_links(mut self, title: &str, links: &[&str]) -> Self {
        self.links.insert(title.to_string(), owned(links));
        self
    }

    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_first_editor(mut self, title: &str, user: &str) -> Self {
        self.first_editors
            .insert(title.to_string(), user.to_string());
        self
    }

    pub fn with_revision(mut self, title: &str, revid: u64, links: &[&str]) -> Self {
        self.revisions
            .entry(title.to_string())
            .or_default()
            .push(revid);
        self.revision_links.insert(revid, owned(links));
        self
    }

    pub fn with_log_entry(mut self, title: &str, action: &str) -> Self {
        self.logs.insert((title.to_string(), action.to_string()));
        self
    }

    pub fn with_duplicates(mut self, title: &str, dupes: &[&str]) -> Self {
        self.duplicates.insert(title.to_string(), owned(dupes));
        self
    }

    pub fn with_backlinks(mut self, title: &str, links: &[&str]) -> Self {
        self.backlinks.insert(title.to_string(), owned(links));
        self
    }

    pub fn with_templates(mut self, title: &str, templates: &[&str]) -> Self {
        self.templates.insert(title.to_string(), owned(templates));
        self
    }

    pub fn with_categories(mut self, title: &str, categories: &[&str]) -> Self {
        self.categories
            .insert(title.to_string(), owned(categories));
        self
    }

    pub fn with_normalized(mut self, from: &str, to: &str) -> Self {
        self.normalized.insert(from.to_string(), to.to_string());
        self
    }

    /// Every edit made so far, in order
    pub fn edits(&self) -> Vec<(String, Edit)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn edited_titles(&self) -> Vec<String> {
        self.edits().into_iter().map(|(title, _)| title).collect()
    }

    /// Current text of `title`
    pub fn text(&self, title: &str) -> Option<String> {
        self.pages.lock().unwrap().get(title).cloned()
    }

    /// Number of category member and transclusion queries served
    pub fn list_queries(&self) -> usize {
        self.list_queries.load(Ordering::SeqCst)
    }

    fn filter_ns(&self, titles: Option<&Vec<String>>, ns: &[Namespace]) -> Vec<String> {
        titles
            .into_iter()
            .flatten()
            .filter(|t| ns.is_empty() || ns.contains(&self.namespaces.which_ns(t)))
            .cloned()
            .collect()
    }

    fn batch<T, F>(titles: &[String], f: F) -> HashMap<String, T>
    where
        F: Fn(&String) -> T,
    {
        titles.iter().map(|t| (t.clone(), f(t))).collect()
    }
}

#[async_trait]
impl Wiki for MemoryWiki {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn namespaces(&self) -> &NamespaceManager {
        &self.namespaces
    }

    async fn category_members(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>> {
        self.list_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.filter_ns(self.category_members.get(title), ns))
    }

    async fn what_transcludes_here(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>> {
        self.list_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.filter_ns(self.transclusions.get(title), ns))
    }

    async fn links_on_page(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>> {
        Ok(self.filter_ns(self.links.get(title), ns))
    }

    async fn redirects_to(&self, title: &str) -> Result<Vec<String>> {
        let mut out: Vec<String> = self
            .redirects
            .iter()
            .filter(|(_, to)| to.as_str() == title)
            .map(|(from, _)| from.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    async fn page_text(&self, title: &str) -> Result<String> {
        Ok(self.text(title).unwrap_or_default())
    }

    async fn first_editor_of(&self, title: &str) -> Result<Option<String>> {
        Ok(self.first_editors.get(title).cloned())
    }

    async fn revision_ids(
        &self,
        title: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<u64>> {
        Ok(self.revisions.get(title).cloned().unwrap_or_default())
    }

    async fn links_in_revision(&self, revid: u64) -> Result<Vec<String>> {
        Ok(self.revision_links.get(&revid).cloned().unwrap_or_default())
    }

    async fn has_log_entry(&self, title: &str, action: &str) -> Result<bool> {
        Ok(self
            .logs
            .contains(&(title.to_string(), action.to_string())))
    }

    async fn edit(&self, title: &str, edit: &Edit) -> Result<()> {
        if self.username.is_none() {
            return Err(WikiError::Anonymous(title.to_string()));
        }

        let mut pages = self.pages.lock().unwrap();
        let text = pages.entry(title.to_string()).or_default();
        match &edit.content {
            EditContent::Replace(new) => *text = new.clone(),
            EditContent::Append(extra) => text.push_str(extra),
            EditContent::Prepend(extra) => text.insert_str(0, extra),
        }
        self.edits
            .lock()
            .unwrap()
            .push((title.to_string(), edit.clone()));
        Ok(())
    }

    async fn page_texts(&self, titles: &[String]) -> Result<HashMap<String, String>> {
        Ok(Self::batch(titles, |t| self.text(t).unwrap_or_default()))
    }

    async fn exists(&self, titles: &[String]) -> Result<HashMap<String, bool>> {
        let pages = self.pages.lock().unwrap();
        Ok(Self::batch(titles, |t| pages.contains_key(t)))
    }

    async fn duplicate_files(
        &self,
        titles: &[String],
        _shared_only: bool,
    ) -> Result<HashMap<String, Vec<String>>> {
        Ok(Self::batch(titles, |t| {
            self.duplicates.get(t).cloned().unwrap_or_default()
        }))
    }

    async fn what_links_here(&self, titles: &[String]) -> Result<HashMap<String, Vec<String>>> {
        Ok(Self::batch(titles, |t| {
            self.backlinks.get(t).cloned().unwrap_or_default()
        }))
    }

    async fn templates_on_page(
        &self,
        titles: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        Ok(Self::batch(titles, |t| {
            self.templates.get(t).cloned().unwrap_or_default()
        }))
    }

    async fn categories_on_page(
        &self,
        titles: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        Ok(Self::batch(titles, |t| {
            self.categories.get(t).cloned().unwrap_or_default()
        }))
    }

    async fn resolve_redirects(&self, titles: &[String]) -> Result<HashMap<String, String>> {
        Ok(Self::batch(titles, |t| {
            self.redirects.get(t).cloned().unwrap_or_else(|| t.clone())
        }))
    }

    async fn normalize_titles(&self, titles: &[String]) -> Result<HashMap<String, String>> {
        Ok(Self::batch(titles, |t| {
            self.normalized.get(t).cloned().unwrap_or_else(|| t.clone())
        }))
    }
}

/// Write `report<num>.txt` into the cache so no download happens
pub fn seed_report(cache_root: &Path, num: u32, lines: &[&str]) {
    std::fs::create_dir_all(cache_root).unwrap();
    std::fs::write(
        cache_root.join(format!("report{}.txt", num)),
        lines.join("\n"),
    )
    .unwrap();
}

/// Cache rooted at `root` which cannot reach a report server
pub fn offline_cache(root: &Path) -> Cache {
    Cache::new(
        root,
        "http://127.0.0.1:9",
        Duration::from_secs(24 * 3600),
        Duration::from_secs(600),
        reqwest::Client::new(),
    )
}

/// Task context over the given wikis, with an offline cache at `root`
pub fn context(
    wiki: MemoryWiki,
    commons: MemoryWiki,
    root: &Path,
) -> (TaskContext, Arc<MemoryWiki>, Arc<MemoryWiki>) {
    let wiki = Arc::new(wiki);
    let commons = Arc::new(commons);
    let ctx = TaskContext::new(
        wiki.clone(),
        commons.clone(),
        Arc::new(offline_cache(root)),
    );
    (ctx, wiki, commons)
}

pub fn enwiki() -> MemoryWiki {
    MemoryWiki::new("en.wikipedia.org").logged_in("FastilyBot")
}

pub fn commons() -> MemoryWiki {
    MemoryWiki::new("commons.wikimedia.org")
}
