//! Shared state and helpers for bot and report tasks

use crate::cache::Cache;
use crate::wiki::{Edit, Namespace, NamespaceManager, Wiki};
use anyhow::{Context, Result};
use regex::{NoExpand, Regex};
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

/// A set of titles, described by where to find it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A numbered toolforge report. Lines are prefixed with the namespace's prefix.
    Report { id: u32, ns: Namespace },
    /// A category (members), a template (transclusions), or a user/project page whose links
    /// are resolved recursively. `ns` filters the result; empty means all namespaces.
    Page { title: String, ns: Vec<Namespace> },
    /// Literal titles
    Titles(HashSet<String>),
}

impl Source {
    /// Report in the File namespace
    pub fn report(id: u32) -> Self {
        Source::Report {
            id,
            ns: Namespace::FILE,
        }
    }

    pub fn report_in(id: u32, ns: Namespace) -> Self {
        Source::Report { id, ns }
    }

    /// Page source filtered to the File namespace
    pub fn page(title: impl Into<String>) -> Self {
        Source::Page {
            title: title.into(),
            ns: vec![Namespace::FILE],
        }
    }

    pub fn page_in(title: impl Into<String>, ns: Namespace) -> Self {
        Source::Page {
            title: title.into(),
            ns: vec![ns],
        }
    }

}

impl From<HashSet<String>> for Source {
    fn from(titles: HashSet<String>) -> Self {
        Source::Titles(titles)
    }
}

impl From<Vec<String>> for Source {
    fn from(titles: Vec<String>) -> Self {
        Source::Titles(titles.into_iter().collect())
    }
}

/// The wiki being maintained, an anonymous Commons client, the disk cache and the prefix under
/// which this task family keeps its configuration pages.
#[derive(Clone)]
pub struct TaskContext {
    wiki: Arc<dyn Wiki>,
    commons: Arc<dyn Wiki>,
    cache: Arc<Cache>,
    config_prefix: String,
}

impl TaskContext {
    pub fn new(wiki: Arc<dyn Wiki>, commons: Arc<dyn Wiki>, cache: Arc<Cache>) -> Self {
        Self {
            wiki,
            commons,
            cache,
            config_prefix: String::new(),
        }
    }

    pub fn with_config_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config_prefix = prefix.into();
        self
    }

    pub fn wiki(&self) -> &dyn Wiki {
        self.wiki.as_ref()
    }

    pub fn commons(&self) -> &dyn Wiki {
        self.commons.as_ref()
    }

    pub fn ns(&self) -> &NamespaceManager {
        self.wiki.namespaces()
    }

    /// Title of a configuration page, e.g. `User:FastilyBot/Task/6/Rules`
    pub fn config_of(&self, sub_title: impl Display, suffix: &str) -> String {
        format!("{}{}/{}", self.config_prefix, sub_title, suffix)
    }

    /// Title of an ignore list configuration page
    pub fn ignore_of(&self, sub_title: impl Display) -> String {
        self.config_of(sub_title, "Ignore")
    }

    pub async fn fetch_report(&self, id: u32, ns: Namespace) -> Result<HashSet<String>> {
        let prefix = self.ns().prefix(ns);
        self.cache
            .fetch_report(id, &prefix)
            .await
            .with_context(|| format!("Failed to fetch report {}", id))
    }

    /// Cached transclusions of `title` on the maintained wiki
    pub async fn transclusions(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>> {
        Ok(self
            .cache
            .what_transcludes_here(self.wiki(), title, ns)
            .await?)
    }

    /// Cached transclusions of `title` on Commons
    pub async fn commons_transclusions(
        &self,
        title: &str,
        ns: &[Namespace],
    ) -> Result<Vec<String>> {
        Ok(self
            .cache
            .what_transcludes_here(self.commons(), title, ns)
            .await?)
    }

    /// Cached members of `title` on the maintained wiki
    pub async fn category_members(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>> {
        Ok(self
            .cache
            .category_members(self.wiki(), title, ns)
            .await?)
    }

    /// Members of `title` and of all its subcategories, excluding the subcategories themselves
    pub async fn category_members_recursive(&self, title: &str) -> Result<HashSet<String>> {
        let mut out = HashSet::new();
        let mut visited = HashSet::new();
        let mut pending = vec![title.to_string()];

        while let Some(category) = pending.pop() {
            if !visited.insert(category.clone()) {
                continue;
            }

            for member in self.wiki.category_members(&category, &[]).await? {
                if self.ns().which_ns(&member) == Namespace::CATEGORY {
                    pending.push(member);
                } else {
                    out.insert(member);
                }
            }
        }

        Ok(out)
    }

    /// Resolve a [`Source`] into its titles
    pub async fn resolve(&self, source: &Source) -> Result<HashSet<String>> {
        match source {
            Source::Titles(titles) => Ok(titles.clone()),
            Source::Report { id, ns } => self.fetch_report(*id, *ns).await,
            Source::Page { title, ns } => self.resolve_page(title, ns).await,
        }
    }

    async fn resolve_page(&self, title: &str, ns: &[Namespace]) -> Result<HashSet<String>> {
        let mut out = HashSet::new();
        let mut visited = HashSet::new();
        let mut pending = vec![title.to_string()];

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            match self.ns().which_ns(&current) {
                Namespace::CATEGORY => out.extend(self.category_members(&current, ns).await?),
                Namespace::TEMPLATE => out.extend(self.transclusions(&current, ns).await?),
                Namespace::USER | Namespace::PROJECT => {
                    pending.extend(self.wiki.links_on_page(&current, &[]).await?)
                }
                _ => tracing::warn!(title = %current, "Not a category, template, user or project page; ignoring"),
            }
        }

        Ok(out)
    }

    /// Titles of the first source minus the titles of every other source
    pub async fn difference_of(&self, sources: &[Source]) -> Result<HashSet<String>> {
        let Some((first, rest)) = sources.split_first() else {
            return Ok(HashSet::new());
        };

        let mut target = self.resolve(first).await?;
        for source in rest {
            if target.is_empty() {
                break;
            }
            let other = self.resolve(source).await?;
            target.retain(|t| !other.contains(t));
        }
        Ok(target)
    }

    /// Subset of `titles` that exist (`existent`) or do not exist (`!existent`) on `wiki`
    pub async fn exists_filter(
        wiki: &dyn Wiki,
        titles: &[String],
        existent: bool,
    ) -> Result<HashSet<String>> {
        Ok(wiki
            .exists(titles)
            .await?
            .into_iter()
            .filter(|(_, exists)| *exists == existent)
            .map(|(title, _)| title)
            .collect())
    }

    /// Regex matching a transclusion of `title` or of any redirect to it
    pub async fn template_regex(&self, title: &str) -> Result<Regex> {
        let ns = self.ns();
        let mut names = vec![ns.strip_ns(title).to_string()];
        names.extend(
            self.wiki
                .redirects_to(title)
                .await?
                .iter()
                .map(|r| ns.strip_ns(r).to_string()),
        );
        template_regex(&names).with_context(|| format!("Failed to build regex for {}", title))
    }

    /// Replace every match of `regex` on `title`. Returns `false` when nothing matched.
    pub async fn replace_text(
        &self,
        title: &str,
        regex: &Regex,
        replacement: &str,
        summary: &str,
    ) -> Result<bool> {
        let text = self.wiki.page_text(title).await?;
        let replaced = regex.replace_all(&text, NoExpand(replacement));
        if replaced == text {
            tracing::debug!(title = title, "Pattern not found, skipping");
            return Ok(false);
        }

        self.wiki
            .edit(title, &Edit::replace(replaced.into_owned(), summary))
            .await?;
        Ok(true)
    }
}

/// Regex matching `{{name|...}}` for any of `names`, with an optional leading newline.
/// Names match case-insensitively and spaces match underscores. Parameters may contain
/// templates nested one level deep, e.g. `{{Orphan image|note={{small|x}}}}`.
pub fn template_regex(names: &[String]) -> std::result::Result<Regex, regex::Error> {
    let alternatives = names
        .iter()
        .map(|name| {
            name.split([' ', '_'])
                .filter(|part| !part.is_empty())
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("[ _]+")
        })
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!(
        r"(?si)\n?\{{\{{\s*(?:template\s*:\s*)?(?:{})\s*(?:\|(?:\{{\{{[^{{}}]*\}}\}}|.)*?)?\}}\}}",
        alternatives
    ))
}

/// Positional parameter `index` (1-based) of a single template transclusion, e.g. the file name
/// in `{{Now Commons|File:X.jpg|date=1 May 2020}}`. An explicit `index=` parameter counts as
/// the same parameter, and the last occurrence wins.
pub fn template_param(template: &str, index: usize) -> Option<String> {
    if index == 0 {
        return None;
    }
    let inner = template
        .trim()
        .strip_prefix("{{")?
        .strip_suffix("}}")?;

    let key = index.to_string();
    let mut position = 0;
    let mut found = None;
    for part in inner.split('|').skip(1) {
        let value = match part.split_once('=') {
            Some((name, value)) if name.trim() == key => value,
            Some(_) => continue,
            None => {
                position += 1;
                if position != index {
                    continue;
                }
                part
            }
        };
        found = Some(value.trim().to_string());
    }
    found.filter(|value| !value.is_empty())
}

/// Format titles as a wikitext bullet list, after `header`. With `escape`, links get a leading
/// colon so files and categories are linked instead of embedded.
pub fn listify<S: AsRef<str>>(titles: &[S], escape: bool, header: &str) -> String {
    let colon = if escape { ":" } else { "" };
    let lines: Vec<String> = titles
        .iter()
        .map(|t| format!("*[[{}{}]]", colon, t.as_ref()))
        .collect();
    format!("{}{}", header, lines.join("\n"))
}

/// Titles in a stable order
pub fn sorted<I: IntoIterator<Item = String>>(titles: I) -> Vec<String> {
    let mut out: Vec<String> = titles.into_iter().collect();
    out.sort();
    out
}
