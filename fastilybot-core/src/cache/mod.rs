//! On-disk cache for toolforge reports and list queries.
//!
//! Layout under the cache root:
//!
//! ```text
//! report<N>.txt                              downloaded reports
//! <domain>/<namespace id>/<title>[_<ns>].txt cached category members and transclusions
//! ```

use crate::models::Configuration;
use crate::wiki::{Namespace, Wiki, WikiError};
use fs2::FileExt;
use reqwest::Client;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to download {url}: {source}")]
    Download { url: String, source: reqwest::Error },
    #[error("Failed to download {url}: server returned {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error(transparent)]
    Wiki(#[from] WikiError),
}

pub type Result<T> = std::result::Result<T, CacheError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Delete every file created by fastilybot. A missing cache root is not an error.
pub fn purge(root: &Path) -> Result<()> {
    match std::fs::remove_dir_all(root) {
        Ok(()) => {
            tracing::info!(root = %root.display(), "Purged cache");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "Cache root does not exist, nothing to purge");
            Ok(())
        }
        Err(source) => Err(CacheError::Io {
            path: root.to_path_buf(),
            source,
        }),
    }
}

/// List queries that can be served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    CategoryMembers,
    WhatTranscludesHere,
}

/// Disk cache rooted at one directory
pub struct Cache {
    root: PathBuf,
    reports_url: String,
    report_ttl: Duration,
    query_ttl: Duration,
    client: Client,
}

impl Cache {
    pub fn new(
        root: impl Into<PathBuf>,
        reports_url: impl Into<String>,
        report_ttl: Duration,
        query_ttl: Duration,
        client: Client,
    ) -> Self {
        Self {
            root: root.into(),
            reports_url: reports_url.into().trim_end_matches('/').to_string(),
            report_ttl,
            query_ttl,
            client,
        }
    }

    /// Cache rooted at `cache_dir`, downloading reports with its own HTTP client
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(CacheError::Client)?;

        Ok(Self::new(
            config.cache_dir.clone(),
            config.reports_url.clone(),
            Duration::from_secs(config.report_ttl_hours.saturating_mul(3600)),
            Duration::from_secs(config.query_ttl_minutes.saturating_mul(60)),
            client,
        ))
    }

    /// Path of the cached copy of report `num`
    pub fn report_path(&self, num: u32) -> PathBuf {
        self.root.join(format!("report{}.txt", num))
    }

    /// Fetch a numbered toolforge report, downloading it when the cached copy is missing or
    /// stale. Underscores become spaces and `prefix` is prepended to every line.
    pub async fn fetch_report(&self, num: u32, prefix: &str) -> Result<HashSet<String>> {
        let path = self.report_path(num);

        if !is_fresh(&path, self.report_ttl) {
            let url = format!("{}/r/report{}.txt", self.reports_url, num);
            tracing::debug!(
                report = num,
                "Cached copy of report is missing or out of date, downloading a new copy"
            );
            let body = self.download(&url).await?;
            write_locked(&path, body.as_bytes())?;
        }

        let text = read_locked(&path)?;
        Ok(parse_report(&text, prefix))
    }

    async fn download(&self, url: &str) -> Result<String> {
        let download_err = |source| CacheError::Download {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(download_err)?;
        if !response.status().is_success() {
            return Err(CacheError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().await.map_err(download_err)
    }

    /// Path of the cache file for a list query on `wiki`
    pub fn query_path(&self, wiki: &dyn Wiki, title: &str, ns: &[Namespace]) -> PathBuf {
        let namespaces = wiki.namespaces();
        let mut name = sanitize(namespaces.strip_ns(title));
        if !ns.is_empty() {
            let mut ids: Vec<i32> = ns.iter().map(|n| n.id()).collect();
            ids.sort_unstable();
            let ids: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
            name.push('_');
            name.push_str(&ids.join("_"));
        }

        self.root
            .join(sanitize(wiki.domain()))
            .join(namespaces.which_ns(title).id().to_string())
            .join(format!("{}.txt", name))
    }

    /// Run a list query, serving it from disk while the cached result is fresh
    pub async fn cached_query(
        &self,
        wiki: &dyn Wiki,
        kind: QueryKind,
        title: &str,
        ns: &[Namespace],
    ) -> Result<Vec<String>> {
        let path = self.query_path(wiki, title, ns);

        if is_fresh(&path, self.query_ttl) {
            let text = read_locked(&path)?;
            let text = text.trim();
            return Ok(if text.is_empty() {
                Vec::new()
            } else {
                text.lines().map(String::from).collect()
            });
        }

        tracing::debug!(title = title, "Cache miss, downloading new copy");
        let result = match kind {
            QueryKind::CategoryMembers => wiki.category_members(title, ns).await?,
            QueryKind::WhatTranscludesHere => wiki.what_transcludes_here(title, ns).await?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        write_locked(&path, result.join("\n").as_bytes())?;
        Ok(result)
    }

    pub async fn category_members(
        &self,
        wiki: &dyn Wiki,
        title: &str,
        ns: &[Namespace],
    ) -> Result<Vec<String>> {
        self.cached_query(wiki, QueryKind::CategoryMembers, title, ns)
            .await
    }

    pub async fn what_transcludes_here(
        &self,
        wiki: &dyn Wiki,
        title: &str,
        ns: &[Namespace],
    ) -> Result<Vec<String>> {
        self.cached_query(wiki, QueryKind::WhatTranscludesHere, title, ns)
            .await
    }
}

/// Parse the body of a report into prefixed titles
pub fn parse_report(text: &str, prefix: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("{}{}", prefix, line.replace('_', " ")))
        .collect()
}

fn is_fresh(path: &Path, ttl: Duration) -> bool {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(_) => return false,
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age <= ttl)
        .unwrap_or(true)
}

/// Replace path separators so a title can be used as a file name
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '%',
            c => c,
        })
        .collect()
}

/// Lock file guarding the cache file at `path`. It is never removed so every process
/// locks the same inode.
fn lock_file(path: &Path) -> Result<File> {
    let lock_path = path.with_extension("lock");
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&lock_path)
        .map_err(io_err(&lock_path))
}

/// Replace the cache file at `path`. The contents are written to a sibling temp file and
/// renamed into place while holding the exclusive lock, so readers see either the old or
/// the new file in full.
fn write_locked(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let lock = lock_file(path)?;
    lock.lock_exclusive().map_err(io_err(path))?;

    let tmp_path = path.with_extension("tmp");
    let mut file = File::create(&tmp_path).map_err(io_err(&tmp_path))?;
    file.write_all(contents).map_err(io_err(&tmp_path))?;
    file.sync_all().map_err(io_err(&tmp_path))?;
    drop(file);
    std::fs::rename(&tmp_path, path).map_err(io_err(path))?;

    lock.unlock().map_err(io_err(path))
}

/// Read the cache file at `path` under a shared lock
fn read_locked(path: &Path) -> Result<String> {
    let lock = lock_file(path)?;
    lock.lock_shared().map_err(io_err(path))?;
    let text = std::fs::read_to_string(path).map_err(io_err(path))?;
    lock.unlock().map_err(io_err(path))?;
    Ok(text)
}
