//! MediaWiki action API client

use super::error::WikiError;
use super::namespace::{join_ids, Namespace, NamespaceManager};
use super::{Edit, EditContent, Result, Wiki};
use crate::models::Configuration;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Maximum number of titles per batched query
pub const BATCH_SIZE: usize = 50;

type Params = Vec<(String, String)>;

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn push_ns(params: &mut Params, key: &str, ns: &[Namespace]) {
    if !ns.is_empty() {
        params.push((key.to_string(), join_ids(ns)));
    }
}

/// Options for building an [`ApiWiki`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: format!("fastilybot/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&Configuration> for ClientOptions {
    fn from(config: &Configuration) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// [`Wiki`] implementation backed by `api.php`
pub struct ApiWiki {
    endpoint: String,
    domain: String,
    client: Client,
    namespaces: NamespaceManager,
    username: Option<String>,
    csrf_token: Option<String>,
}

impl ApiWiki {
    /// Create an anonymous client. No request is made until the first query.
    pub fn new(endpoint: &str, options: &ClientOptions) -> Result<Self> {
        let url =
            url::Url::parse(endpoint).map_err(|_| WikiError::Endpoint(endpoint.to_string()))?;
        let domain = url
            .host_str()
            .ok_or_else(|| WikiError::Endpoint(endpoint.to_string()))?
            .to_string();

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(options.user_agent.clone())
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            domain,
            client,
            namespaces: NamespaceManager::default(),
            username: None,
            csrf_token: None,
        })
    }

    /// Create a client, load the wiki's namespaces and log in when credentials are given
    pub async fn connect(
        endpoint: &str,
        options: &ClientOptions,
        credentials: Option<(&str, &str)>,
    ) -> Result<Self> {
        let mut wiki = Self::new(endpoint, options)?;
        if let Err(e) = wiki.load_namespaces().await {
            tracing::warn!(domain = %wiki.domain, error = %e, "Using default namespaces");
        }
        if let Some((username, password)) = credentials {
            wiki.login(username, password).await?;
        }
        Ok(wiki)
    }

    /// Replace the default namespace table with the wiki's own
    pub async fn load_namespaces(&mut self) -> Result<()> {
        let response = self
            .get(params(&[
                ("action", "query"),
                ("meta", "siteinfo"),
                ("siprop", "namespaces|namespacealiases"),
            ]))
            .await?;

        let query = &response["query"];
        let entries = query["namespaces"]
            .as_object()
            .ok_or_else(|| WikiError::Malformed("siteinfo without namespaces".to_string()))?;

        let mut manager = NamespaceManager::from_names(entries.values().filter_map(|ns| {
            let id = ns["id"].as_i64()?;
            let name = ns["name"].as_str()?;
            Some((Namespace(id as i32), name.to_string()))
        }));

        for ns in entries.values() {
            if let (Some(id), Some(canonical)) = (ns["id"].as_i64(), ns["canonical"].as_str()) {
                manager.add_alias(Namespace(id as i32), canonical);
            }
        }
        for alias in query["namespacealiases"].as_array().into_iter().flatten() {
            if let (Some(id), Some(name)) = (alias["id"].as_i64(), alias["alias"].as_str()) {
                manager.add_alias(Namespace(id as i32), name);
            }
        }

        tracing::debug!(domain = %self.domain, count = entries.len(), "Loaded namespaces");
        self.namespaces = manager;
        Ok(())
    }

    /// Log in and fetch an edit token
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        tracing::info!(domain = %self.domain, username = username, "Logging in");

        let token_response = self
            .get(params(&[
                ("action", "query"),
                ("meta", "tokens"),
                ("type", "login"),
            ]))
            .await?;
        let login_token = token_response["query"]["tokens"]["logintoken"]
            .as_str()
            .ok_or_else(|| WikiError::Malformed("missing login token".to_string()))?
            .to_string();

        let response = self
            .post(params(&[
                ("action", "login"),
                ("lgname", username),
                ("lgpassword", password),
                ("lgtoken", login_token.as_str()),
            ]))
            .await?;

        let login = &response["login"];
        if login["result"].as_str() != Some("Success") {
            let reason = match &login["reason"] {
                Value::String(s) => s.clone(),
                Value::Null => login["result"].as_str().unwrap_or("unknown").to_string(),
                other => other.to_string(),
            };
            return Err(WikiError::Login {
                username: username.to_string(),
                reason,
            });
        }

        let csrf_response = self
            .get(params(&[("action", "query"), ("meta", "tokens")]))
            .await?;
        let csrf = csrf_response["query"]["tokens"]["csrftoken"]
            .as_str()
            .ok_or_else(|| WikiError::Malformed("missing csrf token".to_string()))?;

        self.username = Some(
            login["lgusername"]
                .as_str()
                .unwrap_or(username)
                .to_string(),
        );
        self.csrf_token = Some(csrf.to_string());
        Ok(())
    }

    fn with_format(mut params: Params) -> Params {
        params.push(("format".to_string(), "json".to_string()));
        params.push(("formatversion".to_string(), "2".to_string()));
        params
    }

    async fn get(&self, params: Params) -> Result<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&Self::with_format(params))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn post(&self, params: Params) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&Self::with_format(params))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WikiError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let value: Value = response.json().await?;
        if let Some(error) = value.get("error") {
            return Err(WikiError::Api {
                code: error["code"].as_str().unwrap_or("unknown").to_string(),
                info: error["info"].as_str().unwrap_or_default().to_string(),
            });
        }
        Ok(value)
    }

    /// Run a query, following `continue` until exhausted. Returns the `query` object of every
    /// response.
    async fn query_all(&self, base: Params) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        let mut cont: Option<Map<String, Value>> = None;

        loop {
            let mut request = base.clone();
            if let Some(cont) = &cont {
                for (key, value) in cont {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    request.retain(|(k, _)| k != key);
                    request.push((key.clone(), value));
                }
            }

            let response = self.get(request).await?;
            if let Some(query) = response.get("query") {
                out.push(query.clone());
            }

            match response.get("continue").and_then(Value::as_object) {
                Some(next) => cont = Some(next.clone()),
                None => break,
            }
        }

        Ok(out)
    }

    /// Titles from `query[list][].title` across all continuations
    async fn list_titles(&self, base: Params, list: &str) -> Result<Vec<String>> {
        let mut titles = Vec::new();
        for query in self.query_all(base).await? {
            titles.extend(
                query[list]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|item| item["title"].as_str())
                    .map(String::from),
            );
        }
        Ok(titles)
    }

    /// Page objects for each input title, batched and merged across continuations
    async fn pages_batch(
        &self,
        titles: &[String],
        base: Params,
    ) -> Result<HashMap<String, Vec<Value>>> {
        let mut out = HashMap::new();

        for chunk in titles.chunks(BATCH_SIZE) {
            let mut request = base.clone();
            request.push(("titles".to_string(), chunk.join("|")));

            let mut aliases = TitleAliases::default();
            let mut by_title: HashMap<String, Vec<Value>> = HashMap::new();
            for query in self.query_all(request).await? {
                aliases.absorb(&query);
                for page in query["pages"].as_array().into_iter().flatten() {
                    if let Some(title) = page["title"].as_str() {
                        by_title
                            .entry(title.to_string())
                            .or_default()
                            .push(page.clone());
                    }
                }
            }

            for title in chunk {
                let pages = by_title
                    .get(&aliases.resolve(title))
                    .cloned()
                    .unwrap_or_default();
                out.insert(title.clone(), pages);
            }
        }

        Ok(out)
    }

    /// `page[key][].title` for each input title
    async fn prop_titles(
        &self,
        titles: &[String],
        base: Params,
        key: &str,
    ) -> Result<HashMap<String, Vec<String>>> {
        Ok(self
            .pages_batch(titles, base)
            .await?
            .into_iter()
            .map(|(title, pages)| {
                let values = pages
                    .iter()
                    .flat_map(|page| page[key].as_array().cloned().unwrap_or_default())
                    .filter_map(|item| item["title"].as_str().map(String::from))
                    .collect();
                (title, values)
            })
            .collect())
    }

    /// Maps from the `normalized` and `redirects` lists of every chunk
    async fn title_aliases(&self, titles: &[String], base: Params) -> Result<Vec<TitleAliases>> {
        let mut out = Vec::new();
        for chunk in titles.chunks(BATCH_SIZE) {
            let mut request = base.clone();
            request.push(("titles".to_string(), chunk.join("|")));
            let mut aliases = TitleAliases::default();
            for query in self.query_all(request).await? {
                aliases.absorb(&query);
            }
            out.push(aliases);
        }
        Ok(out)
    }

    fn single_page(query: &Value) -> Option<&Value> {
        query["pages"].as_array().and_then(|pages| pages.first())
    }
}

/// `from → to` maps reported by the API for a batch of titles
#[derive(Debug, Default)]
struct TitleAliases {
    normalized: HashMap<String, String>,
    redirects: HashMap<String, String>,
}

impl TitleAliases {
    fn absorb(&mut self, query: &Value) {
        for (key, map) in [
            ("normalized", &mut self.normalized),
            ("redirects", &mut self.redirects),
        ] {
            for entry in query[key].as_array().into_iter().flatten() {
                if let (Some(from), Some(to)) = (entry["from"].as_str(), entry["to"].as_str()) {
                    map.insert(from.to_string(), to.to_string());
                }
            }
        }
    }

    fn normalize(&self, title: &str) -> String {
        self.normalized
            .get(title)
            .cloned()
            .unwrap_or_else(|| title.to_string())
    }

    fn resolve(&self, title: &str) -> String {
        let normalized = self.normalize(title);
        self.redirects
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }
}

#[async_trait]
impl Wiki for ApiWiki {
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
        let mut request = params(&[
            ("action", "query"),
            ("list", "categorymembers"),
            ("cmtitle", title),
            ("cmprop", "title"),
            ("cmlimit", "max"),
        ]);
        push_ns(&mut request, "cmnamespace", ns);
        self.list_titles(request, "categorymembers").await
    }

    async fn what_transcludes_here(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>> {
        let mut request = params(&[
            ("action", "query"),
            ("list", "embeddedin"),
            ("eititle", title),
            ("eilimit", "max"),
        ]);
        push_ns(&mut request, "einamespace", ns);
        self.list_titles(request, "embeddedin").await
    }

    async fn links_on_page(&self, title: &str, ns: &[Namespace]) -> Result<Vec<String>> {
        let mut request = params(&[
            ("action", "query"),
            ("prop", "links"),
            ("titles", title),
            ("pllimit", "max"),
        ]);
        push_ns(&mut request, "plnamespace", ns);

        let mut links = Vec::new();
        for query in self.query_all(request).await? {
            if let Some(page) = Self::single_page(&query) {
                links.extend(
                    page["links"]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(|l| l["title"].as_str())
                        .map(String::from),
                );
            }
        }
        Ok(links)
    }

    async fn redirects_to(&self, title: &str) -> Result<Vec<String>> {
        self.list_titles(
            params(&[
                ("action", "query"),
                ("list", "backlinks"),
                ("bltitle", title),
                ("blfilterredir", "redirects"),
                ("bllimit", "max"),
            ]),
            "backlinks",
        )
        .await
    }

    async fn page_text(&self, title: &str) -> Result<String> {
        let texts = self.page_texts(&[title.to_string()]).await?;
        Ok(texts.get(title).cloned().unwrap_or_default())
    }

    async fn first_editor_of(&self, title: &str) -> Result<Option<String>> {
        let response = self
            .get(params(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("titles", title),
                ("rvprop", "user"),
                ("rvlimit", "1"),
                ("rvdir", "newer"),
            ]))
            .await?;

        Ok(Self::single_page(&response["query"])
            .and_then(|page| page["revisions"][0]["user"].as_str())
            .map(String::from))
    }

    async fn revision_ids(
        &self,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<u64>> {
        let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let request = params(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("titles", title),
            ("rvprop", "ids"),
            ("rvlimit", "max"),
            ("rvdir", "newer"),
            ("rvstart", start.as_str()),
            ("rvend", end.as_str()),
        ]);

        let mut ids = Vec::new();
        for query in self.query_all(request).await? {
            if let Some(page) = Self::single_page(&query) {
                ids.extend(
                    page["revisions"]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(|r| r["revid"].as_u64()),
                );
            }
        }
        Ok(ids)
    }

    async fn links_in_revision(&self, revid: u64) -> Result<Vec<String>> {
        let revid = revid.to_string();
        let response = self
            .get(params(&[
                ("action", "parse"),
                ("oldid", revid.as_str()),
                ("prop", "links"),
            ]))
            .await?;

        Ok(response["parse"]["links"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|l| l["title"].as_str())
            .map(String::from)
            .collect())
    }

    async fn has_log_entry(&self, title: &str, action: &str) -> Result<bool> {
        // single request: continuing would walk the whole log
        let response = self
            .get(params(&[
                ("action", "query"),
                ("list", "logevents"),
                ("letitle", title),
                ("leaction", action),
                ("lelimit", "1"),
            ]))
            .await?;

        Ok(response["query"]["logevents"]
            .as_array()
            .is_some_and(|events| !events.is_empty()))
    }

    async fn edit(&self, title: &str, edit: &Edit) -> Result<()> {
        let token = self
            .csrf_token
            .as_deref()
            .ok_or_else(|| WikiError::Anonymous(title.to_string()))?;

        let (key, text) = match &edit.content {
            EditContent::Replace(text) => ("text", text),
            EditContent::Append(text) => ("appendtext", text),
            EditContent::Prepend(text) => ("prependtext", text),
        };

        tracing::info!(title = title, summary = %edit.summary, "Editing");
        let response = self
            .post(params(&[
                ("action", "edit"),
                ("title", title),
                (key, text.as_str()),
                ("summary", edit.summary.as_str()),
                ("bot", "1"),
                ("assert", "user"),
                ("token", token),
            ]))
            .await?;

        match response["edit"]["result"].as_str() {
            Some("Success") => Ok(()),
            other => Err(WikiError::Edit {
                title: title.to_string(),
                reason: other.unwrap_or("no result").to_string(),
            }),
        }
    }

    async fn page_texts(&self, titles: &[String]) -> Result<HashMap<String, String>> {
        let base = params(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("rvprop", "content"),
            ("rvslots", "main"),
        ]);
        Ok(self
            .pages_batch(titles, base)
            .await?
            .into_iter()
            .map(|(title, pages)| {
                let text = pages
                    .iter()
                    .find_map(|p| p["revisions"][0]["slots"]["main"]["content"].as_str())
                    .unwrap_or_default()
                    .to_string();
                (title, text)
            })
            .collect())
    }

    async fn exists(&self, titles: &[String]) -> Result<HashMap<String, bool>> {
        let base = params(&[("action", "query"), ("prop", "info")]);
        Ok(self
            .pages_batch(titles, base)
            .await?
            .into_iter()
            .map(|(title, pages)| {
                let exists = pages.first().is_some_and(|page| {
                    !page["missing"].as_bool().unwrap_or(false)
                        && !page["invalid"].as_bool().unwrap_or(false)
                });
                (title, exists)
            })
            .collect())
    }

    async fn duplicate_files(
        &self,
        titles: &[String],
        shared_only: bool,
    ) -> Result<HashMap<String, Vec<String>>> {
        let base = params(&[
            ("action", "query"),
            ("prop", "duplicatefiles"),
            ("dflimit", "max"),
        ]);
        let prefix = self.namespaces.prefix(Namespace::FILE);

        Ok(self
            .pages_batch(titles, base)
            .await?
            .into_iter()
            .map(|(title, pages)| {
                let dupes = pages
                    .iter()
                    .flat_map(|page| page["duplicatefiles"].as_array().cloned().unwrap_or_default())
                    .filter(|d| !shared_only || d["shared"].as_bool().unwrap_or(false))
                    .filter_map(|d| d["name"].as_str().map(|n| n.replace('_', " ")))
                    .map(|name| format!("{}{}", prefix, name))
                    .collect();
                (title, dupes)
            })
            .collect())
    }

    async fn what_links_here(&self, titles: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let base = params(&[
            ("action", "query"),
            ("prop", "linkshere"),
            ("lhprop", "title"),
            ("lhlimit", "max"),
        ]);
        self.prop_titles(titles, base, "linkshere").await
    }

    async fn templates_on_page(
        &self,
        titles: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        let base = params(&[
            ("action", "query"),
            ("prop", "templates"),
            ("tllimit", "max"),
        ]);
        self.prop_titles(titles, base, "templates").await
    }

    async fn categories_on_page(
        &self,
        titles: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        let base = params(&[
            ("action", "query"),
            ("prop", "categories"),
            ("cllimit", "max"),
        ]);
        self.prop_titles(titles, base, "categories").await
    }

    async fn resolve_redirects(&self, titles: &[String]) -> Result<HashMap<String, String>> {
        let base = params(&[("action", "query"), ("redirects", "1")]);
        let aliases = self.title_aliases(titles, base).await?;
        Ok(titles
            .chunks(BATCH_SIZE)
            .zip(aliases.iter())
            .flat_map(|(chunk, aliases)| chunk.iter().map(|t| (t.clone(), aliases.resolve(t))))
            .collect())
    }

    async fn normalize_titles(&self, titles: &[String]) -> Result<HashMap<String, String>> {
        let base = params(&[("action", "query")]);
        let aliases = self.title_aliases(titles, base).await?;
        Ok(titles
            .chunks(BATCH_SIZE)
            .zip(aliases.iter())
            .flat_map(|(chunk, aliases)| {
                chunk.iter().map(|t| (t.clone(), aliases.normalize(t)))
            })
            .collect())
    }
}
