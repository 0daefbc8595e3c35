//! Namespace handling for wiki titles

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Numeric namespace ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct Namespace(pub i32);

impl Namespace {
    pub const MAIN: Namespace = Namespace(0);
    pub const TALK: Namespace = Namespace(1);
    pub const USER: Namespace = Namespace(2);
    pub const USER_TALK: Namespace = Namespace(3);
    pub const PROJECT: Namespace = Namespace(4);
    pub const PROJECT_TALK: Namespace = Namespace(5);
    pub const FILE: Namespace = Namespace(6);
    pub const FILE_TALK: Namespace = Namespace(7);
    pub const MEDIAWIKI: Namespace = Namespace(8);
    pub const TEMPLATE: Namespace = Namespace(10);
    pub const TEMPLATE_TALK: Namespace = Namespace(11);
    pub const HELP: Namespace = Namespace(12);
    pub const CATEGORY: Namespace = Namespace(14);
    pub const CATEGORY_TALK: Namespace = Namespace(15);
    pub const TIMED_TEXT: Namespace = Namespace(710);

    pub fn id(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Joins namespace IDs the way the API expects them, e.g. `6|7`
pub fn join_ids(ns: &[Namespace]) -> String {
    ns.iter()
        .map(|n| n.0.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Maps namespace names and aliases to IDs for one wiki
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    names: HashMap<Namespace, String>,
    lookup: HashMap<String, Namespace>,
}

const ENWIKI_DEFAULTS: &[(i32, &str)] = &[
    (0, ""),
    (1, "Talk"),
    (2, "User"),
    (3, "User talk"),
    (4, "Wikipedia"),
    (5, "Wikipedia talk"),
    (6, "File"),
    (7, "File talk"),
    (8, "MediaWiki"),
    (9, "MediaWiki talk"),
    (10, "Template"),
    (11, "Template talk"),
    (12, "Help"),
    (13, "Help talk"),
    (14, "Category"),
    (15, "Category talk"),
    (100, "Portal"),
    (101, "Portal talk"),
    (710, "TimedText"),
    (711, "TimedText talk"),
    (828, "Module"),
    (829, "Module talk"),
];

const ENWIKI_ALIASES: &[(i32, &str)] = &[
    (2, "User"),
    (4, "Project"),
    (4, "WP"),
    (5, "Project talk"),
    (5, "WT"),
    (6, "Image"),
    (7, "Image talk"),
];

impl Default for NamespaceManager {
    /// English Wikipedia namespaces
    fn default() -> Self {
        let mut manager = Self::from_names(
            ENWIKI_DEFAULTS
                .iter()
                .map(|(id, name)| (Namespace(*id), name.to_string())),
        );
        for (id, alias) in ENWIKI_ALIASES {
            manager.add_alias(Namespace(*id), alias);
        }
        manager
    }
}

impl NamespaceManager {
    /// Build from `(id, local name)` pairs
    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = (Namespace, String)>,
    {
        let mut manager = Self {
            names: HashMap::new(),
            lookup: HashMap::new(),
        };
        for (ns, name) in names {
            manager.lookup.insert(normalize_name(&name), ns);
            manager.names.insert(ns, name);
        }
        manager
    }

    /// Register an additional name for `ns`
    pub fn add_alias(&mut self, ns: Namespace, alias: &str) {
        self.lookup.insert(normalize_name(alias), ns);
    }

    /// Local name of `ns`, empty for the main namespace
    pub fn name(&self, ns: Namespace) -> Option<&str> {
        self.names.get(&ns).map(String::as_str)
    }

    /// Title prefix of `ns`, e.g. `File:`. Empty for the main namespace or unknown namespaces.
    pub fn prefix(&self, ns: Namespace) -> String {
        match self.name(ns) {
            Some(name) if !name.is_empty() => format!("{}:", name),
            _ => String::new(),
        }
    }

    /// Namespace of `title`
    pub fn which_ns(&self, title: &str) -> Namespace {
        self.split(title).0
    }

    /// `title` without its namespace prefix
    pub fn strip_ns<'a>(&self, title: &'a str) -> &'a str {
        self.split(title).1
    }

    /// `title` moved into `ns`, e.g. `User:Foo` → `User talk:Foo`
    pub fn convert_ns(&self, title: &str, ns: Namespace) -> String {
        format!("{}{}", self.prefix(ns), self.strip_ns(title))
    }

    fn split<'a>(&self, title: &'a str) -> (Namespace, &'a str) {
        if let Some((head, rest)) = title.split_once(':') {
            if let Some(ns) = self.lookup.get(&normalize_name(head)) {
                if *ns != Namespace::MAIN {
                    return (*ns, rest.trim_start());
                }
            }
        }
        (Namespace::MAIN, title)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().replace('_', " ").to_lowercase()
}
