//! Request filter rules
//!
//! A deliberately small rule language: `||domain^` anchors, `*` globs and
//! plain substrings. No options, no exceptions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Filters shipped with the engine.
///
/// A domain anchor drops everything after the host, so rules that need their
/// path are written as globs or substrings.
pub const BUILTIN_FILTERS: &[&str] = &[
    "googlevideo.com/videoplayback*&dur=*&gir=yes&lmt=*",
    "youtube.com/api/stats/ads",
    "youtube.com/ptracking",
    "youtube.com/pagead/",
    "||googleadservices.com^",
    "||doubleclick.net^",
    "||googlesyndication.com^",
];

// =============================================================================
// Filter Rule
// =============================================================================

/// Parsed shape of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `||domain^`: the URL must contain the domain token
    DomainAnchor(String),
    /// Literal pieces that must appear in order, separated by `*`
    Glob(Vec<String>),
    /// The URL must contain the text
    Substring(String),
}

/// A single request filter rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterRule {
    raw: String,
    kind: RuleKind,
}

impl FilterRule {
    /// Parse a rule. Returns None for rules that would match every URL.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        let kind = if let Some(rest) = raw.strip_prefix("||") {
            // Domain token ends at the first path separator
            let token = rest.split('/').next().unwrap_or("");
            let domain = token.replacen('^', "", 1);
            if domain.is_empty() {
                return None;
            }
            RuleKind::DomainAnchor(domain)
        } else if raw.contains('*') {
            let pieces: Vec<String> = raw
                .split('*')
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect();
            if pieces.is_empty() {
                return None;
            }
            RuleKind::Glob(pieces)
        } else {
            if raw.is_empty() {
                return None;
            }
            RuleKind::Substring(raw.to_string())
        };

        Some(Self {
            raw: raw.to_string(),
            kind,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Does `url` match this rule?
    pub fn matches(&self, url: &str) -> bool {
        match &self.kind {
            RuleKind::DomainAnchor(domain) => url.contains(domain.as_str()),
            RuleKind::Glob(pieces) => glob_matches(url, pieces),
            RuleKind::Substring(text) => url.contains(text.as_str()),
        }
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Unanchored glob: each literal piece must be found after the previous one.
fn glob_matches(url: &str, pieces: &[String]) -> bool {
    let mut pos = 0;
    for piece in pieces {
        match url[pos..].find(piece.as_str()) {
            Some(found) => pos += found + piece.len(),
            None => return false,
        }
    }
    true
}

// =============================================================================
// Filter Set
// =============================================================================

/// Name of a filter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListName {
    Builtin,
    Custom,
}

impl ListName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Custom => "custom",
        }
    }
}

/// Ordered filter lists, consulted builtin first.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    lists: Vec<(ListName, Vec<FilterRule>)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the shipped filters.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.set_list(
            ListName::Builtin,
            BUILTIN_FILTERS.iter().filter_map(|raw| FilterRule::parse(raw)).collect(),
        );
        set
    }

    /// Replace (or add) a list. An empty custom list is dropped.
    pub fn set_list(&mut self, name: ListName, rules: Vec<FilterRule>) {
        self.lists.retain(|(existing, _)| *existing != name);
        if rules.is_empty() && name == ListName::Custom {
            return;
        }
        self.lists.push((name, rules));
        self.lists.sort_by_key(|(name, _)| *name == ListName::Custom);
    }

    pub fn list(&self, name: ListName) -> &[FilterRule] {
        self.lists
            .iter()
            .find(|(existing, _)| *existing == name)
            .map_or(&[], |(_, rules)| rules.as_slice())
    }

    /// First rule matching `url`, with the list it came from.
    pub fn find_match(&self, url: &str) -> Option<(ListName, &FilterRule)> {
        if url.is_empty() {
            return None;
        }
        self.lists.iter().find_map(|(name, rules)| {
            rules.iter().find(|rule| rule.matches(url)).map(|rule| (*name, rule))
        })
    }

    /// Total number of rules across lists.
    pub fn len(&self) -> usize {
        self.lists.iter().map(|(_, rules)| rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
