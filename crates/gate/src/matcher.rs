//! Path classifier: maps a request path to exempt or protected.
//!
//! The exemption set is data (a list of matchers) rather than a chain of
//! hard-coded branches, so it can be configured and tested directly.

use {gatehouse_config::PathMatcherConfig, regex::Regex};

use crate::error::{Error, Result};

/// Outcome of classifying a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Exempt,
    Protected,
}

/// A single exemption rule.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    Exact(String),
    Prefix(String),
    Suffix(String),
    /// Needed where a path segment varies, e.g. `/{locale}/manifest.json`.
    Pattern(Regex),
}

impl PathMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => path.ends_with(suffix.as_str()),
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

impl TryFrom<&PathMatcherConfig> for PathMatcher {
    type Error = Error;

    fn try_from(cfg: &PathMatcherConfig) -> Result<Self> {
        Ok(match cfg {
            PathMatcherConfig::Exact(s) => Self::Exact(s.clone()),
            PathMatcherConfig::Prefix(s) => Self::Prefix(s.clone()),
            PathMatcherConfig::Suffix(s) => Self::Suffix(s.clone()),
            PathMatcherConfig::Pattern(p) => {
                Self::Pattern(Regex::new(p).map_err(|source| Error::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })?)
            },
        })
    }
}

/// Ordered list of exemption rules. A path is exempt if any rule matches.
#[derive(Debug, Clone, Default)]
pub struct ExemptionSet {
    matchers: Vec<PathMatcher>,
}

impl ExemptionSet {
    pub fn new(matchers: Vec<PathMatcher>) -> Self {
        Self { matchers }
    }

    /// Compile configured rules. Fails on the first invalid pattern.
    pub fn from_config(rules: &[PathMatcherConfig]) -> Result<Self> {
        let matchers = rules
            .iter()
            .map(PathMatcher::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { matchers })
    }

    /// The built-in exemptions.
    pub fn defaults() -> Result<Self> {
        Self::from_config(&gatehouse_config::schema::default_exemptions())
    }

    pub fn classify(&self, path: &str) -> PathClass {
        if self.matchers.iter().any(|m| m.matches(path)) {
            PathClass::Exempt
        } else {
            PathClass::Protected
        }
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
