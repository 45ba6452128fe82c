//! Rule name patterns and path-level exclusions.
//!
//! Both match raw file-name bytes, so names that are not valid UTF-8 are
//! seen as they are on disk rather than through replacement characters.

use crate::error::{PatternSource, Result, SweepError};
use regex::bytes::Regex;
use std::ffi::OsStr;
use std::path::Path;

/// A rule's name pattern, compiled once and reused for every candidate.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    /// Compile the `pattern` of the rule at `rule_index`
    pub fn compile(pattern: &str, rule_index: usize) -> Result<Self> {
        let regex = compile_regex(pattern, PatternSource::Rule(rule_index))?;
        Ok(Self { regex })
    }

    /// True iff the entry's base name matches (unanchored, like `Regex::is_match`)
    pub fn matches(&self, name: impl AsRef<OsStr>) -> bool {
        self.regex.is_match(name.as_ref().as_encoded_bytes())
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Global exclusion list. Patterns are matched against the joined folder + name
/// path, so an exclusion can be scoped to one folder (e.g. `downloads/keep-.*`).
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    patterns: Vec<Regex>,
}

impl ExclusionFilter {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .enumerate()
            .map(|(idx, p)| compile_regex(p.as_ref(), PatternSource::Exclude(idx)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Returns the first exclusion pattern matching `path`, if any
    pub fn matching_pattern(&self, path: &Path) -> Option<&str> {
        let path = path.as_os_str().as_encoded_bytes();
        self.patterns
            .iter()
            .find(|re| re.is_match(path))
            .map(Regex::as_str)
    }
}

fn compile_regex(pattern: &str, origin: PatternSource) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| SweepError::InvalidPattern {
        origin,
        pattern: pattern.to_string(),
        source,
    })
}
