//! Structural errors that abort a sweep.

use std::path::PathBuf;

use thiserror::Error;

/// Where a pattern came from, used to name it in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    /// `pattern` of the rule at this index.
    Rule(usize),
    /// Entry at this index in the `exclude` list.
    Exclude(usize),
}

impl std::fmt::Display for PatternSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rule(idx) => write!(f, "rules[{idx}].pattern"),
            Self::Exclude(idx) => write!(f, "exclude[{idx}]"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Failed to read settings: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML settings {path}: {source}")]
    ConfigYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to parse TOML settings {path}: {source}")]
    ConfigToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not locate settings beside executable: {0}")]
    ConfigLocation(#[source] std::io::Error),

    #[error("Invalid regex in {origin} '{pattern}': {source}")]
    InvalidPattern {
        origin: PatternSource,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read folder: {path}")]
    ListFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata: {path}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SweepError>;
