//! Settings loading and validation.
//!
//! The settings document lives beside the executable (`settings.yml`) unless a
//! path is given explicitly. It is read once, validated, and then passed by
//! reference to the sweep; nothing here is process-global.

use crate::error::{Result, SweepError};
use crate::patterns::{ExclusionFilter, NamePattern};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// File name looked up next to the running binary
pub const SETTINGS_FILE_NAME: &str = "settings.yml";

/// One retention rule: entries of `root/path` whose name matches `pattern`
/// and that are older than `days` are moved to the trash.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub path: String,
    pub pattern: String,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub root: PathBuf,
    pub trash: PathBuf,
}

/// A rule with its pattern compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub pattern: NamePattern,
}

/// Validated, ready-to-run form of [`Settings`]
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub rules: Vec<CompiledRule>,
    pub exclusions: ExclusionFilter,
    pub root: PathBuf,
    pub trash: PathBuf,
}

impl Settings {
    /// Load settings from `path`. `.toml` files are parsed as TOML, anything
    /// else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SweepError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content).map_err(|source| SweepError::ConfigToml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_yaml_ng::from_str(&content).map_err(|source| SweepError::ConfigYaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// `settings.yml` in the directory containing the running executable
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe().map_err(SweepError::ConfigLocation)?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(SETTINGS_FILE_NAME))
    }

    /// Compile every rule pattern and exclusion up front. Any malformed
    /// pattern fails the whole plan.
    pub fn compile(&self) -> Result<SweepPlan> {
        let rules = self
            .rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| {
                Ok(CompiledRule {
                    pattern: NamePattern::compile(&rule.pattern, idx)?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let exclusions = ExclusionFilter::compile(&self.exclude)?;

        Ok(SweepPlan {
            rules,
            exclusions,
            root: clean_path(&self.root),
            trash: clean_path(&self.trash),
        })
    }
}

impl SweepPlan {
    /// Folder a rule operates on (`root/path`, lexically cleaned)
    pub fn folder_for(&self, rule: &Rule) -> PathBuf {
        clean_path(&self.root.join(&rule.path))
    }
}

/// Lexically normalize `path`: drop `.` parts and fold `name/..` pairs.
///
/// Exclusions and the trash check compare path text, so `./downloads/x` and
/// `a/../downloads/x` must read as `downloads/x`. The filesystem is never
/// consulted. A leading `..` is kept on relative paths; on absolute paths
/// it stops at the root. An empty result is `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        PathBuf::from(".")
    } else {
        parts.iter().collect()
    }
}
