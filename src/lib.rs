//! trashday - rule-driven retention sweeper
//!
//! Each rule names a folder under a common root, a regex for entry names and a
//! retention period in days. One pass lists every rule folder (one level deep)
//! and moves an entry to the trash only when all of these hold:
//!
//! - its base name matches the rule pattern
//! - its full path matches none of the global exclusions
//! - it is not a working tree with uncommitted changes (directories only)
//! - it, and everything below it, was last modified before the retention cutoff
//!
//! Entries whose state cannot be determined are always kept.

pub mod config;
pub mod error;
pub mod logging;
pub mod patterns;
pub mod relocate;
pub mod sweep;
pub mod time;
pub mod vcs;

pub use config::{clean_path, CompiledRule, Rule, Settings, SweepPlan, SETTINGS_FILE_NAME};
pub use error::{PatternSource, Result, SweepError};
pub use patterns::{ExclusionFilter, NamePattern};
pub use relocate::{relocate, RelocateError, Relocation};
pub use sweep::{
    list_candidates, Candidate, RuleReport, SkipStats, SweepEngine, SweepOptions, SweepReport,
    Verdict,
};
pub use time::{reference_time, AgeFilter};
pub use vcs::{GitStatusChecker, StatusChecker, VcsStatus};
