//! Age evaluation against a per-rule retention threshold.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, TimeZone};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;
use walkdir::WalkDir;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Retention threshold for one rule, anchored at the pass's reference time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeFilter {
    /// Entries must be modified strictly before this instant.
    /// `None` when `reference - days` is not representable; nothing qualifies then.
    cutoff: Option<SystemTime>,
}

impl AgeFilter {
    pub fn new(reference: SystemTime, days: u32) -> Self {
        let age = Duration::from_secs(u64::from(days) * SECONDS_PER_DAY);
        Self {
            cutoff: reference.checked_sub(age),
        }
    }

    /// True iff `modified` is strictly before the cutoff
    pub fn passes(&self, modified: SystemTime) -> bool {
        self.cutoff.is_some_and(|cutoff| modified < cutoff)
    }

    /// Whether `path`, and for a directory every descendant at every depth,
    /// is old enough.
    ///
    /// Symbolic links are never followed: a link is judged by its own
    /// modification time, which also rules out cycles. Anything that cannot
    /// be listed or stat'ed makes the whole tree "too recent".
    pub fn is_old_enough(&self, path: &Path) -> bool {
        let walker = WalkDir::new(path)
            .follow_links(false)
            .follow_root_links(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "unreadable entry, not old enough");
                    return false;
                }
            };

            let modified = match entry.metadata() {
                Ok(meta) => meta.modified().ok(),
                Err(_) => None,
            };

            match modified {
                Some(mtime) if self.passes(mtime) => {}
                Some(_) => {
                    debug!(path = %entry.path().display(), "modified within retention window");
                    return false;
                }
                None => {
                    debug!(path = %entry.path().display(), "no modification time, not old enough");
                    return false;
                }
            }
        }

        true
    }
}

/// Reference instant for a pass: local midnight of `as_of` if given, else now
pub fn reference_time(as_of: Option<&str>) -> Result<SystemTime> {
    match as_of {
        Some(date_str) => parse_date(date_str),
        None => Ok(SystemTime::now()),
    }
}

/// Parse a date string in YYYY-MM-DD format to SystemTime
pub fn parse_date(date_str: &str) -> Result<SystemTime> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").with_context(|| {
        format!(
            "Invalid date format. Expected YYYY-MM-DD, got: {}",
            date_str
        )
    })?;

    let year = date.year();
    if !(1970..=2100).contains(&year) {
        anyhow::bail!("Year must be between 1970 and 2100, got: {}", year);
    }

    // Interpreted in the user's local timezone, not UTC
    let naive_datetime = date
        .and_hms_opt(0, 0, 0)
        .context("Failed to create midnight time")?;
    let local_datetime = Local
        .from_local_datetime(&naive_datetime)
        .single()
        .context("Ambiguous or invalid local time")?;

    Ok(local_datetime.into())
}
