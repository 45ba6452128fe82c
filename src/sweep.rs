//! Rule-by-rule sweep: list one folder level, judge each entry, move the ones
//! that qualify.

use crate::config::{clean_path, CompiledRule, SweepPlan};
use crate::error::{Result, SweepError};
use crate::relocate::{destination_for, relocate, RelocateError, Relocation};
use crate::time::AgeFilter;
use crate::vcs::{check_candidate, StatusChecker, VcsStatus};

use colored::Colorize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info_span, warn};

/// Options controlling sweep behavior (runtime flags)
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    /// Evaluate everything but move nothing
    pub dry_run: bool,
    /// Suppress per-rule and per-entry console lines
    pub quiet: bool,
}

/// One entry of a rule folder under evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Base name as stored on disk, not necessarily UTF-8
    pub name: OsString,
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified: SystemTime,
}

/// Why a candidate was or was not moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Relocate,
    PatternMismatch,
    Excluded,
    IsTrash,
    TooRecent,
    Dirty(VcsStatus),
}

/// Counts of candidates held back, per predicate
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipStats {
    pub pattern_mismatch: usize,
    pub excluded: usize,
    pub too_recent: usize,
    pub dirty: usize,
}

/// Outcome of one rule
#[derive(Debug)]
pub struct RuleReport {
    pub folder: PathBuf,
    pub examined: usize,
    /// Moves performed (or, in a dry run, planned)
    pub moved: Vec<Relocation>,
    pub failed: Vec<RelocateError>,
    pub skipped: SkipStats,
}

/// Outcome of a whole pass
#[derive(Debug, Default)]
pub struct SweepReport {
    pub dry_run: bool,
    pub rules: Vec<RuleReport>,
}

impl SweepReport {
    pub fn moved_count(&self) -> usize {
        self.rules.iter().map(|r| r.moved.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.rules.iter().map(|r| r.failed.len()).sum()
    }

    pub fn examined_count(&self) -> usize {
        self.rules.iter().map(|r| r.examined).sum()
    }
}

pub struct SweepEngine<'a> {
    plan: &'a SweepPlan,
    checker: &'a dyn StatusChecker,
    reference: SystemTime,
    options: SweepOptions,
}

impl<'a> SweepEngine<'a> {
    /// `reference` anchors every rule's retention window for the whole pass
    pub fn new(
        plan: &'a SweepPlan,
        checker: &'a dyn StatusChecker,
        reference: SystemTime,
        options: SweepOptions,
    ) -> Self {
        Self {
            plan,
            checker,
            reference,
            options,
        }
    }

    /// Run every rule in declaration order. A folder that cannot be listed
    /// aborts the whole pass.
    pub fn run(&self) -> Result<SweepReport> {
        let mut report = SweepReport {
            dry_run: self.options.dry_run,
            rules: Vec::with_capacity(self.plan.rules.len()),
        };

        for rule in &self.plan.rules {
            report.rules.push(self.run_rule(rule)?);
        }

        Ok(report)
    }

    pub fn run_rule(&self, rule: &CompiledRule) -> Result<RuleReport> {
        let folder = self.plan.folder_for(&rule.rule);
        let _span = info_span!("rule", folder = %folder.display(), pattern = rule.pattern.as_str())
            .entered();

        if !self.options.quiet {
            println!("{}", format!("{}:", folder.display()).bold());
        }

        let candidates = list_candidates(&folder)?;
        let age = AgeFilter::new(self.reference, rule.rule.days);

        let mut report = RuleReport {
            folder,
            examined: candidates.len(),
            moved: Vec::new(),
            failed: Vec::new(),
            skipped: SkipStats::default(),
        };

        for candidate in &candidates {
            let verdict = self.evaluate(rule, &age, candidate);
            debug!(path = %candidate.path.display(), ?verdict, "evaluated");

            match verdict {
                Verdict::Relocate => self.dispatch(candidate, &mut report),
                Verdict::PatternMismatch => report.skipped.pattern_mismatch += 1,
                Verdict::Excluded | Verdict::IsTrash => report.skipped.excluded += 1,
                Verdict::TooRecent => report.skipped.too_recent += 1,
                Verdict::Dirty(status) => {
                    if let VcsStatus::Unknown(reason) = &status {
                        warn!(
                            path = %candidate.path.display(),
                            reason = %reason,
                            "could not read working-tree status, keeping entry"
                        );
                    }
                    report.skipped.dirty += 1;
                }
            }
        }

        Ok(report)
    }

    /// Judge one candidate. Cheap name/path checks run first; the recursive
    /// age walk and the status subprocess only run when those pass.
    pub fn evaluate(&self, rule: &CompiledRule, age: &AgeFilter, candidate: &Candidate) -> Verdict {
        if !rule.pattern.matches(&candidate.name) {
            return Verdict::PatternMismatch;
        }

        if let Some(pattern) = self.plan.exclusions.matching_pattern(&candidate.path) {
            debug!(path = %candidate.path.display(), pattern, "excluded");
            return Verdict::Excluded;
        }

        if candidate.path == self.plan.trash {
            return Verdict::IsTrash;
        }

        // Fast reject on the entry's own time before walking its subtree
        if !age.passes(candidate.modified) || !age.is_old_enough(&candidate.path) {
            return Verdict::TooRecent;
        }

        let status = check_candidate(self.checker, &candidate.path, candidate.is_dir);
        if status.blocks_removal() {
            return Verdict::Dirty(status);
        }

        Verdict::Relocate
    }

    fn dispatch(&self, candidate: &Candidate, report: &mut RuleReport) {
        let result = if self.options.dry_run {
            destination_for(&candidate.path, &self.plan.trash).map(|to| Relocation {
                from: candidate.path.clone(),
                to,
                copied: false,
            })
        } else {
            relocate(&candidate.path, &self.plan.trash)
        };

        match result {
            Ok(moved) => {
                if !self.options.quiet {
                    let prefix = if self.options.dry_run { "would move " } else { "" };
                    println!(
                        "    {}{} -> {}",
                        prefix,
                        moved.from.display(),
                        moved.to.display().to_string().green()
                    );
                }
                report.moved.push(moved);
            }
            Err(err) => {
                warn!(error = %err, "move failed");
                report.failed.push(err);
            }
        }
    }
}

/// List the direct children of `folder`, sorted by name.
///
/// Unlike the recursive age walk, any failure here is structural: the folder
/// itself or an entry's metadata being unreadable aborts the pass.
pub fn list_candidates(folder: &Path) -> Result<Vec<Candidate>> {
    let list_err = |source| SweepError::ListFolder {
        path: folder.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in fs::read_dir(folder).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        // `./downloads/x` must read as `downloads/x` to the exclusions
        let path = clean_path(&entry.path());

        // symlink_metadata: links are judged as themselves, never their target
        let metadata = fs::symlink_metadata(&path).map_err(|source| SweepError::Metadata {
            path: path.clone(),
            source,
        })?;
        let modified = metadata.modified().map_err(|source| SweepError::Metadata {
            path: path.clone(),
            source,
        })?;

        candidates.push(Candidate {
            name: entry.file_name(),
            path,
            is_dir: metadata.is_dir(),
            modified,
        });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Rule, Settings};
    use filetime::{set_symlink_file_times, FileTime};
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const DAY: u64 = 24 * 60 * 60;

    /// Fixed answers keyed by directory name; records what was checked
    struct FakeChecker {
        dirty: Vec<&'static str>,
        checked: RefCell<Vec<PathBuf>>,
    }

    impl FakeChecker {
        fn new(dirty: &[&'static str]) -> Self {
            Self {
                dirty: dirty.to_vec(),
                checked: RefCell::new(Vec::new()),
            }
        }
    }

    impl StatusChecker for FakeChecker {
        fn status(&self, dir: &Path) -> VcsStatus {
            self.checked.borrow_mut().push(dir.to_path_buf());
            let name = dir.file_name().unwrap().to_string_lossy();
            if name == "unknown" {
                VcsStatus::Unknown("not a git repository".into())
            } else if self.dirty.iter().any(|d| *d == name) {
                VcsStatus::Dirty
            } else {
                VcsStatus::Clean
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        now: SystemTime,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            fs::create_dir(dir.path().join("downloads")).unwrap();
            fs::create_dir(dir.path().join("trash")).unwrap();
            Self {
                dir,
                now: SystemTime::now(),
            }
        }

        fn downloads(&self) -> PathBuf {
            self.dir.path().join("downloads")
        }

        fn trash(&self) -> PathBuf {
            self.dir.path().join("trash")
        }

        fn file(&self, name: &str, age_days: u64) -> PathBuf {
            let path = self.downloads().join(name);
            fs::write(&path, name).unwrap();
            self.age(&path, age_days);
            path
        }

        fn directory(&self, name: &str, age_days: u64) -> PathBuf {
            let path = self.downloads().join(name);
            fs::create_dir(&path).unwrap();
            fs::write(path.join("inner.txt"), "x").unwrap();
            self.age(&path.join("inner.txt"), age_days);
            self.age(&path, age_days);
            path
        }

        fn age(&self, path: &Path, age_days: u64) {
            let ft = FileTime::from_system_time(self.now - Duration::from_secs(age_days * DAY));
            set_symlink_file_times(path, ft, ft).unwrap();
        }

        fn plan(&self, pattern: &str, days: u32, exclude: &[&str]) -> SweepPlan {
            Settings {
                rules: vec![Rule {
                    path: "downloads".into(),
                    pattern: pattern.into(),
                    days,
                }],
                exclude: exclude.iter().map(|s| s.to_string()).collect(),
                root: self.dir.path().to_path_buf(),
                trash: self.trash(),
            }
            .compile()
            .unwrap()
        }
    }

    fn quiet(dry_run: bool) -> SweepOptions {
        SweepOptions {
            dry_run,
            quiet: true,
        }
    }

    #[test]
    fn test_list_candidates_sorted_with_metadata() {
        let fx = Fixture::new();
        fx.file("b.tmp", 3);
        fx.directory("a-dir", 3);

        let candidates = list_candidates(&fx.downloads()).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "a-dir");
        assert!(candidates[0].is_dir);
        assert_eq!(candidates[1].name, "b.tmp");
        assert!(!candidates[1].is_dir);
        assert_eq!(candidates[1].path, fx.downloads().join("b.tmp"));
    }

    #[test]
    fn test_listed_paths_are_lexically_clean() {
        let fx = Fixture::new();
        fs::create_dir(fx.dir.path().join("inbox")).unwrap();
        fx.file("b.tmp", 3);

        let candidates = list_candidates(&fx.dir.path().join("./inbox/../downloads")).unwrap();

        assert_eq!(
            candidates[0].path.as_os_str(),
            fx.downloads().join("b.tmp").as_os_str()
        );
    }

    #[test]
    fn test_trash_given_with_parent_parts_is_still_skipped() {
        let fx = Fixture::new();
        let inner_trash = fx.downloads().join("trash");
        fs::create_dir(&inner_trash).unwrap();
        fx.age(&inner_trash, 90);
        let plan = Settings {
            rules: vec![Rule {
                path: "downloads".into(),
                pattern: ".*".into(),
                days: 30,
            }],
            exclude: vec![],
            root: fx.dir.path().to_path_buf(),
            trash: fx.dir.path().join("downloads/../downloads/./trash"),
        }
        .compile()
        .unwrap();
        let checker = FakeChecker::new(&[]);

        let report = SweepEngine::new(&plan, &checker, fx.now, quiet(true))
            .run()
            .unwrap();

        assert_eq!(report.rules[0].skipped.excluded, 1);
        assert!(report.rules[0].moved.is_empty());
        assert!(inner_trash.is_dir());
    }

    #[test]
    fn test_list_missing_folder_is_fatal() {
        let fx = Fixture::new();
        let err = list_candidates(&fx.dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SweepError::ListFolder { .. }));
    }

    #[test]
    fn test_run_fails_when_rule_folder_missing() {
        let fx = Fixture::new();
        let mut plan = fx.plan(".*", 1, &[]);
        plan.rules[0].rule.path = "missing".into();
        let checker = FakeChecker::new(&[]);

        let result = SweepEngine::new(&plan, &checker, fx.now, quiet(false)).run();

        assert!(matches!(result, Err(SweepError::ListFolder { .. })));
    }

    #[test]
    fn test_evaluate_each_predicate() {
        let fx = Fixture::new();
        fx.file("old.tmp", 45);
        fx.file("recent.tmp", 2);
        fx.file("old.log", 45);
        fx.file("keep-old.tmp", 45);
        let plan = fx.plan(r"\.tmp$", 30, &["downloads/keep-.*"]);
        let checker = FakeChecker::new(&[]);
        let engine = SweepEngine::new(&plan, &checker, fx.now, quiet(true));
        let age = AgeFilter::new(fx.now, 30);
        let rule = &plan.rules[0];

        let verdicts: Vec<_> = list_candidates(&fx.downloads())
            .unwrap()
            .iter()
            .map(|c| {
                let name = c.name.to_string_lossy().into_owned();
                (name, engine.evaluate(rule, &age, c))
            })
            .collect();

        assert_eq!(
            verdicts,
            vec![
                ("keep-old.tmp".to_string(), Verdict::Excluded),
                ("old.log".to_string(), Verdict::PatternMismatch),
                ("old.tmp".to_string(), Verdict::Relocate),
                ("recent.tmp".to_string(), Verdict::TooRecent),
            ]
        );
        // Plain files never reach the status check
        assert!(checker.checked.borrow().is_empty());
    }

    #[test]
    fn test_dirty_and_unknown_directories_are_kept() {
        let fx = Fixture::new();
        fx.directory("repo-dirty", 90);
        fx.directory("unknown", 90);
        fx.directory("repo-clean", 90);
        let plan = fx.plan("^(repo-|unknown)", 30, &[]);
        let checker = FakeChecker::new(&["repo-dirty"]);

        let report = SweepEngine::new(&plan, &checker, fx.now, quiet(false))
            .run()
            .unwrap();

        let rule = &report.rules[0];
        assert_eq!(rule.skipped.dirty, 2);
        assert_eq!(rule.moved.len(), 1);
        assert!(fx.trash().join("repo-clean").is_dir());
        assert!(fx.downloads().join("repo-dirty").is_dir());
        assert!(fx.downloads().join("unknown").is_dir());
    }

    #[test]
    fn test_too_recent_directory_is_not_checked() {
        let fx = Fixture::new();
        let dir = fx.directory("repo-new", 90);
        fs::write(dir.join("fresh.txt"), "x").unwrap();
        fx.age(&dir, 90);
        let plan = fx.plan("^repo-", 30, &[]);
        let checker = FakeChecker::new(&[]);

        let report = SweepEngine::new(&plan, &checker, fx.now, quiet(false))
            .run()
            .unwrap();

        assert_eq!(report.rules[0].skipped.too_recent, 1);
        assert!(checker.checked.borrow().is_empty());
    }

    #[test]
    fn test_dry_run_moves_nothing() {
        let fx = Fixture::new();
        fx.file("old.tmp", 45);
        let plan = fx.plan(r"\.tmp$", 30, &[]);
        let checker = FakeChecker::new(&[]);

        let report = SweepEngine::new(&plan, &checker, fx.now, quiet(true))
            .run()
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.moved_count(), 1);
        assert_eq!(report.rules[0].moved[0].to, fx.trash().join("old.tmp"));
        assert!(fx.downloads().join("old.tmp").exists());
        assert!(!fx.trash().join("old.tmp").exists());
    }

    #[test]
    fn test_failed_move_is_reported_and_sweep_continues() {
        let fx = Fixture::new();
        fx.file("a.tmp", 45);
        fx.file("b.tmp", 45);
        let mut plan = fx.plan(r"\.tmp$", 30, &[]);
        plan.trash = fx.dir.path().join("missing-trash");
        let checker = FakeChecker::new(&[]);

        let report = SweepEngine::new(&plan, &checker, fx.now, quiet(false))
            .run()
            .unwrap();

        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.moved_count(), 0);
        assert!(fx.downloads().join("a.tmp").exists());
    }

    #[test]
    fn test_trash_inside_rule_folder_is_skipped() {
        let fx = Fixture::new();
        let inner_trash = fx.downloads().join("trash");
        fs::create_dir(&inner_trash).unwrap();
        fx.age(&inner_trash, 90);
        let mut plan = fx.plan(".*", 30, &[]);
        plan.trash = inner_trash.clone();
        let checker = FakeChecker::new(&[]);
        let engine = SweepEngine::new(&plan, &checker, fx.now, quiet(false));

        let report = engine.run().unwrap();

        assert_eq!(report.rules[0].skipped.excluded, 1);
        assert!(inner_trash.is_dir());
    }

    #[test]
    fn test_reference_time_is_fixed_per_pass() {
        let fx = Fixture::new();
        fx.file("old.tmp", 45);
        let plan = fx.plan(r"\.tmp$", 30, &[]);
        let checker = FakeChecker::new(&[]);
        // Pretend the pass runs 20 days ago: the file is only 25 days old then
        let earlier = fx.now - Duration::from_secs(20 * DAY);

        let report = SweepEngine::new(&plan, &checker, earlier, quiet(false))
            .run()
            .unwrap();

        assert_eq!(report.moved_count(), 0);
        assert_eq!(report.rules[0].skipped.too_recent, 1);
    }
}
