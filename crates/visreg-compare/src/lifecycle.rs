//! Baseline lifecycle: promotion, clearing and first-run bootstrap.
//!
//! The baseline is either empty or a complete golden set. Promotion copies the
//! current set into a hidden staging directory next to the baseline, checks
//! the file count, and only then renames it into place, so an interrupted
//! promotion never leaves a half-filled baseline behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use visreg_core::{Error, Logger, Result, Role};
use visreg_store::{ScreenshotStore, SubjectPaths};

use crate::comparator::ComparisonSummary;

/// Whether a subject has an established baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BaselineState {
    /// Baseline directory is missing or empty
    NoBaseline,
    /// Baseline holds a golden set
    BaselineSet {
        /// Entries in the baseline directory
        files: usize,
    },
}

/// Why automatic promotion did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Auto-promotion is turned off in configuration
    Disabled,
    /// A baseline already exists
    BaselineExists,
    /// The run produced no snapshots
    CurrentEmpty,
    /// The summary came from a real comparison, not a first run
    NotFirstRun,
}

/// Outcome of [`BaselineManager::auto_promote_if_all_passed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "promotion", rename_all = "snake_case")]
pub enum AutoPromotion {
    /// The current set became the baseline
    Promoted {
        /// Files copied into the baseline
        files: usize,
    },
    /// Nothing was changed
    Skipped {
        /// Why
        reason: SkipReason,
    },
}

/// Guards every mutation of a subject's baseline.
#[derive(Debug, Clone)]
pub struct BaselineManager {
    store: ScreenshotStore,
    logger: Logger,
}

impl BaselineManager {
    /// Create a manager over `store`.
    pub fn new(store: ScreenshotStore, logger: Logger) -> Self {
        Self {
            store,
            logger: logger.for_component("lifecycle"),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self, paths: &SubjectPaths) -> Result<BaselineState> {
        let files = self.store.entry_count(paths, Role::Baseline)?;
        Ok(if files == 0 {
            BaselineState::NoBaseline
        } else {
            BaselineState::BaselineSet { files }
        })
    }

    /// Copy the current snapshots into an empty baseline, preserving filenames.
    ///
    /// Refused with [`Error::GuardViolation`] when the baseline holds anything,
    /// leaving it untouched. Only files that parse as snapshots are copied.
    /// Returns the number of files promoted.
    pub fn promote(&self, paths: &SubjectPaths) -> Result<usize> {
        let subject = paths.subject().as_str();

        if let BaselineState::BaselineSet { files } = self.state(paths)? {
            self.logger.warn(format!(
                "Baseline for {subject} is not empty ({files} file(s)): {}",
                paths.dir(Role::Baseline).display()
            ));
            self.logger
                .warn("Refusing to overwrite the baseline; clear it first");
            return Err(Error::GuardViolation {
                subject: subject.to_string(),
                existing: files,
            });
        }

        let sources: Vec<PathBuf> = self
            .store
            .list(paths, Role::Current)?
            .into_values()
            .collect();
        if sources.is_empty() {
            self.logger.error(format!(
                "Current set for {subject} has no snapshots: {}",
                paths.dir(Role::Current).display()
            ));
            return Err(Error::NothingToPromote {
                subject: subject.to_string(),
            });
        }

        let staging = paths.staging_dir(&Uuid::new_v4().simple().to_string());
        let result = self.stage_and_swap(paths, &sources, &staging);
        if result.is_err() && staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                self.logger.warn(format!(
                    "Could not remove staging directory {}: {e}",
                    staging.display()
                ));
            }
        }

        let promoted = result?;
        self.logger.info(format!(
            "Set {promoted} screenshot(s) as baseline for {subject}"
        ));
        Ok(promoted)
    }

    /// Delete every baseline file. Operator-triggered only.
    pub fn clear_baseline(&self, paths: &SubjectPaths) -> Result<()> {
        self.store.clear(paths, Role::Baseline)?;
        self.logger.info(format!(
            "Baseline cleared for {}",
            paths.subject().as_str()
        ));
        Ok(())
    }

    /// Bootstrap a baseline from the first successful run.
    ///
    /// Fires only when the baseline is empty, the current set is not, and the
    /// summary is `NotComparable`. Never touches an existing baseline.
    pub fn auto_promote_if_all_passed(
        &self,
        paths: &SubjectPaths,
        summary: &ComparisonSummary,
    ) -> Result<AutoPromotion> {
        if !self.store.is_empty(paths, Role::Baseline)? {
            self.logger
                .info("Baseline is not empty, skipping auto-promotion");
            return Ok(skipped(SkipReason::BaselineExists));
        }

        if self.store.list(paths, Role::Current)?.is_empty() {
            self.logger
                .info("Current set has no snapshots, skipping auto-promotion");
            return Ok(skipped(SkipReason::CurrentEmpty));
        }

        if !summary.is_bootstrap_state() {
            self.logger
                .info("Summary is from a completed comparison, skipping auto-promotion");
            return Ok(skipped(SkipReason::NotFirstRun));
        }

        self.logger.info("Auto-promoting current set to baseline...");
        let files = self.promote(paths)?;
        Ok(AutoPromotion::Promoted { files })
    }

    fn stage_and_swap(
        &self,
        paths: &SubjectPaths,
        sources: &[PathBuf],
        staging: &Path,
    ) -> Result<usize> {
        let baseline = paths.dir(Role::Baseline);
        let io_err = |path: &Path, e: io::Error| {
            let err = Error::store_io(paths.subject().as_str(), Role::Baseline, path, e);
            self.logger.error(err.to_string());
            err
        };

        fs::create_dir_all(staging).map_err(|e| io_err(staging, e))?;
        for source in sources {
            let Some(filename) = source.file_name() else {
                continue;
            };
            let target = staging.join(filename);
            fs::copy(source, &target).map_err(|e| io_err(&target, e))?;
        }

        let copied = count_files(staging).map_err(|e| io_err(staging, e))?;
        if copied != sources.len() {
            let err = Error::PromotionIncomplete {
                expected: sources.len(),
                copied,
            };
            self.logger.error(err.to_string());
            return Err(err);
        }
        self.logger.debug(format!(
            "Staged {copied} file(s) in {}",
            staging.display()
        ));

        // An empty baseline directory may exist after a clear. `remove_dir`
        // refuses non-empty directories, so a baseline that filled up since the
        // guard ran is never replaced.
        match fs::remove_dir(baseline) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(baseline, e)),
        }
        fs::rename(staging, baseline).map_err(|e| io_err(baseline, e))?;

        Ok(copied)
    }
}

fn skipped(reason: SkipReason) -> AutoPromotion {
    AutoPromotion::Skipped { reason }
}

fn count_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        if entry?.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use visreg_core::{LogLevel, MemorySink, StoreSettings, Subject};

    use crate::comparator::PairwiseComparator;

    struct Fixture {
        _tmp: tempfile::TempDir,
        store: ScreenshotStore,
        manager: BaselineManager,
        comparator: PairwiseComparator,
        paths: SubjectPaths,
        sink: Arc<MemorySink>,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone());
        let settings = StoreSettings {
            root: tmp.path().to_path_buf(),
            ..StoreSettings::default()
        };
        let store = ScreenshotStore::new(settings, logger.clone());
        let paths = store.paths(&Subject::new("com.example.app").unwrap());
        Fixture {
            manager: BaselineManager::new(store.clone(), logger.clone()),
            comparator: PairwiseComparator::new(store.clone(), logger),
            store,
            paths,
            sink,
            _tmp: tmp,
        }
    }

    fn baseline_files(f: &Fixture) -> Vec<PathBuf> {
        f.store.regular_files(&f.paths, Role::Baseline).unwrap()
    }

    #[test]
    fn test_promote_into_missing_baseline() {
        let f = fixture();
        f.store.put(&f.paths, Role::Current, b"one", "01", "login").unwrap();
        f.store.put(&f.paths, Role::Current, b"two", "02", "home").unwrap();

        assert_eq!(f.manager.state(&f.paths).unwrap(), BaselineState::NoBaseline);
        assert_eq!(f.manager.promote(&f.paths).unwrap(), 2);
        assert_eq!(
            f.manager.state(&f.paths).unwrap(),
            BaselineState::BaselineSet { files: 2 }
        );

        let current: Vec<_> = f
            .store
            .regular_files(&f.paths, Role::Current)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_owned())
            .collect();
        let baseline: Vec<_> = baseline_files(&f)
            .iter()
            .map(|p| p.file_name().unwrap().to_owned())
            .collect();
        assert_eq!(current, baseline);
    }

    #[test]
    fn test_promote_into_cleared_baseline() {
        let f = fixture();
        f.store.clear(&f.paths, Role::Baseline).unwrap();
        f.store.put(&f.paths, Role::Current, b"one", "01", "login").unwrap();

        assert_eq!(f.manager.promote(&f.paths).unwrap(), 1);
        assert_eq!(baseline_files(&f).len(), 1);
    }

    #[test]
    fn test_second_promote_is_refused_without_mutation() {
        let f = fixture();
        f.store.put(&f.paths, Role::Current, b"one", "01", "login").unwrap();
        f.manager.promote(&f.paths).unwrap();
        let before = baseline_files(&f);

        f.store.clear(&f.paths, Role::Current).unwrap();
        f.store.put(&f.paths, Role::Current, b"changed", "01", "login").unwrap();
        f.store.put(&f.paths, Role::Current, b"extra", "02", "home").unwrap();

        let err = f.manager.promote(&f.paths).unwrap_err();
        assert!(err.is_guard_violation());
        assert_eq!(baseline_files(&f), before);
        assert_eq!(fs::read(&before[0]).unwrap(), b"one");
        assert!(f.sink.contains(LogLevel::Warn, "not empty"));
    }

    #[test]
    fn test_promote_empty_current_fails() {
        let f = fixture();
        let err = f.manager.promote(&f.paths).unwrap_err();
        assert!(matches!(err, Error::NothingToPromote { .. }));
        assert_eq!(f.manager.state(&f.paths).unwrap(), BaselineState::NoBaseline);
    }

    #[test]
    fn test_promote_copies_only_snapshots() {
        let f = fixture();
        f.store.put(&f.paths, Role::Current, b"one", "01", "login").unwrap();
        fs::write(f.paths.dir(Role::Current).join("notes.txt"), b"x").unwrap();
        fs::write(f.paths.dir(Role::Current).join(".DS_Store"), b"x").unwrap();

        assert_eq!(f.manager.promote(&f.paths).unwrap(), 1);
        let names: Vec<_> = baseline_files(&f)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with("_01_login.png"));
    }

    #[test]
    fn test_stray_files_alone_are_not_promotable() {
        let f = fixture();
        fs::create_dir_all(f.paths.dir(Role::Current)).unwrap();
        fs::write(f.paths.dir(Role::Current).join("notes.txt"), b"x").unwrap();

        let err = f.manager.promote(&f.paths).unwrap_err();
        assert!(matches!(err, Error::NothingToPromote { .. }));

        let summary = f.comparator.compare(&f.paths).unwrap();
        let outcome = f.manager.auto_promote_if_all_passed(&f.paths, &summary).unwrap();
        assert_eq!(
            outcome,
            AutoPromotion::Skipped {
                reason: SkipReason::CurrentEmpty
            }
        );
        assert_eq!(f.manager.state(&f.paths).unwrap(), BaselineState::NoBaseline);
    }

    #[test]
    fn test_promote_leaves_no_staging_directory() {
        let f = fixture();
        f.store.put(&f.paths, Role::Current, b"one", "01", "login").unwrap();
        f.manager.promote(&f.paths).unwrap();

        let hidden: Vec<_> = fs::read_dir(f.paths.subject_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(hidden.is_empty());
    }

    #[test]
    fn test_clear_baseline() {
        let f = fixture();
        f.store.put(&f.paths, Role::Current, b"one", "01", "login").unwrap();
        f.manager.promote(&f.paths).unwrap();

        f.manager.clear_baseline(&f.paths).unwrap();
        assert_eq!(f.manager.state(&f.paths).unwrap(), BaselineState::NoBaseline);
        f.manager.clear_baseline(&f.paths).unwrap();

        // Promotion works again after an explicit clear.
        assert_eq!(f.manager.promote(&f.paths).unwrap(), 1);
    }

    #[test]
    fn test_auto_promote_bootstraps_first_run() {
        let f = fixture();
        f.store.put(&f.paths, Role::Current, b"one", "01", "login").unwrap();
        let summary = f.comparator.compare(&f.paths).unwrap();
        assert!(summary.is_not_comparable());

        let outcome = f.manager.auto_promote_if_all_passed(&f.paths, &summary).unwrap();
        assert_eq!(outcome, AutoPromotion::Promoted { files: 1 });
        assert_eq!(baseline_files(&f).len(), 1);
    }

    #[test]
    fn test_auto_promote_never_touches_existing_baseline() {
        let f = fixture();
        f.store.put(&f.paths, Role::Baseline, b"gold", "01", "login").unwrap();
        f.store.put(&f.paths, Role::Current, b"new", "01", "login").unwrap();
        f.store.put(&f.paths, Role::Current, b"new", "02", "home").unwrap();
        let before = baseline_files(&f);

        // Even a forged NotComparable summary must not mutate the baseline.
        let mut summary = f.comparator.compare(&f.paths).unwrap();
        for forged in [false, true] {
            if forged {
                summary.status = crate::comparator::ComparisonStatus::NotComparable {
                    reason: crate::comparator::NotComparableReason::NoBaseline,
                };
            }
            let outcome = f.manager.auto_promote_if_all_passed(&f.paths, &summary).unwrap();
            assert_eq!(
                outcome,
                AutoPromotion::Skipped {
                    reason: SkipReason::BaselineExists
                }
            );
            assert_eq!(baseline_files(&f), before);
        }
    }

    #[test]
    fn test_auto_promote_skips_empty_current() {
        let f = fixture();
        let summary = f.comparator.compare(&f.paths).unwrap();
        let outcome = f.manager.auto_promote_if_all_passed(&f.paths, &summary).unwrap();
        assert_eq!(
            outcome,
            AutoPromotion::Skipped {
                reason: SkipReason::CurrentEmpty
            }
        );
        assert_eq!(f.manager.state(&f.paths).unwrap(), BaselineState::NoBaseline);
    }
}
