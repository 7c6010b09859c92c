//! Screenshot store: the baseline and current snapshot sets of each subject.
//!
//! Sets are plain directories. The store is not safe for concurrent writers on
//! the same subject; callers serialize runs per subject.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDateTime};

use visreg_core::step_key::snapshot_file_name;
use visreg_core::{Error, Logger, Result, Role, Snapshot, StepKey, StoreSettings, Subject};

use crate::paths::SubjectPaths;

/// Owns the on-disk snapshot sets under one root.
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    settings: StoreSettings,
    logger: Logger,
}

impl ScreenshotStore {
    /// Create a store over `settings.root`.
    pub fn new(settings: StoreSettings, logger: Logger) -> Self {
        Self {
            settings,
            logger: logger.for_component("store"),
        }
    }

    /// Store settings.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Directory layout for `subject`.
    pub fn paths(&self, subject: &Subject) -> SubjectPaths {
        SubjectPaths::new(&self.settings, subject)
    }

    /// Write a new snapshot into a set, timestamped now.
    pub fn put(
        &self,
        paths: &SubjectPaths,
        role: Role,
        bytes: &[u8],
        step_label: &str,
        human_name: &str,
    ) -> Result<Snapshot> {
        self.put_at(
            paths,
            role,
            bytes,
            step_label,
            human_name,
            Local::now().naive_local(),
        )
    }

    /// Write a new snapshot with an explicit capture time.
    pub fn put_at(
        &self,
        paths: &SubjectPaths,
        role: Role,
        bytes: &[u8],
        step_label: &str,
        human_name: &str,
        captured_at: NaiveDateTime,
    ) -> Result<Snapshot> {
        let dir = paths.dir(role);
        fs::create_dir_all(dir).map_err(|e| self.io_error(paths, role, dir, e))?;

        let filename = snapshot_file_name(captured_at, step_label, human_name, paths.extension());
        let path = dir.join(&filename);
        fs::write(&path, bytes).map_err(|e| self.io_error(paths, role, &path, e))?;

        self.logger.info(format!(
            "Screenshot saved: {} ({} bytes)",
            path.display(),
            bytes.len()
        ));

        Ok(Snapshot {
            key: StepKey::new(step_label, human_name),
            path,
            captured_at: Some(captured_at),
            role,
        })
    }

    /// Map of step key to file for one set. A missing directory is an empty set.
    pub fn list(&self, paths: &SubjectPaths, role: Role) -> Result<BTreeMap<StepKey, PathBuf>> {
        Ok(self
            .snapshots(paths, role)?
            .into_iter()
            .map(|snapshot| (snapshot.key, snapshot.path))
            .collect())
    }

    /// Snapshot records for one set, sorted by step key.
    ///
    /// When two files share a step key, the most recently modified one wins and
    /// a warning is logged.
    pub fn snapshots(&self, paths: &SubjectPaths, role: Role) -> Result<Vec<Snapshot>> {
        let dir = paths.dir(role);
        let mut by_key: BTreeMap<StepKey, (Snapshot, SystemTime)> = BTreeMap::new();

        for path in self.regular_files(paths, role)? {
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(parsed) = StepKey::extract(filename, paths.extension()).into_parsed() else {
                self.logger
                    .debug(format!("Skipping non-snapshot file: {}", path.display()));
                continue;
            };

            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .map_err(|e| self.io_error(paths, role, &path, e))?;
            let snapshot = Snapshot {
                key: parsed.key,
                path,
                captured_at: parsed.captured_at,
                role,
            };

            match by_key.entry(snapshot.key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert((snapshot, modified));
                }
                Entry::Occupied(mut slot) => {
                    let (kept, kept_modified) = slot.get();
                    let newer = (modified, &snapshot.path) > (*kept_modified, &kept.path);
                    let (winner, loser) = if newer {
                        (&snapshot.path, &kept.path)
                    } else {
                        (&kept.path, &snapshot.path)
                    };
                    self.logger.warn(format!(
                        "Duplicate step key {} in {}: keeping {}, ignoring {}",
                        snapshot.key,
                        dir.display(),
                        display_name(winner),
                        display_name(loser),
                    ));
                    if newer {
                        slot.insert((snapshot, modified));
                    }
                }
            }
        }

        Ok(by_key.into_values().map(|(snapshot, _)| snapshot).collect())
    }

    /// Every regular file in a set's directory, sorted by name.
    pub fn regular_files(&self, paths: &SubjectPaths, role: Role) -> Result<Vec<PathBuf>> {
        let dir = paths.dir(role);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(paths, role, dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_error(paths, role, dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| self.io_error(paths, role, &entry.path(), e))?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Number of entries of any kind in a set's directory.
    pub fn entry_count(&self, paths: &SubjectPaths, role: Role) -> Result<usize> {
        let dir = paths.dir(role);
        match fs::read_dir(dir) {
            Ok(entries) => Ok(entries.count()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(self.io_error(paths, role, dir, e)),
        }
    }

    /// Whether a set's directory is missing or holds nothing.
    pub fn is_empty(&self, paths: &SubjectPaths, role: Role) -> Result<bool> {
        Ok(self.entry_count(paths, role)? == 0)
    }

    /// Delete a set and leave its directory behind, empty.
    ///
    /// Clearing a set that does not exist succeeds.
    pub fn clear(&self, paths: &SubjectPaths, role: Role) -> Result<()> {
        let dir = paths.dir(role);
        match fs::remove_dir_all(dir) {
            Ok(()) => self
                .logger
                .info(format!("Cleared {} set: {}", role, dir.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.logger.info(format!(
                "{} set does not exist, creating: {}",
                role,
                dir.display()
            )),
            Err(e) => return Err(self.io_error(paths, role, dir, e)),
        }

        fs::create_dir_all(dir).map_err(|e| self.io_error(paths, role, dir, e))
    }

    fn io_error(&self, paths: &SubjectPaths, role: Role, path: &Path, source: io::Error) -> Error {
        let err = Error::store_io(paths.subject().as_str(), role, path, source);
        self.logger.error(err.to_string());
        err
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
