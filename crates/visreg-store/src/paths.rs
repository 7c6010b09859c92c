//! Directory layout for one subject.

use std::path::{Path, PathBuf};

use visreg_core::{Role, StoreSettings, Subject};

/// Every directory belonging to one subject, computed once and passed around.
///
/// Layout: `<root>/<subject>/<baseline_dir>` and `<root>/<subject>/<current_dir>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPaths {
    subject: Subject,
    subject_dir: PathBuf,
    baseline: PathBuf,
    current: PathBuf,
    baseline_dir_name: String,
    extension: String,
}

impl SubjectPaths {
    /// Derive the layout for `subject` under `settings.root`.
    pub fn new(settings: &StoreSettings, subject: &Subject) -> Self {
        let subject_dir = settings.root.join(subject.as_str());
        Self {
            subject: subject.clone(),
            baseline: subject_dir.join(&settings.baseline_dir),
            current: subject_dir.join(&settings.current_dir),
            subject_dir,
            baseline_dir_name: settings.baseline_dir.clone(),
            extension: settings.extension.clone(),
        }
    }

    /// The subject these paths belong to.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// `<root>/<subject>`
    pub fn subject_dir(&self) -> &Path {
        &self.subject_dir
    }

    /// Directory of a role.
    pub fn dir(&self, role: Role) -> &Path {
        match role {
            Role::Baseline => &self.baseline,
            Role::Current => &self.current,
        }
    }

    /// Sibling directory of the baseline used while staging a promotion.
    ///
    /// Hidden (dot-prefixed) so it never looks like a role directory.
    pub fn staging_dir(&self, nonce: &str) -> PathBuf {
        self.subject_dir
            .join(format!(".{}.staging-{nonce}", self.baseline_dir_name))
    }

    /// Image extension for snapshot files, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}
