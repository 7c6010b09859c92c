//! Subjects, snapshot roles and snapshot records.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::step_key::StepKey;

/// Namespace owning exactly one baseline set and one current set,
/// typically an application package name such as `com.example.app`.
///
/// A subject is always a single path component, so it can be joined onto a
/// store root without escaping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);

impl Subject {
    /// Validate and wrap a subject identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty()
            || trimmed != id
            || id == "."
            || id == ".."
            || id.contains(['/', '\\', '\0'])
        {
            return Err(Error::InvalidSubject(id));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Subject {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Subject {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Subject> for String {
    fn from(subject: Subject) -> Self {
        subject.0
    }
}

/// Which of a subject's two snapshot sets a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Accepted golden reference
    Baseline,
    /// Produced by the most recent test run
    Current,
}

impl Role {
    /// Short name used in logs and on the command line.
    pub fn short_name(&self) -> &'static str {
        match self {
            Role::Baseline => "base",
            Role::Current => "cur",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "baseline" => Ok(Role::Baseline),
            "cur" | "current" => Ok(Role::Current),
            other => Err(Error::Other(format!("Unknown role: {other}"))),
        }
    }
}

/// One image file in a snapshot set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Timestamp-independent pairing key
    pub key: StepKey,
    /// Location on disk
    pub path: PathBuf,
    /// Capture time parsed from the filename, when it carries one
    pub captured_at: Option<NaiveDateTime>,
    /// Set the snapshot belongs to
    pub role: Role,
}
