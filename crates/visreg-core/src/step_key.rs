//! Step key extraction and snapshot filename formatting.
//!
//! Snapshot files are named `<timestamp>_<step-label>_<human-name>.<ext>`.
//! The pairing key is built from the step label and human name only, so a
//! baseline and a current capture of the same step pair up regardless of when
//! each was taken.
//!
//! New files use a compact timestamp token (`20261017T101530123`) that never
//! contains the field separator. Files written with the older two-part token
//! (`20261017_101530`) are recognised as a whole token too. Splitting the name
//! left to right on `_` would treat the time-of-day as the step label, which is
//! exactly the pairing failure this module exists to avoid.

use std::fmt;

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Separator between filename fields.
pub const FIELD_SEPARATOR: char = '_';

/// Timestamp token written by [`snapshot_file_name`].
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";

/// Two-part timestamp token found in older snapshot sets.
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Minimum number of `_`-separated fields in a snapshot stem.
const MIN_FIELDS: usize = 3;

lazy_static! {
    static ref TIMESTAMPED_STEM: Regex = Regex::new(
        r"^(?P<ts>\d{8}T\d{9}|\d{8}_\d{6})_(?P<step>[^_]+)_(?P<name>.+)$"
    )
    .unwrap();
    static ref LEGACY_PREFIX: Regex = Regex::new(r"^\d{8}_\d{6}_").unwrap();
}

/// Timestamp-independent pairing key: `<step-label>_<human-name>`.
///
/// Keys order lexicographically, which is the order the comparator walks them.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct StepKey(String);

impl StepKey {
    /// Build a key from its two components.
    pub fn new(step_label: &str, human_name: &str) -> Self {
        Self(format!("{step_label}{FIELD_SEPARATOR}{human_name}"))
    }

    /// Step label (first field of the key).
    pub fn step_label(&self) -> &str {
        self.0
            .split_once(FIELD_SEPARATOR)
            .map_or(self.0.as_str(), |(step, _)| step)
    }

    /// Human-readable name (everything after the step label).
    pub fn human_name(&self) -> &str {
        self.0
            .split_once(FIELD_SEPARATOR)
            .map_or("", |(_, name)| name)
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a snapshot filename into its pairing key.
    ///
    /// `extension` is matched case-insensitively and without the leading dot.
    pub fn extract(filename: &str, extension: &str) -> Extracted {
        let Some(stem) = strip_extension(filename, extension) else {
            return Extracted::NotASnapshot;
        };

        if let Some(caps) = TIMESTAMPED_STEM.captures(stem) {
            let ts = &caps["ts"];
            let captured_at = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(ts, LEGACY_TIMESTAMP_FORMAT))
                .ok();
            return Extracted::Step(ParsedName {
                key: StepKey::new(&caps["step"], &caps["name"]),
                captured_at,
            });
        }

        // A legacy timestamp without a name field would split its time of day
        // into the step label.
        if LEGACY_PREFIX.is_match(stem) {
            return Extracted::NotASnapshot;
        }

        // Unrecognised timestamp: anchor on the right, the last two fields are
        // the step label and name.
        let fields: Vec<&str> = stem.rsplitn(MIN_FIELDS, FIELD_SEPARATOR).collect();
        match fields.as_slice() {
            [name, step, _timestamp] if !name.is_empty() && !step.is_empty() => {
                Extracted::Step(ParsedName {
                    key: StepKey::new(step, name),
                    captured_at: None,
                })
            }
            _ => Extracted::NotASnapshot,
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A snapshot filename that parsed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Pairing key
    pub key: StepKey,
    /// Capture time, when the timestamp token was recognised
    pub captured_at: Option<NaiveDateTime>,
}

/// Outcome of [`StepKey::extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// The file is a snapshot
    Step(ParsedName),
    /// Wrong extension or too few fields; callers skip the file
    NotASnapshot,
}

impl Extracted {
    /// Convert into an `Option`, dropping non-snapshots.
    pub fn into_parsed(self) -> Option<ParsedName> {
        match self {
            Extracted::Step(parsed) => Some(parsed),
            Extracted::NotASnapshot => None,
        }
    }
}

/// Build the filename for a new capture.
pub fn snapshot_file_name(
    captured_at: NaiveDateTime,
    step_label: &str,
    human_name: &str,
    extension: &str,
) -> String {
    format!(
        "{}{sep}{step_label}{sep}{human_name}.{extension}",
        captured_at.format(TIMESTAMP_FORMAT),
        sep = FIELD_SEPARATOR,
    )
}

fn strip_extension<'a>(filename: &'a str, extension: &str) -> Option<&'a str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    (ext.eq_ignore_ascii_case(extension) && !stem.is_empty()).then_some(stem)
}
