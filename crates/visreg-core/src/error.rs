//! Error types for the visreg engine.
//!
//! `NotComparable` and size mismatches are deliberately absent: the first is a
//! summary status and the second a comparison verdict.

use std::path::PathBuf;

use thiserror::Error;

use crate::subject::Role;

/// Main error type for visreg operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while touching a snapshot set
    #[error("Store I/O error for {subject}/{role} at {}: {source}", path.display())]
    StoreIo {
        /// Subject the operation targeted
        subject: String,
        /// Role of the snapshot set
        role: Role,
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file could not be decoded as an image
    #[error("Image decode error at {}: {message}", path.display())]
    ImageDecode {
        /// Offending file
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// Promotion attempted onto a non-empty baseline
    #[error("Baseline for {subject} already holds {existing} file(s); clear it before promoting")]
    GuardViolation {
        /// Subject whose baseline is established
        subject: String,
        /// Number of files already in the baseline
        existing: usize,
    },

    /// Promotion attempted with an empty current set
    #[error("Nothing to promote: current set for {subject} is empty")]
    NothingToPromote {
        /// Subject with no current snapshots
        subject: String,
    },

    /// Staged copy did not contain every current file
    #[error("Promotion incomplete: staged {copied} of {expected} file(s)")]
    PromotionIncomplete {
        /// Files in the current set
        expected: usize,
        /// Files found in the staging directory
        copied: usize,
    },

    /// Subject identifier is not a single safe path component
    #[error("Invalid subject: {0:?}")]
    InvalidSubject(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::StoreIo`] with subject/role/path context.
    pub fn store_io(
        subject: impl Into<String>,
        role: Role,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::StoreIo {
            subject: subject.into(),
            role,
            path: path.into(),
            source,
        }
    }

    /// Whether this is a refused promotion rather than a failure.
    pub fn is_guard_violation(&self) -> bool {
        matches!(self, Error::GuardViolation { .. })
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_io_error_carries_context() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::store_io("com.example", Role::Current, "/tmp/x/cur", io_err);
        let display = err.to_string();
        assert!(display.contains("com.example/cur"));
        assert!(display.contains("/tmp/x/cur"));
        assert!(display.contains("denied"));
    }

    #[test]
    fn test_guard_violation_error() {
        let err = Error::GuardViolation {
            subject: "com.example".to_string(),
            existing: 3,
        };
        assert!(err.is_guard_violation());
        assert_eq!(
            err.to_string(),
            "Baseline for com.example already holds 3 file(s); clear it before promoting"
        );
    }

    #[test]
    fn test_nothing_to_promote_error() {
        let err = Error::NothingToPromote {
            subject: "app".to_string(),
        };
        assert!(!err.is_guard_violation());
        assert_eq!(err.to_string(), "Nothing to promote: current set for app is empty");
    }

    #[test]
    fn test_promotion_incomplete_error() {
        let err = Error::PromotionIncomplete {
            expected: 4,
            copied: 2,
        };
        assert_eq!(err.to_string(), "Promotion incomplete: staged 2 of 4 file(s)");
    }

    #[test]
    fn test_invalid_subject_error() {
        let err = Error::InvalidSubject("../etc".to_string());
        assert_eq!(err.to_string(), "Invalid subject: \"../etc\"");
    }

    #[test]
    fn test_image_decode_error() {
        let err = Error::ImageDecode {
            path: PathBuf::from("cur/broken.png"),
            message: "unexpected EOF".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Image decode error at cur/broken.png: unexpected EOF"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
