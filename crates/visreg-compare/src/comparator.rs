//! Pairwise comparison of a subject's baseline and current sets.
//!
//! Snapshots are paired by [`StepKey`]. Every matched pair gets exactly one
//! verdict; a corrupt or mismatched pair never aborts the rest of the batch.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, ImageReader};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use visreg_core::{Bounds, Dimensions, Error, Logger, Result, Role, StepKey};
use visreg_store::{ScreenshotStore, SubjectPaths};

/// Outcome of comparing one matched pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Pixel-for-pixel equal
    Identical,
    /// Same size, some pixels differ
    Different {
        /// Smallest box covering every differing pixel
        bounds: Bounds,
        /// Number of differing pixels
        changed_pixels: u64,
    },
    /// Images have different dimensions
    SizeMismatch {
        /// Baseline image size
        baseline: Dimensions,
        /// Current image size
        current: Dimensions,
    },
    /// One of the files could not be read or decoded
    Error {
        /// What went wrong, including the offending path
        message: String,
    },
}

impl Verdict {
    /// Short name used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Identical => "identical",
            Verdict::Different { .. } => "different",
            Verdict::SizeMismatch { .. } => "size-mismatch",
            Verdict::Error { .. } => "error",
        }
    }

    /// Whether the pair matched exactly.
    pub fn is_identical(&self) -> bool {
        matches!(self, Verdict::Identical)
    }
}

/// Verdict for one step key present in both sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonResult {
    /// Pairing key
    pub key: StepKey,
    /// Baseline file
    pub baseline_path: PathBuf,
    /// Current file
    pub current_path: PathBuf,
    /// Outcome
    #[serde(flatten)]
    pub verdict: Verdict,
}

/// Why a subject could not be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotComparableReason {
    /// No baseline snapshots yet
    NoBaseline,
    /// No current snapshots
    NoCurrent,
    /// Neither set has snapshots
    BothEmpty,
    /// The baseline directory holds files but none parse as snapshots
    BaselineUnreadable,
}

impl NotComparableReason {
    /// Human-readable description.
    pub fn label(&self) -> &'static str {
        match self {
            NotComparableReason::NoBaseline => "no baseline",
            NotComparableReason::NoCurrent => "no current snapshots",
            NotComparableReason::BothEmpty => "both sets empty",
            NotComparableReason::BaselineUnreadable => "baseline holds no recognisable snapshots",
        }
    }
}

/// Whether a comparison actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// Both sets had snapshots and matched pairs were compared
    Compared,
    /// One side had no snapshots
    NotComparable {
        /// Which side, and why
        reason: NotComparableReason,
    },
}

/// Per-verdict counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VerdictCounts {
    /// Number of matched pairs
    pub total_compared: usize,
    /// Pairs that were identical
    pub identical: usize,
    /// Pairs with differing pixels
    pub different: usize,
    /// Pairs whose dimensions differ
    pub size_mismatch: usize,
    /// Pairs that could not be decoded
    pub error: usize,
}

impl VerdictCounts {
    fn record(&mut self, verdict: &Verdict) {
        self.total_compared += 1;
        match verdict {
            Verdict::Identical => self.identical += 1,
            Verdict::Different { .. } => self.different += 1,
            Verdict::SizeMismatch { .. } => self.size_mismatch += 1,
            Verdict::Error { .. } => self.error += 1,
        }
    }
}

/// Result of comparing a subject's two sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonSummary {
    /// Subject that was compared
    pub subject: String,
    /// Whether a comparison ran
    #[serde(flatten)]
    pub status: ComparisonStatus,
    /// Snapshots found in the baseline set
    pub baseline_count: usize,
    /// Snapshots found in the current set
    pub current_count: usize,
    /// Per-verdict counts
    pub counts: VerdictCounts,
    /// Keys whose pair was identical, sorted
    pub identical: Vec<StepKey>,
    /// Every non-identical result, sorted by key
    pub results: Vec<ComparisonResult>,
    /// Keys only in the baseline, sorted
    pub baseline_only: Vec<StepKey>,
    /// Keys only in the current set, sorted
    pub current_only: Vec<StepKey>,
}

impl ComparisonSummary {
    fn not_comparable(
        subject: &str,
        reason: NotComparableReason,
        baseline_count: usize,
        current_count: usize,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            status: ComparisonStatus::NotComparable { reason },
            baseline_count,
            current_count,
            counts: VerdictCounts::default(),
            identical: Vec::new(),
            results: Vec::new(),
            baseline_only: Vec::new(),
            current_only: Vec::new(),
        }
    }

    /// Whether the summary is `NotComparable`.
    pub fn is_not_comparable(&self) -> bool {
        matches!(self.status, ComparisonStatus::NotComparable { .. })
    }

    /// Whether the summary is a legitimate first-run or empty-run state, as
    /// opposed to a baseline that exists but cannot be read.
    pub fn is_bootstrap_state(&self) -> bool {
        matches!(
            self.status,
            ComparisonStatus::NotComparable { reason } if reason != NotComparableReason::BaselineUnreadable
        )
    }

    /// Non-identical keys, in order.
    pub fn non_identical_keys(&self) -> impl Iterator<Item = &StepKey> {
        self.results.iter().map(|r| &r.key)
    }

    /// Results carrying a particular verdict label.
    pub fn results_labelled<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = &'a ComparisonResult> + 'a {
        self.results.iter().filter(move |r| r.verdict.label() == label)
    }

    /// Whether any step key appears on only one side.
    pub fn has_unmatched(&self) -> bool {
        !self.baseline_only.is_empty() || !self.current_only.is_empty()
    }
}

/// Pairs and compares a subject's baseline and current sets.
#[derive(Debug, Clone)]
pub struct PairwiseComparator {
    store: ScreenshotStore,
    logger: Logger,
}

impl PairwiseComparator {
    /// Create a comparator reading from `store`.
    pub fn new(store: ScreenshotStore, logger: Logger) -> Self {
        Self {
            store,
            logger: logger.for_component("comparator"),
        }
    }

    /// Compare every step key present in both sets.
    ///
    /// Only listing failures are returned as errors; per-pair problems become
    /// verdicts.
    pub fn compare(&self, paths: &SubjectPaths) -> Result<ComparisonSummary> {
        let subject = paths.subject().as_str();
        let baseline = self.store.list(paths, Role::Baseline)?;
        let current = self.store.list(paths, Role::Current)?;

        // Files without snapshots are not a missing baseline.
        let unreadable_baseline =
            baseline.is_empty() && self.store.entry_count(paths, Role::Baseline)? > 0;

        let reason = match (baseline.is_empty(), current.is_empty()) {
            _ if unreadable_baseline => Some(NotComparableReason::BaselineUnreadable),
            (true, true) => Some(NotComparableReason::BothEmpty),
            (true, false) => Some(NotComparableReason::NoBaseline),
            (false, true) => Some(NotComparableReason::NoCurrent),
            (false, false) => None,
        };
        if unreadable_baseline {
            self.logger.warn(format!(
                "Baseline for {subject} has files but no snapshots matching *.{}: {}",
                paths.extension(),
                paths.dir(Role::Baseline).display()
            ));
        }
        if let Some(reason) = reason {
            self.logger.info(format!(
                "Nothing to compare for {subject}: baseline has {}, current has {} snapshot(s)",
                baseline.len(),
                current.len()
            ));
            return Ok(ComparisonSummary::not_comparable(
                subject,
                reason,
                baseline.len(),
                current.len(),
            ));
        }

        let baseline_keys: BTreeSet<&StepKey> = baseline.keys().collect();
        let current_keys: BTreeSet<&StepKey> = current.keys().collect();

        let mut summary = ComparisonSummary {
            subject: subject.to_string(),
            status: ComparisonStatus::Compared,
            baseline_count: baseline.len(),
            current_count: current.len(),
            counts: VerdictCounts::default(),
            identical: Vec::new(),
            results: Vec::new(),
            baseline_only: baseline_keys
                .difference(&current_keys)
                .map(|k| (*k).clone())
                .collect(),
            current_only: current_keys
                .difference(&baseline_keys)
                .map(|k| (*k).clone())
                .collect(),
        };

        let matched: Vec<&StepKey> = baseline_keys.intersection(&current_keys).copied().collect();
        self.logger
            .info(format!("Comparing {} screenshot pair(s)...", matched.len()));

        for key in matched {
            let baseline_path = &baseline[key];
            let current_path = &current[key];
            let verdict = compare_files(baseline_path, current_path);
            self.log_verdict(key, &verdict);

            summary.counts.record(&verdict);
            if verdict.is_identical() {
                summary.identical.push(key.clone());
            } else {
                summary.results.push(ComparisonResult {
                    key: key.clone(),
                    baseline_path: baseline_path.clone(),
                    current_path: current_path.clone(),
                    verdict,
                });
            }
        }

        for key in &summary.baseline_only {
            self.logger.warn(format!("Missing from current run: {key}"));
        }
        for key in &summary.current_only {
            self.logger.warn(format!("Not in baseline: {key}"));
        }

        let counts = &summary.counts;
        self.logger.info(format!(
            "Comparison summary: identical {}, different {}, size mismatch {}, errors {}, baseline only {}, current only {}",
            counts.identical,
            counts.different,
            counts.size_mismatch,
            counts.error,
            summary.baseline_only.len(),
            summary.current_only.len()
        ));

        Ok(summary)
    }

    fn log_verdict(&self, key: &StepKey, verdict: &Verdict) {
        match verdict {
            Verdict::Identical => self.logger.info(format!("{key} - identical")),
            Verdict::Different {
                bounds,
                changed_pixels,
            } => self.logger.warn(format!(
                "{key} - different: {changed_pixels} pixel(s) in {bounds}"
            )),
            Verdict::SizeMismatch { baseline, current } => self.logger.warn(format!(
                "{key} - size mismatch: baseline {baseline}, current {current}"
            )),
            Verdict::Error { message } => {
                self.logger.error(format!("{key} - error: {message}"))
            }
        }
    }
}

/// Decode both files and compare them.
pub fn compare_files(baseline: &Path, current: &Path) -> Verdict {
    match decode(baseline).and_then(|b| Ok((b, decode(current)?))) {
        Ok((baseline, current)) => compare_images(&baseline, &current),
        Err(e) => Verdict::Error {
            message: e.to_string(),
        },
    }
}

/// Exact pixel comparison of two decoded images.
pub fn compare_images(baseline: &DynamicImage, current: &DynamicImage) -> Verdict {
    let (bw, bh) = baseline.dimensions();
    let (cw, ch) = current.dimensions();
    if (bw, bh) != (cw, ch) {
        return Verdict::SizeMismatch {
            baseline: Dimensions::new(bw, bh),
            current: Dimensions::new(cw, ch),
        };
    }

    let region = if baseline.color() == current.color() {
        let channels = baseline.color().bytes_per_pixel() as usize;
        diff_region(baseline.as_bytes(), current.as_bytes(), bw, channels)
    } else {
        // 8-bit samples widen to 16-bit without loss.
        let baseline = baseline.to_rgba16();
        let current = current.to_rgba16();
        diff_region(baseline.as_raw(), current.as_raw(), bw, 4)
    };

    match region {
        None => Verdict::Identical,
        Some((bounds, changed_pixels)) => Verdict::Different {
            bounds,
            changed_pixels,
        },
    }
}

/// Bounding box and count of pixels whose samples differ.
fn diff_region<T: PartialEq>(
    a: &[T],
    b: &[T],
    width: u32,
    channels: usize,
) -> Option<(Bounds, u64)> {
    if width == 0 || channels == 0 {
        return None;
    }

    let mut bounds: Option<Bounds> = None;
    let mut changed = 0u64;
    let pixels = a.chunks_exact(channels).zip(b.chunks_exact(channels));
    for (index, (pa, pb)) in pixels.enumerate() {
        if pa == pb {
            continue;
        }
        let x = (index % width as usize) as u32;
        let y = (index / width as usize) as u32;
        changed += 1;
        bounds = Some(match bounds {
            Some(mut b) => {
                b.include(x, y);
                b
            }
            None => Bounds::pixel(x, y),
        });
    }
    bounds.map(|b| (b, changed))
}

fn decode(path: &Path) -> Result<DynamicImage> {
    let decode_error = |message: String| Error::ImageDecode {
        path: path.to_path_buf(),
        message,
    };
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_error(format!("cannot read file: {e}")))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))
}
