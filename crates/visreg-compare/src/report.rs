//! Final pass/fail report for the calling test harness.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use visreg_core::{Result, StepKey};

use crate::comparator::{
    ComparisonResult, ComparisonStatus, ComparisonSummary, NotComparableReason, Verdict,
};
use crate::lifecycle::AutoPromotion;

/// Final decision for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every matched pair was identical and nothing was unmatched
    Pass,
    /// No comparison was possible; the run may bootstrap a baseline
    PassWithBootstrap,
    /// Differences, errors, unmatched step keys, or an unreadable baseline
    Fail,
}

impl Outcome {
    /// Whether the harness should treat the run as passing.
    pub fn is_pass(&self) -> bool {
        !matches!(self, Outcome::Fail)
    }
}

/// Structured report handed to the harness as failure diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegressionReport {
    /// Subject that was compared
    pub subject: String,
    /// Final decision
    pub outcome: Outcome,
    /// Convenience copy of `outcome.is_pass()`
    pub passed: bool,
    /// Comparison details
    pub summary: ComparisonSummary,
    /// What auto-promotion did, when it ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<AutoPromotion>,
}

impl RegressionReport {
    /// Decide pass/fail for a summary.
    ///
    /// A comparable summary passes only with no different or errored pairs and
    /// no unmatched keys. Size mismatches count as differences.
    pub fn new(summary: ComparisonSummary) -> Self {
        let outcome = match summary.status {
            ComparisonStatus::NotComparable {
                reason: NotComparableReason::BaselineUnreadable,
            } => Outcome::Fail,
            ComparisonStatus::NotComparable { .. } => Outcome::PassWithBootstrap,
            ComparisonStatus::Compared => {
                let counts = &summary.counts;
                if counts.different == 0
                    && counts.size_mismatch == 0
                    && counts.error == 0
                    && !summary.has_unmatched()
                {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                }
            }
        };

        Self {
            subject: summary.subject.clone(),
            outcome,
            passed: outcome.is_pass(),
            summary,
            promotion: None,
        }
    }

    /// Attach the result of auto-promotion.
    pub fn with_promotion(mut self, promotion: AutoPromotion) -> Self {
        self.promotion = Some(promotion);
        self
    }

    /// Whether the run passed.
    pub fn is_pass(&self) -> bool {
        self.passed
    }

    /// Keys that make the run fail, in report order.
    pub fn offending_keys(&self) -> Vec<&StepKey> {
        self.summary
            .non_identical_keys()
            .chain(&self.summary.baseline_only)
            .chain(&self.summary.current_only)
            .collect()
    }

    /// One actionable line per problem.
    pub fn failure_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.summary.results.iter().map(describe).collect();
        if let ComparisonStatus::NotComparable {
            reason: NotComparableReason::BaselineUnreadable,
        } = self.summary.status
        {
            lines.push(
                "baseline directory holds files but no snapshots; clear it and set a new baseline"
                    .to_string(),
            );
        }
        lines.extend(
            self.summary
                .baseline_only
                .iter()
                .map(|key| format!("{key}: in baseline but not captured in this run")),
        );
        lines.extend(
            self.summary
                .current_only
                .iter()
                .map(|key| format!("{key}: captured in this run but missing from baseline")),
        );
        lines
    }

    /// Generate a human-readable summary.
    pub fn to_text(&self) -> String {
        let counts = &self.summary.counts;
        let mut out = String::new();

        let verdict = match self.outcome {
            Outcome::Pass => "PASS",
            Outcome::PassWithBootstrap => "PASS (no baseline to compare against)",
            Outcome::Fail => "FAIL",
        };
        out.push_str(&format!("Visual regression for {}: {verdict}\n", self.subject));

        match self.summary.status {
            ComparisonStatus::NotComparable { reason } => {
                out.push_str(&format!(
                    "  Not comparable ({}): baseline {}, current {}\n",
                    reason.label(),
                    self.summary.baseline_count,
                    self.summary.current_count
                ));
            }
            ComparisonStatus::Compared => {
                out.push_str(&format!(
                    "  Compared {}: identical {}, different {}, size mismatch {}, errors {}\n",
                    counts.total_compared,
                    counts.identical,
                    counts.different,
                    counts.size_mismatch,
                    counts.error
                ));
                out.push_str(&format!(
                    "  Unmatched: baseline only {}, current only {}\n",
                    self.summary.baseline_only.len(),
                    self.summary.current_only.len()
                ));
            }
        }

        for line in self.failure_lines() {
            out.push_str(&format!("  - {line}\n"));
        }

        match self.promotion {
            Some(AutoPromotion::Promoted { files }) => {
                out.push_str(&format!("  Baseline bootstrapped with {files} file(s)\n"));
            }
            Some(AutoPromotion::Skipped { .. }) | None => {}
        }

        out
    }

    /// Serialize the structured report.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generate a standalone HTML report.
    pub fn to_html(&self) -> String {
        let counts = &self.summary.counts;
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str(&format!(
            "<title>Visual Regression Report - {}</title>\n",
            escape(&self.subject)
        ));
        html.push_str("<style>\n");
        html.push_str("body { font-family: sans-serif; margin: 20px; }\n");
        html.push_str(".pass { color: #155724; }\n");
        html.push_str(".fail { color: #721c24; }\n");
        html.push_str(".different { background-color: #f8d7da; }\n");
        html.push_str(".unmatched { background-color: #fff3cd; }\n");
        html.push_str(".section { margin: 20px 0; padding: 10px; border: 1px solid #ddd; }\n");
        html.push_str("h2 { margin-top: 0; }\n");
        html.push_str("table { border-collapse: collapse; width: 100%; }\n");
        html.push_str("th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n");
        html.push_str("th { background-color: #f5f5f5; }\n");
        html.push_str("</style>\n</head>\n<body>\n");

        html.push_str("<h1>Visual Regression Report</h1>\n");
        html.push_str(&format!(
            "<p><strong>Subject:</strong> {}</p>\n",
            escape(&self.subject)
        ));
        let class = if self.passed { "pass" } else { "fail" };
        html.push_str(&format!(
            "<p class=\"{class}\"><strong>Outcome:</strong> {}</p>\n",
            escape(self.to_text().lines().next().unwrap_or_default())
        ));

        // Stats
        html.push_str("<div class=\"section\">\n");
        html.push_str("<h2>Statistics</h2>\n");
        html.push_str("<table>\n");
        for (label, value) in [
            ("Baseline snapshots", self.summary.baseline_count),
            ("Current snapshots", self.summary.current_count),
            ("Compared", counts.total_compared),
            ("Identical", counts.identical),
            ("Different", counts.different),
            ("Size mismatch", counts.size_mismatch),
            ("Errors", counts.error),
            ("Baseline only", self.summary.baseline_only.len()),
            ("Current only", self.summary.current_only.len()),
        ] {
            html.push_str(&format!("<tr><td>{label}</td><td>{value}</td></tr>\n"));
        }
        html.push_str("</table>\n</div>\n");

        // Non-identical pairs
        if !self.summary.results.is_empty() {
            html.push_str("<div class=\"section different\">\n");
            html.push_str("<h2>Non-identical Screenshots</h2>\n");
            html.push_str(&Self::results_table(&self.summary.results));
            html.push_str("</div>\n");
        }

        // Unmatched keys
        for (title, keys) in [
            ("Missing From This Run", &self.summary.baseline_only),
            ("Missing From Baseline", &self.summary.current_only),
        ] {
            if keys.is_empty() {
                continue;
            }
            html.push_str("<div class=\"section unmatched\">\n");
            html.push_str(&format!("<h2>{title}</h2>\n<ul>\n"));
            for key in keys {
                html.push_str(&format!("<li>{}</li>\n", escape(key.as_str())));
            }
            html.push_str("</ul>\n</div>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn results_table(results: &[ComparisonResult]) -> String {
        let mut html = String::new();
        html.push_str("<table>\n");
        html.push_str("<tr><th>Step</th><th>Verdict</th><th>Detail</th><th>Current file</th></tr>\n");
        for result in results {
            let detail = match &result.verdict {
                Verdict::Identical => String::new(),
                Verdict::Different {
                    bounds,
                    changed_pixels,
                } => format!("{changed_pixels} pixel(s) in {bounds}"),
                Verdict::SizeMismatch { baseline, current } => {
                    format!("baseline {baseline}, current {current}")
                }
                Verdict::Error { message } => message.clone(),
            };
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(result.key.as_str()),
                result.verdict.label(),
                escape(&detail),
                escape(&result.current_path.display().to_string())
            ));
        }
        html.push_str("</table>\n");
        html
    }
}

fn describe(result: &ComparisonResult) -> String {
    let key = &result.key;
    match &result.verdict {
        Verdict::Identical => format!("{key}: identical"),
        Verdict::Different {
            bounds,
            changed_pixels,
        } => format!("{key}: different, {changed_pixels} pixel(s) changed in {bounds}"),
        Verdict::SizeMismatch { baseline, current } => {
            format!("{key}: size mismatch, baseline {baseline} vs current {current}")
        }
        Verdict::Error { message } => format!("{key}: error, {message}"),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::VerdictCounts;
    use crate::lifecycle::SkipReason;
    use std::path::PathBuf;
    use visreg_core::{Bounds, Dimensions};

    fn summary(results: Vec<ComparisonResult>, identical: usize) -> ComparisonSummary {
        let mut counts = VerdictCounts {
            total_compared: results.len() + identical,
            identical,
            ..VerdictCounts::default()
        };
        for r in &results {
            match r.verdict {
                Verdict::Different { .. } => counts.different += 1,
                Verdict::SizeMismatch { .. } => counts.size_mismatch += 1,
                Verdict::Error { .. } => counts.error += 1,
                Verdict::Identical => {}
            }
        }
        ComparisonSummary {
            subject: "com.example.app".to_string(),
            status: ComparisonStatus::Compared,
            baseline_count: counts.total_compared,
            current_count: counts.total_compared,
            counts,
            identical: (0..identical)
                .map(|i| StepKey::new(&format!("{i:02}"), "same"))
                .collect(),
            results,
            baseline_only: Vec::new(),
            current_only: Vec::new(),
        }
    }

    fn result(step: &str, name: &str, verdict: Verdict) -> ComparisonResult {
        ComparisonResult {
            key: StepKey::new(step, name),
            baseline_path: PathBuf::from(format!("base/{step}_{name}.png")),
            current_path: PathBuf::from(format!("cur/{step}_{name}.png")),
            verdict,
        }
    }

    #[test]
    fn test_all_identical_passes() {
        let report = RegressionReport::new(summary(Vec::new(), 3));
        assert_eq!(report.outcome, Outcome::Pass);
        assert!(report.is_pass());
        assert!(report.failure_lines().is_empty());
        assert!(report.offending_keys().is_empty());
    }

    #[test]
    fn test_difference_fails_with_actionable_line() {
        let report = RegressionReport::new(summary(
            vec![result(
                "02",
                "home",
                Verdict::Different {
                    bounds: Bounds::new(10, 20, 5, 5),
                    changed_pixels: 12,
                },
            )],
            1,
        ));
        assert_eq!(report.outcome, Outcome::Fail);
        assert_eq!(report.offending_keys(), vec![&StepKey::new("02", "home")]);
        assert_eq!(
            report.failure_lines(),
            vec!["02_home: different, 12 pixel(s) changed in (10,20) 5x5".to_string()]
        );
        assert!(report.to_text().contains("FAIL"));
    }

    #[test]
    fn test_size_mismatch_and_error_fail() {
        for verdict in [
            Verdict::SizeMismatch {
                baseline: Dimensions::new(10, 10),
                current: Dimensions::new(10, 11),
            },
            Verdict::Error {
                message: "cannot decode cur/03_x.png".to_string(),
            },
        ] {
            let report = RegressionReport::new(summary(vec![result("03", "x", verdict)], 0));
            assert!(!report.is_pass());
        }
    }

    #[test]
    fn test_unmatched_keys_fail() {
        let mut s = summary(Vec::new(), 2);
        s.current_only = vec![StepKey::new("03", "extra")];
        let report = RegressionReport::new(s);
        assert_eq!(report.outcome, Outcome::Fail);
        assert_eq!(
            report.failure_lines(),
            vec!["03_extra: captured in this run but missing from baseline".to_string()]
        );
    }

    #[test]
    fn test_not_comparable_is_pass_with_bootstrap() {
        let mut s = summary(Vec::new(), 0);
        s.status = ComparisonStatus::NotComparable {
            reason: NotComparableReason::NoBaseline,
        };
        let report =
            RegressionReport::new(s).with_promotion(AutoPromotion::Promoted { files: 4 });
        assert_eq!(report.outcome, Outcome::PassWithBootstrap);
        assert!(report.is_pass());
        let text = report.to_text();
        assert!(text.contains("Not comparable (no baseline)"));
        assert!(text.contains("bootstrapped with 4"));
    }

    #[test]
    fn test_unreadable_baseline_fails() {
        let mut s = summary(Vec::new(), 0);
        s.status = ComparisonStatus::NotComparable {
            reason: NotComparableReason::BaselineUnreadable,
        };
        let report = RegressionReport::new(s);
        assert_eq!(report.outcome, Outcome::Fail);
        assert!(!report.is_pass());
        assert!(report.offending_keys().is_empty());
        let text = report.to_text();
        assert!(text.contains("FAIL"));
        assert!(text.contains("baseline holds no recognisable snapshots"));
        assert!(text.contains("clear it and set a new baseline"));
    }

    #[test]
    fn test_json_report_structure() {
        let report = RegressionReport::new(summary(
            vec![result(
                "02",
                "home",
                Verdict::Different {
                    bounds: Bounds::pixel(1, 1),
                    changed_pixels: 1,
                },
            )],
            1,
        ))
        .with_promotion(AutoPromotion::Skipped {
            reason: SkipReason::BaselineExists,
        });

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["outcome"], "fail");
        assert_eq!(json["passed"], false);
        assert_eq!(json["summary"]["status"], "compared");
        assert_eq!(json["summary"]["counts"]["different"], 1);
        assert_eq!(json["summary"]["results"][0]["key"], "02_home");
        assert_eq!(json["summary"]["results"][0]["verdict"], "different");
        assert_eq!(json["promotion"]["promotion"], "skipped");

        let back: RegressionReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_html_report() {
        let mut s = summary(
            vec![result(
                "02",
                "home<script>",
                Verdict::Different {
                    bounds: Bounds::pixel(0, 0),
                    changed_pixels: 1,
                },
            )],
            0,
        );
        s.baseline_only = vec![StepKey::new("04", "gone")];
        let html = RegressionReport::new(s).to_html();

        assert!(html.contains("Visual Regression Report"));
        assert!(html.contains("Non-identical Screenshots"));
        assert!(html.contains("Missing From This Run"));
        assert!(html.contains("04_gone"));
        assert!(html.contains("home&lt;script&gt;"));
        assert!(!html.contains("home<script>"));
    }
}
