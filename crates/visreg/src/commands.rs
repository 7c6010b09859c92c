//! Command execution.
//!
//! Each command returns whether it succeeded in the harness sense: a failed
//! comparison or a refused promotion is `Ok(false)`, not an error.

use std::fs;
use std::io::Write;

use anyhow::{Context, Result};

use visreg_compare::RegressionEngine;
use visreg_core::{Error, Subject};

use crate::cli::Command;
use crate::schema::report_schema;

/// Run `command` for `subject`, writing user-facing output to `out`.
pub fn execute<W: Write>(
    engine: &RegressionEngine,
    command: &Command,
    subject: Option<&Subject>,
    out: &mut W,
) -> Result<bool> {
    if let Command::Schema = command {
        writeln!(out, "{}", serde_json::to_string_pretty(&report_schema())?)?;
        return Ok(true);
    }

    let subject = subject.context("a subject is required (--subject / -s)")?;

    match command {
        Command::Compare { json, html } => {
            tracing::info!("Comparing screenshots for {}", subject);
            let report = engine.compare(subject)?;
            if *json {
                writeln!(out, "{}", report.to_json()?)?;
            } else {
                write!(out, "{}", report.to_text())?;
            }
            if let Some(path) = html {
                fs::write(path, report.to_html())
                    .with_context(|| format!("writing HTML report to {}", path.display()))?;
            }
            Ok(report.is_pass())
        }

        Command::SetBase => {
            tracing::info!("Setting base screenshots for {}", subject);
            match engine.set_base(subject) {
                Ok(files) => {
                    writeln!(out, "Set {files} screenshot(s) as baseline for {subject}")?;
                    Ok(true)
                }
                Err(e @ (Error::GuardViolation { .. } | Error::NothingToPromote { .. })) => {
                    writeln!(out, "{e}")?;
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        }

        Command::ClearBase => {
            tracing::info!("Clearing base screenshots for {}", subject);
            engine.clear_base(subject)?;
            writeln!(out, "Cleared baseline for {subject}")?;
            Ok(true)
        }

        Command::ClearCur => {
            tracing::info!("Clearing current screenshots for {}", subject);
            engine.clear_current(subject)?;
            writeln!(out, "Cleared current screenshots for {subject}")?;
            Ok(true)
        }

        Command::List { role } => {
            let listed = engine.list(subject, *role)?;
            for (key, path) in &listed {
                writeln!(out, "{key}\t{}", path.display())?;
            }
            writeln!(out, "{} snapshot(s) in {subject}/{role}", listed.len())?;
            Ok(true)
        }

        Command::Schema => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visreg_core::{Logger, Role, StoreSettings, VisregConfig};

    fn engine(root: &std::path::Path) -> RegressionEngine {
        let config = VisregConfig {
            store: StoreSettings {
                root: root.to_path_buf(),
                ..StoreSettings::default()
            },
            ..VisregConfig::default()
        };
        RegressionEngine::new(&config, Logger::tracing())
    }

    fn run(engine: &RegressionEngine, command: Command, subject: &Subject) -> (bool, String) {
        let mut out = Vec::new();
        let ok = execute(engine, &command, Some(subject), &mut out).unwrap();
        (ok, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_missing_subject_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let mut out = Vec::new();
        let result = execute(&engine, &Command::SetBase, None, &mut out);
        assert!(result.is_err());
    }

    #[test]
    fn test_compare_without_baseline_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let subject = Subject::new("app").unwrap();

        let (ok, text) = run(
            &engine,
            Command::Compare {
                json: false,
                html: None,
            },
            &subject,
        );
        assert!(ok);
        assert!(text.contains("PASS"));
    }

    #[test]
    fn test_set_base_guard_reported_as_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let subject = Subject::new("app").unwrap();
        engine.capture(&subject, b"bytes", "01", "login").unwrap();

        let (ok, _) = run(&engine, Command::SetBase, &subject);
        assert!(ok);
        let (ok, text) = run(&engine, Command::SetBase, &subject);
        assert!(!ok);
        assert!(text.contains("already holds 1 file(s)"));
    }

    #[test]
    fn test_set_base_with_nothing_captured() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let subject = Subject::new("app").unwrap();

        let (ok, text) = run(&engine, Command::SetBase, &subject);
        assert!(!ok);
        assert!(text.contains("Nothing to promote"));
    }

    #[test]
    fn test_list_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let subject = Subject::new("app").unwrap();
        engine.capture(&subject, b"bytes", "01", "login").unwrap();

        let (ok, text) = run(&engine, Command::List { role: Role::Current }, &subject);
        assert!(ok);
        assert!(text.starts_with("01_login\t"));
        assert!(text.contains("1 snapshot(s) in app/cur"));

        let (ok, _) = run(&engine, Command::ClearCur, &subject);
        assert!(ok);
        let (_, text) = run(&engine, Command::List { role: Role::Current }, &subject);
        assert!(text.contains("0 snapshot(s)"));
    }

    #[test]
    fn test_compare_writes_html() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let subject = Subject::new("app").unwrap();
        let html = tmp.path().join("report.html");

        let (ok, text) = run(
            &engine,
            Command::Compare {
                json: true,
                html: Some(html.clone()),
            },
            &subject,
        );
        assert!(ok);
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["outcome"], "pass_with_bootstrap");
        assert!(fs::read_to_string(html).unwrap().contains("Visual Regression Report"));
    }

    #[test]
    fn test_schema_command() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let mut out = Vec::new();
        assert!(execute(&engine, &Command::Schema, None, &mut out).unwrap());
        let schema: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(schema["properties"]["outcome"].is_object());
    }
}
