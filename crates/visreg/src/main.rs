//! # visreg
//!
//! Visual regression checks for mobile app screenshots.
//!
//! Exits with 0 when the command succeeded (or the comparison passed) and
//! with 1 when the comparison failed or a promotion was refused.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use visreg::{execute, Cli};
use visreg_compare::RegressionEngine;
use visreg_core::{Logger, VisregConfig};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => VisregConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => VisregConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.store.root = root.clone();
    }
    config.validate()?;

    // Initialize logging; RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    tracing::debug!(
        "visreg v{} using store {}",
        env!("CARGO_PKG_VERSION"),
        config.store.root.display()
    );

    let engine = RegressionEngine::new(&config, Logger::tracing());
    let mut stdout = io::stdout().lock();
    let passed = execute(&engine, &cli.command, cli.subject.as_ref(), &mut stdout).map_err(|e| {
        tracing::error!("{:#}", e);
        e
    })?;

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
