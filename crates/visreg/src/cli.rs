//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use visreg_core::{Role, Subject};

/// Visual regression checks for mobile app screenshots.
#[derive(Debug, Parser)]
#[command(name = "visreg", version, about, long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "VISREG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Override the store root from the configuration
    #[arg(long, env = "VISREG_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Subject (e.g. application package name) to operate on
    #[arg(short, long, visible_alias = "app-package", short_alias = 'a', global = true)]
    pub subject: Option<Subject>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Operations on a subject's snapshot sets.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare the baseline and current sets
    Compare {
        /// Print the structured report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Also write an HTML report to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Promote the current set into an empty baseline
    SetBase,

    /// Delete the baseline set
    ClearBase,

    /// Delete the current set
    #[command(alias = "clear-current")]
    ClearCur,

    /// List the step keys of one set
    List {
        /// Set to list (base or cur)
        #[arg(long, default_value = "cur")]
        role: Role,
    },

    /// Print the JSON schema of the comparison report
    Schema,
}

impl Command {
    /// Whether the command operates on a subject.
    pub fn needs_subject(&self) -> bool {
        !matches!(self, Command::Schema)
    }
}
