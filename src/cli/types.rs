//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::audit::AuditArgs;
use super::commands::evaluate::EvaluateArgs;
use super::commands::profiles::ProfilesArgs;

#[derive(Parser, Debug)]
#[command(name = "loadgate")]
#[command(about = "Loadgate - cognitive-load admission control", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (replaces the .loadgate/ hierarchy and LOADGATE_* overrides)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate JSON-lines work units and report admission verdicts
    Evaluate(EvaluateArgs),

    /// List configured weight profiles
    Profiles(ProfilesArgs),

    /// Audit a JSON/YAML document against the 7±2 rule
    Audit(AuditArgs),
}
