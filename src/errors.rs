//! Typed error hierarchy for the Wallace planner.
//!
//! Two top-level enums cover the two places where an operation may refuse
//! to proceed:
//! - `PlanError`: plan loading and saving; surfaced before any generation runs
//! - `SessionError`: misuse of the interactive stage lifecycle
//!
//! Structural anomalies during plan execution are not errors; they are
//! collected as warnings next to the generated text.

use std::path::PathBuf;
use thiserror::Error;

/// Hard failures while loading or saving a plan file.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read plan file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plan JSON at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Plan file at {path} is missing the required integer field N")]
    MissingWidth { path: PathBuf },

    #[error("Invalid width N = {n}: N must be at least 2")]
    InvalidWidth { n: usize },

    #[error("Width mismatch: requested N = {requested} but the plan declares N = {found}")]
    WidthMismatch { requested: usize, found: usize },

    #[error("Failed to write plan file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the interactive stage lifecycle.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No stage is open for editing")]
    NotEditing,

    #[error("Stage {stage} is still open; commit or discard it first")]
    AlreadyEditing { stage: String },

    #[error("Stage {name} not found")]
    UnknownStage { name: String },

    #[error("Reopening stage {stage} discards {discarded} later stage(s); confirmation required")]
    ConfirmationRequired { stage: String, discarded: usize },

    #[error("Stage {name} already exists")]
    DuplicateStage { name: String },

    #[error("Invalid batch placement: {0}")]
    InvalidBatch(String),

    #[error("Invalid width N = {n}: N must be at least 2")]
    InvalidWidth { n: usize },
}
