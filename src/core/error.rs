use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, filtering or aggregating survey data.
///
/// None of these are fatal to a session: per-file failures are collected in the
/// load report and everything else is surfaced to the user at the interaction
/// boundary.
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("{file}: {reason}")]
    FileFormat { file: String, reason: String },
    #[error("could not read workbook {file}: {reason}")]
    Workbook { file: String, reason: String },
    #[error("question not found: '{0}'")]
    ColumnNotFound(String),
    #[error("no responses match the current filters")]
    EmptyResult,
    #[error("data folder '{}' not found", .0.display())]
    DataDirMissing(PathBuf),
    #[error("no Excel files found in '{}'", .0.display())]
    NoSpreadsheets(PathBuf),
    #[error("no survey data loaded")]
    NotLoaded,
    #[error("could not load any of the {0} survey files")]
    NothingLoaded(usize),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type SurveyResult<T> = Result<T, SurveyError>;
