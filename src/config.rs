use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::SurveyError;

/// Output format for rendered reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Markdown,
    Json,
    Csv,
}

/// Tunable thresholds for column classification.
///
/// The ratios are heuristics; they are exposed here so a survey with unusual
/// answer shapes can be handled from `surveyscope.toml` without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Case-insensitive substrings that mark a column as demographic
    pub demographic_keywords: Vec<String>,
    /// Header phrases that force a column to multi-select
    pub multi_select_hints: Vec<String>,
    /// Header phrases that force a column to free-response
    pub free_response_hints: Vec<String>,
    /// Maximum number of non-empty cells inspected per column
    pub sample_size: usize,
    /// Share of sampled cells that must hold a delimited option list
    pub multi_select_ratio: f64,
    /// Longest text (in characters) still treated as an answer option
    pub max_option_length: usize,
    /// Distinct/answered ratio at or below which a column is single-select
    pub single_select_unique_ratio: f64,
    /// Short-answer columns with at most this many distinct values are single-select
    pub single_select_max_options: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let keywords = [
            "department",
            "function",
            "office",
            "level",
            "country",
            "region",
            "agency",
            "network",
            "tenure",
            "role",
            "industry",
            "seniority",
            "location",
            "team",
        ];

        Self {
            demographic_keywords: keywords.into_iter().map(String::from).collect(),
            multi_select_hints: vec!["select all that apply".to_string()],
            free_response_hints: vec!["[free response]".to_string()],
            sample_size: 500,
            multi_select_ratio: 0.3,
            max_option_length: 60,
            single_select_unique_ratio: 0.5,
            single_select_max_options: 15,
        }
    }
}

/// Main configuration for surveyscope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Folder holding the client survey workbooks
    pub data_dir: PathBuf,
    /// Worksheet every workbook must contain
    pub sheet_name: String,
    /// Zero-based sheet row holding the question headers
    pub header_row: usize,
    /// Descend into sub-folders of `data_dir`
    pub recursive: bool,
    /// Glob patterns of files to skip (e.g. "~$*" for Excel lock files)
    pub ignore_patterns: Vec<String>,
    /// Report destination; stdout when unset
    pub output: Option<PathBuf>,
    /// Report format (plain, markdown, json, csv)
    pub output_format: OutputFormat,
    /// Enable debug logging
    pub verbose: bool,
    /// Number of options shown per demographic breakdown
    pub top_n: usize,
    /// Identifier columns kept in the table but never offered as questions
    pub excluded_columns: Vec<String>,
    pub classifier: ClassifierConfig,
}

impl SurveyConfig {
    /// Validates the configuration, ensuring the data folder exists and the
    /// classifier thresholds are usable.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.data_dir.is_dir() {
            return Err(SurveyError::DataDirMissing(self.data_dir.clone()).into());
        }
        let c = &self.classifier;
        for (name, ratio) in [
            ("multi_select_ratio", c.multi_select_ratio),
            ("single_select_unique_ratio", c.single_select_unique_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(SurveyError::Configuration(format!(
                    "{} must be within (0, 1], got {}",
                    name, ratio
                ))
                .into());
            }
        }
        if c.sample_size == 0 {
            anyhow::bail!(SurveyError::Configuration(
                "sample_size must be at least 1".to_string()
            ));
        }
        Ok(())
    }

    /// Attempts to load configuration from `surveyscope.toml` in the current directory.
    pub fn load_from_file() -> Option<Self> {
        std::fs::read_to_string("surveyscope.toml")
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
    }

    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded_columns.iter().any(|c| c == column)
    }
}

impl Default for SurveyConfig {
    fn default() -> Self {
        let excluded = [
            "Participant ID",
            "Participant Identifier",
            "Email Address",
            "Email Address:",
        ];

        Self {
            data_dir: PathBuf::from("data"),
            sheet_name: "Raw Data".to_string(),
            header_row: 0,
            recursive: false,
            ignore_patterns: vec!["~$*".to_string()],
            output: None,
            output_format: OutputFormat::Plain,
            verbose: false,
            top_n: 10,
            excluded_columns: excluded.into_iter().map(String::from).collect(),
            classifier: ClassifierConfig::default(),
        }
    }
}
