//! Report formats for surveyscope

pub mod csv;
pub mod json;
pub mod markdown;
pub mod plain;

use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::core::{Aggregate, CLIENT_COLUMN, ClientSummary, Dataset, FilterPredicate, FrequencyTable, Schema};

/// Filter state printed above every report.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub predicate: &'a FilterPredicate,
    /// Rows left after filtering
    pub matching: usize,
    /// Rows in the combined table
    pub total: usize,
}

impl FilterContext<'_> {
    /// One-line description such as `Client in [Acme]; Region in [EMEA]`.
    pub fn describe(&self) -> String {
        describe_predicate(self.predicate)
    }
}

pub fn describe_predicate(predicate: &FilterPredicate) -> String {
    if predicate.is_empty() {
        return "none".to_string();
    }
    let mut parts = Vec::new();
    if let Some(clients) = predicate.values_for(CLIENT_COLUMN) {
        parts.push(format!(
            "{} in [{}]",
            CLIENT_COLUMN,
            clients.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    for (column, values) in predicate.fields() {
        parts.push(format!(
            "{} in [{}]",
            column,
            values.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    parts.join("; ")
}

pub trait Formatter {
    fn write_summary(
        &mut self,
        output: &mut dyn Write,
        dataset: &Dataset,
        clients: &[ClientSummary],
    ) -> Result<()>;

    fn write_questions(
        &mut self,
        output: &mut dyn Write,
        schema: &Schema,
        questions: &[&str],
    ) -> Result<()>;

    fn write_analysis(
        &mut self,
        output: &mut dyn Write,
        context: FilterContext,
        aggregate: &Aggregate,
    ) -> Result<()>;

    fn write_demographics(
        &mut self,
        output: &mut dyn Write,
        context: FilterContext,
        tables: &[FrequencyTable],
    ) -> Result<()>;
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Plain => Box::new(plain::PlainFormatter::default()),
        OutputFormat::Markdown => Box::new(markdown::MarkdownFormatter),
        OutputFormat::Json => Box::new(json::JsonFormatter),
        OutputFormat::Csv => Box::new(csv::CsvFormatter),
    }
}

/// Shortens long question text for titles and chart labels.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Short", 10), "Short");
        assert_eq!(
            truncate_label("Which of these tools do you use", 12),
            "Which of..."
        );
    }

    #[test]
    fn test_describe_predicate() {
        assert_eq!(describe_predicate(&FilterPredicate::new()), "none");
        let predicate = FilterPredicate::new()
            .with_clients(["Globex", "Acme"])
            .with_equals("Region", "EMEA");
        assert_eq!(
            describe_predicate(&predicate),
            "Client in [Acme, Globex]; Region in [EMEA]"
        );
    }
}
