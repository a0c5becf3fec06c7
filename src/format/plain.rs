//! Plain text output with ASCII bar charts

use anyhow::Result;
use std::io::Write;

use super::{FilterContext, Formatter, truncate_label};
use crate::core::{Aggregate, ClientSummary, Dataset, FrequencyTable, Schema, SurveyError};

pub struct PlainFormatter {
    /// Width of the longest bar in characters
    pub bar_width: usize,
    /// Longest option label before truncation
    pub label_width: usize,
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self {
            bar_width: 30,
            label_width: 40,
        }
    }
}

impl PlainFormatter {
    fn write_filter_line(&self, output: &mut dyn Write, context: FilterContext) -> Result<()> {
        writeln!(
            output,
            "Showing {} responses (filtered from {} total). Filters: {}",
            context.matching,
            context.total,
            context.describe()
        )?;
        Ok(())
    }

    fn write_frequency_table(&self, output: &mut dyn Write, table: &FrequencyTable) -> Result<()> {
        let rows = match table.rows() {
            Ok(rows) => rows,
            Err(SurveyError::EmptyResult) => {
                writeln!(output, "  (no data)")?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let max = rows.iter().map(|r| r.count).max().unwrap_or(0).max(1);
        let labels: Vec<String> = rows
            .iter()
            .map(|r| truncate_label(&r.option, self.label_width))
            .collect();
        let pad = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        for (row, label) in rows.iter().zip(&labels) {
            let filled = (row.count * self.bar_width).div_ceil(max);
            writeln!(
                output,
                "  {:<pad$}  {:<width$}  {} ({:.1}%)",
                label,
                "#".repeat(filled),
                row.count,
                row.percentage,
                pad = pad,
                width = self.bar_width
            )?;
        }
        Ok(())
    }
}

impl Formatter for PlainFormatter {
    fn write_summary(
        &mut self,
        output: &mut dyn Write,
        dataset: &Dataset,
        clients: &[ClientSummary],
    ) -> Result<()> {
        writeln!(output, "Survey data loaded {}", dataset.loaded_at.format("%Y-%m-%d %H:%M"))?;
        writeln!(
            output,
            "Clients: {}  Responses: {}  Columns: {}",
            dataset.report.client_count(),
            dataset.table.len(),
            dataset.table.columns().len()
        )?;
        writeln!(output)?;
        writeln!(output, "Loaded files:")?;
        for file in &dataset.report.loaded {
            writeln!(output, "  - {} [{}]: {} responses", file.file_name, file.client, file.rows)?;
        }
        if !dataset.report.failures.is_empty() {
            writeln!(output)?;
            writeln!(output, "Skipped files:")?;
            for failure in &dataset.report.failures {
                writeln!(output, "  - {}", failure.reason)?;
            }
        }
        writeln!(output)?;
        writeln!(output, "Responses by client:")?;
        for summary in clients {
            writeln!(output, "  {}: {}", summary.client, summary.responses)?;
        }
        Ok(())
    }

    fn write_questions(
        &mut self,
        output: &mut dyn Write,
        schema: &Schema,
        questions: &[&str],
    ) -> Result<()> {
        writeln!(output, "Questions:")?;
        for (i, question) in questions.iter().enumerate() {
            let kind = schema
                .kind(question)
                .map(|k| k.label())
                .unwrap_or("unknown");
            writeln!(output, "  {:>3}. [{}] {}", i + 1, kind, question)?;
        }
        let demographics = schema.demographics();
        if !demographics.is_empty() {
            writeln!(output)?;
            writeln!(output, "Demographics:")?;
            for name in demographics {
                writeln!(output, "  - {}", name)?;
            }
        }
        Ok(())
    }

    fn write_analysis(
        &mut self,
        output: &mut dyn Write,
        context: FilterContext,
        aggregate: &Aggregate,
    ) -> Result<()> {
        writeln!(output, "Analysis: {}", aggregate.question())?;
        self.write_filter_line(output, context)?;
        writeln!(output)?;

        match aggregate {
            Aggregate::Frequencies(table) => {
                writeln!(
                    output,
                    "{} question, {} respondents, {} selections",
                    table.kind,
                    table.respondents,
                    table.total_selections()
                )?;
                self.write_frequency_table(output, table)?;
            }
            Aggregate::Responses(list) => {
                writeln!(output, "free-response question, {} responses", list.count())?;
                if list.responses.is_empty() {
                    writeln!(output, "  (no data)")?;
                }
                for (i, response) in list.responses.iter().enumerate() {
                    writeln!(output, "  {:>3}. {}", i + 1, response)?;
                }
            }
        }
        Ok(())
    }

    fn write_demographics(
        &mut self,
        output: &mut dyn Write,
        context: FilterContext,
        tables: &[FrequencyTable],
    ) -> Result<()> {
        writeln!(output, "Demographic breakdown")?;
        self.write_filter_line(output, context)?;
        if tables.is_empty() {
            writeln!(output, "  (no demographic columns found)")?;
        }
        for table in tables {
            writeln!(output)?;
            writeln!(output, "{}", table.question)?;
            self.write_frequency_table(output, table)?;
            writeln!(
                output,
                "  Unique values: {} | Responses: {}",
                table.options.len(),
                table.respondents
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnKind, FilterPredicate};
    use std::collections::HashMap;

    #[test]
    fn test_bar_chart_output() {
        let counts = HashMap::from([("Yes".to_string(), 3), ("No".to_string(), 1)]);
        let table = FrequencyTable::from_counts("Use AI?", ColumnKind::SingleSelect, counts, 4);
        let predicate = FilterPredicate::new();
        let context = FilterContext {
            predicate: &predicate,
            matching: 4,
            total: 10,
        };

        let mut output = Vec::new();
        PlainFormatter::default()
            .write_analysis(&mut output, context, &Aggregate::Frequencies(table))
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Showing 4 responses (filtered from 10 total)"));
        assert!(text.contains(&format!("Yes  {}  3 (75.0%)", "#".repeat(30))));
        assert!(text.contains("1 (25.0%)"));
    }

    #[test]
    fn test_empty_table_prints_no_data() {
        let table =
            FrequencyTable::from_counts("Use AI?", ColumnKind::SingleSelect, HashMap::new(), 0);
        let predicate = FilterPredicate::new().with_clients(["Nobody"]);
        let context = FilterContext {
            predicate: &predicate,
            matching: 0,
            total: 10,
        };

        let mut output = Vec::new();
        PlainFormatter::default()
            .write_analysis(&mut output, context, &Aggregate::Frequencies(table))
            .unwrap();
        assert!(String::from_utf8(output).unwrap().contains("(no data)"));
    }
}
