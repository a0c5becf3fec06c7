//! Markdown output format for surveyscope

use anyhow::Result;
use std::io::Write;

use super::{FilterContext, Formatter};
use crate::core::{Aggregate, ClientSummary, Dataset, FrequencyTable, Schema, SurveyError};

pub struct MarkdownFormatter;

/// Pipes and line breaks would break a table row.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn write_filters(output: &mut dyn Write, context: FilterContext) -> Result<()> {
    writeln!(
        output,
        "> Showing **{}** responses (filtered from {} total). Filters: {}",
        context.matching,
        context.total,
        context.describe()
    )?;
    writeln!(output)?;
    Ok(())
}

fn write_frequency_table(output: &mut dyn Write, table: &FrequencyTable) -> Result<()> {
    let rows = match table.rows() {
        Ok(rows) => rows,
        Err(SurveyError::EmptyResult) => {
            writeln!(output, "*No data for the current filters.*")?;
            writeln!(output)?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    writeln!(output, "| Option | Count | Percentage |")?;
    writeln!(output, "|--------|------:|-----------:|")?;
    for row in rows {
        writeln!(
            output,
            "| {} | {} | {:.1}% |",
            cell(&row.option),
            row.count,
            row.percentage
        )?;
    }
    writeln!(output)?;
    Ok(())
}

impl Formatter for MarkdownFormatter {
    fn write_summary(
        &mut self,
        output: &mut dyn Write,
        dataset: &Dataset,
        clients: &[ClientSummary],
    ) -> Result<()> {
        writeln!(output, "# Survey Data")?;
        writeln!(output)?;
        writeln!(
            output,
            "*Loaded {}: {} clients, {} responses.*",
            dataset.loaded_at.format("%Y-%m-%d %H:%M"),
            dataset.report.client_count(),
            dataset.table.len()
        )?;
        writeln!(output)?;

        writeln!(output, "## Loaded Files")?;
        writeln!(output, "| File | Client | Responses |")?;
        writeln!(output, "|------|--------|----------:|")?;
        for file in &dataset.report.loaded {
            writeln!(
                output,
                "| {} | {} | {} |",
                cell(&file.file_name),
                cell(&file.client),
                file.rows
            )?;
        }
        writeln!(output)?;

        if !dataset.report.failures.is_empty() {
            writeln!(output, "## Skipped Files")?;
            for failure in &dataset.report.failures {
                writeln!(output, "- {}", failure.reason)?;
            }
            writeln!(output)?;
        }

        writeln!(output, "## Responses by Client")?;
        writeln!(output, "| Client | Total Responses |")?;
        writeln!(output, "|--------|----------------:|")?;
        for summary in clients {
            writeln!(output, "| {} | {} |", cell(&summary.client), summary.responses)?;
        }
        Ok(())
    }

    fn write_questions(
        &mut self,
        output: &mut dyn Write,
        schema: &Schema,
        questions: &[&str],
    ) -> Result<()> {
        writeln!(output, "## Questions")?;
        writeln!(output, "| # | Type | Question | Answered |")?;
        writeln!(output, "|--:|------|----------|---------:|")?;
        for (i, question) in questions.iter().enumerate() {
            let (kind, answered) = schema
                .get(question)
                .map(|c| (c.kind.label(), c.answered))
                .unwrap_or(("unknown", 0));
            writeln!(output, "| {} | {} | {} | {} |", i + 1, kind, cell(question), answered)?;
        }
        writeln!(output)?;

        let demographics = schema.demographics();
        if !demographics.is_empty() {
            writeln!(output, "## Demographics")?;
            for name in demographics {
                writeln!(output, "- {}", name)?;
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
        writeln!(output, "## Analysis: {}", aggregate.question())?;
        writeln!(output)?;
        write_filters(output, context)?;

        match aggregate {
            Aggregate::Frequencies(table) => {
                writeln!(
                    output,
                    "*{} question, {} respondents.*",
                    table.kind, table.respondents
                )?;
                writeln!(output)?;
                write_frequency_table(output, table)?;
            }
            Aggregate::Responses(list) => {
                writeln!(output, "*Free response question, {} responses.*", list.count())?;
                writeln!(output)?;
                for (i, response) in list.responses.iter().enumerate() {
                    writeln!(output, "{}. {}", i + 1, response.replace('\n', " "))?;
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
        writeln!(output, "## Demographic Analysis")?;
        writeln!(output)?;
        write_filters(output, context)?;
        for table in tables {
            writeln!(output, "### {}", table.question)?;
            writeln!(output)?;
            write_frequency_table(output, table)?;
            writeln!(
                output,
                "Unique values: {} | Responses: {}",
                table.options.len(),
                table.respondents
            )?;
            writeln!(output)?;
        }
        Ok(())
    }
}
