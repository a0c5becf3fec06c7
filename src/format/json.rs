//! JSON output format for surveyscope

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use super::{FilterContext, Formatter};
use crate::core::{
    Aggregate, CLIENT_COLUMN, ClientSummary, Dataset, FileFailure, FrequencyRow, FrequencyTable,
    LoadedFile, Schema, SurveyError,
};

pub struct JsonFormatter;

#[derive(Serialize)]
struct FilterEntry {
    matching: usize,
    total: usize,
    constraints: BTreeMap<String, Vec<String>>,
}

impl From<FilterContext<'_>> for FilterEntry {
    fn from(context: FilterContext<'_>) -> Self {
        let mut constraints = BTreeMap::new();
        if let Some(clients) = context.predicate.values_for(CLIENT_COLUMN) {
            constraints.insert(CLIENT_COLUMN.to_string(), clients.iter().cloned().collect());
        }
        for (column, values) in context.predicate.fields() {
            constraints.insert(column.to_string(), values.iter().cloned().collect());
        }
        Self {
            matching: context.matching,
            total: context.total,
            constraints,
        }
    }
}

#[derive(Serialize)]
struct TableEntry<'a> {
    question: &'a str,
    kind: &'static str,
    respondents: usize,
    rows: Vec<FrequencyRow>,
}

impl<'a> TableEntry<'a> {
    fn new(table: &'a FrequencyTable) -> Result<Self> {
        let rows = match table.rows() {
            Ok(rows) => rows,
            Err(SurveyError::EmptyResult) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            question: &table.question,
            kind: table.kind.label(),
            respondents: table.respondents,
            rows,
        })
    }
}

#[derive(Serialize)]
struct SummaryEntry<'a> {
    loaded_at: String,
    responses: usize,
    columns: usize,
    files: &'a [LoadedFile],
    skipped: &'a [FileFailure],
    clients: &'a [ClientSummary],
}

#[derive(Serialize)]
struct QuestionEntry<'a> {
    number: usize,
    question: &'a str,
    kind: &'static str,
    answered: usize,
    distinct: usize,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum AnalysisBody<'a> {
    Frequencies(TableEntry<'a>),
    Responses {
        question: &'a str,
        count: usize,
        responses: &'a [String],
    },
}

fn emit<T: Serialize>(output: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, value)?;
    writeln!(output)?;
    Ok(())
}

impl Formatter for JsonFormatter {
    fn write_summary(
        &mut self,
        output: &mut dyn Write,
        dataset: &Dataset,
        clients: &[ClientSummary],
    ) -> Result<()> {
        emit(
            output,
            &SummaryEntry {
                loaded_at: dataset.loaded_at.to_rfc3339(),
                responses: dataset.table.len(),
                columns: dataset.table.columns().len(),
                files: &dataset.report.loaded,
                skipped: &dataset.report.failures,
                clients,
            },
        )
    }

    fn write_questions(
        &mut self,
        output: &mut dyn Write,
        schema: &Schema,
        questions: &[&str],
    ) -> Result<()> {
        let entries: Vec<QuestionEntry> = questions
            .iter()
            .enumerate()
            .map(|(i, &question)| {
                let descriptor = schema.get(question);
                QuestionEntry {
                    number: i + 1,
                    question,
                    kind: descriptor.map(|d| d.kind.label()).unwrap_or("unknown"),
                    answered: descriptor.map(|d| d.answered).unwrap_or(0),
                    distinct: descriptor.map(|d| d.distinct).unwrap_or(0),
                }
            })
            .collect();
        emit(
            output,
            &serde_json::json!({
                "questions": entries,
                "demographics": schema.demographics(),
            }),
        )
    }

    fn write_analysis(
        &mut self,
        output: &mut dyn Write,
        context: FilterContext,
        aggregate: &Aggregate,
    ) -> Result<()> {
        let body = match aggregate {
            Aggregate::Frequencies(table) => AnalysisBody::Frequencies(TableEntry::new(table)?),
            Aggregate::Responses(list) => AnalysisBody::Responses {
                question: &list.question,
                count: list.count(),
                responses: &list.responses,
            },
        };
        emit(
            output,
            &serde_json::json!({
                "filters": FilterEntry::from(context),
                "analysis": body,
            }),
        )
    }

    fn write_demographics(
        &mut self,
        output: &mut dyn Write,
        context: FilterContext,
        tables: &[FrequencyTable],
    ) -> Result<()> {
        let entries = tables
            .iter()
            .map(TableEntry::new)
            .collect::<Result<Vec<_>>>()?;
        emit(
            output,
            &serde_json::json!({
                "filters": FilterEntry::from(context),
                "demographics": entries,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnKind, FilterPredicate};
    use std::collections::HashMap;

    #[test]
    fn test_json_analysis_is_valid() {
        let counts = HashMap::from([("Yes".to_string(), 1), ("No".to_string(), 1)]);
        let table = FrequencyTable::from_counts("Use AI?", ColumnKind::SingleSelect, counts, 2);
        let predicate = FilterPredicate::new().with_clients(["Acme"]);
        let mut output = Vec::new();
        JsonFormatter
            .write_analysis(
                &mut output,
                FilterContext {
                    predicate: &predicate,
                    matching: 2,
                    total: 5,
                },
                &Aggregate::Frequencies(table),
            )
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["filters"]["matching"], 2);
        assert_eq!(value["filters"]["constraints"]["Client"][0], "Acme");
        assert_eq!(value["analysis"]["type"], "frequencies");
        assert_eq!(value["analysis"]["rows"][0]["option"], "No");
        assert_eq!(value["analysis"]["rows"][0]["percentage"], 50.0);
    }

    #[test]
    fn test_json_empty_table_has_no_rows() {
        let table =
            FrequencyTable::from_counts("Region", ColumnKind::Demographic, HashMap::new(), 0);
        let predicate = FilterPredicate::new();
        let mut output = Vec::new();
        JsonFormatter
            .write_demographics(
                &mut output,
                FilterContext {
                    predicate: &predicate,
                    matching: 0,
                    total: 3,
                },
                &[table],
            )
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["demographics"][0]["rows"].as_array().unwrap().len(), 0);
    }
}
