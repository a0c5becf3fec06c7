//! CSV output and export of filtered data

use anyhow::Result;
use std::io::Write;

use super::{FilterContext, Formatter};
use crate::core::{
    Aggregate, CLIENT_COLUMN, ClientSummary, Dataset, FilteredView, FrequencyRow, FrequencyTable,
    ResponseList, Schema, SurveyError, SurveyResult,
};

pub struct CsvFormatter;

fn frequency_rows(table: &FrequencyTable) -> SurveyResult<Vec<FrequencyRow>> {
    match table.rows() {
        Ok(rows) => Ok(rows),
        Err(SurveyError::EmptyResult) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Writes the rows of `view` with `Client` first.
///
/// An empty `columns` slice exports every column. Returns the number of data
/// rows written.
pub fn export_table<W: Write>(
    writer: W,
    view: &FilteredView,
    columns: &[String],
) -> SurveyResult<usize> {
    let table = view.table();
    let selected: Vec<&str> = if columns.is_empty() {
        table.columns().iter().map(String::as_str).collect()
    } else {
        columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != CLIENT_COLUMN)
            .collect()
    };
    let indices = selected
        .iter()
        .map(|c| {
            table
                .column_index(c)
                .ok_or_else(|| SurveyError::ColumnNotFound(c.to_string()))
        })
        .collect::<SurveyResult<Vec<_>>>()?;

    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(std::iter::once(CLIENT_COLUMN).chain(selected.iter().copied()))?;
    let mut written = 0;
    for row in view.rows() {
        csv.write_record(
            std::iter::once(row.client.as_str()).chain(indices.iter().map(|&i| row.cell(i))),
        )?;
        written += 1;
    }
    csv.flush()?;
    Ok(written)
}

/// Writes one frequency table as `Option,Count,Percentage`.
pub fn export_frequencies<W: Write>(writer: W, table: &FrequencyTable) -> SurveyResult<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(["Option", "Count", "Percentage"])?;
    for row in frequency_rows(table)? {
        csv.write_record([
            row.option,
            row.count.to_string(),
            format!("{:.1}", row.percentage),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes per-client response totals.
/// Writes every free-text answer to a question, one per line.
pub fn export_responses<W: Write>(writer: W, list: &ResponseList) -> SurveyResult<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(["#", list.question.as_str()])?;
    for (i, response) in list.responses.iter().enumerate() {
        csv.write_record([(i + 1).to_string().as_str(), response.as_str()])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn export_summary<W: Write>(writer: W, clients: &[ClientSummary]) -> SurveyResult<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record([CLIENT_COLUMN, "Total Responses"])?;
    for summary in clients {
        let responses = summary.responses.to_string();
        csv.write_record([summary.client.as_str(), responses.as_str()])?;
    }
    csv.flush()?;
    Ok(())
}

impl Formatter for CsvFormatter {
    fn write_summary(
        &mut self,
        output: &mut dyn Write,
        _dataset: &Dataset,
        clients: &[ClientSummary],
    ) -> Result<()> {
        export_summary(output, clients)?;
        Ok(())
    }

    fn write_questions(
        &mut self,
        output: &mut dyn Write,
        schema: &Schema,
        questions: &[&str],
    ) -> Result<()> {
        let mut csv = ::csv::Writer::from_writer(output);
        csv.write_record(["Number", "Type", "Question", "Answered"])?;
        for (i, question) in questions.iter().enumerate() {
            let descriptor = schema.get(question);
            csv.write_record([
                (i + 1).to_string(),
                descriptor.map(|d| d.kind.label()).unwrap_or("unknown").to_string(),
                question.to_string(),
                descriptor.map(|d| d.answered).unwrap_or(0).to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }

    fn write_analysis(
        &mut self,
        output: &mut dyn Write,
        _context: FilterContext,
        aggregate: &Aggregate,
    ) -> Result<()> {
        match aggregate {
            Aggregate::Frequencies(table) => export_frequencies(output, table)?,
            Aggregate::Responses(list) => {
                let mut csv = ::csv::Writer::from_writer(output);
                csv.write_record([list.question.as_str()])?;
                for response in &list.responses {
                    csv.write_record([response.as_str()])?;
                }
                csv.flush()?;
            }
        }
        Ok(())
    }

    fn write_demographics(
        &mut self,
        output: &mut dyn Write,
        _context: FilterContext,
        tables: &[FrequencyTable],
    ) -> Result<()> {
        let mut csv = ::csv::Writer::from_writer(output);
        csv.write_record(["Demographic", "Option", "Count", "Percentage"])?;
        for table in tables {
            for row in frequency_rows(table)? {
                csv.write_record([
                    table.question.clone(),
                    row.option,
                    row.count.to_string(),
                    format!("{:.1}", row.percentage),
                ])?;
            }
        }
        csv.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnKind, CombinedTable, FilterPredicate, SheetData, filter};
    use std::collections::HashMap;

    fn table() -> CombinedTable {
        let mut table = CombinedTable::new();
        table.append(
            "Acme",
            "Acme__Survey.xlsx",
            SheetData {
                headers: vec!["Region".into(), "Tools".into()],
                rows: vec![
                    vec!["EMEA".into(), "Chat, Search".into()],
                    vec!["APAC".into(), "Chat".into()],
                ],
            },
        );
        table.append(
            "Globex",
            "Globex_Survey.xlsx",
            SheetData {
                headers: vec!["Region".into()],
                rows: vec![vec!["EMEA".into()]],
            },
        );
        table
    }

    #[test]
    fn test_export_table_puts_client_first() {
        let table = table();
        let view = filter(&table, &FilterPredicate::new().with_equals("Region", "EMEA")).unwrap();
        let mut output = Vec::new();
        let written = export_table(&mut output, &view, &[]).unwrap();

        assert_eq!(written, 2);
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Client,Region,Tools");
        assert_eq!(lines[1], "Acme,EMEA,\"Chat, Search\"");
        assert_eq!(lines[2], "Globex,EMEA,");
    }

    #[test]
    fn test_export_table_projection() {
        let table = table();
        let view = FilteredView::all(&table);
        let mut output = Vec::new();
        export_table(&mut output, &view, &["Client".into(), "Tools".into()]).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Client,Tools\n"));

        let missing = export_table(Vec::new(), &view, &["Nope".into()]);
        assert!(matches!(missing, Err(SurveyError::ColumnNotFound(_))));
    }

    #[test]
    fn test_export_frequencies() {
        let counts = HashMap::from([("Chat".to_string(), 2), ("Search".to_string(), 1)]);
        let table = FrequencyTable::from_counts("Tools", ColumnKind::MultiSelect, counts, 2);
        let mut output = Vec::new();
        export_frequencies(&mut output, &table).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Option,Count,Percentage\nChat,2,100.0\nSearch,1,50.0\n"
        );
    }

    #[test]
    fn test_export_responses() {
        let list = ResponseList {
            question: "Anything else?".to_string(),
            responses: vec!["More training".to_string(), "Budget, mostly".to_string()],
        };
        let mut output = Vec::new();
        export_responses(&mut output, &list).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "#,Anything else?\n1,More training\n2,\"Budget, mostly\"\n"
        );
    }
}
