//! Filtering and aggregation over a loaded table.
//!
//! Everything here is a pure function of (table, predicate, column); nothing
//! mutates the loaded data.

use std::collections::{BTreeSet, HashMap};

use super::error::{SurveyError, SurveyResult};
use super::multiselect;
use super::types::{
    Aggregate, CLIENT_COLUMN, ClientSummary, ColumnKind, CombinedTable, FilterPredicate,
    FrequencyTable, ResponseList, ResponseRow, Schema,
};
use crate::config::SurveyConfig;

/// Rows of a table that passed a filter, by index.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a CombinedTable,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Unfiltered view of the whole table.
    pub fn all(table: &'a CombinedTable) -> Self {
        Self {
            table,
            indices: (0..table.len()).collect(),
        }
    }

    pub fn table(&self) -> &'a CombinedTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a ResponseRow> + '_ {
        let rows = self.table.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    /// Values of `column` for every row in the view, blanks included.
    pub fn column(&self, column: &str) -> SurveyResult<Vec<&'a str>> {
        let table = self.table;
        if column == CLIENT_COLUMN {
            return Ok(self.rows().map(|r| r.client.as_str()).collect());
        }
        let index = table
            .column_index(column)
            .ok_or_else(|| SurveyError::ColumnNotFound(column.to_string()))?;
        Ok(self.rows().map(|r| r.cell(index)).collect())
    }

    /// Fails with [`SurveyError::EmptyResult`] when no row passed the filter.
    pub fn require_rows(&self) -> SurveyResult<&Self> {
        if self.is_empty() {
            Err(SurveyError::EmptyResult)
        } else {
            Ok(self)
        }
    }
}

/// Keeps the rows matching every constraint of `predicate`.
///
/// Constraints on columns the table does not have fail with
/// [`SurveyError::ColumnNotFound`] rather than silently matching nothing.
pub fn filter<'a>(
    table: &'a CombinedTable,
    predicate: &FilterPredicate,
) -> SurveyResult<FilteredView<'a>> {
    let mut constraints: Vec<(usize, &BTreeSet<String>)> = Vec::new();
    for (column, values) in predicate.fields() {
        let index = table
            .column_index(column)
            .ok_or_else(|| SurveyError::ColumnNotFound(column.to_string()))?;
        constraints.push((index, values));
    }
    let clients = predicate.clients();

    let indices = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| clients.is_empty() || clients.contains(&row.client))
        .filter(|(_, row)| {
            constraints
                .iter()
                .all(|(index, values)| values.contains(row.cell(*index)))
        })
        .map(|(i, _)| i)
        .collect();

    Ok(FilteredView { table, indices })
}

/// Analyses one question over a filtered view.
///
/// Single-select and demographic columns count exact values, multi-select
/// columns count each selected option, free-response columns return the raw
/// answers. An empty view yields an empty result, not an error.
pub fn aggregate(view: &FilteredView, schema: &Schema, question: &str) -> SurveyResult<Aggregate> {
    if question == CLIENT_COLUMN {
        return Ok(Aggregate::Frequencies(count_values(
            question,
            ColumnKind::SingleSelect,
            view.column(question)?,
        )));
    }

    let kind = schema
        .kind(question)
        .ok_or_else(|| SurveyError::ColumnNotFound(question.to_string()))?;
    let cells = view.column(question)?;

    Ok(match kind {
        ColumnKind::MultiSelect => {
            Aggregate::Frequencies(multiselect::expand(question, cells))
        }
        ColumnKind::FreeResponse => Aggregate::Responses(ResponseList {
            question: question.to_string(),
            responses: cells
                .into_iter()
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
        }),
        ColumnKind::SingleSelect | ColumnKind::Demographic => {
            Aggregate::Frequencies(count_values(question, kind, cells))
        }
    })
}

fn count_values(question: &str, kind: ColumnKind, cells: Vec<&str>) -> FrequencyTable {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut respondents = 0;
    for cell in cells.into_iter().filter(|c| !c.is_empty()) {
        respondents += 1;
        *counts.entry(cell.to_string()).or_insert(0) += 1;
    }
    FrequencyTable::from_counts(question, kind, counts, respondents)
}

/// Value counts for every demographic column, in table order.
pub fn demographic_breakdown(view: &FilteredView, schema: &Schema) -> Vec<FrequencyTable> {
    schema
        .of_kind(ColumnKind::Demographic)
        .filter_map(|c| {
            view.column(&c.name)
                .ok()
                .map(|cells| count_values(&c.name, ColumnKind::Demographic, cells))
        })
        .collect()
}

/// Response totals per client, in first-seen order.
pub fn client_summary(view: &FilteredView) -> Vec<ClientSummary> {
    let mut summary: Vec<ClientSummary> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for row in view.rows() {
        match positions.get(row.client.as_str()) {
            Some(&i) => summary[i].responses += 1,
            None => {
                positions.insert(row.client.as_str(), summary.len());
                summary.push(ClientSummary {
                    client: row.client.clone(),
                    responses: 1,
                });
            }
        }
    }
    summary
}

/// Sorted distinct non-empty values of `column`, for building filter choices.
pub fn distinct_values(table: &CombinedTable, column: &str) -> SurveyResult<Vec<String>> {
    let values: BTreeSet<&str> = FilteredView::all(table)
        .column(column)?
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect();
    Ok(values.into_iter().map(String::from).collect())
}

/// Columns offered for analysis: everything that is neither demographic nor
/// an identifier column.
pub fn question_columns<'s>(schema: &'s Schema, config: &SurveyConfig) -> Vec<&'s str> {
    schema
        .columns
        .iter()
        .filter(|c| c.kind != ColumnKind::Demographic && !config.is_excluded(&c.name))
        .map(|c| c.name.as_str())
        .collect()
}
