//! Core types shared across surveyscope modules

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::error::{SurveyError, SurveyResult};

/// Name under which the implicit client tag is addressed in filters and exports.
pub const CLIENT_COLUMN: &str = "Client";

/// Events emitted while a data folder is being loaded
#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// Loading has started
    StartLoading,
    /// Number of spreadsheet files discovered
    FilesFound(usize),
    /// A file was read successfully
    FileLoaded { file: String, rows: usize },
    /// A file was skipped because it could not be used
    FileSkipped { file: String, reason: String },
    /// Loading complete with message
    Complete(String),
    /// Error occurred
    Error(String),
}

/// One respondent's answers.
///
/// `cells` is aligned with [`CombinedTable::columns`]. Rows from files that lack
/// some of the combined columns are simply shorter; missing cells read as blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRow {
    pub client: String,
    pub source: String,
    pub cells: Vec<String>,
}

impl ResponseRow {
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Header row and data rows read from a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// All loaded files' rows, column-aligned by header name.
#[derive(Debug, Clone, Default)]
pub struct CombinedTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<ResponseRow>,
}

impl CombinedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResponseRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// True for any loaded column and for the implicit client column.
    pub fn has_column(&self, name: &str) -> bool {
        name == CLIENT_COLUMN || self.index.contains_key(name)
    }

    /// Cell value of `row` under `column`, or `None` when the column is unknown.
    pub fn value<'a>(&self, row: &'a ResponseRow, column: &str) -> Option<&'a str> {
        if column == CLIENT_COLUMN {
            return Some(row.client.as_str());
        }
        self.column_index(column).map(|i| row.cell(i))
    }

    /// Appends a worksheet's rows, tagging each with `client` and `source`.
    ///
    /// New header names extend the column list; rows already in the table are not
    /// touched since absent trailing cells read as blank.
    pub fn append(&mut self, client: &str, source: &str, sheet: SheetData) {
        let positions: Vec<usize> = sheet
            .headers
            .iter()
            .map(|header| self.intern_column(header))
            .collect();
        let width = self.columns.len();

        for raw in sheet.rows {
            let mut cells = vec![String::new(); width];
            for (value, &pos) in raw.into_iter().zip(&positions) {
                cells[pos] = value;
            }
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            self.rows.push(ResponseRow {
                client: client.to_string(),
                source: source.to_string(),
                cells,
            });
        }
    }

    fn intern_column(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.columns.len();
        self.columns.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }

    /// Client labels in first-seen order.
    pub fn clients(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.client.as_str()))
            .map(|r| r.client.clone())
            .collect()
    }
}

/// Answer shape of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnKind {
    Demographic,
    SingleSelect,
    MultiSelect,
    FreeResponse,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Demographic => "demographic",
            ColumnKind::SingleSelect => "single-select",
            ColumnKind::MultiSelect => "multi-select",
            ColumnKind::FreeResponse => "free-response",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    /// Rows with a non-empty cell in this column
    pub answered: usize,
    /// Distinct values among the sampled cells
    pub distinct: usize,
}

/// Column descriptors for a loaded table, in table column order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub columns: Vec<ColumnDescriptor>,
}

impl Schema {
    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.get(name).map(|c| c.kind)
    }

    pub fn of_kind(&self, kind: ColumnKind) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(move |c| c.kind == kind)
    }

    pub fn demographics(&self) -> Vec<&str> {
        self.of_kind(ColumnKind::Demographic)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Conjunction of membership constraints.
///
/// A one-value constraint is plain equality. Empty value sets and an empty
/// predicate place no constraint at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    clients: BTreeSet<String>,
    fields: BTreeMap<String, BTreeSet<String>>,
}

impl FilterPredicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clients.extend(clients.into_iter().map(Into::into));
        self
    }

    pub fn with_equals(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_any_of(column, [value.into()])
    }

    pub fn with_any_of<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = column.into();
        if column == CLIENT_COLUMN {
            return self.with_clients(values);
        }
        self.fields
            .entry(column)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Adds a `COLUMN=VALUE` constraint as typed on the command line.
    pub fn with_assignment(self, assignment: &str) -> SurveyResult<Self> {
        let (column, value) = assignment
            .split_once('=')
            .map(|(c, v)| (c.trim(), v.trim()))
            .filter(|(c, _)| !c.is_empty())
            .ok_or_else(|| {
                SurveyError::InvalidFilter(format!("expected COLUMN=VALUE, got '{}'", assignment))
            })?;
        Ok(self.with_equals(column, value))
    }

    pub fn clients(&self) -> &BTreeSet<String> {
        &self.clients
    }

    /// Non-empty column constraints.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.fields
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(c, v)| (c.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.fields().next().is_none()
    }

    /// Replaces the accepted values for `column` (clients included).
    pub fn set(&mut self, column: &str, values: BTreeSet<String>) {
        if column == CLIENT_COLUMN {
            self.clients = values;
        } else if values.is_empty() {
            self.fields.remove(column);
        } else {
            self.fields.insert(column.to_string(), values);
        }
    }

    pub fn values_for(&self, column: &str) -> Option<&BTreeSet<String>> {
        if column == CLIENT_COLUMN {
            return Some(&self.clients).filter(|c| !c.is_empty());
        }
        self.fields.get(column).filter(|v| !v.is_empty())
    }

    pub fn clear(&mut self) {
        self.clients.clear();
        self.fields.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionCount {
    pub option: String,
    pub count: usize,
}

/// One rendered line of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub option: String,
    pub count: usize,
    pub percentage: f64,
}

/// Option counts for one question under one filter state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    pub question: String,
    pub kind: ColumnKind,
    /// Ordered by count descending, then option ascending
    pub options: Vec<OptionCount>,
    /// Rows that answered the question. Percentages are taken against this,
    /// never against the number of selections.
    pub respondents: usize,
}

impl FrequencyTable {
    pub fn from_counts(
        question: impl Into<String>,
        kind: ColumnKind,
        counts: HashMap<String, usize>,
        respondents: usize,
    ) -> Self {
        let mut options: Vec<OptionCount> = counts
            .into_iter()
            .map(|(option, count)| OptionCount { option, count })
            .collect();
        options.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.option.cmp(&b.option)));
        Self {
            question: question.into(),
            kind,
            options,
            respondents,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.respondents == 0
    }

    /// Sum of all option counts. Exceeds `respondents` for multi-select
    /// questions where someone picked more than one option.
    pub fn total_selections(&self) -> usize {
        self.options.iter().map(|o| o.count).sum()
    }

    pub fn count_of(&self, option: &str) -> usize {
        self.options
            .iter()
            .find(|o| o.option == option)
            .map(|o| o.count)
            .unwrap_or(0)
    }

    /// Options with their share of respondents, rounded to one decimal.
    pub fn rows(&self) -> SurveyResult<Vec<FrequencyRow>> {
        if self.respondents == 0 {
            return Err(SurveyError::EmptyResult);
        }
        let total = self.respondents as f64;
        Ok(self
            .options
            .iter()
            .map(|o| FrequencyRow {
                option: o.option.clone(),
                count: o.count,
                percentage: (o.count as f64 / total * 1000.0).round() / 10.0,
            })
            .collect())
    }

    /// Keeps only the `n` most frequent options.
    pub fn truncated(&self, n: usize) -> Self {
        Self {
            options: self.options.iter().take(n).cloned().collect(),
            ..self.clone()
        }
    }
}

/// Raw answers to a free-response question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseList {
    pub question: String,
    pub responses: Vec<String>,
}

impl ResponseList {
    pub fn count(&self) -> usize {
        self.responses.len()
    }
}

/// Result of analysing one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregate {
    Frequencies(FrequencyTable),
    Responses(ResponseList),
}

impl Aggregate {
    pub fn question(&self) -> &str {
        match self {
            Aggregate::Frequencies(t) => &t.question,
            Aggregate::Responses(l) => &l.question,
        }
    }

    pub fn respondents(&self) -> usize {
        match self {
            Aggregate::Frequencies(t) => t.respondents,
            Aggregate::Responses(l) => l.count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client: String,
    pub responses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedFile {
    pub file_name: String,
    pub client: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub reason: String,
}

/// What happened to each file of a load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<LoadedFile>,
    pub failures: Vec<FileFailure>,
}

impl LoadReport {
    pub fn total_rows(&self) -> usize {
        self.loaded.iter().map(|f| f.rows).sum()
    }

    pub fn client_count(&self) -> usize {
        self.loaded
            .iter()
            .map(|f| f.client.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// A complete load: the combined table with its cached schema.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub table: CombinedTable,
    pub schema: Schema,
    pub report: LoadReport,
    pub loaded_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(headers: &[&str], rows: &[&[&str]]) -> SheetData {
        SheetData {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_append_aligns_columns_by_name() {
        let mut table = CombinedTable::new();
        table.append("Acme", "a.xlsx", sheet(&["Q1", "Region"], &[&["Yes", "EMEA"]]));
        table.append("Globex", "g.xlsx", sheet(&["Region", "Q2"], &[&["APAC", "No"]]));

        assert_eq!(table.columns(), &["Q1", "Region", "Q2"]);
        let acme = &table.rows()[0];
        let globex = &table.rows()[1];
        assert_eq!(table.value(acme, "Q2"), Some(""));
        assert_eq!(table.value(globex, "Q1"), Some(""));
        assert_eq!(table.value(globex, "Region"), Some("APAC"));
        assert_eq!(table.value(globex, CLIENT_COLUMN), Some("Globex"));
        assert_eq!(table.value(globex, "Missing"), None);
    }

    #[test]
    fn test_frequency_rows_reject_empty_table() {
        let table = FrequencyTable::from_counts("Q", ColumnKind::SingleSelect, HashMap::new(), 0);
        assert!(matches!(table.rows(), Err(SurveyError::EmptyResult)));
    }

    #[test]
    fn test_frequency_ordering_and_percentages() {
        let counts = HashMap::from([
            ("No".to_string(), 1),
            ("Yes".to_string(), 2),
            ("Maybe".to_string(), 1),
        ]);
        let table = FrequencyTable::from_counts("Q", ColumnKind::SingleSelect, counts, 4);
        let rows = table.rows().unwrap();
        assert_eq!(rows[0].option, "Yes");
        assert_eq!(rows[0].percentage, 50.0);
        assert_eq!(rows[1].option, "Maybe");
        assert_eq!(rows[2].option, "No");
        assert_eq!(rows[2].percentage, 25.0);
    }

    #[test]
    fn test_predicate_assignment_parsing() {
        let predicate = FilterPredicate::new()
            .with_assignment("Region = EMEA")
            .unwrap()
            .with_assignment("Client=Acme")
            .unwrap();
        assert_eq!(
            predicate.values_for("Region").unwrap().iter().collect::<Vec<_>>(),
            vec!["EMEA"]
        );
        assert!(predicate.clients().contains("Acme"));
        assert!(FilterPredicate::new().with_assignment("Region").is_err());
        assert!(FilterPredicate::new().with_assignment("=EMEA").is_err());
    }

    #[test]
    fn test_empty_value_sets_are_no_constraint() {
        let predicate = FilterPredicate::new().with_any_of("Region", Vec::<String>::new());
        assert!(predicate.is_empty());
    }
}
