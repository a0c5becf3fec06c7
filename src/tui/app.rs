use crate::config::SurveyConfig;
use crate::core::engine::{distinct_values, question_columns};
use crate::core::{
    Aggregate, CLIENT_COLUMN, Dataset, FilterPredicate, FrequencyTable, LoadEvent, filter,
};
use crate::format::csv::{export_frequencies, export_responses, export_summary, export_table};
use crate::session::Session;
use anyhow::{Context, Result};
use ratatui::widgets::ListState;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

pub const TAB_TITLES: [&str; 4] = ["Question Explorer", "Demographics", "Raw Data", "Export"];

/// Demographic columns offered in the filter panel, after `Client`.
const FILTER_DEMOGRAPHICS: usize = 4;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum AppStep {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Focus {
    Questions,
    Filters,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ExportKind {
    Table,
    Summary,
    Analysis,
}

/// One row of the filter panel: a column and the values it can take.
#[derive(Debug, Clone)]
pub struct FilterChoice {
    pub column: String,
    pub values: Vec<String>,
    pub cursor: usize,
}

impl FilterChoice {
    pub fn current(&self) -> Option<&str> {
        self.values.get(self.cursor).map(String::as_str)
    }
}

pub struct AppState {
    pub session: Session,
    pub step: AppStep,
    pub status_message: String,
    pub logs: Vec<String>,
    pub tick_count: usize,
    pub show_help: bool,
    pub is_loading: bool,
    pub watching: bool,

    pub active_tab: usize,
    pub focus: Focus,

    // Question explorer
    pub questions: Vec<String>,
    pub question_state: ListState,
    pub aggregate: Option<Result<Aggregate, String>>,

    // Filters
    pub filters: Vec<FilterChoice>,
    pub filter_index: usize,
    pub predicate: FilterPredicate,
    pub matching: usize,
    pub total: usize,

    pub demographics: Vec<FrequencyTable>,
    pub raw_offset: usize,

    // Export
    pub export_dir: PathBuf,
    pub exported: Vec<PathBuf>,
}

impl AppState {
    pub fn new(config: SurveyConfig) -> Self {
        let export_dir = config
            .output
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            session: Session::new(config),
            step: AppStep::Loading,
            status_message: "LOADING SURVEY DATA...".to_string(),
            logs: Vec::new(),
            tick_count: 0,
            show_help: false,
            is_loading: false,
            watching: false,

            active_tab: 0,
            focus: Focus::Questions,

            questions: Vec::new(),
            question_state: ListState::default(),
            aggregate: None,

            filters: Vec::new(),
            filter_index: 0,
            predicate: FilterPredicate::new(),
            matching: 0,
            total: 0,

            demographics: Vec::new(),
            raw_offset: 0,

            export_dir,
            exported: Vec::new(),
        }
    }

    pub fn config(&self) -> &SurveyConfig {
        self.session.config()
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    pub fn add_log(&mut self, log: String) {
        if self.logs.len() > 50 {
            self.logs.remove(0);
        }
        self.logs.push(log);
    }

    pub fn on_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::StartLoading => {
                self.status_message = "LOADING SURVEY DATA...".to_string();
                self.add_log("Reading data folder.".to_string());
            }
            LoadEvent::FilesFound(n) => self.add_log(format!("Found {} workbooks.", n)),
            LoadEvent::FileLoaded { file, rows } => {
                self.add_log(format!("Loaded {} ({} rows).", file, rows))
            }
            LoadEvent::FileSkipped { file, reason } => {
                self.add_log(format!("WARN: skipped {}: {}", file, reason))
            }
            LoadEvent::Complete(msg) => self.add_log(msg),
            LoadEvent::Error(e) => self.add_log(format!("ERROR: {}", e)),
        }
    }

    /// A reload failed. Whatever was loaded before stays on screen.
    pub fn on_load_failed(&mut self, error: String) {
        self.is_loading = false;
        self.status_message = format!("ERROR: {}", error);
        if !self.session.is_loaded() {
            self.step = AppStep::Failed;
        }
    }

    /// Swaps in a freshly loaded dataset and rebuilds everything derived from it.
    pub fn on_dataset(&mut self, dataset: Dataset) {
        let dataset = self.session.replace(dataset);
        self.is_loading = false;
        self.step = AppStep::Ready;
        self.total = dataset.table.len();

        let selected = self.selected_question().map(String::from);
        self.questions = question_columns(&dataset.schema, self.session.config())
            .into_iter()
            .map(String::from)
            .collect();
        let index = selected
            .and_then(|q| self.questions.iter().position(|c| *c == q))
            .or(if self.questions.is_empty() { None } else { Some(0) });
        self.question_state.select(index);

        let mut columns = vec![CLIENT_COLUMN.to_string()];
        columns.extend(
            dataset
                .schema
                .demographics()
                .into_iter()
                .take(FILTER_DEMOGRAPHICS)
                .map(String::from),
        );
        self.filters = columns
            .into_iter()
            .map(|column| FilterChoice {
                values: distinct_values(&dataset.table, &column).unwrap_or_default(),
                column,
                cursor: 0,
            })
            .collect();
        self.filter_index = self.filter_index.min(self.filters.len().saturating_sub(1));

        // Constraints only survive a reload while their column and values still exist.
        let mut predicate = FilterPredicate::new();
        for choice in &self.filters {
            let kept: BTreeSet<String> = self
                .predicate
                .values_for(&choice.column)
                .map(|values| {
                    values
                        .iter()
                        .filter(|v| choice.values.contains(v))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            predicate.set(&choice.column, kept);
        }
        self.predicate = predicate;

        self.status_message = format!(
            "READY: {} responses from {} clients",
            dataset.table.len(),
            dataset.report.client_count()
        );
        self.refresh();
    }

    /// Recomputes the filtered results for the current question and filters.
    pub fn refresh(&mut self) {
        let Ok(dataset) = self.session.dataset() else {
            return;
        };
        self.matching = match filter(&dataset.table, &self.predicate) {
            Ok(view) => view.len(),
            Err(e) => {
                self.status_message = format!("ERROR: {}", e);
                0
            }
        };
        self.aggregate = self.selected_question().map(|question| {
            self.session
                .analyze(&self.predicate, question)
                .map_err(|e| e.to_string())
        });
        self.demographics = self.session.demographics(&self.predicate).unwrap_or_default();
        self.raw_offset = self.raw_offset.min(self.matching.saturating_sub(1));
    }

    pub fn selected_question(&self) -> Option<&str> {
        self.question_state
            .selected()
            .and_then(|i| self.questions.get(i))
            .map(String::as_str)
    }

    pub fn next_tab(&mut self) {
        self.active_tab = (self.active_tab + 1) % TAB_TITLES.len();
    }

    pub fn select_tab(&mut self, tab: usize) {
        if tab < TAB_TITLES.len() {
            self.active_tab = tab;
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Questions => Focus::Filters,
            Focus::Filters => Focus::Questions,
        };
    }

    pub fn next_question(&mut self) {
        if self.questions.is_empty() {
            return;
        }
        let i = match self.question_state.selected() {
            Some(i) if i + 1 < self.questions.len() => i + 1,
            _ => 0,
        };
        self.question_state.select(Some(i));
        self.refresh();
    }

    pub fn previous_question(&mut self) {
        if self.questions.is_empty() {
            return;
        }
        let i = match self.question_state.selected() {
            Some(0) | None => self.questions.len() - 1,
            Some(i) => i - 1,
        };
        self.question_state.select(Some(i));
        self.refresh();
    }

    pub fn next_filter(&mut self) {
        if !self.filters.is_empty() {
            self.filter_index = (self.filter_index + 1) % self.filters.len();
        }
    }

    pub fn previous_filter(&mut self) {
        if !self.filters.is_empty() {
            self.filter_index = self
                .filter_index
                .checked_sub(1)
                .unwrap_or(self.filters.len() - 1);
        }
    }

    /// Moves the value cursor of the highlighted filter row.
    pub fn cycle_filter_value(&mut self, forward: bool) {
        if let Some(choice) = self.filters.get_mut(self.filter_index)
            && !choice.values.is_empty()
        {
            let len = choice.values.len();
            choice.cursor = if forward {
                (choice.cursor + 1) % len
            } else {
                (choice.cursor + len - 1) % len
            };
        }
    }

    /// Adds or removes the value under the cursor from its column's accepted set.
    pub fn toggle_filter_value(&mut self) {
        let Some(choice) = self.filters.get(self.filter_index) else {
            return;
        };
        let Some(value) = choice.current().map(String::from) else {
            return;
        };
        let column = choice.column.clone();
        let mut values = self
            .predicate
            .values_for(&column)
            .cloned()
            .unwrap_or_default();
        if !values.remove(&value) {
            values.insert(value);
        }
        self.predicate.set(&column, values);
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        self.predicate.clear();
        self.refresh();
    }

    pub fn is_value_selected(&self, column: &str, value: &str) -> bool {
        self.predicate
            .values_for(column)
            .is_some_and(|values| values.contains(value))
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.raw_offset = (self.raw_offset + rows).min(self.matching.saturating_sub(1));
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.raw_offset = self.raw_offset.saturating_sub(rows);
    }

    /// Writes a CSV export into `export_dir` and returns its path.
    pub fn export(&mut self, kind: ExportKind) -> Result<PathBuf> {
        let dataset = self.session.dataset()?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let name = match kind {
            ExportKind::Table => format!("survey_responses_{}.csv", stamp),
            ExportKind::Summary => format!("client_summary_{}.csv", stamp),
            ExportKind::Analysis => match &self.aggregate {
                Some(Ok(Aggregate::Frequencies(_))) => {
                    format!("question_frequencies_{}.csv", stamp)
                }
                Some(Ok(Aggregate::Responses(_))) => format!("question_responses_{}.csv", stamp),
                _ => anyhow::bail!("no question is selected"),
            },
        };
        let path = self.export_dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create export file {:?}", path))?;
        let writer = BufWriter::new(file);

        match kind {
            ExportKind::Table => {
                let view = filter(&dataset.table, &self.predicate)?;
                export_table(writer, &view, &[])?;
            }
            ExportKind::Summary => {
                let clients = self.session.summary(&self.predicate)?;
                export_summary(writer, &clients)?;
            }
            ExportKind::Analysis => match &self.aggregate {
                Some(Ok(Aggregate::Frequencies(table))) => export_frequencies(writer, table)?,
                Some(Ok(Aggregate::Responses(list))) => export_responses(writer, list)?,
                _ => anyhow::bail!("no question is selected"),
            },
        }

        self.exported.push(path.clone());
        Ok(path)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SurveyConfig::default())
    }
}
