//! Session state: the currently loaded dataset and the configuration it was
//! loaded with.
//!
//! The dataset sits behind an `Arc` and is only ever replaced whole, so anything
//! holding the previous handle keeps a consistent table while a reload runs.

use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::config::SurveyConfig;
use crate::core::engine::{client_summary, demographic_breakdown, question_columns};
use crate::core::{
    Aggregate, CLIENT_COLUMN, ClientSummary, Dataset, FilterPredicate, FrequencyTable, LoadEvent, SurveyError,
    SurveyResult, aggregate, filter, load,
};

pub struct Session {
    config: SurveyConfig,
    dataset: Option<Arc<Dataset>>,
}

impl Session {
    pub fn new(config: SurveyConfig) -> Self {
        Self {
            config,
            dataset: None,
        }
    }

    /// Creates a session and loads the data folder straight away.
    pub fn open(config: SurveyConfig, tx: Option<Sender<LoadEvent>>) -> SurveyResult<Self> {
        let mut session = Self::new(config);
        session.reload(tx)?;
        Ok(session)
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn dataset(&self) -> SurveyResult<Arc<Dataset>> {
        self.dataset.clone().ok_or(SurveyError::NotLoaded)
    }

    /// Loads the data folder again. On failure the previous dataset stays in place.
    pub fn reload(&mut self, tx: Option<Sender<LoadEvent>>) -> SurveyResult<Arc<Dataset>> {
        let dataset = load(&self.config, tx)?;
        Ok(self.replace(dataset))
    }

    /// Swaps in a dataset that was loaded elsewhere (e.g. on a worker thread).
    pub fn replace(&mut self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        self.dataset = Some(Arc::clone(&dataset));
        dataset
    }

    pub fn questions(&self) -> SurveyResult<Vec<String>> {
        let dataset = self.dataset()?;
        Ok(question_columns(&dataset.schema, &self.config)
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Resolves what the user typed to a column name.
    ///
    /// Accepts an exact column name, a 1-based position in the question list,
    /// a case-insensitive name, or a fragment that matches exactly one question.
    pub fn resolve_question(&self, input: &str) -> SurveyResult<String> {
        let dataset = self.dataset()?;
        let input = input.trim();
        if input == CLIENT_COLUMN || dataset.schema.get(input).is_some() {
            return Ok(input.to_string());
        }

        let questions = question_columns(&dataset.schema, &self.config);
        if let Ok(n) = input.parse::<usize>()
            && let Some(q) = n.checked_sub(1).and_then(|i| questions.get(i))
        {
            return Ok(q.to_string());
        }

        let needle = input.to_lowercase();
        if let Some(c) = dataset
            .schema
            .columns
            .iter()
            .find(|c| c.name.to_lowercase() == needle)
        {
            return Ok(c.name.clone());
        }

        let mut fragments = questions
            .iter()
            .filter(|q| q.to_lowercase().contains(&needle));
        match (fragments.next(), fragments.next()) {
            (Some(q), None) => Ok(q.to_string()),
            _ => Err(SurveyError::ColumnNotFound(input.to_string())),
        }
    }

    pub fn analyze(&self, predicate: &FilterPredicate, question: &str) -> SurveyResult<Aggregate> {
        let dataset = self.dataset()?;
        let view = filter(&dataset.table, predicate)?;
        aggregate(&view, &dataset.schema, question)
    }

    pub fn demographics(&self, predicate: &FilterPredicate) -> SurveyResult<Vec<FrequencyTable>> {
        let dataset = self.dataset()?;
        let view = filter(&dataset.table, predicate)?;
        Ok(demographic_breakdown(&view, &dataset.schema))
    }

    pub fn summary(&self, predicate: &FilterPredicate) -> SurveyResult<Vec<ClientSummary>> {
        let dataset = self.dataset()?;
        let view = filter(&dataset.table, predicate)?;
        Ok(client_summary(&view))
    }

    /// Rows matching `predicate`, for the "showing N of M" line.
    pub fn matching_rows(&self, predicate: &FilterPredicate) -> SurveyResult<usize> {
        let dataset = self.dataset()?;
        Ok(filter(&dataset.table, predicate)?.len())
    }
}
