use crate::config::SurveyConfig;
use crate::core::engine::question_columns;
use crate::core::{FilterPredicate, FilteredView, LoadEvent, filter};
use crate::format::csv::export_table;
use crate::format::{FilterContext, create_formatter};
use crate::session::Session;
use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a one-shot CLI run should produce.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub question: Option<String>,
    pub predicate: FilterPredicate,
    pub demographics: bool,
    pub list_questions: bool,
    pub summary: bool,
    /// Write the filtered table here as CSV
    pub export: Option<PathBuf>,
    /// Columns kept in the export; all when empty
    pub columns: Vec<String>,
}

impl Query {
    /// Anything besides an export, the overview included.
    fn wants_report(&self) -> bool {
        self.export.is_none()
            || self.question.is_some()
            || self.demographics
            || self.list_questions
            || self.summary
    }

    /// Nothing specific was asked for, so the overview is printed.
    fn wants_overview(&self) -> bool {
        self.question.is_none()
            && !self.demographics
            && !self.list_questions
            && !self.summary
            && self.export.is_none()
    }
}

/// Main entry point in CLI mode.
///
/// Loading runs on a background thread while progress events are consumed on
/// the main thread, then the requested reports are rendered to stdout or to
/// the configured output file.
pub fn run(config: SurveyConfig, query: Query) -> Result<()> {
    let session = load_session(config)?;

    if query.wants_report() {
        let mut output = open_output(session.config().output.as_deref())?;
        render(&session, &query, &mut output)?;
        output.flush()?;
    }

    if let Some(path) = &query.export {
        let rows = export(&session, &query.predicate, &query.columns, path)?;
        info!("exported {} rows to {}", rows, path.display());
    }

    Ok(())
}

/// Loads the data folder on a worker thread, printing progress when verbose.
pub fn load_session(config: SurveyConfig) -> Result<Session> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let verbose = config.verbose;

    let handle = std::thread::spawn(move || Session::open(config, Some(tx)));

    for event in rx {
        if verbose {
            report_progress(&event);
        }
    }

    let session = handle
        .join()
        .map_err(|_| anyhow!("loader thread panicked"))?
        .context("Failed to load survey data")?;
    Ok(session)
}

fn report_progress(event: &LoadEvent) {
    match event {
        LoadEvent::StartLoading => eprintln!("Loading survey data..."),
        LoadEvent::FilesFound(n) => eprintln!("Found {} workbooks.", n),
        LoadEvent::FileLoaded { file, rows } => eprintln!("Loaded: {} ({} rows)", file, rows),
        LoadEvent::FileSkipped { file, reason } => eprintln!("Skipped: {} ({})", file, reason),
        LoadEvent::Complete(msg) => eprintln!("{}", msg),
        LoadEvent::Error(e) => eprintln!("Error: {}", e),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// Renders every report `query` asks for into `output`.
pub fn render(session: &Session, query: &Query, output: &mut dyn Write) -> Result<()> {
    let dataset = session.dataset()?;
    let config = session.config();
    let mut formatter = create_formatter(config.output_format);

    let view = filter(&dataset.table, &query.predicate)?;
    let context = FilterContext {
        predicate: &query.predicate,
        matching: view.len(),
        total: dataset.table.len(),
    };

    if query.summary || query.wants_overview() {
        let clients = session.summary(&query.predicate)?;
        formatter.write_summary(output, &dataset, &clients)?;
    }

    if query.list_questions || query.wants_overview() {
        let questions = question_columns(&dataset.schema, config);
        formatter.write_questions(output, &dataset.schema, &questions)?;
    }

    if let Some(input) = &query.question {
        let question = session.resolve_question(input)?;
        let aggregate = session.analyze(&query.predicate, &question)?;
        formatter.write_analysis(output, context, &aggregate)?;
    }

    if query.demographics {
        let tables: Vec<_> = session
            .demographics(&query.predicate)?
            .iter()
            .map(|t| t.truncated(config.top_n))
            .collect();
        formatter.write_demographics(output, context, &tables)?;
    }

    Ok(())
}

/// Writes the filtered table to `path` as CSV and returns the row count.
pub fn export(
    session: &Session,
    predicate: &FilterPredicate,
    columns: &[String],
    path: &Path,
) -> Result<usize> {
    let dataset = session.dataset()?;
    let view: FilteredView = filter(&dataset.table, predicate)?;
    let file =
        File::create(path).with_context(|| format!("Failed to create export file {:?}", path))?;
    let rows = export_table(BufWriter::new(file), &view, columns)?;
    Ok(rows)
}
