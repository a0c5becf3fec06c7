//! Survey loader: reads every workbook in the data folder into one table
//!
//! Each file contributes the rows of its "Raw Data" sheet, tagged with the
//! client label taken from the file name. A file that cannot be used is
//! reported and skipped; the rest still load.

use std::collections::HashSet;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::Local;
use crossbeam_channel::Sender;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::classifier::classify;
use super::error::{SurveyError, SurveyResult};
use super::types::{
    CombinedTable, Dataset, FileFailure, LoadEvent, LoadReport, LoadedFile, SheetData,
};
use crate::config::SurveyConfig;
use crate::fs::{WalkConfig, find_spreadsheets};

lazy_static! {
    // Headers often carry line breaks and double spaces from the survey tool.
    static ref HEADER_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Notify helper for optional sender
fn notify(tx: &Option<Sender<LoadEvent>>, event: LoadEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

/// Client label for a survey file: the stem up to the first `__`, else up to
/// the first `_`, else the whole stem, trimmed.
pub fn client_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let label = match stem.find("__") {
        Some(i) => &stem[..i],
        None => stem.split('_').next().unwrap_or(&stem),
    }
    .trim();

    if label.is_empty() {
        stem.trim().to_string()
    } else {
        label.to_string()
    }
}

/// Text of a cell as the classifier and filters see it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn normalize_header(raw: &str) -> String {
    HEADER_WHITESPACE.replace_all(raw.trim(), " ").to_string()
}

fn format_error(path: &Path, reason: impl Into<String>) -> SurveyError {
    SurveyError::FileFormat {
        file: file_name(path),
        reason: reason.into(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Reads the configured worksheet of one workbook.
///
/// Fails when the sheet is missing or its header row holds no text. Header
/// cells without text are dropped together with their data, duplicate header
/// names get a " (n)" suffix, and fully blank rows are skipped.
pub fn read_sheet(path: &Path, sheet_name: &str, header_row: usize) -> SurveyResult<SheetData> {
    let mut workbook = open_workbook_auto(path).map_err(|e| SurveyError::Workbook {
        file: file_name(path),
        reason: e.to_string(),
    })?;

    if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
        return Err(format_error(
            path,
            format!("no worksheet named '{}'", sheet_name),
        ));
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| SurveyError::Workbook {
            file: file_name(path),
            reason: e.to_string(),
        })?;

    // Ranges start at the first used cell, so a blank header row shows up as a
    // start row past the expected one.
    let (start_row, _) = range
        .start()
        .ok_or_else(|| format_error(path, format!("worksheet '{}' is empty", sheet_name)))?;
    let start_row = start_row as usize;
    if start_row > header_row {
        return Err(format_error(path, "header row has no column names"));
    }

    let mut rows = range.rows().skip(header_row - start_row);
    let header_cells = rows
        .next()
        .ok_or_else(|| format_error(path, "header row has no column names"))?;

    let mut keep: Vec<(usize, String)> = Vec::new();
    for (i, cell) in header_cells.iter().enumerate() {
        let name = normalize_header(&cell_text(cell));
        if name.is_empty() {
            debug!("{}: dropping column {} without a header", file_name(path), i + 1);
            continue;
        }
        keep.push((i, name));
    }

    if keep.is_empty() {
        return Err(format_error(path, "header row has no column names"));
    }

    let names: Vec<String> = keep.iter().map(|(_, name)| name.clone()).collect();
    for ((_, name), unique) in keep.iter_mut().zip(unique_headers(&names)) {
        *name = unique;
    }

    let data_rows: Vec<Vec<String>> = rows
        .map(|row| {
            keep.iter()
                .map(|(i, _)| row.get(*i).map(cell_text).unwrap_or_default())
                .collect::<Vec<String>>()
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    Ok(SheetData {
        headers: keep.into_iter().map(|(_, name)| name).collect(),
        rows: data_rows,
    })
}

/// Renames repeated headers to `Name (2)`, `Name (3)`, skipping any suffix
/// that is already a real header in the sheet.
fn unique_headers(names: &[String]) -> Vec<String> {
    let reserved: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::new();
    names
        .iter()
        .map(|name| {
            if used.insert(name.clone()) {
                return name.clone();
            }
            let mut n = 2;
            loop {
                let candidate = format!("{} ({})", name, n);
                if !reserved.contains(candidate.as_str()) && used.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Loads every workbook in `config.data_dir` into a combined table.
///
/// Returns the table together with the per-file report. Directory-level
/// problems (missing folder, no workbooks, nothing usable) are errors; problems
/// with individual files are not.
pub fn load_table(
    config: &SurveyConfig,
    tx: &Option<Sender<LoadEvent>>,
) -> SurveyResult<(CombinedTable, LoadReport)> {
    notify(tx, LoadEvent::StartLoading);

    let dir = &config.data_dir;
    if !dir.is_dir() {
        return Err(SurveyError::DataDirMissing(dir.clone()));
    }

    let files = find_spreadsheets(
        dir,
        WalkConfig {
            ignore_patterns: &config.ignore_patterns,
            recursive: config.recursive,
        },
    )
    .map_err(|e| SurveyError::Configuration(format!("bad ignore pattern: {}", e)))?;

    notify(tx, LoadEvent::FilesFound(files.len()));
    if files.is_empty() {
        return Err(SurveyError::NoSpreadsheets(dir.clone()));
    }

    let mut table = CombinedTable::new();
    let mut report = LoadReport::default();

    for path in &files {
        let name = file_name(path);
        match read_sheet(path, &config.sheet_name, config.header_row) {
            Ok(sheet) => {
                let client = client_label(path);
                let rows = sheet.rows.len();
                debug!("{}: {} rows for client '{}'", name, rows, client);
                table.append(&client, &name, sheet);
                notify(
                    tx,
                    LoadEvent::FileLoaded {
                        file: name.clone(),
                        rows,
                    },
                );
                report.loaded.push(LoadedFile {
                    file_name: name,
                    client,
                    rows,
                });
            }
            Err(e) => {
                warn!("skipping {}: {}", name, e);
                notify(
                    tx,
                    LoadEvent::FileSkipped {
                        file: name.clone(),
                        reason: e.to_string(),
                    },
                );
                report.failures.push(FileFailure {
                    file_name: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if report.loaded.is_empty() {
        return Err(SurveyError::NothingLoaded(files.len()));
    }

    info!(
        "loaded {} responses from {} files ({} skipped)",
        table.len(),
        report.loaded.len(),
        report.failures.len()
    );
    Ok((table, report))
}

/// Loads the data folder and classifies its columns once.
pub fn load(config: &SurveyConfig, tx: Option<Sender<LoadEvent>>) -> SurveyResult<Dataset> {
    let (table, report) = match load_table(config, &tx) {
        Ok(loaded) => loaded,
        Err(e) => {
            notify(&tx, LoadEvent::Error(e.to_string()));
            return Err(e);
        }
    };
    let schema = classify(&table, &config.classifier);

    notify(
        &tx,
        LoadEvent::Complete(format!(
            "Loaded {} responses from {} clients",
            table.len(),
            report.client_count()
        )),
    );

    Ok(Dataset {
        table,
        schema,
        report,
        loaded_at: Local::now(),
    })
}
