use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::Path;
use surveyscope::core::loader::read_sheet;
use surveyscope::core::{Aggregate, ColumnKind, SurveyError};
use surveyscope::runner::{Query, export, render};
use surveyscope::{FilterPredicate, OutputFormat, Session, SurveyConfig};
use tempfile::TempDir;

const HEADERS: [&str; 5] = [
    "Participant ID",
    "Region",
    "Do you currently use AI tools?",
    "Which tools do you use? (Select all that apply)",
    "What would make AI more useful? [Free Response]",
];

fn write_workbook(path: &Path, sheet: &str, rows: &[[&str; 5]]) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;
    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r as u32 + 1, col as u16, *value)?;
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Acme (3 rows) and Globex (2 rows), the way survey exports arrive.
fn survey_folder() -> anyhow::Result<TempDir> {
    let dir = TempDir::new()?;
    write_workbook(
        &dir.path().join("Acme__Survey.xlsx"),
        "Raw Data",
        &[
            ["1", "EMEA", "Yes", "Chat, Search", "Better training on the tools we already have"],
            ["2", "APAC", "No", "Chat", ""],
            ["3", "EMEA", "Yes", "Search; Code", "Clearer guidance from leadership on acceptable use"],
        ],
    )?;
    write_workbook(
        &dir.path().join("Globex_Survey.xlsx"),
        "Raw Data",
        &[
            ["1", "AMER", "Yes", "Code", "Access to a licensed assistant for the whole team"],
            ["2", "EMEA", "No", "", ""],
        ],
    )?;
    Ok(dir)
}

fn config_for(dir: &Path) -> SurveyConfig {
    SurveyConfig {
        data_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn test_loads_and_tags_clients() -> anyhow::Result<()> {
    let dir = survey_folder()?;
    let session = Session::open(config_for(dir.path()), None)?;
    let dataset = session.dataset()?;

    assert_eq!(dataset.table.len(), 5);
    assert_eq!(dataset.report.total_rows(), 5);
    let clients = session.summary(&FilterPredicate::new())?;
    assert_eq!(clients.len(), 2);
    assert_eq!((clients[0].client.as_str(), clients[0].responses), ("Acme", 3));
    assert_eq!((clients[1].client.as_str(), clients[1].responses), ("Globex", 2));

    let schema = &dataset.schema;
    assert_eq!(schema.kind("Region"), Some(ColumnKind::Demographic));
    assert_eq!(
        schema.kind("Do you currently use AI tools?"),
        Some(ColumnKind::SingleSelect)
    );
    assert_eq!(schema.kind(HEADERS[3]), Some(ColumnKind::MultiSelect));
    assert_eq!(schema.kind(HEADERS[4]), Some(ColumnKind::FreeResponse));

    let questions = session.questions()?;
    assert!(!questions.iter().any(|q| q == "Participant ID" || q == "Region"));
    Ok(())
}

#[test]
fn test_file_without_raw_data_sheet_is_skipped() -> anyhow::Result<()> {
    let dir = survey_folder()?;
    write_workbook(
        &dir.path().join("Initech_Survey.xlsx"),
        "Sheet1",
        &[["1", "EMEA", "Yes", "Chat", ""]],
    )?;
    // Excel lock files never reach the loader.
    fs::write(dir.path().join("~$Acme__Survey.xlsx"), b"lock")?;

    let session = Session::open(config_for(dir.path()), None)?;
    let dataset = session.dataset()?;

    assert_eq!(dataset.table.len(), 5);
    assert_eq!(dataset.report.loaded.len(), 2);
    assert_eq!(dataset.report.failures.len(), 1);
    assert_eq!(dataset.report.failures[0].file_name, "Initech_Survey.xlsx");
    assert!(!dataset.table.clients().contains(&"Initech".to_string()));
    Ok(())
}

#[test]
fn test_blank_header_row_is_a_format_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("Blank_Survey.xlsx");
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Raw Data")?;
    worksheet.write_string(1, 0, "Yes")?;
    worksheet.write_string(2, 0, "No")?;
    workbook.save(&path)?;

    assert!(matches!(
        read_sheet(&path, "Raw Data", 0),
        Err(SurveyError::FileFormat { .. })
    ));

    let result = Session::open(config_for(dir.path()), None);
    assert!(matches!(result, Err(SurveyError::NothingLoaded(1))));
    Ok(())
}

#[test]
fn test_missing_and_empty_folders() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    assert!(matches!(
        Session::open(config_for(dir.path()), None),
        Err(SurveyError::NoSpreadsheets(_))
    ));
    assert!(matches!(
        Session::open(config_for(&dir.path().join("missing")), None),
        Err(SurveyError::DataDirMissing(_))
    ));
    Ok(())
}

#[test]
fn test_filter_by_client_then_aggregate() -> anyhow::Result<()> {
    let dir = survey_folder()?;
    let session = Session::open(config_for(dir.path()), None)?;
    let predicate = FilterPredicate::new().with_clients(["Acme"]);

    match session.analyze(&predicate, "Client")? {
        Aggregate::Frequencies(table) => {
            assert_eq!(table.options.len(), 1);
            assert_eq!(table.count_of("Acme"), 3);
        }
        other => panic!("unexpected aggregate: {:?}", other),
    }

    match session.analyze(&predicate, HEADERS[3])? {
        Aggregate::Frequencies(table) => {
            assert_eq!(table.respondents, 3);
            assert_eq!(table.count_of("Chat"), 2);
            assert_eq!(table.count_of("Search"), 2);
            assert_eq!(table.count_of("Code"), 1);
            assert!(table.total_selections() >= table.respondents);
        }
        other => panic!("unexpected aggregate: {:?}", other),
    }

    let predicate = predicate.with_equals("Region", "EMEA");
    match session.analyze(&predicate, HEADERS[4])? {
        Aggregate::Responses(list) => assert_eq!(list.count(), 2),
        other => panic!("unexpected aggregate: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_empty_filter_result_has_zero_total() -> anyhow::Result<()> {
    let dir = survey_folder()?;
    let session = Session::open(config_for(dir.path()), None)?;
    let predicate = FilterPredicate::new().with_clients(["Nobody"]);

    assert_eq!(session.matching_rows(&predicate)?, 0);
    match session.analyze(&predicate, "Do you currently use AI tools?")? {
        Aggregate::Frequencies(table) => {
            assert_eq!(table.respondents, 0);
            assert!(table.options.is_empty());
            assert!(matches!(table.rows(), Err(SurveyError::EmptyResult)));
        }
        other => panic!("unexpected aggregate: {:?}", other),
    }

    let unknown = FilterPredicate::new().with_equals("Salary", "High");
    assert!(matches!(
        session.analyze(&unknown, "Region"),
        Err(SurveyError::ColumnNotFound(_))
    ));
    Ok(())
}

#[test]
fn test_render_reports() -> anyhow::Result<()> {
    let dir = survey_folder()?;
    let mut config = config_for(dir.path());
    config.output_format = OutputFormat::Markdown;
    let session = Session::open(config, None)?;

    let query = Query {
        question: Some("currently use".to_string()),
        predicate: FilterPredicate::new().with_clients(["Globex"]),
        demographics: true,
        ..Default::default()
    };
    let mut output = Vec::new();
    render(&session, &query, &mut output)?;
    let text = String::from_utf8(output)?;

    assert!(text.contains("## Analysis: Do you currently use AI tools?"));
    assert!(text.contains("Showing **2** responses (filtered from 5 total)"));
    assert!(text.contains("| No | 1 | 50.0% |"));
    assert!(text.contains("### Region"));
    assert!(!text.contains("# Survey Data"));
    Ok(())
}

#[test]
fn test_overview_lists_files_and_questions() -> anyhow::Result<()> {
    let dir = survey_folder()?;
    let session = Session::open(config_for(dir.path()), None)?;

    let mut output = Vec::new();
    render(&session, &Query::default(), &mut output)?;
    let text = String::from_utf8(output)?;

    assert!(text.contains("Acme__Survey.xlsx [Acme]: 3 responses"));
    assert!(text.contains("Globex: 2"));
    assert!(text.contains("[multi-select] Which tools do you use? (Select all that apply)"));
    Ok(())
}

#[test]
fn test_export_filtered_table() -> anyhow::Result<()> {
    let dir = survey_folder()?;
    let session = Session::open(config_for(dir.path()), None)?;
    let out = TempDir::new()?;
    let path = out.path().join("emea.csv");

    let predicate = FilterPredicate::new().with_equals("Region", "EMEA");
    let rows = export(
        &session,
        &predicate,
        &["Region".to_string(), "Do you currently use AI tools?".to_string()],
        &path,
    )?;
    assert_eq!(rows, 3);

    let content = fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "Client,Region,Do you currently use AI tools?");
    assert_eq!(lines[1], "Acme,EMEA,Yes");
    assert_eq!(lines[3], "Globex,EMEA,No");
    Ok(())
}
