use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use crossbeam_channel::{Receiver, unbounded};
use std::path::PathBuf;
use surveyscope::config::OutputFormat;
use surveyscope::core::FilterPredicate;
use surveyscope::runner::{Query, run};
use surveyscope::SurveyConfig;
use surveyscope::tui::log::LogChannel;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Plain,
    Md,
    Json,
    Csv,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Plain => OutputFormat::Plain,
            CliOutputFormat::Md => OutputFormat::Markdown,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Explore and compare client survey workbooks", long_about = None)]
struct Args {
    /// Folder holding the survey workbooks
    path: Option<PathBuf>,

    /// Question to analyse (full text, number from --list-questions, or a unique fragment)
    #[arg(short, long)]
    question: Option<String>,

    /// Only include responses from this client (repeatable)
    #[arg(short, long)]
    client: Vec<String>,

    /// Only include rows where COLUMN equals VALUE (repeatable)
    #[arg(long, value_name = "COLUMN=VALUE")]
    filter: Vec<String>,

    /// Show the breakdown of every demographic column
    #[arg(short, long)]
    demographics: bool,

    /// List the questions available for analysis
    #[arg(short, long)]
    list_questions: bool,

    /// Show loaded files and responses per client
    #[arg(short, long)]
    summary: bool,

    /// Export the filtered responses as CSV
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Columns to keep in the export (repeatable, default all)
    #[arg(long)]
    columns: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<CliOutputFormat>,

    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Worksheet to read from every workbook
    #[arg(long)]
    sheet: Option<String>,

    /// Include workbooks in sub-folders
    #[arg(short, long)]
    recursive: bool,

    /// Launch in TUI mode
    #[arg(long)]
    tui: bool,

    /// Reload automatically when workbooks change (TUI mode)
    #[arg(short, long)]
    watch: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The TUI owns the terminal, so log lines go to its log panel instead.
fn init_tui_logging(verbose: bool) -> Receiver<String> {
    let (tx, rx) = unbounded();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(LogChannel::new(tx))
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();
    rx
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        let mut command = Args::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    // 1. Load from file or default
    let mut config = SurveyConfig::load_from_file().unwrap_or_default();

    // 2. Override with CLI args
    if let Some(p) = args.path {
        config.data_dir = p;
    }
    if let Some(o) = args.output {
        config.output = Some(o);
    }
    if let Some(f) = args.format {
        config.output_format = f.into();
    }
    if let Some(s) = args.sheet {
        config.sheet_name = s;
    }
    if args.recursive {
        config.recursive = true;
    }
    if args.verbose {
        config.verbose = true;
    }

    let tui_logs = if args.tui {
        Some(init_tui_logging(config.verbose))
    } else {
        init_logging(config.verbose);
        None
    };

    config.validate()?;

    if let Some(logs) = tui_logs {
        return surveyscope::tui::start_tui(config, args.watch, logs);
    }

    let mut predicate = FilterPredicate::new().with_clients(args.client);
    for assignment in &args.filter {
        predicate = predicate.with_assignment(assignment)?;
    }

    run(
        config,
        Query {
            question: args.question,
            predicate,
            demographics: args.demographics,
            list_questions: args.list_questions,
            summary: args.summary,
            export: args.export,
            columns: args.columns,
        },
    )
}
