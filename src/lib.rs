pub mod config;
pub mod core;
pub mod format;
pub mod fs;
pub mod runner;
pub mod session;
pub mod tui;
pub mod watch;

// Re-export key items for convenience
pub use config::{ClassifierConfig, OutputFormat, SurveyConfig};
pub use core::{Dataset, FilterPredicate, LoadEvent, SurveyError, SurveyResult};
pub use runner::{Query, run};
pub use session::Session;
