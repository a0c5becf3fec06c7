//! Core module for surveyscope
//!
//! Loading, column classification, multi-select expansion and the
//! filter/aggregate engine. Everything in here is synchronous and free of UI
//! concerns.

pub mod classifier;
pub mod engine;
mod error;
pub mod loader;
pub mod multiselect;
mod types;

pub use classifier::classify;
pub use engine::{FilteredView, aggregate, filter};
pub use error::{SurveyError, SurveyResult};
pub use loader::load;
pub use types::*;
