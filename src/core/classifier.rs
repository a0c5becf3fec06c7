//! Column classification
//!
//! Decides once per load whether each column is a demographic attribute or a
//! single-select, multi-select or free-response question. The decision looks at
//! the whole combined table, so a column has the same kind for every client.

use std::collections::HashSet;

use tracing::debug;

use super::multiselect::split_options;
use super::types::{ColumnDescriptor, ColumnKind, CombinedTable, Schema};
use crate::config::ClassifierConfig;

/// Classifies every column of `table`.
pub fn classify(table: &CombinedTable, config: &ClassifierConfig) -> Schema {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let values: Vec<&str> = table
                .rows()
                .iter()
                .map(|row| row.cell(index))
                .filter(|v| !v.is_empty())
                .collect();
            let sample = sample_values(&values, config.sample_size);
            let kind = classify_column(name, &sample, config);
            let distinct = sample.iter().collect::<HashSet<_>>().len();
            debug!("column '{}' -> {} ({} answered)", name, kind, values.len());
            ColumnDescriptor {
                name: name.clone(),
                kind,
                answered: values.len(),
                distinct,
            }
        })
        .collect();

    Schema { columns }
}

/// Classifies one column from its header and sampled non-empty values.
pub fn classify_column(name: &str, values: &[&str], config: &ClassifierConfig) -> ColumnKind {
    if is_demographic(name, config) {
        return ColumnKind::Demographic;
    }

    let header = name.to_lowercase();
    if contains_any(&header, &config.multi_select_hints) {
        return ColumnKind::MultiSelect;
    }
    if contains_any(&header, &config.free_response_hints) {
        return ColumnKind::FreeResponse;
    }

    if values.is_empty() {
        return ColumnKind::FreeResponse;
    }

    // Delimiter evidence outranks cardinality: a short option list repeated
    // across rows is still multi-select.
    let delimited = values
        .iter()
        .filter(|v| is_option_list(v, config.max_option_length))
        .count();
    if delimited as f64 / values.len() as f64 >= config.multi_select_ratio {
        return ColumnKind::MultiSelect;
    }

    let distinct = values.iter().collect::<HashSet<_>>().len();
    let unique_ratio = distinct as f64 / values.len() as f64;
    let mean_length =
        values.iter().map(|v| v.chars().count()).sum::<usize>() as f64 / values.len() as f64;

    if unique_ratio <= config.single_select_unique_ratio
        || (distinct <= config.single_select_max_options
            && mean_length <= config.max_option_length as f64)
    {
        ColumnKind::SingleSelect
    } else {
        ColumnKind::FreeResponse
    }
}

/// Case-insensitive keyword match on the column name.
pub fn is_demographic(name: &str, config: &ClassifierConfig) -> bool {
    contains_any(&name.to_lowercase(), &config.demographic_keywords)
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_lowercase()))
}

/// A cell holding at least two short options separated by `,` or `;`.
fn is_option_list(value: &str, max_option_length: usize) -> bool {
    let options = split_options(value);
    options.len() >= 2
        && options
            .iter()
            .all(|o| o.chars().count() <= max_option_length)
}

/// Evenly spaced sample of at most `limit` values.
fn sample_values<'a>(values: &[&'a str], limit: usize) -> Vec<&'a str> {
    if values.len() <= limit {
        return values.to_vec();
    }
    (0..limit).map(|i| values[i * values.len() / limit]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SheetData;

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn test_delimited_values_are_multi_select() {
        let kind = classify_column("Which AI tools do you use?", &["A, B", "A", "B, C"], &config());
        assert_eq!(kind, ColumnKind::MultiSelect);
    }

    #[test]
    fn test_repeated_short_values_are_single_select() {
        let kind = classify_column("Do you use AI at work?", &["Yes", "No", "Yes"], &config());
        assert_eq!(kind, ColumnKind::SingleSelect);
    }

    #[test]
    fn test_unique_long_sentences_are_free_response() {
        let values = [
            "We mostly use generative assistants to draft client proposals and summaries",
            "Our team has not adopted any tooling yet because legal review is still pending",
            "I would like more training on prompt writing and on evaluating model output quality",
        ];
        let kind = classify_column("What would help you most?", &values, &config());
        assert_eq!(kind, ColumnKind::FreeResponse);
    }

    #[test]
    fn test_sentences_with_commas_are_not_option_lists() {
        let values = [
            "Honestly, the biggest blocker for us has been getting budget approved for licences this year",
            "Training, mostly, since nobody on the team has had time to experiment with the new assistants",
            "It depends on the project, but in general we are still waiting on clear guidance from senior leadership",
        ];
        let kind = classify_column("Anything else to share?", &values, &config());
        assert_eq!(kind, ColumnKind::FreeResponse);
    }

    #[test]
    fn test_delimiter_beats_low_cardinality() {
        let values = ["Email; Chat", "Email; Chat", "Email; Chat", "Email"];
        let kind = classify_column("Channels", &values, &config());
        assert_eq!(kind, ColumnKind::MultiSelect);
    }

    #[test]
    fn test_demographic_keywords_win() {
        let kind = classify_column("What is your Department?", &["Sales, Marketing"], &config());
        assert_eq!(kind, ColumnKind::Demographic);
        assert!(is_demographic("SENIORITY band", &config()));
        assert!(!is_demographic("How often do you use AI?", &config()));
    }

    #[test]
    fn test_header_hints() {
        let kind = classify_column("Which apply? (Select all that apply)", &["Yes"], &config());
        assert_eq!(kind, ColumnKind::MultiSelect);
        let kind = classify_column("Comments [Free Response]", &["Yes", "Yes"], &config());
        assert_eq!(kind, ColumnKind::FreeResponse);
    }

    #[test]
    fn test_empty_column_is_free_response() {
        assert_eq!(
            classify_column("Unused question", &[], &config()),
            ColumnKind::FreeResponse
        );
    }

    #[test]
    fn test_classification_spans_all_clients() {
        let mut table = CombinedTable::new();
        table.append(
            "Acme",
            "a.xlsx",
            SheetData {
                headers: vec!["Tools".to_string()],
                rows: vec![vec!["Chat".to_string()], vec!["Chat".to_string()]],
            },
        );
        table.append(
            "Globex",
            "g.xlsx",
            SheetData {
                headers: vec!["Tools".to_string()],
                rows: vec![vec!["Chat, Search".to_string()], vec!["Search, Code".to_string()]],
            },
        );

        let schema = classify(&table, &config());
        let tools = schema.get("Tools").unwrap();
        assert_eq!(tools.kind, ColumnKind::MultiSelect);
        assert_eq!(tools.answered, 4);
    }

    #[test]
    fn test_sampling_is_bounded() {
        let values: Vec<String> = (0..1000).map(|i| format!("v{}", i % 3)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let sample = sample_values(&refs, 100);
        assert_eq!(sample.len(), 100);
        assert!(sample.contains(&"v0") && sample.contains(&"v1") && sample.contains(&"v2"));
    }

    #[test]
    fn test_sample_reaches_later_clients() {
        let mut table = CombinedTable::new();
        table.append(
            "Acme",
            "a.xlsx",
            SheetData {
                headers: vec!["Tools".to_string()],
                rows: vec![vec!["Chat".to_string()]; 500],
            },
        );
        table.append(
            "Globex",
            "g.xlsx",
            SheetData {
                headers: vec!["Tools".to_string()],
                rows: vec![vec!["Chat, Search".to_string()]; 400],
            },
        );

        let config = ClassifierConfig {
            sample_size: 500,
            ..config()
        };
        let schema = classify(&table, &config);
        assert_eq!(schema.kind("Tools"), Some(ColumnKind::MultiSelect));
    }

    #[test]
    fn test_sample_covers_the_tail() {
        let values: Vec<String> = (0..1499).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let sample = sample_values(&refs, 1000);
        assert_eq!(sample.len(), 1000);
        assert_eq!(sample[0], "0");
        let last: usize = sample[999].parse().unwrap();
        assert!(last >= 1490);
    }
}
