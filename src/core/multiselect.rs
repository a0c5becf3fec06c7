//! Multi-select expansion
//!
//! Multi-select answers arrive as one cell per respondent holding every chosen
//! option, separated by commas or semicolons.

use std::collections::{HashMap, HashSet};

use super::types::{ColumnKind, FrequencyTable};

pub const OPTION_DELIMITERS: &[char] = &[',', ';'];

/// Splits a cell into its trimmed, non-empty options.
pub fn split_options(cell: &str) -> Vec<&str> {
    cell.split(OPTION_DELIMITERS)
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect()
}

/// Counts every selected option across `cells`. An option repeated within
/// one cell counts once for that respondent.
///
/// `respondents` is the number of non-empty cells, not the number of
/// selections, since one respondent can pick several options.
pub fn expand<'a, I>(question: &str, cells: I) -> FrequencyTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut respondents = 0;

    for cell in cells {
        let options = split_options(cell);
        if options.is_empty() {
            continue;
        }
        respondents += 1;
        let mut chosen = HashSet::new();
        for option in options {
            if !chosen.insert(option) {
                continue;
            }
            *counts.entry(option.to_string()).or_insert(0) += 1;
        }
    }

    FrequencyTable::from_counts(question, ColumnKind::MultiSelect, counts, respondents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_options() {
        assert_eq!(split_options(" A ;B,, C ,"), vec!["A", "B", "C"]);
        assert!(split_options(" , ; ").is_empty());
    }

    #[test]
    fn test_respondents_not_selections() {
        let table = expand("Tools", ["Chat, Search", "Chat", "", "Code; Chat"]);
        assert_eq!(table.respondents, 3);
        assert_eq!(table.total_selections(), 5);
        assert_eq!(table.count_of("Chat"), 3);
        assert_eq!(table.count_of("Search"), 1);
        assert_eq!(table.options[0].option, "Chat");

        let rows = table.rows().unwrap();
        assert_eq!(rows[0].percentage, 100.0);
    }

    #[test]
    fn test_single_choices_sum_to_respondents() {
        let table = expand("Tools", ["Chat", "Search", "Chat"]);
        assert_eq!(table.total_selections(), table.respondents);
    }

    #[test]
    fn test_delimiter_only_cell_is_not_a_respondent() {
        let table = expand("Tools", [",", "Chat"]);
        assert_eq!(table.respondents, 1);
    }

    #[test]
    fn test_repeated_option_counts_once_per_respondent() {
        let table = expand("Tools", ["Chat, Chat", "Search;Search; Chat"]);
        assert_eq!(table.respondents, 2);
        assert_eq!(table.count_of("Chat"), 2);
        assert_eq!(table.count_of("Search"), 1);

        let single = expand("Tools", ["Chat, Chat", "Search"]);
        assert_eq!(single.total_selections(), single.respondents);
    }
}
