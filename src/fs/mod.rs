use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Extensions of workbooks the loader can read.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

pub struct WalkConfig<'a> {
    pub ignore_patterns: &'a [String],
    pub recursive: bool,
}

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Lists spreadsheet files under `path`, sorted, skipping hidden files and
/// anything matching `ignore_patterns`.
pub fn find_spreadsheets(path: &Path, config: WalkConfig) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(path);

    let mut override_builder = ignore::overrides::OverrideBuilder::new(path);
    for pattern in config.ignore_patterns {
        // Override globs whitelist by default; "!" turns them into ignores.
        override_builder.add(&format!("!{}", pattern))?;
    }
    builder.overrides(override_builder.build()?);

    // A data folder is not a repository: keep hidden-file filtering, drop
    // gitignore handling.
    builder.standard_filters(false).hidden(true);
    if !config.recursive {
        builder.max_depth(Some(1));
    }

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) && is_spreadsheet(entry.path())
                {
                    files.push(entry.into_path());
                }
            }
            Err(err) => tracing::warn!("error walking data folder: {}", err),
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_finds_only_spreadsheets() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        File::create(root.join("Globex_Survey.XLSX"))?;
        File::create(root.join("Acme__Survey.xlsx"))?;
        File::create(root.join("legacy.xls"))?;
        File::create(root.join("notes.csv"))?;
        File::create(root.join("~$Acme__Survey.xlsx"))?;
        File::create(root.join(".hidden.xlsx"))?;

        let files = find_spreadsheets(
            root,
            WalkConfig {
                ignore_patterns: &["~$*".to_string()],
                recursive: false,
            },
        )?;

        assert_eq!(
            names(&files),
            vec!["Acme__Survey.xlsx", "Globex_Survey.XLSX", "legacy.xls"]
        );
        Ok(())
    }

    #[test]
    fn test_recursion_is_opt_in() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir(root.join("archive"))?;
        File::create(root.join("archive/Old_Survey.xlsx"))?;
        File::create(root.join("New_Survey.xlsx"))?;

        let flat = find_spreadsheets(
            root,
            WalkConfig {
                ignore_patterns: &[],
                recursive: false,
            },
        )?;
        assert_eq!(names(&flat), vec!["New_Survey.xlsx"]);

        let deep = find_spreadsheets(
            root,
            WalkConfig {
                ignore_patterns: &[],
                recursive: true,
            },
        )?;
        assert_eq!(deep.len(), 2);
        Ok(())
    }
}
