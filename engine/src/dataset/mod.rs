//! Dataset providers.
//!
//! A [`DatasetProvider`] maps table names to typed [`Table`]s:
//! - [`BundledDatasets`]: the sample baseball tables compiled into the binary
//! - [`DirectoryDatasets`]: `<dir>/<name>.csv` files, typed by the data
//!   dictionary or a `<name>.schema.json` sidecar
//! - [`LayeredDatasets`]: several providers, first match wins

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, DatasetResult};
use crate::models::{Schema, Table};
use crate::parser::{read_table, read_table_auto};

pub mod dictionary;

/// Source of named tables.
pub trait DatasetProvider {
    /// Load a table by name. Unknown names are [`DatasetError::NotFound`].
    fn load(&self, name: &str) -> DatasetResult<Table>;

    /// Names this provider can load.
    fn names(&self) -> Vec<String>;
}

// =============================================================================
// Bundled sample data
// =============================================================================

const BATTING_CSV: &str = include_str!("../../data/batting.csv");
const PEOPLE_CSV: &str = include_str!("../../data/people.csv");
const TEAMS_CSV: &str = include_str!("../../data/teams.csv");

/// The packaged `batting`, `people` and `teams` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledDatasets;

impl BundledDatasets {
    fn content(name: &str) -> Option<&'static str> {
        match name.to_ascii_lowercase().as_str() {
            "batting" => Some(BATTING_CSV),
            "people" => Some(PEOPLE_CSV),
            "teams" => Some(TEAMS_CSV),
            _ => None,
        }
    }
}

impl DatasetProvider for BundledDatasets {
    fn load(&self, name: &str) -> DatasetResult<Table> {
        let (Some(content), Some(schema)) = (Self::content(name), dictionary::schema_for(name)) else {
            return Err(DatasetError::NotFound(name.to_string()));
        };
        let table = read_table(content, b',', schema)?;
        tracing::info!(dataset = name, rows = table.height(), "loaded bundled dataset");
        Ok(table)
    }

    fn names(&self) -> Vec<String> {
        dictionary::table_names().into_iter().map(String::from).collect()
    }
}

// =============================================================================
// CSV directory
// =============================================================================

/// Tables stored as CSV files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryDatasets {
    root: PathBuf,
}

impl DirectoryDatasets {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: PathBuf::from(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `<name>.csv`, matching the file stem case-insensitively.
    ///
    /// Names are bare file stems; anything that could leave the root is
    /// never resolved.
    fn csv_path(&self, name: &str) -> Option<PathBuf> {
        if !is_bare_name(name) {
            tracing::warn!(dataset = name, "rejected dataset name");
            return None;
        }
        let exact = self.root.join(format!("{}.csv", name));
        if exact.is_file() {
            return Some(exact);
        }
        self.csv_files()
            .into_iter()
            .find(|(stem, _)| stem.eq_ignore_ascii_case(name))
            .map(|(_, path)| path)
    }

    fn csv_files(&self) -> Vec<(String, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut files: Vec<(String, PathBuf)> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "csv"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some((stem, path))
            })
            .collect();
        files.sort();
        files
    }

    /// Schema from the data dictionary, else from `<name>.schema.json`.
    fn schema(&self, name: &str, csv_path: &Path) -> DatasetResult<Option<Schema>> {
        if let Some(schema) = dictionary::schema_for(name) {
            return Ok(Some(schema.clone()));
        }
        let sidecar = csv_path.with_extension("schema.json");
        if !sidecar.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&sidecar)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

fn is_bare_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0'])
}

impl DatasetProvider for DirectoryDatasets {
    fn load(&self, name: &str) -> DatasetResult<Table> {
        let not_found = || DatasetError::NotFound(name.to_string());

        let path = self.csv_path(name).ok_or_else(not_found)?;
        let schema = self.schema(name, &path)?.ok_or_else(|| {
            tracing::warn!(path = %path.display(), "csv has no declared schema");
            not_found()
        })?;

        let bytes = fs::read(&path)?;
        let table = read_table_auto(&bytes, &schema)?;
        tracing::info!(
            dataset = name,
            path = %path.display(),
            rows = table.height(),
            "loaded dataset"
        );
        Ok(table)
    }

    fn names(&self) -> Vec<String> {
        self.csv_files().into_iter().map(|(stem, _)| stem).collect()
    }
}

// =============================================================================
// Layering
// =============================================================================

/// Providers consulted in order; the first that knows a name serves it.
#[derive(Default)]
pub struct LayeredDatasets {
    layers: Vec<Box<dyn DatasetProvider>>,
}

impl LayeredDatasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, provider: impl DatasetProvider + 'static) -> Self {
        self.layers.push(Box::new(provider));
        self
    }
}

impl DatasetProvider for LayeredDatasets {
    fn load(&self, name: &str) -> DatasetResult<Table> {
        for layer in &self.layers {
            match layer.load(name) {
                Err(DatasetError::NotFound(_)) => continue,
                result => return result,
            }
        }
        Err(DatasetError::NotFound(name.to_string()))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.layers.iter().flat_map(|layer| layer.names()) {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                names.push(name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Value};
    use tempfile::TempDir;

    #[test]
    fn test_bundled_tables_load() {
        for name in BundledDatasets.names() {
            let table = BundledDatasets.load(&name).unwrap();
            assert!(!table.is_empty(), "{name} is empty");
            assert_eq!(table.schema(), dictionary::schema_for(&name).unwrap());
        }
    }

    #[test]
    fn test_bundled_names_case_insensitive() {
        let table = BundledDatasets.load("Batting").unwrap();
        assert_eq!(table.schema().dtype_of("teamID").unwrap(), DataType::Categorical);
        // pre-1955 seasons have no intentional walk counts
        assert_eq!(table.value(0, "IBB").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_bundled_unknown() {
        assert!(matches!(
            BundledDatasets.load("salaries"),
            Err(DatasetError::NotFound(ref n)) if n == "salaries"
        ));
    }

    #[test]
    fn test_directory_with_sidecar_schema() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("salaries.csv"), "playerID;salary\naaronha01;240000\n").unwrap();
        fs::write(
            dir.path().join("salaries.schema.json"),
            r#"[{"name":"playerID","type":"str"},{"name":"salary","type":"int"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.csv"), "a,b\n1,2\n").unwrap();

        let provider = DirectoryDatasets::new(dir.path());
        assert_eq!(provider.names(), vec!["notes", "salaries"]);

        let salaries = provider.load("Salaries").unwrap();
        assert_eq!(salaries.value(0, "salary").unwrap(), Some(&Value::Int(240000)));

        // a csv without any schema is not served
        assert!(matches!(provider.load("notes"), Err(DatasetError::NotFound(_))));
        assert!(matches!(provider.load("missing"), Err(DatasetError::NotFound(_))));
    }

    #[test]
    fn test_directory_uses_dictionary() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("teams.csv"),
            "yearID,lgID,teamID,franchID,name,W,L,R,HR,attendance\n2023,AL,TEX,TEX,Texas Rangers,90,72,881,233,NA\n",
        )
        .unwrap();

        let teams = DirectoryDatasets::new(dir.path()).load("teams").unwrap();
        assert_eq!(teams.height(), 1);
        assert_eq!(teams.value(0, "attendance").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_layered_first_match_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("teams.csv"),
            "yearID,lgID,teamID,franchID,name,W,L,R,HR,attendance\n2023,AL,TEX,TEX,Texas Rangers,90,72,881,233,2533044\n",
        )
        .unwrap();

        let layered = LayeredDatasets::new()
            .with_layer(DirectoryDatasets::new(dir.path()))
            .with_layer(BundledDatasets);

        assert_eq!(layered.load("teams").unwrap().height(), 1);
        assert!(layered.load("batting").unwrap().height() > 1);
        assert!(matches!(layered.load("salaries"), Err(DatasetError::NotFound(_))));
        assert_eq!(layered.names(), vec!["teams", "batting", "people"]);
    }

    #[test]
    fn test_directory_rejects_paths_outside_root() {
        let outer = TempDir::new().unwrap();
        fs::write(outer.path().join("secret.csv"), "playerID\naaronha01\n").unwrap();
        fs::write(
            outer.path().join("secret.schema.json"),
            r#"[{"name":"playerID","type":"str"}]"#,
        )
        .unwrap();
        let inner = outer.path().join("data");
        fs::create_dir(&inner).unwrap();

        // reachable from the outer directory itself
        assert!(DirectoryDatasets::new(outer.path()).load("secret").is_ok());

        let provider = DirectoryDatasets::new(&inner);
        for name in ["../secret", "..\\secret", "data/../../secret", "", ".."] {
            assert!(
                matches!(provider.load(name), Err(DatasetError::NotFound(_))),
                "{name:?} was resolved"
            );
        }
    }
}
