//! CSV folder loading.
//!
//! Every `*.csv` file in a folder is read as a [`RawTable`] named after its
//! file stem. Fields are kept as text; typing happens in coercion.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::RawTable;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("table '{table}' has no file {path}")]
    MissingTable { table: String, path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Read one CSV file as a raw table called `name`.
///
/// Rows may be shorter than the header; the missing trailing fields read as
/// absent. A leading UTF-8 byte order mark is dropped from the first header.
pub fn load_csv(name: &str, path: &Path) -> LoadResult<RawTable> {
    if !path.is_file() {
        return Err(LoadError::MissingTable {
            table: name.to_string(),
            path: path.to_path_buf(),
        });
    }

    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut table = RawTable::new(name, headers);
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        table
            .rows
            .push(record.iter().map(|f| Some(f.to_string())).collect());
    }

    Ok(table)
}

/// Load every `*.csv` file of `dir`, keyed by file stem.
pub fn load_csv_dir(dir: &Path) -> LoadResult<BTreeMap<String, RawTable>> {
    check_data_dir(dir)?;

    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut tables = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let table = load_csv(stem, &path)?;
        tables.insert(stem.to_string(), table);
    }

    Ok(tables)
}

/// The data folder must exist and be a directory.
pub fn check_data_dir(dir: &Path) -> LoadResult<()> {
    if !dir.exists() {
        return Err(LoadError::FolderNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}
