//! Cube result rendering: CSV and JSON files, and a text preview for logs.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cube::{CubeResult, CubeRow, KeySlot};
use crate::model::Value;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type WriteResult<T> = Result<T, WriteError>;

/// Result file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// How keys and nulls are spelled in rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub all_marker: String,
    pub null_marker: String,
    pub include_grouping_id: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            all_marker: "ALL".to_string(),
            null_marker: String::new(),
            include_grouping_id: false,
        }
    }
}

impl RenderOptions {
    fn slot(&self, slot: &KeySlot) -> String {
        match slot {
            KeySlot::All => self.all_marker.clone(),
            KeySlot::Value(v) => self.value(v),
        }
    }

    fn value(&self, value: &Value) -> String {
        match value {
            Value::Null => self.null_marker.clone(),
            v => v.to_string(),
        }
    }
}

/// Name of the optional `GROUPING(...)` column.
pub const GROUPING_ID_COLUMN: &str = "grouping_id";

// ============================================================================
// Layout
// ============================================================================

/// Output column names: bare attribute names where they are unique, the
/// qualified name otherwise, then the measure labels.
///
/// A bare name is unique when no other attribute, no measure label and (if
/// written) the `grouping_id` column share it.
pub fn header(result: &CubeResult, options: &RenderOptions) -> Vec<String> {
    let bare = |name: &str| name.rsplit('.').next().unwrap_or(name).to_string();
    let mut columns: Vec<String> = result
        .attributes
        .iter()
        .map(|name| {
            let short = bare(name);
            let clashes = result.attributes.iter().filter(|a| bare(a) == short).count() > 1
                || result.measures.contains(&short)
                || (options.include_grouping_id && short == GROUPING_ID_COLUMN);
            if clashes {
                name.clone()
            } else {
                short
            }
        })
        .collect();
    if options.include_grouping_id {
        columns.push(GROUPING_ID_COLUMN.to_string());
    }
    columns.extend(result.measures.iter().cloned());
    columns
}

/// Grouped values that render exactly like the ALL or NULL marker.
///
/// When this is non-empty, a rolled-up row and a data row can only be told
/// apart through the `grouping_id` column.
pub fn marker_clashes(result: &CubeResult, options: &RenderOptions) -> BTreeSet<String> {
    result
        .rows
        .iter()
        .flat_map(|row| row.key.slots())
        .filter_map(|slot| match slot {
            KeySlot::All => None,
            KeySlot::Value(Value::Null) => {
                (options.null_marker == options.all_marker).then(|| options.null_marker.clone())
            }
            KeySlot::Value(v) => {
                let rendered = options.value(v);
                (rendered == options.all_marker || rendered == options.null_marker)
                    .then_some(rendered)
            }
        })
        .collect()
}

fn record(row: &CubeRow, options: &RenderOptions) -> Vec<String> {
    let mut fields: Vec<String> = row.key.slots().iter().map(|s| options.slot(s)).collect();
    if options.include_grouping_id {
        fields.push(row.grouping_id().to_string());
    }
    fields.extend(row.values.iter().map(|v| options.value(v)));
    fields
}

/// JSON document `{ "columns": [...], "rows": [[...], ...] }`.
///
/// ALL is written as the marker string and NULL as JSON `null`.
pub fn to_json(result: &CubeResult, options: &RenderOptions) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = result
        .rows
        .iter()
        .map(|row| {
            let mut fields: Vec<serde_json::Value> = row
                .key
                .slots()
                .iter()
                .map(|slot| match slot {
                    KeySlot::All => serde_json::Value::String(options.all_marker.clone()),
                    KeySlot::Value(v) => v.to_json(),
                })
                .collect();
            if options.include_grouping_id {
                fields.push(serde_json::Value::from(row.grouping_id()));
            }
            fields.extend(row.values.iter().map(Value::to_json));
            serde_json::Value::Array(fields)
        })
        .collect();

    serde_json::json!({
        "columns": header(result, options),
        "rows": rows,
    })
}

// ============================================================================
// Files
// ============================================================================

/// Write `result` to `path`, creating parent directories.
pub fn write_result(
    result: &CubeResult,
    path: &Path,
    format: OutputFormat,
    options: &RenderOptions,
) -> WriteResult<()> {
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    match format {
        OutputFormat::Csv => {
            let csv_err = |source| WriteError::Csv {
                path: path.to_path_buf(),
                source,
            };
            let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
            writer
                .write_record(header(result, options))
                .map_err(csv_err)?;
            for row in &result.rows {
                writer.write_record(record(row, options)).map_err(csv_err)?;
            }
            writer.flush().map_err(io_err)?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&to_json(result, options)).map_err(|source| {
                WriteError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            fs::write(path, json).map_err(io_err)?;
        }
    }

    Ok(())
}

/// Where a run of `cube_file` writes its result.
///
/// A cube file below a `queries` directory keeps its relative location under
/// `output_dir`; any other file lands directly in it. The file is named
/// `<stem>_output.<ext>`.
pub fn default_output_path(cube_file: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    let stem = cube_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cube".to_string());
    let file_name = format!("{}_output.{}", stem, format.extension());

    let components: Vec<Component> = cube_file.components().collect();
    let queries = components
        .iter()
        .rposition(|c| matches!(c, Component::Normal(name) if *name == "queries"));

    let mut path = output_dir.to_path_buf();
    if let Some(i) = queries {
        // Directories between `queries` and the file itself.
        let end = components.len().saturating_sub(1);
        for component in components.iter().take(end).skip(i + 1) {
            path.push(component.as_os_str());
        }
    }
    path.push(file_name);
    path
}

// ============================================================================
// Preview
// ============================================================================

/// Render the first `limit` rows as an aligned text table.
pub fn render_preview(result: &CubeResult, limit: usize, options: &RenderOptions) -> String {
    let header = header(result, options);
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(limit)
        .map(|row| record(row, options))
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, field) in widths.iter_mut().zip(row) {
            *width = (*width).max(field.chars().count());
        }
    }

    let mut out = String::new();
    let line = |fields: &[String], out: &mut String| {
        let cells: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(f, w)| format!("{:<w$}", f, w = *w))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    };

    line(&header, &mut out);
    for row in &rows {
        line(row, &mut out);
    }
    if result.rows.len() > limit {
        let _ = writeln!(out, "... {} more rows", result.rows.len() - limit);
    }
    out
}
