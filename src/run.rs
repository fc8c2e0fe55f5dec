//! End-to-end runs of a cube file: load, coerce, join, aggregate, write.
//!
//! The core stages are silent; this module reports their statistics through
//! `tracing`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coerce::{coerce_table_with_stats, CoerceError};
use crate::config::{CubeFile, SettingsError};
use crate::cube::{CubeError, CubeResult};
use crate::io::{
    check_data_dir, default_output_path, load_csv, marker_clashes, render_preview,
    result_fingerprint, write_result, LoadError, OutputFormat, WriteError,
};
use crate::join::{JoinError, JoinStats, StarJoin};
use crate::model::TypedTable;

/// Errors from any stage of a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Coerce(#[from] CoerceError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Cube(#[from] CubeError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("failed to fingerprint result: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

pub type RunResult<T> = Result<T, RunError>;

/// Command-line overrides of cube file settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub data_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub preview_rows: Option<usize>,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub cube: String,
    pub result: CubeResult,
    pub output_path: PathBuf,
    pub fingerprint: String,
    pub join_stats: JoinStats,
    pub elapsed: Duration,
}

/// Load and run the cube file at `path`.
pub fn run_cube_file(path: &Path, options: &RunOptions) -> RunResult<RunReport> {
    let file = CubeFile::from_file(path)?;
    run_cube(&file, options)
}

/// Run an already loaded cube file.
pub fn run_cube(file: &CubeFile, options: &RunOptions) -> RunResult<RunReport> {
    let started = Instant::now();
    let name = file.name();
    info!("Running cube '{}'", name);

    // Configuration errors surface before any file is read.
    let cube = file.validate()?;
    debug!(
        attributes = ?cube.attribute_names(),
        measures = ?cube.measure_labels(),
        "Cube file is valid"
    );

    let data_dir = file.data_dir(options.data_dir.as_deref())?;
    check_data_dir(&data_dir)?;
    info!("Loading tables from {}", data_dir.display());

    let tables = file
        .star_tables()
        .map(|table| load_table(file, &data_dir, table))
        .collect::<RunResult<Vec<_>>>()?;
    let Some((fact, dimensions)) = tables.split_first() else {
        return Err(SettingsError::InvalidConfig("star.fact is not set".to_string()).into());
    };

    let join = dimensions
        .iter()
        .zip(&file.star.dimensions)
        .fold(StarJoin::new(fact), |join, (table, link)| {
            join.with_dimension(table, link.clone())
        });
    let (joined, join_stats) = join.execute()?;
    info!(
        rows = joined.num_rows(),
        columns = joined.schema.len(),
        "Joined {} dimension(s) onto '{}'",
        dimensions.len(),
        fact.name
    );
    for dim in &join_stats.dimensions {
        if dim.unmatched_keys > 0 || dim.null_keys > 0 {
            warn!(
                dimension = %dim.alias,
                unmatched = dim.unmatched_keys,
                null_keys = dim.null_keys,
                "Unresolved foreign keys; attributes left NULL"
            );
        }
    }

    let engine = file.engine.options();
    info!(
        grouping_sets = cube.grouping_sets().len(),
        partitions = engine.partitions(joined.num_rows()),
        "Computing cube over {} attribute(s)",
        cube.attribute_names().len()
    );
    let result = cube.compute(&joined.rows, &engine);
    info!(rows = result.num_rows(), "Cube computed");

    let mut render = file.output.render_options();
    let clashes = marker_clashes(&result, &render);
    if !clashes.is_empty() && !render.include_grouping_id {
        warn!(
            values = ?clashes,
            "Grouped values render like the ALL or NULL marker; adding the grouping_id column"
        );
        render.include_grouping_id = true;
    }
    let preview_rows = options.preview_rows.unwrap_or(file.output.preview_rows);
    if preview_rows > 0 {
        info!(
            "Preview (first {} rows):\n{}",
            preview_rows.min(result.num_rows()),
            render_preview(&result, preview_rows, &render)
        );
    }

    let format = options.format.unwrap_or(file.output.format);
    let output_path = match &options.output {
        Some(path) => path.clone(),
        None => {
            let output_dir = file.output.resolved_dir()?;
            let source = file
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.toml", name)));
            default_output_path(&source, &output_dir, format)
        }
    };
    write_result(&result, &output_path, format, &render)?;
    info!("Saved {} rows to {}", result.num_rows(), output_path.display());

    let fingerprint = result_fingerprint(&result)?;
    let elapsed = started.elapsed();
    info!(
        fingerprint = %fingerprint,
        elapsed_ms = elapsed.as_millis() as u64,
        "Finished cube '{}'",
        name
    );

    Ok(RunReport {
        cube: name,
        result,
        output_path,
        fingerprint,
        join_stats,
        elapsed,
    })
}

fn load_table(file: &CubeFile, data_dir: &Path, name: &str) -> RunResult<TypedTable> {
    let settings = file.table(name)?;
    let raw = load_csv(name, &data_dir.join(file.table_file(name)?))?;
    info!(
        rows = raw.num_rows(),
        columns = raw.num_columns(),
        "Loaded table '{}'",
        name
    );

    let (table, stats) = coerce_table_with_stats(&raw, &settings.schema)?;
    if stats.invalid_values > 0 {
        warn!(
            invalid = stats.invalid_values,
            "Table '{}': values that failed to cast were set to NULL", name
        );
    }
    debug!(
        defaults = stats.defaults_applied,
        derived = stats.derived_computed,
        "Coerced table '{}'",
        name
    );
    Ok(table)
}
