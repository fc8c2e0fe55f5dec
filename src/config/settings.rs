//! TOML cube files.
//!
//! A cube file names the tables to load, their typed columns, the star
//! relationships, and the cube to compute. Paths support `${VAR}` expansion.
//!
//! Example:
//! ```toml
//! [source]
//! data_dir = "data"
//!
//! [tables.fact_sales]
//! columns = [
//!     { name = "customer_id", type = "int", cast = "strict" },
//!     { name = "quantity", type = "int", default = "0" },
//!     { name = "unit_price", type = "float" },
//!     { name = "discount", type = "float", default = "0" },
//! ]
//! derived = [
//!     { name = "sales_amount", type = "float", expr = "quantity * unit_price - discount" },
//! ]
//!
//! [tables.dim_customer]
//! columns = [
//!     { name = "customer_id", type = "int", cast = "strict" },
//!     { name = "region", type = "text" },
//! ]
//!
//! [star]
//! fact = "fact_sales"
//! dimensions = [
//!     { table = "dim_customer", key = "customer_id", foreign_key = "customer_id", alias = "c" },
//! ]
//!
//! [cube]
//! group_by = ["c.region"]
//! measures = [
//!     { function = "sum", column = "quantity" },
//!     { function = "sum", column = "sales_amount", alias = "sales" },
//! ]
//!
//! [output]
//! dir = "outputs"
//! format = "csv"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coerce::{check_schema, CoerceError};
use crate::cube::{Cube, CubeError, CubeOptions, CubeSpec};
use crate::io::{OutputFormat, RenderOptions};
use crate::join::{plan_join, DimensionLink, JoinError, JoinPlan};
use crate::model::{TableSchema, TypedColumn};

/// Environment variable naming a cube file when none is given explicitly.
pub const CONFIG_ENV_VAR: &str = "STARCUBE_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No cube file given and STARCUBE_CONFIG is not set")]
    NoConfig,

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Table not declared: {0}")]
    UnknownTable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Schema(#[from] CoerceError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Cube(#[from] CubeError),
}

/// Root of a cube file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CubeFile {
    /// Where the CSV files live.
    pub source: SourceSettings,

    /// Declared tables, keyed by table name.
    pub tables: BTreeMap<String, TableSettings>,

    /// Fact table and its dimensions.
    pub star: StarSettings,

    /// Grouping attributes and measures.
    pub cube: CubeSettings,

    pub output: OutputSettings,

    pub engine: EngineSettings,

    /// File the settings were read from, if any.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

/// Input location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceSettings {
    /// CSV folder, relative to the cube file. Overridden on the command line.
    pub data_dir: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

/// One table: its CSV file and typed schema.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TableSettings {
    /// CSV file name inside the data folder (defaults to `<table>.csv`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(flatten)]
    pub schema: TableSchema,
}

/// Star relationships.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StarSettings {
    pub fact: String,
    pub dimensions: Vec<DimensionLink>,
}

/// The cube request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CubeSettings {
    /// Display name; defaults to the cube file stem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub spec: CubeSpec,
}

/// Result rendering and location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Root folder for result files.
    pub dir: String,

    pub format: OutputFormat,

    /// Text written for rolled-up attributes.
    pub all_marker: String,

    /// Text written for NULL values in CSV output.
    pub null_marker: String,

    /// Add a `grouping_id` column.
    pub include_grouping_id: bool,

    /// Rows logged as a preview after a run.
    pub preview_rows: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: "outputs".to_string(),
            format: OutputFormat::Csv,
            all_marker: "ALL".to_string(),
            null_marker: String::new(),
            include_grouping_id: false,
            preview_rows: 10,
        }
    }
}

impl OutputSettings {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            all_marker: self.all_marker.clone(),
            null_marker: self.null_marker.clone(),
            include_grouping_id: self.include_grouping_id,
        }
    }

    /// Output folder with environment variables expanded.
    pub fn resolved_dir(&self) -> Result<PathBuf, SettingsError> {
        expand_env_vars(&self.dir).map(PathBuf::from)
    }
}

/// Aggregation engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Fold large inputs in parallel partitions.
    pub parallel: bool,

    /// Rows per partition.
    pub partition_rows: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let options = CubeOptions::default();
        Self {
            parallel: options.parallel,
            partition_rows: options.partition_rows,
        }
    }
}

impl EngineSettings {
    pub fn options(&self) -> CubeOptions {
        CubeOptions {
            parallel: self.parallel,
            partition_rows: self.partition_rows,
        }
    }
}

impl CubeFile {
    /// Load a cube file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut file = Self::from_toml(&content)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load the cube file at `path`, or the one named by `STARCUBE_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::from_file(Self::resolve_path(path)?)
    }

    /// `path` if given, else `STARCUBE_CONFIG` with variables expanded.
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf, SettingsError> {
        if let Some(path) = path {
            return Ok(path.to_path_buf());
        }
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Ok(PathBuf::from(expand_env_vars(&path)?)),
            Err(_) => Err(SettingsError::NoConfig),
        }
    }

    /// Display name of the cube.
    pub fn name(&self) -> String {
        self.cube
            .name
            .clone()
            .or_else(|| {
                self.path
                    .as_ref()
                    .and_then(|p| p.file_stem())
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "cube".to_string())
    }

    pub fn table(&self, name: &str) -> Result<&TableSettings, SettingsError> {
        self.tables
            .get(name)
            .ok_or_else(|| SettingsError::UnknownTable(name.to_string()))
    }

    /// CSV file name of a declared table.
    pub fn table_file(&self, name: &str) -> Result<String, SettingsError> {
        let table = self.table(name)?;
        Ok(table
            .file
            .clone()
            .unwrap_or_else(|| format!("{}.csv", name)))
    }

    /// Data folder: `override_dir` if given, else `source.data_dir` resolved
    /// against the cube file's folder.
    pub fn data_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf, SettingsError> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        let dir = PathBuf::from(expand_env_vars(&self.source.data_dir)?);
        if dir.is_absolute() {
            return Ok(dir);
        }
        let base = self
            .path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(base.join(dir))
    }

    /// Plan the star join from declared schemas alone.
    pub fn join_plan(&self) -> Result<JoinPlan, SettingsError> {
        let fact = self.table(&self.star.fact)?;
        let fact_columns = fact.schema.output_columns();

        let dimension_columns = self
            .star
            .dimensions
            .iter()
            .map(|link| -> Result<Vec<TypedColumn>, SettingsError> {
                Ok(self.table(&link.table)?.schema.output_columns())
            })
            .collect::<Result<Vec<_>, _>>()?;
        let dimensions: Vec<_> = self
            .star
            .dimensions
            .iter()
            .zip(&dimension_columns)
            .map(|(link, columns)| (link, columns.as_slice()))
            .collect();

        Ok(plan_join(&self.star.fact, &fact_columns, &dimensions)?)
    }

    /// Check the whole file without reading any data: table schemas, join
    /// keys, grouping attributes and measures. Returns the bound cube.
    pub fn validate(&self) -> Result<Cube, SettingsError> {
        if self.star.fact.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "star.fact is not set".to_string(),
            ));
        }
        if self.engine.partition_rows == 0 {
            return Err(SettingsError::InvalidConfig(
                "engine.partition_rows must be positive".to_string(),
            ));
        }

        for name in self.star_tables() {
            check_schema(name, &self.table(name)?.schema)?;
        }

        let plan = self.join_plan()?;
        Ok(Cube::bind(&plan.schema, &self.cube.spec)?)
    }

    /// Fact table first, then dimensions in declaration order.
    pub fn star_tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.star.fact.as_str())
            .chain(self.star.dimensions.iter().map(|d| d.table.as_str()))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.next_if_eq(&'{').is_some() {
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Lone `$`
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
