//! starcube CLI - Compute GROUP BY CUBE results over a CSV star schema
//!
//! Usage:
//!   starcube run <cube.toml> [DATA_DIR] [--log-file <path>] [--output <path>]
//!   starcube validate <cube.toml>
//!   starcube tables <DATA_DIR>
//!
//! Examples:
//!   starcube run demos/sample_schema/cube.toml
//!   starcube run queries/week3/sales_cube.toml data/ --format json --preview 20
//!   starcube tables demos/sample_schema/data

use clap::{Parser, Subcommand, ValueEnum};
use starcube::config::CubeFile;
use starcube::io::{check_data_dir, load_csv_dir, OutputFormat};
use starcube::logging::init_logging;
use starcube::run::{run_cube, RunOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "starcube")]
#[command(about = "starcube - Star-schema joins and GROUP BY CUBE over CSV tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the tables, compute the cube and write the result
    Run {
        /// Path to the cube file (defaults to $STARCUBE_CONFIG)
        file: Option<PathBuf>,

        /// Folder holding the CSV files (overrides source.data_dir)
        data_dir: Option<PathBuf>,

        /// Also write the log to this file (default: logs/<cube>.log)
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Result file (default: derived from the cube file path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Result format
        #[arg(short, long)]
        format: Option<FormatArg>,

        /// Rows to show in the logged preview
        #[arg(long)]
        preview: Option<usize>,

        /// Log debug details
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a cube file without reading any data
    Validate {
        /// Path to the cube file
        file: PathBuf,
    },

    /// List the CSV tables of a data folder
    Tables {
        /// Folder holding the CSV files
        data_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            data_dir,
            log_file,
            output,
            format,
            preview,
            verbose,
        } => {
            let options = RunOptions {
                data_dir,
                output,
                format: format.map(Into::into),
                preview_rows: preview,
            };
            cmd_run(file, log_file, options, verbose)
        }
        Commands::Validate { file } => cmd_validate(file),
        Commands::Tables { data_dir } => cmd_tables(data_dir),
    }
}

/// The cube file must exist and carry a `.toml` extension.
fn check_cube_file(file: &Path) -> Result<(), String> {
    if !file.is_file() {
        return Err(format!("cube file not found: {}", file.display()));
    }
    let is_toml = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if !is_toml {
        return Err(format!("not a .toml cube file: {}", file.display()));
    }
    Ok(())
}

fn cmd_run(
    file: Option<PathBuf>,
    log_file: Option<PathBuf>,
    options: RunOptions,
    verbose: bool,
) -> ExitCode {
    let file = match CubeFile::resolve_path(file.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = check_cube_file(&file) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    if let Some(dir) = &options.data_dir {
        if let Err(e) = check_data_dir(dir) {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let log_file = log_file.unwrap_or_else(|| {
        let stem = file.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from("logs").join(format!("{}.log", stem))
    });
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    if let Err(e) = init_logging(Some(&log_file), level) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let cube_file = match CubeFile::from_file(&file) {
        Ok(f) => f,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_cube(&cube_file, &options) {
        Ok(report) => {
            println!(
                "{}: {} rows -> {}",
                report.cube,
                report.result.num_rows(),
                report.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Cube run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(file: PathBuf) -> ExitCode {
    if let Err(e) = check_cube_file(&file) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let cube_file = match CubeFile::from_file(&file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cube_file.validate() {
        Ok(cube) => {
            println!("OK: {} is valid", file.display());
            println!("  Attributes:    {}", cube.attribute_names().join(", "));
            println!("  Measures:      {}", cube.measure_labels().join(", "));
            println!("  Grouping sets: {}", cube.grouping_sets().len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Validation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_tables(data_dir: PathBuf) -> ExitCode {
    let tables = match load_csv_dir(&data_dir) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Folder: {}", data_dir.display());
    println!();
    if tables.is_empty() {
        println!("No CSV tables found.");
        return ExitCode::SUCCESS;
    }

    println!("Tables:");
    for (name, table) in &tables {
        println!(
            "  - {} ({} rows, {} columns: {})",
            name,
            table.num_rows(),
            table.num_columns(),
            table.headers.join(", ")
        );
    }
    ExitCode::SUCCESS
}
