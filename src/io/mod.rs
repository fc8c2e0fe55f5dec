//! File-system edges: CSV input, result output and fingerprints.

mod csv_source;
mod hash;
mod writer;

pub use csv_source::{check_data_dir, load_csv, load_csv_dir, LoadError, LoadResult};
pub use hash::{compute_hash, result_fingerprint};
pub use writer::{
    default_output_path, header, marker_clashes, render_preview, to_json, write_result, OutputFormat,
    RenderOptions, WriteError, WriteResult, GROUPING_ID_COLUMN,
};
