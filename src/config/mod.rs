//! Configuration module for starcube.
//!
//! Handles cube files, environment variable expansion and fail-fast validation.

mod settings;

pub use settings::{
    expand_env_vars, CubeFile, CubeSettings, EngineSettings, OutputSettings, SettingsError,
    SourceSettings, StarSettings, TableSettings, CONFIG_ENV_VAR,
};
