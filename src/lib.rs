//! # starcube
//!
//! Star-schema joins and `GROUP BY CUBE` aggregation over CSV-loaded tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          CSV folder  +  cube file (TOML)                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [io, config]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 RawTable (text fields)                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [coerce]
//! ┌─────────────────────────────────────────────────────────┐
//! │        TypedTable (fact + dimensions, derived cols)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [join]
//! ┌─────────────────────────────────────────────────────────┐
//! │              DenormalizedTable (left outer)              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [cube]
//! ┌─────────────────────────────────────────────────────────┐
//! │     CubeResult: 2^N grouping sets, canonical order       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! `coerce`, `join` and `cube` are pure in-memory stages with no file-system
//! or logging dependency; [`run`] drives them and reports what they did.

pub mod coerce;
pub mod config;
pub mod cube;
pub mod io;
pub mod join;
pub mod logging;
pub mod model;
pub mod run;

pub use cube::{compute_cube, ComputeError, CubeOptions, CubeResult, CubeRow, MeasureSpec};
pub use join::DimensionLink;
