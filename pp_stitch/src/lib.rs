//! Core library for stitching multi-cycle model timeseries.
//!
//! A "cycle" is one run of a repeated forcing experiment; each cycle restarts
//! its clock from its own origin, so the raw per-cycle time axes overlap. This
//! crate re-expresses every cycle under one shared origin, concatenates them
//! into a single monotonic record, selects non-overlapping source files from a
//! pool of mixed-length slices, and plans fixed-length output windows.

use std::path::PathBuf;

use thiserror::Error;

pub mod calendar;
pub mod chunk;
pub mod config;
pub mod dataset;
pub mod layout;
pub mod merge;
pub mod select;
pub mod store;

pub use calendar::{Calendar, TimeUnits, DAYS_PER_YEAR};
pub use chunk::{finalize_segment, plan_windows, slice_window, Window};
pub use config::{CycleConfig, CycleSpec};
pub use dataset::{Dataset, TimeAxis, Variable, TIME_DIM};
pub use layout::{input_timeseries_dir, output_segment_dir, segment_filename, Frequency};
pub use merge::{merge_cycles, merge_two_cycles};
pub use select::{build_timeseries, discover, FileSlice};
pub use store::DatasetStore;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("unsupported calendar '{0}'")]
    UnsupportedCalendar(String),
    #[error("cannot parse time units '{0}': expected \"days since YYYY-MM-DD HH:MM:SS\"")]
    BadUnits(String),
    #[error("shared origin year {0} is out of range")]
    OriginOutOfRange(i64),
    #[error("time axis is empty")]
    EmptyTimeAxis,
    #[error("dataset is missing {0}")]
    MissingMetadata(String),
    #[error("variable '{0}' is not present in both cycles")]
    VariableMismatch(String),
    #[error("variable '{0}' has incompatible shapes across cycles")]
    ShapeMismatch(String),
    #[error("need at least two cycles to merge, got {0}")]
    TooFewCycles(usize),
    #[error("expected {} gap values for {cycles} cycles, got {gaps}", .cycles - 1)]
    GapCountMismatch { cycles: usize, gaps: usize },
    #[error("cannot parse timeseries filename '{0}'")]
    BadFilename(String),
    #[error("cannot parse date token '{0}'")]
    BadDateToken(String),
    #[error("unsupported frequency '{0}' (expected annual, monthly or daily)")]
    UnsupportedFrequency(String),
    #[error("no timeseries files for variable '{variable}' under {}", .dir.display())]
    EmptySelection { variable: String, dir: PathBuf },
    #[error("no samples between years {start} and {end}")]
    EmptyWindow { start: i32, end: i32 },
    #[error("output window length must be positive")]
    BadWindowLength,
    #[error("invalid cycle config: {0}")]
    BadConfig(String),
    #[error("dataset store: {0}")]
    Store(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
