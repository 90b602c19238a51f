//! Seam between the stitching engine and the container file format.
//!
//! The core never touches bytes on disk; a store implementation (the CLI
//! ships a NetCDF-backed one) turns a list of staged files into one
//! [`Dataset`] and writes finished segments back out.

use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::StitchError;

pub trait DatasetStore {
    /// Open every file in `paths` and combine them into one dataset ordered
    /// by time coordinate. Missing time metadata is fatal.
    fn open_concat(&self, paths: &[PathBuf]) -> Result<Dataset, StitchError>;

    /// Write a dataset to `path`, replacing any existing file.
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), StitchError>;
}
