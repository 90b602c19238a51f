//! Discovery and selection of timeseries files from a post-processing tree.
//!
//! A variable is usually archived several times at different aggregation
//! window lengths (`5yr`, `20yr`, ...), with overlapping date ranges. The
//! selector walks window lengths from longest to shortest and admits a file
//! only when it starts strictly after the running watermark, yielding the
//! longest continuous record with no duplicate time coverage.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::StitchError;

/// One candidate file in the selection pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSlice {
    pub path: PathBuf,
    /// Aggregation window length in years, from the `<N>yr` path segment.
    pub slice_years: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FileSlice {
    /// Parse window length and date range out of
    /// `.../<N>yr/<stream>.<start>-<end>.<variable>.nc`.
    pub fn from_path(path: &Path) -> Result<Self, StitchError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StitchError::BadFilename(path.display().to_string()))?;
        let slice_dir = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .ok_or_else(|| StitchError::BadFilename(path.display().to_string()))?;
        let slice_years = slice_dir
            .strip_suffix("yr")
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| StitchError::BadFilename(path.display().to_string()))?;

        let token = name
            .split('.')
            .nth(1)
            .ok_or_else(|| StitchError::BadFilename(name.to_string()))?;
        let (start_token, end_token) = token
            .split_once('-')
            .ok_or_else(|| StitchError::BadDateToken(token.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            slice_years,
            start: parse_date_token(start_token)?,
            end: parse_date_token(end_token)?,
        })
    }
}

/// Parse a filename date token at year, year-month or year-month-day
/// granularity, inferred from its length.
pub fn parse_date_token(token: &str) -> Result<NaiveDate, StitchError> {
    let bad = || StitchError::BadDateToken(token.to_string());
    match token.len() {
        4 => {
            let year: i32 = token.parse().map_err(|_| bad())?;
            NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(bad)
        }
        6 => {
            let year: i32 = token[..4].parse().map_err(|_| bad())?;
            let month: u32 = token[4..].parse().map_err(|_| bad())?;
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(bad)
        }
        8 => NaiveDate::parse_from_str(token, "%Y%m%d").map_err(|_| bad()),
        _ => Err(bad()),
    }
}

/// Recursively scan `dir` for files named `*.<variable>.nc`, optionally
/// keeping only paths containing `pattern`.
pub fn discover(
    dir: &Path,
    variable: &str,
    pattern: Option<&str>,
) -> Result<Vec<FileSlice>, StitchError> {
    let suffix = format!(".{}.nc", variable);
    let mut out = Vec::new();
    walk(dir, &suffix, pattern, &mut out)?;
    Ok(out)
}

fn walk(
    dir: &Path,
    suffix: &str,
    pattern: Option<&str>,
    out: &mut Vec<FileSlice>,
) -> Result<(), StitchError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, suffix, pattern, out)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(suffix) {
            continue;
        }
        if let Some(p) = pattern {
            if !path.to_string_lossy().contains(p) {
                continue;
            }
        }
        out.push(FileSlice::from_path(&path)?);
    }
    Ok(())
}

/// Select a monotonic, non-overlapping subset of the pool, preferring the
/// longest available window length.
pub fn build_timeseries(slices: Vec<FileSlice>) -> Vec<FileSlice> {
    let mut lengths: Vec<u32> = slices.iter().map(|s| s.slice_years).collect();
    lengths.sort_unstable();
    lengths.dedup();
    lengths.reverse();

    // Sentinel predating any real data, so the first candidate of the
    // highest-priority group is always admitted.
    let mut watermark = NaiveDate::MIN;
    let mut out = Vec::new();
    for length in lengths {
        let mut group: Vec<&FileSlice> =
            slices.iter().filter(|s| s.slice_years == length).collect();
        group.sort_by(|a, b| (a.start, &a.path).cmp(&(b.start, &b.path)));
        for slice in group {
            if slice.start > watermark {
                watermark = slice.end;
                out.push(slice.clone());
            }
        }
    }
    out
}
