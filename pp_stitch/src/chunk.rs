//! Re-chunking of a stitched record into fixed-length year windows.
//!
//! Window planning works per source cycle: each cycle's data years are tiled
//! with `window_years`-long windows, the first window of a cycle starts after
//! that cycle's lead gap, and the final window holds whatever remainder years
//! are left rather than spilling into the next cycle. The extracted slice is
//! clamped to the years actually present, so a nominal window reaching past
//! the end of the data shrinks instead of failing.

use chrono::Datelike;
use ndarray::{Array2, ArrayD};

use crate::dataset::{Dataset, TimeAxis, Variable, TIME_DIM};
use crate::StitchError;

/// One output window, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start_year: i32,
    pub end_year: i32,
}

/// Plan output windows for a stitched record whose first sample falls in
/// `first_year`. `cycle_years` and `lead_gaps` come from the cycle config.
pub fn plan_windows(
    first_year: i32,
    cycle_years: &[u32],
    lead_gaps: &[u32],
    window_years: u32,
) -> Result<Vec<Window>, StitchError> {
    if window_years == 0 {
        return Err(StitchError::BadWindowLength);
    }
    if cycle_years.len() != lead_gaps.len() {
        return Err(StitchError::GapCountMismatch {
            cycles: cycle_years.len(),
            gaps: lead_gaps.len(),
        });
    }

    let window = window_years as i32;
    let mut begin = first_year;
    let mut out = Vec::new();
    for (&len, &gap) in cycle_years.iter().zip(lead_gaps) {
        let cycle_start = begin + gap as i32;
        let cycle_end = cycle_start + len as i32 - 1;
        let mut start = cycle_start;
        while start <= cycle_end {
            let end = (start + window - 1).min(cycle_end);
            out.push(Window {
                start_year: start,
                end_year: end,
            });
            start = end + 1;
        }
        begin = cycle_end + 1;
    }
    Ok(out)
}

/// Extract the samples whose decoded calendar year falls inside `window`.
pub fn slice_window(dataset: &Dataset, window: &Window) -> Result<Dataset, StitchError> {
    let decoded = dataset.time.decode();
    let mut first = None;
    let mut last = 0usize;
    for (idx, instant) in decoded.iter().enumerate() {
        let year = instant.year();
        if year >= window.start_year && year <= window.end_year {
            first.get_or_insert(idx);
            last = idx;
        }
    }
    let first = first.ok_or(StitchError::EmptyWindow {
        start: window.start_year,
        end: window.end_year,
    })?;
    Ok(dataset.select_time(first..last + 1))
}

/// Final fixes applied to one output segment before writing, mirroring the
/// metadata conventions of the upstream post-processing chain:
/// `time_bnds` is rebuilt from the average bounds, the average bounds get an
/// explicit missing value, coordinates lose any inherited `_FillValue`, and
/// the segment records its own filename as a global attribute.
pub fn finalize_segment(segment: &mut Dataset, filename: &str) {
    for var in segment.variables.values_mut() {
        if !var.is_time_indexed() {
            var.attrs.remove("_FillValue");
        }
    }
    for name in ["average_T1", "average_T2"] {
        if let Some(var) = segment.variables.get_mut(name) {
            var.attrs.insert("_FillValue".to_string(), "1e+20".to_string());
            var.attrs
                .insert("missing_value".to_string(), "1e+20".to_string());
        }
    }

    let bounds = match (
        segment.variables.get("average_T1"),
        segment.variables.get("average_T2"),
    ) {
        (Some(t1), Some(t2)) if t1.values.len() == t2.values.len() => {
            let n = t1.values.len();
            let mut values = Array2::<f64>::zeros((n, 2));
            for (i, (&lo, &hi)) in t1.values.iter().zip(t2.values.iter()).enumerate() {
                values[[i, 0]] = lo;
                values[[i, 1]] = hi;
            }
            Some(values.into_dyn())
        }
        _ => None,
    };
    if let Some(values) = bounds {
        let bnds = time_bounds_variable(&segment.time, values);
        segment.variables.insert("time_bnds".to_string(), bnds);
    }

    segment
        .attrs
        .insert("filename".to_string(), filename.to_string());
}

fn time_bounds_variable(time: &TimeAxis, values: ArrayD<f64>) -> Variable {
    let mut attrs = std::collections::BTreeMap::new();
    attrs.insert("long_name".to_string(), "time axis boundaries".to_string());
    attrs.insert("units".to_string(), time.units.to_string());
    attrs.insert("calendar".to_string(), time.calendar.clone());
    Variable {
        values,
        dims: vec![TIME_DIM.to_string(), "nv".to_string()],
        attrs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TimeAxis;
    use ndarray::{Array1, IxDyn};
    use std::collections::BTreeMap;

    #[test]
    fn remainder_years_form_a_short_final_window() {
        // 64 data years with 20-year windows: three full windows, then the
        // four remainder years.
        let windows = plan_windows(2000, &[64], &[0], 20).unwrap();
        assert_eq!(
            windows,
            vec![
                Window { start_year: 2000, end_year: 2019 },
                Window { start_year: 2020, end_year: 2039 },
                Window { start_year: 2040, end_year: 2059 },
                Window { start_year: 2060, end_year: 2063 },
            ]
        );
    }

    #[test]
    fn lead_gaps_shift_each_cycles_first_window() {
        let windows = plan_windows(1958, &[60, 60], &[0, 1], 20).unwrap();
        assert_eq!(windows.len(), 6);
        // First cycle tiles 1958..2017.
        assert_eq!(windows[0], Window { start_year: 1958, end_year: 1977 });
        assert_eq!(windows[2], Window { start_year: 1998, end_year: 2017 });
        // Second cycle skips its one gap year before tiling.
        assert_eq!(windows[3], Window { start_year: 2019, end_year: 2038 });
        assert_eq!(windows[5], Window { start_year: 2059, end_year: 2078 });
    }

    #[test]
    fn six_cycle_production_layout() {
        let windows =
            plan_windows(1958, &[60, 60, 60, 61, 61, 61], &[0, 1, 1, 1, 0, 0], 20).unwrap();
        // 3 + 3 + 3 + 4 + 4 + 4 windows; the 61-year cycles end with a
        // single remainder year.
        assert_eq!(windows.len(), 21);
        let fourth_cycle = &windows[9..13];
        assert_eq!(fourth_cycle[0].start_year, fourth_cycle[0].end_year - 19);
        assert_eq!(
            fourth_cycle[3].start_year,
            fourth_cycle[3].end_year
        );
        // No window overlaps and no year is skipped inside a cycle.
        for pair in windows.windows(2) {
            assert!(pair[0].end_year < pair[1].start_year);
        }
    }

    #[test]
    fn zero_window_length_is_rejected() {
        assert!(matches!(
            plan_windows(2000, &[60], &[0], 0),
            Err(StitchError::BadWindowLength)
        ));
        assert!(matches!(
            plan_windows(2000, &[60, 60], &[0], 20),
            Err(StitchError::GapCountMismatch { .. })
        ));
    }

    fn yearly_dataset(origin_year: i32, years: usize) -> Dataset {
        let units = format!("days since {:04}-01-01 00:00:00", origin_year);
        let time: Vec<f64> = (0..years).map(|k| 182.5 + 365.25 * k as f64).collect();
        let mut variables = BTreeMap::new();
        for (name, offset) in [("average_T1", 0.0), ("average_T2", 365.0)] {
            let values: Vec<f64> = (0..years).map(|k| 365.25 * k as f64 + offset).collect();
            let mut attrs = BTreeMap::new();
            attrs.insert("units".to_string(), units.clone());
            variables.insert(
                name.to_string(),
                Variable {
                    values: ArrayD::from_shape_vec(IxDyn(&[years]), values).unwrap(),
                    dims: vec![TIME_DIM.to_string()],
                    attrs,
                },
            );
        }
        Dataset {
            time: TimeAxis::new(Array1::from(time), &units, "julian").unwrap(),
            variables,
            attrs: BTreeMap::new(),
        }
    }

    #[test]
    fn slice_window_selects_inclusive_year_range() {
        let ds = yearly_dataset(2000, 10);
        let cut = slice_window(&ds, &Window { start_year: 2002, end_year: 2004 }).unwrap();
        assert_eq!(cut.len(), 3);
        let years: Vec<i32> = cut.time.decode().iter().map(|t| t.year()).collect();
        assert_eq!(years, vec![2002, 2003, 2004]);
    }

    #[test]
    fn final_window_clamps_to_available_years() {
        let ds = yearly_dataset(2000, 4);
        // Nominal window runs to 2019 but only 2000..2003 exist.
        let cut = slice_window(&ds, &Window { start_year: 2000, end_year: 2019 }).unwrap();
        assert_eq!(cut.len(), 4);
        let last = *cut.time.decode().last().unwrap();
        assert_eq!(last.year(), 2003);
    }

    #[test]
    fn window_outside_data_is_an_error() {
        let ds = yearly_dataset(2000, 4);
        assert!(matches!(
            slice_window(&ds, &Window { start_year: 2050, end_year: 2069 }),
            Err(StitchError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn finalize_rebuilds_time_bounds_and_stamps_filename() {
        let mut ds = yearly_dataset(2000, 3);
        finalize_segment(&mut ds, "ocean_annual.2000-2002.thetao.nc");

        let bnds = &ds.variables["time_bnds"];
        assert_eq!(bnds.values.shape(), &[3, 2]);
        assert_eq!(bnds.dims, vec!["time".to_string(), "nv".to_string()]);
        assert_eq!(bnds.values[[1, 0]], 365.25);
        assert_eq!(bnds.values[[1, 1]], 365.25 + 365.0);
        assert_eq!(bnds.attrs["long_name"].as_str(), "time axis boundaries");
        assert_eq!(bnds.attrs["units"].as_str(), "days since 2000-01-01 00:00:00");

        let t1 = &ds.variables["average_T1"];
        assert_eq!(t1.attrs["missing_value"].as_str(), "1e+20");
        assert_eq!(t1.attrs["_FillValue"].as_str(), "1e+20");
        assert_eq!(
            ds.attrs["filename"].as_str(),
            "ocean_annual.2000-2002.thetao.nc"
        );
    }
}
