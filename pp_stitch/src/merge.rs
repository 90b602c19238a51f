//! Stitching of repeated-cycle datasets onto one shared time origin.
//!
//! Each cycle restarts its clock from a local origin, so the raw offsets of
//! consecutive cycles overlap. [`merge_two_cycles`] derives a synthetic shared
//! origin from the running record's span, re-encodes every time-valued field
//! of both cycles under it, shifts the appended cycle forward by the running
//! span plus any unsimulated gap years, and concatenates. [`merge_cycles`]
//! folds the two-cycle merge strictly left-to-right; the shared origin depends
//! on the running record, so the fold order is part of the contract.

use std::collections::BTreeMap;

use chrono::Datelike;
use ndarray::ArrayD;

use crate::calendar::{TimeUnits, DAYS_PER_YEAR};
use crate::dataset::{Dataset, TimeAxis, Variable};
use crate::StitchError;

/// Merge cycle `b` onto cycle `a`, inserting `gap_years` whole years of
/// unsimulated time between them.
///
/// `a` determines the calendar and, together with `gap_years`, the synthetic
/// shared origin. Both inputs are left untouched; the result owns freshly
/// re-encoded copies of every field.
pub fn merge_two_cycles(a: &Dataset, b: &Dataset, gap_years: i64) -> Result<Dataset, StitchError> {
    let calendar = a.time.calendar_kind()?;
    b.time.calendar_kind()?;

    let first = a.time.first()?;
    let last = a.time.last()?;
    b.time.first()?;

    // Whole years containing a's record; rounds up to the year in progress.
    let years_a = ((last - first) / DAYS_PER_YEAR).floor() as i64 + 1;
    let shift_years = years_a + gap_years;

    // Synthetic origin: far enough before b's origin that both cycles encode
    // as positive offsets, pinned to Jan 1 00:00:00.
    let origin_year = i64::from(b.time.units.origin.year()) - shift_years;
    let shared = TimeUnits::from_origin_year(origin_year)?;

    let shift_days =
        shift_years as f64 * DAYS_PER_YEAR + calendar.leap_days(shift_years) as f64;

    let time_values = {
        let mut v: Vec<f64> = a
            .time
            .values
            .iter()
            .map(|&x| shared.from_absolute(a.time.units.to_absolute(x)))
            .collect();
        v.extend(
            b.time
                .values
                .iter()
                .map(|&x| shared.from_absolute(b.time.units.to_absolute(x + shift_days))),
        );
        v
    };

    let mut variables = BTreeMap::new();
    for (name, var_a) in &a.variables {
        let var_b = b
            .variables
            .get(name)
            .ok_or_else(|| StitchError::VariableMismatch(name.clone()))?;

        if !var_a.is_time_indexed() {
            variables.insert(name.clone(), var_a.clone());
            continue;
        }

        let (values_a, values_b, attrs) = if var_a.is_time_valued() {
            // Each field round-trips through absolute instants with its own
            // units, then lands on the shared origin.
            let units_a = var_a.time_units()?;
            let units_b = var_b.time_units()?;
            let mut attrs = var_a.attrs.clone();
            attrs.insert("units".to_string(), shared.to_string());
            attrs.insert("calendar".to_string(), a.time.calendar.clone());
            (
                reencode(&var_a.values, units_a, shared, 0.0),
                reencode(&var_b.values, units_b, shared, shift_days),
                attrs,
            )
        } else {
            (var_a.values.clone(), var_b.values.clone(), var_a.attrs.clone())
        };

        let merged = ndarray::concatenate(
            ndarray::Axis(0),
            &[values_a.view(), values_b.view()],
        )
        .map_err(|_| StitchError::ShapeMismatch(name.clone()))?;

        variables.insert(
            name.clone(),
            Variable {
                values: merged,
                dims: var_a.dims.clone(),
                attrs,
            },
        );
    }
    for name in b.variables.keys() {
        if !variables.contains_key(name) {
            return Err(StitchError::VariableMismatch(name.clone()));
        }
    }

    Ok(Dataset {
        time: TimeAxis {
            values: time_values.into(),
            units: shared,
            calendar: a.time.calendar.clone(),
            attrs: a.time.attrs.clone(),
        },
        variables,
        attrs: a.attrs.clone(),
    })
}

fn reencode(values: &ArrayD<f64>, own: TimeUnits, shared: TimeUnits, shift_days: f64) -> ArrayD<f64> {
    values.mapv(|v| shared.from_absolute(own.to_absolute(v + shift_days)))
}

/// Fold an ordered list of cycles into one continuous record.
///
/// `gaps` holds one whole-year gap per adjacent pair; `None` means no gap
/// anywhere. The fold is strictly left-to-right.
pub fn merge_cycles(
    cycles: Vec<Dataset>,
    gaps: Option<Vec<i64>>,
) -> Result<Dataset, StitchError> {
    if cycles.len() < 2 {
        return Err(StitchError::TooFewCycles(cycles.len()));
    }
    let gaps = match gaps {
        Some(g) if g.len() != cycles.len() - 1 => {
            return Err(StitchError::GapCountMismatch {
                cycles: cycles.len(),
                gaps: g.len(),
            })
        }
        Some(g) => g,
        None => vec![0; cycles.len() - 1],
    };

    let mut iter = cycles.into_iter();
    let mut acc = iter.next().ok_or(StitchError::TooFewCycles(0))?;
    for (cycle, gap) in iter.zip(gaps) {
        acc = merge_two_cycles(&acc, &cycle, gap)?;
    }
    Ok(acc)
}
