//! In-memory dataset model: a time axis plus a named-variable table.
//!
//! This deliberately carries values and metadata together (the way a labeled
//! dataset library would) without depending on one: each variable is an
//! n-dimensional array, its ordered dimension names, and a string attribute
//! map. Time-valued companion fields such as `average_T1`, `average_T2` and
//! `time_bnds` are recognized by their `units` attribute.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::NaiveDateTime;
use ndarray::{concatenate, Array1, ArrayD, Axis, Slice};

use crate::calendar::{Calendar, TimeUnits};
use crate::StitchError;

/// Name of the record dimension shared by all time-indexed variables.
pub const TIME_DIM: &str = "time";

/// Prefix that marks a variable's `units` attribute as time-valued.
pub const DAYS_SINCE_PREFIX: &str = "days since ";

#[derive(Clone, Debug)]
pub struct TimeAxis {
    pub values: Array1<f64>,
    pub units: TimeUnits,
    /// Raw calendar attribute, preserved verbatim for output metadata.
    pub calendar: String,
    pub attrs: BTreeMap<String, String>,
}

impl TimeAxis {
    /// Build an axis, validating units and calendar up front.
    pub fn new(values: Array1<f64>, units: &str, calendar: &str) -> Result<Self, StitchError> {
        let units = TimeUnits::parse(units)?;
        Calendar::from_attr(calendar)?;
        Ok(Self {
            values,
            units,
            calendar: calendar.to_string(),
            attrs: BTreeMap::new(),
        })
    }

    pub fn calendar_kind(&self) -> Result<Calendar, StitchError> {
        Calendar::from_attr(&self.calendar)
    }

    pub fn first(&self) -> Result<f64, StitchError> {
        self.values.first().copied().ok_or(StitchError::EmptyTimeAxis)
    }

    pub fn last(&self) -> Result<f64, StitchError> {
        self.values.last().copied().ok_or(StitchError::EmptyTimeAxis)
    }

    /// Decode every offset into an absolute instant.
    pub fn decode(&self) -> Vec<NaiveDateTime> {
        self.values.iter().map(|&v| self.units.to_absolute(v)).collect()
    }
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub values: ArrayD<f64>,
    pub dims: Vec<String>,
    pub attrs: BTreeMap<String, String>,
}

impl Variable {
    /// True when this field carries day offsets that must be re-encoded
    /// whenever the dataset origin moves.
    pub fn is_time_valued(&self) -> bool {
        self.attrs
            .get("units")
            .map_or(false, |u| u.starts_with(DAYS_SINCE_PREFIX))
    }

    /// True when the leading dimension is the record dimension.
    pub fn is_time_indexed(&self) -> bool {
        self.dims.first().map_or(false, |d| d == TIME_DIM)
    }

    /// Units of a time-valued field, parsed from its own attributes.
    pub fn time_units(&self) -> Result<TimeUnits, StitchError> {
        let units = self
            .attrs
            .get("units")
            .ok_or_else(|| StitchError::MissingMetadata("units on time-valued field".into()))?;
        TimeUnits::parse(units)
    }
}

#[derive(Clone, Debug)]
pub struct Dataset {
    pub time: TimeAxis,
    pub variables: BTreeMap<String, Variable>,
    pub attrs: BTreeMap<String, String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.time.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.values.is_empty()
    }

    /// Concatenate datasets along the time dimension, keeping the first
    /// part's origin, calendar and attributes. Parts must agree on variable
    /// names; non-time-indexed variables are taken from the first part.
    pub fn concat_time(parts: Vec<Dataset>) -> Result<Dataset, StitchError> {
        let mut iter = parts.into_iter();
        let base = iter.next().ok_or(StitchError::EmptyTimeAxis)?;
        let rest: Vec<Dataset> = iter.collect();

        let mut time_values: Vec<f64> = base.time.values.to_vec();
        for part in &rest {
            time_values.extend(part.time.values.iter().copied());
        }

        let mut variables = BTreeMap::new();
        for (name, var) in &base.variables {
            if !var.is_time_indexed() {
                variables.insert(name.clone(), var.clone());
                continue;
            }
            let mut views = vec![var.values.view()];
            for part in &rest {
                let other = part
                    .variables
                    .get(name)
                    .ok_or_else(|| StitchError::VariableMismatch(name.clone()))?;
                views.push(other.values.view());
            }
            let values = concatenate(Axis(0), &views)
                .map_err(|_| StitchError::ShapeMismatch(name.clone()))?;
            variables.insert(
                name.clone(),
                Variable {
                    values,
                    dims: var.dims.clone(),
                    attrs: var.attrs.clone(),
                },
            );
        }
        for part in &rest {
            for name in part.variables.keys() {
                if !variables.contains_key(name) {
                    return Err(StitchError::VariableMismatch(name.clone()));
                }
            }
        }

        Ok(Dataset {
            time: TimeAxis {
                values: Array1::from(time_values),
                units: base.time.units,
                calendar: base.time.calendar,
                attrs: base.time.attrs,
            },
            variables,
            attrs: base.attrs,
        })
    }

    /// Extract a contiguous index range along the time dimension.
    pub fn select_time(&self, range: Range<usize>) -> Dataset {
        let time_values = self
            .time
            .values
            .slice_axis(Axis(0), Slice::from(range.clone()))
            .to_owned();
        let mut variables = BTreeMap::new();
        for (name, var) in &self.variables {
            let sliced = if var.is_time_indexed() {
                Variable {
                    values: var
                        .values
                        .slice_axis(Axis(0), Slice::from(range.clone()))
                        .to_owned(),
                    dims: var.dims.clone(),
                    attrs: var.attrs.clone(),
                }
            } else {
                var.clone()
            };
            variables.insert(name.clone(), sliced);
        }
        Dataset {
            time: TimeAxis {
                values: time_values,
                units: self.time.units,
                calendar: self.time.calendar.clone(),
                attrs: self.time.attrs.clone(),
            },
            variables,
            attrs: self.attrs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn axis(origin: &str, values: Vec<f64>) -> TimeAxis {
        TimeAxis::new(Array1::from(values), origin, "julian").unwrap()
    }

    fn var1d(values: Vec<f64>) -> Variable {
        let n = values.len();
        Variable {
            values: ArrayD::from_shape_vec(IxDyn(&[n]), values).unwrap(),
            dims: vec![TIME_DIM.to_string()],
            attrs: BTreeMap::new(),
        }
    }

    #[test]
    fn time_valued_detection_uses_units_attr() {
        let mut v = var1d(vec![0.0, 365.0]);
        assert!(!v.is_time_valued());
        v.attrs
            .insert("units".into(), "days since 1958-01-01 00:00:00".into());
        assert!(v.is_time_valued());
        v.attrs.insert("units".into(), "degC".into());
        assert!(!v.is_time_valued());
    }

    #[test]
    fn concat_appends_time_indexed_variables() {
        let mut a_vars = BTreeMap::new();
        a_vars.insert("thetao".to_string(), var1d(vec![1.0, 2.0]));
        let mut b_vars = BTreeMap::new();
        b_vars.insert("thetao".to_string(), var1d(vec![3.0]));
        let a = Dataset {
            time: axis("days since 1958-01-01 00:00:00", vec![0.5, 1.5]),
            variables: a_vars,
            attrs: BTreeMap::new(),
        };
        let b = Dataset {
            time: axis("days since 1958-01-01 00:00:00", vec![2.5]),
            variables: b_vars,
            attrs: BTreeMap::new(),
        };
        let merged = Dataset::concat_time(vec![a, b]).unwrap();
        assert_eq!(merged.time.values.to_vec(), vec![0.5, 1.5, 2.5]);
        assert_eq!(
            merged.variables["thetao"].values.iter().copied().collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn concat_rejects_missing_variable() {
        let mut a_vars = BTreeMap::new();
        a_vars.insert("thetao".to_string(), var1d(vec![1.0]));
        let a = Dataset {
            time: axis("days since 1958-01-01 00:00:00", vec![0.5]),
            variables: a_vars,
            attrs: BTreeMap::new(),
        };
        let b = Dataset {
            time: axis("days since 1958-01-01 00:00:00", vec![1.5]),
            variables: BTreeMap::new(),
            attrs: BTreeMap::new(),
        };
        assert!(matches!(
            Dataset::concat_time(vec![a, b]),
            Err(StitchError::VariableMismatch(_))
        ));
    }

    #[test]
    fn select_time_slices_record_dimension_only() {
        let mut vars = BTreeMap::new();
        vars.insert("thetao".to_string(), var1d(vec![1.0, 2.0, 3.0, 4.0]));
        let mut lat = var1d(vec![10.0, 20.0]);
        lat.dims = vec!["lat".to_string()];
        vars.insert("lat".to_string(), lat);
        let ds = Dataset {
            time: axis("days since 1958-01-01 00:00:00", vec![0.5, 1.5, 2.5, 3.5]),
            variables: vars,
            attrs: BTreeMap::new(),
        };
        let cut = ds.select_time(1..3);
        assert_eq!(cut.time.values.to_vec(), vec![1.5, 2.5]);
        assert_eq!(
            cut.variables["thetao"].values.iter().copied().collect::<Vec<_>>(),
            vec![2.0, 3.0]
        );
        assert_eq!(cut.variables["lat"].values.len(), 2);
    }
}
