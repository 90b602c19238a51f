//! NetCDF-backed implementation of the dataset store seam.
//!
//! Reads every numeric variable into the in-memory dataset model (values,
//! dimension names, stringified attributes) and writes finished segments back
//! as f64 variables. Container-format concerns stay entirely inside this
//! module.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{Array1, ArrayD, IxDyn};
use netcdf::AttributeValue;
use pp_stitch::dataset::{Dataset, TimeAxis, Variable, TIME_DIM};
use pp_stitch::store::DatasetStore;
use pp_stitch::StitchError;

pub struct NetcdfStore;

impl DatasetStore for NetcdfStore {
    fn open_concat(&self, paths: &[PathBuf]) -> Result<Dataset, StitchError> {
        let mut parts = Vec::with_capacity(paths.len());
        for path in paths {
            parts.push(open_one(path)?);
        }
        if parts.is_empty() {
            return Err(StitchError::EmptyTimeAxis);
        }
        // Combine by coordinates: order parts by their first time offset.
        parts.sort_by(|a, b| {
            let ka = a.time.values.first().copied().unwrap_or(f64::MAX);
            let kb = b.time.values.first().copied().unwrap_or(f64::MAX);
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });
        Dataset::concat_time(parts)
    }

    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), StitchError> {
        let mut file = netcdf::create(path).map_err(|e| store_err(path, &e))?;

        let mut dims: BTreeMap<String, usize> = BTreeMap::new();
        dims.insert(TIME_DIM.to_string(), dataset.time.values.len());
        for (name, var) in &dataset.variables {
            for (dim, len) in var.dims.iter().zip(var.values.shape()) {
                match dims.get(dim) {
                    Some(existing) if existing != len => {
                        return Err(StitchError::ShapeMismatch(name.clone()))
                    }
                    Some(_) => {}
                    None => {
                        dims.insert(dim.clone(), *len);
                    }
                }
            }
        }
        for (dim, len) in &dims {
            file.add_dimension(dim, *len).map_err(|e| store_err(path, &e))?;
        }

        for (key, value) in &dataset.attrs {
            file.add_attribute(key, value.as_str())
                .map_err(|e| store_err(path, &e))?;
        }

        {
            let mut time = file
                .add_variable::<f64>(TIME_DIM, &[TIME_DIM])
                .map_err(|e| store_err(path, &e))?;
            time.put_attribute("units", dataset.time.units.to_string().as_str())
                .map_err(|e| store_err(path, &e))?;
            time.put_attribute("calendar", dataset.time.calendar.as_str())
                .map_err(|e| store_err(path, &e))?;
            for (key, value) in &dataset.time.attrs {
                if key == "units" || key == "calendar" {
                    continue;
                }
                time.put_attribute(key, value.as_str())
                    .map_err(|e| store_err(path, &e))?;
            }
            time.put(.., dataset.time.values.view())
                .map_err(|e| store_err(path, &e))?;
        }

        for (name, var) in &dataset.variables {
            let dim_names: Vec<&str> = var.dims.iter().map(|d| d.as_str()).collect();
            let mut out = file
                .add_variable::<f64>(name, &dim_names)
                .map_err(|e| store_err(path, &e))?;
            for (key, value) in &var.attrs {
                // Fill metadata must keep its numeric type.
                if key == "_FillValue" || key == "missing_value" {
                    if let Ok(numeric) = value.parse::<f64>() {
                        out.put_attribute(key.as_str(), numeric)
                            .map_err(|e| store_err(path, &e))?;
                        continue;
                    }
                }
                out.put_attribute(key.as_str(), value.as_str())
                    .map_err(|e| store_err(path, &e))?;
            }
            out.put(.., var.values.view())
                .map_err(|e| store_err(path, &e))?;
        }
        Ok(())
    }
}

fn open_one(path: &Path) -> Result<Dataset, StitchError> {
    let file = netcdf::open(path).map_err(|e| store_err(path, &e))?;

    let time_var = file.variable(TIME_DIM).ok_or_else(|| {
        StitchError::MissingMetadata(format!("time coordinate in {}", path.display()))
    })?;
    let units = attr_string(&time_var, "units").ok_or_else(|| {
        StitchError::MissingMetadata(format!("time units in {}", path.display()))
    })?;
    let calendar = attr_string(&time_var, "calendar").ok_or_else(|| {
        StitchError::MissingMetadata(format!("time calendar in {}", path.display()))
    })?;
    let values: Vec<f64> = time_var
        .get_values(..)
        .map_err(|e| store_err(path, &e))?;
    let mut time = TimeAxis::new(Array1::from(values), &units, &calendar)?;
    time.attrs = attr_map(&time_var);
    time.attrs.remove("units");
    time.attrs.remove("calendar");

    let mut variables = BTreeMap::new();
    for var in file.variables() {
        let name = var.name();
        if name == TIME_DIM {
            continue;
        }
        // Non-numeric payloads (string labels etc.) are not carried through.
        let Ok(data) = var.get_values::<f64, _>(..) else {
            continue;
        };
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values = ArrayD::from_shape_vec(IxDyn(&shape), data)
            .map_err(|_| StitchError::ShapeMismatch(name.clone()))?;
        variables.insert(
            name,
            Variable {
                values,
                dims,
                attrs: attr_map(&var),
            },
        );
    }

    let mut attrs = BTreeMap::new();
    for attr in file.attributes() {
        if let Some(value) = attr.value().ok().and_then(attr_to_string) {
            attrs.insert(attr.name().to_string(), value);
        }
    }

    Ok(Dataset {
        time,
        variables,
        attrs,
    })
}

fn attr_string(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute(name)
        .and_then(|a| a.value().ok())
        .and_then(attr_to_string)
}

fn attr_map(var: &netcdf::Variable) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for attr in var.attributes() {
        if let Some(value) = attr.value().ok().and_then(attr_to_string) {
            out.insert(attr.name().to_string(), value);
        }
    }
    out
}

fn attr_to_string(value: AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Double(v) => Some(v.to_string()),
        AttributeValue::Float(v) => Some(v.to_string()),
        AttributeValue::Int(v) => Some(v.to_string()),
        AttributeValue::Uint(v) => Some(v.to_string()),
        AttributeValue::Longlong(v) => Some(v.to_string()),
        AttributeValue::Ulonglong(v) => Some(v.to_string()),
        AttributeValue::Short(v) => Some(v.to_string()),
        AttributeValue::Ushort(v) => Some(v.to_string()),
        AttributeValue::Schar(v) => Some(v.to_string()),
        AttributeValue::Uchar(v) => Some(v.to_string()),
        _ => None,
    }
}

fn store_err(path: &Path, err: &dyn std::fmt::Display) -> StitchError {
    StitchError::Store(format!("{}: {}", path.display(), err))
}
