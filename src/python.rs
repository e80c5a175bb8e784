//! Python bindings
//!
//! NOTE: this module is intended for the interface between Rust and Python.
//! The real work happens in the other modules, and they do not use `pyo3`,
//! it's only used here.

use numpy::{PyReadonlyArrayDyn, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyString};

use crate::daily::{daily_mean, DailyInputs};
use crate::error::NetRadiationError;
use crate::field::{scalar_value, Field, IntoField, IntoMask, Mask};
use crate::radiation::net_radiation;
use crate::solar::{Geometry, TimeValue, UtcTime};

impl From<NetRadiationError> for PyErr {
    fn from(e: NetRadiationError) -> Self {
        match e {
            NetRadiationError::ShapeMismatch { .. } => PyValueError::new_err(e.to_string()),
            NetRadiationError::InvalidTimestamp(_) => PyValueError::new_err(e.to_string()),
            NetRadiationError::TimestampOutOfRange(_) => PyValueError::new_err(e.to_string()),
            NetRadiationError::InvalidField(_) => PyValueError::new_err(e.to_string()),
        }
    }
}

/// Let numpy coerce `obj` to an array of `dtype`, whatever its own dtype
fn as_numpy<'py>(obj: &'py PyAny, dtype: &str) -> PyResult<&'py PyAny> {
    obj.py()
        .import("numpy")?
        .call_method1("asarray", (obj, dtype))
}

/// A number, a (nested) list of numbers, or an ndarray of any numeric dtype
fn field_from_py(obj: &PyAny) -> PyResult<Field> {
    if !obj.hasattr("dtype")? {
        if let Ok(value) = obj.extract::<f64>() {
            return Ok(value.into_field());
        }
    }
    let array = as_numpy(obj, "float64")?.extract::<PyReadonlyArrayDyn<f64>>()?;
    Ok(array.as_array().to_owned())
}

/// A bool or number (nonzero is cloudy), a list, or an ndarray of any dtype
fn mask_from_py(obj: &PyAny) -> PyResult<Mask> {
    if !obj.hasattr("dtype")? {
        if let Ok(value) = obj.extract::<bool>() {
            return Ok(value.into_mask());
        }
        if let Ok(value) = obj.extract::<f64>() {
            return Ok((value != 0.0).into_mask());
        }
    }
    let array = as_numpy(obj, "bool")?.extract::<PyReadonlyArrayDyn<bool>>()?;
    Ok(array.as_array().to_owned())
}

/// Pandas series are converted to numpy first
fn field_from_attr(obj: &PyAny, name: &str) -> PyResult<Field> {
    let value = obj.getattr(name)?;
    if value.hasattr("to_numpy")? {
        field_from_py(value.call_method0("to_numpy")?)
    } else {
        field_from_py(value)
    }
}

/// Anything with `.lat`/`.lon`, or a point series with `.x`/`.y`
fn geometry_from_py(obj: &PyAny) -> PyResult<Geometry> {
    if obj.hasattr("lat")? && obj.hasattr("lon")? {
        Ok(Geometry::Spatial {
            lat: field_from_attr(obj, "lat")?,
            lon: field_from_attr(obj, "lon")?,
        })
    } else if obj.hasattr("x")? && obj.hasattr("y")? {
        Ok(Geometry::Points {
            x: field_from_attr(obj, "x")?,
            y: field_from_attr(obj, "y")?,
        })
    } else {
        Err(PyValueError::new_err("geometry needs lat/lon or x/y attributes"))
    }
}

/// Strings are kept as text, datetimes go through `isoformat()`, anything
/// else through `str()`. Parsing happens on the Rust side.
fn time_value_from_py(obj: &PyAny) -> PyResult<TimeValue> {
    if let Ok(text) = obj.downcast::<PyString>() {
        return Ok(TimeValue::Text(text.to_str()?.to_string()));
    }
    if obj.hasattr("isoformat")? {
        return Ok(TimeValue::Text(obj.call_method0("isoformat")?.extract()?));
    }
    Ok(TimeValue::Text(obj.str()?.to_str()?.to_string()))
}

fn time_from_py(obj: &PyAny) -> PyResult<UtcTime> {
    if obj.downcast::<PyString>().is_ok() || obj.hasattr("isoformat")? {
        return Ok(UtcTime::Single(time_value_from_py(obj)?));
    }
    let values = obj
        .iter()?
        .map(|item| item.and_then(time_value_from_py))
        .collect::<PyResult<Vec<_>>>()?;
    Ok(UtcTime::Series(values))
}

/// A float for 0-d results, otherwise an ndarray
fn field_to_py(py: Python<'_>, field: &Field) -> PyObject {
    match scalar_value(field) {
        Some(value) => value.to_object(py),
        None => field.to_pyarray(py).to_object(py),
    }
}

/// Instantaneous net radiation and its components.
///
/// Returns a dict with "SWout", "LWin", "LWout", and "Rn" in W/m^2.
#[pyfunction]
#[pyo3(
    name = "verma_net_radiation",
    signature = (ST_C, emissivity, albedo, SWin, Ta_C, RH, cloud_mask=None)
)]
#[allow(non_snake_case, clippy::too_many_arguments)]
fn net_radiation_py(
    py: Python<'_>,
    ST_C: &PyAny,
    emissivity: &PyAny,
    albedo: &PyAny,
    SWin: &PyAny,
    Ta_C: &PyAny,
    RH: &PyAny,
    cloud_mask: Option<&PyAny>,
) -> PyResult<PyObject> {
    let cloud_mask = cloud_mask.map(mask_from_py).transpose()?;
    let components = net_radiation(
        field_from_py(ST_C)?,
        field_from_py(emissivity)?,
        field_from_py(albedo)?,
        field_from_py(SWin)?,
        field_from_py(Ta_C)?,
        field_from_py(RH)?,
        cloud_mask,
    )?;

    let results = PyDict::new(py);
    for (name, field) in components.iter() {
        results.set_item(name, field_to_py(py, field))?;
    }
    Ok(results.to_object(py))
}

/// Integrate instantaneous net radiation to a daily mean in W/m^2.
///
/// Solar parameters that aren't given are derived from `time_UTC` and the
/// location. If that's not possible, a warning is logged and NaN returned.
#[pyfunction]
#[pyo3(
    name = "daily_Rn_integration_verma",
    signature = (
        Rn_Wm2,
        time_UTC=None,
        geometry=None,
        hour_of_day=None,
        day_of_year=None,
        lat=None,
        lon=None,
        sunrise_hour=None,
        daylight_hours=None
    )
)]
#[allow(non_snake_case, clippy::too_many_arguments)]
fn daily_integration_py(
    py: Python<'_>,
    Rn_Wm2: &PyAny,
    time_UTC: Option<&PyAny>,
    geometry: Option<&PyAny>,
    hour_of_day: Option<&PyAny>,
    day_of_year: Option<&PyAny>,
    lat: Option<&PyAny>,
    lon: Option<&PyAny>,
    sunrise_hour: Option<&PyAny>,
    daylight_hours: Option<&PyAny>,
) -> PyResult<PyObject> {
    let mut inputs = DailyInputs::new();
    if let Some(time) = time_UTC {
        inputs = inputs.time_utc(time_from_py(time)?);
    }
    if let Some(geometry) = geometry {
        inputs = inputs.geometry(geometry_from_py(geometry)?);
    }
    if let Some(hour) = hour_of_day {
        inputs = inputs.hour_of_day(field_from_py(hour)?);
    }
    if let Some(day) = day_of_year {
        inputs = inputs.day_of_year(field_from_py(day)?);
    }
    if let Some(lat) = lat {
        inputs = inputs.lat(field_from_py(lat)?);
    }
    if let Some(lon) = lon {
        inputs = inputs.lon(field_from_py(lon)?);
    }
    if let Some(hour) = sunrise_hour {
        inputs = inputs.sunrise_hour(field_from_py(hour)?);
    }
    if let Some(hours) = daylight_hours {
        inputs = inputs.daylight_hours(field_from_py(hours)?);
    }

    let daily = daily_mean(field_from_py(Rn_Wm2)?, inputs)?;
    Ok(field_to_py(py, &daily))
}

/// A Python module implemented in Rust.
#[pymodule]
fn verma_net_radiation(_py: Python, m: &PyModule) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(net_radiation_py, m)?)?;
    m.add_function(wrap_pyfunction!(daily_integration_py, m)?)?;
    Ok(())
}
