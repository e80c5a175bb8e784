//! Daily integration of instantaneous net radiation
//!
//! An instantaneous flux is scaled to a daily mean by assuming a sinusoidal
//! course of radiation between sunrise and sunset (Verma et al., 2016):
//!
//! ```text
//! Rn_daily = 1.6 * Rn / (π * sin(π * (hour - sunrise) / daylight))
//! ```
//!
//! The hour of day, sunrise hour and day length may be given directly, or
//! derived from a UTC time and a location. See [`ResolutionStage`] for the
//! order in which missing values are filled in.

use std::f64::consts::PI;

use log::{debug, warn};
use ndarray::Ix2;

use crate::error::{NetRadiationError, Result};
use crate::field::{nan_like, zip_with2, zip_with3, Field, IntoField};
use crate::solar::{
    ApparentSolarTime, Geometry, SolarCalendar, SpencerSunAngles, SunAngles, TimeReference,
    UtcTime,
};

/// Scaling between the sinusoidal integral and the daily mean
const DAILY_SCALE: f64 = 1.6;

/// Optional inputs for the daily integration.
///
/// Anything not set here is derived where possible.
#[derive(Debug, Clone, Default)]
pub struct DailyInputs {
    time_utc: Option<UtcTime>,
    geometry: Option<Geometry>,
    hour_of_day: Option<Field>,
    day_of_year: Option<Field>,
    lat: Option<Field>,
    lon: Option<Field>,
    sunrise_hour: Option<Field>,
    daylight_hours: Option<Field>,
}

impl DailyInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// UTC time of the observation(s).
    pub fn time_utc(mut self, time: impl Into<UtcTime>) -> Self {
        self.time_utc = Some(time.into());
        self
    }

    /// Location, used for any of latitude and longitude not set directly.
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Local solar hour of the observation.
    pub fn hour_of_day(mut self, hour: impl IntoField) -> Self {
        self.hour_of_day = Some(hour.into_field());
        self
    }

    pub fn day_of_year(mut self, day: impl IntoField) -> Self {
        self.day_of_year = Some(day.into_field());
        self
    }

    /// Latitude in degrees.
    pub fn lat(mut self, lat: impl IntoField) -> Self {
        self.lat = Some(lat.into_field());
        self
    }

    /// Longitude in degrees.
    pub fn lon(mut self, lon: impl IntoField) -> Self {
        self.lon = Some(lon.into_field());
        self
    }

    /// Local solar hour of sunrise.
    pub fn sunrise_hour(mut self, hour: impl IntoField) -> Self {
        self.sunrise_hour = Some(hour.into_field());
        self
    }

    /// Hours between sunrise and sunset.
    pub fn daylight_hours(mut self, hours: impl IntoField) -> Self {
        self.daylight_hours = Some(hours.into_field());
        self
    }
}

/// The solar parameters the integration needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolarParameter {
    HourOfDay,
    SunriseHour,
    DaylightHours,
}

/// One step of filling in missing solar parameters.
///
/// Stages always run in [`ResolutionStage::ORDER`]; each one fills its gap
/// when it has what it needs and otherwise leaves everything as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    /// Latitude and longitude from the geometry
    Location,
    /// Day of year from the UTC time and longitude
    DayOfYear,
    /// Hour of day from the UTC time and longitude
    HourOfDay,
    /// Sunrise hour and day length from day of year and latitude
    SunGeometry,
}

impl ResolutionStage {
    pub const ORDER: [ResolutionStage; 4] = [
        ResolutionStage::Location,
        ResolutionStage::DayOfYear,
        ResolutionStage::HourOfDay,
        ResolutionStage::SunGeometry,
    ];
}

/// Solar parameters after resolution. Any of them may still be missing.
#[derive(Debug, Clone, Default)]
pub struct SolarParameters {
    time_utc: Option<UtcTime>,
    time: Option<TimeReference>,
    geometry: Option<Geometry>,
    pub lat: Option<Field>,
    pub lon: Option<Field>,
    pub day_of_year: Option<Field>,
    pub hour_of_day: Option<Field>,
    pub sunrise_hour: Option<Field>,
    pub daylight_hours: Option<Field>,
}

impl From<DailyInputs> for SolarParameters {
    fn from(inputs: DailyInputs) -> Self {
        Self {
            time_utc: inputs.time_utc,
            time: None,
            geometry: inputs.geometry,
            lat: inputs.lat,
            lon: inputs.lon,
            day_of_year: inputs.day_of_year,
            hour_of_day: inputs.hour_of_day,
            sunrise_hour: inputs.sunrise_hour,
            daylight_hours: inputs.daylight_hours,
        }
    }
}

impl SolarParameters {
    /// Parameters the integration needs that are still missing.
    pub fn missing(&self) -> Vec<SolarParameter> {
        let mut missing = Vec::new();
        if self.hour_of_day.is_none() {
            missing.push(SolarParameter::HourOfDay);
        }
        if self.sunrise_hour.is_none() {
            missing.push(SolarParameter::SunriseHour);
        }
        if self.daylight_hours.is_none() {
            missing.push(SolarParameter::DaylightHours);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.hour_of_day.is_some() && self.sunrise_hour.is_some() && self.daylight_hours.is_some()
    }

    /// Parse the UTC time on first use. Unparseable text is an error.
    fn time_reference(&mut self) -> Result<Option<&TimeReference>> {
        if self.time.is_none() {
            if let Some(time_utc) = &self.time_utc {
                self.time = Some(TimeReference::new(time_utc)?);
            }
        }
        Ok(self.time.as_ref())
    }
}

/// Outcome of a daily integration.
#[derive(Debug, Clone)]
pub enum DailyIntegration {
    /// Daily mean flux in W/m^2.
    Integrated(Field),
    /// Not enough information to place the observation in the solar day. The
    /// flux is all NaN, shaped like the instantaneous input.
    Unresolved {
        flux: Field,
        missing: Vec<SolarParameter>,
    },
}

impl DailyIntegration {
    pub fn flux(&self) -> &Field {
        match self {
            DailyIntegration::Integrated(flux) => flux,
            DailyIntegration::Unresolved { flux, .. } => flux,
        }
    }

    pub fn into_flux(self) -> Field {
        match self {
            DailyIntegration::Integrated(flux) => flux,
            DailyIntegration::Unresolved { flux, .. } => flux,
        }
    }
}

/// Integrates instantaneous fluxes to daily means, deriving the solar
/// geometry with a pluggable calendar and sun-angle model.
#[derive(Debug, Clone, Default)]
pub struct SolarDayIntegrator<C = ApparentSolarTime, A = SpencerSunAngles> {
    calendar: C,
    angles: A,
}

impl<C: SolarCalendar, A: SunAngles> SolarDayIntegrator<C, A> {
    pub fn new(calendar: C, angles: A) -> Self {
        Self { calendar, angles }
    }

    /// Fill in as many missing solar parameters as possible.
    ///
    /// Stops early once hour of day, sunrise hour and daylight hours are all
    /// known.
    pub fn resolve(&self, inputs: DailyInputs) -> Result<SolarParameters> {
        let mut params = SolarParameters::from(inputs);
        for stage in ResolutionStage::ORDER {
            if params.is_complete() {
                break;
            }
            self.apply(stage, &mut params)?;
        }
        Ok(params)
    }

    fn apply(&self, stage: ResolutionStage, params: &mut SolarParameters) -> Result<()> {
        match stage {
            ResolutionStage::Location => {
                if let Some(geometry) = &params.geometry {
                    if params.lat.is_none() {
                        params.lat = Some(geometry.lat().clone());
                    }
                    if params.lon.is_none() {
                        params.lon = Some(geometry.lon().clone());
                    }
                }
            }
            ResolutionStage::DayOfYear => {
                if params.day_of_year.is_none() && params.time_utc.is_some() {
                    let lon = params.lon.clone();
                    let day_of_year = match (params.time_reference()?, &lon) {
                        (Some(time), Some(lon)) => Some(self.calendar.day_of_year(time, lon)?),
                        _ => None,
                    };
                    if day_of_year.is_none() {
                        debug!("no longitude, can't derive the solar day of year");
                    }
                    params.day_of_year = day_of_year;
                }
            }
            ResolutionStage::HourOfDay => {
                if params.hour_of_day.is_none() && params.time_utc.is_some() {
                    let lon = params.lon.clone();
                    let hour_of_day = match (params.time_reference()?, &lon) {
                        (Some(time), Some(lon)) => {
                            Some(per_observation(self.calendar.hour_of_day(time, lon)?, time)?)
                        }
                        _ => None,
                    };
                    if hour_of_day.is_none() {
                        debug!("no longitude, can't derive the solar hour of day");
                    }
                    params.hour_of_day = hour_of_day;
                }
            }
            ResolutionStage::SunGeometry => {
                if params.daylight_hours.is_some() && params.sunrise_hour.is_some() {
                    return Ok(());
                }
                if let (Some(day_of_year), Some(lat)) = (&params.day_of_year, &params.lat) {
                    let hour_angle = self.angles.hour_angle_deg(day_of_year, lat)?;
                    if params.daylight_hours.is_none() {
                        params.daylight_hours = Some(self.angles.daylight_hours(&hour_angle));
                    }
                    if params.sunrise_hour.is_none() {
                        params.sunrise_hour = Some(self.angles.sunrise_hour(&hour_angle));
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve the solar parameters and integrate `rn`.
    ///
    /// Missing parameters are not an error: the result is
    /// [`DailyIntegration::Unresolved`] with an all-NaN flux.
    pub fn integrate(&self, rn: &Field, inputs: DailyInputs) -> Result<DailyIntegration> {
        let params = self.resolve(inputs)?;
        match (&params.hour_of_day, &params.sunrise_hour, &params.daylight_hours) {
            (Some(hour), Some(sunrise), Some(daylight)) => Ok(DailyIntegration::Integrated(
                integrate_daily(rn, hour, sunrise, daylight)?,
            )),
            _ => Ok(DailyIntegration::Unresolved {
                flux: nan_like(rn),
                missing: params.missing(),
            }),
        }
    }

    /// Daily mean of the instantaneous flux `rn` in W/m^2.
    ///
    /// When the solar geometry can't be resolved this logs a warning and
    /// returns NaN shaped like `rn`.
    pub fn daily_mean(&self, rn: impl IntoField, inputs: DailyInputs) -> Result<Field> {
        let rn = rn.into_field();
        match self.integrate(&rn, inputs)? {
            DailyIntegration::Integrated(flux) => Ok(flux),
            DailyIntegration::Unresolved { flux, missing } => {
                warn!(
                    "could not calculate all required solar parameters (missing {:?}), returning NaN",
                    missing
                );
                Ok(flux)
            }
        }
    }
}

/// Undo an outer product from the hour-of-day calculator.
///
/// With one timestamp per observation, a square result of side `n` holds every
/// timestamp against every longitude; the diagonal pairs each observation with
/// its own location.
fn per_observation(hour: Field, time: &TimeReference) -> Result<Field> {
    let n = time.len();
    if !(time.is_series() && hour.ndim() == 2 && hour.shape()[0] == n && hour.shape()[1] == n) {
        return Ok(hour);
    }
    debug!("hour of day came back as {n}x{n}, taking the diagonal");
    let hour = hour
        .into_dimensionality::<Ix2>()
        .map_err(|e| NetRadiationError::InvalidField(e.to_string()))?;
    Ok(hour.diag().to_owned().into_dyn())
}

/// The sun is up at the reference hour and the day has a length.
#[inline]
fn valid_denominator(denominator: f64) -> bool {
    denominator > 0.0 && denominator.is_finite()
}

/// Scale an instantaneous flux to a daily mean.
///
/// Wherever `π * sin(π * (hour - sunrise) / daylight)` is not positive and
/// finite (sun below the horizon, zero day length, NaN inputs) the result is
/// NaN. Single values and fields follow the same path.
pub fn integrate_daily(
    rn: &Field,
    hour_of_day: &Field,
    sunrise_hour: &Field,
    daylight_hours: &Field,
) -> Result<Field> {
    let denominator = zip_with3(hour_of_day, sunrise_hour, daylight_hours, |hour, sunrise, daylight| {
        PI * (PI * (hour - sunrise) / daylight).sin()
    })?;
    zip_with2(rn, &denominator, |rn, denominator| {
        if valid_denominator(denominator) {
            DAILY_SCALE * rn / denominator
        } else {
            f64::NAN
        }
    })
}

/// Daily mean net radiation with the default solar calendar and sun angles.
pub fn daily_mean(rn: impl IntoField, inputs: DailyInputs) -> Result<Field> {
    SolarDayIntegrator::<ApparentSolarTime, SpencerSunAngles>::default().daily_mean(rn, inputs)
}

/// Total daytime energy in J/m^2 from a daily mean flux.
pub fn daily_energy_j_m2(daily_flux: &Field, daylight_hours: &Field) -> Result<Field> {
    zip_with2(daily_flux, daylight_hours, |flux, hours| flux * hours * 3600.0)
}
