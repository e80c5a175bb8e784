//! Solar time and sun geometry
//!
//! These are the collaborators the daily integration leans on: timestamps,
//! observation locations, the apparent solar calendar, and the sunrise
//! geometry derived from the solar hour angle. The calendar and the angles
//! are traits so other solar-position models can be plugged in.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rayon::prelude::*;

use crate::error::{NetRadiationError, Result};
use crate::field::{zip_with2, Field, IntoField};

/// Seconds in a day
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Seconds of solar time per degree of longitude (one hour per 15°)
const SECONDS_PER_DEGREE: f64 = 240.0;

/// Days from 0001-01-01 (day 1) to the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Naive formats accepted for text timestamps. These are taken as UTC.
const OFFSET_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y/%m/%d %H:%M:%S%.f%:z",
    "%Y/%m/%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%dT%H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// A single UTC timestamp, either already parsed or as text.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValue {
    Parsed(DateTime<Utc>),
    Text(String),
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(time: DateTime<Utc>) -> Self {
        TimeValue::Parsed(time)
    }
}

impl From<&str> for TimeValue {
    fn from(text: &str) -> Self {
        TimeValue::Text(text.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(text: String) -> Self {
        TimeValue::Text(text)
    }
}

impl TimeValue {
    fn to_datetime(&self) -> Result<DateTime<Utc>> {
        match self {
            TimeValue::Parsed(time) => Ok(*time),
            TimeValue::Text(text) => parse_timestamp(text),
        }
    }
}

/// The time reference of an observation: one timestamp, or one per
/// observation.
#[derive(Debug, Clone, PartialEq)]
pub enum UtcTime {
    Single(TimeValue),
    Series(Vec<TimeValue>),
}

impl From<TimeValue> for UtcTime {
    fn from(time: TimeValue) -> Self {
        UtcTime::Single(time)
    }
}

impl From<Vec<TimeValue>> for UtcTime {
    fn from(times: Vec<TimeValue>) -> Self {
        UtcTime::Series(times)
    }
}

macro_rules! impl_utc_time_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for UtcTime {
                fn from(time: $t) -> Self {
                    UtcTime::Single(time.into())
                }
            }

            impl From<Vec<$t>> for UtcTime {
                fn from(times: Vec<$t>) -> Self {
                    UtcTime::Series(times.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

impl_utc_time_from!(DateTime<Utc>, &str, String);

/// Parse a text timestamp.
///
/// RFC 3339 and ISO 8601 timestamps with an offset (`+02:00` or `+0200`)
/// are converted to UTC. Timestamps without an offset
/// (`2024-06-21 18:00:00`, `2024-06-21T18:00`) and bare dates (midnight) are
/// taken as UTC. Dates may also be written with slashes (`2024/06/21`).
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(time) = DateTime::parse_from_str(text, format) {
            return Ok(time.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(time) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&time));
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| Utc.from_utc_datetime(&time))
        .ok_or_else(|| NetRadiationError::InvalidTimestamp(text.to_string()))
}

/// Parsed time reference, as seconds since the Unix epoch.
///
/// A single timestamp is a 0-d field; a series is 1-d, one element per
/// observation.
#[derive(Debug, Clone)]
pub struct TimeReference {
    seconds: Field,
}

impl TimeReference {
    /// Parse every timestamp. Series are parsed in parallel. Any unparseable
    /// text is an error.
    pub fn new(time: &UtcTime) -> Result<Self> {
        let seconds = match time {
            UtcTime::Single(value) => epoch_seconds(&value.to_datetime()?).into_field(),
            UtcTime::Series(values) => values
                .par_iter()
                .map(|value| value.to_datetime().map(|t| epoch_seconds(&t)))
                .collect::<Result<Vec<f64>>>()?
                .into_field(),
        };
        Ok(Self { seconds })
    }

    /// Seconds since the Unix epoch.
    pub fn seconds(&self) -> &Field {
        &self.seconds
    }

    /// Whether this is a per-observation series rather than one timestamp.
    pub fn is_series(&self) -> bool {
        self.seconds.ndim() == 1
    }

    /// Number of timestamps.
    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }
}

fn epoch_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9
}

/// Location of the observations.
#[derive(Debug, Clone)]
pub enum Geometry {
    /// Geometry with latitude and longitude in degrees.
    Spatial { lat: Field, lon: Field },
    /// Point series with `x` as longitude and `y` as latitude, in degrees.
    Points { x: Field, y: Field },
}

impl Geometry {
    pub fn spatial(lat: impl IntoField, lon: impl IntoField) -> Self {
        Geometry::Spatial {
            lat: lat.into_field(),
            lon: lon.into_field(),
        }
    }

    pub fn points(x: impl IntoField, y: impl IntoField) -> Self {
        Geometry::Points {
            x: x.into_field(),
            y: y.into_field(),
        }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> &Field {
        match self {
            Geometry::Spatial { lat, .. } => lat,
            Geometry::Points { y, .. } => y,
        }
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> &Field {
        match self {
            Geometry::Spatial { lon, .. } => lon,
            Geometry::Points { x, .. } => x,
        }
    }
}

/// Solar calendar: where a UTC time falls in the local solar day.
pub trait SolarCalendar {
    /// Day of the year (1-366) in local solar time.
    fn day_of_year(&self, time: &TimeReference, lon: &Field) -> Result<Field>;

    /// Hour of the day (0-24) in local solar time.
    fn hour_of_day(&self, time: &TimeReference, lon: &Field) -> Result<Field>;
}

/// Local apparent solar time from longitude alone: solar time runs ahead of
/// UTC by one hour per 15° east.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApparentSolarTime;

impl SolarCalendar for ApparentSolarTime {
    fn day_of_year(&self, time: &TimeReference, lon: &Field) -> Result<Field> {
        let days = zip_with2(time.seconds(), lon, |seconds, lon| {
            let solar = seconds + lon * SECONDS_PER_DEGREE;
            if !solar.is_finite() {
                return Ok(f64::NAN);
            }
            let day = (solar / SECONDS_PER_DAY).floor() + UNIX_EPOCH_DAYS_FROM_CE as f64;
            if day < 1.0 || day > f64::from(i32::MAX) {
                return Err(solar);
            }
            NaiveDate::from_num_days_from_ce_opt(day as i32)
                .map(|date| f64::from(date.ordinal()))
                .ok_or(solar)
        })?;

        if let Some(seconds) = days.iter().find_map(|day| day.err()) {
            return Err(NetRadiationError::TimestampOutOfRange(seconds));
        }
        Ok(days.mapv(|day| day.unwrap_or(f64::NAN)))
    }

    fn hour_of_day(&self, time: &TimeReference, lon: &Field) -> Result<Field> {
        zip_with2(time.seconds(), lon, |seconds, lon| {
            (seconds + lon * SECONDS_PER_DEGREE).rem_euclid(SECONDS_PER_DAY) / 3600.0
        })
    }
}

/// Sunrise geometry from the sunset hour angle.
pub trait SunAngles {
    /// Sunset hour angle in degrees for a day of year and latitude in degrees.
    fn hour_angle_deg(&self, day_of_year: &Field, lat: &Field) -> Result<Field>;

    /// Hours between sunrise and sunset.
    fn daylight_hours(&self, hour_angle_deg: &Field) -> Field {
        hour_angle_deg.mapv(|sha| 2.0 / 15.0 * sha)
    }

    /// Local solar hour of sunrise.
    fn sunrise_hour(&self, hour_angle_deg: &Field) -> Field {
        hour_angle_deg.mapv(|sha| 12.0 - sha / 15.0)
    }
}

/// Sunset hour angle with the Spencer (1971) Fourier series for solar
/// declination.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpencerSunAngles;

impl SpencerSunAngles {
    /// Solar declination in radians.
    pub fn declination(day_of_year: f64) -> f64 {
        let g = 2.0 * PI * (day_of_year - 1.0) / 365.0;
        0.006918 - 0.399912 * g.cos() + 0.070257 * g.sin() - 0.006758 * (2.0 * g).cos()
            + 0.000907 * (2.0 * g).sin()
            - 0.002697 * (3.0 * g).cos()
            + 0.00148 * (3.0 * g).sin()
    }
}

impl SunAngles for SpencerSunAngles {
    /// NaN during polar day or night, where the sun doesn't cross the horizon.
    fn hour_angle_deg(&self, day_of_year: &Field, lat: &Field) -> Result<Field> {
        zip_with2(day_of_year, lat, |doy, lat| {
            let declination = Self::declination(doy);
            (-lat.to_radians().tan() * declination.tan()).acos().to_degrees()
        })
    }
}
