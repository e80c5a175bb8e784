//! Surface net radiation after Verma et al. (2016)
//!
//! Instantaneous net radiation from surface temperature, emissivity, albedo,
//! incoming shortwave and near-surface meteorology ([`radiation`]), and its
//! upscaling to a daily mean with the solar geometry of the observation
//! ([`daily`]).
//!
//! Every input may be a single value or an n-dimensional field; see
//! [`field`] for the broadcasting rules.
//!
//! ```
//! use verma_net_radiation::{daily_mean, net_radiation, DailyInputs};
//!
//! let components = net_radiation(25.0, 0.98, 0.2, 600.0, 20.0, 0.5, None)?;
//! let daily = daily_mean(
//!     components.rn,
//!     DailyInputs::new().hour_of_day(12.0).day_of_year(180.0).lat(35.0),
//! )?;
//! assert_eq!(daily.ndim(), 0);
//! # Ok::<(), verma_net_radiation::NetRadiationError>(())
//! ```

pub mod daily;
pub mod error;
pub mod field;
pub mod radiation;
pub mod solar;

#[cfg(feature = "python")]
mod python;

pub use daily::{daily_mean, DailyInputs, DailyIntegration, SolarDayIntegrator};
pub use error::NetRadiationError;
pub use field::{Field, IntoField, IntoMask, Mask};
pub use radiation::{net_radiation, RadiationComponents};
pub use solar::{Geometry, UtcTime};
