//! Instantaneous net radiation, after Verma et al. (2016)
//!
//! Verma, M., Fisher, J. B., Mallick, K., et al. (2016). Global surface
//! net-radiation at 5 km from MODIS Terra. Remote Sensing, 8, 739.

pub mod core;

use log::trace;

use self::core::{
    atmospheric_emissivity, celsius_to_kelvin, incoming_longwave, outgoing_longwave,
    vapor_pressure_pa,
};
use crate::error::Result;
use crate::field::{broadcast_shape, clip, zip_with2, Field, IntoField, Mask, Shape};

/// Surface properties for the radiation balance.
#[derive(Debug, Clone)]
pub struct SurfaceState {
    /// Surface temperature in °C.
    pub temperature_c: Field,
    /// Surface emissivity, clamped to [0, 1] before use.
    pub emissivity: Field,
    /// Surface albedo, clamped to [0, 1] before use.
    pub albedo: Field,
}

/// Near-surface atmosphere for the radiation balance.
#[derive(Debug, Clone)]
pub struct AtmosphericState {
    /// Air temperature in °C.
    pub temperature_c: Field,
    /// Relative humidity as a fraction.
    pub relative_humidity: Field,
    /// Incoming shortwave radiation in W/m^2.
    pub shortwave_in: Field,
    /// Optional cloud mask, `true` where cloudy.
    pub cloud_mask: Option<Mask>,
}

/// Inputs prepared for the radiation balance. Temperatures are in K and the
/// vapor pressure is derived from humidity.
#[derive(Debug)]
pub struct RadiationInputs {
    /// Shape that all the inputs broadcast to.
    shape: Shape,
    /// Surface temperature in K.
    surface_temperature: Field,
    /// Air temperature in K.
    air_temperature: Field,
    /// Water vapor pressure in Pa.
    vapor_pressure: Field,
    /// Raw surface emissivity.
    emissivity: Field,
    /// Raw surface albedo.
    albedo: Field,
    /// Incoming shortwave radiation in W/m^2.
    shortwave_in: Field,
    cloud_mask: Option<Mask>,
}

/// Radiation balance components, all in W/m^2.
#[derive(Debug, Clone)]
pub struct RadiationComponents {
    /// Outgoing (reflected) shortwave radiation.
    pub sw_out: Field,
    /// Incoming longwave radiation.
    pub lw_in: Field,
    /// Outgoing longwave radiation.
    pub lw_out: Field,
    /// Instantaneous net radiation.
    pub rn: Field,
}

impl RadiationInputs {
    /// Check shapes and convert units.
    ///
    /// All fields (and the cloud mask, if any) must broadcast together.
    pub fn new(surface: SurfaceState, atmosphere: AtmosphericState) -> Result<Self> {
        let mut shape = Shape::new();
        for field in [
            &surface.temperature_c,
            &surface.emissivity,
            &surface.albedo,
            &atmosphere.temperature_c,
            &atmosphere.relative_humidity,
            &atmosphere.shortwave_in,
        ] {
            shape = broadcast_shape(&shape, field.shape())?;
        }
        if let Some(mask) = &atmosphere.cloud_mask {
            shape = broadcast_shape(&shape, mask.shape())?;
        }
        trace!("net radiation inputs broadcast to {:?}", shape.as_slice());

        let surface_temperature = celsius_to_kelvin(&surface.temperature_c);
        let air_temperature = celsius_to_kelvin(&atmosphere.temperature_c);
        let vapor_pressure = vapor_pressure_pa(&atmosphere.relative_humidity, &air_temperature)?;

        Ok(Self {
            shape,
            surface_temperature,
            air_temperature,
            vapor_pressure,
            emissivity: surface.emissivity,
            albedo: surface.albedo,
            shortwave_in: atmosphere.shortwave_in,
            cloud_mask: atmosphere.cloud_mask,
        })
    }

    /// Shape of the outputs.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Compute the radiation balance.
    ///
    /// The clamps are applied in order: reflected and net shortwave can't be
    /// negative, and neither can the final net radiation. Later steps use the
    /// clamped values.
    pub fn run(&self) -> Result<RadiationComponents> {
        let albedo = clip(&self.albedo, 0.0, 1.0);
        let sw_out = clip(
            &zip_with2(&self.shortwave_in, &albedo, |sw, a| sw * a)?,
            0.0,
            f64::INFINITY,
        );
        let sw_net = clip(
            &zip_with2(&self.shortwave_in, &sw_out, |sw_in, sw_out| sw_in - sw_out)?,
            0.0,
            f64::INFINITY,
        );

        let sky_emissivity = atmospheric_emissivity(&self.vapor_pressure, &self.air_temperature)?;
        let lw_in = incoming_longwave(
            &sky_emissivity,
            &self.air_temperature,
            self.cloud_mask.as_ref(),
        )?;

        let emissivity = clip(&self.emissivity, 0.0, 1.0);
        let lw_out = outgoing_longwave(&emissivity, &self.surface_temperature)?;

        let lw_net = zip_with2(&lw_in, &lw_out, |lw_in, lw_out| lw_in - lw_out)?;
        let rn = clip(&zip_with2(&sw_net, &lw_net, |sw, lw| sw + lw)?, 0.0, f64::INFINITY);

        Ok(RadiationComponents {
            sw_out,
            lw_in,
            lw_out,
            rn,
        })
    }
}

impl RadiationComponents {
    /// Net longwave radiation, incoming minus outgoing.
    pub fn net_longwave(&self) -> Result<Field> {
        zip_with2(&self.lw_in, &self.lw_out, |lw_in, lw_out| lw_in - lw_out)
    }

    /// The components keyed by their conventional names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Field)> {
        [
            ("SWout", &self.sw_out),
            ("LWin", &self.lw_in),
            ("LWout", &self.lw_out),
            ("Rn", &self.rn),
        ]
        .into_iter()
    }
}

/// Instantaneous net radiation and its components.
///
/// Inputs are surface temperature `st_c` in °C, surface `emissivity`,
/// `albedo`, incoming shortwave `sw_in` in W/m^2, air temperature `ta_c` in
/// °C, relative humidity `rh` as a fraction, and an optional `cloud_mask`.
/// Any input may be a single value or a field; they broadcast together.
pub fn net_radiation(
    st_c: impl IntoField,
    emissivity: impl IntoField,
    albedo: impl IntoField,
    sw_in: impl IntoField,
    ta_c: impl IntoField,
    rh: impl IntoField,
    cloud_mask: Option<Mask>,
) -> Result<RadiationComponents> {
    let surface = SurfaceState {
        temperature_c: st_c.into_field(),
        emissivity: emissivity.into_field(),
        albedo: albedo.into_field(),
    };
    let atmosphere = AtmosphericState {
        temperature_c: ta_c.into_field(),
        relative_humidity: rh.into_field(),
        shortwave_in: sw_in.into_field(),
        cloud_mask,
    };
    RadiationInputs::new(surface, atmosphere)?.run()
}
