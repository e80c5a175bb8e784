//! Low-level radiation formulas
//!
//! Every formula is written once, elementwise, over broadcast [`Field`]s, so
//! a single value and a raster follow exactly the same code path.

use crate::error::Result;
use crate::field::{zip_with2, zip_with3, Field, Mask};

/// Stefan-Boltzmann constant (W m^-2 K^-4)
pub const STEFAN_BOLTZMANN_CONSTANT: f64 = 5.67036713e-8;

/// Offset between degrees Celsius and kelvin
const KELVIN_OFFSET: f64 = 273.15;

/// Convert a temperature field from °C to K.
pub fn celsius_to_kelvin(temperature_c: &Field) -> Field {
    temperature_c.mapv(|t| t + KELVIN_OFFSET)
}

/// Water vapor pressure in Pa.
///
/// For a relative humidity `rh` (fraction) and air temperature `ta_k` in K,
/// the saturation pressure comes from a Magnus-type formula in kPa, which is
/// scaled by the relative humidity and converted to Pa.
pub fn vapor_pressure_pa(rh: &Field, ta_k: &Field) -> Result<Field> {
    zip_with2(rh, ta_k, |rh, ta_k| {
        rh * 0.6113 * 10f64.powf(7.5 * (ta_k - KELVIN_OFFSET) / (ta_k - 35.85)) * 1000.0
    })
}

/// Brutsaert term for a single point.
///
/// A negative argument under the square root is NaN, never a panic or a
/// complex value.
#[inline]
fn brutsaert(ea_pa: f64, ta_k: f64) -> f64 {
    let eta1 = 0.465 * ea_pa / ta_k;
    let arg = 1.2 + 3.0 * eta1;
    if arg >= 0.0 {
        -arg.sqrt()
    } else {
        f64::NAN
    }
}

/// Atmospheric (apparent sky) emissivity, Brutsaert form.
///
/// For a vapor pressure `ea_pa` in Pa and an air temperature `ta_k` in K,
/// computes `-sqrt(1.2 + 3 * 0.465 * ea / ta)`. Wherever the argument is
/// negative the result is NaN.
pub fn atmospheric_emissivity(ea_pa: &Field, ta_k: &Field) -> Result<Field> {
    zip_with2(ea_pa, ta_k, brutsaert)
}

/// Blackbody emission in W/m^2 scaled by `emissivity`.
#[inline]
fn grey_body(emissivity: f64, temperature_k: f64) -> f64 {
    emissivity * STEFAN_BOLTZMANN_CONSTANT * temperature_k.powi(4)
}

/// Incoming longwave radiation in W/m^2.
///
/// Clear-sky emission of the atmosphere at `ta_k`. Where `cloud_mask` is
/// `true` the cloud base is treated as a blackbody at air temperature;
/// without a mask every point is clear sky.
pub fn incoming_longwave(
    atmospheric_emissivity: &Field,
    ta_k: &Field,
    cloud_mask: Option<&Mask>,
) -> Result<Field> {
    match cloud_mask {
        None => zip_with2(atmospheric_emissivity, ta_k, grey_body),
        Some(mask) => zip_with3(atmospheric_emissivity, ta_k, mask, |e, t, cloudy| {
            if cloudy {
                grey_body(1.0, t)
            } else {
                grey_body(e, t)
            }
        }),
    }
}

/// Outgoing longwave radiation in W/m^2 emitted by a surface with
/// `emissivity` at `surface_temperature_k`.
pub fn outgoing_longwave(emissivity: &Field, surface_temperature_k: &Field) -> Result<Field> {
    zip_with2(emissivity, surface_temperature_k, grey_body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{scalar_value, IntoField, IntoMask};
    use approx::assert_relative_eq;
    use ndarray::Array2;

    const EA_PA: [f64; 5] = [0., 1., 5., 10., 20.];
    const TA_K: [f64; 5] = [270., 280., 290., 300., 310.];

    /// A single value and a grid must give identical results, including NaN.
    #[test]
    fn emissivity_scalar_matches_field() {
        let ea = Array2::from_shape_fn((5, 1), |(i, _)| EA_PA[i]).into_field();
        let ta = TA_K.to_vec().into_field();
        let grid = atmospheric_emissivity(&ea, &ta).unwrap();
        assert_eq!(grid.shape(), &[5, 5]);

        for (i, &ea) in EA_PA.iter().enumerate() {
            for (j, &ta) in TA_K.iter().enumerate() {
                let single =
                    scalar_value(&atmospheric_emissivity(&ea.into_field(), &ta.into_field()).unwrap())
                        .unwrap();
                assert_eq!(single.to_bits(), grid[[i, j]].to_bits());
            }
        }
    }

    #[test]
    fn emissivity_values() {
        let out = atmospheric_emissivity(&0.0.into_field(), &270.0.into_field()).unwrap();
        assert_relative_eq!(scalar_value(&out).unwrap(), -(1.2f64.sqrt()));

        let out = atmospheric_emissivity(&1170.0420489514422.into_field(), &293.15.into_field())
            .unwrap();
        assert_relative_eq!(scalar_value(&out).unwrap(), -2.6015048704453583, epsilon = 1e-12);
    }

    #[test]
    fn emissivity_negative_argument_is_nan() {
        // 1.2 + 3 * 0.465 * (-1000) / 300 < 0
        let single = atmospheric_emissivity(&(-1000.0).into_field(), &300.0.into_field()).unwrap();
        assert!(scalar_value(&single).unwrap().is_nan());

        let field = atmospheric_emissivity(
            &vec![-1000.0, 1000.0, -1000.0].into_field(),
            &vec![300.0, 300.0, 300.0].into_field(),
        )
        .unwrap();
        assert!(field[[0]].is_nan());
        assert!(field[[1]] < 0.0);
        assert!(field[[2]].is_nan());
    }

    #[test]
    fn vapor_pressure() {
        let ea = vapor_pressure_pa(&0.5.into_field(), &293.15.into_field()).unwrap();
        assert_relative_eq!(scalar_value(&ea).unwrap(), 1170.0420489514422, epsilon = 1e-9);

        // 0 °C: saturation pressure is the 0.6113 kPa constant itself
        let ea = vapor_pressure_pa(&1.0.into_field(), &273.15.into_field()).unwrap();
        assert_relative_eq!(scalar_value(&ea).unwrap(), 611.3, epsilon = 1e-9);
    }

    #[test]
    fn outgoing_longwave_matches_stefan_boltzmann() {
        let lw = outgoing_longwave(&0.98.into_field(), &298.15.into_field()).unwrap();
        let expected = 0.98 * 5.67036713e-8 * 298.15f64.powi(4);
        assert_relative_eq!(scalar_value(&lw).unwrap(), expected, max_relative = 1e-12);
        assert_relative_eq!(expected, 439.11321651237415, max_relative = 1e-12);
    }

    #[test]
    fn cloudy_points_emit_as_blackbody() {
        let emissivity = vec![0.8, 0.8].into_field();
        let ta = 290.0.into_field();
        let clear = incoming_longwave(&emissivity, &ta, None).unwrap();
        let mask = vec![false, true].into_mask();
        let cloudy = incoming_longwave(&emissivity, &ta, Some(&mask)).unwrap();

        let blackbody = STEFAN_BOLTZMANN_CONSTANT * 290.0f64.powi(4);
        assert_relative_eq!(clear[[0]], 0.8 * blackbody);
        assert_relative_eq!(clear[[1]], 0.8 * blackbody);
        assert_relative_eq!(cloudy[[0]], clear[[0]]);
        assert_relative_eq!(cloudy[[1]], blackbody);
    }

    #[test]
    fn celsius_offset() {
        let k = celsius_to_kelvin(&vec![0.0, 25.0, -273.15].into_field());
        assert_relative_eq!(k[[0]], 273.15);
        assert_relative_eq!(k[[1]], 298.15);
        assert_relative_eq!(k[[2]], 0.0);
    }
}
