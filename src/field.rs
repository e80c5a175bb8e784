//! Numeric fields
//!
//! Every quantity in this crate is an `f64` field of arbitrary dimension. A
//! single value is a 0-d field, so a formula written once through
//! [`zip_with2`] or [`zip_with3`] applies unchanged to a scalar, a time series,
//! or a raster. Shapes follow the numpy broadcasting rules.

use ndarray::{arr0, Array, Array1, ArrayD, ArrayViewD, Dimension, IxDyn, Zip};
use smallvec::SmallVec;

use crate::error::{NetRadiationError, Result};

/// A numeric field. Scalars are 0-d.
pub type Field = ArrayD<f64>;

/// A boolean field, e.g. a cloud mask where `true` is cloudy.
pub type Mask = ArrayD<bool>;

/// Array shapes are almost always 0 to 3 dimensions.
pub(crate) type Shape = SmallVec<[usize; 4]>;

/// Fields with at least this many elements are evaluated on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Conversion into a [`Field`].
pub trait IntoField {
    fn into_field(self) -> Field;
}

impl IntoField for f64 {
    fn into_field(self) -> Field {
        arr0(self).into_dyn()
    }
}

impl IntoField for Vec<f64> {
    fn into_field(self) -> Field {
        Array1::from_vec(self).into_dyn()
    }
}

impl IntoField for &[f64] {
    fn into_field(self) -> Field {
        Array1::from_vec(self.to_vec()).into_dyn()
    }
}

impl<D: Dimension> IntoField for Array<f64, D> {
    fn into_field(self) -> Field {
        self.into_dyn()
    }
}

impl<D: Dimension> IntoField for &Array<f64, D> {
    fn into_field(self) -> Field {
        self.clone().into_dyn()
    }
}

/// Conversion into a [`Mask`].
pub trait IntoMask {
    fn into_mask(self) -> Mask;
}

impl IntoMask for bool {
    fn into_mask(self) -> Mask {
        arr0(self).into_dyn()
    }
}

impl IntoMask for Vec<bool> {
    fn into_mask(self) -> Mask {
        Array1::from_vec(self).into_dyn()
    }
}

impl<D: Dimension> IntoMask for Array<bool, D> {
    fn into_mask(self) -> Mask {
        self.into_dyn()
    }
}

/// Compute the shape that two shapes broadcast to.
///
/// Shapes are aligned on their trailing axes; each pair of lengths must be
/// equal or one of them must be 1.
pub fn broadcast_shape(left: &[usize], right: &[usize]) -> Result<Shape> {
    let ndim = left.len().max(right.len());
    let left_offset = ndim - left.len();
    let right_offset = ndim - right.len();

    let mut shape = Shape::with_capacity(ndim);
    for axis in 0..ndim {
        let l = if axis < left_offset { 1 } else { left[axis - left_offset] };
        let r = if axis < right_offset { 1 } else { right[axis - right_offset] };
        let len = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => {
                return Err(NetRadiationError::ShapeMismatch {
                    left: left.to_vec(),
                    right: right.to_vec(),
                })
            }
        };
        shape.push(len);
    }
    Ok(shape)
}

fn broadcast_view<'a, A>(array: &'a ArrayD<A>, shape: &[usize]) -> Result<ArrayViewD<'a, A>> {
    array
        .broadcast(IxDyn(shape))
        .ok_or_else(|| NetRadiationError::ShapeMismatch {
            left: array.shape().to_vec(),
            right: shape.to_vec(),
        })
}

/// Apply `f` elementwise over two broadcast fields.
pub fn zip_with2<A, B, T, F>(a: &ArrayD<A>, b: &ArrayD<B>, f: F) -> Result<ArrayD<T>>
where
    A: Copy + Send + Sync,
    B: Copy + Send + Sync,
    T: Send,
    F: Fn(A, B) -> T + Send + Sync,
{
    let shape = broadcast_shape(a.shape(), b.shape())?;
    let len: usize = shape.iter().product();
    let zip = Zip::from(broadcast_view(a, &shape)?).and(broadcast_view(b, &shape)?);

    if len >= PARALLEL_THRESHOLD {
        Ok(zip.par_map_collect(|&a, &b| f(a, b)))
    } else {
        Ok(zip.map_collect(|&a, &b| f(a, b)))
    }
}

/// Apply `f` elementwise over three broadcast fields.
pub fn zip_with3<A, B, C, T, F>(
    a: &ArrayD<A>,
    b: &ArrayD<B>,
    c: &ArrayD<C>,
    f: F,
) -> Result<ArrayD<T>>
where
    A: Copy + Send + Sync,
    B: Copy + Send + Sync,
    C: Copy + Send + Sync,
    T: Send,
    F: Fn(A, B, C) -> T + Send + Sync,
{
    let shape = broadcast_shape(a.shape(), &broadcast_shape(b.shape(), c.shape())?)?;
    let len: usize = shape.iter().product();
    let zip = Zip::from(broadcast_view(a, &shape)?)
        .and(broadcast_view(b, &shape)?)
        .and(broadcast_view(c, &shape)?);

    if len >= PARALLEL_THRESHOLD {
        Ok(zip.par_map_collect(|&a, &b, &c| f(a, b, c)))
    } else {
        Ok(zip.map_collect(|&a, &b, &c| f(a, b, c)))
    }
}

/// Clamp a value into `[lower, upper]`. NaN passes through unchanged.
#[inline]
pub fn clamp_value(x: f64, lower: f64, upper: f64) -> f64 {
    if x < lower {
        lower
    } else if x > upper {
        upper
    } else {
        x
    }
}

/// Clamp every element of `field` into `[lower, upper]`, keeping NaN.
pub fn clip(field: &Field, lower: f64, upper: f64) -> Field {
    field.mapv(|x| clamp_value(x, lower, upper))
}

/// The single value of a 0-d field, or `None` for any other shape.
pub fn scalar_value<A: Copy>(field: &ArrayD<A>) -> Option<A> {
    if field.ndim() == 0 {
        field.iter().next().copied()
    } else {
        None
    }
}

/// A field of NaN with the same shape as `like`.
pub fn nan_like(like: &Field) -> Field {
    Field::from_elem(like.raw_dim(), f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn shapes_broadcast_like_numpy() {
        assert_eq!(broadcast_shape(&[], &[]).unwrap().as_slice(), &[] as &[usize]);
        assert_eq!(broadcast_shape(&[], &[3, 4]).unwrap().as_slice(), &[3, 4]);
        assert_eq!(broadcast_shape(&[4], &[3, 4]).unwrap().as_slice(), &[3, 4]);
        assert_eq!(broadcast_shape(&[3, 1], &[1, 5]).unwrap().as_slice(), &[3, 5]);
    }

    #[test]
    fn incompatible_shapes() {
        let err = broadcast_shape(&[3], &[4]).unwrap_err();
        assert!(matches!(
            err,
            NetRadiationError::ShapeMismatch { ref left, ref right } if left == &[3] && right == &[4]
        ));
    }

    #[test]
    fn scalars_stay_scalar() {
        let out = zip_with2(&2.0.into_field(), &3.0.into_field(), |a, b| a * b).unwrap();
        assert_eq!(scalar_value(&out), Some(6.0));
        assert_eq!(scalar_value(&vec![6.0].into_field()), None);
    }

    #[test]
    fn scalar_broadcasts_over_grid() {
        let grid = array![[1.0, 2.0], [3.0, 4.0]].into_field();
        let out = zip_with3(&grid, &10.0.into_field(), &vec![1.0, -1.0].into_field(), |a, b, c| {
            a * b * c
        })
        .unwrap();
        assert_eq!(out, array![[10.0, -20.0], [30.0, -40.0]].into_dyn());
    }

    #[test]
    fn parallel_matches_serial() {
        let n = 300;
        let big = Array2::from_shape_fn((n, n), |(i, j)| (i * n + j) as f64).into_field();
        let small = Array2::from_shape_fn((10, 10), |(i, j)| (i * n + j) as f64).into_field();

        let par = zip_with2(&big, &2.0.into_field(), |a, b| a / b).unwrap();
        let ser = zip_with2(&small, &2.0.into_field(), |a, b| a / b).unwrap();
        for i in 0..10 {
            for j in 0..10 {
                assert_eq!(par[[i, j]], ser[[i, j]]);
            }
        }
    }

    #[test]
    fn clip_keeps_nan() {
        let field = vec![-0.5, 0.3, 1.7, f64::NAN].into_field();
        let clipped = clip(&field, 0.0, 1.0);
        assert_eq!(clipped[[0]], 0.0);
        assert_eq!(clipped[[1]], 0.3);
        assert_eq!(clipped[[2]], 1.0);
        assert!(clipped[[3]].is_nan());

        // Clamping an already clamped field changes nothing
        let again = clip(&clipped, 0.0, 1.0);
        for i in 0..3 {
            assert_eq!(again[[i]], clipped[[i]]);
        }
    }

    #[test]
    fn nan_like_keeps_shape() {
        let out = nan_like(&Array2::<f64>::zeros((2, 3)).into_field());
        assert_eq!(out.shape(), &[2, 3]);
        assert!(out.iter().all(|x| x.is_nan()));
    }
}
