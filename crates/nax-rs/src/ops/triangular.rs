use crate::axis::AxisSelector;
use crate::backend::{ArrayBackend, Triangle};
use crate::error::{bail_arg, Result};
use crate::named::NamedArray;

/// Lower triangle of the planes spanned by `axis1` (rows) and `axis2` (columns).
///
/// The result is returned with `axis1` and `axis2` moved to the end, in that order; the other
/// axes keep their relative order. Use [`NamedArray::rearrange`] to restore another order.
/// Entries above the `k`-th diagonal are zeroed.
pub fn tril<B: ArrayBackend>(
    backend: &B,
    array: &NamedArray<B>,
    axis1: impl Into<AxisSelector>,
    axis2: impl Into<AxisSelector>,
    k: isize,
) -> Result<NamedArray<B>> {
    triangular(backend, array, axis1.into(), axis2.into(), k, Triangle::Lower)
}

/// Upper triangle of the planes spanned by `axis1` (rows) and `axis2` (columns).
///
/// Axis order of the result follows [`tril`]. Entries below the `k`-th diagonal are zeroed.
pub fn triu<B: ArrayBackend>(
    backend: &B,
    array: &NamedArray<B>,
    axis1: impl Into<AxisSelector>,
    axis2: impl Into<AxisSelector>,
    k: isize,
) -> Result<NamedArray<B>> {
    triangular(backend, array, axis1.into(), axis2.into(), k, Triangle::Upper)
}

fn triangular<B: ArrayBackend>(
    backend: &B,
    array: &NamedArray<B>,
    axis1: AxisSelector,
    axis2: AxisSelector,
    k: isize,
    triangle: Triangle,
) -> Result<NamedArray<B>> {
    let a1_index = array.resolve_axis(&axis1)?;
    let a2_index = array.resolve_axis(&axis2)?;
    if a1_index == a2_index {
        bail_arg!("triangular mask needs two distinct axes; got {axis1} and {axis2}");
    }

    let rearranged = array.rearrange_trailing(backend, [axis1, axis2])?;
    log::trace!("{triangle:?} triangle with k={k}");
    let raw = backend.triangular(rearranged.raw(), triangle, k)?;
    let axes = rearranged.axes().iter().cloned().collect();
    NamedArray::from_engine(backend, "triangular", raw, axes)
}
