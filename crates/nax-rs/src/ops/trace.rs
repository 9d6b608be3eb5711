use crate::axis::AxisSelector;
use crate::backend::{ArrayBackend, DType};
use crate::error::{bail_arg, Result};
use crate::named::{AxisList, NamedArray};

/// Sums the diagonal of the planes spanned by two named axes.
///
/// `offset` shifts the diagonal as in `numpy.trace`: positive offsets move towards `axis2`.
/// Both axes are removed from the result; the remaining axes keep their order. When `dtype` is
/// given the input is cast to it before accumulating.
pub fn trace<B: ArrayBackend>(
    backend: &B,
    array: &NamedArray<B>,
    axis1: impl Into<AxisSelector>,
    axis2: impl Into<AxisSelector>,
    offset: isize,
    dtype: Option<DType>,
) -> Result<NamedArray<B>> {
    let axis1 = axis1.into();
    let axis2 = axis2.into();
    let a1_index = array.resolve_axis(&axis1)?;
    let a2_index = array.resolve_axis(&axis2)?;
    if a1_index == a2_index {
        bail_arg!("cannot trace along the same axis; got {axis1} and {axis2}");
    }

    let axes: AxisList = array
        .axes()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != a1_index && *i != a2_index)
        .map(|(_, axis)| axis.clone())
        .collect();

    let source = match dtype {
        Some(dtype) if array.dtype(backend) != dtype => backend.cast(array.raw(), dtype)?,
        _ => array.raw().clone(),
    };
    log::trace!("trace over positions {a1_index} and {a2_index} with offset {offset}");
    let raw = backend.trace(&source, offset, a1_index, a2_index)?;
    NamedArray::from_engine(backend, "trace", raw, axes)
}
