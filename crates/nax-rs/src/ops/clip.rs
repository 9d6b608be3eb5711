use crate::axis::format_axes;
use crate::backend::ArrayBackend;
use crate::error::Result;
use crate::named::{broadcast_arrays, common_value_dtype, NamedArray, Operand};

/// Clamps `array` to `[a_min, a_max]` elementwise.
///
/// All three operands may be named arrays or scalars and are broadcast together by axis name;
/// the result carries the broadcast axes.
pub fn clip<B: ArrayBackend>(
    backend: &B,
    array: impl Into<Operand<B>>,
    a_min: impl Into<Operand<B>>,
    a_max: impl Into<Operand<B>>,
) -> Result<NamedArray<B>> {
    let array = array.into();
    let a_min = a_min.into();
    let a_max = a_max.into();
    let dtype = common_value_dtype(backend, &[&array, &a_min, &a_max]);
    let array = array.coerce_scalar(dtype);
    let a_min = a_min.coerce_scalar(dtype);
    let a_max = a_max.coerce_scalar(dtype);

    let aligned =
        broadcast_arrays(backend, &[&array, &a_min, &a_max])?.promote(backend, dtype)?;
    log::trace!("clip over {}", format_axes(aligned.axes()));
    let raw = backend.clamp(&aligned.arrays[0], &aligned.arrays[1], &aligned.arrays[2])?;
    NamedArray::from_engine(backend, "clip", raw, aligned.plan.axes)
}
