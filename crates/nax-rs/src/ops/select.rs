//! Conditional selection (`where`) in its three call shapes.
//!
//! [`where_`] dispatches on which arguments are present:
//!
//! - `condition, x, y` with an array condition: elementwise [`select`].
//! - `condition, x, y` with a scalar condition: [`select_branch`], which picks one whole operand.
//! - `condition` with `fill_value` and `new_axis`: [`nonzero_indices`].

use std::fmt;

use crate::axis::{format_axes, Axis};
use crate::backend::{ArrayBackend, DType};
use crate::error::{bail_arg, ensure_arg, NamedError, Result};
use crate::named::{
    broadcast_arrays, cast_raw, common_value_dtype, AxisList, BroadcastPlan, NamedArray,
    Operand,
};

/// Result of [`where_`]: a selected array, or one index array per condition axis.
pub enum WhereOutput<B: ArrayBackend> {
    Selected(NamedArray<B>),
    Indices(Vec<NamedArray<B>>),
}

impl<B: ArrayBackend> fmt::Debug for WhereOutput<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereOutput::Selected(array) => f.debug_tuple("Selected").field(array).finish(),
            WhereOutput::Indices(indices) => f.debug_tuple("Indices").field(indices).finish(),
        }
    }
}

impl<B: ArrayBackend> WhereOutput<B> {
    pub fn into_selected(self) -> Result<NamedArray<B>> {
        match self {
            WhereOutput::Selected(array) => Ok(array),
            WhereOutput::Indices(_) => Err(NamedError::argument(
                "where was called in single argument mode and returned indices",
            )),
        }
    }

    pub fn into_indices(self) -> Result<Vec<NamedArray<B>>> {
        match self {
            WhereOutput::Indices(indices) => Ok(indices),
            WhereOutput::Selected(_) => Err(NamedError::argument(
                "where was called with x and y and returned a selected array",
            )),
        }
    }
}

/// Named-axis `where`.
///
/// With both `x` and `y`, selects between them (see [`select`]). With neither, returns the
/// coordinates of true entries of `condition` (see [`nonzero_indices`]); `fill_value` and
/// `new_axis` are then required. Supplying only one of `x` and `y` is an error.
pub fn where_<B: ArrayBackend>(
    backend: &B,
    condition: impl Into<Operand<B>>,
    x: Option<Operand<B>>,
    y: Option<Operand<B>>,
    fill_value: Option<i32>,
    new_axis: Option<&Axis>,
) -> Result<WhereOutput<B>> {
    let condition = condition.into();
    match (x, y) {
        (Some(x), Some(y)) => select(backend, condition, x, y).map(WhereOutput::Selected),
        (None, None) => {
            let condition = match condition {
                Operand::Named(condition) => condition,
                other => {
                    bail_arg!("condition {other:?} must be a NamedArray in single argument mode")
                }
            };
            let (Some(fill_value), Some(new_axis)) = (fill_value, new_axis) else {
                bail_arg!("must specify both fill_value and new_axis");
            };
            nonzero_indices(backend, &condition, fill_value, new_axis).map(WhereOutput::Indices)
        }
        _ => bail_arg!("must either specify both x and y, or neither"),
    }
}

/// Elementwise `condition ? x : y` with broadcasting by axis name.
///
/// A scalar-like condition (host scalar, zero-axis array) is routed to [`select_branch`] instead,
/// so a single predicate never turns into elementwise work.
pub fn select<B: ArrayBackend>(
    backend: &B,
    condition: impl Into<Operand<B>>,
    x: impl Into<Operand<B>>,
    y: impl Into<Operand<B>>,
) -> Result<NamedArray<B>> {
    let condition = condition.into();
    if condition.is_scalarish(backend) {
        return select_branch(backend, condition, x, y);
    }

    let x = x.into();
    let y = y.into();
    let dtype = common_value_dtype(backend, &[&x, &y]);
    let x = x.coerce_scalar(dtype);
    let y = y.coerce_scalar(dtype);
    let aligned = broadcast_arrays(backend, &[&condition, &x, &y])?;

    let pred = as_predicate(backend, &aligned.arrays[0])?;
    let on_true = cast_raw(backend, aligned.arrays[1].clone(), dtype)?;
    let on_false = cast_raw(backend, aligned.arrays[2].clone(), dtype)?;
    log::trace!("select over {}", format_axes(aligned.axes()));
    let raw = backend.select(&pred, &on_true, &on_false)?;
    NamedArray::from_engine(backend, "where", raw, aligned.plan.axes)
}

/// Picks `x` or `y` whole according to a single predicate.
///
/// `x` and `y` are broadcast against each other first, so both branches share axes. A host
/// scalar condition is decided immediately; a zero-axis array condition is handed to the
/// engine's branch primitive so it stays valid when values are only known at execution time.
pub fn select_branch<B: ArrayBackend>(
    backend: &B,
    condition: impl Into<Operand<B>>,
    x: impl Into<Operand<B>>,
    y: impl Into<Operand<B>>,
) -> Result<NamedArray<B>> {
    let condition = condition.into();
    let x = x.into();
    let y = y.into();
    ensure_arg!(
        condition.is_scalarish(backend),
        "branch select needs a scalar condition, got axes {}",
        format_axes(condition.axes())
    );
    check_branch_operands(backend, &x, &y)?;

    let dtype = common_value_dtype(backend, &[&x, &y]);
    let x = x.coerce_scalar(dtype);
    let y = y.coerce_scalar(dtype);
    let plan = BroadcastPlan::for_operands(backend, &[&x, &y])?;

    let raw = match &condition {
        Operand::Scalar(value) => {
            let chosen = if value.truthy() { &x } else { &y };
            cast_raw(backend, plan.expand(backend, chosen)?, dtype)?
        }
        Operand::Named(_) | Operand::Raw(_) => {
            let on_true = cast_raw(backend, plan.expand(backend, &x)?, dtype)?;
            let on_false = cast_raw(backend, plan.expand(backend, &y)?, dtype)?;
            let pred = as_predicate(backend, &condition.to_raw(backend)?)?;
            log::trace!("branch select over {}", format_axes(&plan.axes));
            backend.cond(&pred, &on_true, &on_false)?
        }
    };
    NamedArray::from_engine(backend, "where", raw, plan.axes)
}

/// A named `x` may only be paired with a true scalar `y`, and vice versa.
fn check_branch_operands<B: ArrayBackend>(
    backend: &B,
    x: &Operand<B>,
    y: &Operand<B>,
) -> Result<()> {
    let x_named = x.as_named().is_some();
    let y_named = y.as_named().is_some();
    if x_named && !y_named && !y.is_scalarish(backend) {
        bail_arg!("y must be a NamedArray or scalar if x is a NamedArray");
    }
    if y_named && !x_named && !x.is_scalarish(backend) {
        bail_arg!("x must be a NamedArray or scalar if y is a NamedArray");
    }
    Ok(())
}

/// Coordinates of the true entries of `condition`.
///
/// Returns one index array per axis of `condition`, in axis order, each with the single axis
/// `new_axis`. Coordinates are listed in row-major order of `condition`; when there are fewer
/// than `new_axis.size()` true entries the remainder is `fill_value`, when there are more the
/// list is truncated.
pub fn nonzero_indices<B: ArrayBackend>(
    backend: &B,
    condition: &NamedArray<B>,
    fill_value: i32,
    new_axis: &Axis,
) -> Result<Vec<NamedArray<B>>> {
    ensure_arg!(
        !condition.is_scalar(),
        "single argument where needs a condition with at least one axis"
    );
    let pred = as_predicate(backend, condition.raw())?;
    log::trace!(
        "nonzero over {} into {new_axis}",
        format_axes(condition.axes())
    );
    let raws = backend.nonzero(&pred, new_axis.size(), fill_value)?;
    ensure_arg!(
        raws.len() == condition.rank(),
        "engine '{}' returned {} index arrays for a rank {} condition",
        backend.backend_name(),
        raws.len(),
        condition.rank()
    );
    raws.into_iter()
        .map(|raw| {
            let axes: AxisList = std::iter::once(new_axis.clone()).collect();
            NamedArray::from_engine(backend, "where", raw, axes)
        })
        .collect()
}

fn as_predicate<B: ArrayBackend>(backend: &B, raw: &B::Array) -> Result<B::Array> {
    if backend.dtype(raw) == DType::Bool {
        Ok(raw.clone())
    } else {
        Ok(backend.cast(raw, DType::Bool)?)
    }
}
