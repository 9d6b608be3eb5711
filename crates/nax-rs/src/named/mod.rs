//! Named arrays: raw engine arrays paired with an ordered list of named axes.
//!
//! A [`NamedArray`] never owns its engine. Every method that produces a new array takes the
//! engine by reference, mirroring the free-function operations in [`crate::ops`].

pub mod broadcast;
pub mod elementwise;

use std::fmt;

use smallvec::SmallVec;

use crate::axis::{format_axes, Axis, AxisSelector};
use crate::backend::{ArrayBackend, ArrayLiteral, BackendError, DType, LiteralData, Scalar};
use crate::env;
use crate::error::{bail_arg, ensure_arg, NamedError, Result};

pub use broadcast::{
    broadcast_arrays, broadcast_axes, AxisEntry, AxisMap, Broadcast, BroadcastPlan,
};

/// Inline storage for axis lists; most arrays have at most four axes.
pub type AxisList = SmallVec<[Axis; 4]>;

/// A raw engine array together with one named axis per dimension.
pub struct NamedArray<B: ArrayBackend> {
    raw: B::Array,
    axes: AxisList,
}

impl<B: ArrayBackend> Clone for NamedArray<B> {
    fn clone(&self) -> Self {
        NamedArray {
            raw: self.raw.clone(),
            axes: self.axes.clone(),
        }
    }
}

impl<B: ArrayBackend> fmt::Debug for NamedArray<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedArray")
            .field("axes", &format_axes(&self.axes))
            .finish_non_exhaustive()
    }
}

impl<B: ArrayBackend> NamedArray<B> {
    /// Pairs `raw` with `axes`, checking names are unique and sizes match the raw shape.
    pub fn new<I>(backend: &B, raw: B::Array, axes: I) -> Result<Self>
    where
        I: IntoIterator<Item = Axis>,
    {
        let axes: AxisList = axes.into_iter().collect();
        check_unique(&axes)?;
        check_shape(&backend.shape(&raw), &axes)?;
        Ok(NamedArray { raw, axes })
    }

    /// Wraps an engine result whose axes were computed by the layer.
    pub(crate) fn from_engine(
        backend: &B,
        op: &str,
        raw: B::Array,
        axes: AxisList,
    ) -> Result<Self> {
        if env::result_checks_enabled() {
            let dims = backend.shape(&raw);
            if check_shape(&dims, &axes).is_err() {
                return Err(BackendError::execution(format!(
                    "{op}: engine '{}' returned shape {dims:?}, expected axes {}",
                    backend.backend_name(),
                    format_axes(&axes)
                ))
                .into());
            }
        }
        Ok(NamedArray { raw, axes })
    }

    pub fn from_literal<I>(backend: &B, literal: ArrayLiteral, axes: I) -> Result<Self>
    where
        I: IntoIterator<Item = Axis>,
    {
        let raw = backend.materialize(literal)?;
        NamedArray::new(backend, raw, axes)
    }

    pub fn from_f32(backend: &B, axes: &[Axis], data: Vec<f32>) -> Result<Self> {
        Self::from_data(backend, axes, LiteralData::F32(data))
    }

    pub fn from_i32(backend: &B, axes: &[Axis], data: Vec<i32>) -> Result<Self> {
        Self::from_data(backend, axes, LiteralData::I32(data))
    }

    pub fn from_bool(backend: &B, axes: &[Axis], data: Vec<bool>) -> Result<Self> {
        Self::from_data(backend, axes, LiteralData::Bool(data))
    }

    fn from_data(backend: &B, axes: &[Axis], data: LiteralData) -> Result<Self> {
        let dims: Vec<usize> = axes.iter().map(Axis::size).collect();
        let literal = ArrayLiteral::new(dims, data)?;
        Self::from_literal(backend, literal, axes.iter().cloned())
    }

    /// An array over `axes` with every element equal to `value`.
    pub fn full(backend: &B, axes: &[Axis], value: impl Into<Scalar>) -> Result<Self> {
        let value = value.into();
        let axes: AxisList = axes.iter().cloned().collect();
        check_unique(&axes)?;
        let dims: Vec<usize> = axes.iter().map(Axis::size).collect();
        let scalar = backend.materialize(value.to_literal())?;
        let raw = if dims.is_empty() {
            scalar
        } else {
            let ones = vec![1; dims.len()];
            let unit = backend.reshape(&scalar, &ones)?;
            backend.broadcast_to(&unit, &dims)?
        };
        Self::from_engine(backend, "full", raw, axes)
    }

    /// A zero-axis array holding `value`.
    pub fn scalar_value(backend: &B, value: impl Into<Scalar>) -> Result<Self> {
        Self::full(backend, &[], value)
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn raw(&self) -> &B::Array {
        &self.raw
    }

    pub fn into_raw(self) -> B::Array {
        self.raw
    }

    pub fn rank(&self) -> usize {
        self.axes.len()
    }

    /// Positional dimensions implied by the axes.
    pub fn dims(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::size).collect()
    }

    /// True when the array has no axes.
    pub fn is_scalar(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn dtype(&self, backend: &B) -> DType {
        backend.dtype(&self.raw)
    }

    /// Looks up an axis by name, returning its position.
    pub fn axis_index(&self, selector: impl Into<AxisSelector>) -> Option<usize> {
        let selector = selector.into();
        self.axes
            .iter()
            .position(|axis| axis.name() == selector.name())
    }

    /// Returns the axis with the given name, if present.
    pub fn axis(&self, selector: impl Into<AxisSelector>) -> Option<&Axis> {
        self.axis_index(selector).map(|index| &self.axes[index])
    }

    /// Resolves a selector to a position.
    ///
    /// Fails with [`NamedError::MissingAxis`] when no axis has that name, and with
    /// [`NamedError::IncompatibleShape`] when a full axis selector disagrees on size.
    pub fn resolve_axis(&self, selector: impl Into<AxisSelector>) -> Result<usize> {
        let selector = selector.into();
        let index = self
            .axis_index(&selector)
            .ok_or_else(|| NamedError::missing_axis(&selector, &self.axes))?;
        if let Some(size) = selector.size() {
            let found = self.axes[index].size();
            if size != found {
                return Err(NamedError::IncompatibleShape {
                    axis: selector.name().to_string(),
                    left: found,
                    right: size,
                });
            }
        }
        Ok(index)
    }

    /// Permutes the array so its axes follow `order`, which must name every axis exactly once.
    pub fn rearrange<I>(&self, backend: &B, order: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<AxisSelector>,
    {
        let perm = order
            .into_iter()
            .map(|selector| self.resolve_axis(selector))
            .collect::<Result<Vec<_>>>()?;
        ensure_arg!(
            perm.len() == self.rank(),
            "rearrange order names {} axes but array has axes {}",
            perm.len(),
            format_axes(&self.axes)
        );
        check_permutation(&perm, &self.axes)?;
        self.permute(backend, &perm)
    }

    /// Moves the selected axes to the end, in the given order; other axes keep their order.
    pub fn rearrange_trailing<I>(&self, backend: &B, trailing: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<AxisSelector>,
    {
        let trailing = trailing
            .into_iter()
            .map(|selector| self.resolve_axis(selector))
            .collect::<Result<Vec<_>>>()?;
        let mut perm: Vec<usize> = (0..self.rank())
            .filter(|index| !trailing.contains(index))
            .collect();
        perm.extend_from_slice(&trailing);
        check_permutation(&perm, &self.axes)?;
        self.permute(backend, &perm)
    }

    fn permute(&self, backend: &B, perm: &[usize]) -> Result<Self> {
        if perm.iter().enumerate().all(|(i, &p)| i == p) {
            return Ok(self.clone());
        }
        log::trace!("transpose {} by {perm:?}", format_axes(&self.axes));
        let raw = backend.transpose(&self.raw, perm)?;
        let axes = perm.iter().map(|&p| self.axes[p].clone()).collect();
        Self::from_engine(backend, "rearrange", raw, axes)
    }

    /// Widens the array to `axes`, which must contain every axis of `self` with the same size.
    ///
    /// This is the explicit broadcast needed before combining arrays with unrelated axes.
    pub fn broadcast_to(&self, backend: &B, axes: &[Axis]) -> Result<Self> {
        let target: AxisList = axes.iter().cloned().collect();
        check_unique(&target)?;
        let map = AxisMap::new(&target);
        for axis in self.axes.iter() {
            match map.get(axis.name()) {
                Some(entry) if entry.size == axis.size() => {}
                Some(entry) => {
                    return Err(NamedError::IncompatibleShape {
                        axis: axis.name().to_string(),
                        left: axis.size(),
                        right: entry.size,
                    })
                }
                None => bail_arg!(
                    "cannot broadcast {} to {}: axis '{}' is not in the target",
                    format_axes(&self.axes),
                    format_axes(&target),
                    axis.name()
                ),
            }
        }
        let plan = BroadcastPlan::new(target);
        let raw = plan.expand(backend, &Operand::Named(self.clone()))?;
        Self::from_engine(backend, "broadcast_to", raw, plan.axes)
    }

    /// Extracts the value of a zero-axis array.
    pub fn scalar(&self, backend: &B) -> Result<Scalar> {
        ensure_arg!(
            self.is_scalar(),
            "scalar() requires a zero-axis array, got axes {}",
            format_axes(&self.axes)
        );
        let literal = backend.to_literal(&self.raw)?;
        let value = match &literal.data {
            LiteralData::F32(v) => v.first().copied().map(Scalar::F32),
            LiteralData::I32(v) => v.first().copied().map(Scalar::I32),
            LiteralData::Bool(v) => v.first().copied().map(Scalar::Bool),
        };
        value.ok_or_else(|| NamedError::argument("zero-axis array holds no value"))
    }

    /// Reads the array back to the host in its current axis order.
    pub fn to_literal(&self, backend: &B) -> Result<ArrayLiteral> {
        Ok(backend.to_literal(&self.raw)?)
    }
}

/// A value accepted wherever the layer broadcasts: a named array, a host scalar, or an
/// unnamed engine array.
///
/// Unnamed arrays of rank 0 behave like scalars; higher-rank unnamed arrays cannot be aligned
/// by name and are rejected by the broadcasting engine.
pub enum Operand<B: ArrayBackend> {
    Named(NamedArray<B>),
    Scalar(Scalar),
    Raw(B::Array),
}

impl<B: ArrayBackend> Clone for Operand<B> {
    fn clone(&self) -> Self {
        match self {
            Operand::Named(array) => Operand::Named(array.clone()),
            Operand::Scalar(value) => Operand::Scalar(*value),
            Operand::Raw(raw) => Operand::Raw(raw.clone()),
        }
    }
}

impl<B: ArrayBackend> fmt::Debug for Operand<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Named(array) => array.fmt(f),
            Operand::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Operand::Raw(_) => f.write_str("Raw(..)"),
        }
    }
}

impl<B: ArrayBackend> Operand<B> {
    /// Axes of a named operand; empty otherwise.
    pub fn axes(&self) -> &[Axis] {
        match self {
            Operand::Named(array) => array.axes(),
            Operand::Scalar(_) | Operand::Raw(_) => &[],
        }
    }

    pub fn as_named(&self) -> Option<&NamedArray<B>> {
        match self {
            Operand::Named(array) => Some(array),
            _ => None,
        }
    }

    /// True for host scalars, zero-axis named arrays, and rank-0 unnamed arrays.
    pub fn is_scalarish(&self, backend: &B) -> bool {
        match self {
            Operand::Named(array) => array.is_scalar(),
            Operand::Scalar(_) => true,
            Operand::Raw(raw) => backend.shape(raw).is_empty(),
        }
    }

    pub fn dtype(&self, backend: &B) -> DType {
        match self {
            Operand::Named(array) => array.dtype(backend),
            Operand::Raw(raw) => backend.dtype(raw),
            Operand::Scalar(value) => value.dtype(),
        }
    }

    /// Casts a host scalar to `dtype`; array operands are returned unchanged.
    pub fn coerce_scalar(self, dtype: Option<DType>) -> Self {
        match (self, dtype) {
            (Operand::Scalar(value), Some(dtype)) => Operand::Scalar(value.cast(dtype)),
            (other, _) => other,
        }
    }

    /// The raw engine array, materialising host scalars as rank-0 arrays.
    pub fn to_raw(&self, backend: &B) -> Result<B::Array> {
        match self {
            Operand::Named(array) => Ok(array.raw().clone()),
            Operand::Scalar(value) => Ok(backend.materialize(value.to_literal())?),
            Operand::Raw(raw) => Ok(raw.clone()),
        }
    }

    /// Promotes a scalar-like operand to a zero-axis named array.
    pub fn into_named(self, backend: &B) -> Result<NamedArray<B>> {
        match self {
            Operand::Named(array) => Ok(array),
            Operand::Scalar(value) => NamedArray::scalar_value(backend, value),
            Operand::Raw(raw) => NamedArray::new(backend, raw, []),
        }
    }
}

/// Dtype every value operand is promoted to before an elementwise kernel.
///
/// Integer arrays next to a float scalar become float rather than truncating the scalar.
pub(crate) fn common_value_dtype<B: ArrayBackend>(
    backend: &B,
    operands: &[&Operand<B>],
) -> Option<DType> {
    operands
        .iter()
        .map(|operand| operand.dtype(backend))
        .reduce(DType::promote)
}

/// Casts raw arrays that do not already hold `dtype`.
pub(crate) fn cast_arrays<B: ArrayBackend>(
    backend: &B,
    arrays: Vec<B::Array>,
    dtype: Option<DType>,
) -> Result<Vec<B::Array>> {
    arrays
        .into_iter()
        .map(|raw| cast_raw(backend, raw, dtype))
        .collect()
}

pub(crate) fn cast_raw<B: ArrayBackend>(
    backend: &B,
    raw: B::Array,
    dtype: Option<DType>,
) -> Result<B::Array> {
    match dtype {
        Some(dtype) if backend.dtype(&raw) != dtype => {
            log::trace!("promote {} operand to {dtype}", backend.dtype(&raw));
            Ok(backend.cast(&raw, dtype)?)
        }
        _ => Ok(raw),
    }
}

impl<B: ArrayBackend> From<NamedArray<B>> for Operand<B> {
    fn from(array: NamedArray<B>) -> Self {
        Operand::Named(array)
    }
}

impl<B: ArrayBackend> From<&NamedArray<B>> for Operand<B> {
    fn from(array: &NamedArray<B>) -> Self {
        Operand::Named(array.clone())
    }
}

impl<B: ArrayBackend> From<Scalar> for Operand<B> {
    fn from(value: Scalar) -> Self {
        Operand::Scalar(value)
    }
}

impl<B: ArrayBackend> From<f32> for Operand<B> {
    fn from(value: f32) -> Self {
        Operand::Scalar(Scalar::F32(value))
    }
}

impl<B: ArrayBackend> From<i32> for Operand<B> {
    fn from(value: i32) -> Self {
        Operand::Scalar(Scalar::I32(value))
    }
}

impl<B: ArrayBackend> From<bool> for Operand<B> {
    fn from(value: bool) -> Self {
        Operand::Scalar(Scalar::Bool(value))
    }
}

fn check_unique(axes: &[Axis]) -> Result<()> {
    for (i, axis) in axes.iter().enumerate() {
        if axes[..i].iter().any(|other| other.name() == axis.name()) {
            bail_arg!(
                "duplicate axis name '{}' in {}",
                axis.name(),
                format_axes(axes)
            );
        }
    }
    Ok(())
}

fn check_shape(dims: &[usize], axes: &[Axis]) -> Result<()> {
    let matches = dims.len() == axes.len()
        && dims
            .iter()
            .zip(axes.iter())
            .all(|(&dim, axis)| dim == axis.size());
    ensure_arg!(
        matches,
        "array shape {dims:?} does not match axes {}",
        format_axes(axes)
    );
    Ok(())
}

fn check_permutation(perm: &[usize], axes: &[Axis]) -> Result<()> {
    let mut seen = vec![false; axes.len()];
    for &index in perm {
        ensure_arg!(
            !seen[index],
            "axis '{}' appears more than once in the requested order",
            axes[index].name()
        );
        seen[index] = true;
    }
    Ok(())
}
