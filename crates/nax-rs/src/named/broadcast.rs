//! Broadcasting by axis name.
//!
//! Operands are merged left to right. Each merge requires one axis set to contain the other,
//! which rejects arrays whose axes only coincide by accident; callers widen an operand with
//! [`NamedArray::broadcast_to`] when they really mean an outer product. The merged order keeps
//! the earlier operand's axes first and appends new axes in order of first appearance.

use indexmap::IndexMap;

use crate::axis::{format_axes, Axis};
use crate::backend::{ArrayBackend, DType};
use crate::error::{bail_arg, NamedError, Result};
use crate::named::{cast_arrays, AxisList, NamedArray, Operand};

/// Size and position of one axis inside an axis list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisEntry {
    pub size: usize,
    pub position: usize,
}

/// Ordered map from axis name to size and position, built fresh for each lookup pass.
#[derive(Debug, Clone)]
pub struct AxisMap<'a> {
    entries: IndexMap<&'a str, AxisEntry>,
}

impl<'a> AxisMap<'a> {
    pub fn new(axes: &'a [Axis]) -> Self {
        let entries = axes
            .iter()
            .enumerate()
            .map(|(position, axis)| {
                (
                    axis.name(),
                    AxisEntry {
                        size: axis.size(),
                        position,
                    },
                )
            })
            .collect();
        AxisMap { entries }
    }

    pub fn get(&self, name: &str) -> Option<&AxisEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merges two axis lists. See the module docs for the rules.
fn merge_axes(acc: &[Axis], next: &[Axis]) -> Result<AxisList> {
    let acc_map = AxisMap::new(acc);
    let mut shared = 0usize;
    for axis in next {
        if let Some(entry) = acc_map.get(axis.name()) {
            if entry.size != axis.size() {
                return Err(NamedError::IncompatibleShape {
                    axis: axis.name().to_string(),
                    left: entry.size,
                    right: axis.size(),
                });
            }
            shared += 1;
        }
    }

    let next_is_subset = shared == next.len();
    let acc_is_subset = shared == acc.len();
    if !next_is_subset && !acc_is_subset {
        return Err(NamedError::disjoint(acc, next));
    }

    let mut merged: AxisList = acc.iter().cloned().collect();
    merged.extend(
        next.iter()
            .filter(|axis| !acc_map.contains(axis.name()))
            .cloned(),
    );
    Ok(merged)
}

/// Computes the common axis order of several axis lists.
pub fn broadcast_axes<'a, I>(axis_lists: I) -> Result<AxisList>
where
    I: IntoIterator<Item = &'a [Axis]>,
{
    let mut acc = AxisList::new();
    for axes in axis_lists {
        acc = merge_axes(&acc, axes)?;
    }
    Ok(acc)
}

/// Common axis order together with the recipe to align operands to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPlan {
    pub axes: AxisList,
}

impl BroadcastPlan {
    pub fn new(axes: AxisList) -> Self {
        BroadcastPlan { axes }
    }

    /// Validates `operands` and computes their common axis order without touching the engine's
    /// kernels.
    pub fn for_operands<B: ArrayBackend>(backend: &B, operands: &[&Operand<B>]) -> Result<Self> {
        for operand in operands {
            if let Operand::Raw(raw) = operand {
                let dims = backend.shape(raw);
                if !dims.is_empty() {
                    bail_arg!(
                        "unnamed array of shape {dims:?} cannot be aligned by axis name; wrap it in a NamedArray"
                    );
                }
            }
        }
        let axes = broadcast_axes(operands.iter().map(|operand| operand.axes()))?;
        log::debug!(
            "broadcast plan {} for {} operands",
            format_axes(&axes),
            operands.len()
        );
        Ok(BroadcastPlan { axes })
    }

    pub fn dims(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::size).collect()
    }

    /// Transposes `operand` into plan order and inserts unit dimensions for missing axes.
    pub fn align<B: ArrayBackend>(&self, backend: &B, operand: &Operand<B>) -> Result<B::Array> {
        match operand {
            Operand::Named(array) => self.align_named(backend, array),
            Operand::Scalar(_) | Operand::Raw(_) => {
                let raw = operand.to_raw(backend)?;
                if self.axes.is_empty() {
                    return Ok(raw);
                }
                let ones = vec![1; self.axes.len()];
                Ok(backend.reshape(&raw, &ones)?)
            }
        }
    }

    fn align_named<B: ArrayBackend>(&self, backend: &B, array: &NamedArray<B>) -> Result<B::Array> {
        let source = AxisMap::new(array.axes());
        let perm: Vec<usize> = self
            .axes
            .iter()
            .filter_map(|axis| source.get(axis.name()).map(|entry| entry.position))
            .collect();
        if perm.len() != source.len() {
            bail_arg!(
                "axes {} are not contained in broadcast axes {}",
                format_axes(array.axes()),
                format_axes(&self.axes)
            );
        }

        let mut raw = array.raw().clone();
        if perm.iter().enumerate().any(|(i, &p)| i != p) {
            raw = backend.transpose(&raw, &perm)?;
        }
        if perm.len() != self.axes.len() {
            let unit_dims: Vec<usize> = self
                .axes
                .iter()
                .map(|axis| if source.contains(axis.name()) { axis.size() } else { 1 })
                .collect();
            raw = backend.reshape(&raw, &unit_dims)?;
        }
        Ok(raw)
    }

    /// Aligns `operand` and materialises it over the full plan shape.
    pub fn expand<B: ArrayBackend>(&self, backend: &B, operand: &Operand<B>) -> Result<B::Array> {
        let aligned = self.align(backend, operand)?;
        let dims = self.dims();
        if backend.shape(&aligned) == dims {
            return Ok(aligned);
        }
        Ok(backend.broadcast_to(&aligned, &dims)?)
    }
}

/// Operands aligned to a common axis order.
pub struct Broadcast<B: ArrayBackend> {
    pub plan: BroadcastPlan,
    /// One raw array per operand, each of rank `plan.axes.len()` with unit dimensions where the
    /// operand lacks an axis.
    pub arrays: Vec<B::Array>,
}

impl<B: ArrayBackend> Broadcast<B> {
    pub fn axes(&self) -> &[Axis] {
        &self.plan.axes
    }

    /// Casts every aligned array to `dtype` where it differs.
    pub fn promote(self, backend: &B, dtype: Option<DType>) -> Result<Self> {
        let arrays = cast_arrays(backend, self.arrays, dtype)?;
        Ok(Broadcast {
            plan: self.plan,
            arrays,
        })
    }
}

/// Validates and aligns `operands` for an elementwise engine call.
pub fn broadcast_arrays<B: ArrayBackend>(
    backend: &B,
    operands: &[&Operand<B>],
) -> Result<Broadcast<B>> {
    let plan = BroadcastPlan::for_operands(backend, operands)?;
    let arrays = operands
        .iter()
        .map(|operand| plan.align(backend, operand))
        .collect::<Result<Vec<_>>>()?;
    Ok(Broadcast { plan, arrays })
}
