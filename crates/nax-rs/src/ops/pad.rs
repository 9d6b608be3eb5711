use crate::axis::{format_axes, Axis, AxisSelector};
use crate::backend::{ArrayBackend, PadMode, Scalar};
use crate::error::{bail_arg, ensure_arg, Result};
use crate::named::{cast_raw, AxisList, NamedArray, Operand};

/// Per-axis `(before, after)` padding amounts keyed by axis or axis name.
///
/// A key holding a full [`Axis`] only matches an array axis with the same name and size; a bare
/// name matches by name. When both match, the full axis wins. Axes without an entry are not
/// padded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PadWidths {
    entries: Vec<(AxisSelector, (usize, usize))>,
}

impl PadWidths {
    pub fn new() -> Self {
        PadWidths::default()
    }

    /// Sets the padding for `axis`, replacing an entry with the same key.
    pub fn insert(&mut self, axis: impl Into<AxisSelector>, before: usize, after: usize) {
        let key = axis.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, widths)) => *widths = (before, after),
            None => self.entries.push((key, (before, after))),
        }
    }

    pub fn with(mut self, axis: impl Into<AxisSelector>, before: usize, after: usize) -> Self {
        self.insert(axis, before, after);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Padding for `axis`: an exact axis key first, then a name key.
    pub fn lookup(&self, axis: &Axis) -> Option<(usize, usize)> {
        let exact = self.entries.iter().find_map(|(key, widths)| match key {
            AxisSelector::Axis(candidate) if candidate == axis => Some(*widths),
            _ => None,
        });
        exact.or_else(|| {
            self.entries.iter().find_map(|(key, widths)| match key {
                AxisSelector::Name(name) if &**name == axis.name() => Some(*widths),
                _ => None,
            })
        })
    }

    fn keys(&self) -> impl Iterator<Item = &AxisSelector> {
        self.entries.iter().map(|(key, _)| key)
    }
}

impl<S: Into<AxisSelector>> FromIterator<(S, (usize, usize))> for PadWidths {
    fn from_iter<I: IntoIterator<Item = (S, (usize, usize))>>(iter: I) -> Self {
        let mut widths = PadWidths::new();
        for (axis, (before, after)) in iter {
            widths.insert(axis, before, after);
        }
        widths
    }
}

/// Pads `array` along named axes.
///
/// Each axis grows by its `before + after` amounts from `pad_width`; axis order is unchanged.
/// `mode` is forwarded to the engine. `constant_values` is used by [`PadMode::Constant`] and may
/// be a scalar or an array the engine accepts as a fill; it is cast to the array dtype.
pub fn pad<B: ArrayBackend>(
    backend: &B,
    array: &NamedArray<B>,
    pad_width: &PadWidths,
    mode: PadMode,
    constant_values: impl Into<Operand<B>>,
) -> Result<NamedArray<B>> {
    for key in pad_width.keys() {
        if array.axis_index(key).is_none() {
            log::debug!(
                "pad width for {key} ignored; array axes are {}",
                format_axes(array.axes())
            );
        }
    }

    let mut widths = Vec::with_capacity(array.rank());
    let mut axes = AxisList::new();
    for axis in array.axes() {
        let (before, after) = pad_width.lookup(axis).unwrap_or((0, 0));
        widths.push((before, after));
        axes.push(axis.resize(axis.size() + before + after));
    }

    let dtype = Some(array.dtype(backend));
    let constant = constant_values.into().coerce_scalar(dtype).to_raw(backend)?;
    let constant = cast_raw(backend, constant, dtype)?;
    log::trace!("pad {} by {widths:?} ({mode})", format_axes(array.axes()));
    let raw = backend.pad(array.raw(), &widths, &mode, &constant)?;
    NamedArray::from_engine(backend, "pad", raw, axes)
}

/// Pads `axis` on its low side so it becomes `new_axis`, filling with `value`.
///
/// `new_axis` replaces `axis` in place and must be at least as large.
pub fn pad_left<B: ArrayBackend>(
    backend: &B,
    array: &NamedArray<B>,
    axis: impl Into<AxisSelector>,
    new_axis: &Axis,
    value: impl Into<Scalar>,
) -> Result<NamedArray<B>> {
    let axis = axis.into();
    let index = array.resolve_axis(&axis)?;
    let old_axis = &array.axes()[index];
    if new_axis.size() < old_axis.size() {
        bail_arg!("cannot pad {old_axis} to {new_axis}");
    }
    let clash = array
        .axes()
        .iter()
        .enumerate()
        .any(|(i, other)| i != index && other.name() == new_axis.name());
    ensure_arg!(
        !clash,
        "new axis {new_axis} collides with an existing axis of {}",
        format_axes(array.axes())
    );

    let mut widths = vec![(0, 0); array.rank()];
    widths[index] = (new_axis.size() - old_axis.size(), 0);
    let mut axes: AxisList = array.axes().iter().cloned().collect();
    axes[index] = new_axis.clone();

    let fill = value.into().cast(array.dtype(backend));
    let constant = backend.materialize(fill.to_literal())?;
    log::trace!("pad_left position {index} by {}", widths[index].0);
    let raw = backend.pad(array.raw(), &widths, &PadMode::Constant, &constant)?;
    NamedArray::from_engine(backend, "pad_left", raw, axes)
}
