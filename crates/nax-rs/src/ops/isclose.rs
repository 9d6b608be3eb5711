use crate::axis::format_axes;
use crate::backend::ArrayBackend;
use crate::error::Result;
use crate::named::{broadcast_arrays, NamedArray, Operand};

/// Tolerances for [`isclose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsCloseOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Whether two NaNs compare as close.
    pub equal_nan: bool,
}

impl Default for IsCloseOptions {
    fn default() -> Self {
        IsCloseOptions {
            rtol: 1e-5,
            atol: 1e-8,
            equal_nan: false,
        }
    }
}

impl IsCloseOptions {
    pub fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    pub fn with_equal_nan(mut self, equal_nan: bool) -> Self {
        self.equal_nan = equal_nan;
        self
    }
}

/// Elementwise `|a - b| <= atol + rtol * |b|` after broadcasting by axis name.
pub fn isclose<B: ArrayBackend>(
    backend: &B,
    a: &NamedArray<B>,
    b: &NamedArray<B>,
    options: IsCloseOptions,
) -> Result<NamedArray<B>> {
    let a = Operand::Named(a.clone());
    let b = Operand::Named(b.clone());
    let aligned = broadcast_arrays(backend, &[&a, &b])?;
    log::trace!(
        "isclose over {} with {options:?}",
        format_axes(aligned.axes())
    );
    let raw = backend.isclose(
        &aligned.arrays[0],
        &aligned.arrays[1],
        options.rtol,
        options.atol,
        options.equal_nan,
    )?;
    NamedArray::from_engine(backend, "isclose", raw, aligned.plan.axes)
}
