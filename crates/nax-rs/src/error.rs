//! Error taxonomy of the named-axis layer.

use thiserror::Error;

use crate::axis::{format_axes, Axis, AxisSelector};
use crate::backend::BackendError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NamedError {
    /// A requested axis is not present on the target array.
    #[error("axis {axis} not found in array; available axes: {available}")]
    MissingAxis { axis: String, available: String },

    /// Two operands agree on an axis name but not on its size.
    #[error("axis '{axis}' has incompatible sizes {left} and {right}")]
    IncompatibleShape {
        axis: String,
        left: usize,
        right: usize,
    },

    /// Axis sets that need an explicit `broadcast_to` before they can be combined.
    #[error("cannot broadcast {left} with {right}; broadcast one operand explicitly first")]
    DisjointAxes { left: String, right: String },

    /// Malformed call shape.
    #[error("{0}")]
    Argument(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl NamedError {
    pub(crate) fn missing_axis(selector: &AxisSelector, available: &[Axis]) -> Self {
        NamedError::MissingAxis {
            axis: selector.to_string(),
            available: format_axes(available),
        }
    }

    pub(crate) fn disjoint(left: &[Axis], right: &[Axis]) -> Self {
        NamedError::DisjointAxes {
            left: format_axes(left),
            right: format_axes(right),
        }
    }

    pub(crate) fn argument(message: impl Into<String>) -> Self {
        NamedError::Argument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, NamedError>;

/// Bails out of the enclosing function with [`NamedError::Argument`].
macro_rules! bail_arg {
    ($($arg:tt)*) => {
        return Err($crate::error::NamedError::Argument(format!($($arg)*)))
    };
}

/// Like `anyhow::ensure!`, but producing [`NamedError::Argument`].
macro_rules! ensure_arg {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::error::bail_arg!($($arg)*);
        }
    };
}

pub(crate) use bail_arg;
pub(crate) use ensure_arg;
