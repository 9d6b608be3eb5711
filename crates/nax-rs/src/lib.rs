//! Named-axis operations over backend-agnostic arrays.
//!
//! Arrays carry a name for every dimension ([`Axis`]). Operations such as [`ops::trace`],
//! [`ops::where_`], [`ops::clip`], [`ops::tril`], [`ops::isclose`] and [`ops::pad`] take axis
//! names instead of positions and align operands by name before handing positional work to an
//! [`ArrayBackend`].

pub mod axis;
pub mod backend;
mod env;
pub mod error;
pub mod named;
pub mod ops;

pub use axis::{axis_name, Axis, AxisSelector};
pub use backend::{ArrayBackend, DType, Scalar};
pub use error::{NamedError, Result};
pub use named::{NamedArray, Operand};
pub use ops::{clip, isclose, pad, pad_left, trace, tril, triu, where_};
