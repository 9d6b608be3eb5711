//! Named-axis operations.
//!
//! Each operation resolves axis names against its inputs, aligns multiple operands by name,
//! delegates the numeric work to the [`ArrayBackend`](crate::backend::ArrayBackend), and re-wraps
//! the raw result with the output axes it computed. All validation happens before the first
//! engine call.

pub mod clip;
pub mod isclose;
pub mod pad;
pub mod select;
pub mod trace;
pub mod triangular;

pub use clip::clip;
pub use isclose::{isclose, IsCloseOptions};
pub use pad::{pad, pad_left, PadWidths};
pub use select::{nonzero_indices, select, select_branch, where_, WhereOutput};
pub use trace::trace;
pub use triangular::{tril, triu};

pub use crate::backend::PadMode;
