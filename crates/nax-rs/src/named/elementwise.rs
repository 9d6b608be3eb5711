//! Binary elementwise arithmetic and comparisons with broadcasting by axis name.

use crate::backend::{ArrayBackend, BackendResult, BinaryOp, CompareOp};
use crate::error::Result;
use crate::named::{broadcast_arrays, common_value_dtype, NamedArray, Operand};

fn binary_op<B, F>(
    backend: &B,
    op_name: &str,
    lhs: Operand<B>,
    rhs: Operand<B>,
    kernel: F,
) -> Result<NamedArray<B>>
where
    B: ArrayBackend,
    F: FnOnce(&B, &B::Array, &B::Array) -> BackendResult<B::Array>,
{
    let dtype = common_value_dtype(backend, &[&lhs, &rhs]);
    let lhs = lhs.coerce_scalar(dtype);
    let rhs = rhs.coerce_scalar(dtype);
    let aligned = broadcast_arrays(backend, &[&lhs, &rhs])?.promote(backend, dtype)?;
    log::trace!("{op_name} over {:?}", aligned.axes());
    let raw = kernel(backend, &aligned.arrays[0], &aligned.arrays[1])?;
    NamedArray::from_engine(backend, op_name, raw, aligned.plan.axes)
}

/// Applies an arithmetic [`BinaryOp`] after aligning both operands by axis name.
pub fn elementwise<B: ArrayBackend>(
    backend: &B,
    op: BinaryOp,
    lhs: impl Into<Operand<B>>,
    rhs: impl Into<Operand<B>>,
) -> Result<NamedArray<B>> {
    binary_op(backend, "elementwise", lhs.into(), rhs.into(), |b, l, r| {
        b.elementwise_binary(op, l, r)
    })
}

/// Applies a [`CompareOp`] after aligning both operands by axis name, producing booleans.
pub fn compare<B: ArrayBackend>(
    backend: &B,
    op: CompareOp,
    lhs: impl Into<Operand<B>>,
    rhs: impl Into<Operand<B>>,
) -> Result<NamedArray<B>> {
    binary_op(backend, "compare", lhs.into(), rhs.into(), |b, l, r| {
        b.compare(op, l, r)
    })
}

macro_rules! named_binary {
    ($($(#[$meta:meta])* $name:ident => $kind:ident :: $variant:ident,)*) => {
        $(
            $(#[$meta])*
            pub fn $name<B: ArrayBackend>(
                backend: &B,
                lhs: impl Into<Operand<B>>,
                rhs: impl Into<Operand<B>>,
            ) -> Result<NamedArray<B>> {
                named_binary!(@dispatch $kind, backend, $kind::$variant, lhs, rhs)
            }
        )*
    };
    (@dispatch BinaryOp, $backend:expr, $op:expr, $lhs:expr, $rhs:expr) => {
        elementwise($backend, $op, $lhs, $rhs)
    };
    (@dispatch CompareOp, $backend:expr, $op:expr, $lhs:expr, $rhs:expr) => {
        compare($backend, $op, $lhs, $rhs)
    };
}

named_binary! {
    /// Elementwise `lhs + rhs`.
    add => BinaryOp::Add,
    /// Elementwise `lhs - rhs`.
    sub => BinaryOp::Sub,
    /// Elementwise `lhs * rhs`.
    mul => BinaryOp::Mul,
    /// Elementwise `lhs / rhs`.
    div => BinaryOp::Div,
    maximum => BinaryOp::Maximum,
    minimum => BinaryOp::Minimum,
    /// Elementwise `lhs > rhs`.
    greater => CompareOp::Greater,
    greater_equal => CompareOp::GreaterEqual,
    /// Elementwise `lhs < rhs`.
    less => CompareOp::Less,
    less_equal => CompareOp::LessEqual,
    equal => CompareOp::Equal,
    not_equal => CompareOp::NotEqual,
}
