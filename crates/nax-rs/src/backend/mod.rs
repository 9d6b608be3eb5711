//! Array-compute engine contract.

pub mod spec;

pub use spec::{
    ArrayBackend, ArrayLiteral, BackendError, BackendResult, BinaryOp, CompareOp, DType,
    LiteralData, PadMode, Scalar, Triangle,
};
