//! Contract between the named-axis layer and the array-compute engine.
//!
//! The layer never inspects element values. Everything it needs from an engine is expressed as
//! positional primitives on opaque array handles: layout changes, elementwise kernels, and the
//! handful of structured kernels (trace, triangular masks, padding, nonzero) the named
//! operations wrap.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Scalar element types understood by engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point following IEEE-754 semantics.
    F32,
    /// 32-bit signed integer, used for index outputs.
    I32,
    /// Boolean predicate values.
    Bool,
}

impl DType {
    /// Returns the number of bytes required per scalar element.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::Bool => 1,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F32)
    }

    /// The narrowest dtype holding values of both `self` and `other`: `Bool < I32 < F32`.
    pub fn promote(self, other: DType) -> DType {
        fn rank(dtype: DType) -> u8 {
            match dtype {
                DType::Bool => 0,
                DType::I32 => 1,
                DType::F32 => 2,
            }
        }
        if rank(other) > rank(self) {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::I32 => "i32",
            DType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Host scalar used as an operand or fill value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    F32(f32),
    I32(i32),
    Bool(bool),
}

impl Scalar {
    pub fn dtype(self) -> DType {
        match self {
            Scalar::F32(_) => DType::F32,
            Scalar::I32(_) => DType::I32,
            Scalar::Bool(_) => DType::Bool,
        }
    }

    /// Python-style truthiness: nonzero numbers and `true` are truthy.
    pub fn truthy(self) -> bool {
        match self {
            Scalar::F32(v) => v != 0.0,
            Scalar::I32(v) => v != 0,
            Scalar::Bool(v) => v,
        }
    }

    /// Converts the scalar to another dtype with `as`-cast semantics.
    pub fn cast(self, dtype: DType) -> Scalar {
        match (self, dtype) {
            (Scalar::F32(v), DType::F32) => Scalar::F32(v),
            (Scalar::F32(v), DType::I32) => Scalar::I32(v as i32),
            (Scalar::F32(v), DType::Bool) => Scalar::Bool(v != 0.0),
            (Scalar::I32(v), DType::F32) => Scalar::F32(v as f32),
            (Scalar::I32(v), DType::I32) => Scalar::I32(v),
            (Scalar::I32(v), DType::Bool) => Scalar::Bool(v != 0),
            (Scalar::Bool(v), DType::F32) => Scalar::F32(if v { 1.0 } else { 0.0 }),
            (Scalar::Bool(v), DType::I32) => Scalar::I32(v as i32),
            (Scalar::Bool(v), DType::Bool) => Scalar::Bool(v),
        }
    }

    /// Wraps the scalar in a rank-0 literal.
    pub fn to_literal(self) -> ArrayLiteral {
        let data = match self {
            Scalar::F32(v) => LiteralData::F32(vec![v]),
            Scalar::I32(v) => LiteralData::I32(vec![v]),
            Scalar::Bool(v) => LiteralData::Bool(vec![v]),
        };
        ArrayLiteral {
            dims: Vec::new(),
            data,
        }
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::F32(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::I32(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Dense row-major host payload.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralData {
    F32(Vec<f32>),
    I32(Vec<i32>),
    Bool(Vec<bool>),
}

impl LiteralData {
    pub fn len(&self) -> usize {
        match self {
            LiteralData::F32(v) => v.len(),
            LiteralData::I32(v) => v.len(),
            LiteralData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            LiteralData::F32(_) => DType::F32,
            LiteralData::I32(_) => DType::I32,
            LiteralData::Bool(_) => DType::Bool,
        }
    }
}

/// Host copy of an engine array, used to move data in and out of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub dims: Vec<usize>,
    pub data: LiteralData,
}

impl ArrayLiteral {
    /// Builds a literal, validating the payload length against `dims`.
    pub fn new(dims: Vec<usize>, data: LiteralData) -> BackendResult<Self> {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(BackendError::execution(format!(
                "literal data length ({}) does not match dims {:?}",
                data.len(),
                dims
            )));
        }
        Ok(ArrayLiteral { dims, data })
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Borrows the payload as `f32`, failing on other dtypes.
    pub fn as_f32(&self) -> BackendResult<&[f32]> {
        match &self.data {
            LiteralData::F32(v) => Ok(v),
            other => Err(BackendError::execution(format!(
                "literal holds {} values, not f32",
                other.dtype()
            ))),
        }
    }

    pub fn as_i32(&self) -> BackendResult<&[i32]> {
        match &self.data {
            LiteralData::I32(v) => Ok(v),
            other => Err(BackendError::execution(format!(
                "literal holds {} values, not i32",
                other.dtype()
            ))),
        }
    }

    pub fn as_bool(&self) -> BackendResult<&[bool]> {
        match &self.data {
            LiteralData::Bool(v) => Ok(v),
            other => Err(BackendError::execution(format!(
                "literal holds {} values, not bool",
                other.dtype()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    NotEqual,
}

/// Which half of a matrix a triangular mask keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Triangle {
    Lower,
    Upper,
}

/// Padding strategy forwarded to [`ArrayBackend::pad`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PadMode {
    /// Fill with a constant value.
    #[default]
    Constant,
    /// Repeat the edge element.
    Edge,
    /// Mirror without repeating the edge element.
    Reflect,
    /// Mirror including the edge element.
    Symmetric,
    /// Wrap around to the opposite edge.
    Wrap,
    /// Engine-specific mode passed through by name.
    Custom(Cow<'static, str>),
}

impl fmt::Display for PadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadMode::Constant => f.write_str("constant"),
            PadMode::Edge => f.write_str("edge"),
            PadMode::Reflect => f.write_str("reflect"),
            PadMode::Symmetric => f.write_str("symmetric"),
            PadMode::Wrap => f.write_str("wrap"),
            PadMode::Custom(name) => f.write_str(name),
        }
    }
}

/// Errors reported by an engine while executing a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{op} is not implemented: {reason}")]
    Unimplemented { op: &'static str, reason: String },
    #[error("backend execution failure: {message}")]
    Execution { message: String },
}

impl BackendError {
    pub fn unimplemented(op: &'static str, reason: impl Into<String>) -> Self {
        BackendError::Unimplemented {
            op,
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        BackendError::Execution {
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by engine routines.
pub type BackendResult<T> = Result<T, BackendError>;

/// Positional array-compute engine wrapped by the named-axis layer.
///
/// Elementwise primitives (`elementwise_binary`, `compare`, `select`, `clamp`, `isclose`) receive
/// operands of equal rank whose dimensions either match or are `1`; engines broadcast the unit
/// dimensions. Every other primitive receives exactly the layout it operates on.
pub trait ArrayBackend: Send + Sync {
    type Array: Clone + Send + Sync + 'static;

    /// Returns a human-readable engine identifier (e.g., `"cpu"`).
    fn backend_name(&self) -> &str;

    /// Uploads a host literal.
    fn materialize(&self, literal: ArrayLiteral) -> BackendResult<Self::Array>;

    /// Reads an array back into a host literal (tests and scalar extraction).
    fn to_literal(&self, array: &Self::Array) -> BackendResult<ArrayLiteral>;

    /// Shape metadata; available without touching element values.
    fn shape(&self, array: &Self::Array) -> Vec<usize>;

    fn dtype(&self, array: &Self::Array) -> DType;

    fn cast(&self, array: &Self::Array, dtype: DType) -> BackendResult<Self::Array>;

    /// Row-major reshape preserving the element count.
    fn reshape(&self, array: &Self::Array, dims: &[usize]) -> BackendResult<Self::Array>;

    /// Output axis `i` is input axis `perm[i]`.
    fn transpose(&self, array: &Self::Array, perm: &[usize]) -> BackendResult<Self::Array>;

    /// Expands unit dimensions of an equal-rank array to `dims`.
    fn broadcast_to(&self, array: &Self::Array, dims: &[usize]) -> BackendResult<Self::Array>;

    fn elementwise_binary(
        &self,
        op: BinaryOp,
        lhs: &Self::Array,
        rhs: &Self::Array,
    ) -> BackendResult<Self::Array>;

    /// Elementwise comparison producing a `Bool` array.
    fn compare(
        &self,
        op: CompareOp,
        lhs: &Self::Array,
        rhs: &Self::Array,
    ) -> BackendResult<Self::Array>;

    /// Elementwise select: `pred ? on_true : on_false`.
    fn select(
        &self,
        pred: &Self::Array,
        on_true: &Self::Array,
        on_false: &Self::Array,
    ) -> BackendResult<Self::Array>;

    /// Branch select on a rank-0 `Bool` predicate, returning one operand whole.
    ///
    /// `on_true` and `on_false` always share shape and dtype.
    fn cond(
        &self,
        pred: &Self::Array,
        on_true: &Self::Array,
        on_false: &Self::Array,
    ) -> BackendResult<Self::Array>;

    fn clamp(
        &self,
        array: &Self::Array,
        min: &Self::Array,
        max: &Self::Array,
    ) -> BackendResult<Self::Array>;

    /// Sums the diagonal (shifted by `offset`) of the planes spanned by `axis1` and `axis2`.
    /// Both axes are removed from the result.
    fn trace(
        &self,
        array: &Self::Array,
        offset: isize,
        axis1: usize,
        axis2: usize,
    ) -> BackendResult<Self::Array>;

    /// Zeroes the entries outside the requested triangle of the trailing two dimensions.
    fn triangular(
        &self,
        array: &Self::Array,
        triangle: Triangle,
        k: isize,
    ) -> BackendResult<Self::Array>;

    /// `|a - b| <= atol + rtol * |b|`, producing a `Bool` array.
    fn isclose(
        &self,
        lhs: &Self::Array,
        rhs: &Self::Array,
        rtol: f64,
        atol: f64,
        equal_nan: bool,
    ) -> BackendResult<Self::Array>;

    /// Pads each dimension by `widths[i] = (before, after)`.
    fn pad(
        &self,
        array: &Self::Array,
        widths: &[(usize, usize)],
        mode: &PadMode,
        constant: &Self::Array,
    ) -> BackendResult<Self::Array>;

    /// Coordinates of true entries, one rank-1 `I32` array per input dimension, each of length
    /// `size`, truncated or padded with `fill`.
    fn nonzero(
        &self,
        pred: &Self::Array,
        size: usize,
        fill: i32,
    ) -> BackendResult<Vec<Self::Array>>;
}
