use std::sync::Mutex;

use nax_rs::backend::spec::{
    ArrayBackend, ArrayLiteral, BackendResult, BinaryOp, CompareOp, DType, PadMode, Triangle,
};

/// Test-only engine that forwards to `inner` and records the name of every primitive that
/// touches array values or layout.
///
/// Metadata queries (`shape`, `dtype`, `backend_name`) and `to_literal` are not recorded.
#[derive(Default)]
pub struct RecordingBackend<B> {
    inner: B,
    calls: Mutex<Vec<&'static str>>,
}

impl<B: ArrayBackend> RecordingBackend<B> {
    pub fn new(inner: B) -> Self {
        RecordingBackend {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("backend mutex poisoned").clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|call| *call == name)
    }

    pub fn clear(&self) {
        self.calls.lock().expect("backend mutex poisoned").clear();
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().expect("backend mutex poisoned").push(name);
    }
}

impl<B: ArrayBackend> ArrayBackend for RecordingBackend<B> {
    type Array = B::Array;

    fn backend_name(&self) -> &str {
        "recording"
    }

    fn materialize(&self, literal: ArrayLiteral) -> BackendResult<Self::Array> {
        self.record("materialize");
        self.inner.materialize(literal)
    }

    fn to_literal(&self, array: &Self::Array) -> BackendResult<ArrayLiteral> {
        self.inner.to_literal(array)
    }

    fn shape(&self, array: &Self::Array) -> Vec<usize> {
        self.inner.shape(array)
    }

    fn dtype(&self, array: &Self::Array) -> DType {
        self.inner.dtype(array)
    }

    fn cast(&self, array: &Self::Array, dtype: DType) -> BackendResult<Self::Array> {
        self.record("cast");
        self.inner.cast(array, dtype)
    }

    fn reshape(&self, array: &Self::Array, dims: &[usize]) -> BackendResult<Self::Array> {
        self.record("reshape");
        self.inner.reshape(array, dims)
    }

    fn transpose(&self, array: &Self::Array, perm: &[usize]) -> BackendResult<Self::Array> {
        self.record("transpose");
        self.inner.transpose(array, perm)
    }

    fn broadcast_to(&self, array: &Self::Array, dims: &[usize]) -> BackendResult<Self::Array> {
        self.record("broadcast_to");
        self.inner.broadcast_to(array, dims)
    }

    fn elementwise_binary(
        &self,
        op: BinaryOp,
        lhs: &Self::Array,
        rhs: &Self::Array,
    ) -> BackendResult<Self::Array> {
        self.record("elementwise_binary");
        self.inner.elementwise_binary(op, lhs, rhs)
    }

    fn compare(
        &self,
        op: CompareOp,
        lhs: &Self::Array,
        rhs: &Self::Array,
    ) -> BackendResult<Self::Array> {
        self.record("compare");
        self.inner.compare(op, lhs, rhs)
    }

    fn select(
        &self,
        pred: &Self::Array,
        on_true: &Self::Array,
        on_false: &Self::Array,
    ) -> BackendResult<Self::Array> {
        self.record("select");
        self.inner.select(pred, on_true, on_false)
    }

    fn cond(
        &self,
        pred: &Self::Array,
        on_true: &Self::Array,
        on_false: &Self::Array,
    ) -> BackendResult<Self::Array> {
        self.record("cond");
        self.inner.cond(pred, on_true, on_false)
    }

    fn clamp(
        &self,
        array: &Self::Array,
        min: &Self::Array,
        max: &Self::Array,
    ) -> BackendResult<Self::Array> {
        self.record("clamp");
        self.inner.clamp(array, min, max)
    }

    fn trace(
        &self,
        array: &Self::Array,
        offset: isize,
        axis1: usize,
        axis2: usize,
    ) -> BackendResult<Self::Array> {
        self.record("trace");
        self.inner.trace(array, offset, axis1, axis2)
    }

    fn triangular(
        &self,
        array: &Self::Array,
        triangle: Triangle,
        k: isize,
    ) -> BackendResult<Self::Array> {
        self.record("triangular");
        self.inner.triangular(array, triangle, k)
    }

    fn isclose(
        &self,
        lhs: &Self::Array,
        rhs: &Self::Array,
        rtol: f64,
        atol: f64,
        equal_nan: bool,
    ) -> BackendResult<Self::Array> {
        self.record("isclose");
        self.inner.isclose(lhs, rhs, rtol, atol, equal_nan)
    }

    fn pad(
        &self,
        array: &Self::Array,
        widths: &[(usize, usize)],
        mode: &PadMode,
        constant: &Self::Array,
    ) -> BackendResult<Self::Array> {
        self.record("pad");
        self.inner.pad(array, widths, mode, constant)
    }

    fn nonzero(
        &self,
        pred: &Self::Array,
        size: usize,
        fill: i32,
    ) -> BackendResult<Vec<Self::Array>> {
        self.record("nonzero");
        self.inner.nonzero(pred, size, fill)
    }
}
