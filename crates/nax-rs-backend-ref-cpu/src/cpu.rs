use std::sync::Arc;

use nax_rs::backend::spec::{
    ArrayBackend, ArrayLiteral, BackendError, BackendResult, BinaryOp, CompareOp, DType,
    LiteralData, PadMode, Triangle,
};

#[derive(Clone, Debug)]
pub struct CpuArray {
    pub dims: Vec<usize>,
    pub data: TensorData,
}

#[derive(Clone, Debug)]
pub enum TensorData {
    F32(Arc<[f32]>),
    I32(Arc<[i32]>),
    Bool(Arc<[bool]>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::F32(_) => DType::F32,
            TensorData::I32(_) => DType::I32,
            TensorData::Bool(_) => DType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(values) => values.len(),
            TensorData::I32(values) => values.len(),
            TensorData::Bool(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn gather(&self, indices: &[usize]) -> TensorData {
        match self {
            TensorData::F32(values) => TensorData::F32(gather_values(values, indices)),
            TensorData::I32(values) => TensorData::I32(gather_values(values, indices)),
            TensorData::Bool(values) => TensorData::Bool(gather_values(values, indices)),
        }
    }
}

impl CpuArray {
    pub fn new(dims: Vec<usize>, data: TensorData) -> BackendResult<Self> {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(BackendError::execution(format!(
                "buffer holds {} elements but dims {:?} need {}",
                data.len(),
                dims,
                expected
            )));
        }
        Ok(CpuArray { dims, data })
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Host-memory engine that evaluates every primitive eagerly.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl ArrayBackend for CpuBackend {
    type Array = CpuArray;

    fn backend_name(&self) -> &str {
        "cpu"
    }

    fn materialize(&self, literal: ArrayLiteral) -> BackendResult<Self::Array> {
        literal_to_array(literal)
    }

    fn to_literal(&self, array: &Self::Array) -> BackendResult<ArrayLiteral> {
        array_to_literal(array)
    }

    fn shape(&self, array: &Self::Array) -> Vec<usize> {
        array.dims.clone()
    }

    fn dtype(&self, array: &Self::Array) -> DType {
        array.dtype()
    }

    fn cast(&self, array: &Self::Array, dtype: DType) -> BackendResult<Self::Array> {
        op_cast(array, dtype)
    }

    fn reshape(&self, array: &Self::Array, dims: &[usize]) -> BackendResult<Self::Array> {
        op_reshape(array, dims)
    }

    fn transpose(&self, array: &Self::Array, perm: &[usize]) -> BackendResult<Self::Array> {
        op_transpose(array, perm)
    }

    fn broadcast_to(&self, array: &Self::Array, dims: &[usize]) -> BackendResult<Self::Array> {
        op_broadcast_to(array, dims)
    }

    fn elementwise_binary(
        &self,
        op: BinaryOp,
        lhs: &Self::Array,
        rhs: &Self::Array,
    ) -> BackendResult<Self::Array> {
        op_elementwise_binary(op, lhs, rhs)
    }

    fn compare(
        &self,
        op: CompareOp,
        lhs: &Self::Array,
        rhs: &Self::Array,
    ) -> BackendResult<Self::Array> {
        op_compare(op, lhs, rhs)
    }

    fn select(
        &self,
        pred: &Self::Array,
        on_true: &Self::Array,
        on_false: &Self::Array,
    ) -> BackendResult<Self::Array> {
        op_select(pred, on_true, on_false)
    }

    fn cond(
        &self,
        pred: &Self::Array,
        on_true: &Self::Array,
        on_false: &Self::Array,
    ) -> BackendResult<Self::Array> {
        op_cond(pred, on_true, on_false)
    }

    fn clamp(
        &self,
        array: &Self::Array,
        min: &Self::Array,
        max: &Self::Array,
    ) -> BackendResult<Self::Array> {
        op_clamp(array, min, max)
    }

    fn trace(
        &self,
        array: &Self::Array,
        offset: isize,
        axis1: usize,
        axis2: usize,
    ) -> BackendResult<Self::Array> {
        op_trace(array, offset, axis1, axis2)
    }

    fn triangular(
        &self,
        array: &Self::Array,
        triangle: Triangle,
        k: isize,
    ) -> BackendResult<Self::Array> {
        op_triangular(array, triangle, k)
    }

    fn isclose(
        &self,
        lhs: &Self::Array,
        rhs: &Self::Array,
        rtol: f64,
        atol: f64,
        equal_nan: bool,
    ) -> BackendResult<Self::Array> {
        op_isclose(lhs, rhs, rtol, atol, equal_nan)
    }

    fn pad(
        &self,
        array: &Self::Array,
        widths: &[(usize, usize)],
        mode: &PadMode,
        constant: &Self::Array,
    ) -> BackendResult<Self::Array> {
        op_pad(array, widths, mode, constant)
    }

    fn nonzero(
        &self,
        pred: &Self::Array,
        size: usize,
        fill: i32,
    ) -> BackendResult<Vec<Self::Array>> {
        op_nonzero(pred, size, fill)
    }
}

fn literal_to_array(literal: ArrayLiteral) -> BackendResult<CpuArray> {
    let data = match literal.data {
        LiteralData::F32(values) => TensorData::F32(Arc::from(values)),
        LiteralData::I32(values) => TensorData::I32(Arc::from(values)),
        LiteralData::Bool(values) => TensorData::Bool(Arc::from(values)),
    };
    CpuArray::new(literal.dims, data)
}

fn array_to_literal(array: &CpuArray) -> BackendResult<ArrayLiteral> {
    let data = match &array.data {
        TensorData::F32(values) => LiteralData::F32(values.to_vec()),
        TensorData::I32(values) => LiteralData::I32(values.to_vec()),
        TensorData::Bool(values) => LiteralData::Bool(values.to_vec()),
    };
    ArrayLiteral::new(array.dims.clone(), data)
}

fn op_reshape(array: &CpuArray, dims: &[usize]) -> BackendResult<CpuArray> {
    let target: usize = dims.iter().product();
    if target != array.element_count() {
        return Err(BackendError::execution(format!(
            "cannot reshape {:?} into {:?}",
            array.dims, dims
        )));
    }
    Ok(CpuArray {
        dims: dims.to_vec(),
        data: array.data.clone(),
    })
}

fn op_transpose(array: &CpuArray, perm: &[usize]) -> BackendResult<CpuArray> {
    let rank = array.dims.len();
    if perm.len() != rank {
        return Err(BackendError::execution("transpose rank mismatch"));
    }
    let mut seen = vec![false; rank];
    for &axis in perm {
        if axis >= rank || seen[axis] {
            return Err(BackendError::execution(format!(
                "transpose permutation {perm:?} is invalid for rank {rank}"
            )));
        }
        seen[axis] = true;
    }

    let out_dims: Vec<usize> = perm.iter().map(|&axis| array.dims[axis]).collect();
    let input_strides = compute_strides(&array.dims);
    let out_len: usize = out_dims.iter().product();
    let indices: Vec<usize> = (0..out_len)
        .map(|idx| {
            let out_coord = unravel_index(idx, &out_dims);
            out_coord
                .iter()
                .zip(perm.iter())
                .map(|(&coord, &in_axis)| coord * input_strides[in_axis])
                .sum()
        })
        .collect();
    Ok(CpuArray {
        dims: out_dims,
        data: array.data.gather(&indices),
    })
}

fn op_broadcast_to(array: &CpuArray, dims: &[usize]) -> BackendResult<CpuArray> {
    if dims.len() < array.dims.len() {
        return Err(BackendError::execution(
            "broadcast_to result rank must be >= operand rank",
        ));
    }
    let rank_diff = dims.len() - array.dims.len();
    for (axis, &dim) in array.dims.iter().enumerate() {
        let out_dim = dims[rank_diff + axis];
        if dim != 1 && dim != out_dim {
            return Err(BackendError::execution(format!(
                "broadcast_to dim mismatch: {:?} -> {:?}",
                array.dims, dims
            )));
        }
    }
    Ok(CpuArray {
        dims: dims.to_vec(),
        data: expand(array, dims),
    })
}

fn f32_to_i32_trunc_saturating(value: f32) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let truncated = value.trunc();
    if truncated > i32::MAX as f32 {
        i32::MAX
    } else if truncated < i32::MIN as f32 {
        i32::MIN
    } else {
        truncated as i32
    }
}

fn op_cast(array: &CpuArray, dtype: DType) -> BackendResult<CpuArray> {
    let data = match (&array.data, dtype) {
        (TensorData::F32(values), DType::F32) => TensorData::F32(values.clone()),
        (TensorData::F32(values), DType::I32) => TensorData::I32(
            values
                .iter()
                .map(|&v| f32_to_i32_trunc_saturating(v))
                .collect(),
        ),
        (TensorData::F32(values), DType::Bool) => {
            TensorData::Bool(values.iter().map(|&v| v != 0.0).collect())
        }
        (TensorData::I32(values), DType::F32) => {
            TensorData::F32(values.iter().map(|&v| v as f32).collect())
        }
        (TensorData::I32(values), DType::I32) => TensorData::I32(values.clone()),
        (TensorData::I32(values), DType::Bool) => {
            TensorData::Bool(values.iter().map(|&v| v != 0).collect())
        }
        (TensorData::Bool(values), DType::F32) => TensorData::F32(
            values
                .iter()
                .map(|&v| if v { 1.0 } else { 0.0 })
                .collect(),
        ),
        (TensorData::Bool(values), DType::I32) => {
            TensorData::I32(values.iter().map(|&v| v as i32).collect())
        }
        (TensorData::Bool(values), DType::Bool) => TensorData::Bool(values.clone()),
    };
    CpuArray::new(array.dims.clone(), data)
}

fn op_elementwise_binary(op: BinaryOp, lhs: &CpuArray, rhs: &CpuArray) -> BackendResult<CpuArray> {
    let dims = broadcast_dims(&[&lhs.dims, &rhs.dims])?;
    let data = match (expand(lhs, &dims), expand(rhs, &dims)) {
        (TensorData::F32(a), TensorData::F32(b)) => TensorData::F32(
            a.iter()
                .zip(b.iter())
                .map(|(&x, &y)| binary_f32(op, x, y))
                .collect(),
        ),
        (TensorData::I32(a), TensorData::I32(b)) => TensorData::I32(
            a.iter()
                .zip(b.iter())
                .map(|(&x, &y)| binary_i32(op, x, y))
                .collect::<BackendResult<Arc<[i32]>>>()?,
        ),
        (a, b) => {
            return Err(BackendError::execution(format!(
                "{op:?} does not support {} and {} operands",
                a.dtype(),
                b.dtype()
            )))
        }
    };
    CpuArray::new(dims, data)
}

fn binary_f32(op: BinaryOp, x: f32, y: f32) -> f32 {
    match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Maximum | BinaryOp::Minimum if x.is_nan() || y.is_nan() => f32::NAN,
        BinaryOp::Maximum => x.max(y),
        BinaryOp::Minimum => x.min(y),
    }
}

fn binary_i32(op: BinaryOp, x: i32, y: i32) -> BackendResult<i32> {
    match op {
        BinaryOp::Add => Ok(x.wrapping_add(y)),
        BinaryOp::Sub => Ok(x.wrapping_sub(y)),
        BinaryOp::Mul => Ok(x.wrapping_mul(y)),
        BinaryOp::Div => x
            .checked_div(y)
            .ok_or_else(|| BackendError::execution(format!("integer division {x} / {y}"))),
        BinaryOp::Maximum => Ok(x.max(y)),
        BinaryOp::Minimum => Ok(x.min(y)),
    }
}

fn op_compare(op: CompareOp, lhs: &CpuArray, rhs: &CpuArray) -> BackendResult<CpuArray> {
    let dims = broadcast_dims(&[&lhs.dims, &rhs.dims])?;
    let flags = match (expand(lhs, &dims), expand(rhs, &dims)) {
        (TensorData::F32(a), TensorData::F32(b)) => compare_values(op, &a, &b),
        (TensorData::I32(a), TensorData::I32(b)) => compare_values(op, &a, &b),
        (TensorData::Bool(a), TensorData::Bool(b)) => compare_values(op, &a, &b),
        (a, b) => {
            return Err(BackendError::execution(format!(
                "cannot compare {} with {}",
                a.dtype(),
                b.dtype()
            )))
        }
    };
    CpuArray::new(dims, TensorData::Bool(flags))
}

fn compare_values<T: PartialOrd>(op: CompareOp, a: &[T], b: &[T]) -> Arc<[bool]> {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| match op {
            CompareOp::Less => x < y,
            CompareOp::LessEqual => x <= y,
            CompareOp::Equal => x == y,
            CompareOp::GreaterEqual => x >= y,
            CompareOp::Greater => x > y,
            CompareOp::NotEqual => x != y,
        })
        .collect()
}

fn op_select(pred: &CpuArray, on_true: &CpuArray, on_false: &CpuArray) -> BackendResult<CpuArray> {
    let dims = broadcast_dims(&[&pred.dims, &on_true.dims, &on_false.dims])?;
    let TensorData::Bool(mask) = expand(pred, &dims) else {
        return Err(BackendError::execution(format!(
            "select predicate must be bool, got {}",
            pred.dtype()
        )));
    };
    let data = match (expand(on_true, &dims), expand(on_false, &dims)) {
        (TensorData::F32(a), TensorData::F32(b)) => TensorData::F32(select_values(&mask, &a, &b)),
        (TensorData::I32(a), TensorData::I32(b)) => TensorData::I32(select_values(&mask, &a, &b)),
        (TensorData::Bool(a), TensorData::Bool(b)) => {
            TensorData::Bool(select_values(&mask, &a, &b))
        }
        (a, b) => {
            return Err(BackendError::execution(format!(
                "select branches disagree on dtype: {} vs {}",
                a.dtype(),
                b.dtype()
            )))
        }
    };
    CpuArray::new(dims, data)
}

fn select_values<T: Copy>(mask: &[bool], on_true: &[T], on_false: &[T]) -> Arc<[T]> {
    mask.iter()
        .zip(on_true.iter().zip(on_false.iter()))
        .map(|(&flag, (&t, &f))| if flag { t } else { f })
        .collect()
}

fn op_cond(pred: &CpuArray, on_true: &CpuArray, on_false: &CpuArray) -> BackendResult<CpuArray> {
    let flag = match &pred.data {
        TensorData::Bool(values) if pred.dims.is_empty() && values.len() == 1 => values[0],
        _ => {
            return Err(BackendError::execution(format!(
                "cond predicate must be a rank-0 bool, got {} with dims {:?}",
                pred.dtype(),
                pred.dims
            )))
        }
    };
    if on_true.dims != on_false.dims || on_true.dtype() != on_false.dtype() {
        return Err(BackendError::execution(format!(
            "cond branches differ: {} {:?} vs {} {:?}",
            on_true.dtype(),
            on_true.dims,
            on_false.dtype(),
            on_false.dims
        )));
    }
    Ok(if flag { on_true.clone() } else { on_false.clone() })
}

fn op_clamp(array: &CpuArray, min: &CpuArray, max: &CpuArray) -> BackendResult<CpuArray> {
    let dims = broadcast_dims(&[&array.dims, &min.dims, &max.dims])?;
    let data = match (
        expand(array, &dims),
        expand(min, &dims),
        expand(max, &dims),
    ) {
        (TensorData::F32(x), TensorData::F32(lo), TensorData::F32(hi)) => {
            TensorData::F32(clamp_values(&x, &lo, &hi))
        }
        (TensorData::I32(x), TensorData::I32(lo), TensorData::I32(hi)) => {
            TensorData::I32(clamp_values(&x, &lo, &hi))
        }
        (x, lo, hi) => {
            return Err(BackendError::execution(format!(
                "clamp does not support {}, {}, {} operands",
                x.dtype(),
                lo.dtype(),
                hi.dtype()
            )))
        }
    };
    CpuArray::new(dims, data)
}

// maximum(x, lo) then minimum(_, hi); NaN inputs pass through.
fn clamp_values<T: PartialOrd + Copy>(values: &[T], lo: &[T], hi: &[T]) -> Arc<[T]> {
    values
        .iter()
        .zip(lo.iter().zip(hi.iter()))
        .map(|(&x, (&lo, &hi))| {
            let raised = if x < lo { lo } else { x };
            if raised > hi {
                hi
            } else {
                raised
            }
        })
        .collect()
}

fn op_trace(array: &CpuArray, offset: isize, axis1: usize, axis2: usize) -> BackendResult<CpuArray> {
    let dims = &array.dims;
    let rank = dims.len();
    if axis1 >= rank || axis2 >= rank || axis1 == axis2 {
        return Err(BackendError::execution(format!(
            "trace axes ({axis1}, {axis2}) are invalid for dims {dims:?}"
        )));
    }
    let rest_axes: Vec<usize> = (0..rank).filter(|&i| i != axis1 && i != axis2).collect();
    let out_dims: Vec<usize> = rest_axes.iter().map(|&i| dims[i]).collect();
    let strides = compute_strides(dims);

    let (start1, start2) = if offset >= 0 {
        (0, offset.unsigned_abs())
    } else {
        (offset.unsigned_abs(), 0)
    };
    let diag_len = dims[axis1]
        .saturating_sub(start1)
        .min(dims[axis2].saturating_sub(start2));
    let origin = start1 * strides[axis1] + start2 * strides[axis2];
    let step = strides[axis1] + strides[axis2];

    let out_len: usize = out_dims.iter().product();
    let bases: Vec<usize> = (0..out_len)
        .map(|idx| {
            let coords = unravel_index(idx, &out_dims);
            coords
                .iter()
                .zip(rest_axes.iter())
                .map(|(&coord, &axis)| coord * strides[axis])
                .sum::<usize>()
                + origin
        })
        .collect();

    let data = match &array.data {
        TensorData::F32(values) => TensorData::F32(
            bases
                .iter()
                .map(|&base| {
                    (0..diag_len).fold(0.0f32, |acc, i| acc + values[base + i * step])
                })
                .collect(),
        ),
        TensorData::I32(values) => TensorData::I32(
            bases
                .iter()
                .map(|&base| {
                    (0..diag_len).fold(0i32, |acc, i| acc.wrapping_add(values[base + i * step]))
                })
                .collect(),
        ),
        TensorData::Bool(_) => {
            return Err(BackendError::execution(
                "trace does not accumulate bool arrays; cast to a numeric dtype first",
            ))
        }
    };
    CpuArray::new(out_dims, data)
}

fn op_triangular(array: &CpuArray, triangle: Triangle, k: isize) -> BackendResult<CpuArray> {
    let rank = array.dims.len();
    if rank < 2 {
        return Err(BackendError::execution(format!(
            "triangular mask needs at least two dims, got {:?}",
            array.dims
        )));
    }
    let rows = array.dims[rank - 2];
    let cols = array.dims[rank - 1];
    let keep: Vec<bool> = (0..array.element_count())
        .map(|idx| {
            let col = (idx % cols) as isize;
            let row = ((idx / cols) % rows) as isize;
            match triangle {
                Triangle::Lower => col - row <= k,
                Triangle::Upper => col - row >= k,
            }
        })
        .collect();
    let data = match &array.data {
        TensorData::F32(values) => TensorData::F32(mask_values(values, &keep, 0.0)),
        TensorData::I32(values) => TensorData::I32(mask_values(values, &keep, 0)),
        TensorData::Bool(values) => TensorData::Bool(mask_values(values, &keep, false)),
    };
    CpuArray::new(array.dims.clone(), data)
}

fn mask_values<T: Copy>(values: &[T], keep: &[bool], zero: T) -> Arc<[T]> {
    values
        .iter()
        .zip(keep.iter())
        .map(|(&value, &kept)| if kept { value } else { zero })
        .collect()
}

fn op_isclose(
    lhs: &CpuArray,
    rhs: &CpuArray,
    rtol: f64,
    atol: f64,
    equal_nan: bool,
) -> BackendResult<CpuArray> {
    let dims = broadcast_dims(&[&lhs.dims, &rhs.dims])?;
    let a = to_f64_values(&expand(lhs, &dims), "isclose")?;
    let b = to_f64_values(&expand(rhs, &dims), "isclose")?;
    let flags: Arc<[bool]> = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| values_close(x, y, rtol, atol, equal_nan))
        .collect();
    CpuArray::new(dims, TensorData::Bool(flags))
}

fn values_close(x: f64, y: f64, rtol: f64, atol: f64, equal_nan: bool) -> bool {
    if x.is_nan() || y.is_nan() {
        return equal_nan && x.is_nan() && y.is_nan();
    }
    if x == y {
        return true;
    }
    if x.is_infinite() || y.is_infinite() {
        return false;
    }
    (x - y).abs() <= atol + rtol * y.abs()
}

fn to_f64_values(data: &TensorData, op: &str) -> BackendResult<Vec<f64>> {
    match data {
        TensorData::F32(values) => Ok(values.iter().map(|&v| f64::from(v)).collect()),
        TensorData::I32(values) => Ok(values.iter().map(|&v| f64::from(v)).collect()),
        TensorData::Bool(_) => Err(BackendError::execution(format!(
            "{op} does not support bool arrays"
        ))),
    }
}

fn op_pad(
    array: &CpuArray,
    widths: &[(usize, usize)],
    mode: &PadMode,
    constant: &CpuArray,
) -> BackendResult<CpuArray> {
    let dims = &array.dims;
    if widths.len() != dims.len() {
        return Err(BackendError::execution(format!(
            "pad widths {widths:?} do not match rank {}",
            dims.len()
        )));
    }
    if let PadMode::Custom(name) = mode {
        return Err(BackendError::unimplemented(
            "pad",
            format!("mode '{name}' is not supported by the cpu engine"),
        ));
    }
    let padded_empty = dims
        .iter()
        .zip(widths.iter())
        .any(|(&dim, &(before, after))| dim == 0 && before + after > 0);
    if padded_empty && *mode != PadMode::Constant {
        return Err(BackendError::execution(format!(
            "cannot {mode}-pad an empty dimension of {dims:?}"
        )));
    }

    let out_dims: Vec<usize> = dims
        .iter()
        .zip(widths.iter())
        .map(|(&dim, &(before, after))| dim + before + after)
        .collect();
    let strides = compute_strides(dims);
    let out_len: usize = out_dims.iter().product();
    let sources: Vec<Option<usize>> = (0..out_len)
        .map(|idx| {
            let coords = unravel_index(idx, &out_dims);
            let mut flat = 0usize;
            for (axis, &coord) in coords.iter().enumerate() {
                let position = coord as isize - widths[axis].0 as isize;
                flat += source_coord(position, dims[axis], mode)? * strides[axis];
            }
            Some(flat)
        })
        .collect();
    log::trace!("cpu pad {dims:?} -> {out_dims:?} ({mode})");

    let fill = op_cast(constant, array.dtype())?;
    if fill.data.len() != 1 {
        return Err(BackendError::execution(format!(
            "pad constant must hold a single value, got dims {:?}",
            fill.dims
        )));
    }
    let data = match (&array.data, &fill.data) {
        (TensorData::F32(values), TensorData::F32(c)) => {
            TensorData::F32(gather_or(values, &sources, c[0]))
        }
        (TensorData::I32(values), TensorData::I32(c)) => {
            TensorData::I32(gather_or(values, &sources, c[0]))
        }
        (TensorData::Bool(values), TensorData::Bool(c)) => {
            TensorData::Bool(gather_or(values, &sources, c[0]))
        }
        (values, c) => {
            return Err(BackendError::execution(format!(
                "pad constant {} does not match array {}",
                c.dtype(),
                values.dtype()
            )))
        }
    };
    CpuArray::new(out_dims, data)
}

/// Maps a padded coordinate back into `0..len`; `None` selects the constant.
fn source_coord(position: isize, len: usize, mode: &PadMode) -> Option<usize> {
    let n = len as isize;
    if (0..n).contains(&position) {
        return Some(position as usize);
    }
    let mapped = match mode {
        PadMode::Constant | PadMode::Custom(_) => return None,
        PadMode::Edge => position.clamp(0, n - 1),
        PadMode::Reflect if n == 1 => 0,
        PadMode::Reflect => {
            let period = 2 * (n - 1);
            let m = position.rem_euclid(period);
            if m >= n {
                period - m
            } else {
                m
            }
        }
        PadMode::Symmetric => {
            let period = 2 * n;
            let m = position.rem_euclid(period);
            if m >= n {
                period - 1 - m
            } else {
                m
            }
        }
        PadMode::Wrap => position.rem_euclid(n),
    };
    Some(mapped as usize)
}

fn op_nonzero(pred: &CpuArray, size: usize, fill: i32) -> BackendResult<Vec<CpuArray>> {
    let TensorData::Bool(mask) = &pred.data else {
        return Err(BackendError::execution(format!(
            "nonzero predicate must be bool, got {}",
            pred.dtype()
        )));
    };
    if pred.dims.is_empty() {
        return Err(BackendError::execution(
            "nonzero needs a predicate with at least one dim",
        ));
    }
    let found = mask.iter().filter(|flag| **flag).count();
    if found > size {
        log::debug!("nonzero found {found} entries, keeping the first {size}");
    }

    let mut columns: Vec<Vec<i32>> = vec![Vec::with_capacity(size); pred.dims.len()];
    for (idx, _) in mask.iter().enumerate().filter(|(_, flag)| **flag).take(size) {
        let coords = unravel_index(idx, &pred.dims);
        for (column, coord) in columns.iter_mut().zip(coords) {
            let coord = i32::try_from(coord).map_err(|_| {
                BackendError::execution(format!("coordinate {coord} does not fit in i32"))
            })?;
            column.push(coord);
        }
    }
    columns
        .into_iter()
        .map(|mut column| {
            column.resize(size, fill);
            CpuArray::new(vec![size], TensorData::I32(Arc::from(column)))
        })
        .collect()
}

/// Result dims for operands of equal rank whose dims match or are 1. Rank-0 operands broadcast
/// against anything.
fn broadcast_dims(operands: &[&[usize]]) -> BackendResult<Vec<usize>> {
    let rank = operands.iter().map(|dims| dims.len()).max().unwrap_or(0);
    let mut out = vec![1usize; rank];
    for dims in operands {
        if dims.is_empty() {
            continue;
        }
        if dims.len() != rank {
            return Err(BackendError::execution(format!(
                "operand dims {dims:?} do not have rank {rank}"
            )));
        }
        for (slot, &dim) in out.iter_mut().zip(dims.iter()) {
            if *slot == 1 {
                *slot = dim;
            } else if dim != 1 && dim != *slot {
                return Err(BackendError::execution(format!(
                    "incompatible operand dims: {operands:?}"
                )));
            }
        }
    }
    Ok(out)
}

fn expand(array: &CpuArray, out_dims: &[usize]) -> TensorData {
    if array.dims == out_dims {
        array.data.clone()
    } else {
        array.data.gather(&broadcast_indices(&array.dims, out_dims))
    }
}

/// Flat source index of every output element when `in_dims` is broadcast to `out_dims`,
/// aligning trailing dims.
fn broadcast_indices(in_dims: &[usize], out_dims: &[usize]) -> Vec<usize> {
    let rank_diff = out_dims.len() - in_dims.len();
    let mut aligned = vec![1usize; out_dims.len()];
    aligned[rank_diff..].copy_from_slice(in_dims);
    let strides = compute_strides(&aligned);
    let out_len: usize = out_dims.iter().product();
    (0..out_len)
        .map(|idx| {
            let coords = unravel_index(idx, out_dims);
            coords
                .iter()
                .zip(aligned.iter().zip(strides.iter()))
                .map(|(&coord, (&dim, &stride))| if dim == 1 { 0 } else { coord * stride })
                .sum()
        })
        .collect()
}

fn gather_values<T: Copy>(values: &[T], indices: &[usize]) -> Arc<[T]> {
    indices.iter().map(|&i| values[i]).collect()
}

fn gather_or<T: Copy>(values: &[T], sources: &[Option<usize>], fill: T) -> Arc<[T]> {
    sources
        .iter()
        .map(|source| source.map_or(fill, |i| values[i]))
        .collect()
}

fn compute_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; dims.len()];
    let mut acc = 1usize;
    for (i, dim) in dims.iter().enumerate().rev() {
        strides[i] = acc;
        acc *= *dim;
    }
    strides
}

fn unravel_index(mut index: usize, dims: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; dims.len()];
    for (i, dim) in dims.iter().enumerate().rev() {
        coords[i] = index % *dim;
        index /= *dim;
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_array(dims: &[usize], values: Vec<f32>) -> CpuArray {
        CpuArray::new(dims.to_vec(), TensorData::F32(Arc::from(values))).unwrap()
    }

    fn f32_values(array: &CpuArray) -> Vec<f32> {
        match &array.data {
            TensorData::F32(values) => values.to_vec(),
            other => panic!("expected f32 data, got {}", other.dtype()),
        }
    }

    #[test]
    fn strides_and_unravel_agree() {
        let dims = [2, 3, 4];
        let strides = compute_strides(&dims);
        assert_eq!(strides, vec![12, 4, 1]);
        let coords = unravel_index(17, &dims);
        assert_eq!(coords, vec![1, 1, 1]);
    }

    #[test]
    fn transpose_swaps_matrix() {
        let array = f32_array(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let out = op_transpose(&array, &[1, 0]).unwrap();
        assert_eq!(out.dims, vec![3, 2]);
        assert_eq!(f32_values(&out), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn broadcast_expands_unit_dims() {
        let array = f32_array(&[1, 3], vec![1.0, 2.0, 3.0]);
        let out = op_broadcast_to(&array, &[2, 3]).unwrap();
        assert_eq!(f32_values(&out), vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        assert!(op_broadcast_to(&array, &[2, 4]).is_err());
    }

    #[test]
    fn trace_handles_offsets_on_rectangles() {
        // [[0, 1, 2], [3, 4, 5]]
        let array = f32_array(&[2, 3], (0..6).map(|v| v as f32).collect());
        let main = op_trace(&array, 0, 0, 1).unwrap();
        assert_eq!(f32_values(&main), vec![4.0]);
        let upper = op_trace(&array, 1, 0, 1).unwrap();
        assert_eq!(f32_values(&upper), vec![6.0]);
        let lower = op_trace(&array, -1, 0, 1).unwrap();
        assert_eq!(f32_values(&lower), vec![3.0]);
        let outside = op_trace(&array, 5, 0, 1).unwrap();
        assert_eq!(f32_values(&outside), vec![0.0]);
        assert!(f32_values(&outside)[0].is_sign_positive());
    }

    #[test]
    fn pad_modes_follow_numpy() {
        let array = f32_array(&[3], vec![1.0, 2.0, 3.0]);
        let zero = f32_array(&[], vec![0.0]);
        let cases = [
            (PadMode::Constant, vec![0.0, 0.0, 1.0, 2.0, 3.0, 0.0]),
            (PadMode::Edge, vec![1.0, 1.0, 1.0, 2.0, 3.0, 3.0]),
            (PadMode::Reflect, vec![3.0, 2.0, 1.0, 2.0, 3.0, 2.0]),
            (PadMode::Symmetric, vec![2.0, 1.0, 1.0, 2.0, 3.0, 3.0]),
            (PadMode::Wrap, vec![2.0, 3.0, 1.0, 2.0, 3.0, 1.0]),
        ];
        for (mode, expected) in cases {
            let out = op_pad(&array, &[(2, 1)], &mode, &zero).unwrap();
            assert_eq!(f32_values(&out), expected, "mode {mode}");
        }
    }

    #[test]
    fn custom_pad_mode_is_unimplemented() {
        let array = f32_array(&[2], vec![1.0, 2.0]);
        let zero = f32_array(&[], vec![0.0]);
        let err = op_pad(&array, &[(1, 1)], &PadMode::Custom("median".into()), &zero).unwrap_err();
        assert!(matches!(err, BackendError::Unimplemented { op: "pad", .. }));
    }

    #[test]
    fn nonzero_pads_and_truncates() {
        let mask = CpuArray::new(
            vec![2, 2],
            TensorData::Bool(Arc::from(vec![true, false, false, true])),
        )
        .unwrap();
        let padded = op_nonzero(&mask, 3, -1).unwrap();
        let rows: Vec<i32> = match &padded[0].data {
            TensorData::I32(values) => values.to_vec(),
            _ => unreachable!(),
        };
        assert_eq!(rows, vec![0, 1, -1]);
        let truncated = op_nonzero(&mask, 1, -1).unwrap();
        assert_eq!(truncated[1].dims, vec![1]);
    }

    #[test]
    fn isclose_treats_nan_per_flag() {
        assert!(!values_close(f64::NAN, f64::NAN, 1e-5, 1e-8, false));
        assert!(values_close(f64::NAN, f64::NAN, 1e-5, 1e-8, true));
        assert!(values_close(f64::INFINITY, f64::INFINITY, 1e-5, 1e-8, false));
        assert!(values_close(1.0, 1.0 + 1e-9, 1e-5, 1e-8, false));
        assert!(!values_close(1.0, 1.1, 1e-5, 1e-8, false));
    }
}
