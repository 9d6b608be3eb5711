#![allow(dead_code)]

use anyhow::Result;
use nax_rs::{ArrayBackend, Axis, NamedArray};
use nax_rs_backend_ref_cpu::CpuBackend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn cpu() -> CpuBackend {
    init_logging();
    CpuBackend::new()
}

pub fn random_values(seed: u64, len: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

pub fn random_array<B: ArrayBackend>(
    backend: &B,
    seed: u64,
    axes: &[Axis],
) -> Result<NamedArray<B>> {
    let len = axes.iter().map(Axis::size).product();
    Ok(NamedArray::from_f32(backend, axes, random_values(seed, len))?)
}

pub fn f32_values<B: ArrayBackend>(backend: &B, array: &NamedArray<B>) -> Result<Vec<f32>> {
    Ok(array.to_literal(backend)?.as_f32()?.to_vec())
}

pub fn i32_values<B: ArrayBackend>(backend: &B, array: &NamedArray<B>) -> Result<Vec<i32>> {
    Ok(array.to_literal(backend)?.as_i32()?.to_vec())
}

pub fn bool_values<B: ArrayBackend>(backend: &B, array: &NamedArray<B>) -> Result<Vec<bool>> {
    Ok(array.to_literal(backend)?.as_bool()?.to_vec())
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!((a - e).abs() < 1e-5, "index {i}: {a} vs {e}");
    }
}
