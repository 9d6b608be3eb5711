//! Engine-generic checks of the named operations.
//!
//! Each check builds small arrays, runs one named operation through the engine under test and
//! compares against values computed on the host.

use nax_rs::backend::spec::{ArrayBackend, DType};
use nax_rs::named::elementwise::{add, greater};
use nax_rs::ops::{self, IsCloseOptions, PadMode, PadWidths};
use nax_rs::{Axis, NamedArray, NamedError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_values(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

fn random_array<B: ArrayBackend>(
    backend: &B,
    rng: &mut StdRng,
    axes: &[Axis],
) -> NamedArray<B> {
    let len = axes.iter().map(Axis::size).product();
    NamedArray::from_f32(backend, axes, random_values(rng, len)).unwrap()
}

fn f32_values<B: ArrayBackend>(backend: &B, array: &NamedArray<B>) -> Vec<f32> {
    array
        .to_literal(backend)
        .unwrap()
        .as_f32()
        .unwrap()
        .to_vec()
}

fn bool_values<B: ArrayBackend>(backend: &B, array: &NamedArray<B>) -> Vec<bool> {
    array
        .to_literal(backend)
        .unwrap()
        .as_bool()
        .unwrap()
        .to_vec()
}

fn i32_values<B: ArrayBackend>(backend: &B, array: &NamedArray<B>) -> Vec<i32> {
    array
        .to_literal(backend)
        .unwrap()
        .as_i32()
        .unwrap()
        .to_vec()
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!((a - e).abs() < 1e-5, "index {i}: {a} vs {e}");
    }
}

pub fn trace_matches_positional_diagonal<B: ArrayBackend>(backend: &B) {
    let mut rng = StdRng::seed_from_u64(3);
    let height = Axis::new("Height", 4);
    let width = Axis::new("Width", 4);
    let array = random_array(backend, &mut rng, &[height.clone(), width.clone()]);
    let values = f32_values(backend, &array);

    let traced = ops::trace(backend, &array, &height, &width, 0, None).unwrap();
    assert!(traced.is_scalar());
    let expected: f32 = (0..4).map(|i| values[i * 4 + i]).sum();
    assert_close(&f32_values(backend, &traced), &[expected]);

    let by_name = ops::trace(backend, &array, "Height", "Width", 0, None).unwrap();
    assert_close(&f32_values(backend, &by_name), &[expected]);
}

pub fn trace_keeps_remaining_axes<B: ArrayBackend>(backend: &B) {
    let batch = Axis::new("Batch", 2);
    let height = Axis::new("Height", 3);
    let width = Axis::new("Width", 3);
    let values: Vec<f32> = (0..18).map(|v| v as f32).collect();
    let array = NamedArray::from_f32(
        backend,
        &[height.clone(), batch.clone(), width.clone()],
        values.clone(),
    )
    .unwrap();

    let traced = ops::trace(backend, &array, "Height", "Width", 0, None).unwrap();
    assert_eq!(traced.axes(), &[batch]);
    // element (h, b, w) lives at h * 6 + b * 3 + w
    let expected: Vec<f32> = (0..2)
        .map(|b| (0..3).map(|i| values[i * 6 + b * 3 + i]).sum::<f32>())
        .collect();
    assert_close(&f32_values(backend, &traced), &expected);
}

pub fn where_selects_elementwise<B: ArrayBackend>(backend: &B) {
    let mut rng = StdRng::seed_from_u64(5);
    let height = Axis::new("Height", 3);
    let width = Axis::new("Width", 2);
    let x = random_array(backend, &mut rng, &[height.clone(), width.clone()]);
    let y = random_array(backend, &mut rng, &[width.clone(), height.clone()]);
    let condition = greater(backend, &x, 0.0f32).unwrap();

    let selected = ops::select(backend, &condition, &x, &y).unwrap();
    assert_eq!(selected.axes(), &[height.clone(), width.clone()]);

    let xs = f32_values(backend, &x);
    let ys = f32_values(backend, &y);
    let expected: Vec<f32> = (0..3)
        .flat_map(|h| (0..2).map(move |w| (h, w)))
        .map(|(h, w)| {
            let xv = xs[h * 2 + w];
            if xv > 0.0 {
                xv
            } else {
                ys[w * 3 + h]
            }
        })
        .collect();
    assert_close(&f32_values(backend, &selected), &expected);
}

pub fn where_indices_list_true_coordinates<B: ArrayBackend>(backend: &B) {
    let height = Axis::new("Height", 2);
    let width = Axis::new("Width", 3);
    let hits = Axis::new("Hits", 4);
    let condition = NamedArray::from_bool(
        backend,
        &[height, width],
        vec![false, true, false, true, false, true],
    )
    .unwrap();

    let indices = ops::where_(backend, &condition, None, None, Some(-1), Some(&hits))
        .unwrap()
        .into_indices()
        .unwrap();
    assert_eq!(indices.len(), 2);
    assert_eq!(indices[0].axes(), &[hits.clone()]);
    assert_eq!(i32_values(backend, &indices[0]), vec![0, 1, 1, -1]);
    assert_eq!(i32_values(backend, &indices[1]), vec![1, 0, 2, -1]);
}

pub fn clip_broadcasts_bounds<B: ArrayBackend>(backend: &B) {
    let mut rng = StdRng::seed_from_u64(9);
    let height = Axis::new("Height", 2);
    let width = Axis::new("Width", 3);
    let depth = Axis::new("Depth", 4);
    let array = random_array(
        backend,
        &mut rng,
        &[height.clone(), width.clone(), depth.clone()],
    );
    let lo = NamedArray::full(backend, &[height.clone(), width.clone()], -0.25f32).unwrap();
    let hi = NamedArray::full(backend, &[width.clone(), depth.clone()], 0.5f32).unwrap();

    let clipped = ops::clip(backend, &array, &lo, &hi).unwrap();
    assert_eq!(clipped.axes(), &[height, width, depth]);
    let expected: Vec<f32> = f32_values(backend, &array)
        .into_iter()
        .map(|v| v.max(-0.25).min(0.5))
        .collect();
    assert_close(&f32_values(backend, &clipped), &expected);
}

pub fn tril_and_triu_partition_the_plane<B: ArrayBackend>(backend: &B) {
    let mut rng = StdRng::seed_from_u64(13);
    let rows = Axis::new("Rows", 3);
    let cols = Axis::new("Cols", 4);
    let array = random_array(backend, &mut rng, &[rows.clone(), cols.clone()]);

    let lower = ops::tril(backend, &array, &rows, &cols, 0).unwrap();
    let strictly_upper = ops::triu(backend, &array, &rows, &cols, 1).unwrap();
    let recombined = add(backend, &lower, &strictly_upper).unwrap();
    assert_eq!(recombined.axes(), array.axes());
    assert_close(
        &f32_values(backend, &recombined),
        &f32_values(backend, &array),
    );

    let lower_values = f32_values(backend, &lower);
    for r in 0..3 {
        for c in 0..4 {
            if c > r {
                assert_eq!(lower_values[r * 4 + c], 0.0, "({r}, {c}) should be masked");
            }
        }
    }
}

pub fn isclose_is_reflexive<B: ArrayBackend>(backend: &B) {
    let mut rng = StdRng::seed_from_u64(17);
    let axes = [Axis::new("Height", 3), Axis::new("Width", 5)];
    let array = random_array(backend, &mut rng, &axes);

    let close = ops::isclose(backend, &array, &array, IsCloseOptions::default()).unwrap();
    assert_eq!(close.dtype(backend), DType::Bool);
    assert!(bool_values(backend, &close).into_iter().all(|flag| flag));
}

pub fn pad_left_prepends_fill<B: ArrayBackend>(backend: &B) {
    let height = Axis::new("Height", 2);
    let width = Axis::new("Width", 2);
    let wide = Axis::new("Width", 4);
    let array =
        NamedArray::from_f32(backend, &[height.clone(), width], vec![1.0, 2.0, 3.0, 4.0]).unwrap();

    let padded = ops::pad_left(backend, &array, "Width", &wide, 9.0f32).unwrap();
    assert_eq!(padded.axes(), &[height, wide]);
    assert_eq!(
        f32_values(backend, &padded),
        vec![9.0, 9.0, 1.0, 2.0, 9.0, 9.0, 3.0, 4.0]
    );
}

pub fn pad_edge_mode_repeats_border<B: ArrayBackend>(backend: &B) {
    let time = Axis::new("Time", 3);
    let array = NamedArray::from_f32(backend, &[time.clone()], vec![1.0, 2.0, 3.0]).unwrap();
    let widths: PadWidths = [("Time", (1, 2))].into_iter().collect();

    let padded = ops::pad(backend, &array, &widths, PadMode::Edge, 0.0f32).unwrap();
    assert_eq!(padded.axes(), &[time.resize(6)]);
    assert_eq!(
        f32_values(backend, &padded),
        vec![1.0, 1.0, 2.0, 3.0, 3.0, 3.0]
    );
}

pub fn add_rejects_disjoint_axes<B: ArrayBackend>(backend: &B) {
    let height = NamedArray::full(backend, &[Axis::new("Height", 2)], 1.0f32).unwrap();
    let plane = NamedArray::full(
        backend,
        &[Axis::new("Width", 3), Axis::new("Depth", 4)],
        1.0f32,
    )
    .unwrap();

    let err = add(backend, &height, &plane).unwrap_err();
    assert!(matches!(err, NamedError::DisjointAxes { .. }), "{err}");
}
