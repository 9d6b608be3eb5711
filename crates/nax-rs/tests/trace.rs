mod common;

use anyhow::Result;
use common::{assert_close, cpu, f32_values, random_array};
use nax_rs::ops::trace;
use nax_rs::{Axis, DType, NamedArray, NamedError};
use rstest::rstest;

#[test]
fn trace_of_square_is_scalar_diagonal_sum() -> Result<()> {
    let backend = cpu();
    let height = Axis::new("Height", 5);
    let width = Axis::new("Width", 5);
    let array = random_array(&backend, 1, &[height.clone(), width.clone()])?;
    let values = f32_values(&backend, &array)?;

    let traced = trace(&backend, &array, &height, &width, 0, None)?;
    assert!(traced.is_scalar());
    let expected: f32 = (0..5).map(|i| values[i * 5 + i]).sum();
    assert_close(&f32_values(&backend, &traced)?, &[expected]);
    Ok(())
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(-1)]
#[case(7)]
fn trace_offsets_follow_positional_convention(#[case] offset: isize) -> Result<()> {
    let backend = cpu();
    let rows = Axis::new("Rows", 3);
    let cols = Axis::new("Cols", 4);
    let array = random_array(&backend, 2, &[rows.clone(), cols.clone()])?;
    let values = f32_values(&backend, &array)?;

    let traced = trace(&backend, &array, "Rows", "Cols", offset, None)?;
    let mut expected = 0.0f32;
    for r in 0..3isize {
        let c = r + offset;
        if (0..4).contains(&c) {
            expected += values[(r * 4 + c) as usize];
        }
    }
    assert_close(&f32_values(&backend, &traced)?, &[expected]);
    Ok(())
}

#[test]
fn trace_axis_order_swaps_offset_direction() -> Result<()> {
    let backend = cpu();
    let rows = Axis::new("Rows", 3);
    let cols = Axis::new("Cols", 3);
    let array = NamedArray::from_f32(
        &backend,
        &[rows, cols],
        (0..9).map(|v| v as f32).collect(),
    )?;

    let forward = trace(&backend, &array, "Rows", "Cols", 1, None)?;
    let backward = trace(&backend, &array, "Cols", "Rows", 1, None)?;
    // [[0, 1, 2], [3, 4, 5], [6, 7, 8]]
    assert_close(&f32_values(&backend, &forward)?, &[1.0 + 5.0]);
    assert_close(&f32_values(&backend, &backward)?, &[3.0 + 7.0]);
    Ok(())
}

#[test]
fn trace_removes_only_traced_axes() -> Result<()> {
    let backend = cpu();
    let batch = Axis::new("Batch", 2);
    let height = Axis::new("Height", 3);
    let depth = Axis::new("Depth", 4);
    let width = Axis::new("Width", 3);
    let array = random_array(
        &backend,
        3,
        &[batch.clone(), height.clone(), depth.clone(), width.clone()],
    )?;

    let traced = trace(&backend, &array, &height, &width, 0, None)?;
    assert_eq!(traced.axes(), &[batch, depth]);
    Ok(())
}

#[test]
fn trace_with_dtype_casts_before_summing() -> Result<()> {
    let backend = cpu();
    let rows = Axis::new("Rows", 2);
    let cols = Axis::new("Cols", 2);
    let array = NamedArray::from_i32(&backend, &[rows, cols], vec![1, 2, 3, 4])?;

    let traced = trace(&backend, &array, "Rows", "Cols", 0, Some(DType::F32))?;
    assert_eq!(traced.dtype(&backend), DType::F32);
    assert_close(&f32_values(&backend, &traced)?, &[5.0]);
    Ok(())
}

#[test]
fn trace_rejects_same_axis_twice() -> Result<()> {
    let backend = cpu();
    let height = Axis::new("Height", 3);
    let array = random_array(&backend, 4, &[height.clone(), Axis::new("Width", 3)])?;

    let err = trace(&backend, &array, &height, "Height", 0, None).unwrap_err();
    assert!(matches!(err, NamedError::Argument(_)), "{err}");
    Ok(())
}

#[test]
fn trace_missing_axis_lists_available_axes() -> Result<()> {
    let backend = cpu();
    let array = random_array(
        &backend,
        5,
        &[Axis::new("Height", 3), Axis::new("Width", 3)],
    )?;

    let err = trace(&backend, &array, "Height", "Depth", 0, None).unwrap_err();
    match &err {
        NamedError::MissingAxis { axis, available } => {
            assert_eq!(axis, "'Depth'");
            assert_eq!(available, "(Height(3), Width(3))");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(err.to_string().contains("Width(3)"));
    Ok(())
}

#[test]
fn trace_checks_size_of_full_axis_selectors() -> Result<()> {
    let backend = cpu();
    let array = random_array(
        &backend,
        6,
        &[Axis::new("Height", 3), Axis::new("Width", 3)],
    )?;

    let err = trace(&backend, &array, Axis::new("Height", 4), "Width", 0, None).unwrap_err();
    assert_eq!(
        err,
        NamedError::IncompatibleShape {
            axis: "Height".to_string(),
            left: 3,
            right: 4,
        }
    );
    Ok(())
}
