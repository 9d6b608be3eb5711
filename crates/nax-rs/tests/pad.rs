mod common;

use anyhow::Result;
use common::{assert_close, cpu, f32_values, i32_values};
use nax_rs::ops::{pad, pad_left, PadMode, PadWidths};
use nax_rs::{Axis, DType, NamedArray, NamedError, Operand};
use nax_rs_backend_ref_cpu::CpuBackend;
use rstest::rstest;

fn grid(backend: &CpuBackend) -> Result<NamedArray<CpuBackend>> {
    let height = Axis::new("Height", 2);
    let width = Axis::new("Width", 3);
    Ok(NamedArray::from_f32(
        backend,
        &[height, width],
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    )?)
}

#[test]
fn pad_left_fills_the_low_side() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;
    let tall = Axis::new("Height", 4);

    let padded = pad_left(&backend, &array, "Height", &tall, 0.0f32)?;
    assert_eq!(padded.axes(), &[tall, Axis::new("Width", 3)]);
    let values = f32_values(&backend, &padded)?;
    assert_close(&values[..6], &[0.0; 6]);
    assert_close(&values[6..], &f32_values(&backend, &array)?);
    Ok(())
}

#[test]
fn pad_left_can_rename_the_axis() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;
    let context = Axis::new("Context", 5);

    let padded = pad_left(&backend, &array, Axis::new("Width", 3), &context, -1.0f32)?;
    assert_eq!(padded.axes(), &[Axis::new("Height", 2), context]);
    assert_close(
        &f32_values(&backend, &padded)?,
        &[
            -1.0, -1.0, 1.0, 2.0, 3.0, //
            -1.0, -1.0, 4.0, 5.0, 6.0,
        ],
    );
    Ok(())
}

#[test]
fn pad_left_casts_fill_to_array_dtype() -> Result<()> {
    let backend = cpu();
    let width = Axis::new("Width", 2);
    let array = NamedArray::from_i32(&backend, &[width], vec![7, 8])?;

    let padded = pad_left(&backend, &array, "Width", &Axis::new("Width", 3), 2.9f32)?;
    assert_eq!(i32_values(&backend, &padded)?, vec![2, 7, 8]);
    Ok(())
}

#[test]
fn pad_left_rejects_shrinking() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;

    let err = pad_left(&backend, &array, "Width", &Axis::new("Width", 2), 0.0f32).unwrap_err();
    assert!(matches!(err, NamedError::Argument(_)), "{err}");

    let err = pad_left(&backend, &array, "Depth", &Axis::new("Depth", 4), 0.0f32).unwrap_err();
    assert!(matches!(err, NamedError::MissingAxis { .. }), "{err}");
    Ok(())
}

#[test]
fn pad_left_rejects_name_collisions() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;

    let err = pad_left(&backend, &array, "Width", &Axis::new("Height", 4), 0.0f32).unwrap_err();
    assert!(matches!(err, NamedError::Argument(_)), "{err}");
    Ok(())
}

#[test]
fn pad_accepts_names_and_axes_as_keys() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;
    let widths = PadWidths::new()
        .with("Height", 1, 0)
        .with(Axis::new("Width", 3), 0, 2);

    let padded = pad(&backend, &array, &widths, PadMode::Constant, 0.0f32)?;
    assert_eq!(
        padded.axes(),
        &[Axis::new("Height", 3), Axis::new("Width", 5)]
    );
    assert_close(
        &f32_values(&backend, &padded)?,
        &[
            0.0, 0.0, 0.0, 0.0, 0.0, //
            1.0, 2.0, 3.0, 0.0, 0.0, //
            4.0, 5.0, 6.0, 0.0, 0.0,
        ],
    );
    Ok(())
}

#[test]
fn pad_prefers_exact_axis_keys_over_names() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;
    let widths = PadWidths::new()
        .with("Width", 5, 5)
        .with(Axis::new("Width", 3), 1, 0);

    let padded = pad(&backend, &array, &widths, PadMode::Constant, 9.0f32)?;
    assert_eq!(padded.axes()[1], Axis::new("Width", 4));
    Ok(())
}

#[test]
fn pad_ignores_keys_of_absent_axes() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;
    let widths: PadWidths = [("Depth", (3, 3))].into_iter().collect();

    let padded = pad(&backend, &array, &widths, PadMode::Constant, 0.0f32)?;
    assert_eq!(padded.axes(), array.axes());
    assert_close(
        &f32_values(&backend, &padded)?,
        &f32_values(&backend, &array)?,
    );
    Ok(())
}

#[test]
fn axis_key_with_other_size_does_not_match() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;
    let widths = PadWidths::new().with(Axis::new("Width", 7), 1, 1);

    let padded = pad(&backend, &array, &widths, PadMode::Constant, 0.0f32)?;
    assert_eq!(padded.axes(), array.axes());
    Ok(())
}

#[test]
fn pad_accepts_array_fill_values() -> Result<()> {
    let backend = cpu();
    let width = Axis::new("Width", 2);
    let counts = NamedArray::from_i32(&backend, &[width.clone()], vec![7, 8])?;
    let widths = PadWidths::new().with(&width, 1, 1);

    let named_fill = NamedArray::scalar_value(&backend, 2.5f32)?;
    let padded = pad(&backend, &counts, &widths, PadMode::Constant, &named_fill)?;
    assert_eq!(padded.dtype(&backend), DType::I32);
    assert_eq!(i32_values(&backend, &padded)?, vec![2, 7, 8, 2]);

    let plane = grid(&backend)?;
    let fill = NamedArray::scalar_value(&backend, -3i32)?;
    let raw_fill: Operand<_> = Operand::Raw(fill.into_raw());
    let padded = pad(
        &backend,
        &plane,
        &PadWidths::new().with("Height", 0, 1),
        PadMode::Constant,
        raw_fill,
    )?;
    assert_eq!(padded.dtype(&backend), DType::F32);
    assert_close(
        &f32_values(&backend, &padded)?,
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, -3.0, -3.0, -3.0],
    );
    Ok(())
}

#[rstest]
#[case(PadMode::Edge, vec![1.0, 1.0, 2.0, 3.0, 3.0])]
#[case(PadMode::Reflect, vec![2.0, 1.0, 2.0, 3.0, 2.0])]
#[case(PadMode::Symmetric, vec![1.0, 1.0, 2.0, 3.0, 3.0])]
#[case(PadMode::Wrap, vec![3.0, 1.0, 2.0, 3.0, 1.0])]
fn pad_modes_are_forwarded(#[case] mode: PadMode, #[case] expected: Vec<f32>) -> Result<()> {
    let backend = cpu();
    let time = Axis::new("Time", 3);
    let array = NamedArray::from_f32(&backend, &[time.clone()], vec![1.0, 2.0, 3.0])?;
    let widths = PadWidths::new().with(&time, 1, 1);

    let padded = pad(&backend, &array, &widths, mode, 0.0f32)?;
    assert_close(&f32_values(&backend, &padded)?, &expected);
    Ok(())
}

#[test]
fn unsupported_pad_mode_surfaces_engine_error() -> Result<()> {
    let backend = cpu();
    let array = grid(&backend)?;
    let widths = PadWidths::new().with("Width", 1, 1);

    let err = pad(
        &backend,
        &array,
        &widths,
        PadMode::Custom("median".into()),
        0.0f32,
    )
    .unwrap_err();
    assert!(matches!(err, NamedError::Backend(_)), "{err}");
    Ok(())
}
