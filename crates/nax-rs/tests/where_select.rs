mod common;

use anyhow::Result;
use common::{assert_close, cpu, f32_values, i32_values, random_array, random_values};
use nax_rs::named::elementwise::greater;
use nax_rs::ops::{select, where_, WhereOutput};
use nax_rs::{Axis, DType, NamedArray, NamedError, Operand, Scalar};
use nax_rs_backend_ref_cpu::CpuBackend;
use nax_rs_backend_tests::RecordingBackend;
use rstest::rstest;

fn operand<B: nax_rs::ArrayBackend>(value: impl Into<Operand<B>>) -> Option<Operand<B>> {
    Some(value.into())
}

#[test]
fn where_selects_per_element() -> Result<()> {
    let backend = cpu();
    let width = Axis::new("Width", 4);
    let x = NamedArray::from_f32(&backend, &[width.clone()], vec![-1.0, 2.0, -3.0, 4.0])?;
    let condition = greater(&backend, &x, 0.0f32)?;

    let selected = where_(&backend, &condition, operand(&x), operand(0.0f32), None, None)?
        .into_selected()?;
    assert_eq!(selected.axes(), &[width]);
    assert_close(&f32_values(&backend, &selected)?, &[0.0, 2.0, 0.0, 4.0]);
    Ok(())
}

#[test]
fn where_is_invariant_under_axis_permutation() -> Result<()> {
    let backend = cpu();
    let height = Axis::new("Height", 3);
    let width = Axis::new("Width", 2);
    let x = random_array(&backend, 30, &[height.clone(), width.clone()])?;
    let y = random_array(&backend, 31, &[height.clone(), width.clone()])?;
    let condition = greater(&backend, &x, &y)?;

    let reference = select(&backend, &condition, &x, &y)?;
    let permuted = select(
        &backend,
        condition.rearrange(&backend, ["Width", "Height"])?,
        x.rearrange(&backend, ["Width", "Height"])?,
        &y,
    )?;
    let aligned = permuted.rearrange(&backend, reference.axes().iter())?;
    assert_close(
        &f32_values(&backend, &aligned)?,
        &f32_values(&backend, &reference)?,
    );

    let xv = f32_values(&backend, &x)?;
    let yv = f32_values(&backend, &y)?;
    let expected: Vec<f32> = xv.iter().zip(yv.iter()).map(|(a, b)| a.max(*b)).collect();
    assert_close(&f32_values(&backend, &reference)?, &expected);
    Ok(())
}

#[test]
fn scalar_condition_keeps_named_branch_axes() -> Result<()> {
    let backend = cpu();
    let height = Axis::new("Height", 2);
    let width = Axis::new("Width", 2);
    let named = random_array(&backend, 32, &[height.clone(), width.clone()])?;

    let zeros = where_(&backend, 0.0f32, operand(&named), operand(0.0f32), None, None)?
        .into_selected()?;
    assert_eq!(zeros.axes(), &[height.clone(), width.clone()]);
    assert_close(&f32_values(&backend, &zeros)?, &[0.0; 4]);

    let kept = where_(&backend, 1.0f32, operand(&named), operand(0.0f32), None, None)?
        .into_selected()?;
    assert_close(
        &f32_values(&backend, &kept)?,
        &f32_values(&backend, &named)?,
    );
    Ok(())
}

#[test]
fn all_scalar_where_yields_zero_axis_array() -> Result<()> {
    let backend = cpu();
    let picked = where_(&backend, true, operand(1.0f32), operand(2.0f32), None, None)?
        .into_selected()?;
    assert!(picked.is_scalar());
    assert_eq!(picked.scalar(&backend)?, Scalar::F32(1.0));
    Ok(())
}

#[test]
fn zero_axis_condition_is_a_single_branch() -> Result<()> {
    let backend = RecordingBackend::new(CpuBackend::new());
    let width = Axis::new("Width", 3);
    let x = NamedArray::from_f32(&backend, &[width.clone()], vec![1.0, 2.0, 3.0])?;
    let flag = NamedArray::scalar_value(&backend, false)?;
    backend.clear();

    let picked = where_(&backend, &flag, operand(&x), operand(-1.0f32), None, None)?
        .into_selected()?;
    assert!(backend.called("cond"));
    assert!(!backend.called("select"));
    assert_eq!(picked.axes(), &[width]);
    assert_close(&f32_values(&backend, &picked)?, &[-1.0, -1.0, -1.0]);
    Ok(())
}

#[test]
fn zero_axis_raw_condition_is_a_single_branch() -> Result<()> {
    let backend = RecordingBackend::new(CpuBackend::new());
    let width = Axis::new("Width", 2);
    let x = NamedArray::from_f32(&backend, &[width.clone()], vec![5.0, 6.0])?;
    let flag: Operand<_> = Operand::Raw(NamedArray::scalar_value(&backend, 1i32)?.into_raw());
    backend.clear();

    let picked = where_(&backend, flag, operand(&x), operand(0.0f32), None, None)?
        .into_selected()?;
    assert!(backend.called("cond"));
    assert!(!backend.called("select"));
    assert_eq!(picked.axes(), &[width]);
    assert_close(&f32_values(&backend, &picked)?, &[5.0, 6.0]);
    Ok(())
}

#[test]
fn mixed_scalar_branches_share_a_dtype() -> Result<()> {
    let backend = cpu();
    let width = Axis::new("Width", 3);
    let condition =
        NamedArray::from_bool(&backend, &[width.clone()], vec![true, false, true])?;

    let selected = select(&backend, &condition, 1.0f32, 0i32)?;
    assert_eq!(selected.dtype(&backend), DType::F32);
    assert_eq!(selected.axes(), &[width]);
    assert_close(&f32_values(&backend, &selected)?, &[1.0, 0.0, 1.0]);

    let picked = where_(&backend, false, operand(2i32), operand(0.5f32), None, None)?
        .into_selected()?;
    assert_eq!(picked.scalar(&backend)?, Scalar::F32(0.5));
    Ok(())
}

#[test]
fn integer_branch_is_promoted_next_to_float_branch() -> Result<()> {
    let backend = cpu();
    let width = Axis::new("Width", 2);
    let condition = NamedArray::from_bool(&backend, &[width.clone()], vec![false, true])?;
    let counts = NamedArray::from_i32(&backend, &[width], vec![3, 4])?;

    let selected = select(&backend, &condition, &counts, 0.25f32)?;
    assert_eq!(selected.dtype(&backend), DType::F32);
    assert_close(&f32_values(&backend, &selected)?, &[0.25, 4.0]);
    Ok(())
}

#[test]
fn single_argument_where_returns_coordinates() -> Result<()> {
    let backend = cpu();
    let height = Axis::new("Height", 2);
    let width = Axis::new("Width", 2);
    let hits = Axis::new("Hits", 3);
    let condition =
        NamedArray::from_bool(&backend, &[height, width], vec![true, false, false, true])?;

    let indices = match where_(&backend, &condition, None, None, Some(-1), Some(&hits))? {
        WhereOutput::Indices(indices) => indices,
        other => panic!("expected indices, got {other:?}"),
    };
    assert_eq!(indices.len(), 2);
    assert!(indices.iter().all(|index| index.axes() == [hits.clone()]));
    assert_eq!(i32_values(&backend, &indices[0])?, vec![0, 1, -1]);
    assert_eq!(i32_values(&backend, &indices[1])?, vec![0, 1, -1]);
    Ok(())
}

#[test]
fn single_argument_where_truncates_to_new_axis() -> Result<()> {
    let backend = cpu();
    let width = Axis::new("Width", 4);
    let condition = NamedArray::from_f32(&backend, &[width], vec![1.0, 0.0, 2.0, 3.0])?;

    let indices = where_(
        &backend,
        &condition,
        None,
        None,
        Some(0),
        Some(&Axis::new("First", 2)),
    )?
    .into_indices()?;
    assert_eq!(i32_values(&backend, &indices[0])?, vec![0, 2]);
    Ok(())
}

#[rstest]
#[case(50)]
#[case(51)]
#[case(52)]
fn returned_coordinates_are_exactly_the_true_positions(#[case] seed: u64) -> Result<()> {
    let backend = cpu();
    let axes = [
        Axis::new("Height", 3),
        Axis::new("Width", 4),
        Axis::new("Depth", 2),
    ];
    let mask: Vec<bool> = random_values(seed, 24).into_iter().map(|v| v > 0.0).collect();
    let condition = NamedArray::from_bool(&backend, &axes, mask.clone())?;
    let hits = Axis::new("Hits", mask.len());

    let indices = where_(&backend, &condition, None, None, Some(-1), Some(&hits))?
        .into_indices()?;
    assert_eq!(indices.len(), axes.len());
    let columns = indices
        .iter()
        .map(|index| i32_values(&backend, index))
        .collect::<Result<Vec<_>>>()?;

    let expected: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(flat, &set)| set.then_some(flat))
        .collect();
    let mut found = Vec::new();
    for k in 0..hits.size() {
        let coords: Vec<i32> = columns.iter().map(|column| column[k]).collect();
        if k < expected.len() {
            let flat = coords[0] as usize * 8 + coords[1] as usize * 2 + coords[2] as usize;
            assert!(mask[flat], "coordinate {coords:?} is not set");
            found.push(flat);
        } else {
            assert_eq!(coords, vec![-1, -1, -1], "slot {k} should be fill");
        }
    }
    assert_eq!(found, expected);
    Ok(())
}

#[test]
fn x_and_y_must_be_given_together() -> Result<()> {
    let backend = cpu();
    let condition = NamedArray::from_bool(&backend, &[Axis::new("Width", 2)], vec![true, false])?;

    let err = where_(&backend, &condition, operand(1.0f32), None, None, None).unwrap_err();
    assert_eq!(
        err,
        NamedError::Argument("must either specify both x and y, or neither".to_string())
    );
    Ok(())
}

#[test]
fn single_argument_where_needs_fill_and_axis() -> Result<()> {
    let backend = cpu();
    let condition = NamedArray::from_bool(&backend, &[Axis::new("Width", 2)], vec![true, false])?;

    let err = where_(&backend, &condition, None, None, Some(0), None).unwrap_err();
    assert!(matches!(err, NamedError::Argument(_)), "{err}");

    let err = where_(&backend, true, None, None, Some(0), Some(&Axis::new("Hits", 1)))
        .unwrap_err();
    assert!(matches!(err, NamedError::Argument(_)), "{err}");
    Ok(())
}

#[test]
fn named_branch_rejects_unnamed_partner() -> Result<()> {
    let backend = cpu();
    let width = Axis::new("Width", 2);
    let x = NamedArray::from_f32(&backend, &[width.clone()], vec![1.0, 2.0])?;
    let y = NamedArray::from_f32(&backend, &[width], vec![3.0, 4.0])?;
    let raw_y: Operand<_> = Operand::Raw(y.into_raw());

    let err = where_(&backend, true, operand(&x), Some(raw_y), None, None).unwrap_err();
    assert_eq!(
        err,
        NamedError::Argument("y must be a NamedArray or scalar if x is a NamedArray".to_string())
    );
    Ok(())
}
