use smallvec::SmallVec;

use crate::infer_shapes::{
    check_input_count, check_min_inputs, resolve_axis, InferShapes, OpError,
};
use crate::meta::{Shape, ValueMeta};

/// Return the number of elements in a tensor with the given dims.
fn checked_numel(dims: &[i64]) -> Result<i64, OpError> {
    dims.iter()
        .try_fold(1i64, |acc, &size| acc.checked_mul(size))
        .ok_or_else(|| OpError::InvalidValue(format!("shape {:?} has too many elements", dims)))
}

/// Transpose of a tensor with at most two dimensions (`aten::t`).
pub struct Transpose2d;

impl InferShapes for Transpose2d {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 1)?;
        let input = &inputs[0];
        let shape = match input.shape()?.as_slice() {
            [] | [_] => input.shape()?.clone(),
            &[rows, cols] => Shape::from_slice(&[cols, rows]),
            other => {
                return Err(OpError::IncompatibleShapes(format!(
                    "expected a tensor with at most 2 dims but got shape {:?}",
                    other
                )));
            }
        };
        Ok([ValueMeta::tensor(shape, input.dtype())].into())
    }
}

/// Swap two dimensions of a tensor (`aten::transpose`).
///
/// Inputs are `(self, dim0, dim1)`.
pub struct Transpose;

impl InferShapes for Transpose {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 3)?;
        let input = &inputs[0];
        let mut shape = input.shape()?.clone();
        let dim0 = resolve_axis(shape.len(), inputs[1].scalar_value()?)?;
        let dim1 = resolve_axis(shape.len(), inputs[2].scalar_value()?)?;
        shape.swap(dim0, dim1);
        Ok([ValueMeta::tensor(shape, input.dtype())].into())
    }
}

/// Collapse the dims in the inclusive range `[start, end]` into one
/// (`aten::flatten`).
///
/// Inputs are `(self, start_dim, end_dim)`.
pub struct Flatten;

impl InferShapes for Flatten {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 3)?;
        let input = &inputs[0];
        let dims = input.shape()?;

        // Flattening a scalar produces a vector.
        if dims.is_empty() {
            return Ok([ValueMeta::tensor(Shape::from_slice(&[1]), input.dtype())].into());
        }

        let start = resolve_axis(dims.len(), inputs[1].scalar_value()?)?;
        let end = resolve_axis(dims.len(), inputs[2].scalar_value()?)?;
        if start > end {
            return Err(OpError::InvalidValue(format!(
                "start dim {} is after end dim {}",
                start, end
            )));
        }

        let mut shape = Shape::with_capacity(dims.len() - (end - start));
        shape.extend_from_slice(&dims[..start]);
        shape.push(checked_numel(&dims[start..=end])?);
        shape.extend_from_slice(&dims[end + 1..]);

        Ok([ValueMeta::tensor(shape, input.dtype())].into())
    }
}

/// Change the shape of a tensor while keeping the element count
/// (`aten::reshape`).
///
/// Inputs are `(self, shape)`. At most one entry in the target shape may be
/// -1, which is replaced by whatever size is needed to hold the remaining
/// elements.
pub struct Reshape;

impl InferShapes for Reshape {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 2)?;
        let input = &inputs[0];
        let target = inputs[1].int_values()?;

        let src_len = checked_numel(input.shape()?)?;

        let mut wildcard = None;
        let mut explicit_len: i64 = 1;
        for (i, &size) in target.iter().enumerate() {
            match size {
                -1 if wildcard.is_some() => {
                    return Err(OpError::InvalidValue(format!(
                        "target shape {:?} has more than one -1 dim",
                        target
                    )));
                }
                -1 => wildcard = Some(i),
                size if size < 0 => {
                    return Err(OpError::InvalidValue(format!(
                        "target shape {:?} has negative size {}",
                        target, size
                    )));
                }
                size => {
                    explicit_len = explicit_len.checked_mul(size).ok_or_else(|| {
                        OpError::InvalidValue(format!(
                            "target shape {:?} has too many elements",
                            target
                        ))
                    })?;
                }
            }
        }

        let divisible = if explicit_len == 0 {
            src_len == 0 && wildcard.is_none()
        } else {
            src_len % explicit_len == 0
        };
        if !divisible {
            return Err(OpError::InvalidValue(format!(
                "cannot reshape {} elements into shape {:?}",
                src_len, target
            )));
        }

        let mut shape = Shape::from_slice(target);
        if let Some(index) = wildcard {
            shape[index] = src_len / explicit_len;
        }

        Ok([ValueMeta::tensor(shape, input.dtype())].into())
    }
}

/// Reorder the dims of a tensor (`aten::permute`).
///
/// Inputs are `(self, dims)`. Negative dims are not supported.
pub struct Permute;

impl InferShapes for Permute {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 2)?;
        let input = &inputs[0];
        let dims = input.shape()?;
        let perm = inputs[1].int_values()?;

        if perm.len() != dims.len() {
            return Err(OpError::InvalidValue(format!(
                "permutation {:?} does not match input rank {}",
                perm,
                dims.len()
            )));
        }

        let mut seen: SmallVec<[bool; 4]> = SmallVec::from_elem(false, dims.len());
        let mut shape = Shape::with_capacity(dims.len());
        for &axis in perm {
            if axis < 0 {
                return Err(OpError::InvalidValue(format!(
                    "negative permute dim {} is not supported",
                    axis
                )));
            }
            let axis = axis as usize;
            if axis >= dims.len() || seen[axis] {
                return Err(OpError::InvalidValue(format!(
                    "permutation {:?} is invalid for a tensor with {} dims",
                    perm,
                    dims.len()
                )));
            }
            seen[axis] = true;
            shape.push(dims[axis]);
        }

        Ok([ValueMeta::tensor(shape, input.dtype())].into())
    }
}

/// Return the shape of stacking `shapes` along a new dim inserted at `axis`.
fn stack_shape(shapes: &[Shape], axis: usize) -> Result<Shape, OpError> {
    let [first, rest @ ..] = shapes else {
        return Err(OpError::InvalidValue("cannot stack an empty list".into()));
    };
    if let Some(other) = rest.iter().find(|shape| *shape != first) {
        return Err(OpError::IncompatibleShapes(format!(
            "stacked tensors must have the same shape but got {:?} and {:?}",
            first, other
        )));
    }
    let mut shape = first.clone();
    shape.insert(axis, shapes.len() as i64);
    Ok(shape)
}

/// Join a list of same-shaped tensors along a new dim (`aten::stack`).
///
/// Inputs are `(tensors, dim)`. The dim is resolved against the rank of the
/// tensors being stacked.
pub struct Stack;

impl InferShapes for Stack {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 2)?;
        let list = &inputs[0];
        let shapes = list.shape_list()?;
        let ndim = shapes.first().map(|s| s.len()).unwrap_or(0);
        let axis = resolve_axis(ndim, inputs[1].scalar_value()?)?;
        let shape = stack_shape(shapes, axis)?;
        Ok([ValueMeta::tensor(shape, list.dtype())].into())
    }
}

/// Stack operator produced by graph fusion (`glow::fused_stack`).
///
/// Unlike [`Stack`], the tensors are passed as separate inputs and `dim` is
/// an attribute, which may refer to the new dim.
pub struct FusedStack {
    pub dim: i64,
}

impl InferShapes for FusedStack {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_min_inputs(inputs, 1)?;
        let first = &inputs[0];
        if inputs.len() == 1 {
            return Ok([first.clone()].into());
        }

        let shapes = inputs
            .iter()
            .map(|input| input.shape().cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let axis = resolve_axis(shapes[0].len() + 1, self.dim)?;
        let shape = stack_shape(&shapes, axis)?;
        Ok([ValueMeta::tensor(shape, first.dtype())].into())
    }
}
