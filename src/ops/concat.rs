use crate::infer_shapes::{
    check_input_count, check_min_inputs, resolve_axis, InferShapes, OpError,
};
use crate::meta::{Shape, ValueMeta};

/// Return the shape of concatenating `shapes` along `dim`.
fn concat_shapes(shapes: &[Shape], dim: i64) -> Result<Shape, OpError> {
    let [first, rest @ ..] = shapes else {
        return Err(OpError::InvalidValue("cannot concatenate an empty list".into()));
    };
    if rest.is_empty() {
        return Ok(first.clone());
    }

    let axis = resolve_axis(first.len(), dim)?;
    let mut out_shape = first.clone();

    for shape in rest {
        let compatible = shape.len() == first.len()
            && shape
                .iter()
                .zip(first.iter())
                .enumerate()
                .all(|(i, (size, first_size))| i == axis || size == first_size);
        if !compatible {
            return Err(OpError::IncompatibleShapes(format!(
                "cannot concatenate {:?} and {:?} along dim {}",
                first, shape, axis
            )));
        }
        out_shape[axis] += shape[axis];
    }

    Ok(out_shape)
}

/// Concatenate a list of tensors along an existing dim (`aten::cat`).
///
/// Inputs are `(tensors, dim)`.
pub struct Cat;

impl InferShapes for Cat {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 2)?;
        let list = &inputs[0];
        let shapes = list.shape_list()?;

        // A single tensor is returned as-is, whatever the dim.
        if let [shape] = shapes {
            return Ok([ValueMeta::tensor(shape.clone(), list.dtype())].into());
        }

        let shape = concat_shapes(shapes, inputs[1].scalar_value()?)?;
        Ok([ValueMeta::tensor(shape, list.dtype())].into())
    }
}

/// Concat operator produced by graph fusion (`prim::FusedConcat`).
///
/// The tensors are passed as separate inputs and `dim` is an attribute.
pub struct FusedConcat {
    pub dim: i64,
}

impl InferShapes for FusedConcat {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_min_inputs(inputs, 1)?;
        let shapes = inputs
            .iter()
            .map(|input| input.shape().cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let shape = concat_shapes(&shapes, self.dim)?;
        Ok([ValueMeta::tensor(shape, inputs[0].dtype())].into())
    }
}
