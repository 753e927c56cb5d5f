use crate::infer_shapes::{
    binary_op_shape, check_input_count, check_min_inputs, InferShapes, OpError,
};
use crate::meta::{Shape, ValueMeta};

/// Return the shape of the product of two matrices.
fn matmul_shape(lhs: &[i64], rhs: &[i64]) -> Result<Shape, OpError> {
    let (&[m, k], &[rhs_k, n]) = (lhs, rhs) else {
        return Err(OpError::IncompatibleShapes(format!(
            "expected two matrices but got shapes {:?} and {:?}",
            lhs, rhs
        )));
    };
    if k != rhs_k {
        return Err(OpError::IncompatibleShapes(format!(
            "inner dimensions of {:?} and {:?} do not match",
            lhs, rhs
        )));
    }
    Ok(Shape::from_slice(&[m, n]))
}

/// Matrix multiplication of two matrices (`aten::mm`).
pub struct Mm;

impl InferShapes for Mm {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 2)?;
        let (lhs, rhs) = (&inputs[0], &inputs[1]);
        let shape = matmul_shape(lhs.shape()?, rhs.shape()?)?;
        Ok([ValueMeta::tensor(shape, lhs.dtype())].into())
    }
}

/// Batched matrix multiplication (`aten::bmm`).
///
/// Both inputs must be 3D with the same batch size.
pub struct Bmm;

impl InferShapes for Bmm {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 2)?;
        let (lhs, rhs) = (&inputs[0], &inputs[1]);

        let (&[lhs_batch, m, k], &[rhs_batch, rhs_k, n]) =
            (lhs.shape()?.as_slice(), rhs.shape()?.as_slice())
        else {
            return Err(OpError::IncompatibleShapes(format!(
                "expected two 3D tensors but got shapes {:?} and {:?}",
                lhs.shape()?,
                rhs.shape()?
            )));
        };

        if lhs_batch != rhs_batch {
            return Err(OpError::IncompatibleShapes(format!(
                "batch sizes {} and {} do not match",
                lhs_batch, rhs_batch
            )));
        }
        if k != rhs_k {
            return Err(OpError::IncompatibleShapes(format!(
                "inner dimensions {} and {} do not match",
                k, rhs_k
            )));
        }

        Ok([ValueMeta::tensor(
            Shape::from_slice(&[lhs_batch, m, n]),
            lhs.dtype(),
        )]
        .into())
    }
}

/// Computes `beta * input + alpha * (mat1 @ mat2)` (`aten::addmm`).
///
/// Inputs are `(input, mat1, mat2, beta?, alpha?)`. If `mat2` is a scalar the
/// product is replaced by `mat1`.
pub struct Addmm;

impl InferShapes for Addmm {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_min_inputs(inputs, 3)?;
        let (input, mat1, mat2) = (&inputs[0], &inputs[1], &inputs[2]);

        let product = if mat2.shape()?.len() == 1 {
            mat1.clone()
        } else {
            let shape = matmul_shape(mat1.shape()?, mat2.shape()?)?;
            ValueMeta::tensor(shape, mat1.dtype())
        };

        let shape = binary_op_shape(input, &product)?;
        Ok([ValueMeta::tensor(shape, input.dtype())].into())
    }
}
