use crate::infer_shapes::{check_input_count, check_min_inputs, InferShapes, OpError};
use crate::meta::{Shape, ValueMeta};

/// Build a list from the operator's inputs (`prim::ListConstruct`).
///
/// If the first input is a scalar, all inputs must be scalars and the result
/// is an integer list. Otherwise the result is a list of tensors.
pub struct ListConstruct;

impl InferShapes for ListConstruct {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_min_inputs(inputs, 1)?;

        if inputs[0].is_scalar() {
            let values = inputs
                .iter()
                .map(|input| input.scalar_value())
                .collect::<Result<Vec<_>, _>>()?;
            return Ok([ValueMeta::int_list(values)].into());
        }

        let shapes = inputs
            .iter()
            .map(|input| input.shape().cloned())
            .collect::<Result<Vec<Shape>, _>>()?;
        Ok([ValueMeta::tensor_list(shapes, inputs[0].dtype())].into())
    }
}

/// Split a tensor list into one output per item (`prim::ListUnpack`).
pub struct ListUnpack {
    /// Number of outputs of the node.
    pub num_outputs: usize,
}

impl InferShapes for ListUnpack {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 1)?;
        let list = &inputs[0];
        let shapes = list.shape_list()?;
        if shapes.len() != self.num_outputs {
            return Err(OpError::IncorrectOutputCount {
                expected: self.num_outputs,
                actual: shapes.len(),
            });
        }
        Ok(shapes
            .iter()
            .map(|shape| ValueMeta::tensor(shape.clone(), list.dtype()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{ListConstruct, ListUnpack};
    use crate::infer_shapes::{InferShapes, OpError};
    use crate::meta::{int, int_list, tensor, tensor_list};

    #[test]
    fn test_list_construct_ints() {
        let result = ListConstruct
            .infer_shapes(&[int!(4), int!(-1), int!(8)])
            .unwrap();
        assert_eq!(result, [int_list!(4, -1, 8)]);
        assert_eq!(result[0].shape().unwrap().as_slice(), &[3, 1]);

        // Mixing scalars and tensors is an error.
        let err = ListConstruct.infer_shapes(&[int!(4), tensor!(2, 3)]).err();
        assert!(matches!(err, Some(OpError::TypeMismatch { .. })));
    }

    #[test]
    fn test_list_construct_tensors() {
        let result = ListConstruct
            .infer_shapes(&[tensor!(2, 3), tensor!(4, 3)])
            .unwrap();
        assert_eq!(result, [tensor_list!([2, 3], [4, 3])]);

        let err = ListConstruct
            .infer_shapes(&[tensor!(2, 3), tensor_list!([2, 3])])
            .err();
        assert!(matches!(err, Some(OpError::TypeMismatch { .. })));

        let err = ListConstruct.infer_shapes(&[]).err();
        assert!(matches!(err, Some(OpError::IncorrectInputCount { .. })));
    }

    #[test]
    fn test_list_unpack() {
        let op = ListUnpack { num_outputs: 2 };
        let result = op
            .infer_shapes(&[tensor_list!([2, 3], [4, 3])])
            .unwrap();
        assert_eq!(result, [tensor!(2, 3), tensor!(4, 3)]);

        let err = op.infer_shapes(&[tensor_list!([2, 3])]).err();
        assert_eq!(
            err,
            Some(OpError::IncorrectOutputCount {
                expected: 2,
                actual: 1
            })
        );

        let err = op.infer_shapes(&[tensor!(2, 3)]).err();
        assert!(matches!(err, Some(OpError::TypeMismatch { .. })));
    }
}
