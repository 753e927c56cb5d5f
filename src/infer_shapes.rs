//! Traits for shape inference and common implementations.

use std::error::Error;
use std::fmt;

use crate::meta::{Shape, ValueMeta};

/// Errors reported by an operator's shape function.
///
/// These do not identify the operator. The engine adds that context when
/// converting them into an [`InferError`](crate::InferError).
#[derive(Clone, Debug, PartialEq)]
pub enum OpError {
    /// Too many or too few inputs were provided for this operator.
    IncorrectInputCount {
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    /// The operator would produce a different number of outputs than the
    /// node has.
    IncorrectOutputCount { expected: usize, actual: usize },

    /// The input shapes are incompatible.
    ///
    /// Operator execution would fail if given inputs with these shapes.
    IncompatibleShapes(String),

    /// An operator input or attribute has an invalid value.
    InvalidValue(String),

    /// An input was a different kind of value than the operator expects (eg.
    /// a tensor list where a tensor was expected).
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncorrectInputCount { min, max, actual } => match max {
                Some(max) if max == min => write!(f, "expected {} inputs, got {}", min, actual),
                Some(max) => write!(
                    f,
                    "expected between {} and {} inputs, got {}",
                    min, max, actual
                ),
                None => write!(f, "expected at least {} inputs, got {}", min, actual),
            },
            Self::IncorrectOutputCount { expected, actual } => {
                write!(f, "expected {} outputs, got {}", expected, actual)
            }
            Self::IncompatibleShapes(details) => write!(f, "incompatible shapes: {}", details),
            Self::InvalidValue(details) => write!(f, "invalid value: {}", details),
            Self::TypeMismatch { expected, actual } => {
                write!(f, "expected {} input but got {}", expected, actual)
            }
        }
    }
}

impl Error for OpError {}

/// Infer the metadata of an operator's outputs given its inputs.
pub trait InferShapes {
    /// Return metadata for each output the operator produces, in output
    /// order.
    ///
    /// Operators may return fewer entries than the node has outputs if the
    /// trailing outputs are not described (eg. the auxiliary outputs of
    /// `embedding_bag`).
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError>;
}

/// Check that `inputs` has exactly `count` entries.
pub(crate) fn check_input_count(inputs: &[ValueMeta], count: usize) -> Result<(), OpError> {
    if inputs.len() != count {
        return Err(OpError::IncorrectInputCount {
            min: count,
            max: Some(count),
            actual: inputs.len(),
        });
    }
    Ok(())
}

/// Check that `inputs` has at least `min` entries.
pub(crate) fn check_min_inputs(inputs: &[ValueMeta], min: usize) -> Result<(), OpError> {
    if inputs.len() < min {
        return Err(OpError::IncorrectInputCount {
            min,
            max: None,
            actual: inputs.len(),
        });
    }
    Ok(())
}

/// Shape inference for unary operators.
///
/// These take exactly one tensor and return a tensor of the same shape and
/// type.
pub struct UnaryOp;

impl InferShapes for UnaryOp {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 1)?;
        let data = &inputs[0];
        Ok([ValueMeta::tensor(data.shape()?.clone(), data.dtype())].into())
    }
}

/// Shape inference for binary elementwise operators.
///
/// These take two inputs (plus an optional `alpha` scalar which does not
/// affect the shape) and return an output whose shape is the result of
/// broadcasting the two input shapes together.
pub struct BinaryOp;

impl InferShapes for BinaryOp {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        if !(2..=3).contains(&inputs.len()) {
            return Err(OpError::IncorrectInputCount {
                min: 2,
                max: Some(3),
                actual: inputs.len(),
            });
        }
        let shape = binary_op_shape(&inputs[0], &inputs[1])?;
        Ok([ValueMeta::tensor(shape, inputs[0].dtype())].into())
    }
}

/// Return the output shape of a binary elementwise op with inputs `lhs` and
/// `rhs`.
///
/// If `rhs` has a single dimension it is treated as a scalar and the result
/// is the shape of `lhs`.
pub(crate) fn binary_op_shape(lhs: &ValueMeta, rhs: &ValueMeta) -> Result<Shape, OpError> {
    let lhs = lhs.shape()?;
    let rhs = rhs.shape()?;
    if rhs.len() == 1 {
        return Ok(lhs.clone());
    }
    broadcast_shapes(lhs, rhs)
}

/// Broadcast two shapes together.
///
/// Shapes are aligned starting from the last dimension. Dimensions which are
/// missing or have size 1 take the size of the corresponding dimension in the
/// other shape.
pub fn broadcast_shapes(a: &[i64], b: &[i64]) -> Result<Shape, OpError> {
    let ndim = a.len().max(b.len());
    let mut out_shape = Shape::from_elem(0, ndim);

    for i in 0..ndim {
        let a_dim = a.len().checked_sub(i + 1).map(|idx| a[idx]);
        let b_dim = b.len().checked_sub(i + 1).map(|idx| b[idx]);

        let dim = match (a_dim, b_dim) {
            (None | Some(1), Some(b_size)) => b_size,
            (Some(a_size), None | Some(1)) => a_size,
            (Some(a_size), Some(b_size)) if a_size == b_size => a_size,
            (Some(a_size), Some(b_size)) => {
                return Err(OpError::IncompatibleShapes(format!(
                    "size {} of {:?} does not match size {} of {:?} at non-singleton dimension {}",
                    a_size,
                    a,
                    b_size,
                    b,
                    ndim - i - 1
                )));
            }
            (None, None) => unreachable!("index is within the longer shape"),
        };
        out_shape[ndim - i - 1] = dim;
    }

    Ok(out_shape)
}

/// Resolve an index given as a value in `[-len, len-1]` to a positive index in
/// `[0, len)`, or return None if the index is out of bounds.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = len.min(i64::MAX as usize) as i64;
    if index < -len || index >= len {
        return None;
    }

    if index >= 0 {
        Some(index as usize)
    } else {
        Some((len + index) as usize)
    }
}

/// Resolve an axis given as a value in `[-ndim, ndim-1]` to the zero-based
/// dimension of a tensor with `ndim` dimensions.
///
/// Negative axis values count backwards from the last dimension.
pub(crate) fn resolve_axis(ndim: usize, axis: i64) -> Result<usize, OpError> {
    resolve_index(ndim, axis).ok_or_else(|| {
        OpError::InvalidValue(format!(
            "dimension {} is out of range for a tensor with {} dims",
            axis, ndim
        ))
    })
}

#[cfg(test)]
mod tests {
    use shapeinfer_testing::TestCases;

    use super::{broadcast_shapes, resolve_axis, BinaryOp, InferShapes, OpError, UnaryOp};
    use crate::meta::{int, tensor, tensor_list, DataType, Shape, ValueMeta};

    #[test]
    fn test_unary_op() {
        let input = tensor!(4, 16, 24);
        let output = UnaryOp.infer_shapes(&[input.clone()]).unwrap();
        assert_eq!(output, [input]);

        let err = UnaryOp.infer_shapes(&[]).err().unwrap();
        assert_eq!(
            err,
            OpError::IncorrectInputCount {
                min: 1,
                max: Some(1),
                actual: 0
            }
        );

        let err = UnaryOp.infer_shapes(&[tensor_list!([2])]).err().unwrap();
        assert!(matches!(err, OpError::TypeMismatch { .. }));
    }

    #[test]
    fn test_binary_op() {
        #[derive(Debug)]
        struct Case {
            lhs: ValueMeta,
            rhs: ValueMeta,
            expected: ValueMeta,
        }

        let cases = [
            Case {
                lhs: tensor!(2, 3),
                rhs: tensor!(2, 3),
                expected: tensor!(2, 3),
            },
            Case {
                lhs: tensor!(1, 5),
                rhs: tensor!(4, 1),
                expected: tensor!(4, 5),
            },
            Case {
                lhs: tensor!(3),
                rhs: tensor!(2, 3),
                expected: tensor!(2, 3),
            },
            Case {
                lhs: tensor!(8, 1, 6, 1),
                rhs: tensor!(7, 1, 5),
                expected: tensor!(8, 7, 6, 5),
            },
            // Single-dim RHS is treated as a scalar.
            Case {
                lhs: tensor!(2, 3),
                rhs: tensor!(3),
                expected: tensor!(2, 3),
            },
            Case {
                lhs: tensor!(2, 3),
                rhs: int!(4),
                expected: tensor!(2, 3),
            },
        ];

        cases.test_each(|case| {
            let output = BinaryOp
                .infer_shapes(&[case.lhs.clone(), case.rhs.clone()])
                .unwrap();
            assert_eq!(output, [case.expected.clone()]);
        });
    }

    #[test]
    fn test_binary_op_with_alpha() {
        let output = BinaryOp
            .infer_shapes(&[tensor!(2, 3), tensor!(1, 3), int!(1)])
            .unwrap();
        assert_eq!(output, [tensor!(2, 3)]);
    }

    #[test]
    fn test_binary_op_keeps_lhs_dtype() {
        let lhs = ValueMeta::tensor(Shape::from_slice(&[2, 3]), Some(DataType::Half));
        let output = BinaryOp.infer_shapes(&[lhs.clone(), tensor!(2, 3)]).unwrap();
        assert_eq!(output[0].dtype(), Some(DataType::Half));
    }

    #[test]
    fn test_binary_op_invalid() {
        #[derive(Debug)]
        struct Case {
            inputs: Vec<ValueMeta>,
            expected: fn(&OpError) -> bool,
        }

        let cases = [
            Case {
                inputs: [tensor!(5)].into(),
                expected: |err| matches!(err, OpError::IncorrectInputCount { .. }),
            },
            Case {
                inputs: [tensor!(2, 5), tensor!(2, 3)].into(),
                expected: |err| matches!(err, OpError::IncompatibleShapes(_)),
            },
            Case {
                inputs: [tensor!(2, 5), tensor_list!([2, 5])].into(),
                expected: |err| matches!(err, OpError::TypeMismatch { .. }),
            },
        ];

        cases.test_each(|case| {
            let err = BinaryOp.infer_shapes(&case.inputs).err().unwrap();
            assert!((case.expected)(&err), "unexpected error {:?}", err);
        });
    }

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes(&[], &[]).unwrap().as_slice(), &[] as &[i64]);
        assert_eq!(broadcast_shapes(&[5], &[]).unwrap().as_slice(), &[5]);
        assert_eq!(broadcast_shapes(&[1, 4], &[3, 1]).unwrap().as_slice(), &[3, 4]);
        assert!(broadcast_shapes(&[2, 4], &[3, 4]).is_err());
    }

    #[test]
    fn test_resolve_axis() {
        assert_eq!(resolve_axis(3, 0), Ok(0));
        assert_eq!(resolve_axis(3, 2), Ok(2));
        assert_eq!(resolve_axis(3, -1), Ok(2));
        assert_eq!(resolve_axis(3, -3), Ok(0));
        assert!(resolve_axis(3, 3).is_err());
        assert!(resolve_axis(3, -4).is_err());
        assert!(resolve_axis(0, 0).is_err());
    }
}
