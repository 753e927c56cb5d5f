//! Shape inference for embedding bag operators.
//!
//! These operators sum or average groups ("bags") of rows from an embedding
//! table. Inputs are `(weight, indices, offsets, ...)`. When `indices` is 1D,
//! `offsets` gives the start of each bag. When `indices` is 2D, each row of
//! `indices` is one bag and `offsets` is ignored.
//!
//! All of these operators have multiple outputs, but only the first (the
//! pooled embeddings) is described.

use crate::infer_shapes::{check_input_count, InferShapes, OpError};
use crate::meta::{DataType, Shape, ValueMeta};

/// Return the number of bags described by the `indices` and `offsets` inputs.
///
/// If `has_end_offset` is true, the last entry in `offsets` marks the end of
/// the final bag rather than the start of another one.
fn bag_count(
    indices: &ValueMeta,
    offsets: &ValueMeta,
    has_end_offset: bool,
) -> Result<i64, OpError> {
    match indices.shape()?.as_slice() {
        [_] => {
            let &[n_offsets] = offsets.shape()?.as_slice() else {
                return Err(OpError::IncompatibleShapes(format!(
                    "expected 1D offsets but got shape {:?}",
                    offsets.shape()?
                )));
            };
            if has_end_offset && n_offsets == 0 {
                return Err(OpError::InvalidValue(
                    "offsets must contain an end offset".into(),
                ));
            }
            Ok(n_offsets - has_end_offset as i64)
        }
        &[n_bags, _] => Ok(n_bags),
        other => Err(OpError::IncompatibleShapes(format!(
            "expected 1D or 2D indices but got shape {:?}",
            other
        ))),
    }
}

/// Return the width of the embedding rows, given the size of the last dim of
/// the stored weights.
fn embedding_width(weight: &ValueMeta, unpack: impl Fn(i64) -> i64) -> Result<i64, OpError> {
    let Some(&row_size) = weight.shape()?.last() else {
        return Err(OpError::IncompatibleShapes(
            "expected weight with at least one dim".into(),
        ));
    };
    let width = unpack(row_size);
    if width <= 0 {
        return Err(OpError::InvalidValue(format!(
            "weight row size {} is too small for the packed format",
            row_size
        )));
    }
    Ok(width)
}

/// Embedding bag over an unquantized weight table (`aten::embedding_bag`).
///
/// Takes 8 inputs.
pub struct EmbeddingBag {
    pub has_end_offset: bool,
}

impl InferShapes for EmbeddingBag {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 8)?;
        let weight = &inputs[0];
        let rows = bag_count(&inputs[1], &inputs[2], self.has_end_offset)?;
        let width = embedding_width(weight, |size| size)?;
        Ok([ValueMeta::tensor(
            Shape::from_slice(&[rows, width]),
            weight.dtype(),
        )]
        .into())
    }
}

/// Embedding bag over a table with 8-bit rowwise quantization
/// (`embedding_bag_byte_rowwise_offsets`).
///
/// Each row of the weights is followed by a 4-byte scale and 4-byte zero
/// point. Takes 8 inputs.
pub struct EmbeddingBagByteRowwise {
    pub has_end_offset: bool,
}

impl InferShapes for EmbeddingBagByteRowwise {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 8)?;
        let rows = bag_count(&inputs[1], &inputs[2], self.has_end_offset)?;
        let width = embedding_width(&inputs[0], |size| size.saturating_sub(8))?;
        Ok([ValueMeta::tensor(
            Shape::from_slice(&[rows, width]),
            Some(DataType::Float),
        )]
        .into())
    }
}

/// Embedding bag over a table with 4-bit rowwise quantization
/// (`embedding_bag_4bit_rowwise_offsets`).
///
/// Each row packs two elements per byte, followed by a 2-byte scale and
/// 2-byte zero point. Takes 9 inputs.
pub struct EmbeddingBag4BitRowwise {
    pub has_end_offset: bool,
}

impl InferShapes for EmbeddingBag4BitRowwise {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 9)?;
        let rows = bag_count(&inputs[1], &inputs[2], self.has_end_offset)?;
        let width = embedding_width(&inputs[0], |size| size.saturating_sub(4).saturating_mul(2))?;
        Ok([ValueMeta::tensor(
            Shape::from_slice(&[rows, width]),
            Some(DataType::Float),
        )]
        .into())
    }
}

#[cfg(test)]
mod tests {
    use shapeinfer_testing::TestCases;

    use super::{EmbeddingBag, EmbeddingBag4BitRowwise, EmbeddingBagByteRowwise};
    use crate::infer_shapes::{InferShapes, OpError};
    use crate::meta::{int, tensor, DataType, Shape, ValueMeta};

    /// Build the input list for an embedding bag op, padding with scalar
    /// arguments that don't affect the output shape.
    fn inputs(
        weight: ValueMeta,
        indices: ValueMeta,
        offsets: ValueMeta,
        len: usize,
    ) -> Vec<ValueMeta> {
        let mut inputs = vec![weight, indices, offsets];
        inputs.resize(len, int!(0));
        inputs
    }

    fn quantized(shape: &[i64]) -> ValueMeta {
        ValueMeta::tensor(Shape::from_slice(shape), Some(DataType::UInt8))
    }

    #[test]
    fn test_embedding_bag() {
        #[derive(Debug)]
        struct Case {
            indices: ValueMeta,
            offsets: ValueMeta,
            has_end_offset: bool,
            expected: Result<ValueMeta, ()>,
        }

        let cases = [
            Case {
                indices: tensor!(20),
                offsets: tensor!(5),
                has_end_offset: true,
                expected: Ok(tensor!(4, 16)),
            },
            Case {
                indices: tensor!(20),
                offsets: tensor!(5),
                has_end_offset: false,
                expected: Ok(tensor!(5, 16)),
            },
            // Fixed-size bags.
            Case {
                indices: tensor!(6, 3),
                offsets: tensor!(5),
                has_end_offset: true,
                expected: Ok(tensor!(6, 16)),
            },
            Case {
                indices: tensor!(20),
                offsets: tensor!(5, 1),
                has_end_offset: true,
                expected: Err(()),
            },
            Case {
                indices: tensor!(2, 3, 4),
                offsets: tensor!(5),
                has_end_offset: true,
                expected: Err(()),
            },
            // No room for the end offset.
            Case {
                indices: tensor!(0),
                offsets: tensor!(0),
                has_end_offset: true,
                expected: Err(()),
            },
            Case {
                indices: tensor!(0),
                offsets: tensor!(0),
                has_end_offset: false,
                expected: Ok(tensor!(0, 16)),
            },
        ];

        cases.test_each(|case| {
            let op = EmbeddingBag {
                has_end_offset: case.has_end_offset,
            };
            let result = op
                .infer_shapes(&inputs(
                    tensor!(100, 16),
                    case.indices.clone(),
                    case.offsets.clone(),
                    8,
                ))
                .map(|mut r| r.remove(0))
                .map_err(|_| ());
            assert_eq!(result, case.expected);
        });
    }

    #[test]
    fn test_embedding_bag_byte_rowwise() {
        let op = EmbeddingBagByteRowwise {
            has_end_offset: true,
        };
        let result = op
            .infer_shapes(&inputs(quantized(&[5, 12]), tensor!(10), tensor!(4), 8))
            .unwrap();
        assert_eq!(result, [tensor!(3, 4)]);

        let err = op
            .infer_shapes(&inputs(quantized(&[5, 12]), tensor!(10), tensor!(4), 9))
            .err();
        assert!(matches!(err, Some(OpError::IncorrectInputCount { .. })));

        let err = op
            .infer_shapes(&inputs(quantized(&[5, 8]), tensor!(10), tensor!(4), 8))
            .err();
        assert!(matches!(err, Some(OpError::InvalidValue(_))));

        let err = op
            .infer_shapes(&inputs(quantized(&[5, 12]), tensor!(0), tensor!(0), 8))
            .err();
        assert!(matches!(err, Some(OpError::InvalidValue(_))));
    }

    #[test]
    fn test_embedding_bag_4bit_rowwise() {
        let op = EmbeddingBag4BitRowwise {
            has_end_offset: true,
        };
        let result = op
            .infer_shapes(&inputs(quantized(&[5, 12]), tensor!(10), tensor!(4), 9))
            .unwrap();
        assert_eq!(result, [tensor!(3, 16)]);

        let op = EmbeddingBag4BitRowwise {
            has_end_offset: false,
        };
        let result = op
            .infer_shapes(&inputs(quantized(&[5, 12]), tensor!(3, 2), tensor!(4), 9))
            .unwrap();
        assert_eq!(result, [tensor!(3, 16)]);
    }
}
