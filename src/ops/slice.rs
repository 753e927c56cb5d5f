use crate::infer_shapes::{check_input_count, resolve_axis, InferShapes, OpError};
use crate::meta::ValueMeta;

/// Return the number of elements selected by slicing a dim of size `size`
/// with the range `start..end` and a positive `step`.
///
/// `start` and `end` may be negative, in which case they count back from the
/// end of the dim. Out of range values are clamped.
fn slice_len(size: i64, start: i64, end: i64, step: i64) -> i64 {
    if start >= size || end <= -size {
        return 0;
    }

    let start = if start <= -size {
        0
    } else if start < 0 {
        start + size
    } else {
        start
    };
    let end = if end > size {
        size
    } else if end < 0 {
        end + size
    } else {
        end
    };

    if start >= end {
        0
    } else {
        (end - start - 1) / step + 1
    }
}

/// Select a strided range from one dim of a tensor (`aten::slice`).
///
/// Inputs are `(self, dim, start, end, step)`.
pub struct Slice;

impl InferShapes for Slice {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 5)?;
        let input = &inputs[0];
        let mut shape = input.shape()?.clone();

        let axis = resolve_axis(shape.len(), inputs[1].scalar_value()?)?;
        let start = inputs[2].scalar_value()?;
        let end = inputs[3].scalar_value()?;
        let step = inputs[4].scalar_value()?;
        if step <= 0 {
            return Err(OpError::InvalidValue(format!(
                "slice step must be positive but got {}",
                step
            )));
        }

        shape[axis] = slice_len(shape[axis], start, end, step);
        Ok([ValueMeta::tensor(shape, input.dtype())].into())
    }
}

#[cfg(test)]
mod tests {
    use shapeinfer_testing::TestCases;

    use super::{slice_len, Slice};
    use crate::infer_shapes::{InferShapes, OpError};
    use crate::meta::{int, tensor};

    #[test]
    fn test_slice_len() {
        #[derive(Debug)]
        struct Case {
            size: i64,
            start: i64,
            end: i64,
            step: i64,
            expected: i64,
        }

        let cases = [
            Case {
                size: 10,
                start: 0,
                end: 10,
                step: 1,
                expected: 10,
            },
            Case {
                size: 10,
                start: 2,
                end: 7,
                step: 2,
                expected: 3,
            },
            // Negative start and end count from the end.
            Case {
                size: 10,
                start: -3,
                end: -1,
                step: 1,
                expected: 2,
            },
            // End past the dim is clamped.
            Case {
                size: 10,
                start: 4,
                end: i64::MAX,
                step: 1,
                expected: 6,
            },
            // Start before the dim is clamped.
            Case {
                size: 10,
                start: -20,
                end: 3,
                step: 1,
                expected: 3,
            },
            // Start past the end of the dim.
            Case {
                size: 10,
                start: 10,
                end: 20,
                step: 1,
                expected: 0,
            },
            // End before the start of the dim.
            Case {
                size: 10,
                start: 0,
                end: -10,
                step: 1,
                expected: 0,
            },
            // Empty range.
            Case {
                size: 10,
                start: 6,
                end: 4,
                step: 1,
                expected: 0,
            },
            // A step larger than the range selects only the first element.
            Case {
                size: 10,
                start: 0,
                end: 10,
                step: i64::MAX,
                expected: 1,
            },
            Case {
                size: 10,
                start: 3,
                end: i64::MAX,
                step: 4,
                expected: 2,
            },
        ];

        cases.test_each(|case| {
            assert_eq!(
                slice_len(case.size, case.start, case.end, case.step),
                case.expected
            );
        });
    }

    #[test]
    fn test_slice() {
        let result = Slice
            .infer_shapes(&[tensor!(4, 10), int!(-1), int!(1), int!(9), int!(3)])
            .unwrap();
        assert_eq!(result, [tensor!(4, 3)]);

        let result = Slice
            .infer_shapes(&[tensor!(4, 10), int!(1), int!(0), int!(10), int!(i64::MAX)])
            .unwrap();
        assert_eq!(result, [tensor!(4, 1)]);

        let err = Slice
            .infer_shapes(&[tensor!(4, 10), int!(1), int!(0), int!(9), int!(0)])
            .err();
        assert!(matches!(err, Some(OpError::InvalidValue(_))));

        let err = Slice
            .infer_shapes(&[tensor!(4, 10), int!(2), int!(0), int!(9), int!(1)])
            .err();
        assert!(matches!(err, Some(OpError::InvalidValue(_))));
    }
}
