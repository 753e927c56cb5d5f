use crate::graph::Attr;
use crate::infer_shapes::{check_input_count, InferShapes, OpError};
use crate::meta::{DataType, ValueMeta};

/// Constant operator (`prim::Constant`).
///
/// The output is derived from the type of the `value` attribute. Scalars
/// produce a scalar with the literal as its value. Float values never affect
/// shapes, so they are recorded as 1.
pub struct Constant {
    pub value: Attr,
}

impl InferShapes for Constant {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 0)?;
        let output = match &self.value {
            Attr::Float(_) => ValueMeta::scalar(1, DataType::Float),
            Attr::Int(value) => ValueMeta::scalar(*value, DataType::Int64),
            Attr::Bool(value) => ValueMeta::scalar(*value as i64, DataType::Bool),
            Attr::None => ValueMeta::none(),
            Attr::Tensor(tensor) => ValueMeta::tensor(tensor.shape.clone(), Some(tensor.dtype)),
        };
        Ok([output].into())
    }
}

#[cfg(test)]
mod tests {
    use super::Constant;
    use crate::graph::{Attr, TensorLiteral};
    use crate::infer_shapes::InferShapes;
    use crate::meta::{int, DataType, Shape, ValueMeta};

    fn infer(value: Attr) -> ValueMeta {
        Constant { value }.infer_shapes(&[]).unwrap().remove(0)
    }

    #[test]
    fn test_constant() {
        assert_eq!(infer(Attr::Int(3)), int!(3));

        let float = infer(Attr::Float(0.25));
        assert_eq!(float.scalar_value(), Ok(1));
        assert_eq!(float.dtype(), Some(DataType::Float));

        let boolean = infer(Attr::Bool(true));
        assert_eq!(boolean.scalar_value(), Ok(1));
        assert_eq!(boolean.dtype(), Some(DataType::Bool));

        assert_eq!(infer(Attr::None), ValueMeta::none());

        let tensor = infer(Attr::Tensor(TensorLiteral {
            shape: Shape::from_slice(&[2, 8]),
            dtype: DataType::Int32,
        }));
        assert_eq!(tensor.shape().unwrap().as_slice(), &[2, 8]);
        assert_eq!(tensor.dtype(), Some(DataType::Int32));
        assert!(tensor.int_values().is_err());
    }
}
