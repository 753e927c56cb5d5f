use crate::meta::DataType;

/// Describes a run-time input to a graph.
///
/// Only the shape and type of tensors are needed, not their contents. Scalar
/// and integer list inputs carry their values, since operators such as
/// `transpose` or `reshape` read them to determine output shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum InputValue {
    Tensor { shape: Vec<i64>, dtype: DataType },
    Bool(bool),
    Int(i64),
    IntList(Vec<i64>),

    /// Floating point scalar. Not supported as a graph input.
    Float(f64),

    /// String value. Not supported as a graph input.
    Str(String),

    /// List of tensors. Not supported as a graph input.
    TensorList(Vec<Vec<i64>>),
}

impl InputValue {
    /// Create a tensor input descriptor.
    pub fn tensor(shape: &[i64], dtype: DataType) -> Self {
        InputValue::Tensor {
            shape: shape.to_vec(),
            dtype,
        }
    }

    /// Return a short description of the kind of input, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            InputValue::Tensor { .. } => "tensor",
            InputValue::Bool(_) => "bool",
            InputValue::Int(_) => "int",
            InputValue::IntList(_) => "int list",
            InputValue::Float(_) => "float",
            InputValue::Str(_) => "string",
            InputValue::TensorList(_) => "tensor list",
        }
    }
}

impl From<bool> for InputValue {
    fn from(val: bool) -> Self {
        InputValue::Bool(val)
    }
}

impl From<i64> for InputValue {
    fn from(val: i64) -> Self {
        InputValue::Int(val)
    }
}

impl From<Vec<i64>> for InputValue {
    fn from(val: Vec<i64>) -> Self {
        InputValue::IntList(val)
    }
}
