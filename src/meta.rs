//! Metadata describing what is known about graph values during inference.

use std::fmt;

use smallvec::SmallVec;

use crate::infer_shapes::OpError;

/// Sizes of a tensor's dimensions.
pub type Shape = SmallVec<[i64; 4]>;

/// Shapes of the tensors in a list-of-tensors value.
pub type ShapeList = Vec<Shape>;

/// Ordered list of metadata for an operator's inputs.
pub type ArgList = SmallVec<[ValueMeta; 4]>;

/// Enum specifying the element type of a value.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub enum DataType {
    Float,
    Half,
    Double,
    Int64,
    Int32,
    Int8,
    UInt8,
    Bool,
    QUInt8,
    QInt8,
}

impl fmt::Display for DataType {
    /// Format this enum value in the style of the corresponding Rust type (eg.
    /// "i64" for `DataType::Int64`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataType::Float => "f32",
                DataType::Half => "f16",
                DataType::Double => "f64",
                DataType::Int64 => "i64",
                DataType::Int32 => "i32",
                DataType::Int8 => "i8",
                DataType::UInt8 => "u8",
                DataType::Bool => "bool",
                DataType::QUInt8 => "qu8",
                DataType::QInt8 => "qi8",
            }
        )
    }
}

/// The shape component of a [`ValueMeta`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MetaShape {
    /// Shape of a single tensor, or the stand-in shape of a scalar or integer
    /// list value.
    Tensor(Shape),

    /// Shapes of each tensor in a tensor list.
    List(ShapeList),
}

/// What is known about a value in the graph.
///
/// Every value has a shape. Values which are scalars, booleans or lists of
/// integers rather than tensors also carry their integer contents in
/// `values`. For these the shape is a stand-in: `[1]` for a scalar and
/// `[len, 1]` for a list. Operators that consume such values (eg. the `dim`
/// argument of `transpose`) read the contents, while operators that treat
/// them as tensors (eg. the scalar RHS of `add`) read the shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValueMeta {
    shape: MetaShape,
    values: Option<Vec<i64>>,
    dtype: Option<DataType>,
}

impl ValueMeta {
    /// Create metadata for a tensor with a given shape.
    pub fn tensor(shape: impl Into<Shape>, dtype: Option<DataType>) -> Self {
        Self {
            shape: MetaShape::Tensor(shape.into()),
            values: None,
            dtype,
        }
    }

    /// Create metadata for a list of tensors.
    pub fn tensor_list(shapes: ShapeList, dtype: Option<DataType>) -> Self {
        Self {
            shape: MetaShape::List(shapes),
            values: None,
            dtype,
        }
    }

    /// Create metadata for an integer or boolean scalar.
    pub fn scalar(value: i64, dtype: DataType) -> Self {
        Self {
            shape: MetaShape::Tensor(SmallVec::from_slice(&[1])),
            values: Some(vec![value]),
            dtype: Some(dtype),
        }
    }

    /// Create metadata for a list of integers.
    pub fn int_list(values: Vec<i64>) -> Self {
        Self {
            shape: MetaShape::Tensor(SmallVec::from_slice(&[values.len() as i64, 1])),
            values: Some(values),
            dtype: Some(DataType::Int64),
        }
    }

    /// Create metadata for an absent (`None`) value.
    pub fn none() -> Self {
        Self {
            shape: MetaShape::Tensor(Shape::new()),
            values: None,
            dtype: None,
        }
    }

    pub fn meta_shape(&self) -> &MetaShape {
        &self.shape
    }

    pub fn dtype(&self) -> Option<DataType> {
        self.dtype
    }

    /// Return a copy of this metadata with a different data type.
    pub fn with_dtype(mut self, dtype: Option<DataType>) -> Self {
        self.dtype = dtype;
        self
    }

    /// View this value as a single tensor shape.
    pub fn shape(&self) -> Result<&Shape, OpError> {
        match &self.shape {
            MetaShape::Tensor(shape) => Ok(shape),
            MetaShape::List(_) => Err(self.type_mismatch("tensor")),
        }
    }

    /// View this value as a list of tensor shapes.
    pub fn shape_list(&self) -> Result<&[Shape], OpError> {
        match &self.shape {
            MetaShape::List(shapes) => Ok(shapes),
            MetaShape::Tensor(_) => Err(self.type_mismatch("tensor list")),
        }
    }

    /// View this value as a sequence of integers.
    pub fn int_values(&self) -> Result<&[i64], OpError> {
        self.values
            .as_deref()
            .ok_or_else(|| self.type_mismatch("int list"))
    }

    /// View this value as a single integer.
    pub fn scalar_value(&self) -> Result<i64, OpError> {
        match self.values.as_deref() {
            Some(&[value]) => Ok(value),
            _ => Err(self.type_mismatch("int")),
        }
    }

    /// Return true if this value is an integer or boolean scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self.values.as_deref(), Some([_]))
    }

    /// Return a short description of the kind of value, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match (&self.shape, self.values.as_deref()) {
            (MetaShape::List(_), _) => "tensor list",
            (MetaShape::Tensor(_), Some([_])) => "int",
            (MetaShape::Tensor(_), Some(_)) => "int list",
            (MetaShape::Tensor(_), None) => "tensor",
        }
    }

    fn type_mismatch(&self, expected: &'static str) -> OpError {
        OpError::TypeMismatch {
            expected,
            actual: self.kind_name(),
        }
    }
}

/// Formats shapes in the style `[2, 3]`.
struct DisplayShape<'a>(&'a [i64]);

impl fmt::Display for DisplayShape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for ValueMeta {
    /// Produces strings such as "f32 [1, 16, 256]", "[[2, 3], [4, 3]]" or
    /// "i64 [1] = [5]".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dtype) = self.dtype {
            write!(f, "{} ", dtype)?;
        }
        match &self.shape {
            MetaShape::Tensor(shape) => write!(f, "{}", DisplayShape(shape))?,
            MetaShape::List(shapes) => {
                write!(f, "[")?;
                for (i, shape) in shapes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", DisplayShape(shape))?;
                }
                write!(f, "]")?;
            }
        }
        if let Some(values) = &self.values {
            write!(f, " = {:?}", values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use tests::{int, int_list, tensor, tensor_list};
