use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::infer_shapes::OpError;
use crate::meta::ValueMeta;

/// Errors that occur when inferring shapes for a graph.
#[derive(Debug)]
pub struct InferError(InferErrorImpl);

impl InferError {
    /// Name hierarchy of the graph nodes that this error relates to.
    ///
    /// In a graph with no fused nodes, this contains one entry with the name
    /// of the failing node, or `None` if the error does not relate to a
    /// particular node or the node has no name.
    ///
    /// When an error occurs in a fused sub-graph, the last entry relates to
    /// the node in the inner-most sub-graph and the previous entries to the
    /// fused nodes in the ancestor graphs.
    pub fn node_path(&self) -> Vec<Option<&str>> {
        self.0.node_path()
    }

    /// Return the general category of error.
    ///
    /// For errors inside fused sub-graphs, this is the category of the
    /// underlying error.
    pub fn kind(&self) -> InferErrorKind {
        self.0.kind()
    }

    pub(crate) fn unsupported_operator(op_type: &str, name: Option<&str>) -> Self {
        InferErrorImpl::UnsupportedOperator {
            op_type: op_type.to_string(),
            name: name.map(|s| s.to_string()),
        }
        .into()
    }

    pub(crate) fn unsupported_input(index: usize, kind: &'static str) -> Self {
        InferErrorImpl::UnsupportedInputType { index, kind }.into()
    }

    pub(crate) fn input_count_mismatch(expected: usize, actual: usize) -> Self {
        InferErrorImpl::InputCountMismatch { expected, actual }.into()
    }

    pub(crate) fn op_error(
        op_type: &str,
        name: Option<&str>,
        error: OpError,
        inputs: &[ValueMeta],
    ) -> Self {
        InferErrorImpl::OperatorError {
            op_type: op_type.to_string(),
            name: name.map(|s| s.to_string()),
            error,
            inputs: inputs.to_vec(),
        }
        .into()
    }

    pub(crate) fn output_mismatch(op_type: &str, name: Option<&str>, error: String) -> Self {
        InferErrorImpl::OutputMismatch {
            op_type: op_type.to_string(),
            name: name.map(|s| s.to_string()),
            error,
        }
        .into()
    }

    pub(crate) fn subgraph_error(op_type: &str, name: Option<&str>, error: Self) -> Self {
        InferErrorImpl::SubgraphError {
            op_type: op_type.to_string(),
            name: name.map(|s| s.to_string()),
            error: Box::new(error),
        }
        .into()
    }
}

impl Display for InferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Error for InferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.0 {
            InferErrorImpl::OperatorError { error, .. } => Some(error),
            InferErrorImpl::SubgraphError { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<InferErrorImpl> for InferError {
    fn from(inner: InferErrorImpl) -> Self {
        Self(inner)
    }
}

/// The category of shape inference error. See [`InferError::kind`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum InferErrorKind {
    /// No shape rule is registered for a node's operator identity.
    UnsupportedOperator,
    /// A run-time input was not a tensor, bool, int or int list.
    UnsupportedInputType,
    /// An operator or graph received or produced the wrong number of values.
    ArityMismatch,
    /// Operator inputs had incompatible shapes.
    ShapeMismatch,
    /// An operator attribute or scalar argument had an invalid value.
    InvalidAttribute,
    /// An operator input was a different kind of value than expected, such
    /// as a tensor where a tensor list was needed.
    TypeMismatch,
}

/// Internal implementation of [`InferError`].
#[derive(Debug)]
pub(crate) enum InferErrorImpl {
    UnsupportedOperator {
        op_type: String,
        name: Option<String>,
    },

    UnsupportedInputType {
        /// Position of the input in the graph's input list.
        index: usize,
        kind: &'static str,
    },

    /// The number of run-time inputs did not match the graph's inputs.
    InputCountMismatch { expected: usize, actual: usize },

    /// The shape rule for an operator failed.
    OperatorError {
        op_type: String,
        name: Option<String>,
        error: OpError,

        /// Metadata of operator inputs.
        inputs: Vec<ValueMeta>,
    },

    /// The outputs of an operator did not match the node (eg. the operator
    /// produced more outputs than the node has).
    OutputMismatch {
        op_type: String,
        name: Option<String>,
        error: String,
    },

    /// An error occurred while inferring shapes for a fused sub-graph.
    SubgraphError {
        /// Identity of the fused node.
        op_type: String,
        name: Option<String>,
        error: Box<InferError>,
    },
}

impl InferErrorImpl {
    fn kind(&self) -> InferErrorKind {
        type Kind = InferErrorKind;

        match self {
            Self::UnsupportedOperator { .. } => Kind::UnsupportedOperator,
            Self::UnsupportedInputType { .. } => Kind::UnsupportedInputType,
            Self::InputCountMismatch { .. } | Self::OutputMismatch { .. } => Kind::ArityMismatch,
            Self::OperatorError { error, .. } => match error {
                OpError::IncorrectInputCount { .. } | OpError::IncorrectOutputCount { .. } => {
                    Kind::ArityMismatch
                }
                OpError::IncompatibleShapes(_) => Kind::ShapeMismatch,
                OpError::InvalidValue(_) => Kind::InvalidAttribute,
                OpError::TypeMismatch { .. } => Kind::TypeMismatch,
            },
            Self::SubgraphError { error, .. } => error.kind(),
        }
    }

    fn node_path(&self) -> Vec<Option<&str>> {
        match self {
            Self::UnsupportedInputType { .. } | Self::InputCountMismatch { .. } => [None].into(),
            Self::UnsupportedOperator { name, .. }
            | Self::OperatorError { name, .. }
            | Self::OutputMismatch { name, .. } => [name.as_deref()].into(),
            Self::SubgraphError { name, error, .. } => {
                let mut path = vec![name.as_deref()];
                path.extend(error.node_path());
                path
            }
        }
    }
}

/// Formats an operator identity and optional node name, eg. `"aten::mm"` or
/// `"aten::mm" (node "fc1")`.
struct DisplayOp<'a> {
    op_type: &'a str,
    name: Option<&'a str>,
}

impl<'a> DisplayOp<'a> {
    fn new(op_type: &'a str, name: &'a Option<String>) -> Self {
        DisplayOp {
            op_type,
            name: name.as_deref(),
        }
    }
}

impl Display for DisplayOp<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.op_type)?;
        if let Some(name) = self.name {
            write!(f, " (node \"{}\")", name)?;
        }
        Ok(())
    }
}

impl Display for InferErrorImpl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedOperator { op_type, name } => {
                write!(
                    f,
                    "unsupported operator {}",
                    DisplayOp::new(op_type, name)
                )
            }
            Self::UnsupportedInputType { index, kind } => {
                write!(f, "input {} has unsupported type {}", index, kind)
            }
            Self::InputCountMismatch { expected, actual } => {
                write!(
                    f,
                    "graph has {} inputs but {} were provided",
                    expected, actual
                )
            }
            Self::OperatorError {
                op_type,
                name,
                error: err,
                inputs,
            } => {
                write!(
                    f,
                    "operator {} failed: {}. Inputs were (",
                    DisplayOp::new(op_type, name),
                    err
                )?;
                for (i, input) in inputs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", input)?;
                }
                write!(f, ")")
            }
            Self::OutputMismatch {
                op_type,
                name,
                error,
            } => {
                write!(
                    f,
                    "operator {} output mismatch: {}",
                    DisplayOp::new(op_type, name),
                    error
                )
            }
            Self::SubgraphError {
                op_type,
                name,
                error,
            } => {
                write!(
                    f,
                    "operator {} subgraph error: {}",
                    DisplayOp::new(op_type, name),
                    error
                )
            }
        }
    }
}
