//! shapeinfer is a static shape inference engine for TorchScript-style
//! operator graphs.
//!
//! Given a [`Graph`] of operators and a description of its run-time inputs
//! (tensor shapes and data types, plus the values of any scalar or integer
//! list inputs), the engine walks the graph in order and computes the shape
//! of every intermediate and output value, without executing any operators.
//!
//! # Usage
//!
//! 1. Build a [`Graph`], adding inputs with [`Graph::add_input`] and nodes
//!    with [`Graph::add_op`]. Fused operators, which wrap a nested sub-graph,
//!    are added with [`Graph::add_fused_op`].
//! 2. Describe each graph input with an [`InputValue`].
//! 3. Create a [`ShapeInferenceEngine`] and call
//!    [`run`](ShapeInferenceEngine::run). The result maps each value to its
//!    inferred [`ValueMeta`].
//!
//! # Operators
//!
//! The built-in shape rules cover elementwise and matrix multiplication
//! operators, layout operators such as `transpose`, `reshape` and `permute`,
//! concatenation, stacking, chunking and slicing, list construction and
//! unpacking, constants and several embedding bag variants. See
//! [`OpRegistry::with_all_ops`] for the full list of operator identities.
//! Additional rules can be supplied via [`OpRegistry::register_fn`].
//!
//! # Crate features
//!
//! - `serde` - Implements `serde::Serialize` for inferred metadata.
//!
//! # Environment variables
//!
//! [`InferOptions::from_env`] reads the following variables:
//!
//! - `SHAPEINFER_FUSION_PREFIX` - Operator identity prefix of fused nodes.
//! - `SHAPEINFER_END_OFFSET` - Whether embedding bag offsets include a final
//!   end offset (default true).
//! - `SHAPEINFER_DUMP` - Log all inferred shapes at `info` level after each
//!   run.

mod engine;
mod env;
mod error;
mod graph;
mod infer_shapes;
mod input;
mod meta;
mod op_registry;

/// Shape rules for individual operators.
pub mod ops;

pub use engine::{InferOptions, InferredShapes, ShapeInferenceEngine};
pub use error::{InferError, InferErrorKind};
pub use graph::{Attr, Attrs, Graph, Node, TensorLiteral, ValueId};
pub use infer_shapes::{broadcast_shapes, InferShapes, OpError};
pub use input::InputValue;
pub use meta::{ArgList, DataType, MetaShape, Shape, ShapeList, ValueMeta};
pub use op_registry::{OpContext, OpRegistry, ReadOp, ShapeFunction};
