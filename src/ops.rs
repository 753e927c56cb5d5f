//! Shape inference rules for TorchScript operators.
//!
//! Each operator, or family of operators that share a shape rule, is a type
//! implementing [`InferShapes`](crate::InferShapes). Static node attributes
//! such as an axis are fields of the type. Values which TorchScript passes as
//! operator inputs, such as the `dim` argument of `aten::transpose`, are read
//! from the input metadata instead.

mod concat;
mod constant;
mod embedding;
mod layout;
mod list;
mod matmul;
mod slice;
mod split;

pub use crate::infer_shapes::{BinaryOp, UnaryOp};
pub use concat::{Cat, FusedConcat};
pub use constant::Constant;
pub use embedding::{EmbeddingBag, EmbeddingBag4BitRowwise, EmbeddingBagByteRowwise};
pub use layout::{Flatten, FusedStack, Permute, Reshape, Stack, Transpose, Transpose2d};
pub use list::{ListConstruct, ListUnpack};
pub use matmul::{Addmm, Bmm, Mm};
pub use slice::Slice;
pub use split::{chunk_sizes, Chunk, ConstantChunk};
