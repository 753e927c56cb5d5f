use rustc_hash::FxHashMap;

use crate::graph::{Attr, Attrs};
use crate::infer_shapes::{InferShapes, OpError};
use crate::meta::ValueMeta;
use crate::ops;

/// Function which infers the output metadata of an operator node.
pub type ShapeFunction =
    dyn Fn(&[ValueMeta], &OpContext) -> Result<Vec<ValueMeta>, OpError> + Send + Sync;

/// Information about the node being inferred, other than its inputs.
pub struct OpContext<'a> {
    op_type: &'a str,
    attrs: &'a Attrs,
    num_outputs: usize,
    has_end_offset: bool,
}

impl<'a> OpContext<'a> {
    pub fn new(
        op_type: &'a str,
        attrs: &'a Attrs,
        num_outputs: usize,
        has_end_offset: bool,
    ) -> Self {
        OpContext {
            op_type,
            attrs,
            num_outputs,
            has_end_offset,
        }
    }

    /// Operator identity of the node, such as "aten::add".
    pub fn op_type(&self) -> &str {
        self.op_type
    }

    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.get(name)
    }

    /// Get an optional integer attribute.
    pub fn get_int(&self, name: &str) -> Result<Option<i64>, OpError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(Attr::Int(value)) => Ok(Some(*value)),
            Some(other) => Err(OpError::InvalidValue(format!(
                "expected attribute \"{}\" to be an int but got {}",
                name,
                other.type_name()
            ))),
        }
    }

    /// Get a required integer attribute.
    pub fn require_int(&self, name: &str) -> Result<i64, OpError> {
        self.get_int(name)?
            .ok_or_else(|| OpError::InvalidValue(format!("missing attribute \"{}\"", name)))
    }

    /// Number of outputs the node has.
    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Whether the offsets passed to embedding bag operators include a final
    /// entry marking the end of the last bag.
    pub fn has_end_offset(&self) -> bool {
        self.has_end_offset
    }
}

/// Trait for constructing an operator's shape rule from a node.
pub trait ReadOp: InferShapes + Sized {
    fn read(ctx: &OpContext) -> Result<Self, OpError>;
}

/// Implement [`ReadOp`] for operators which have no attributes.
macro_rules! impl_read_op {
    ($($op:ident),* $(,)?) => {
        $(
            impl ReadOp for ops::$op {
                fn read(_ctx: &OpContext) -> Result<Self, OpError> {
                    Ok(ops::$op)
                }
            }
        )*
    };
}

impl_read_op!(
    Addmm,
    BinaryOp,
    Bmm,
    Cat,
    Chunk,
    Flatten,
    ListConstruct,
    Mm,
    Permute,
    Reshape,
    Slice,
    Stack,
    Transpose,
    Transpose2d,
    UnaryOp,
);

impl ReadOp for ops::Constant {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        Ok(ops::Constant {
            value: ctx.attr("value").cloned().unwrap_or(Attr::None),
        })
    }
}

impl ReadOp for ops::ConstantChunk {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        let chunks = ctx.require_int("chunks")?;
        let dim = ctx.require_int("dim")?;

        // Each chunk is a separate output of the node.
        if chunks > 0 && chunks as u64 != ctx.num_outputs() as u64 {
            return Err(OpError::IncorrectOutputCount {
                expected: ctx.num_outputs(),
                actual: usize::try_from(chunks).unwrap_or(usize::MAX),
            });
        }

        Ok(ops::ConstantChunk { chunks, dim })
    }
}

impl ReadOp for ops::FusedConcat {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        Ok(ops::FusedConcat {
            dim: ctx.require_int("dim")?,
        })
    }
}

impl ReadOp for ops::FusedStack {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        Ok(ops::FusedStack {
            dim: ctx.require_int("dim")?,
        })
    }
}

impl ReadOp for ops::ListUnpack {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        Ok(ops::ListUnpack {
            num_outputs: ctx.num_outputs(),
        })
    }
}

impl ReadOp for ops::EmbeddingBag {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        Ok(ops::EmbeddingBag {
            has_end_offset: ctx.has_end_offset(),
        })
    }
}

impl ReadOp for ops::EmbeddingBagByteRowwise {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        Ok(ops::EmbeddingBagByteRowwise {
            has_end_offset: ctx.has_end_offset(),
        })
    }
}

impl ReadOp for ops::EmbeddingBag4BitRowwise {
    fn read(ctx: &OpContext) -> Result<Self, OpError> {
        Ok(ops::EmbeddingBag4BitRowwise {
            has_end_offset: ctx.has_end_offset(),
        })
    }
}

/// Map from operator identity to the function which infers its output
/// shapes.
///
/// New registries have no operators registered. To create a registry with
/// all built-in operators, use [`OpRegistry::with_all_ops`]. Additional or
/// replacement rules can be added with [`OpRegistry::register_op`] or
/// [`OpRegistry::register_fn`].
#[derive(Default)]
pub struct OpRegistry {
    ops: FxHashMap<String, Box<ShapeFunction>>,
}

impl OpRegistry {
    /// Create a new empty registry.
    pub fn new() -> OpRegistry {
        OpRegistry {
            ops: FxHashMap::default(),
        }
    }

    /// Register the shape rule implemented by `Op` for operators with identity
    /// `op_type`.
    ///
    /// The same type may be registered under several identities.
    pub fn register_op<Op: ReadOp + 'static>(&mut self, op_type: &str) {
        self.register_fn(op_type, |inputs, ctx| Op::read(ctx)?.infer_shapes(inputs));
    }

    /// Register a function as the shape rule for operators with identity
    /// `op_type`, replacing any existing rule.
    pub fn register_fn<F>(&mut self, op_type: &str, func: F)
    where
        F: Fn(&[ValueMeta], &OpContext) -> Result<Vec<ValueMeta>, OpError> + Send + Sync + 'static,
    {
        self.ops.insert(op_type.to_string(), Box::new(func));
    }

    /// Look up the shape rule for an operator identity.
    pub fn get(&self, op_type: &str) -> Option<&ShapeFunction> {
        self.ops.get(op_type).map(|func| func.as_ref())
    }

    /// Return the number of registered operator identities.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Create a registry with shape rules for all built-in operators.
    pub fn with_all_ops() -> OpRegistry {
        let mut reg = OpRegistry::new();

        macro_rules! register_op {
            ($op:ident, $($op_type:literal),+) => {
                $(reg.register_op::<ops::$op>($op_type);)+
            };
        }

        register_op!(UnaryOp, "aten::tanh", "aten::relu", "aten::sigmoid");
        register_op!(BinaryOp, "aten::add", "aten::sub", "aten::mul", "aten::pow");
        register_op!(Mm, "aten::mm");
        register_op!(Bmm, "aten::bmm");
        register_op!(Addmm, "aten::addmm");
        register_op!(Transpose2d, "aten::t");
        register_op!(Transpose, "aten::transpose");
        register_op!(Flatten, "aten::flatten");
        register_op!(Cat, "aten::cat");
        register_op!(FusedConcat, "prim::FusedConcat");
        register_op!(ConstantChunk, "prim::ConstantChunk");
        register_op!(Chunk, "aten::chunk");
        register_op!(Slice, "aten::slice");
        register_op!(Reshape, "aten::reshape");
        register_op!(Permute, "aten::permute");
        register_op!(ListConstruct, "prim::ListConstruct");
        register_op!(ListUnpack, "prim::ListUnpack");
        register_op!(Stack, "aten::stack");
        register_op!(FusedStack, "glow::fused_stack");
        register_op!(EmbeddingBag, "aten::embedding_bag");
        register_op!(
            EmbeddingBagByteRowwise,
            "fb::embedding_bag_byte_rowwise_offsets",
            "quantized::embedding_bag_byte_rowwise_offsets"
        );
        register_op!(
            EmbeddingBag4BitRowwise,
            "fb::embedding_bag_4bit_rowwise_offsets",
            "quantized::embedding_bag_4bit_rowwise_offsets"
        );
        register_op!(Constant, "prim::Constant");

        reg
    }
}
