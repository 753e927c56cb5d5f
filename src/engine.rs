use std::fmt;
use std::iter::zip;

use crate::env::{env_flag, env_string};
use crate::error::InferError;
use crate::graph::{Graph, Node, ValueId};
use crate::infer_shapes::OpError;
use crate::input::InputValue;
use crate::meta::{ArgList, DataType, MetaShape, Shape, ValueMeta};
use crate::op_registry::{OpContext, OpRegistry};

mod meta_map;


use meta_map::MetaMap;

/// Options that control shape inference.
#[derive(Clone, Debug, PartialEq)]
pub struct InferOptions {
    /// Operator identity prefix of nodes which wrap a fused sub-graph.
    pub fusion_prefix: String,

    /// Whether the offsets passed to embedding bag operators include a final
    /// entry marking the end of the last bag.
    pub has_end_offset: bool,

    /// Log all inferred shapes at `info` level after a successful run.
    pub dump_shapes: bool,
}

impl Default for InferOptions {
    fn default() -> Self {
        InferOptions {
            fusion_prefix: "glow::FusionGroup".to_string(),
            has_end_offset: true,
            dump_shapes: false,
        }
    }
}

impl InferOptions {
    /// Return the default options, overridden by any of these environment
    /// variables that are set:
    ///
    /// - `SHAPEINFER_FUSION_PREFIX` - Operator prefix of fusion nodes
    /// - `SHAPEINFER_END_OFFSET` - Whether embedding bag offsets include an
    ///   end offset
    /// - `SHAPEINFER_DUMP` - Log all inferred shapes
    pub fn from_env() -> Self {
        let mut opts = InferOptions::default();
        if let Some(prefix) = env_string("SHAPEINFER_FUSION_PREFIX") {
            opts.fusion_prefix = prefix;
        }
        opts.has_end_offset = env_flag("SHAPEINFER_END_OFFSET", opts.has_end_offset);
        opts.dump_shapes = env_flag("SHAPEINFER_DUMP", opts.dump_shapes);
        opts
    }
}

/// Infers the shape of every value in a graph, given the graph's inputs.
///
/// An engine performs a single run. Create a new engine to infer shapes for
/// different inputs.
///
/// ```
/// use shapeinfer::{Attrs, DataType, Graph, InferOptions, InputValue, ShapeInferenceEngine};
///
/// let mut graph = Graph::new();
/// let x = graph.add_input("x");
/// let y = graph.add_input("y");
/// let sum = graph.add_op("aten::add", &[x, y], Attrs::new(), 1);
/// graph.add_output(sum[0]);
///
/// let engine = ShapeInferenceEngine::new(&graph, InferOptions::default());
/// let shapes = engine
///     .run(&[
///         InputValue::tensor(&[2, 3], DataType::Float),
///         InputValue::tensor(&[3], DataType::Float),
///     ])
///     .unwrap();
/// assert_eq!(shapes.outputs()[0].shape().unwrap().as_slice(), &[2, 3]);
/// ```
pub struct ShapeInferenceEngine<'a> {
    graph: &'a Graph,
    registry: OpRegistry,
    options: InferOptions,
}

impl<'a> ShapeInferenceEngine<'a> {
    /// Create an engine which uses the shape rules for all built-in
    /// operators.
    pub fn new(graph: &'a Graph, options: InferOptions) -> Self {
        Self::with_registry(graph, OpRegistry::with_all_ops(), options)
    }

    /// Create an engine which uses the shape rules in `registry`.
    pub fn with_registry(graph: &'a Graph, registry: OpRegistry, options: InferOptions) -> Self {
        ShapeInferenceEngine {
            graph,
            registry,
            options,
        }
    }

    /// Infer shapes for all values in the graph.
    ///
    /// `inputs` must contain one entry for each of the graph's inputs, in
    /// order. Inference stops at the first error.
    ///
    /// Panics if the graph is malformed, for example if a node reads a value
    /// that no earlier node produces.
    pub fn run(self, inputs: &[InputValue]) -> Result<InferredShapes<'a>, InferError> {
        let graph = self.graph;
        let input_meta = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| input_meta(index, input))
            .collect::<Result<Vec<_>, _>>()?;

        let values = self.run_graph(graph, &input_meta, 0)?;
        let outputs = graph
            .outputs()
            .iter()
            .map(|&id| resolved(&values, id).clone())
            .collect();

        let shapes = InferredShapes {
            graph,
            values,
            outputs,
        };
        if self.options.dump_shapes {
            log::info!("Inferred shapes:\n{}", shapes);
        }
        Ok(shapes)
    }

    /// Infer shapes for all values in `graph`, given metadata for its
    /// inputs.
    ///
    /// `depth` is the nesting depth of `graph` within fused nodes.
    fn run_graph(
        &self,
        graph: &Graph,
        inputs: &[ValueMeta],
        depth: usize,
    ) -> Result<MetaMap, InferError> {
        if inputs.len() != graph.inputs().len() {
            return Err(InferError::input_count_mismatch(
                graph.inputs().len(),
                inputs.len(),
            ));
        }

        let mut values = MetaMap::with_len(graph.value_count());
        for (&id, meta) in zip(graph.inputs(), inputs) {
            values.insert(id, meta.clone());
        }

        for node in graph.nodes() {
            let node_inputs: ArgList = node
                .input_ids()
                .iter()
                .map(|&id| resolved(&values, id).clone())
                .collect();

            let outputs = if let Some(subgraph) = node.subgraph() {
                self.run_fused_node(node, subgraph, &node_inputs, depth)?
            } else {
                self.run_op(node, &node_inputs)?
            };

            if outputs.len() > node.output_ids().len() {
                return Err(InferError::output_mismatch(
                    node.op_type(),
                    node.name(),
                    format!(
                        "operator produced {} outputs but node has {}",
                        outputs.len(),
                        node.output_ids().len()
                    ),
                ));
            }

            for (&id, meta) in zip(node.output_ids(), outputs) {
                values.insert(id, meta);
            }
        }

        Ok(values)
    }

    /// Infer output metadata for a plain operator node.
    fn run_op(&self, node: &Node, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, InferError> {
        let op_type = node.op_type();
        let Some(shape_fn) = self.registry.get(op_type) else {
            return Err(InferError::unsupported_operator(op_type, node.name()));
        };

        let ctx = OpContext::new(
            op_type,
            node.attrs(),
            node.output_ids().len(),
            self.options.has_end_offset,
        );
        let outputs = shape_fn(inputs, &ctx)
            .map_err(|err| InferError::op_error(op_type, node.name(), err, inputs))?;

        log::debug!(
            "{} ({}) -> ({})",
            op_type,
            DisplayMetas(inputs),
            DisplayMetas(&outputs)
        );

        Ok(outputs)
    }

    /// Infer output metadata for a fused node by running inference on its
    /// sub-graph.
    fn run_fused_node(
        &self,
        node: &Node,
        subgraph: &Graph,
        inputs: &[ValueMeta],
        depth: usize,
    ) -> Result<Vec<ValueMeta>, InferError> {
        let op_type = node.op_type();
        assert!(
            op_type.starts_with(&self.options.fusion_prefix),
            "node \"{}\" has a subgraph but is not a fusion node",
            op_type
        );

        // Sub-graph inputs are values distinct from the fused node's inputs,
        // so they are re-seeded as plain tensors of the same shape and type.
        let subgraph_inputs = inputs
            .iter()
            .map(|meta| {
                let shape = meta.shape()?.clone();
                Ok::<_, OpError>(ValueMeta::tensor(shape, meta.dtype()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| InferError::op_error(op_type, node.name(), err, inputs))?;

        log::debug!(
            "Entering subgraph of {} at depth {} with {} nodes",
            op_type,
            depth + 1,
            subgraph.nodes().len()
        );
        let subgraph_values = self
            .run_graph(subgraph, &subgraph_inputs, depth + 1)
            .map_err(|err| InferError::subgraph_error(op_type, node.name(), err))?;
        log::debug!("Leaving subgraph of {}", op_type);

        if subgraph.outputs().len() != node.output_ids().len() {
            return Err(InferError::output_mismatch(
                op_type,
                node.name(),
                format!(
                    "subgraph has {} outputs but node has {}",
                    subgraph.outputs().len(),
                    node.output_ids().len()
                ),
            ));
        }

        Ok(subgraph
            .outputs()
            .iter()
            .map(|&id| resolved(&subgraph_values, id).clone())
            .collect())
    }
}

/// Return the metadata for a value which must have already been inferred.
fn resolved(values: &MetaMap, id: ValueId) -> &ValueMeta {
    values
        .get(id)
        .unwrap_or_else(|| panic!("value {} was read before it was produced", id))
}

/// Convert a run-time input into metadata for a graph input.
fn input_meta(index: usize, input: &InputValue) -> Result<ValueMeta, InferError> {
    let meta = match input {
        InputValue::Tensor { shape, dtype } => {
            ValueMeta::tensor(Shape::from_slice(shape), Some(*dtype))
        }
        InputValue::Bool(value) => ValueMeta::scalar(*value as i64, DataType::Bool),
        InputValue::Int(value) => ValueMeta::scalar(*value, DataType::Int64),
        InputValue::IntList(values) => ValueMeta::int_list(values.clone()),
        InputValue::Float(_) | InputValue::Str(_) | InputValue::TensorList(_) => {
            return Err(InferError::unsupported_input(index, input.kind_name()));
        }
    };
    Ok(meta)
}

/// Formats a list of metadata as a comma-separated list.
struct DisplayMetas<'a>(&'a [ValueMeta]);

impl fmt::Display for DisplayMetas<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, meta) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", meta)?;
        }
        Ok(())
    }
}

/// Results of shape inference for a graph.
///
/// This is returned by [`ShapeInferenceEngine::run`]. Metadata for values in
/// fused sub-graphs is not included, except where it is copied to the
/// outputs of a fused node.
pub struct InferredShapes<'a> {
    graph: &'a Graph,
    values: MetaMap,
    outputs: Vec<ValueMeta>,
}

impl InferredShapes<'_> {
    /// Return the metadata inferred for a value.
    ///
    /// This returns `None` for outputs which an operator does not describe,
    /// such as the auxiliary outputs of `aten::embedding_bag`.
    pub fn get(&self, id: ValueId) -> Option<&ValueMeta> {
        self.values.get(id)
    }

    /// Return the metadata of the graph's outputs, in order.
    pub fn outputs(&self) -> &[ValueMeta] {
        &self.outputs
    }

    /// Consume the results and return the metadata of the graph's outputs.
    pub fn into_outputs(self) -> Vec<ValueMeta> {
        self.outputs
    }

    /// Return the number of values with inferred metadata.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over values with inferred metadata, in order of value ID.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &ValueMeta)> {
        self.values.iter()
    }
}

/// Formats dims in the style `[2 3]`.
struct DisplayDims<'a>(&'a [i64]);

impl fmt::Display for DisplayDims<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, size) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", size)?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for InferredShapes<'_> {
    /// Write one line per value, such as `x: [2 3]` for a tensor or
    /// `chunks: [[4 6] [2 6]]` for a tensor list. Values without a name are
    /// identified as `%{id}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, meta) in self.values.iter() {
            match self.graph.value_name(id) {
                Some(name) => write!(f, "{}: ", name)?,
                None => write!(f, "%{}: ", id)?,
            }
            match meta.meta_shape() {
                MetaShape::Tensor(shape) => write!(f, "{}", DisplayDims(shape))?,
                MetaShape::List(shapes) => {
                    write!(f, "[")?;
                    for (i, shape) in shapes.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{}", DisplayDims(shape))?;
                    }
                    write!(f, "]")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
