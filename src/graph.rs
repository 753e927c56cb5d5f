//! Host graph representation consumed by the inference engine.
//!
//! A [`Graph`] is a list of operator nodes in producer-before-consumer order,
//! plus the IDs of the graph's declared inputs and outputs. Nodes refer to
//! their inputs and outputs by [`ValueId`]. A node may own a nested sub-graph,
//! which is how fused operators are represented.

use smallvec::SmallVec;

use crate::meta::{DataType, Shape};

mod value_id;

pub use value_id::ValueId;

/// Shape and type of a literal tensor stored in a node attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorLiteral {
    pub shape: Shape,
    pub dtype: DataType,
}

/// Value of a static node attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Attr {
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    Tensor(TensorLiteral),
}

impl Attr {
    /// Return a short description of the attribute type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Attr::Int(_) => "int",
            Attr::Float(_) => "float",
            Attr::Bool(_) => "bool",
            Attr::None => "none",
            Attr::Tensor(_) => "tensor",
        }
    }
}

impl From<i64> for Attr {
    fn from(val: i64) -> Attr {
        Attr::Int(val)
    }
}

impl From<f64> for Attr {
    fn from(val: f64) -> Attr {
        Attr::Float(val)
    }
}

impl From<bool> for Attr {
    fn from(val: bool) -> Attr {
        Attr::Bool(val)
    }
}

impl From<TensorLiteral> for Attr {
    fn from(val: TensorLiteral) -> Attr {
        Attr::Tensor(val)
    }
}

/// Named static attributes of a node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attrs {
    attrs: SmallVec<[(String, Attr); 2]>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an attribute and return the updated set.
    pub fn with(mut self, name: &str, value: impl Into<Attr>) -> Self {
        self.set(name, value);
        self
    }

    /// Add or replace an attribute.
    pub fn set(&mut self, name: &str, value: impl Into<Attr>) {
        let value = value.into();
        if let Some((_, existing)) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            *existing = value;
        } else {
            self.attrs.push((name.to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attr)> {
        self.attrs.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// An operator node in a [`Graph`].
#[derive(Clone, Debug)]
pub struct Node {
    op_type: String,
    name: Option<String>,
    inputs: SmallVec<[ValueId; 4]>,
    outputs: SmallVec<[ValueId; 1]>,
    attrs: Attrs,
    subgraph: Option<Box<Graph>>,
}

impl Node {
    /// Operator identity, such as "aten::add".
    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    /// Debug name of this node.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn input_ids(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn output_ids(&self) -> &[ValueId] {
        &self.outputs
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Return the nested graph of a fused node.
    pub fn subgraph(&self) -> Option<&Graph> {
        self.subgraph.as_deref()
    }

    /// Set the debug name of this node.
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }
}

/// A dataflow graph of operators.
///
/// Nodes are stored in the order they were added, which must be a valid
/// topological order: every node input must be a graph input or an output of
/// an earlier node.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    /// Debug names of values, indexed by `ValueId`.
    value_names: Vec<Option<String>>,
    nodes: Vec<Node>,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Create a new value and return its ID.
    pub fn add_value(&mut self, name: Option<&str>) -> ValueId {
        let id = ValueId::from_u32(self.value_names.len() as u32);
        self.value_names.push(name.map(|s| s.to_string()));
        id
    }

    /// Create a new value and append it to the graph's declared inputs.
    pub fn add_input(&mut self, name: &str) -> ValueId {
        let id = self.add_value(Some(name));
        self.inputs.push(id);
        id
    }

    /// Append a value to the graph's declared outputs.
    pub fn add_output(&mut self, id: ValueId) {
        self.outputs.push(id);
    }

    /// Add an operator node which produces `num_outputs` new values.
    ///
    /// Returns the IDs of the node's outputs.
    pub fn add_op(
        &mut self,
        op_type: &str,
        inputs: &[ValueId],
        attrs: Attrs,
        num_outputs: usize,
    ) -> Vec<ValueId> {
        self.push_node(op_type, inputs, attrs, None, num_outputs)
    }

    /// Add a fused node which wraps `subgraph`.
    ///
    /// Returns the IDs of the node's outputs.
    pub fn add_fused_op(
        &mut self,
        op_type: &str,
        inputs: &[ValueId],
        subgraph: Graph,
        num_outputs: usize,
    ) -> Vec<ValueId> {
        self.push_node(
            op_type,
            inputs,
            Attrs::new(),
            Some(Box::new(subgraph)),
            num_outputs,
        )
    }

    fn push_node(
        &mut self,
        op_type: &str,
        inputs: &[ValueId],
        attrs: Attrs,
        subgraph: Option<Box<Graph>>,
        num_outputs: usize,
    ) -> Vec<ValueId> {
        let outputs: Vec<ValueId> = (0..num_outputs).map(|_| self.add_value(None)).collect();
        self.nodes.push(Node {
            op_type: op_type.to_string(),
            name: None,
            inputs: inputs.into(),
            outputs: outputs.as_slice().into(),
            attrs,
            subgraph,
        });
        outputs
    }

    /// Return the most recently added node, eg. to set its name.
    pub fn last_node_mut(&mut self) -> Option<&mut Node> {
        self.nodes.last_mut()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// Return the number of values in the graph.
    pub fn value_count(&self) -> usize {
        self.value_names.len()
    }

    /// Return the debug name of a value, if it has one.
    pub fn value_name(&self, id: ValueId) -> Option<&str> {
        self.value_names.get(id.as_usize())?.as_deref()
    }
}
