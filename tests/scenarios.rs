//! End-to-end shape inference over small graphs, using only the public API.

use shapeinfer::ops::chunk_sizes;
use shapeinfer::{
    Attrs, DataType, Graph, InferErrorKind, InferOptions, InputValue, ShapeInferenceEngine,
    ValueMeta,
};

fn float_tensor(shape: &[i64]) -> ValueMeta {
    ValueMeta::tensor(shape, Some(DataType::Float))
}

#[test]
fn test_broadcast_add() {
    let mut g = Graph::new();
    let a = g.add_input("a");
    let b = g.add_input("b");
    let sum = g.add_op("aten::add", &[a, b], Attrs::new(), 1);
    g.add_output(sum[0]);

    let shapes = ShapeInferenceEngine::new(&g, InferOptions::default())
        .run(&[
            InputValue::tensor(&[2, 3], DataType::Float),
            InputValue::tensor(&[3], DataType::Float),
        ])
        .unwrap();

    assert_eq!(shapes.outputs(), [float_tensor(&[2, 3])]);
}

#[test]
fn test_byte_rowwise_embedding_bag() {
    let mut g = Graph::new();
    let weight = g.add_input("weight");
    let indices = g.add_input("indices");
    let offsets = g.add_input("offsets");
    let rest: Vec<_> = (0..5).map(|i| g.add_input(&format!("arg{}", i))).collect();

    let mut inputs = vec![weight, indices, offsets];
    inputs.extend(rest);
    let outputs = g.add_op(
        "fb::embedding_bag_byte_rowwise_offsets",
        &inputs,
        Attrs::new(),
        1,
    );
    g.add_output(outputs[0]);

    let shapes = ShapeInferenceEngine::new(&g, InferOptions::default())
        .run(&[
            InputValue::tensor(&[5, 12], DataType::UInt8),
            InputValue::tensor(&[6], DataType::Int64),
            InputValue::tensor(&[4], DataType::Int64),
            false.into(),
            0i64.into(),
            false.into(),
            InputValue::tensor(&[6], DataType::Float),
            true.into(),
        ])
        .unwrap();

    // Rows of 12 bytes hold 4 values plus an 8 byte scale and zero point.
    // The 4 offsets include the end offset, so describe 3 bags.
    assert_eq!(shapes.outputs(), [float_tensor(&[3, 4])]);
}

#[test]
fn test_chunk() {
    assert_eq!(chunk_sizes(10, 3).unwrap(), [4, 4, 2]);

    let mut g = Graph::new();
    let x = g.add_input("x");
    let chunks = g.add_input("chunks");
    let dim = g.add_input("dim");

    let list = g.add_op("aten::chunk", &[x, chunks, dim], Attrs::new(), 1);
    g.add_output(list[0]);

    let parts = g.add_op(
        "prim::ConstantChunk",
        &[x],
        Attrs::new().with("chunks", 3i64).with("dim", 0i64),
        3,
    );
    for part in parts {
        g.add_output(part);
    }

    let shapes = ShapeInferenceEngine::new(&g, InferOptions::default())
        .run(&[
            InputValue::tensor(&[10, 2], DataType::Float),
            3i64.into(),
            0i64.into(),
        ])
        .unwrap();

    let expected_shapes: [[i64; 2]; 3] = [[4, 2], [4, 2], [2, 2]];
    let list_shapes = shapes.outputs()[0].shape_list().unwrap();
    for (shape, expected) in list_shapes.iter().zip(expected_shapes) {
        assert_eq!(shape.as_slice(), expected);
    }
    for (meta, expected) in shapes.outputs()[1..].iter().zip(expected_shapes) {
        assert_eq!(meta, &float_tensor(&expected));
    }
}

#[test]
fn test_unsupported_operator() {
    let mut g = Graph::new();
    let x = g.add_input("x");
    let out = g.add_op("aten::conv2d", &[x], Attrs::new(), 1);
    g.add_output(out[0]);

    let err = ShapeInferenceEngine::new(&g, InferOptions::default())
        .run(&[InputValue::tensor(&[1, 3, 8, 8], DataType::Float)])
        .err()
        .unwrap();

    assert_eq!(err.kind(), InferErrorKind::UnsupportedOperator);
    assert!(err.to_string().contains("\"aten::conv2d\""));
}

#[test]
fn test_fused_subgraph() {
    let mut body = Graph::new();
    let lhs = body.add_input("lhs");
    let rhs = body.add_input("rhs");
    let product = body.add_op("aten::mm", &[lhs, rhs], Attrs::new(), 1);
    let activated = body.add_op("aten::relu", &product, Attrs::new(), 1);
    body.add_output(activated[0]);

    let mut g = Graph::new();
    let x = g.add_input("x");
    let w = g.add_input("w");
    let fused = g.add_fused_op("glow::FusionGroup", &[x, w], body, 1);
    let transposed = g.add_op("aten::t", &fused, Attrs::new(), 1);
    g.add_output(transposed[0]);

    let shapes = ShapeInferenceEngine::new(&g, InferOptions::default())
        .run(&[
            InputValue::tensor(&[8, 16], DataType::Float),
            InputValue::tensor(&[16, 4], DataType::Float),
        ])
        .unwrap();

    assert_eq!(shapes.get(fused[0]), Some(&float_tensor(&[8, 4])));
    assert_eq!(shapes.outputs(), [float_tensor(&[4, 8])]);
}

#[cfg(feature = "serde")]
#[test]
fn test_serialize_metadata() {
    use serde_json::json;

    let meta = ValueMeta::int_list(vec![4, -1]);
    assert_eq!(
        serde_json::to_value(&meta).unwrap(),
        json!({
            "shape": { "Tensor": [2, 1] },
            "values": [4, -1],
            "dtype": "Int64"
        })
    );
}
