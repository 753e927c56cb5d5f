use crate::infer_shapes::{check_input_count, resolve_axis, InferShapes, OpError};
use crate::meta::{Shape, ValueMeta};

/// Return the sizes of `chunks` pieces that a dim of size `size` is split
/// into.
///
/// Each piece has size `ceil(size / chunks)` except the last, which holds
/// whatever remains. Splits which would leave the last piece empty are
/// rejected, so the sizes always sum to `size`.
pub fn chunk_sizes(size: i64, chunks: i64) -> Result<Vec<i64>, OpError> {
    if chunks <= 0 {
        return Err(OpError::InvalidValue(format!(
            "chunk count must be positive but got {}",
            chunks
        )));
    }
    if size < 0 {
        return Err(OpError::InvalidValue(format!(
            "cannot split a dim with negative size {}",
            size
        )));
    }
    let too_many_chunks = || {
        OpError::InvalidValue(format!(
            "cannot split a dim of size {} into {} non-empty chunks",
            size, chunks
        ))
    };
    if size == 0 {
        return if chunks == 1 {
            Ok(vec![0])
        } else {
            Err(too_many_chunks())
        };
    }
    if chunks > size {
        return Err(too_many_chunks());
    }

    let chunk_size = (size - 1) / chunks + 1;
    let leading_len = chunk_size
        .checked_mul(chunks - 1)
        .filter(|&len| len < size)
        .ok_or_else(too_many_chunks)?;

    let mut sizes = vec![chunk_size; chunks as usize - 1];
    sizes.push(size - leading_len);
    Ok(sizes)
}

/// Return the shapes produced by splitting `shape` into `chunks` along `dim`.
fn chunk_shapes(shape: &Shape, chunks: i64, dim: i64) -> Result<Vec<Shape>, OpError> {
    let axis = resolve_axis(shape.len(), dim)?;
    let shapes = chunk_sizes(shape[axis], chunks)?
        .into_iter()
        .map(|size| {
            let mut chunk_shape = shape.clone();
            chunk_shape[axis] = size;
            chunk_shape
        })
        .collect();
    Ok(shapes)
}

/// Split a tensor into a fixed number of chunks, with one output per chunk
/// (`prim::ConstantChunk`).
pub struct ConstantChunk {
    pub chunks: i64,
    pub dim: i64,
}

impl InferShapes for ConstantChunk {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 1)?;
        let input = &inputs[0];
        let shapes = chunk_shapes(input.shape()?, self.chunks, self.dim)?;
        Ok(shapes
            .into_iter()
            .map(|shape| ValueMeta::tensor(shape, input.dtype()))
            .collect())
    }
}

/// Split a tensor into chunks, producing a single tensor list
/// (`aten::chunk`).
///
/// Inputs are `(self, chunks, dim)`.
pub struct Chunk;

impl InferShapes for Chunk {
    fn infer_shapes(&self, inputs: &[ValueMeta]) -> Result<Vec<ValueMeta>, OpError> {
        check_input_count(inputs, 3)?;
        let input = &inputs[0];
        let chunks = inputs[1].scalar_value()?;
        let dim = inputs[2].scalar_value()?;
        let shapes = chunk_shapes(input.shape()?, chunks, dim)?;
        Ok([ValueMeta::tensor_list(shapes, input.dtype())].into())
    }
}
