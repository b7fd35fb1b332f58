use crate::store;
use async_trait::async_trait;
use gridcore::{
    ChunkGrid, HandlerDescriptor, HandlerError, InputSchema, NodeResult, ParamKind, ParamSpec,
    Value,
};
use gridruntime::{Invocation, NodeHandler};
use std::collections::HashMap;
use std::path::Path;

/// Loads a stored grid from disk, or synthesizes one for `mock:` paths
///
/// Outputs the grid plus a metadata map describing its source. Disk I/O
/// runs on the worker pool.
pub struct GridReaderNode;

const MOCK_SHAPE: [usize; 3] = [8, 64, 64];
const MOCK_CHUNKS: [usize; 3] = [2, 32, 32];

impl GridReaderNode {
    fn load(path: &str) -> Result<(ChunkGrid, HashMap<String, Value>), HandlerError> {
        if let Some(label) = path.strip_prefix("mock:") {
            tracing::info!(label, "synthesizing mock grid");
            let grid = ChunkGrid::synthetic(MOCK_SHAPE, MOCK_CHUNKS);
            return Ok((grid, Self::metadata(path, MOCK_SHAPE, MOCK_CHUNKS)));
        }

        let dir = Path::new(path);
        let (grid, manifest) = store::load_grid(dir)?;
        let source = dir
            .canonicalize()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.to_string());
        let metadata = Self::metadata(&source, manifest.shape, manifest.chunk_shape);
        tracing::info!(path = %source, shape = ?manifest.shape, "grid loaded");
        Ok((grid, metadata))
    }

    fn metadata(
        source: &str,
        shape: [usize; 3],
        chunk_shape: [usize; 3],
    ) -> HashMap<String, Value> {
        let dims = |s: [usize; 3]| Value::List(s.iter().map(|&d| Value::Int(d as i64)).collect());
        HashMap::from([
            ("source_path".to_string(), Value::Str(source.to_string())),
            ("shape".to_string(), dims(shape)),
            ("chunk_shape".to_string(), dims(chunk_shape)),
            ("dtype".to_string(), Value::Str("f32".to_string())),
        ])
    }
}

#[async_trait]
impl NodeHandler for GridReaderNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("grid.reader")
            .display_name("Grid Reader")
            .category("grid/io")
            .input(InputSchema::new().required(ParamSpec::new("path", ParamKind::Str)))
            .outputs(&["grid", "metadata"])
            .blocking()
    }

    fn invoke_blocking(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let path = call.require_str("path")?;
        let (grid, metadata) = Self::load(path)?;
        Ok(NodeResult::slots(vec![
            Value::from(grid),
            Value::Map(metadata),
        ]))
    }
}
