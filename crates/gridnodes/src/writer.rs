use crate::store;
use async_trait::async_trait;
use gridcore::{
    HandlerDescriptor, HandlerError, InputSchema, NodeResult, ParamKind, ParamSpec, Value,
};
use gridruntime::{Invocation, NodeHandler};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Stores a grid to disk as chunk files plus a manifest
///
/// Terminal node. An empty `output_path` derives the destination from the
/// metadata's source path, landing next to the source's parent directory.
pub struct GridWriterNode;

impl GridWriterNode {
    fn derive_output_path(metadata: &HashMap<String, Value>) -> PathBuf {
        let source = metadata
            .get("source_path")
            .and_then(Value::as_str)
            .unwrap_or("");
        if source.is_empty() || source.starts_with("mock:") {
            return PathBuf::from("output_processed.grid");
        }

        let source = Path::new(source);
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let parent = source
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        parent.join(format!("{stem}_processed.grid"))
    }
}

#[async_trait]
impl NodeHandler for GridWriterNode {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor::new("grid.writer")
            .display_name("Grid Writer")
            .category("grid/io")
            .input(
                InputSchema::new()
                    .required(ParamSpec::new("grid", ParamKind::Grid))
                    .required(ParamSpec::new("metadata", ParamKind::Map))
                    .required(ParamSpec::new(
                        "compression",
                        ParamKind::Choice(vec!["none".to_string(), "zstd".to_string()]),
                    ))
                    .optional(ParamSpec::new("output_path", ParamKind::Str).with_default("")),
            )
            .outputs(&["saved_path"])
            .terminal()
            .blocking()
            .with_progress()
    }

    fn invoke_blocking(&self, call: Invocation) -> Result<NodeResult, HandlerError> {
        let grid = call.require_grid("grid")?;
        let metadata = call.require_map("metadata")?;
        let compression = call.require_str("compression")?;

        let requested = call
            .get("output_path")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        let dir = if requested.is_empty() {
            Self::derive_output_path(metadata)
        } else {
            PathBuf::from(requested)
        };

        let source = metadata
            .get("source_path")
            .and_then(Value::as_str)
            .unwrap_or("");
        store::write_grid(&dir, &grid, compression, source, |done, total| {
            call.progress(done as u64, total as u64, "writing chunks");
        })?;

        let saved = dir
            .canonicalize()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| dir.display().to_string());
        tracing::info!(path = %saved, compression, "grid written");
        Ok(NodeResult::slots(vec![Value::Str(saved)]))
    }
}
