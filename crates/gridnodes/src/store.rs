//! On-disk layout shared by the reader and writer nodes
//!
//! A stored grid is a directory holding `manifest.json` plus one binary
//! file per chunk (little-endian f32, optionally zstd-compressed).

use gridcore::{ChunkGrid, HandlerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub(crate) const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Manifest {
    pub shape: [usize; 3],
    pub chunk_shape: [usize; 3],
    pub chunk_count: usize,
    pub dtype: String,
    pub compression: String,
    pub source_path: String,
    pub created_at: String,
}

fn chunk_file(dir: &Path, index: usize) -> std::path::PathBuf {
    dir.join(format!("chunk_{index:05}.bin"))
}

fn to_bytes(chunk: &[f32]) -> Vec<u8> {
    chunk.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn from_bytes(bytes: &[u8]) -> Result<Vec<f32>, HandlerError> {
    if bytes.len() % 4 != 0 {
        return Err(HandlerError::ExecutionFailed(
            "chunk file length is not a multiple of 4".to_string(),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

pub(crate) fn write_grid(
    dir: &Path,
    grid: &ChunkGrid,
    compression: &str,
    source_path: &str,
    mut on_chunk: impl FnMut(usize, usize),
) -> Result<(), HandlerError> {
    fs::create_dir_all(dir)?;

    let chunk_count = grid.chunk_count();
    for index in 0..chunk_count {
        let chunk = grid.read_chunk(index).ok_or_else(|| {
            HandlerError::ExecutionFailed(format!("chunk {index} out of bounds"))
        })?;
        let mut bytes = to_bytes(&chunk);
        if compression == "zstd" {
            bytes = zstd::encode_all(&bytes[..], 3)
                .map_err(|e| HandlerError::Io(e.to_string()))?;
        }
        fs::write(chunk_file(dir, index), bytes)?;
        on_chunk(index + 1, chunk_count);
    }

    let manifest = Manifest {
        shape: grid.shape(),
        chunk_shape: grid.chunk_shape(),
        chunk_count,
        dtype: "f32".to_string(),
        compression: compression.to_string(),
        source_path: source_path.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    let body = serde_json::to_string_pretty(&manifest)
        .map_err(|e| HandlerError::ExecutionFailed(e.to_string()))?;
    fs::write(dir.join(MANIFEST_FILE), body)?;
    Ok(())
}

pub(crate) fn load_grid(dir: &Path) -> Result<(ChunkGrid, Manifest), HandlerError> {
    let body = fs::read_to_string(dir.join(MANIFEST_FILE))?;
    let manifest: Manifest = serde_json::from_str(&body)
        .map_err(|e| HandlerError::ExecutionFailed(format!("bad manifest: {e}")))?;

    let mut grid = ChunkGrid::zeros(manifest.shape, manifest.chunk_shape);
    for index in 0..manifest.chunk_count {
        let mut bytes = fs::read(chunk_file(dir, index))?;
        if manifest.compression == "zstd" {
            bytes = zstd::decode_all(&bytes[..]).map_err(|e| HandlerError::Io(e.to_string()))?;
        }
        let chunk = from_bytes(&bytes)?;
        grid.write_chunk(index, &chunk)
            .map_err(|e| HandlerError::ExecutionFailed(e.to_string()))?;
    }
    Ok((grid, manifest))
}
