use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("data length {got} does not match shape {shape:?} ({expected} elements)")]
pub struct ShapeMismatch {
    pub shape: [usize; 3],
    pub expected: usize,
    pub got: usize,
}

/// Dense f32 volume addressed in (z, y, x) order and processed chunk-wise
///
/// This is the opaque array handle that flows between nodes. It is owned
/// data; cheap sharing happens through `Arc<ChunkGrid>` (see `Value::Grid`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkGrid {
    shape: [usize; 3],
    chunk_shape: [usize; 3],
    data: Vec<f32>,
}

impl ChunkGrid {
    pub fn zeros(shape: [usize; 3], chunk_shape: [usize; 3]) -> Self {
        let chunk_shape = clamp_chunk_shape(shape, chunk_shape);
        Self {
            shape,
            chunk_shape,
            data: vec![0.0; shape[0] * shape[1] * shape[2]],
        }
    }

    pub fn from_data(
        shape: [usize; 3],
        chunk_shape: [usize; 3],
        data: Vec<f32>,
    ) -> Result<Self, ShapeMismatch> {
        let expected = shape[0] * shape[1] * shape[2];
        if data.len() != expected {
            return Err(ShapeMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            shape,
            chunk_shape: clamp_chunk_shape(shape, chunk_shape),
            data,
        })
    }

    /// Deterministic test pattern in the 0..255 range
    pub fn synthetic(shape: [usize; 3], chunk_shape: [usize; 3]) -> Self {
        let mut grid = Self::zeros(shape, chunk_shape);
        let [_, ny, nx] = shape;
        for (i, v) in grid.data.iter_mut().enumerate() {
            let x = i % nx;
            let y = (i / nx) % ny;
            let z = i / (nx * ny);
            *v = ((x * 7 + y * 13 + z * 31) % 256) as f32;
        }
        grid
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn chunk_shape(&self) -> [usize; 3] {
        self.chunk_shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn get(&self, z: usize, y: usize, x: usize) -> f32 {
        self.data[self.index(z, y, x)]
    }

    pub fn set(&mut self, z: usize, y: usize, x: usize, value: f32) {
        let idx = self.index(z, y, x);
        self.data[idx] = value;
    }

    fn index(&self, z: usize, y: usize, x: usize) -> usize {
        debug_assert!(z < self.shape[0] && y < self.shape[1] && x < self.shape[2]);
        (z * self.shape[1] + y) * self.shape[2] + x
    }

    fn chunks_per_axis(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for axis in 0..3 {
            counts[axis] = self.shape[axis].div_ceil(self.chunk_shape[axis]);
        }
        counts
    }

    pub fn chunk_count(&self) -> usize {
        let [cz, cy, cx] = self.chunks_per_axis();
        cz * cy * cx
    }

    /// Axis ranges covered by chunk `index`; edge chunks may be partial
    pub fn chunk_bounds(&self, index: usize) -> Option<[Range<usize>; 3]> {
        let [cz, cy, cx] = self.chunks_per_axis();
        if index >= cz * cy * cx {
            return None;
        }
        let ix = index % cx;
        let iy = (index / cx) % cy;
        let iz = index / (cx * cy);
        let bound = |i: usize, axis: usize| -> Range<usize> {
            let start = i * self.chunk_shape[axis];
            start..(start + self.chunk_shape[axis]).min(self.shape[axis])
        };
        Some([bound(iz, 0), bound(iy, 1), bound(ix, 2)])
    }

    /// Copy out chunk `index` as a contiguous buffer in (z, y, x) order
    pub fn read_chunk(&self, index: usize) -> Option<Vec<f32>> {
        let [zs, ys, xs] = self.chunk_bounds(index)?;
        let mut out = Vec::with_capacity(zs.len() * ys.len() * xs.len());
        for z in zs {
            for y in ys.clone() {
                let row = self.index(z, y, xs.start);
                out.extend_from_slice(&self.data[row..row + xs.len()]);
            }
        }
        Some(out)
    }

    /// Write a contiguous buffer back into chunk `index`
    pub fn write_chunk(&mut self, index: usize, chunk: &[f32]) -> Result<(), ShapeMismatch> {
        let [zs, ys, xs] = self.chunk_bounds(index).ok_or(ShapeMismatch {
            shape: self.shape,
            expected: 0,
            got: chunk.len(),
        })?;
        let expected = zs.len() * ys.len() * xs.len();
        if chunk.len() != expected {
            return Err(ShapeMismatch {
                shape: [zs.len(), ys.len(), xs.len()],
                expected,
                got: chunk.len(),
            });
        }
        let mut src = 0;
        for z in zs {
            for y in ys.clone() {
                let row = self.index(z, y, xs.start);
                self.data[row..row + xs.len()].copy_from_slice(&chunk[src..src + xs.len()]);
                src += xs.len();
            }
        }
        Ok(())
    }
}

fn clamp_chunk_shape(shape: [usize; 3], chunk_shape: [usize; 3]) -> [usize; 3] {
    let mut clamped = [0; 3];
    for axis in 0..3 {
        clamped[axis] = chunk_shape[axis].max(1).min(shape[axis].max(1));
    }
    clamped
}
