use std::fmt;

use cgmath::Vector3;
use half::f16;
use serde::{Deserialize, Serialize};

/// How a world position is turned into the coordinate of the chunk containing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChunkRounding {
    /// Floor division. Every chunk covers exactly one chunk width of the world.
    Floor,
    /// Truncation towards zero. Chunk 0 covers twice the width of every other chunk.
    Truncate,
}

impl Default for ChunkRounding {
    fn default() -> Self {
        ChunkRounding::Floor
    }
}

/// Position of a chunk on the infinite terrain grid. `y` runs along the world's Z axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> ChunkCoord {
        ChunkCoord { x, y }
    }

    pub fn from_world(
        position: Vector3<f32>,
        chunk_world_size: f32,
        rounding: ChunkRounding,
    ) -> ChunkCoord {
        let round = |value: f32| {
            let scaled = value / chunk_world_size;
            match rounding {
                ChunkRounding::Floor => scaled.floor() as i32,
                ChunkRounding::Truncate => scaled.trunc() as i32,
            }
        };
        ChunkCoord::new(round(position.x), round(position.z))
    }

    /// Chebyshev distance, i.e. how many rings away from `other` this chunk is.
    pub fn ring_distance(&self, other: &ChunkCoord) -> u32 {
        let dx = (self.x - other.x).abs() as u32;
        let dy = (self.y - other.y).abs() as u32;
        dx.max(dy)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// CPU-side terrain data for one chunk: a square heightmap and a parallel normal map with three
/// components per cell, both row-major and half precision.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkImages {
    size: usize,
    pub heights: Vec<f16>,
    pub normals: Vec<f16>,
}

impl ChunkImages {
    pub fn new(size: usize) -> ChunkImages {
        ChunkImages {
            size,
            heights: vec![f16::from_f32(0.0); size * size],
            normals: vec![f16::from_f32(0.0); size * size * 3],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn height(&self, x: usize, y: usize) -> f32 {
        self.heights[y * self.size + x].to_f32()
    }

    pub fn normal(&self, x: usize, y: usize) -> Vector3<f32> {
        let offset = (y * self.size + x) * 3;
        Vector3::new(
            self.normals[offset].to_f32(),
            self.normals[offset + 1].to_f32(),
            self.normals[offset + 2].to_f32(),
        )
    }

    /// Lowest and highest elevation in the heightmap.
    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .map(|height| height.to_f32())
            .fold((std::f32::INFINITY, std::f32::NEG_INFINITY), |(lo, hi), h| {
                (lo.min(h), hi.max(h))
            })
    }

    /// Byte length of the heightmap followed by the normal map.
    pub fn byte_len(size: usize) -> usize {
        size * size * 4 * std::mem::size_of::<f16>()
    }
}
