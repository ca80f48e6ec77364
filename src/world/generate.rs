use cgmath::{InnerSpace, Vector2, Vector3};
use half::f16;

use super::{ChunkCoord, ChunkImages, HeightSource};
use crate::util;

/// Samples `source` over every cell of the chunk. Sample positions are in cell units: cell
/// `(i, j)` of chunk `(x, y)` sits at `(x * size + i, y * size + j)`.
pub fn generate_raw_heights(source: &impl HeightSource, coord: ChunkCoord, size: usize) -> Vec<f32> {
    let origin = (coord.x as i64 * size as i64, coord.y as i64 * size as i64);
    util::coord_iter_2d(size)
        .map(|(i, j)| {
            let pos = Vector2::new((origin.0 + i as i64) as f32, (origin.1 + j as i64) as f32);
            source.height_at(pos)
        })
        .collect()
}

/// 3x3 binomial blur (1-2-1 / 2-4-2 / 1-2-1, over 16). Fetches past the edge reuse the nearest
/// edge cell.
pub fn blur(heights: &[f32], size: usize) -> Vec<f32> {
    let fetch = |x: isize, y: isize| util::fetch_clamped(heights, size, x, y);
    util::coord_iter_2d(size)
        .map(|(i, j)| {
            let (i, j) = (i as isize, j as isize);
            let corners = fetch(i - 1, j - 1)
                + fetch(i + 1, j - 1)
                + fetch(i - 1, j + 1)
                + fetch(i + 1, j + 1);
            let sides = fetch(i, j - 1) + fetch(i - 1, j) + fetch(i + 1, j) + fetch(i, j + 1);
            (corners + sides * 2.0 + fetch(i, j) * 4.0) / 16.0
        })
        .collect()
}

/// Normal of every cell from central differences, with the same edge clamping as [`blur`].
pub fn compute_normals(heights: &[f32], size: usize) -> Vec<Vector3<f32>> {
    let fetch = |x: isize, y: isize| util::fetch_clamped(heights, size, x, y);
    util::coord_iter_2d(size)
        .map(|(i, j)| {
            let (i, j) = (i as isize, j as isize);
            let grad_x = (fetch(i + 1, j) - fetch(i - 1, j)) / 2.0;
            let grad_z = (fetch(i, j + 1) - fetch(i, j - 1)) / 2.0;
            Vector3::new(-grad_x, 1.0, -grad_z).normalize()
        })
        .collect()
}

/// Builds the heightmap and normal map for one chunk. The heightmap keeps the raw samples; the
/// normals come from a blurred copy so they don't pick up single-cell noise.
pub fn build_chunk_images(source: &impl HeightSource, coord: ChunkCoord, size: usize) -> ChunkImages {
    let raw = generate_raw_heights(source, coord, size);
    let blurred = blur(&raw, size);
    let normals = compute_normals(&blurred, size);

    let mut images = ChunkImages::new(size);
    for (target, height) in images.heights.iter_mut().zip(raw.iter()) {
        *target = f16::from_f32(*height);
    }
    for (target, normal) in images.normals.chunks_exact_mut(3).zip(normals.iter()) {
        target[0] = f16::from_f32(normal.x);
        target[1] = f16::from_f32(normal.y);
        target[2] = f16::from_f32(normal.z);
    }
    images
}
