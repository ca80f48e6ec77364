use cgmath::{Vector2, Vector3};

/// Control points per tessellation patch.
pub const NUM_PATCH_PTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchVertex {
    pub position: Vector3<f32>,
    pub tex_coords: Vector2<f32>,
}

/// The flat grid of tessellation patches every chunk is drawn with. Heights are applied on the
/// GPU from the chunk's heightmap, so one mesh serves every chunk.
#[derive(Clone, Debug)]
pub struct PatchMesh {
    vertices: Vec<PatchVertex>,
    resolution: u32,
}

impl PatchMesh {
    /// `resolution × resolution` patches covering `width × height`, centered on the origin in the
    /// XZ plane. Each patch lists its corners in the order (i, j), (i+1, j), (i, j+1), (i+1, j+1).
    pub fn tessellation_grid(width: f32, height: f32, resolution: u32) -> PatchMesh {
        let res = resolution as f32;
        let corner = |i: u32, j: u32| PatchVertex {
            position: Vector3::new(
                -width / 2.0 + width * i as f32 / res,
                0.0,
                -height / 2.0 + height * j as f32 / res,
            ),
            tex_coords: Vector2::new(i as f32 / res, j as f32 / res),
        };
        let mut vertices = Vec::with_capacity((resolution * resolution) as usize * NUM_PATCH_PTS);
        for i in 0..resolution {
            for j in 0..resolution {
                vertices.push(corner(i, j));
                vertices.push(corner(i + 1, j));
                vertices.push(corner(i, j + 1));
                vertices.push(corner(i + 1, j + 1));
            }
        }
        PatchMesh {
            vertices,
            resolution,
        }
    }

    pub fn vertices(&self) -> &[PatchVertex] {
        &self.vertices
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn num_patches(&self) -> usize {
        self.vertices.len() / NUM_PATCH_PTS
    }
}
