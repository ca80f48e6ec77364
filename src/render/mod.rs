use cgmath::{Rad, Vector3};

use crate::error::PatchError;
use crate::util;
use crate::world::ChunkImages;

pub mod headless;
pub mod material;
pub mod mesh;

pub use material::{MaterialSet, MaterialSlot, TerrainMaterials};
pub use mesh::{PatchMesh, PatchVertex};

/// Opaque reference to a compiled shader program owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Placement of a patch's unit mesh in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform {
    pub translation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl WorldTransform {
    pub fn identity() -> WorldTransform {
        WorldTransform {
            translation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// One drawable terrain tile. The GPU resources behind it are released when it is dropped.
pub trait TerrainPatch {
    fn upload_height_and_normal(&mut self, images: &ChunkImages) -> Result<(), PatchError>;
    fn set_world_transform(&mut self, transform: WorldTransform);
    fn render(&self, shader: ShaderHandle, materials: &TerrainMaterials);
}

/// Creates patches sharing one tessellation mesh. Implemented by the renderer backend.
pub trait PatchFactory {
    type Patch: TerrainPatch;

    fn create_patch(&mut self, mesh: &PatchMesh) -> Result<Self::Patch, PatchError>;
}

pub struct Camera {
    pub origin: Vector3<f32>,
    pub heading: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new(origin: Vector3<f32>) -> Camera {
        Camera {
            origin,
            heading: Rad(0.0),
            pitch: Rad(0.0),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        util::compute_triple_euler_vector(self.heading, self.pitch).forward
    }

    /// Moves along the view direction.
    pub fn advance(&mut self, distance: f32) {
        self.origin += self.forward() * distance;
    }
}

/// Anything the streaming window can be centered on.
pub trait CameraPosition {
    fn world_position(&self) -> Vector3<f32>;
}

impl CameraPosition for Camera {
    fn world_position(&self) -> Vector3<f32> {
        self.origin
    }
}

impl CameraPosition for Vector3<f32> {
    fn world_position(&self) -> Vector3<f32> {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_advances_along_heading() {
        let mut camera = Camera::new(Vector3::new(10.0, 5.0, 0.0));
        camera.advance(4.0);
        assert!((camera.origin.x - 14.0).abs() < 1e-5);
        assert!(camera.origin.z.abs() < 1e-5);
        camera.heading = Rad(std::f32::consts::FRAC_PI_2);
        camera.advance(2.0);
        let pos = camera.world_position();
        assert!((pos.x - 14.0).abs() < 1e-5);
        assert!((pos.z - 2.0).abs() < 1e-5);
        assert_eq!(pos.y, 5.0);
    }
}
