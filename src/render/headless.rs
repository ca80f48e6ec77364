use std::cell::Cell;

use super::{
    PatchFactory, PatchMesh, ShaderHandle, TerrainMaterials, TerrainPatch, WorldTransform,
};
use crate::error::PatchError;
use crate::world::ChunkImages;

/// Patch backend with no GPU behind it. It records what it is given so tools and tests can
/// drive the streaming manager without a window.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    created: usize,
}

impl HeadlessFactory {
    pub fn new() -> HeadlessFactory {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.created
    }
}

impl PatchFactory for HeadlessFactory {
    type Patch = HeadlessPatch;

    fn create_patch(&mut self, mesh: &PatchMesh) -> Result<HeadlessPatch, PatchError> {
        if mesh.vertices().is_empty() {
            return Err(PatchError::Create("tessellation mesh has no vertices".to_owned()));
        }
        self.created += 1;
        Ok(HeadlessPatch {
            num_vertices: mesh.vertices().len(),
            transform: WorldTransform::identity(),
            size: None,
            height_range: None,
            draws: Cell::new(0),
        })
    }
}

#[derive(Debug)]
pub struct HeadlessPatch {
    num_vertices: usize,
    transform: WorldTransform,
    size: Option<usize>,
    height_range: Option<(f32, f32)>,
    draws: Cell<usize>,
}

impl HeadlessPatch {
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn transform(&self) -> WorldTransform {
        self.transform
    }

    /// Edge length of the uploaded images, if anything was uploaded.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.height_range
    }

    pub fn draw_count(&self) -> usize {
        self.draws.get()
    }
}

impl TerrainPatch for HeadlessPatch {
    fn upload_height_and_normal(&mut self, images: &ChunkImages) -> Result<(), PatchError> {
        let size = images.size();
        if images.heights.len() != size * size || images.normals.len() != size * size * 3 {
            return Err(PatchError::Upload(format!(
                "{}x{} images carry {} heights and {} normal components",
                size,
                size,
                images.heights.len(),
                images.normals.len()
            )));
        }
        self.size = Some(size);
        self.height_range = Some(images.height_range());
        Ok(())
    }

    fn set_world_transform(&mut self, transform: WorldTransform) {
        self.transform = transform;
    }

    fn render(&self, _shader: ShaderHandle, _materials: &TerrainMaterials) {
        self.draws.set(self.draws.get() + 1);
    }
}
