use std::ops::{Index, IndexMut};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialSlot {
    Dirt = 0,
    Grass = 1,
    Snow = 2,
    Rock = 3,
    Sand = 4,
}

pub const NUM_TERRAIN_MATERIALS: usize = 5;

impl MaterialSlot {
    pub const ALL: [MaterialSlot; NUM_TERRAIN_MATERIALS] = [
        MaterialSlot::Dirt,
        MaterialSlot::Grass,
        MaterialSlot::Snow,
        MaterialSlot::Rock,
        MaterialSlot::Sand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MaterialSlot::Dirt => "dirt",
            MaterialSlot::Grass => "grass",
            MaterialSlot::Snow => "snow",
            MaterialSlot::Rock => "rock",
            MaterialSlot::Sand => "sand",
        }
    }
}

/// A surface texture set as the renderer knows it. Texture fields are renderer-side names or
/// paths; `None` falls back to the flat value next to it.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialSet {
    pub albedo: Option<String>,
    pub albedo_color: (f32, f32, f32),
    pub normal: Option<String>,
    pub roughness: Option<String>,
    pub roughness_value: f32,
    pub ao: Option<String>,
    pub ao_value: f32,
}

impl MaterialSet {
    pub fn flat(albedo_color: (f32, f32, f32)) -> Self {
        Self {
            albedo: None,
            albedo_color,
            normal: None,
            roughness: None,
            roughness_value: 1.0,
            ao: None,
            ao_value: 1.0,
        }
    }
}

/// The five surface materials shared by every chunk. Filled in by the renderer; the terrain core
/// only passes them along at draw time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainMaterials {
    slots: [Option<MaterialSet>; NUM_TERRAIN_MATERIALS],
}

impl TerrainMaterials {
    pub fn len(&self) -> usize {
        NUM_TERRAIN_MATERIALS
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialSlot, Option<&MaterialSet>)> {
        MaterialSlot::ALL
            .iter()
            .map(move |slot| (*slot, self.slots[*slot as usize].as_ref()))
    }
}

impl Index<MaterialSlot> for TerrainMaterials {
    type Output = Option<MaterialSet>;

    fn index(&self, slot: MaterialSlot) -> &Self::Output {
        &self.slots[slot as usize]
    }
}

impl IndexMut<MaterialSlot> for TerrainMaterials {
    fn index_mut(&mut self, slot: MaterialSlot) -> &mut Self::Output {
        &mut self.slots[slot as usize]
    }
}
