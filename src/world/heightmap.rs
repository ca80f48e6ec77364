use cgmath::Vector2;

use super::functions::{self, FractalNoise, NoiseField};
use super::recipe::{HeightLayer, TerrainRecipe};

/// Anything that can produce an elevation for a position in sample space.
pub trait HeightSource {
    fn height_at(&self, pos: Vector2<f32>) -> f32;
}

impl<F> HeightSource for F
where
    F: Fn(Vector2<f32>) -> f32,
{
    fn height_at(&self, pos: Vector2<f32>) -> f32 {
        self(pos)
    }
}

struct CompiledLayer {
    field: NoiseField,
    amplitude: f32,
    offset: f32,
}

impl CompiledLayer {
    fn new(layer: &HeightLayer) -> Self {
        Self {
            field: NoiseField::new(&layer.noise),
            amplitude: layer.amplitude,
            offset: layer.offset,
        }
    }

    fn get(&self, noise: &FractalNoise, pos: Vector2<f32>) -> f32 {
        self.field.sample(noise, pos) * self.amplitude + self.offset
    }
}

/// Turns a [`TerrainRecipe`] into a height field: three noise layers summed into a base
/// elevation, then reshaped by the linear, hills, sea, mountain and transition transforms in
/// that order. Each transform is continuous where it switches on, so biomes blend without seams.
pub struct HeightSynthesizer {
    recipe: TerrainRecipe,
    noise: FractalNoise,
    layers: [CompiledLayer; 3],
    hills_field: NoiseField,
    mountain_field: NoiseField,
    transition_field: NoiseField,
}

impl HeightSynthesizer {
    pub fn new(recipe: &TerrainRecipe) -> HeightSynthesizer {
        let transforms = &recipe.transforms;
        HeightSynthesizer {
            recipe: *recipe,
            noise: FractalNoise::new(recipe.seed),
            layers: [
                CompiledLayer::new(&recipe.layers.base),
                CompiledLayer::new(&recipe.layers.hills),
                CompiledLayer::new(&recipe.layers.detail),
            ],
            hills_field: NoiseField::new(&transforms.hills.noise),
            mountain_field: NoiseField::new(&transforms.mountains.noise),
            transition_field: NoiseField::new(&transforms.transition.noise),
        }
    }

    pub fn recipe(&self) -> &TerrainRecipe {
        &self.recipe
    }

    pub fn compute_height(&self, p: Vector2<f32>) -> f32 {
        let shift = Vector2::new(self.recipe.shift[0], self.recipe.shift[1]);
        let pos = (p + shift) * self.recipe.frequency;

        let mut height = self.base_elevation(pos);
        height = self.linear(height);
        height = self.hills(pos, height);
        height = self.sea(height);
        height = self.mountains(pos, height);
        height = self.transition(pos, height);

        height * self.recipe.amplitude + self.recipe.offset
    }

    pub fn base_elevation(&self, pos: Vector2<f32>) -> f32 {
        self.layers
            .iter()
            .map(|layer| layer.get(&self.noise, pos))
            .sum()
    }

    pub fn linear(&self, height: f32) -> f32 {
        let linear = &self.recipe.transforms.linear;
        height * linear.scale + linear.offset
    }

    pub fn hills(&self, pos: Vector2<f32>, height: f32) -> f32 {
        let hills = &self.recipe.transforms.hills;
        let factor = hills.amplitude * self.hills_field.sample(&self.noise, pos) + hills.bias;
        // Squash into (0, 1), then center on zero.
        let factor = functions::logistic(hills.smooth_power, factor) - 0.5;
        height + hills.amplitude * factor
    }

    pub fn sea(&self, height: f32) -> f32 {
        let sea = &self.recipe.transforms.sea;
        if height > sea.level {
            return height;
        }
        if height < sea.floor {
            return sea.floor;
        }
        let t = (height - sea.floor) / (sea.level - sea.floor);
        let t = t * functions::smootherstep(t.powf(sea.power));
        sea.floor + t * (sea.level - sea.floor)
    }

    pub fn mountains(&self, pos: Vector2<f32>, height: f32) -> f32 {
        let mountains = &self.recipe.transforms.mountains;
        if height < mountains.base {
            return height;
        }
        let range = mountains.peak - mountains.base;

        // Eases from slope 1 at the base into the scaled peak profile with matching derivatives.
        let t0 = (height - mountains.base) / range;
        let u = 1.0 - t0;
        let u = u * functions::smootherstep(u);
        let a = mountains.scale * (1.0 - u.powf(mountains.power));
        let b = 1.0 - u;
        let v = functions::smootherstep(t0);
        let w = v * a + (1.0 - v) * b;
        let shaped = mountains.base + w * range;

        let factor = self.mountain_field.sample(&self.noise, pos)
            * functions::smootherstep(v.powf(mountains.noise_power));
        shaped + factor * mountains.noise_scale
    }

    pub fn transition(&self, pos: Vector2<f32>, height: f32) -> f32 {
        let transforms = &self.recipe.transforms;
        let (low, high) = (transforms.sea.level, transforms.mountains.base);
        if height >= high || height <= low {
            return height;
        }
        let t = (height - low) / (high - low);
        let factor = self.transition_field.sample(&self.noise, pos);
        // Zero at both edges, with flat derivatives there.
        let mask = functions::smootherstep(1.0 - (2.0 * t - 1.0).abs());
        height + factor * mask * transforms.transition.noise_scale
    }
}

impl HeightSource for HeightSynthesizer {
    fn height_at(&self, pos: Vector2<f32>) -> f32 {
        self.compute_height(pos)
    }
}
