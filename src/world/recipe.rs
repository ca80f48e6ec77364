//! The terrain "recipe": every constant that shapes the generated height field. The defaults
//! produce plains at sea level rising into mountain ranges around 100 to 230 units high.

use serde::{Deserialize, Serialize};

/// Parameters for one fractal noise lookup.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Multiplier applied to the (offset) position before the lookup.
    pub frequency: f32,
    pub octaves: u32,
    /// Amplitude ratio between consecutive octaves.
    pub persistence: f32,
    /// Added to the position before scaling. Moves features around without changing them.
    pub offset: [f32; 2],
    /// Rotation of the sampling plane, applied after scaling.
    pub rotation_degrees: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            frequency: 1.0 / 64.0,
            octaves: 4,
            persistence: 0.25,
            offset: [0.0, 0.0],
            rotation_degrees: 0.0,
        }
    }
}

/// A noise layer that contributes `noise * amplitude + offset` to the base elevation.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeightLayer {
    pub noise: NoiseParams,
    pub amplitude: f32,
    pub offset: f32,
}

impl Default for HeightLayer {
    fn default() -> Self {
        Self {
            noise: NoiseParams::default(),
            amplitude: 0.0,
            offset: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Layers {
    /// Continent-sized shapes.
    pub base: HeightLayer,
    pub hills: HeightLayer,
    pub detail: HeightLayer,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            base: HeightLayer {
                noise: NoiseParams {
                    frequency: 1.0 / 512.0,
                    octaves: 8,
                    persistence: 1.0 / 4.0,
                    offset: [0.0, 0.0],
                    rotation_degrees: 0.0,
                },
                amplitude: 112.0,
                offset: 64.0,
            },
            hills: HeightLayer {
                noise: NoiseParams {
                    frequency: 1.0 / 128.0,
                    octaves: 4,
                    persistence: 1.0 / 4.0,
                    offset: [447.7, 104.43],
                    rotation_degrees: 13.77,
                },
                amplitude: 24.0,
                offset: 8.0,
            },
            detail: HeightLayer {
                noise: NoiseParams {
                    frequency: 1.0 / 32.0,
                    octaves: 4,
                    persistence: 1.0 / 4.0,
                    offset: [-22.0, 204.1],
                    rotation_degrees: 174.3,
                },
                amplitude: 2.0,
                offset: -16.0,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LinearTransform {
    pub scale: f32,
    pub offset: f32,
}

impl Default for LinearTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 8.0,
        }
    }
}

/// Rolling undulation added on top of the base elevation.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HillsTransform {
    pub amplitude: f32,
    pub bias: f32,
    /// Steepness of the logistic curve; lower is smoother.
    pub smooth_power: f32,
    pub noise: NoiseParams,
}

impl Default for HillsTransform {
    fn default() -> Self {
        Self {
            amplitude: 4.0,
            bias: 0.0,
            smooth_power: 0.25,
            noise: NoiseParams {
                frequency: 1.0 / 64.0,
                octaves: 8,
                persistence: 1.0 / 2.0,
                offset: [89.75, -153.1],
                rotation_degrees: 97.2,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SeaTransform {
    pub level: f32,
    /// Nothing is generated below this.
    pub floor: f32,
    /// Shapes the blend between floor and level.
    pub power: f32,
}

impl Default for SeaTransform {
    fn default() -> Self {
        Self {
            level: 0.0,
            floor: -64.0,
            power: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MountainTransform {
    /// Elevation where mountains start.
    pub base: f32,
    pub peak: f32,
    pub scale: f32,
    pub power: f32,
    /// Concentrates the rock noise towards the peaks.
    pub noise_power: f32,
    pub noise_scale: f32,
    pub noise: NoiseParams,
}

impl Default for MountainTransform {
    fn default() -> Self {
        Self {
            base: 96.0,
            peak: 224.0,
            scale: 2.0,
            power: 2.5,
            noise_power: 2.0,
            noise_scale: 2.0,
            noise: NoiseParams {
                frequency: 1.0 / 96.0,
                octaves: 8,
                persistence: 1.0 / 3.0,
                offset: [-2.0, 33.7],
                rotation_degrees: 74.2,
            },
        }
    }
}

/// Noise applied between sea level and the mountain base. Disabled by default (zero scale).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransitionTransform {
    pub noise_scale: f32,
    pub noise: NoiseParams,
}

impl Default for TransitionTransform {
    fn default() -> Self {
        Self {
            noise_scale: 0.0,
            noise: NoiseParams {
                frequency: 1.0 / 64.0,
                octaves: 4,
                persistence: 1.0 / 4.0,
                offset: [54.0, -111.2],
                rotation_degrees: 174.3,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Transforms {
    pub linear: LinearTransform,
    pub hills: HillsTransform,
    pub sea: SeaTransform,
    pub mountains: MountainTransform,
    pub transition: TransitionTransform,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TerrainRecipe {
    pub seed: u32,
    /// Global frequency applied to sample positions.
    pub frequency: f32,
    /// Global shift applied to sample positions before the frequency.
    pub shift: [f32; 2],
    pub amplitude: f32,
    pub offset: f32,
    pub layers: Layers,
    pub transforms: Transforms,
}

impl Default for TerrainRecipe {
    fn default() -> Self {
        Self {
            seed: 0,
            frequency: 1.0,
            shift: [0.0, 0.0],
            amplitude: 1.0,
            offset: 0.0,
            layers: Layers::default(),
            transforms: Transforms::default(),
        }
    }
}
