use cgmath::{Deg, Matrix2, Vector2};
use noise::{NoiseFn, Perlin, Seedable};

use super::recipe::NoiseParams;

pub fn clip(value: f32) -> f32 {
    value.min(1.0).max(0.0)
}

pub fn smoothstep(x: f32) -> f32 {
    let t = clip(x);
    t * t * (3.0 - 2.0 * t)
}

// First and second derivatives are zero at both ends.
pub fn smootherstep(x: f32) -> f32 {
    let t = clip(x);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Logistic curve with steepness `k`, mapping the real line onto (0, 1) with `logistic(k, 0) = 0.5`.
pub fn logistic(k: f32, x: f32) -> f32 {
    1.0 / (1.0 + (-k * x).exp())
}

/// Multi-octave gradient noise. Holds no mutable state, so the same input always produces the
/// same output for a given seed.
pub struct FractalNoise {
    gradient: Perlin,
}

impl FractalNoise {
    pub fn new(seed: u32) -> FractalNoise {
        FractalNoise {
            gradient: Perlin::new().set_seed(seed),
        }
    }

    /// Sums `octaves` layers of gradient noise. Every layer doubles the frequency and scales the
    /// amplitude by `persistence`; the sum is divided by the total amplitude so the result stays
    /// within roughly [-1, 1].
    pub fn fractal(&self, p: Vector2<f32>, persistence: f32, octaves: u32) -> f32 {
        let (x, y) = (p.x as f64, p.y as f64);
        let persistence = persistence as f64;
        let mut total = 0.0;
        let mut max_amplitude = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        for _ in 0..octaves {
            total += self.gradient.get([x * frequency, y * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }
        if max_amplitude > 0.0 {
            (total / max_amplitude) as f32
        } else {
            0.0
        }
    }
}

/// A fractal noise lookup with its own frequency, octave count, rotation and offset baked in.
#[derive(Clone, Debug)]
pub struct NoiseField {
    rotation: Matrix2<f32>,
    offset: Vector2<f32>,
    frequency: f32,
    persistence: f32,
    octaves: u32,
}

impl NoiseField {
    pub fn new(params: &NoiseParams) -> NoiseField {
        NoiseField {
            rotation: Matrix2::from_angle(Deg(params.rotation_degrees)),
            offset: Vector2::new(params.offset[0], params.offset[1]),
            frequency: params.frequency,
            persistence: params.persistence,
            octaves: params.octaves,
        }
    }

    pub fn sample(&self, noise: &FractalNoise, pos: Vector2<f32>) -> f32 {
        let p = self.rotation * ((pos + self.offset) * self.frequency);
        noise.fractal(p, self.persistence, self.octaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_curves_hit_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smootherstep(-3.0), 0.0);
        assert_eq!(smootherstep(0.0), 0.0);
        assert_eq!(smootherstep(0.5), 0.5);
        assert_eq!(smootherstep(1.0), 1.0);
        assert_eq!(smootherstep(4.0), 1.0);
    }

    #[test]
    fn logistic_is_centered() {
        assert_eq!(logistic(0.25, 0.0), 0.5);
        assert!(logistic(0.25, 40.0) > 0.99);
        assert!(logistic(0.25, -40.0) < 0.01);
    }

    #[test]
    fn fractal_noise_is_deterministic_and_bounded() {
        let a = FractalNoise::new(7);
        let b = FractalNoise::new(7);
        for i in 0..500 {
            let p = Vector2::new(i as f32 * 0.173 - 40.0, i as f32 * -0.291 + 13.0);
            let value = a.fractal(p, 0.5, 6);
            assert_eq!(value.to_bits(), b.fractal(p, 0.5, 6).to_bits());
            assert!(value.abs() <= 1.0 + 1e-4, "{} out of range", value);
        }
    }

    #[test]
    fn zero_octaves_is_flat() {
        let noise = FractalNoise::new(0);
        assert_eq!(noise.fractal(Vector2::new(3.3, 1.7), 0.5, 0), 0.0);
    }

    #[test]
    fn field_offset_shifts_sampling() {
        let noise = FractalNoise::new(1);
        let params = NoiseParams {
            frequency: 1.0 / 32.0,
            octaves: 4,
            persistence: 0.25,
            offset: [0.0, 0.0],
            rotation_degrees: 0.0,
        };
        let plain = NoiseField::new(&params);
        let shifted = NoiseField::new(&NoiseParams {
            offset: [10.0, -4.0],
            ..params
        });
        let p = Vector2::new(5.5, 9.25);
        let expected = plain.sample(&noise, p + Vector2::new(10.0, -4.0));
        assert!((shifted.sample(&noise, p) - expected).abs() < 1e-5);
    }
}
