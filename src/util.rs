use cgmath::{Rad, Vector3};

pub struct TripleEulerVector {
    pub forward: Vector3<f32>,
    pub up: Vector3<f32>,
    pub right: Vector3<f32>,
}

// Y is up. Heading starts at positive X and turns towards positive Z.
pub fn compute_triple_euler_vector(heading: Rad<f32>, pitch: Rad<f32>) -> TripleEulerVector {
    let forward = Vector3 {
        x: heading.0.cos() * pitch.0.cos(),
        y: pitch.0.sin(),
        z: heading.0.sin() * pitch.0.cos(),
    };
    let up = Vector3 {
        x: heading.0.cos() * (pitch.0 + std::f32::consts::FRAC_PI_2).cos(),
        y: (pitch.0 + std::f32::consts::FRAC_PI_2).sin(),
        z: heading.0.sin() * (pitch.0 + std::f32::consts::FRAC_PI_2).cos(),
    };
    let right = forward.cross(up);
    TripleEulerVector { forward, up, right }
}

pub fn coord_to_index_2d(coord: &(usize, usize), stride: usize) -> usize {
    coord.1 * stride + coord.0
}

pub fn coord_iter_2d(size: usize) -> impl Iterator<Item = (usize, usize)> {
    let coord_iter = 0..size;
    coord_iter.flat_map(move |y| (0..size).map(move |x| (x, y)))
}

/// Iterates every coordinate of the square `[center - radius, center + radius]²`, row by row.
pub fn signed_square_iter(center: (i32, i32), radius: i32) -> impl Iterator<Item = (i32, i32)> {
    let radius = radius.max(0);
    (center.1 - radius..=center.1 + radius)
        .flat_map(move |y| (center.0 - radius..=center.0 + radius).map(move |x| (x, y)))
}

/// Reads a value out of a square grid, clamping the coordinate to the grid's edge.
pub fn fetch_clamped(data: &[f32], stride: usize, x: isize, y: isize) -> f32 {
    let max = stride as isize - 1;
    let x = num::clamp(x, 0, max) as usize;
    let y = num::clamp(y, 0, max) as usize;
    data[coord_to_index_2d(&(x, y), stride)]
}

pub struct RingBufferAverage<ElementType> {
    elements: Vec<ElementType>,
    current_index: usize,
    filled: usize,
}

impl<ElementType> RingBufferAverage<ElementType>
where
    ElementType: std::ops::Add<ElementType, Output = ElementType>
        + std::ops::Div<ElementType, Output = ElementType>
        + Default
        + Copy,
    u64: Into<ElementType>,
{
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        let mut vec = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            vec.push(Default::default());
        }
        Self {
            elements: vec,
            current_index: 0,
            filled: 0,
        }
    }

    /// Averages only the samples pushed so far, so a fresh buffer is not dragged towards zero.
    pub fn average(&self) -> ElementType {
        if self.filled == 0 {
            return Default::default();
        }
        let sum = self.elements[..self.filled]
            .iter()
            .fold(Default::default(), |sum: ElementType, item| sum + *item);
        sum / (self.filled as u64).into()
    }

    pub fn push_sample(&mut self, sample: ElementType) {
        self.elements[self.current_index] = sample;
        self.current_index = (self.current_index + 1) % self.elements.len();
        self.filled = (self.filled + 1).min(self.elements.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_index_round_trip() {
        for (index, coord) in coord_iter_2d(7).enumerate() {
            assert_eq!(coord_to_index_2d(&coord, 7), index);
        }
    }

    #[test]
    fn signed_square_covers_window() {
        let coords: Vec<_> = signed_square_iter((-3, 2), 2).collect();
        assert_eq!(coords.len(), 25);
        assert_eq!(coords[0], (-5, 0));
        assert_eq!(coords[24], (-1, 4));
    }

    #[test]
    fn fetch_clamps_to_edges() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(fetch_clamped(&data, 2, -1, -1), 1.0);
        assert_eq!(fetch_clamped(&data, 2, 5, 0), 2.0);
        assert_eq!(fetch_clamped(&data, 2, 1, 9), 4.0);
    }

    #[test]
    fn average_ignores_unfilled_slots() {
        let mut average = RingBufferAverage::<u64>::new(4);
        assert_eq!(average.average(), 0);
        average.push_sample(10);
        average.push_sample(20);
        assert_eq!(average.average(), 15);
        for _ in 0..4 {
            average.push_sample(8);
        }
        assert_eq!(average.average(), 8);
    }
}
