use cgmath::Vector3;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::{
    ChunkCache, ChunkCoord, ChunkOrigin, ChunkRounding, ChunkSource, HeightSynthesizer,
    LoadedChunk, SynthesisPool,
};
use super::worker::{ChunkRegion, JobOutcome};
use crate::config::GeneratorConfig;
use crate::error::TerrainError;
use crate::render::{
    CameraPosition, PatchFactory, PatchMesh, ShaderHandle, TerrainMaterials, TerrainPatch,
    WorldTransform,
};
use crate::util::{self, RingBufferAverage};

const SYNTHESIS_TIME_SAMPLES: usize = 32;

struct ChunkSlot<P> {
    coord: Option<ChunkCoord>,
    patch: Option<P>,
}

/// Fixed set of `(2d + 1)²` slots. A chunk always lands in the same slot, so when the window
/// slides by one chunk only the row or column that fell off is overwritten.
struct ViewWindow<P> {
    view_distance: i32,
    extent: i32,
    slots: Vec<ChunkSlot<P>>,
}

impl<P> ViewWindow<P> {
    fn new(view_distance: u32) -> Self {
        let extent = 2 * view_distance as i32 + 1;
        let slots = (0..extent * extent)
            .map(|_| ChunkSlot {
                coord: None,
                patch: None,
            })
            .collect();
        Self {
            view_distance: view_distance as i32,
            extent,
            slots,
        }
    }

    fn slot_index(&self, coord: &ChunkCoord) -> usize {
        let x = coord.x.rem_euclid(self.extent);
        let y = coord.y.rem_euclid(self.extent);
        (y * self.extent + x) as usize
    }

    fn contains(&self, center: &ChunkCoord, coord: &ChunkCoord) -> bool {
        center.ring_distance(coord) <= self.view_distance as u32
    }

    fn is_resident(&self, coord: &ChunkCoord) -> bool {
        let slot = &self.slots[self.slot_index(coord)];
        slot.coord == Some(*coord) && slot.patch.is_some()
    }

    fn get(&self, coord: &ChunkCoord) -> Option<&P> {
        let slot = &self.slots[self.slot_index(coord)];
        if slot.coord == Some(*coord) {
            slot.patch.as_ref()
        } else {
            None
        }
    }

    /// Puts the patch in the coordinate's slot, handing back whatever was there.
    fn install(&mut self, coord: ChunkCoord, patch: P) -> Option<P> {
        let index = self.slot_index(&coord);
        let slot = &mut self.slots[index];
        slot.coord = Some(coord);
        slot.patch.replace(patch)
    }

    /// Every coordinate of the window centered on `center`, nearest ring first.
    fn coords_around(&self, center: ChunkCoord) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = util::signed_square_iter((center.x, center.y), self.view_distance)
            .map(|(x, y)| ChunkCoord::new(x, y))
            .collect();
        coords.sort_by_key(|coord| center.ring_distance(coord));
        coords
    }

    fn occupied(&self) -> impl Iterator<Item = (ChunkCoord, &P)> {
        self.slots
            .iter()
            .filter_map(|slot| match (slot.coord, slot.patch.as_ref()) {
                (Some(coord), Some(patch)) => Some((coord, patch)),
                _ => None,
            })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StreamingStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub uploads: u64,
    /// Background results that arrived after the camera moved away from them.
    pub discarded: u64,
    /// Queued chunks dropped unsynthesized because they had left the window.
    pub skipped: u64,
    pub in_flight: usize,
    /// Rolling average over the most recent synthesized chunks.
    pub average_synthesis_time: Duration,
}

/// Keeps the square of chunks around the camera resident as uploaded terrain patches.
pub struct StreamingManager<F: PatchFactory> {
    pool: Option<SynthesisPool>,
    source: ChunkSource,
    factory: F,
    mesh: PatchMesh,
    window: ViewWindow<F::Patch>,
    in_flight: HashSet<ChunkCoord>,
    center: Option<ChunkCoord>,
    chunk_size: usize,
    chunk_world_size: f32,
    rounding: ChunkRounding,
    materials: TerrainMaterials,
    synthesis_times: RingBufferAverage<u64>,
    stats: StreamingStats,
}

impl<F: PatchFactory> StreamingManager<F> {
    pub fn new(config: &GeneratorConfig, factory: F) -> Result<Self, TerrainError> {
        config.validate()?;
        let cache = ChunkCache::open(
            &config.cache.directory,
            config.chunk_size,
            config.cache.persistent,
        );
        let synthesizer = HeightSynthesizer::new(&config.recipe);
        let source = ChunkSource::new(Arc::new(cache), Arc::new(synthesizer), config.chunk_size);
        let pool = if config.worker_threads > 0 {
            Some(SynthesisPool::new(source.clone(), config.worker_threads))
        } else {
            None
        };
        let size = config.chunk_size as f32;
        let mesh = PatchMesh::tessellation_grid(size, size, config.patch_resolution);
        info!(
            "Streaming {}x{} chunks of {} cells ({} world units), {}",
            config.window_extent(),
            config.window_extent(),
            config.chunk_size,
            config.chunk_world_size,
            match config.worker_threads {
                0 => "synthesized inline".to_owned(),
                n => format!("synthesized on {} threads", n),
            }
        );
        Ok(Self {
            pool,
            source,
            factory,
            mesh,
            window: ViewWindow::new(config.view_distance),
            in_flight: HashSet::new(),
            center: None,
            chunk_size: config.chunk_size,
            chunk_world_size: config.chunk_world_size,
            rounding: config.rounding,
            materials: TerrainMaterials::default(),
            synthesis_times: RingBufferAverage::new(SYNTHESIS_TIME_SAMPLES),
            stats: StreamingStats::default(),
        })
    }

    /// Recenters the window on the camera and requests every chunk in it that is not resident.
    /// Without worker threads missing chunks are loaded and uploaded before this returns.
    pub fn update(&mut self, camera: &impl CameraPosition) -> Result<(), TerrainError> {
        let center = ChunkCoord::from_world(
            camera.world_position(),
            self.chunk_world_size,
            self.rounding,
        );
        if self.center != Some(center) {
            debug!("View window centered on chunk {}", center);
            self.center = Some(center);
            if let Some(pool) = &self.pool {
                pool.retain_region(Some(ChunkRegion {
                    center,
                    radius: self.window.view_distance as u32,
                }));
            }
        }

        self.install_finished()?;
        for coord in self.window.coords_around(center) {
            if !self.window.is_resident(&coord) {
                self.request(coord)?;
            }
        }
        Ok(())
    }

    /// Waits for every queued chunk and installs the ones still inside the window.
    pub fn flush(&mut self) -> Result<(), TerrainError> {
        while !self.in_flight.is_empty() {
            let next = match &self.pool {
                Some(pool) => pool.wait_result(),
                None => None,
            };
            match next {
                Some(outcome) => self.accept_outcome(outcome)?,
                None => {
                    warn!(
                        "Synthesis workers exited with {} chunks outstanding",
                        self.in_flight.len()
                    );
                    self.in_flight.clear();
                }
            }
        }
        Ok(())
    }

    /// Draws every resident chunk of the current window. Returns how many were drawn.
    pub fn render(&self, shader: ShaderHandle) -> usize {
        let center = match self.center {
            Some(center) => center,
            None => return 0,
        };
        let mut drawn = 0;
        for (coord, patch) in self.window.occupied() {
            if self.window.contains(&center, &coord) {
                patch.render(shader, &self.materials);
                drawn += 1;
            }
        }
        drawn
    }

    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    /// Coordinates of the chunks currently drawn, sorted.
    pub fn resident_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = match self.center {
            Some(center) => self
                .window
                .occupied()
                .map(|(coord, _)| coord)
                .filter(|coord| self.window.contains(&center, coord))
                .collect(),
            None => Vec::new(),
        };
        coords.sort();
        coords
    }

    pub fn patch(&self, coord: &ChunkCoord) -> Option<&F::Patch> {
        self.window.get(coord)
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn source(&self) -> &ChunkSource {
        &self.source
    }

    pub fn materials(&self) -> &TerrainMaterials {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut TerrainMaterials {
        &mut self.materials
    }

    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            in_flight: self.in_flight.len(),
            average_synthesis_time: Duration::from_micros(self.synthesis_times.average()),
            ..self.stats
        }
    }

    pub fn world_transform(&self, coord: ChunkCoord) -> WorldTransform {
        let width = self.chunk_world_size;
        let scale = width / self.chunk_size as f32;
        WorldTransform {
            translation: Vector3::new(coord.x as f32 * width, 0.0, coord.y as f32 * width),
            scale: Vector3::new(scale, 1.0, scale),
        }
    }

    fn request(&mut self, coord: ChunkCoord) -> Result<(), TerrainError> {
        if let Some(pool) = &self.pool {
            if self.in_flight.contains(&coord) {
                return Ok(());
            }
            if pool.submit(coord) {
                self.in_flight.insert(coord);
                return Ok(());
            }
            warn!("No synthesis workers left; loading chunk {} inline", coord);
        }
        let loaded = self.source.load(coord);
        self.accept(loaded)
    }

    fn install_finished(&mut self) -> Result<(), TerrainError> {
        let finished = match &self.pool {
            Some(pool) => pool.try_results(),
            None => return Ok(()),
        };
        for outcome in finished {
            self.accept_outcome(outcome)?;
        }
        Ok(())
    }

    fn accept_outcome(&mut self, outcome: JobOutcome) -> Result<(), TerrainError> {
        match outcome {
            JobOutcome::Finished(loaded) => self.accept(loaded),
            JobOutcome::Skipped(coord) => {
                self.in_flight.remove(&coord);
                self.stats.skipped += 1;
                Ok(())
            }
        }
    }

    fn accept(&mut self, loaded: LoadedChunk) -> Result<(), TerrainError> {
        self.in_flight.remove(&loaded.coord);
        match loaded.origin {
            ChunkOrigin::Cache => self.stats.cache_hits += 1,
            ChunkOrigin::Synthesized => {
                self.stats.cache_misses += 1;
                self.synthesis_times
                    .push_sample(loaded.synthesis_time.as_micros() as u64);
            }
        }

        let wanted = match self.center {
            Some(center) => self.window.contains(&center, &loaded.coord),
            None => false,
        };
        if !wanted || self.window.is_resident(&loaded.coord) {
            debug!("Discarding chunk {}, no longer in view", loaded.coord);
            self.stats.discarded += 1;
            return Ok(());
        }
        self.install(loaded)
    }

    fn install(&mut self, loaded: LoadedChunk) -> Result<(), TerrainError> {
        let LoadedChunk { coord, images, .. } = loaded;
        let mut patch = self.factory.create_patch(&self.mesh)?;
        patch.upload_height_and_normal(&images)?;
        patch.set_world_transform(self.world_transform(coord));
        // The previous occupant of the slot, if any, is released here.
        self.window.install(coord, patch);
        self.stats.uploads += 1;
        debug!("Uploaded chunk {}", coord);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{HeadlessFactory, HeadlessPatch};
    use crate::world::chunk_cache::tests::{cleanup, make_temp_dir};
    use crate::world::ChunkImages;
    use std::path::{Path, PathBuf};

    fn small_config(dir: &Path, view_distance: u32, worker_threads: usize) -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        config.chunk_size = 8;
        config.chunk_world_size = 32.0;
        config.view_distance = view_distance;
        config.worker_threads = worker_threads;
        config.patch_resolution = 2;
        config.cache.directory = dir.to_owned();
        config
    }

    /// A camera position in the middle of the given chunk.
    fn inside(coord: ChunkCoord, world_size: f32) -> Vector3<f32> {
        Vector3::new(
            (coord.x as f32 + 0.5) * world_size,
            40.0,
            (coord.y as f32 + 0.5) * world_size,
        )
    }

    fn window_around(center: ChunkCoord, view_distance: i32) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = util::signed_square_iter((center.x, center.y), view_distance)
            .map(|(x, y)| ChunkCoord::new(x, y))
            .collect();
        coords.sort();
        coords
    }

    fn manager(dir: &PathBuf, view_distance: u32, workers: usize) -> StreamingManager<HeadlessFactory> {
        StreamingManager::new(&small_config(dir, view_distance, workers), HeadlessFactory::new()).unwrap()
    }

    #[test]
    fn slots_are_addressed_toroidally() {
        let window: ViewWindow<()> = ViewWindow::new(1);
        assert_eq!(window.slot_index(&ChunkCoord::new(0, 0)), 0);
        assert_eq!(window.slot_index(&ChunkCoord::new(-1, 0)), 2);
        assert_eq!(window.slot_index(&ChunkCoord::new(4, -1)), 2 * 3 + 1);
        // Every window maps onto every slot exactly once.
        for &center in &[ChunkCoord::new(0, 0), ChunkCoord::new(-5, 13)] {
            let slots: HashSet<_> = window
                .coords_around(center)
                .iter()
                .map(|coord| window.slot_index(coord))
                .collect();
            assert_eq!(slots.len(), 9);
        }
    }

    #[test]
    fn requests_are_nearest_first() {
        let window: ViewWindow<()> = ViewWindow::new(2);
        let center = ChunkCoord::new(3, -3);
        let coords = window.coords_around(center);
        assert_eq!(coords[0], center);
        let rings: Vec<_> = coords.iter().map(|coord| center.ring_distance(coord)).collect();
        let mut sorted = rings.clone();
        sorted.sort();
        assert_eq!(rings, sorted);
    }

    #[test]
    fn window_fills_every_chunk_once() {
        let dir = make_temp_dir();
        let mut manager = manager(&dir, 2, 0);
        let center = ChunkCoord::new(-3, 7);
        manager.update(&inside(center, 32.0)).unwrap();

        assert_eq!(manager.center(), Some(center));
        assert_eq!(manager.resident_coords(), window_around(center, 2));
        let stats = manager.stats();
        assert_eq!(stats.cache_misses, 25);
        assert_eq!(stats.uploads, 25);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(manager.factory().created(), 25);

        // Nothing is missing, so a second update does no work.
        manager.update(&inside(center, 32.0)).unwrap();
        assert_eq!(manager.stats().uploads, 25);
        drop(manager);
        cleanup(dir);
    }

    #[test]
    fn one_chunk_move_loads_one_column() {
        let dir = make_temp_dir();
        let mut manager = manager(&dir, 1, 0);
        manager.update(&inside(ChunkCoord::new(0, 0), 32.0)).unwrap();
        assert_eq!(manager.stats().uploads, 9);

        let moved = ChunkCoord::new(1, 0);
        manager.update(&inside(moved, 32.0)).unwrap();
        assert_eq!(manager.stats().uploads, 12);
        assert_eq!(manager.resident_coords(), window_around(moved, 1));
        // The column that fell off was overwritten in place.
        assert!(manager.patch(&ChunkCoord::new(-1, 0)).is_none());
        assert!(manager.patch(&ChunkCoord::new(2, 0)).is_some());
        drop(manager);
        cleanup(dir);
    }

    #[test]
    fn returning_to_a_chunk_hits_the_cache() {
        let dir = make_temp_dir();
        let mut manager = manager(&dir, 1, 0);
        manager.update(&inside(ChunkCoord::new(0, 0), 32.0)).unwrap();
        manager.update(&inside(ChunkCoord::new(3, 0), 32.0)).unwrap();
        manager.update(&inside(ChunkCoord::new(0, 0), 32.0)).unwrap();
        let stats = manager.stats();
        assert_eq!(stats.cache_misses, 18);
        assert_eq!(stats.cache_hits, 9);
        drop(manager);
        cleanup(dir);
    }

    #[test]
    fn full_size_window_is_placed_in_world_space() {
        let dir = make_temp_dir();
        let mut config = GeneratorConfig::default();
        config.cache.directory = dir.clone();
        let mut manager = StreamingManager::new(&config, HeadlessFactory::new()).unwrap();
        manager.update(&Vector3::new(0.0, 300.0, 0.0)).unwrap();
        assert_eq!(manager.center(), Some(ChunkCoord::new(0, 0)));

        let coords = manager.resident_coords();
        assert_eq!(coords, window_around(ChunkCoord::new(0, 0), 1));
        for coord in &coords {
            let patch: &HeadlessPatch = manager.patch(coord).unwrap();
            let transform = patch.transform();
            assert_eq!(
                transform.translation,
                Vector3::new(coord.x as f32 * 2048.0, 0.0, coord.y as f32 * 2048.0)
            );
            assert_eq!(transform.scale, Vector3::new(4.0, 1.0, 4.0));
            assert_eq!(patch.size(), Some(512));
            assert_eq!(patch.num_vertices(), 20 * 20 * 4);

            let path = manager.source().cache().path_for(coord);
            let len = std::fs::metadata(&path).unwrap().len();
            assert_eq!(len as usize, ChunkImages::byte_len(512));
        }
        assert_eq!(manager.render(ShaderHandle(0)), 9);

        drop(manager);
        // The non-persistent cache is emptied on drop.
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        cleanup(dir);
    }

    #[test]
    fn camera_just_below_origin_floors_to_negative_chunk() {
        let dir = make_temp_dir();
        let mut manager = manager(&dir, 1, 0);
        manager.update(&Vector3::new(-0.5, 0.0, -0.5)).unwrap();
        assert_eq!(manager.center(), Some(ChunkCoord::new(-1, -1)));
        assert_eq!(manager.resident_coords(), window_around(ChunkCoord::new(-1, -1), 1));
        let transform = manager.patch(&ChunkCoord::new(-2, 0)).unwrap().transform();
        assert_eq!(transform.translation, Vector3::new(-64.0, 0.0, 0.0));
        drop(manager);
        cleanup(dir);
    }

    #[test]
    fn background_mode_matches_inline_mode() {
        let sync_dir = make_temp_dir();
        let async_dir = make_temp_dir();
        let mut inline = manager(&sync_dir, 1, 0);
        let mut background = manager(&async_dir, 1, 2);
        let camera = inside(ChunkCoord::new(2, -4), 32.0);

        inline.update(&camera).unwrap();
        background.update(&camera).unwrap();
        // Results are only collected at the start of an update, so nothing is uploaded yet.
        assert!(background.resident_coords().is_empty());
        assert_eq!(background.stats().in_flight, 9);
        // Already queued chunks are not queued again.
        background.update(&camera).unwrap();
        assert!(background.stats().in_flight <= 9);

        background.flush().unwrap();
        assert_eq!(background.stats().in_flight, 0);
        assert_eq!(background.stats().uploads, 9);
        assert_eq!(background.resident_coords(), inline.resident_coords());
        for coord in inline.resident_coords() {
            let expected = inline.patch(&coord).unwrap();
            let actual = background.patch(&coord).unwrap();
            assert_eq!(actual.height_range(), expected.height_range());
            assert_eq!(actual.transform(), expected.transform());
        }

        drop(inline);
        drop(background);
        cleanup(sync_dir);
        cleanup(async_dir);
    }

    #[test]
    fn results_for_abandoned_chunks_are_discarded() {
        let dir = make_temp_dir();
        let mut manager = manager(&dir, 1, 2);
        manager.update(&inside(ChunkCoord::new(0, 0), 32.0)).unwrap();
        let far = ChunkCoord::new(10, 10);
        manager.update(&inside(far, 32.0)).unwrap();
        manager.flush().unwrap();

        let stats = manager.stats();
        // Each abandoned chunk was either skipped in the queue or discarded on arrival.
        assert_eq!(stats.discarded + stats.skipped, 9);
        assert_eq!(stats.uploads, 9);
        assert_eq!(manager.resident_coords(), window_around(far, 1));
        drop(manager);
        cleanup(dir);
    }

    #[test]
    fn stale_slots_are_not_drawn() {
        let dir = make_temp_dir();
        let mut manager = manager(&dir, 1, 1);
        manager.update(&inside(ChunkCoord::new(0, 0), 32.0)).unwrap();
        manager.flush().unwrap();
        assert_eq!(manager.render(ShaderHandle(3)), 9);

        // The new column is only queued, and the old one has left the window.
        manager.update(&inside(ChunkCoord::new(1, 0), 32.0)).unwrap();
        assert_eq!(manager.render(ShaderHandle(3)), 6);
        assert_eq!(manager.patch(&ChunkCoord::new(-1, 0)).unwrap().draw_count(), 1);

        manager.flush().unwrap();
        assert_eq!(manager.render(ShaderHandle(3)), 9);
        assert_eq!(manager.patch(&ChunkCoord::new(1, 0)).unwrap().draw_count(), 3);
        drop(manager);
        cleanup(dir);
    }

    #[test]
    fn queued_chunks_that_leave_the_window_are_not_synthesized() {
        let dir = make_temp_dir();
        let mut config = small_config(&dir, 2, 1);
        config.chunk_size = 64;
        let mut manager = StreamingManager::new(&config, HeadlessFactory::new()).unwrap();
        manager.update(&inside(ChunkCoord::new(0, 0), 32.0)).unwrap();
        assert_eq!(manager.stats().in_flight, 25);
        let far = ChunkCoord::new(-20, 20);
        manager.update(&inside(far, 32.0)).unwrap();
        manager.flush().unwrap();

        let stats = manager.stats();
        // One worker cannot get through the old window before the camera moves on.
        assert!(stats.skipped > 0);
        assert_eq!(stats.discarded + stats.skipped, 25);
        assert_eq!(stats.cache_misses, 50 - stats.skipped);
        assert_eq!(manager.resident_coords(), window_around(far, 2));
        drop(manager);
        cleanup(dir);
    }
}
