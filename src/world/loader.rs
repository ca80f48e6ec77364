use log::warn;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{build_chunk_images, ChunkCache, ChunkCoord, ChunkImages, HeightSynthesizer};

/// Where a chunk's images came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOrigin {
    Cache,
    Synthesized,
}

pub struct LoadedChunk {
    pub coord: ChunkCoord,
    pub images: ChunkImages,
    pub origin: ChunkOrigin,
    /// Time spent synthesizing; zero for cache hits.
    pub synthesis_time: Duration,
}

/// Produces chunk images from the cache when possible and from the synthesizer otherwise,
/// writing synthesized chunks through to the cache. Cheap to clone and safe to share between
/// threads.
#[derive(Clone)]
pub struct ChunkSource {
    cache: Arc<ChunkCache>,
    synthesizer: Arc<HeightSynthesizer>,
    chunk_size: usize,
}

impl ChunkSource {
    pub fn new(cache: Arc<ChunkCache>, synthesizer: Arc<HeightSynthesizer>, chunk_size: usize) -> Self {
        Self {
            cache,
            synthesizer,
            chunk_size,
        }
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn load(&self, coord: ChunkCoord) -> LoadedChunk {
        match self.cache.try_load(&coord) {
            Ok(Some(images)) => {
                return LoadedChunk {
                    coord,
                    images,
                    origin: ChunkOrigin::Cache,
                    synthesis_time: Duration::from_secs(0),
                }
            }
            Ok(None) => (),
            Err(err) => warn!("{}; regenerating", err),
        }

        let timer = Instant::now();
        let images = build_chunk_images(self.synthesizer.as_ref(), coord, self.chunk_size);
        let synthesis_time = timer.elapsed();
        if let Err(err) = self.cache.store(&coord, &images) {
            warn!("{}", err);
        }
        LoadedChunk {
            coord,
            images,
            origin: ChunkOrigin::Synthesized,
            synthesis_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::chunk_cache::tests::{cleanup, make_temp_dir};
    use crate::world::TerrainRecipe;
    use std::fs;

    fn source(dir: &std::path::Path) -> ChunkSource {
        ChunkSource::new(
            Arc::new(ChunkCache::open(dir, 8, false)),
            Arc::new(HeightSynthesizer::new(&TerrainRecipe::default())),
            8,
        )
    }

    #[test]
    fn miss_synthesizes_then_hit_reads_back() {
        let dir = make_temp_dir();
        let source = source(&dir);
        let coord = ChunkCoord::new(4, -9);
        let first = source.load(coord);
        assert_eq!(first.origin, ChunkOrigin::Synthesized);
        assert!(source.cache().path_for(&coord).exists());
        let second = source.load(coord);
        assert_eq!(second.origin, ChunkOrigin::Cache);
        assert_eq!(second.images, first.images);
        drop(source);
        cleanup(dir);
    }

    #[test]
    fn corrupt_entry_is_regenerated() {
        let dir = make_temp_dir();
        let source = source(&dir);
        let coord = ChunkCoord::new(0, 0);
        fs::write(source.cache().path_for(&coord), b"short").unwrap();
        let loaded = source.load(coord);
        assert_eq!(loaded.origin, ChunkOrigin::Synthesized);
        // The bad entry was overwritten with a full one.
        assert_eq!(source.load(coord).origin, ChunkOrigin::Cache);
        drop(source);
        cleanup(dir);
    }
}
