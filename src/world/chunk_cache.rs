use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use half::f16;
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::{ChunkCoord, ChunkImages};
use crate::error::CacheError;

/// Disk cache of chunk images, one file per chunk holding the raw half precision heightmap
/// followed by the raw normal map. There is no header; the reader must know the chunk size.
///
/// Unless it is persistent, the cache only lives as long as this value: the directory is emptied
/// when it is opened and again when it is dropped.
pub struct ChunkCache {
    storage_dir: PathBuf,
    chunk_size: usize,
    persistent: bool,
    enabled: bool,
}

impl ChunkCache {
    pub fn open(storage_dir: impl Into<PathBuf>, chunk_size: usize, persistent: bool) -> ChunkCache {
        let mut cache = ChunkCache {
            storage_dir: storage_dir.into(),
            chunk_size,
            persistent,
            enabled: true,
        };
        if !persistent {
            cache.clear();
        }
        if let Err(err) = fs::create_dir_all(&cache.storage_dir) {
            let err = CacheError::CreateDir {
                path: cache.storage_dir.clone(),
                source: err,
            };
            error!("{}; chunks will always be synthesized", err);
            cache.enabled = false;
        } else {
            info!(
                "Chunk cache at {:?} ({})",
                cache.storage_dir,
                if persistent { "persistent" } else { "cleared on exit" }
            );
        }
        cache
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path_for(&self, coord: &ChunkCoord) -> PathBuf {
        Self::get_path_for(&self.storage_dir, coord)
    }

    fn get_path_for(base: &Path, coord: &ChunkCoord) -> PathBuf {
        base.join(format!("{}_{}", coord.x, coord.y))
    }

    fn write_chunk_images(path: &Path, images: &ChunkImages) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for value in images.heights.iter().chain(images.normals.iter()) {
            writer.write_u16::<NativeEndian>(value.to_bits())?;
        }
        writer.flush()
    }

    fn read_into_chunk_images(reader: &mut impl Read, images: &mut ChunkImages) -> io::Result<()> {
        let mut bits = vec![0u16; images.heights.len()];
        reader.read_u16_into::<NativeEndian>(&mut bits)?;
        for (target, bits) in images.heights.iter_mut().zip(bits.iter()) {
            *target = f16::from_bits(*bits);
        }
        bits.resize(images.normals.len(), 0);
        reader.read_u16_into::<NativeEndian>(&mut bits)?;
        for (target, bits) in images.normals.iter_mut().zip(bits.iter()) {
            *target = f16::from_bits(*bits);
        }
        Ok(())
    }

    /// Looks the chunk up on disk. A missing file is an ordinary miss and yields `Ok(None)`.
    pub fn try_load(&self, coord: &ChunkCoord) -> Result<Option<ChunkImages>, CacheError> {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.path_for(coord);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Cache miss for chunk {}", coord);
                return Ok(None);
            }
            Err(source) => {
                return Err(CacheError::Read {
                    coord: *coord,
                    path,
                    source,
                })
            }
        };
        let read_error = |source: io::Error| CacheError::Read {
            coord: *coord,
            path: path.clone(),
            source,
        };
        // Entries carry no header, so a chunk size change only shows up in the length.
        let expected = ChunkImages::byte_len(self.chunk_size) as u64;
        let actual = file.metadata().map_err(read_error)?.len();
        if actual != expected {
            return Err(read_error(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("entry is {} bytes, expected {}", actual, expected),
            )));
        }
        let mut images = ChunkImages::new(self.chunk_size);
        Self::read_into_chunk_images(&mut BufReader::new(file), &mut images).map_err(read_error)?;
        debug!("Cache hit for chunk {}", coord);
        Ok(Some(images))
    }

    /// Writes (or overwrites) the chunk's entry.
    pub fn store(&self, coord: &ChunkCoord, images: &ChunkImages) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }
        debug_assert_eq!(images.size(), self.chunk_size);
        let path = self.path_for(coord);
        Self::write_chunk_images(&path, images).map_err(|source| CacheError::Write {
            coord: *coord,
            path,
            source,
        })
    }

    /// Deletes every regular file in the cache directory. Subdirectories are left alone and
    /// failures are logged rather than returned.
    pub fn clear(&self) {
        let entries = match fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return,
            Err(source) => {
                let err = CacheError::Clear {
                    path: self.storage_dir.clone(),
                    source,
                };
                warn!("{}", err);
                return;
            }
        };
        let mut removed = 0;
        for entry in entries.filter_map(|entry| entry.ok()) {
            let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(source) => {
                    let err = CacheError::Clear {
                        path: entry.path(),
                        source,
                    };
                    warn!("{}", err);
                }
            }
        }
        if removed > 0 {
            debug!("Removed {} cached chunks from {:?}", removed, self.storage_dir);
        }
    }
}

impl Drop for ChunkCache {
    fn drop(&mut self) {
        if !self.persistent {
            self.clear();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::world::{build_chunk_images, HeightSynthesizer, TerrainRecipe};
    use rand::RngCore;

    pub fn make_temp_dir() -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "terragenTestDir{:08X}",
            rand::thread_rng().next_u32()
        ));
        std::fs::create_dir(&path).unwrap();
        path
    }

    pub fn cleanup(dir: PathBuf) {
        std::fs::remove_dir_all(dir).unwrap();
    }

    fn sample_images(coord: ChunkCoord) -> ChunkImages {
        let synth = HeightSynthesizer::new(&TerrainRecipe::default());
        build_chunk_images(&synth, coord, 16)
    }

    #[test]
    fn round_trip_is_bitwise_identical() {
        let dir = make_temp_dir();
        let cache = ChunkCache::open(&dir, 16, false);
        for &coord in &[ChunkCoord::new(3, 4), ChunkCoord::new(-7, -2)] {
            let images = sample_images(coord);
            cache.store(&coord, &images).unwrap();
            let loaded = cache.try_load(&coord).unwrap().unwrap();
            let bits = |values: &[f16]| values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
            assert_eq!(bits(&loaded.heights), bits(&images.heights));
            assert_eq!(bits(&loaded.normals), bits(&images.normals));
        }
        drop(cache);
        cleanup(dir);
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let dir = make_temp_dir();
        let cache = ChunkCache::open(&dir, 16, false);
        assert!(cache.try_load(&ChunkCoord::new(0, -1)).unwrap().is_none());
        drop(cache);
        cleanup(dir);
    }

    #[test]
    fn entries_use_coordinate_file_names() {
        let dir = make_temp_dir();
        let cache = ChunkCache::open(&dir, 16, false);
        let coord = ChunkCoord::new(-12, 5);
        cache.store(&coord, &sample_images(coord)).unwrap();
        let path = dir.join("-12_5");
        assert_eq!(cache.path_for(&coord), path);
        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len as usize, ChunkImages::byte_len(16));
        drop(cache);
        cleanup(dir);
    }

    #[test]
    fn truncated_entry_is_an_error() {
        let dir = make_temp_dir();
        let cache = ChunkCache::open(&dir, 16, false);
        let coord = ChunkCoord::new(1, 1);
        fs::write(cache.path_for(&coord), &[0u8; 100]).unwrap();
        match cache.try_load(&coord) {
            Err(CacheError::Read { coord: failed, .. }) => assert_eq!(failed, coord),
            other => panic!("expected a read error, got {:?}", other.map(|i| i.is_some())),
        }
        drop(cache);
        cleanup(dir);
    }

    #[test]
    fn entry_of_another_chunk_size_is_an_error() {
        let dir = make_temp_dir();
        let coord = ChunkCoord::new(2, -3);
        {
            let larger = ChunkCache::open(&dir, 32, true);
            let synth = HeightSynthesizer::new(&TerrainRecipe::default());
            larger.store(&coord, &build_chunk_images(&synth, coord, 32)).unwrap();
        }
        let cache = ChunkCache::open(&dir, 16, true);
        match cache.try_load(&coord) {
            Err(CacheError::Read { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidData)
            }
            other => panic!("expected a read error, got {:?}", other.map(|i| i.is_some())),
        }
        drop(cache);
        cleanup(dir);
    }

    #[test]
    fn non_persistent_cache_clears_on_open_and_drop() {
        let dir = make_temp_dir();
        fs::write(dir.join("0_0"), b"stale").unwrap();
        fs::create_dir(dir.join("nested")).unwrap();
        let cache = ChunkCache::open(&dir, 16, false);
        assert!(!dir.join("0_0").exists());
        let coord = ChunkCoord::new(2, 2);
        cache.store(&coord, &sample_images(coord)).unwrap();
        assert!(dir.join("2_2").exists());
        drop(cache);
        assert!(!dir.join("2_2").exists());
        // Only regular files are removed.
        assert!(dir.join("nested").is_dir());
        cleanup(dir);
    }

    #[test]
    fn persistent_cache_survives_reopening() {
        let dir = make_temp_dir();
        let coord = ChunkCoord::new(-1, 0);
        let images = sample_images(coord);
        {
            let cache = ChunkCache::open(&dir, 16, true);
            cache.store(&coord, &images).unwrap();
        }
        let cache = ChunkCache::open(&dir, 16, true);
        assert_eq!(cache.try_load(&coord).unwrap(), Some(images));
        drop(cache);
        cleanup(dir);
    }

    #[test]
    fn unusable_directory_disables_the_cache() {
        let dir = make_temp_dir();
        let blocker = dir.join("not_a_dir");
        fs::write(&blocker, b"file").unwrap();
        let cache = ChunkCache::open(blocker.join("cache"), 16, true);
        assert!(!cache.is_enabled());
        let coord = ChunkCoord::new(0, 0);
        cache.store(&coord, &sample_images(coord)).unwrap();
        assert!(cache.try_load(&coord).unwrap().is_none());
        drop(cache);
        cleanup(dir);
    }
}
