use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::world::ChunkCoord;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to create cache directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read cached chunk {coord} from {path:?}")]
    Read {
        coord: ChunkCoord,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write chunk {coord} to {path:?}")]
    Write {
        coord: ChunkCoord,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to clear cache directory {path:?}")]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures surfaced by the rendering side of a terrain patch.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to create terrain patch: {0}")]
    Create(String),
    #[error("failed to upload chunk images to terrain patch: {0}")]
    Upload(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
