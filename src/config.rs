use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::world::{ChunkRounding, TerrainRecipe};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: PathBuf,
    /// Keep cached chunks between runs instead of clearing the directory on open and drop.
    pub persistent: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".tcache"),
            persistent: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Cells along each edge of a chunk's images.
    pub chunk_size: usize,
    /// World units covered by one chunk edge.
    pub chunk_world_size: f32,
    /// Rings of chunks kept around the camera's chunk.
    pub view_distance: u32,
    pub rounding: ChunkRounding,
    /// 0 synthesizes chunks inline during `update`.
    pub worker_threads: usize,
    /// Patches along each edge of the tessellation mesh.
    pub patch_resolution: u32,
    pub cache: CacheConfig,
    pub recipe: TerrainRecipe,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_world_size: 2048.0,
            view_distance: 1,
            rounding: ChunkRounding::Floor,
            worker_threads: 0,
            patch_resolution: 20,
            cache: CacheConfig::default(),
            recipe: TerrainRecipe::default(),
        }
    }
}

/// Keeps the `(2d + 1)²` window addressable with `i32` slot arithmetic.
pub const MAX_VIEW_DISTANCE: u32 = 64;

/// The transforms divide by the width of the sea and mountain bands, so both must be non-empty
/// and ordered floor < level < base < peak.
fn validate_recipe(recipe: &TerrainRecipe) -> Result<(), ConfigError> {
    let sea = &recipe.transforms.sea;
    let mountains = &recipe.transforms.mountains;
    let bands = [sea.floor, sea.level, mountains.base, mountains.peak];
    if bands.iter().any(|value| !value.is_finite()) {
        return Err(ConfigError::Invalid(
            "sea and mountain heights must be finite".to_owned(),
        ));
    }
    if sea.level <= sea.floor {
        return Err(ConfigError::Invalid(format!(
            "sea level ({}) must be above the sea floor ({})",
            sea.level, sea.floor
        )));
    }
    if mountains.base <= sea.level {
        return Err(ConfigError::Invalid(format!(
            "mountain base ({}) must be above sea level ({})",
            mountains.base, sea.level
        )));
    }
    if mountains.peak <= mountains.base {
        return Err(ConfigError::Invalid(format!(
            "mountain peak ({}) must be above the mountain base ({})",
            mountains.peak, mountains.base
        )));
    }
    if !recipe.frequency.is_finite() || recipe.frequency == 0.0 {
        return Err(ConfigError::Invalid(format!(
            "recipe frequency must be finite and non-zero, got {}",
            recipe.frequency
        )));
    }
    Ok(())
}

/// Where the binaries look for a config when none is given on the command line.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("terragen").join("terrain.ron"))
}

impl GeneratorConfig {
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let reader = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = ron::de::from_reader(reader).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` if given, otherwise the file at `default_config_path()` if there is one,
    /// otherwise falls back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::read_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                info!("Using config from {:?}", path);
                Self::read_file(path)
            }
            _ => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".to_owned()));
        }
        if !(self.chunk_world_size > 0.0) || !self.chunk_world_size.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "chunk_world_size must be positive, got {}",
                self.chunk_world_size
            )));
        }
        if self.patch_resolution == 0 {
            return Err(ConfigError::Invalid(
                "patch_resolution must be at least 1".to_owned(),
            ));
        }
        if self.view_distance > MAX_VIEW_DISTANCE {
            return Err(ConfigError::Invalid(format!(
                "view_distance must be at most {}, got {}",
                MAX_VIEW_DISTANCE, self.view_distance
            )));
        }
        validate_recipe(&self.recipe)
    }

    /// Side length of the square of chunks kept resident.
    pub fn window_extent(&self) -> usize {
        2 * self.view_distance as usize + 1
    }
}
