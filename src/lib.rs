pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod util;
pub mod world;

pub use config::GeneratorConfig;
pub use error::TerrainError;
