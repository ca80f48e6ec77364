pub mod chunk;
pub mod chunk_cache;
pub mod functions;
pub mod generate;
pub mod heightmap;
pub mod loader;
pub mod recipe;
pub mod streaming;
pub mod worker;

pub use chunk::{ChunkCoord, ChunkImages, ChunkRounding};
pub use chunk_cache::ChunkCache;
pub use generate::build_chunk_images;
pub use heightmap::{HeightSource, HeightSynthesizer};
pub use loader::{ChunkOrigin, ChunkSource, LoadedChunk};
pub use recipe::TerrainRecipe;
pub use streaming::{StreamingManager, StreamingStats};
pub use worker::{ChunkRegion, JobOutcome, SynthesisPool};
