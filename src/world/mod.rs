//! CPU side of the terrain height system
//!
//! - **Generation**: the procedural height function and the `HeightProvider` seam
//! - **Height cache**: grid-snapped LRU cache answering gameplay queries
//! - **Position**: world coordinates and cache keys

pub mod generation;
pub mod height_cache;
pub mod position;

pub use generation::{
    provider_from_config, ElevationGrid, HeightProvider, Hydrology, SharedHeightProvider,
    TerrainGenerator, TerrainSample,
};
pub use height_cache::{CacheStats, HeightQueryCache, SharedHeightCache};
pub use position::{CacheKey, WorldCoord};
