//! Terrain height generation
//!
//! One formula, evaluated on the CPU for both the query cache and the bulk
//! heightmap tile fill. The GPU never re-derives heights from noise.

mod provider;
mod terrain;

pub use provider::{provider_from_config, ElevationGrid, HeightProvider, SharedHeightProvider};
pub use terrain::{apply_hydrology, smoothstep, Hydrology, TerrainGenerator, TerrainSample};
