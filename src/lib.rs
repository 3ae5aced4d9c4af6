//! Procedural terrain heights for gameplay and rendering.
//!
//! One height function feeds two consumers: a grid-snapped LRU cache for CPU
//! queries (spawn placement, footsteps, AI) and a streamed heightmap tile that
//! the GPU samples for mesh displacement. Both evaluate the same provider, so
//! what the player sees is what physics stands on.

pub mod config;
pub mod constants;
pub mod error;
pub mod world;
pub mod world_gpu;

pub use config::{CacheConfig, HeightmapConfig, ProviderConfig, TerrainConfig};
pub use error::{TerrainError, TerrainResult};
pub use world::{
    CacheKey, CacheStats, ElevationGrid, HeightProvider, HeightQueryCache, Hydrology,
    SharedHeightCache, SharedHeightProvider, TerrainGenerator, TerrainSample, WorldCoord,
};
pub use world_gpu::{
    HeightmapStreamer, HeightmapTexture, HeightmapTile, HeightmapUniforms, LodRingMesh,
    LodRingParams, RegenerationReason,
};

/// Terrain height system for one world: provider, query cache and heightmap
/// streamer built from a single config. Consumers receive the cache handle
/// explicitly instead of reaching for a global.
pub struct TerrainSystem {
    config: TerrainConfig,
    provider: SharedHeightProvider,
    cache: SharedHeightCache,
    streamer: HeightmapStreamer,
}

impl TerrainSystem {
    /// Height source chosen by `config.provider`, tile centred on the origin
    pub fn new(config: TerrainConfig) -> TerrainResult<Self> {
        config.validate()?;
        let provider = world::provider_from_config(&config)?;
        Self::with_provider(config, provider, WorldCoord::ORIGIN)
    }

    /// Any provider, tile centred on `spawn`
    pub fn with_provider(
        config: TerrainConfig,
        provider: SharedHeightProvider,
        spawn: WorldCoord,
    ) -> TerrainResult<Self> {
        config.validate()?;

        let cache = SharedHeightCache::new(HeightQueryCache::from_config(
            provider.clone(),
            &config.cache,
        ));
        let streamer = HeightmapStreamer::new_at(provider.clone(), &config.heightmap, spawn);

        log::info!(
            "[TerrainSystem] Ready: {}, cache capacity {}, tile {}x{} @ {} units/texel",
            provider.label(),
            config.cache.capacity,
            config.heightmap.size,
            config.heightmap.size,
            config.heightmap.texel_scale
        );

        Ok(Self {
            config,
            provider,
            cache,
            streamer,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn provider(&self) -> &SharedHeightProvider {
        &self.provider
    }

    /// Cache handle to pass to gameplay consumers
    pub fn cache(&self) -> SharedHeightCache {
        self.cache.clone()
    }

    pub fn streamer(&self) -> &HeightmapStreamer {
        &self.streamer
    }

    pub fn streamer_mut(&mut self) -> &mut HeightmapStreamer {
        &mut self.streamer
    }

    /// Per-frame hook: keep the tile around the camera
    pub fn update(&mut self, viewpoint: WorldCoord) -> Option<RegenerationReason> {
        self.streamer.maybe_regenerate(viewpoint)
    }

    /// Swap the height source for both the cache and the tile
    pub fn set_provider(&mut self, provider: SharedHeightProvider) {
        self.provider = provider.clone();
        self.cache.set_provider(provider.clone());
        self.streamer.set_provider(provider);
    }
}
