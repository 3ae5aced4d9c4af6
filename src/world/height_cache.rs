use std::collections::VecDeque;
use std::sync::Arc;

use glam::DVec3;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;
use crate::constants::{cache, heights};
use crate::error::{TerrainError, TerrainResult};
use crate::world::generation::SharedHeightProvider;
use crate::world::{CacheKey, WorldCoord};

/// Largest grid `preload_region` will issue in one call
const MAX_PRELOAD_QUERIES: usize = 4 * 1024 * 1024;

/// Statistics about cache performance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Clone, Copy)]
struct CachedHeight {
    height: f64,
    stamp: u64,
}

/// Grid-snapped LRU cache in front of a `HeightProvider`.
///
/// Every query is snapped to the cache grid and the provider is evaluated at
/// the snapped position, so a key always maps to the same height no matter
/// which nearby query populated it. Hits are promoted; eviction removes the
/// least recently *used* entry.
///
/// Not thread-safe on its own: confine it to one thread or wrap it in
/// [`SharedHeightCache`].
pub struct HeightQueryCache {
    provider: SharedHeightProvider,
    entries: HashMap<CacheKey, CachedHeight>,
    /// Recency queue of (key, stamp). Entries whose stamp no longer matches
    /// the map are stale and skipped on eviction.
    lru: VecDeque<(CacheKey, u64)>,
    stamp: u64,
    max_size: usize,
    grid_resolution: f64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl HeightQueryCache {
    pub fn new(provider: SharedHeightProvider, max_size: usize) -> Self {
        Self::with_resolution(provider, max_size, cache::DEFAULT_GRID_RESOLUTION)
    }

    pub fn from_config(provider: SharedHeightProvider, config: &CacheConfig) -> Self {
        Self::with_resolution(provider, config.capacity, config.grid_resolution)
    }

    fn with_resolution(provider: SharedHeightProvider, max_size: usize, grid_resolution: f64) -> Self {
        let grid_resolution = if grid_resolution.is_finite() && grid_resolution > 0.0 {
            grid_resolution
        } else {
            log::warn!(
                "[HeightQueryCache] Invalid grid resolution {}, using {}",
                grid_resolution,
                cache::DEFAULT_GRID_RESOLUTION
            );
            cache::DEFAULT_GRID_RESOLUTION
        };

        Self {
            provider,
            entries: HashMap::default(),
            lru: VecDeque::new(),
            stamp: 0,
            max_size: max_size.max(1),
            grid_resolution,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn provider(&self) -> &SharedHeightProvider {
        &self.provider
    }

    pub fn grid_resolution(&self) -> f64 {
        self.grid_resolution
    }

    /// Terrain height at a world position. Never fails; non-finite
    /// coordinates are clamped into the world before snapping.
    pub fn height_at(&mut self, world_x: f64, world_z: f64) -> f64 {
        let coord = WorldCoord::new(world_x, world_z);
        let sanitized = coord.sanitized();
        if !coord.is_finite() {
            log::warn!(
                "[HeightQueryCache] Non-finite query ({}, {}) clamped to ({}, {})",
                world_x,
                world_z,
                sanitized.x,
                sanitized.z
            );
        }
        self.lookup(sanitized)
    }

    /// Strict variant of [`height_at`](Self::height_at) that rejects non-finite input
    pub fn try_height_at(&mut self, world_x: f64, world_z: f64) -> TerrainResult<f64> {
        let coord = WorldCoord::try_new(world_x, world_z)?;
        Ok(self.lookup(coord.sanitized()))
    }

    fn lookup(&mut self, coord: WorldCoord) -> f64 {
        let key = CacheKey::snap(coord, self.grid_resolution);

        self.stamp += 1;
        let stamp = self.stamp;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.stamp = stamp;
            let height = entry.height;
            self.hits += 1;
            self.lru.push_back((key, stamp));
            self.maybe_compact_lru();
            return height;
        }

        self.misses += 1;
        let snapped = key.to_world(self.grid_resolution);
        let height = self.provider.height_at(snapped.x, snapped.z);
        if !height.is_finite() {
            log::warn!(
                "[HeightQueryCache] {} returned {} at ({}, {}); not caching",
                self.provider.label(),
                height,
                snapped.x,
                snapped.z
            );
            return heights::MIN_HEIGHT;
        }

        self.entries.insert(key, CachedHeight { height, stamp });
        self.lru.push_back((key, stamp));
        self.evict_as_needed();
        height
    }

    fn evict_as_needed(&mut self) {
        while self.entries.len() > self.max_size {
            let Some((key, stamp)) = self.lru.pop_front() else { break; };

            let live = self.entries.get(&key).map(|e| e.stamp == stamp).unwrap_or(false);
            if !live {
                continue;
            }

            self.entries.remove(&key);
            self.evictions += 1;
        }
    }

    fn maybe_compact_lru(&mut self) {
        let max = self
            .entries
            .len()
            .saturating_mul(cache::LRU_COMPACTION_FACTOR)
            .max(cache::LRU_COMPACTION_MIN);
        if self.lru.len() <= max {
            return;
        }

        let mut live: Vec<(CacheKey, u64)> = self.entries.iter().map(|(k, e)| (*k, e.stamp)).collect();
        live.sort_unstable_by_key(|&(_, stamp)| stamp);
        self.lru = live.into();
    }

    /// Unit surface normal by central differences over four neighbouring heights.
    ///
    /// The distance is raised to at least one grid cell, and each gradient is
    /// taken over the separation of the snapped sample positions actually read.
    pub fn normal_at(&mut self, world_x: f64, world_z: f64, sample_distance: f64) -> DVec3 {
        let d = if sample_distance.is_finite() && sample_distance > 0.0 {
            sample_distance
        } else {
            cache::DEFAULT_NORMAL_SAMPLE_DISTANCE
        };
        let d = d.max(self.grid_resolution);
        let center = WorldCoord::new(world_x, world_z).sanitized();

        let left = self.snapped(center.x - d, center.z);
        let right = self.snapped(center.x + d, center.z);
        let down = self.snapped(center.x, center.z - d);
        let up = self.snapped(center.x, center.z + d);

        let dh_dx = self.gradient(left, right, right.x - left.x);
        let dh_dz = self.gradient(down, up, up.z - down.z);

        DVec3::new(-dh_dx, 1.0, -dh_dz).try_normalize().unwrap_or(DVec3::Y)
    }

    /// Cell position a query at (x, z) is answered from
    fn snapped(&self, world_x: f64, world_z: f64) -> WorldCoord {
        CacheKey::snap(WorldCoord::new(world_x, world_z).sanitized(), self.grid_resolution)
            .to_world(self.grid_resolution)
    }

    fn gradient(&mut self, from: WorldCoord, to: WorldCoord, separation: f64) -> f64 {
        if separation <= 0.0 {
            return 0.0;
        }
        let rise = self.height_at(to.x, to.z) - self.height_at(from.x, from.z);
        rise / separation
    }

    /// 0 for flat ground, 1 for a vertical wall
    pub fn slope_at(&mut self, world_x: f64, world_z: f64) -> f64 {
        let normal = self.normal_at(world_x, world_z, cache::DEFAULT_NORMAL_SAMPLE_DISTANCE);
        (1.0 - normal.y).clamp(0.0, 1.0)
    }

    pub fn is_underwater(&mut self, world_x: f64, world_z: f64) -> bool {
        self.height_at(world_x, world_z) < heights::SEA_LEVEL
    }

    /// Drop every cached height
    pub fn clear_cache(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        log::debug!("[HeightQueryCache] Cleared {} cached heights", dropped);
    }

    /// Swap the height source. The whole cache is purged in the same call so
    /// no height from the old provider survives.
    pub fn set_provider(&mut self, provider: SharedHeightProvider) {
        log::info!(
            "[HeightQueryCache] Provider changed: {} -> {}",
            self.provider.label(),
            provider.label()
        );
        self.provider = provider;
        self.clear_cache();
    }

    /// Warm the cache with a square grid of queries around a point.
    /// Returns the number of queries issued.
    pub fn preload_region(
        &mut self,
        center_x: f64,
        center_z: f64,
        radius: f64,
        resolution: f64,
    ) -> TerrainResult<usize> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(TerrainError::InvalidPreload {
                reason: format!("resolution must be positive, got {}", resolution),
            });
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(TerrainError::InvalidPreload {
                reason: format!("radius must be non-negative, got {}", radius),
            });
        }

        let steps = (2.0 * radius / resolution).floor() as usize + 1;
        let total = steps.saturating_mul(steps);
        if total > MAX_PRELOAD_QUERIES {
            return Err(TerrainError::InvalidPreload {
                reason: format!("{} queries exceeds the limit of {}", total, MAX_PRELOAD_QUERIES),
            });
        }
        if total > self.max_size {
            log::warn!(
                "[HeightQueryCache] Preload of {} queries exceeds capacity {}; early samples will be evicted",
                total,
                self.max_size
            );
        }

        let start_x = center_x - radius;
        let start_z = center_z - radius;
        for row in 0..steps {
            let z = start_z + row as f64 * resolution;
            for col in 0..steps {
                let x = start_x + col as f64 * resolution;
                self.height_at(x, z);
            }
        }

        log::debug!(
            "[HeightQueryCache] Preloaded {} queries around ({}, {}), {} cached",
            total,
            center_x,
            center_z,
            self.entries.len()
        );
        Ok(total)
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    /// Nearest dry, gentle position to `center`, searched on square rings of
    /// `step` spacing out to `max_radius`. Used for spawn placement.
    pub fn find_dry_land(
        &mut self,
        center: WorldCoord,
        max_radius: f64,
        step: f64,
        max_slope: f64,
    ) -> Option<WorldCoord> {
        if !step.is_finite() || step <= 0.0 || !max_radius.is_finite() || max_radius < 0.0 {
            return None;
        }
        let center = center.sanitized();
        let rings = (max_radius / step).floor() as i64;

        for ring in 0..=rings {
            for (dx, dz) in ring_offsets(ring) {
                let candidate = WorldCoord::new(center.x + dx as f64 * step, center.z + dz as f64 * step);
                if self.is_underwater(candidate.x, candidate.z) {
                    continue;
                }
                if self.slope_at(candidate.x, candidate.z) <= max_slope {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Grid offsets on the perimeter of the square ring at Chebyshev distance `ring`
fn ring_offsets(ring: i64) -> Vec<(i64, i64)> {
    if ring == 0 {
        return vec![(0, 0)];
    }
    let mut offsets = Vec::with_capacity((ring * 8) as usize);
    for i in -ring..=ring {
        offsets.push((i, -ring));
        offsets.push((i, ring));
    }
    for i in (-ring + 1)..ring {
        offsets.push((-ring, i));
        offsets.push((ring, i));
    }
    offsets
}

/// Lock-protected cache handle for consumers on other threads. LRU
/// promotion writes on every read, so a plain `RwLock` would not help.
#[derive(Clone)]
pub struct SharedHeightCache {
    inner: Arc<Mutex<HeightQueryCache>>,
}

impl SharedHeightCache {
    pub fn new(cache: HeightQueryCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Hold the lock across a batch of queries
    pub fn lock(&self) -> MutexGuard<'_, HeightQueryCache> {
        self.inner.lock()
    }

    pub fn height_at(&self, world_x: f64, world_z: f64) -> f64 {
        self.inner.lock().height_at(world_x, world_z)
    }

    pub fn normal_at(&self, world_x: f64, world_z: f64, sample_distance: f64) -> DVec3 {
        self.inner.lock().normal_at(world_x, world_z, sample_distance)
    }

    pub fn slope_at(&self, world_x: f64, world_z: f64) -> f64 {
        self.inner.lock().slope_at(world_x, world_z)
    }

    pub fn is_underwater(&self, world_x: f64, world_z: f64) -> bool {
        self.inner.lock().is_underwater(world_x, world_z)
    }

    pub fn clear_cache(&self) {
        self.inner.lock().clear_cache()
    }

    pub fn set_provider(&self, provider: SharedHeightProvider) {
        self.inner.lock().set_provider(provider)
    }

    /// Runs the whole preload under one lock so a concurrent provider swap
    /// cannot interleave with it.
    pub fn preload_region(
        &self,
        center_x: f64,
        center_z: f64,
        radius: f64,
        resolution: f64,
    ) -> TerrainResult<usize> {
        self.inner.lock().preload_region(center_x, center_z, radius, resolution)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.lock().cache_stats()
    }
}
