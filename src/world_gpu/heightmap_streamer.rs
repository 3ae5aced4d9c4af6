//! Heightmap tile streaming
//!
//! Keeps a fixed-size grid of heights centred on a moving viewpoint. The tile
//! is a snapshot: it is overwritten in place whenever the viewpoint drifts too
//! far, and is otherwise left untouched. Regeneration evaluates the same
//! `HeightProvider` the query cache uses, so texels and cached heights agree.

use std::time::{Duration, Instant};

use image::{ImageBuffer, Luma};
use rayon::prelude::*;

use super::heightmap_texture::HeightmapUniforms;
use crate::config::HeightmapConfig;
use crate::constants::heightmap;
use crate::world::{HeightProvider, SharedHeightProvider, WorldCoord};

/// Why a tile was regenerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationReason {
    /// Viewpoint drifted past the regeneration threshold
    Drift,
    /// Viewpoint left the area the tile covers (teleport, respawn)
    OutOfCoverage,
    /// Explicit request or provider swap
    Forced,
}

/// Dense square grid of heights around a centre point
pub struct HeightmapTile {
    size: u32,
    texel_scale: f64,
    center: WorldCoord,
    /// Row-major; row index follows +z, column index follows +x
    heights: Vec<f32>,
}

impl HeightmapTile {
    /// Odd sizes round up to the next even size so the texel under the
    /// centre sits at `size / 2` on both the CPU and the GPU.
    pub fn new(size: u32, texel_scale: f64) -> Self {
        let even_size = size.max(2).saturating_add(1) & !1;
        if even_size != size {
            log::warn!(
                "[HeightmapTile] Tile size {} is not an even number >= 2; using {}",
                size,
                even_size
            );
        }
        let texel_scale = if texel_scale.is_finite() && texel_scale > 0.0 {
            texel_scale
        } else {
            log::warn!(
                "[HeightmapTile] Invalid texel scale {}, using {}",
                texel_scale,
                heightmap::DEFAULT_TEXEL_SCALE
            );
            heightmap::DEFAULT_TEXEL_SCALE
        };
        let size = even_size;
        Self {
            size,
            texel_scale,
            center: WorldCoord::ORIGIN,
            heights: vec![0.0; (size as usize) * (size as usize)],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn texel_scale(&self) -> f64 {
        self.texel_scale
    }

    pub fn center(&self) -> WorldCoord {
        self.center
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Raw bytes for an R32Float texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.heights)
    }

    /// Distance from the centre to the tile edge (world units)
    pub fn half_extent(&self) -> f64 {
        (self.size / 2) as f64 * self.texel_scale
    }

    /// World position sampled by texel (col, row)
    pub fn texel_world_position(&self, col: u32, row: u32) -> WorldCoord {
        let half = (self.size / 2) as f64;
        WorldCoord::new(
            self.center.x + (col as f64 - half) * self.texel_scale,
            self.center.z + (row as f64 - half) * self.texel_scale,
        )
    }

    /// Continuous texel coordinates of a world position
    pub fn world_to_texel(&self, world_x: f64, world_z: f64) -> (f64, f64) {
        let half = (self.size / 2) as f64;
        (
            (world_x - self.center.x) / self.texel_scale + half,
            (world_z - self.center.z) / self.texel_scale + half,
        )
    }

    /// True when the position lies inside the sampled grid
    pub fn covers(&self, world_x: f64, world_z: f64) -> bool {
        let (gx, gz) = self.world_to_texel(world_x, world_z);
        let max = (self.size - 1) as f64;
        (0.0..=max).contains(&gx) && (0.0..=max).contains(&gz)
    }

    #[inline]
    pub fn texel(&self, col: u32, row: u32) -> f32 {
        self.heights[(row * self.size + col) as usize]
    }

    /// Height of the texel nearest to a world position
    pub fn sample_nearest(&self, world_x: f64, world_z: f64) -> Option<f32> {
        if !self.covers(world_x, world_z) {
            return None;
        }
        let (gx, gz) = self.world_to_texel(world_x, world_z);
        Some(self.texel(gx.round() as u32, gz.round() as u32))
    }

    /// Bilinear height between texels; what the vertex shader reconstructs
    pub fn sample_bilinear(&self, world_x: f64, world_z: f64) -> Option<f64> {
        if !self.covers(world_x, world_z) {
            return None;
        }
        let (gx, gz) = self.world_to_texel(world_x, world_z);
        let col0 = gx.floor() as u32;
        let row0 = gz.floor() as u32;
        let col1 = (col0 + 1).min(self.size - 1);
        let row1 = (row0 + 1).min(self.size - 1);
        let tx = gx - col0 as f64;
        let tz = gz - row0 as f64;

        let top = self.texel(col0, row0) as f64 * (1.0 - tx) + self.texel(col1, row0) as f64 * tx;
        let bottom = self.texel(col0, row1) as f64 * (1.0 - tx) + self.texel(col1, row1) as f64 * tx;
        Some(top * (1.0 - tz) + bottom * tz)
    }

    /// Overwrite every texel from the provider around a new centre
    fn fill(&mut self, provider: &dyn HeightProvider, center: WorldCoord, parallel: bool) {
        self.center = center;
        let size = self.size as usize;
        let half = (self.size / 2) as f64;
        let scale = self.texel_scale;

        let fill_row = |row: usize, line: &mut [f32]| {
            let world_z = center.z + (row as f64 - half) * scale;
            for (col, texel) in line.iter_mut().enumerate() {
                let world_x = center.x + (col as f64 - half) * scale;
                *texel = provider.height_at(world_x, world_z) as f32;
            }
        };

        if parallel {
            self.heights
                .par_chunks_mut(size)
                .enumerate()
                .for_each(|(row, line)| fill_row(row, line));
        } else {
            self.heights
                .chunks_mut(size)
                .enumerate()
                .for_each(|(row, line)| fill_row(row, line));
        }
    }

    /// 16-bit grayscale preview; `min_height` maps to black, `max_height` to white
    pub fn to_image(&self, min_height: f32, max_height: f32) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        let range = (max_height - min_height).max(f32::EPSILON);
        ImageBuffer::from_fn(self.size, self.size, |col, row| {
            let t = ((self.texel(col, row) - min_height) / range).clamp(0.0, 1.0);
            Luma([(t * u16::MAX as f32).round() as u16])
        })
    }
}

/// Regenerates a `HeightmapTile` as the viewpoint moves
pub struct HeightmapStreamer {
    provider: SharedHeightProvider,
    tile: HeightmapTile,
    regen_distance: f64,
    parallel_fill: bool,
    dirty: bool,
    regenerations: u64,
    last_regeneration: Duration,
}

impl HeightmapStreamer {
    /// Build a streamer with its tile filled around the origin
    pub fn new(provider: SharedHeightProvider, config: &HeightmapConfig) -> Self {
        Self::new_at(provider, config, WorldCoord::ORIGIN)
    }

    /// Build a streamer with its tile filled around `center` (e.g. spawn)
    pub fn new_at(provider: SharedHeightProvider, config: &HeightmapConfig, center: WorldCoord) -> Self {
        let mut streamer = Self {
            provider,
            tile: HeightmapTile::new(config.size, config.texel_scale),
            regen_distance: config.regen_distance.max(0.0),
            parallel_fill: config.parallel_fill,
            dirty: false,
            regenerations: 0,
            last_regeneration: Duration::ZERO,
        };
        streamer.regenerate(center.x, center.z);
        streamer
    }

    pub fn tile(&self) -> &HeightmapTile {
        &self.tile
    }

    pub fn center(&self) -> WorldCoord {
        self.tile.center
    }

    pub fn provider(&self) -> &SharedHeightProvider {
        &self.provider
    }

    /// Overwrite the whole tile around a new centre. O(size²) provider
    /// evaluations, run to completion before returning.
    pub fn regenerate(&mut self, center_x: f64, center_z: f64) {
        let center = WorldCoord::new(center_x, center_z).sanitized();
        let start = Instant::now();

        self.tile.fill(self.provider.as_ref(), center, self.parallel_fill);

        self.last_regeneration = start.elapsed();
        self.regenerations += 1;
        self.dirty = true;

        log::debug!(
            "[HeightmapStreamer] Regenerated {}x{} tile at ({:.1}, {:.1}) in {:.2?}",
            self.tile.size,
            self.tile.size,
            center.x,
            center.z,
            self.last_regeneration
        );
    }

    /// Regenerate if the viewpoint drifted past the threshold or left the
    /// tile entirely. Returns what triggered the regeneration, if anything.
    pub fn maybe_regenerate(&mut self, viewpoint: WorldCoord) -> Option<RegenerationReason> {
        let viewpoint = viewpoint.sanitized();
        let distance_sq = viewpoint.distance_squared_to(self.tile.center);
        let coverage = self.tile.half_extent();

        let reason = if distance_sq > coverage * coverage {
            RegenerationReason::OutOfCoverage
        } else if distance_sq > self.regen_distance * self.regen_distance {
            RegenerationReason::Drift
        } else {
            return None;
        };

        if reason == RegenerationReason::OutOfCoverage {
            log::info!(
                "[HeightmapStreamer] Viewpoint ({:.1}, {:.1}) left tile at ({:.1}, {:.1}); regenerating",
                viewpoint.x,
                viewpoint.z,
                self.tile.center.x,
                self.tile.center.z
            );
        }

        self.regenerate(viewpoint.x, viewpoint.z);
        Some(reason)
    }

    /// Swap the height source and rebuild the tile in place
    pub fn set_provider(&mut self, provider: SharedHeightProvider) -> RegenerationReason {
        log::info!(
            "[HeightmapStreamer] Provider changed: {} -> {}",
            self.provider.label(),
            provider.label()
        );
        self.provider = provider;
        let center = self.tile.center;
        self.regenerate(center.x, center.z);
        RegenerationReason::Forced
    }

    /// Tile changed since the last GPU upload
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_uploaded(&mut self) {
        self.dirty = false;
    }

    pub fn regeneration_count(&self) -> u64 {
        self.regenerations
    }

    pub fn last_regeneration_time(&self) -> Duration {
        self.last_regeneration
    }

    /// Shader parameters matching the current tile
    pub fn uniforms(&self) -> HeightmapUniforms {
        HeightmapUniforms::from_tile(&self.tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::TerrainGenerator;
    use std::sync::Arc;

    struct PlaneProvider;

    impl HeightProvider for PlaneProvider {
        fn height_at(&self, world_x: f64, world_z: f64) -> f64 {
            world_x * 0.5 - world_z
        }
    }

    fn small_config() -> HeightmapConfig {
        HeightmapConfig {
            size: 16,
            texel_scale: 2.0,
            regen_distance: 4.0,
            parallel_fill: false,
        }
    }

    #[test]
    fn test_odd_size_rounds_up_to_even() {
        let config = HeightmapConfig {
            size: 15,
            ..small_config()
        };
        let streamer = HeightmapStreamer::new_at(Arc::new(PlaneProvider), &config, WorldCoord::new(10.0, 6.0));
        let tile = streamer.tile();
        assert_eq!(tile.size(), 16);
        assert_eq!(tile.heights().len(), 16 * 16);

        // Centre texel lies exactly on the tile centre, as the shader's uv = 0.5 does
        let centre = tile.texel_world_position(8, 8);
        assert_eq!(centre, WorldCoord::new(10.0, 6.0));
        assert_eq!(streamer.uniforms().size, 16.0);
        assert_eq!(HeightmapTile::new(1, 1.0).size(), 2);
        assert_eq!(HeightmapTile::new(0, 1.0).size(), 2);
    }

    #[test]
    fn test_tile_texels_match_formula() {
        let streamer = HeightmapStreamer::new_at(
            Arc::new(PlaneProvider),
            &small_config(),
            WorldCoord::new(100.0, -50.0),
        );
        let tile = streamer.tile();

        for row in 0..16 {
            for col in 0..16 {
                let pos = tile.texel_world_position(col, row);
                assert_eq!(pos.x, 100.0 + (col as f64 - 8.0) * 2.0);
                assert_eq!(pos.z, -50.0 + (row as f64 - 8.0) * 2.0);
                assert_eq!(tile.texel(col, row), (pos.x * 0.5 - pos.z) as f32);
            }
        }
        assert!(streamer.is_dirty());
        assert_eq!(streamer.regeneration_count(), 1);
    }

    #[test]
    fn test_parallel_fill_matches_serial() {
        let provider: SharedHeightProvider = Arc::new(TerrainGenerator::new(12345));
        let serial = HeightmapStreamer::new_at(provider.clone(), &small_config(), WorldCoord::new(7.0, 3.0));
        let mut config = small_config();
        config.parallel_fill = true;
        let parallel = HeightmapStreamer::new_at(provider, &config, WorldCoord::new(7.0, 3.0));

        assert_eq!(serial.tile().heights(), parallel.tile().heights());
    }

    #[test]
    fn test_small_drift_does_not_regenerate() {
        let mut streamer = HeightmapStreamer::new(Arc::new(PlaneProvider), &small_config());
        streamer.mark_uploaded();

        assert_eq!(streamer.maybe_regenerate(WorldCoord::new(2.0, 2.0)), None);
        assert_eq!(streamer.maybe_regenerate(WorldCoord::new(4.0, 0.0)), None);
        assert!(!streamer.is_dirty());
        assert_eq!(streamer.regeneration_count(), 1);
    }

    #[test]
    fn test_drift_past_threshold_regenerates() {
        let mut streamer = HeightmapStreamer::new(Arc::new(PlaneProvider), &small_config());
        streamer.mark_uploaded();

        let reason = streamer.maybe_regenerate(WorldCoord::new(3.0, 3.0));
        assert_eq!(reason, Some(RegenerationReason::Drift));
        assert_eq!(streamer.center(), WorldCoord::new(3.0, 3.0));
        assert!(streamer.is_dirty());
        assert_eq!(streamer.regeneration_count(), 2);
    }

    #[test]
    fn test_teleport_forces_regeneration() {
        let mut config = small_config();
        // Threshold larger than the tile so only the coverage check can fire
        config.regen_distance = 1_000.0;
        let mut streamer = HeightmapStreamer::new(Arc::new(PlaneProvider), &config);

        assert_eq!(streamer.maybe_regenerate(WorldCoord::new(10.0, 0.0)), None);
        let reason = streamer.maybe_regenerate(WorldCoord::new(500.0, -500.0));
        assert_eq!(reason, Some(RegenerationReason::OutOfCoverage));
        assert!(streamer.tile().covers(500.0, -500.0));
    }

    #[test]
    fn test_tile_is_overwritten_in_place() {
        let mut streamer = HeightmapStreamer::new(Arc::new(PlaneProvider), &small_config());
        let before = streamer.tile().heights().as_ptr();
        streamer.regenerate(64.0, 64.0);
        assert_eq!(before, streamer.tile().heights().as_ptr());
    }

    #[test]
    fn test_sampling_and_coverage() {
        let streamer = HeightmapStreamer::new(Arc::new(PlaneProvider), &small_config());
        let tile = streamer.tile();

        assert!(tile.covers(0.0, 0.0));
        assert!(tile.covers(-16.0, 14.0));
        assert!(!tile.covers(16.0, 0.0));
        assert!(!tile.covers(0.0, -17.0));

        assert_eq!(tile.sample_nearest(4.0, 2.0), Some(0.0));
        assert_eq!(tile.sample_nearest(100.0, 0.0), None);

        let h = tile.sample_bilinear(3.0, 1.0).expect("Position inside tile");
        assert!((h - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_provider_swap_rebuilds_tile() {
        let mut streamer = HeightmapStreamer::new(Arc::new(PlaneProvider), &small_config());
        streamer.mark_uploaded();
        let old = streamer.tile().texel(0, 0);

        let reason = streamer.set_provider(Arc::new(TerrainGenerator::new(1)));
        assert_eq!(reason, RegenerationReason::Forced);
        assert!(streamer.is_dirty());
        assert_ne!(streamer.tile().texel(0, 0), old);
    }

    #[test]
    fn test_preview_image_dimensions() {
        let streamer = HeightmapStreamer::new(Arc::new(PlaneProvider), &small_config());
        let image = streamer.tile().to_image(-32.0, 32.0);
        assert_eq!(image.dimensions(), (16, 16));
    }
}
