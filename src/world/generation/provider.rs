//! Height sources
//!
//! Caches and streamers only talk to `HeightProvider`. The procedural
//! generator is the default; a pre-authored elevation grid (DEM) can stand in
//! for scripted scenarios without touching consumer code.

use std::path::Path;
use std::sync::Arc;

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use super::TerrainGenerator;
use crate::config::{ProviderConfig, TerrainConfig};
use crate::error::{TerrainError, TerrainResult};
use crate::world::WorldCoord;

/// Anything that can answer "how high is the ground here"
pub trait HeightProvider: Send + Sync {
    /// Ground height at a finite world position
    fn height_at(&self, world_x: f64, world_z: f64) -> f64;

    /// Short label for logs
    fn label(&self) -> String {
        "height provider".to_string()
    }
}

impl HeightProvider for TerrainGenerator {
    #[inline]
    fn height_at(&self, world_x: f64, world_z: f64) -> f64 {
        self.evaluate(world_x, world_z)
    }

    fn label(&self) -> String {
        format!("procedural terrain (seed {})", self.seed())
    }
}

/// Shared provider handle used by the cache and the streamer
pub type SharedHeightProvider = Arc<dyn HeightProvider>;

/// Build the height source selected by `config.provider`
pub fn provider_from_config(config: &TerrainConfig) -> TerrainResult<SharedHeightProvider> {
    match &config.provider {
        ProviderConfig::Procedural => Ok(Arc::new(TerrainGenerator::new(config.seed))),
        ProviderConfig::ElevationGrid {
            path,
            origin,
            cell_size,
            min_height,
            max_height,
        } => {
            let grid = ElevationGrid::from_image_path(
                path,
                WorldCoord::new(origin[0], origin[1]),
                *cell_size,
                *min_height,
                *max_height,
            )?;
            Ok(Arc::new(grid))
        }
    }
}

/// Pre-authored elevation grid, sampled bilinearly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationGrid {
    width: usize,
    depth: usize,
    /// World position of sample (0, 0)
    origin: WorldCoord,
    /// World units between adjacent samples
    cell_size: f64,
    /// Row-major, `depth` rows of `width` samples
    samples: Vec<f32>,
}

impl ElevationGrid {
    pub fn new(
        width: usize,
        depth: usize,
        origin: WorldCoord,
        cell_size: f64,
        samples: Vec<f32>,
    ) -> TerrainResult<Self> {
        let grid = Self {
            width,
            depth,
            origin,
            cell_size,
            samples,
        };
        grid.validate()?;
        Ok(grid)
    }

    fn validate(&self) -> TerrainResult<()> {
        if self.width == 0 || self.depth == 0 {
            return Err(TerrainError::ElevationGrid {
                reason: format!("empty grid {}x{}", self.width, self.depth),
            });
        }
        let expected = self.width.checked_mul(self.depth).ok_or_else(|| TerrainError::ElevationGrid {
            reason: format!("grid {}x{} is too large", self.width, self.depth),
        })?;
        if self.samples.len() != expected {
            return Err(TerrainError::ElevationGrid {
                reason: format!(
                    "expected {} samples for {}x{}, got {}",
                    expected,
                    self.width,
                    self.depth,
                    self.samples.len()
                ),
            });
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(TerrainError::ElevationGrid {
                reason: format!("cell size must be positive, got {}", self.cell_size),
            });
        }
        if !self.origin.is_finite() {
            return Err(TerrainError::ElevationGrid {
                reason: "origin must be finite".to_string(),
            });
        }
        if let Some(bad) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(TerrainError::ElevationGrid {
                reason: format!("sample {} is not finite", bad),
            });
        }
        Ok(())
    }

    /// Build from a 16-bit grayscale image; black maps to `min_height`, white to `max_height`
    pub fn from_luma16(
        image: &ImageBuffer<Luma<u16>, Vec<u16>>,
        origin: WorldCoord,
        cell_size: f64,
        min_height: f32,
        max_height: f32,
    ) -> TerrainResult<Self> {
        let (width, depth) = image.dimensions();
        let range = max_height - min_height;
        let samples = image
            .pixels()
            .map(|p| min_height + range * (p.0[0] as f32 / u16::MAX as f32))
            .collect();
        Self::new(width as usize, depth as usize, origin, cell_size, samples)
    }

    /// Load a grayscale heightmap image from disk
    pub fn from_image_path(
        path: impl AsRef<Path>,
        origin: WorldCoord,
        cell_size: f64,
        min_height: f32,
        max_height: f32,
    ) -> TerrainResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)?.to_luma16();
        let grid = Self::from_luma16(&image, origin, cell_size, min_height, max_height)?;
        log::info!(
            "[ElevationGrid] Loaded {} ({}x{} samples, {} units/cell)",
            path.display(),
            grid.width,
            grid.depth,
            cell_size
        );
        Ok(grid)
    }

    pub fn from_bincode(bytes: &[u8]) -> TerrainResult<Self> {
        let grid: ElevationGrid = bincode::deserialize(bytes)?;
        grid.validate()?;
        Ok(grid)
    }

    pub fn to_bincode(&self) -> TerrainResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.depth)
    }

    #[inline]
    fn sample(&self, col: usize, row: usize) -> f64 {
        self.samples[row * self.width + col] as f64
    }

    /// Bilinear lookup; positions outside the grid clamp to the edge
    pub fn interpolate(&self, world_x: f64, world_z: f64) -> f64 {
        let max_col = (self.width - 1) as f64;
        let max_row = (self.depth - 1) as f64;
        let gx = ((world_x - self.origin.x) / self.cell_size).clamp(0.0, max_col);
        let gz = ((world_z - self.origin.z) / self.cell_size).clamp(0.0, max_row);

        let col0 = gx.floor() as usize;
        let row0 = gz.floor() as usize;
        let col1 = (col0 + 1).min(self.width - 1);
        let row1 = (row0 + 1).min(self.depth - 1);
        let tx = gx - col0 as f64;
        let tz = gz - row0 as f64;

        let top = self.sample(col0, row0) * (1.0 - tx) + self.sample(col1, row0) * tx;
        let bottom = self.sample(col0, row1) * (1.0 - tx) + self.sample(col1, row1) * tx;
        top * (1.0 - tz) + bottom * tz
    }
}

impl HeightProvider for ElevationGrid {
    fn height_at(&self, world_x: f64, world_z: f64) -> f64 {
        self.interpolate(world_x, world_z)
    }

    fn label(&self) -> String {
        format!("elevation grid {}x{}", self.width, self.depth)
    }
}
