//! Terrain configuration
//!
//! Loaded from TOML; every field has a default so a partial file (or an
//! empty one) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{cache, heightmap};
use crate::error::{TerrainError, TerrainResult};

/// Top-level terrain configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World seed; one seed fully determines the height field
    pub seed: u32,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub heightmap: HeightmapConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            heightmap: HeightmapConfig::default(),
        }
    }
}

/// Which height source the world uses
///
/// ```toml
/// [provider]
/// kind = "elevation_grid"
/// path = "dem.png"
/// cell_size = 2.0
/// min_height = -8.0
/// max_height = 150.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Noise terrain from `seed`
    #[default]
    Procedural,
    /// 16-bit grayscale DEM image, black = `min_height`, white = `max_height`
    ElevationGrid {
        path: PathBuf,
        /// World position of the top-left sample
        #[serde(default)]
        origin: [f64; 2],
        cell_size: f64,
        min_height: f32,
        max_height: f32,
    },
}

/// Height query cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached heights
    pub capacity: usize,
    /// Grid resolution queries snap to (world units)
    pub grid_resolution: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: cache::DEFAULT_CAPACITY,
            grid_resolution: cache::DEFAULT_GRID_RESOLUTION,
        }
    }
}

/// Heightmap streaming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightmapConfig {
    /// Texels per side
    pub size: u32,
    /// World units per texel
    pub texel_scale: f64,
    /// Viewpoint drift that triggers regeneration (world units)
    pub regen_distance: f64,
    /// Fill tile rows on the rayon pool. Regeneration still blocks the caller.
    pub parallel_fill: bool,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            size: heightmap::DEFAULT_SIZE,
            texel_scale: heightmap::DEFAULT_TEXEL_SCALE,
            regen_distance: heightmap::DEFAULT_REGEN_DISTANCE,
            parallel_fill: false,
        }
    }
}

impl HeightmapConfig {
    /// World-space width covered by one tile
    pub fn world_extent(&self) -> f64 {
        self.size as f64 * self.texel_scale
    }
}

impl TerrainConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> TerrainResult<Self> {
        let config: TerrainConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> TerrainResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        log::info!(
            "[TerrainConfig] Loaded {} (seed {}, cache {}, tile {}x{})",
            path.display(),
            config.seed,
            config.cache.capacity,
            config.heightmap.size,
            config.heightmap.size
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> TerrainResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> TerrainResult<()> {
        self.provider.validate()?;
        self.cache.validate()?;
        self.heightmap.validate()
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> TerrainResult<()> {
        let ProviderConfig::ElevationGrid {
            origin,
            cell_size,
            min_height,
            max_height,
            ..
        } = self
        else {
            return Ok(());
        };

        if !origin.iter().all(|c| c.is_finite()) {
            return Err(TerrainError::invalid_config(
                "provider.origin",
                format!("must be finite, got {:?}", origin),
            ));
        }
        if !cell_size.is_finite() || *cell_size <= 0.0 {
            return Err(TerrainError::invalid_config(
                "provider.cell_size",
                format!("must be positive and finite, got {}", cell_size),
            ));
        }
        if !min_height.is_finite() || !max_height.is_finite() || min_height >= max_height {
            return Err(TerrainError::invalid_config(
                "provider.max_height",
                format!(
                    "height range must be finite with min < max, got {}..{}",
                    min_height, max_height
                ),
            ));
        }
        Ok(())
    }
}

impl CacheConfig {
    pub fn validate(&self) -> TerrainResult<()> {
        if self.capacity == 0 {
            return Err(TerrainError::invalid_config(
                "cache.capacity",
                "must be greater than zero",
            ));
        }
        if !self.grid_resolution.is_finite() || self.grid_resolution <= 0.0 {
            return Err(TerrainError::invalid_config(
                "cache.grid_resolution",
                format!("must be positive and finite, got {}", self.grid_resolution),
            ));
        }
        Ok(())
    }
}

impl HeightmapConfig {
    pub fn validate(&self) -> TerrainResult<()> {
        if self.size < 2 || self.size % 2 != 0 {
            return Err(TerrainError::invalid_config(
                "heightmap.size",
                format!("must be an even number >= 2, got {}", self.size),
            ));
        }
        if !self.texel_scale.is_finite() || self.texel_scale <= 0.0 {
            return Err(TerrainError::invalid_config(
                "heightmap.texel_scale",
                format!("must be positive and finite, got {}", self.texel_scale),
            ));
        }
        if !self.regen_distance.is_finite() || self.regen_distance < 0.0 {
            return Err(TerrainError::invalid_config(
                "heightmap.regen_distance",
                format!("must be non-negative and finite, got {}", self.regen_distance),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_constants() {
        let config = TerrainConfig::default();
        assert_eq!(config.seed, 12345);
        assert_eq!(config.cache.capacity, 10_000);
        assert_eq!(config.cache.grid_resolution, 0.5);
        assert_eq!(config.heightmap.size, 512);
        assert_eq!(config.heightmap.texel_scale, 4.0);
        assert_eq!(config.heightmap.regen_distance, 32.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TerrainConfig::from_toml_str(
            r#"
            seed = 7
            [heightmap]
            size = 128
            "#,
        )
        .expect("Partial config should parse");

        assert_eq!(config.seed, 7);
        assert_eq!(config.heightmap.size, 128);
        assert_eq!(config.heightmap.texel_scale, 4.0);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_capacity = TerrainConfig::from_toml_str("[cache]\ncapacity = 0\n");
        assert!(matches!(
            zero_capacity,
            Err(TerrainError::InvalidConfig { ref field, .. }) if field == "cache.capacity"
        ));

        let odd_size = TerrainConfig::from_toml_str("[heightmap]\nsize = 511\n");
        assert!(matches!(odd_size, Err(TerrainError::InvalidConfig { .. })));

        let bad_resolution = TerrainConfig::from_toml_str("[cache]\ngrid_resolution = -1.0\n");
        assert!(matches!(bad_resolution, Err(TerrainError::InvalidConfig { .. })));

        let garbage = TerrainConfig::from_toml_str("seed = \"not a number\"");
        assert!(matches!(garbage, Err(TerrainError::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory for test");
        let path = temp_dir.path().join("terrain.toml");

        let mut config = TerrainConfig::default();
        config.seed = 99;
        config.cache.capacity = 256;
        let text = config.to_toml_string().expect("Failed to serialize config");
        std::fs::write(&path, text).expect("Failed to write config file");

        let loaded = TerrainConfig::load(&path).expect("Failed to load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory for test");
        let result = TerrainConfig::load(temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(TerrainError::Io(_))));
    }

    #[test]
    fn test_provider_defaults_to_procedural() {
        let config = TerrainConfig::from_toml_str("seed = 3\n").expect("Minimal config should parse");
        assert_eq!(config.provider, ProviderConfig::Procedural);

        let text = TerrainConfig::default()
            .to_toml_string()
            .expect("Failed to serialize config");
        let reparsed = TerrainConfig::from_toml_str(&text).expect("Serialized config should parse");
        assert_eq!(reparsed.provider, ProviderConfig::Procedural);
    }

    #[test]
    fn test_elevation_grid_provider_section() {
        let config = TerrainConfig::from_toml_str(
            r#"
            [provider]
            kind = "elevation_grid"
            path = "maps/dem.png"
            cell_size = 2.0
            min_height = -8.0
            max_height = 150.0
            "#,
        )
        .expect("Elevation grid config should parse");

        assert_eq!(
            config.provider,
            ProviderConfig::ElevationGrid {
                path: PathBuf::from("maps/dem.png"),
                origin: [0.0, 0.0],
                cell_size: 2.0,
                min_height: -8.0,
                max_height: 150.0,
            }
        );

        let inverted = TerrainConfig::from_toml_str(
            r#"
            [provider]
            kind = "elevation_grid"
            path = "dem.png"
            cell_size = 2.0
            min_height = 10.0
            max_height = 10.0
            "#,
        );
        assert!(matches!(
            inverted,
            Err(TerrainError::InvalidConfig { ref field, .. }) if field == "provider.max_height"
        ));

        let unknown = TerrainConfig::from_toml_str("[provider]\nkind = \"voxels\"\n");
        assert!(matches!(unknown, Err(TerrainError::ConfigParse(_))));
    }

    #[test]
    fn test_world_extent() {
        let config = HeightmapConfig::default();
        assert_eq!(config.world_extent(), 2048.0);
    }
}
