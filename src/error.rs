//! Terrain error handling
//!
//! Height evaluation itself is infallible arithmetic. Errors only surface at
//! the edges: strict coordinate validation, configuration, DEM import and
//! preload requests.

/// Terrain-wide result type
pub type TerrainResult<T> = Result<T, TerrainError>;

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("Non-finite coordinate: ({x}, {z})")]
    NonFiniteCoordinate { x: f64, z: f64 },

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Invalid preload request: {reason}")]
    InvalidPreload { reason: String },

    #[error("Elevation grid error: {reason}")]
    ElevationGrid { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl TerrainError {
    pub(crate) fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        TerrainError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
