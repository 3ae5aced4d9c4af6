use serde::{Deserialize, Serialize};

use crate::constants::world::MAX_WORLD_COORD;
use crate::error::{TerrainError, TerrainResult};

/// Planar world-space position (x, z)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldCoord {
    pub x: f64,
    pub z: f64,
}

impl WorldCoord {
    pub const ORIGIN: WorldCoord = WorldCoord { x: 0.0, z: 0.0 };

    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Strict constructor: rejects NaN and infinities
    pub fn try_new(x: f64, z: f64) -> TerrainResult<Self> {
        if x.is_finite() && z.is_finite() {
            Ok(Self { x, z })
        } else {
            Err(TerrainError::NonFiniteCoordinate { x, z })
        }
    }

    /// Forces the coordinate into the supported world extent.
    /// NaN maps to 0, infinities and huge values clamp to the world edge.
    pub fn sanitized(self) -> Self {
        Self {
            x: sanitize_axis(self.x),
            z: sanitize_axis(self.z),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }

    /// Squared planar distance to another position
    pub fn distance_squared_to(&self, other: WorldCoord) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }
}

impl From<(f64, f64)> for WorldCoord {
    fn from((x, z): (f64, f64)) -> Self {
        Self { x, z }
    }
}

fn sanitize_axis(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-MAX_WORLD_COORD, MAX_WORLD_COORD)
    }
}

/// World coordinate snapped to the cache grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub x: i64,
    pub z: i64,
}

impl CacheKey {
    /// Snap a finite coordinate to the nearest grid point
    pub fn snap(coord: WorldCoord, resolution: f64) -> Self {
        Self {
            x: (coord.x / resolution).round() as i64,
            z: (coord.z / resolution).round() as i64,
        }
    }

    /// World position of the grid point this key names
    pub fn to_world(&self, resolution: f64) -> WorldCoord {
        WorldCoord::new(self.x as f64 * resolution, self.z as f64 * resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_groups_nearby_queries() {
        let a = CacheKey::snap(WorldCoord::new(10.1, 20.1), 0.5);
        let b = CacheKey::snap(WorldCoord::new(10.2, 20.2), 0.5);
        let c = CacheKey::snap(WorldCoord::new(10.4, 20.4), 0.5);

        assert_eq!(a, b);
        assert_eq!(a.to_world(0.5), WorldCoord::new(10.0, 20.0));
        assert_ne!(a, c);
        assert_eq!(c.to_world(0.5), WorldCoord::new(10.5, 20.5));
    }

    #[test]
    fn test_snap_negative_coordinates() {
        let key = CacheKey::snap(WorldCoord::new(-10.1, -0.2), 0.5);
        assert_eq!(key, CacheKey { x: -20, z: 0 });
    }

    #[test]
    fn test_sanitize_non_finite() {
        let coord = WorldCoord::new(f64::NAN, f64::INFINITY).sanitized();
        assert_eq!(coord, WorldCoord::new(0.0, MAX_WORLD_COORD));

        let coord = WorldCoord::new(f64::NEG_INFINITY, -3.5).sanitized();
        assert_eq!(coord, WorldCoord::new(-MAX_WORLD_COORD, -3.5));
    }

    #[test]
    fn test_try_new_rejects_nan() {
        assert!(WorldCoord::try_new(1.0, 2.0).is_ok());
        assert!(matches!(
            WorldCoord::try_new(f64::NAN, 2.0),
            Err(TerrainError::NonFiniteCoordinate { .. })
        ));
    }
}
