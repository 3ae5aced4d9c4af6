//! Procedural height function
//!
//! Seven independent Perlin layers (continental, ridge, valley, hill, detail,
//! water, river) are shaped and combined into a single elevation, then
//! hydrology rules carve lakes and rivers. The function is pure: the same
//! seed and coordinates always produce the same bits.

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::constants::{amplitudes, frequencies, heights, hydrology, offsets};

/// Which hydrology override shaped a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hydrology {
    /// Lake basin, always below sea level
    Lake,
    /// Carved river channel
    River,
    /// Lowland smoothing near water
    Lowland,
    /// Untouched highland
    None,
}

/// Per-layer breakdown of one height evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    pub continental: f64,
    pub ridge: f64,
    pub ridge_strength: f64,
    pub valley: f64,
    pub hill: f64,
    pub detail: f64,
    pub water: f64,
    pub river: f64,
    /// Height before hydrology and clamping
    pub raw_height: f64,
    pub hydrology: Hydrology,
    /// Final clamped height
    pub height: f64,
}

pub struct TerrainGenerator {
    continental_noise: Perlin,
    ridge_noise: Perlin,
    valley_noise: Perlin,
    hill_noise: Perlin,
    detail_noise: Perlin,
    water_noise: Perlin,
    river_noise: Perlin,
    seed: u32,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            continental_noise: Perlin::new(seed),
            ridge_noise: Perlin::new(seed.wrapping_add(1)),
            valley_noise: Perlin::new(seed.wrapping_add(2)),
            hill_noise: Perlin::new(seed.wrapping_add(3)),
            detail_noise: Perlin::new(seed.wrapping_add(4)),
            water_noise: Perlin::new(seed.wrapping_add(5)),
            river_noise: Perlin::new(seed.wrapping_add(6)),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Terrain height at a world position
    #[inline]
    pub fn evaluate(&self, world_x: f64, world_z: f64) -> f64 {
        self.sample(world_x, world_z).height
    }

    /// Full layer breakdown; `evaluate` is defined in terms of this
    pub fn sample(&self, world_x: f64, world_z: f64) -> TerrainSample {
        let continental = layer(
            &self.continental_noise,
            world_x,
            world_z,
            frequencies::CONTINENTAL,
            offsets::CONTINENTAL,
        );

        let ridge_raw = layer(
            &self.ridge_noise,
            world_x,
            world_z,
            frequencies::RIDGE,
            offsets::RIDGE,
        );
        // Fold, then sharpen the crest
        let ridge = (1.0 - ridge_raw.abs())
            .max(0.0)
            .powf(amplitudes::RIDGE_EXPONENT);

        let valley_raw = layer(
            &self.valley_noise,
            world_x,
            world_z,
            frequencies::VALLEY,
            offsets::VALLEY,
        );
        let valley = valley_raw.signum() * valley_raw.abs().powf(amplitudes::VALLEY_EXPONENT);

        let mut hill = 0.0;
        for (frequency, weight) in frequencies::HILL_OCTAVES
            .iter()
            .zip(amplitudes::HILL_WEIGHTS.iter())
        {
            hill += layer(&self.hill_noise, world_x, world_z, *frequency, offsets::HILL) * weight;
        }

        let detail = layer(
            &self.detail_noise,
            world_x,
            world_z,
            frequencies::DETAIL,
            offsets::DETAIL,
        ) * amplitudes::DETAIL_WEIGHT;

        let ridge_strength = smoothstep(
            amplitudes::RIDGE_BAND_LOW,
            amplitudes::RIDGE_BAND_HIGH,
            continental,
        );

        let mut height = (continental * 0.5 + 0.5) * amplitudes::BASE;
        height += ridge * amplitudes::RIDGE * ridge_strength;
        height += valley * amplitudes::VALLEY;
        height += hill * amplitudes::HILL;
        height += detail * amplitudes::DETAIL;
        let raw_height = height;

        let water = layer(
            &self.water_noise,
            world_x,
            world_z,
            frequencies::WATER,
            offsets::WATER,
        );
        let river = layer(
            &self.river_noise,
            world_x,
            world_z,
            frequencies::RIVER,
            offsets::RIVER,
        );

        let (height, hydrology) = apply_hydrology(height, water, river);

        TerrainSample {
            continental,
            ridge,
            ridge_strength,
            valley,
            hill,
            detail,
            water,
            river,
            raw_height,
            hydrology,
            height: height.max(heights::MIN_HEIGHT),
        }
    }
}

#[inline]
fn layer(noise: &Perlin, world_x: f64, world_z: f64, frequency: f64, offset: [f64; 2]) -> f64 {
    noise.get([
        world_x * frequency + offset[0],
        world_z * frequency + offset[1],
    ])
}

/// Lake, river and lowland overrides; the first matching rule wins
pub fn apply_hydrology(height: f64, water: f64, river: f64) -> (f64, Hydrology) {
    if water < hydrology::LAKE_MASK && height < hydrology::LAKE_MAX_HEIGHT {
        (
            hydrology::LAKE_BASE - water * hydrology::LAKE_DEPTH_SCALE,
            Hydrology::Lake,
        )
    } else if river.abs() < hydrology::RIVER_WIDTH && height < hydrology::RIVER_MAX_HEIGHT {
        (
            height * hydrology::RIVER_SCALE + hydrology::RIVER_OFFSET,
            Hydrology::River,
        )
    } else if height < hydrology::LOWLAND_MAX_HEIGHT {
        (height * hydrology::LOWLAND_SCALE, Hydrology::Lowland)
    } else {
        (height, Hydrology::None)
    }
}

#[inline]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_is_deterministic() {
        let a = TerrainGenerator::new(12345);
        let b = TerrainGenerator::new(12345);

        for &(x, z) in &[(0.0, 0.0), (123.4, -56.7), (-1000.0, 2500.5), (9999.0, 9999.0)] {
            let first = a.evaluate(x, z);
            assert_eq!(first.to_bits(), a.evaluate(x, z).to_bits());
            assert_eq!(first.to_bits(), b.evaluate(x, z).to_bits());
        }
    }

    #[test]
    fn test_heights_within_expected_band() {
        let generator = TerrainGenerator::new(12345);
        for i in -40..40 {
            for j in -40..40 {
                let h = generator.evaluate(i as f64 * 37.3, j as f64 * 41.9);
                assert!(h.is_finite());
                assert!(h >= heights::MIN_HEIGHT, "height {} below floor", h);
                assert!(h <= 200.0, "height {} above layer amplitude sum", h);
            }
        }
    }

    #[test]
    fn test_seed_changes_terrain() {
        let a = TerrainGenerator::new(12345);
        let b = TerrainGenerator::new(54321);
        let differs = (0..32).any(|i| {
            let x = i as f64 * 97.0;
            a.evaluate(x, -x) != b.evaluate(x, -x)
        });
        assert!(differs);
    }

    #[test]
    fn test_sample_matches_evaluate() {
        let generator = TerrainGenerator::new(7);
        let sample = generator.sample(310.0, -42.0);
        assert_eq!(sample.height, generator.evaluate(310.0, -42.0));
        assert!(sample.ridge >= 0.0 && sample.ridge <= 1.0);
        assert!(sample.ridge_strength >= 0.0 && sample.ridge_strength <= 1.0);
    }

    #[test]
    fn test_hydrology_lake_overrides_river() {
        let (height, branch) = apply_hydrology(10.0, -0.5, 0.0);
        assert_eq!(branch, Hydrology::Lake);
        assert_eq!(height, -3.0 + 1.0);
        assert!(height < 0.0);
    }

    #[test]
    fn test_hydrology_river_channel() {
        let (height, branch) = apply_hydrology(20.0, 0.0, 0.05);
        assert_eq!(branch, Hydrology::River);
        assert!((height - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_hydrology_lowland_and_highland() {
        let (height, branch) = apply_hydrology(10.0, 0.0, 0.5);
        assert_eq!(branch, Hydrology::Lowland);
        assert!((height - 7.0).abs() < 1e-12);

        let (height, branch) = apply_hydrology(60.0, -0.9, 0.0);
        assert_eq!(branch, Hydrology::None);
        assert_eq!(height, 60.0);
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(-0.3, 0.2, -1.0), 0.0);
        assert_eq!(smoothstep(-0.3, 0.2, 1.0), 1.0);
        assert!((smoothstep(-0.3, 0.2, -0.05) - 0.5).abs() < 1e-12);
    }
}
