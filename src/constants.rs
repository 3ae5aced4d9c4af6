// Earth Terrain Constants - SINGLE SOURCE OF TRUTH
//
// Every tuning value of the height function and its consumers lives here.
// The CPU cache and the heightmap tile fill both evaluate the same formula
// with these values; the GPU only ever samples the resulting texture.
//
// CRITICAL: Do NOT define terrain constants anywhere else in the codebase!

/// Noise layer frequencies (cycles per world unit)
pub mod frequencies {
    /// Continent-scale landmass signal
    pub const CONTINENTAL: f64 = 0.001;
    /// Mountain ridge belts
    pub const RIDGE: f64 = 0.003;
    /// Valley carving
    pub const VALLEY: f64 = 0.008;
    /// Hill octaves, weighted by `amplitudes::HILL_WEIGHTS`
    pub const HILL_OCTAVES: [f64; 3] = [0.015, 0.03, 0.06];
    /// Surface detail
    pub const DETAIL: f64 = 0.1;
    /// Lake basin mask (low frequency)
    pub const WATER: f64 = 0.002;
    /// River network mask
    pub const RIVER: f64 = 0.004;
}

/// Layer amplitudes and shaping exponents (world units)
pub mod amplitudes {
    /// Base elevation spread: `(continental * 0.5 + 0.5) * BASE`
    pub const BASE: f64 = 30.0;
    pub const RIDGE: f64 = 80.0;
    pub const VALLEY: f64 = 40.0;
    pub const HILL: f64 = 35.0;
    pub const DETAIL: f64 = 8.0;

    pub const HILL_WEIGHTS: [f64; 3] = [0.5, 0.25, 0.125];
    pub const DETAIL_WEIGHT: f64 = 0.1;

    /// Folded ridge noise is raised to this power
    pub const RIDGE_EXPONENT: f64 = 1.5;
    /// Signed power applied to valley noise
    pub const VALLEY_EXPONENT: f64 = 0.7;

    /// Continental band in which ridges fade in (smoothstep edges)
    pub const RIDGE_BAND_LOW: f64 = -0.3;
    pub const RIDGE_BAND_HIGH: f64 = 0.2;
}

/// Hydrology overrides. These bands assume the amplitudes above; changing
/// any amplitude without revisiting them puts rivers on mountains.
pub mod hydrology {
    /// Water mask below this value carves a lake...
    pub const LAKE_MASK: f64 = -0.4;
    /// ...but only where the terrain is lower than this
    pub const LAKE_MAX_HEIGHT: f64 = 15.0;
    /// Lake floor: `LAKE_BASE - water * LAKE_DEPTH_SCALE`
    pub const LAKE_BASE: f64 = -3.0;
    pub const LAKE_DEPTH_SCALE: f64 = 2.0;

    /// `|river| < RIVER_WIDTH` marks a channel...
    pub const RIVER_WIDTH: f64 = 0.1;
    /// ...below this height
    pub const RIVER_MAX_HEIGHT: f64 = 25.0;
    /// Channel: `height * RIVER_SCALE + RIVER_OFFSET`
    pub const RIVER_SCALE: f64 = 0.3;
    pub const RIVER_OFFSET: f64 = -2.0;

    /// Lowlands below this height are flattened by `LOWLAND_SCALE`
    pub const LOWLAND_MAX_HEIGHT: f64 = 20.0;
    pub const LOWLAND_SCALE: f64 = 0.7;
}

/// Height limits (world units)
pub mod heights {
    /// Deepest terrain ever exposed, underwater included
    pub const MIN_HEIGHT: f64 = -8.0;
    /// Empirical ceiling from the summed layer amplitudes
    pub const EXPECTED_MAX_HEIGHT: f64 = 150.0;
    pub const SEA_LEVEL: f64 = 0.0;
}

/// Per-layer domain offsets. Perlin noise is zero on integer lattice
/// points, so each layer samples a shifted, non-integer domain.
pub mod offsets {
    pub const CONTINENTAL: [f64; 2] = [1000.37, 1000.61];
    pub const RIDGE: [f64; 2] = [2000.13, -2000.49];
    pub const VALLEY: [f64; 2] = [-3000.71, 3000.23];
    pub const HILL: [f64; 2] = [4000.29, 4000.83];
    pub const DETAIL: [f64; 2] = [-5000.59, -5000.17];
    pub const WATER: [f64; 2] = [6000.43, -6000.91];
    pub const RIVER: [f64; 2] = [-7000.07, 7000.67];
}

/// Height query cache defaults
pub mod cache {
    pub const DEFAULT_CAPACITY: usize = 10_000;
    /// Grid resolution queries snap to (world units)
    pub const DEFAULT_GRID_RESOLUTION: f64 = 0.5;
    /// Default central-difference distance for normals (world units)
    pub const DEFAULT_NORMAL_SAMPLE_DISTANCE: f64 = 1.0;
    /// Stale LRU queue entries tolerated per live entry before compaction
    pub const LRU_COMPACTION_FACTOR: usize = 8;
    pub const LRU_COMPACTION_MIN: usize = 1024;
}

/// World extent accepted at the query boundary (world units)
pub mod world {
    /// Coordinates are clamped to +/- this value; infinities map onto it
    pub const MAX_WORLD_COORD: f64 = 1_000_000.0;
}

/// Heightmap streaming defaults
pub mod heightmap {
    /// Texels per side
    pub const DEFAULT_SIZE: u32 = 512;
    /// World units per texel
    pub const DEFAULT_TEXEL_SCALE: f64 = 4.0;
    /// Viewpoint drift that triggers regeneration (world units)
    pub const DEFAULT_REGEN_DISTANCE: f64 = 32.0;
    /// Bytes per texel in the R32Float texture
    pub const BYTES_PER_TEXEL: u32 = 4;
}

/// LOD ring mesh defaults
pub mod lod {
    /// Quads per side of the innermost grid
    pub const DEFAULT_INNER_QUADS: u32 = 60;
    /// Rings around the inner grid, each doubling the vertex spacing
    pub const DEFAULT_RING_COUNT: u32 = 3;
    /// Quad width in ring 0 (world units)
    pub const DEFAULT_BASE_SPACING: f32 = 4.0;
}
