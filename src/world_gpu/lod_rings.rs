//! Concentric LOD ring mesh
//!
//! Ring 0 is a full grid of `inner_quads` quads per side. Each following ring
//! is a square annulus with twice the vertex spacing and twice the extent.
//! The mesh is built in camera-local xz; the displacement shader snaps it to
//! the coarsest spacing and lifts every vertex from the heightmap.

use bytemuck::{Pod, Zeroable};
use rustc_hash::FxHashMap as HashMap;

use crate::config::HeightmapConfig;
use crate::constants::lod;
use crate::error::{TerrainError, TerrainResult};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RingVertex {
    /// Camera-local xz position
    pub position: [f32; 2],
}

impl RingVertex {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RingVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Local xz
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodRingParams {
    /// Quads per side of every ring's grid; a multiple of 4
    pub inner_quads: u32,
    /// Rings around the inner grid
    pub ring_count: u32,
    /// Quad width in ring 0
    pub base_spacing: f32,
}

impl Default for LodRingParams {
    fn default() -> Self {
        Self {
            inner_quads: lod::DEFAULT_INNER_QUADS,
            ring_count: lod::DEFAULT_RING_COUNT,
            base_spacing: lod::DEFAULT_BASE_SPACING,
        }
    }
}

impl LodRingParams {
    /// Distance from the mesh centre to its outer edge
    pub fn radius(&self) -> f32 {
        self.inner_quads as f32 * 0.5 * self.base_spacing * (1u32 << self.ring_count) as f32
    }

    /// Spacing of the outermost ring; the mesh origin snaps to this
    pub fn coarsest_spacing(&self) -> f32 {
        self.base_spacing * (1u32 << self.ring_count) as f32
    }

    pub fn validate(&self) -> TerrainResult<()> {
        if self.inner_quads < 4 || self.inner_quads % 4 != 0 {
            return Err(TerrainError::invalid_config(
                "lod.inner_quads",
                format!("must be a positive multiple of 4, got {}", self.inner_quads),
            ));
        }
        if self.ring_count > 16 {
            return Err(TerrainError::invalid_config(
                "lod.ring_count",
                format!("at most 16 rings, got {}", self.ring_count),
            ));
        }
        if !self.base_spacing.is_finite() || self.base_spacing <= 0.0 {
            return Err(TerrainError::invalid_config(
                "lod.base_spacing",
                format!("must be positive, got {}", self.base_spacing),
            ));
        }
        Ok(())
    }
}

pub struct LodRingMesh {
    pub vertices: Vec<RingVertex>,
    pub indices: Vec<u32>,
    params: LodRingParams,
}

impl LodRingMesh {
    pub fn new(params: LodRingParams) -> TerrainResult<Self> {
        params.validate()?;

        let mut builder = MeshBuilder::default();
        let n = params.inner_quads as i64;
        let hole_start = n / 4;
        let hole_end = 3 * n / 4;

        for ring in 0..=params.ring_count {
            // Vertex positions in units of the base spacing
            let step = 1i64 << ring;
            let half = n / 2 * step;
            for cz in 0..n {
                for cx in 0..n {
                    let inside_hole = ring > 0
                        && (hole_start..hole_end).contains(&cx)
                        && (hole_start..hole_end).contains(&cz);
                    if inside_hole {
                        continue;
                    }
                    let x0 = -half + cx * step;
                    let z0 = -half + cz * step;
                    builder.quad(x0, z0, step);
                }
            }
        }

        let vertices = builder
            .positions
            .iter()
            .map(|&(x, z)| RingVertex {
                position: [x as f32 * params.base_spacing, z as f32 * params.base_spacing],
            })
            .collect();

        Ok(Self {
            vertices,
            indices: builder.indices,
            params,
        })
    }

    /// Build a mesh and check it stays inside the streamed tile, so the
    /// horizon is never flattened to sea level. The tile centre may trail the
    /// camera by up to `regen_distance` before the streamer recentres it.
    pub fn for_tile(
        params: LodRingParams,
        tile_half_extent: f64,
        regen_distance: f64,
    ) -> TerrainResult<Self> {
        params.validate()?;
        if !regen_distance.is_finite() || regen_distance < 0.0 {
            return Err(TerrainError::invalid_config(
                "heightmap.regen_distance",
                format!("must be non-negative and finite, got {}", regen_distance),
            ));
        }
        // Snapping moves the mesh up to one coarse cell away from the camera
        let reach = params.radius() as f64 + params.coarsest_spacing() as f64 + regen_distance;
        if reach > tile_half_extent {
            return Err(TerrainError::invalid_config(
                "lod",
                format!(
                    "mesh reaches {} units including {} of tile lag but the tile only covers {}",
                    reach, regen_distance, tile_half_extent
                ),
            ));
        }
        Self::new(params)
    }

    /// [`for_tile`](Self::for_tile) for a heightmap configuration
    pub fn for_heightmap(params: LodRingParams, config: &HeightmapConfig) -> TerrainResult<Self> {
        Self::for_tile(params, config.world_extent() * 0.5, config.regen_distance)
    }

    pub fn params(&self) -> &LodRingParams {
        &self.params
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Default)]
struct MeshBuilder {
    positions: Vec<(i64, i64)>,
    lookup: HashMap<(i64, i64), u32>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    fn vertex(&mut self, x: i64, z: i64) -> u32 {
        if let Some(&index) = self.lookup.get(&(x, z)) {
            return index;
        }
        let index = self.positions.len() as u32;
        self.positions.push((x, z));
        self.lookup.insert((x, z), index);
        index
    }

    /// Two counter-clockwise triangles seen from +y
    fn quad(&mut self, x0: i64, z0: i64, step: i64) {
        let a = self.vertex(x0, z0);
        let b = self.vertex(x0 + step, z0);
        let c = self.vertex(x0 + step, z0 + step);
        let d = self.vertex(x0, z0 + step);
        self.indices.extend_from_slice(&[a, d, c, a, c, b]);
    }
}
