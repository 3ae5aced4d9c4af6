//! GPU side of the terrain height system
//!
//! The CPU fills a heightmap tile from the shared height function; the GPU
//! only samples the uploaded texture. Key components:
//! - HeightmapStreamer: keeps the tile centred on the viewpoint
//! - HeightmapTexture: R32Float texture, uniforms and bind group
//! - LodRingMesh: concentric rings displaced by the shader

pub mod heightmap_streamer;
pub mod heightmap_texture;
pub mod lod_rings;

pub use heightmap_streamer::{HeightmapStreamer, HeightmapTile, RegenerationReason};
pub use heightmap_texture::{HeightmapTexture, HeightmapUniforms, TERRAIN_DISPLACEMENT_WGSL};
pub use lod_rings::{LodRingMesh, LodRingParams, RingVertex};
