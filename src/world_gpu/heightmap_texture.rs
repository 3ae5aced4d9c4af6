use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::heightmap_streamer::{HeightmapStreamer, HeightmapTile};
use crate::constants::heightmap::BYTES_PER_TEXEL;
use crate::error::{TerrainError, TerrainResult};

/// Displacement + normal reconstruction shader
pub const TERRAIN_DISPLACEMENT_WGSL: &str = include_str!("shaders/terrain_displacement.wgsl");

/// Shader-side heightmap parameters; mirrors `HeightmapParams` in the WGSL
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct HeightmapUniforms {
    /// World-space centre of the current tile (heightmapCenter)
    pub center: [f32; 2],
    /// Texels per side (heightmapSize)
    pub size: f32,
    /// World units per texel (terrainScale)
    pub texel_scale: f32,
}

impl HeightmapUniforms {
    pub fn from_tile(tile: &HeightmapTile) -> Self {
        let center = tile.center();
        Self {
            center: [center.x as f32, center.z as f32],
            size: tile.size() as f32,
            texel_scale: tile.texel_scale() as f32,
        }
    }
}

/// GPU copy of the streamed heightmap: an R32Float texture, its parameter
/// uniform, and the bind group the displacement shader reads (group 1).
pub struct HeightmapTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    size: u32,
    uploads: u64,
}

impl HeightmapTexture {
    pub fn new(device: &wgpu::Device, streamer: &HeightmapStreamer) -> Self {
        let size = streamer.tile().size();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Terrain Heightmap Texture"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Heightmap Uniforms"),
            contents: bytemuck::bytes_of(&streamer.uniforms()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = Self::create_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Heightmap Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        log::info!("[HeightmapTexture] Created {}x{} R32Float heightmap", size, size);

        Self {
            texture,
            view,
            uniform_buffer,
            bind_group_layout,
            bind_group,
            size,
            uploads: 0,
        }
    }

    /// Layout for group 1 of the displacement shader
    pub fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Heightmap Bind Group Layout"),
            entries: &[
                // R32Float is not filterable; the shader interpolates with textureLoad
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<HeightmapUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        })
    }

    pub fn create_shader_module(device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Displacement Shader"),
            source: wgpu::ShaderSource::Wgsl(TERRAIN_DISPLACEMENT_WGSL.into()),
        })
    }

    /// Re-upload texels and uniforms if the tile changed since the last call.
    /// Returns whether an upload happened.
    pub fn upload(&mut self, queue: &wgpu::Queue, streamer: &mut HeightmapStreamer) -> TerrainResult<bool> {
        if !streamer.is_dirty() {
            return Ok(false);
        }

        let tile = streamer.tile();
        if tile.size() != self.size {
            return Err(TerrainError::invalid_config(
                "heightmap.size",
                format!("tile is {} texels but the texture holds {}", tile.size(), self.size),
            ));
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            tile.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(BYTES_PER_TEXEL * self.size),
                rows_per_image: Some(self.size),
            },
            wgpu::Extent3d {
                width: self.size,
                height: self.size,
                depth_or_array_layers: 1,
            },
        );
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&streamer.uniforms()));

        streamer.mark_uploaded();
        self.uploads += 1;
        log::debug!("[HeightmapTexture] Uploaded heightmap (upload #{})", self.uploads);
        Ok(true)
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeightmapConfig;
    use crate::world::{TerrainGenerator, WorldCoord};
    use std::sync::Arc;

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        // vec2<f32> + f32 + f32
        assert_eq!(std::mem::size_of::<HeightmapUniforms>(), 16);
        assert_eq!(std::mem::align_of::<HeightmapUniforms>(), 4);
    }

    #[test]
    fn test_uniforms_follow_tile() {
        let config = HeightmapConfig {
            size: 8,
            texel_scale: 2.5,
            regen_distance: 1.0,
            parallel_fill: false,
        };
        let streamer = HeightmapStreamer::new_at(
            Arc::new(TerrainGenerator::new(3)),
            &config,
            WorldCoord::new(-12.0, 40.0),
        );
        let uniforms = streamer.uniforms();
        assert_eq!(uniforms.center, [-12.0, 40.0]);
        assert_eq!(uniforms.size, 8.0);
        assert_eq!(uniforms.texel_scale, 2.5);
        assert_eq!(bytemuck::bytes_of(&uniforms).len(), 16);
    }

    #[test]
    fn test_displacement_shader_validates() {
        let module = naga::front::wgsl::parse_str(TERRAIN_DISPLACEMENT_WGSL)
            .expect("Displacement shader should parse");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .expect("Displacement shader should validate");

        let entry_points: Vec<&str> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(entry_points.contains(&"vs_main"));
        assert!(entry_points.contains(&"fs_main"));
    }
}
