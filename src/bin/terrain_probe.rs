//! Terrain probe: sample heights, stream a tile and optionally push it to a GPU
//!
//! Usage: terrain_probe [config.toml] [--preview out.png] [--gpu] [--walk N]

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use earth_terrain::constants::heights;
use earth_terrain::{
    CacheStats, HeightmapTexture, LodRingMesh, LodRingParams, TerrainConfig, TerrainSystem,
    WorldCoord,
};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    preview: Option<PathBuf>,
    gpu: bool,
    walk_steps: u32,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        walk_steps: 64,
        ..Args::default()
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--preview" => {
                let path = iter.next().context("--preview needs an output path")?;
                args.preview = Some(PathBuf::from(path));
            }
            "--gpu" => args.gpu = true,
            "--walk" => {
                let steps = iter.next().context("--walk needs a step count")?;
                args.walk_steps = steps.parse().context("--walk step count must be an integer")?;
            }
            other => args.config = Some(PathBuf::from(other)),
        }
    }
    Ok(args)
}

#[derive(Serialize)]
struct ProbeReport {
    seed: u32,
    provider: String,
    origin_height: f64,
    origin_underwater: bool,
    origin_slope: f64,
    spawn: Option<WorldCoord>,
    regenerations: u64,
    last_regeneration_ms: f64,
    cache: CacheStats,
    mesh_triangles: usize,
    gpu_uploads: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => TerrainConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TerrainConfig::default(),
    };

    let mut system = TerrainSystem::new(config).context("Failed to build terrain system")?;
    let cache = system.cache();

    let spawn = {
        let mut cache = cache.lock();
        cache
            .preload_region(0.0, 0.0, 32.0, 1.0)
            .context("Failed to preload spawn area")?;
        cache.find_dry_land(WorldCoord::ORIGIN, 512.0, 8.0, 0.3)
    };
    match spawn {
        Some(spot) => log::info!("Spawn at ({:.1}, {:.1})", spot.x, spot.z),
        None => log::warn!("No dry land within 512 units of the origin"),
    }

    // Walk the camera east and let the streamer follow
    let start = Instant::now();
    for step in 0..args.walk_steps {
        let viewpoint = WorldCoord::new(step as f64 * 6.0, 0.0);
        if let Some(reason) = system.update(viewpoint) {
            log::debug!("Step {}: regenerated ({:?})", step, reason);
        }
        cache.height_at(viewpoint.x, viewpoint.z);
    }
    log::info!("Walked {} steps in {:.2?}", args.walk_steps, start.elapsed());

    let mesh = LodRingMesh::for_heightmap(LodRingParams::default(), &system.config().heightmap)
        .context("LOD mesh does not fit the heightmap tile")?;

    if let Some(path) = &args.preview {
        let image = system
            .streamer()
            .tile()
            .to_image(heights::MIN_HEIGHT as f32, heights::EXPECTED_MAX_HEIGHT as f32);
        image
            .save(path)
            .with_context(|| format!("Failed to write preview {}", path.display()))?;
        log::info!("Wrote heightmap preview to {}", path.display());
    }

    let gpu_uploads = if args.gpu {
        Some(pollster::block_on(upload_to_gpu(&mut system)).context("GPU upload failed")?)
    } else {
        None
    };

    let report = ProbeReport {
        seed: system.config().seed,
        provider: system.provider().label(),
        origin_height: cache.height_at(0.0, 0.0),
        origin_underwater: cache.is_underwater(0.0, 0.0),
        origin_slope: cache.slope_at(0.0, 0.0),
        spawn,
        regenerations: system.streamer().regeneration_count(),
        last_regeneration_ms: system.streamer().last_regeneration_time().as_secs_f64() * 1000.0,
        cache: cache.cache_stats(),
        mesh_triangles: mesh.triangle_count(),
        gpu_uploads,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn upload_to_gpu(system: &mut TerrainSystem) -> Result<u64> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context("No suitable GPU adapter")?;
    log::info!("Using adapter: {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Terrain Probe Device"),
                ..Default::default()
            },
            None,
        )
        .await
        .context("Failed to create device")?;

    let _shader = HeightmapTexture::create_shader_module(&device);
    let mut texture = HeightmapTexture::new(&device, system.streamer());
    texture.upload(&queue, system.streamer_mut())?;

    // Teleport and upload again
    system.update(WorldCoord::new(10_000.0, 10_000.0));
    texture.upload(&queue, system.streamer_mut())?;
    device.poll(wgpu::Maintain::Wait);

    Ok(texture.upload_count())
}
