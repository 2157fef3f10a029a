//! Entry point for DerBaum: loads the tree scene's assets onto a device,
//! optionally cycles unload/load, and reports what was allocated.

mod config;
mod scene;

use anyhow::{Context, Result};
use renderer::{GraphicsDevice, HeadlessDevice, WgpuDevice};

use crate::config::{AppConfig, DeviceKind};

fn run(config: &AppConfig, device: &mut dyn GraphicsDevice) -> Result<()> {
    let mut registry = scene::tree_scene(&config.assets);
    log::info!(
        "Loading {} assets from {} on the {} device",
        registry.len(),
        config.assets.display(),
        device.name()
    );

    registry
        .load_all(device)
        .with_context(|| format!("loading scene from {}", config.assets.display()))?;
    log::info!("Scene ready: {}/{} assets loaded", registry.loaded_count(), registry.len());

    for cycle in 1..=config.cycles {
        registry.unload_all(device);
        registry
            .load_all(device)
            .with_context(|| format!("reloading scene (cycle {cycle})"))?;
        log::debug!("Cycle {} done", cycle);
    }

    registry.unload_all(device);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    log::info!(
        "Starting DerBaum. Device: {:?}, backends: {:?}, cycles: {}",
        config.device,
        config.backends,
        config.cycles
    );

    match config.device {
        DeviceKind::Headless => {
            let mut device = HeadlessDevice::new();
            run(&config, &mut device)?;
            let stats = device.stats();
            log::info!(
                "Headless device: {} handles created, {} deleted, {} stale deletes, {} live",
                stats.created.total(),
                stats.deleted.total(),
                stats.stale_deletes,
                device.live_handles()
            );
        }
        DeviceKind::Wgpu => {
            let mut device =
                WgpuDevice::new_headless(config.backends).context("opening wgpu device")?;
            run(&config, &mut device)?;
            log::info!(
                "wgpu device '{}': {} live handles",
                device.adapter_info().name,
                device.live_handles()
            );
        }
    }

    Ok(())
}
