//! Device probe. Lists GPUs, shows the tile sizes a session would pick on
//! each, and pushes a synthetic frame through the pipeline with the
//! pixel-replicate network when the configured model files are installed.
//!
//! Usage: `esrgan-probe [config.toml]`

use std::env;
use std::time::Instant;

use esrgan::core::{auto_tile_size, gate_capacity};
use esrgan::{
    DeviceProvider, DeviceRegistry, Frame, FrameMut, PixelReplicateLoader, Result, Session,
    SessionConfig, WgpuProvider,
};
use tracing_subscriber::EnvFilter;

const PROBE_SIZE: u32 = 96;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::args().nth(1) {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    config.validate()?;

    let registry = DeviceRegistry::new(WgpuProvider::new());
    let count = registry.provider().device_count();
    tracing::info!("{count} GPU device(s)");

    for id in 0..count {
        if let Some(info) = registry.provider().adapter_info(id) {
            tracing::info!("[{id}] {} ({:?}, {:?})", info.name, info.device_type, info.backend);
        }
        let lease = match registry.acquire(id, config.concurrency) {
            Ok(lease) => lease,
            Err(e) => {
                tracing::warn!("[{id}] unavailable: {e}");
                continue;
            }
        };
        let caps = lease.capabilities();
        tracing::info!(
            "[{id}] budget {} MB, auto tile {}, gate capacity {}",
            caps.heap_budget_mb,
            auto_tile_size(caps.heap_budget_mb),
            gate_capacity(caps, config.concurrency)
        );
    }

    if count == 0 {
        return Err(esrgan::Error::NoDevice);
    }

    let files = config.model_files();
    if let Err(e) = files.check_readable() {
        tracing::warn!("Skipping pipeline run: {e}");
        return Ok(());
    }

    let session: Session<esrgan::GpuBackend, WgpuProvider> =
        Session::open(&registry, &config, &PixelReplicateLoader)?;
    let (tile_x, tile_y) = session.tile_size();
    let scale = session.scale();

    let side = PROBE_SIZE as usize;
    let plane: Vec<f32> = (0..side * side)
        .map(|i| ((i % side) + (i / side)) as f32 / (2 * side) as f32)
        .collect();
    let input = Frame::new(PROBE_SIZE, PROBE_SIZE, side, [&plane, &plane, &plane])?;

    let out_side = side * scale as usize;
    let mut out = [
        vec![0.0f32; out_side * out_side],
        vec![0.0f32; out_side * out_side],
        vec![0.0f32; out_side * out_side],
    ];
    let started = Instant::now();
    {
        let [r, g, b] = &mut out;
        let mut output = FrameMut::new(out_side as u32, out_side as u32, out_side, [r, g, b])?;
        session.process(&input, &mut output)?;
    }
    let elapsed = started.elapsed();

    let max_error = (0..out_side * out_side)
        .map(|i| {
            let (x, y) = (i % out_side, i / out_side);
            let source = plane[(y / scale as usize) * side + x / scale as usize];
            (out[0][i] - source).abs()
        })
        .fold(0.0f32, f32::max);

    tracing::info!(
        "{PROBE_SIZE}x{PROBE_SIZE} at {scale}x with {tile_x}x{tile_y} tiles (tta {}): {:.2?}, max error {max_error:.2e}",
        session.tta(),
        elapsed
    );
    Ok(())
}
