//! Builder for opening a GPU upscaling session.

use esrgan_burn::{GpuBackend, ModelLoader, Session, WgpuProvider};
use esrgan_core::{DeviceProvider, DeviceRegistry, ModelKind, SessionConfig};
use std::path::PathBuf;

use crate::{Error, Result};

/// A session on a wgpu device.
pub type Upscaler = Session<GpuBackend, WgpuProvider>;

/// Collects session options, then opens an [`Upscaler`] on a shared registry.
///
/// Sessions opened from builders that share a registry share device contexts
/// and gates. Without an explicit registry, a fresh one over every GPU is
/// created on `open`.
///
/// # Example
///
/// ```ignore
/// use esrgan::prelude::*;
///
/// let registry = DeviceRegistry::new(WgpuProvider::new());
/// let upscaler = UpscalerBuilder::default()
///     .scale(4)
///     .model(ModelKind::X4Plus)
///     .tta(true)
///     .registry(registry.clone())
///     .open(&my_loader)?;
/// upscaler.process(&input, &mut output)?;
/// ```
#[derive(Default)]
pub struct UpscalerBuilder {
    config: SessionConfig,
    registry: Option<DeviceRegistry<WgpuProvider>>,
}

impl UpscalerBuilder {
    /// Start from a full configuration, e.g. one loaded from TOML.
    pub fn from_config(config: SessionConfig) -> Self {
        Self {
            config,
            registry: None,
        }
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.config.scale = scale;
        self
    }

    /// 0 selects a size from the device memory budget.
    pub fn tile_size(mut self, tile_size: u32) -> Self {
        self.config.tile_size = tile_size;
        self
    }

    pub fn tile_size_y(mut self, tile_size_y: u32) -> Self {
        self.config.tile_size_y = Some(tile_size_y);
        self
    }

    pub fn device(mut self, device_id: u32) -> Self {
        self.config.device_id = device_id;
        self
    }

    /// Cap on concurrent submissions; 0 follows the device queues.
    pub fn concurrency(mut self, concurrency: u32) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn tta(mut self, tta: bool) -> Self {
        self.config.tta = tta;
        self
    }

    pub fn model(mut self, model: ModelKind) -> Self {
        self.config.model = model;
        self
    }

    pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.model_dir = dir.into();
        self
    }

    pub fn registry(mut self, registry: DeviceRegistry<WgpuProvider>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn open(self, loader: &dyn ModelLoader<GpuBackend>) -> Result<Upscaler> {
        self.config.validate()?;
        let registry = self
            .registry
            .unwrap_or_else(|| DeviceRegistry::new(WgpuProvider::new()));
        if registry.provider().device_count() == 0 {
            return Err(Error::NoDevice);
        }
        Ok(Session::open(&registry, &self.config, loader)?)
    }
}
