//! Session configuration.
//!
//! Options mirror what a host exposes per filter instance: scale, tile sizes,
//! device, concurrency override, test-time augmentation and model choice.
//! Validation is pure and happens before any device resource is touched.

use crate::error::{Error, Result};
use crate::model::{ModelFiles, ModelKind, DEFAULT_MODEL_DIR};
use crate::tile::{resolve_tile_size, MIN_TILE_SIZE, PREPADDING};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-session options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Upscaling factor: 2, 3 or 4.
    pub scale: u32,
    /// Horizontal tile size. 0 picks one from the device memory budget.
    pub tile_size: u32,
    /// Vertical tile size. Defaults to `tile_size`.
    pub tile_size_y: Option<u32>,
    pub device_id: u32,
    /// Max concurrent submissions per device. 0 derives it from the queues.
    pub concurrency: u32,
    /// Test-time augmentation: run all 8 dihedral variants and average.
    pub tta: bool,
    pub model: ModelKind,
    pub model_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scale: 2,
            tile_size: 100,
            tile_size_y: None,
            device_id: 0,
            concurrency: 0,
            tta: false,
            model: ModelKind::default(),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(source)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_tile_size_y(mut self, tile_size_y: u32) -> Self {
        self.tile_size_y = Some(tile_size_y);
        self
    }

    pub fn with_device(mut self, device_id: u32) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_tta(mut self, tta: bool) -> Self {
        self.tta = tta;
        self
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn vertical_tile_size(&self) -> u32 {
        self.tile_size_y.unwrap_or(self.tile_size)
    }

    /// Check every option that can be judged without a device.
    pub fn validate(&self) -> Result<()> {
        if !(2..=4).contains(&self.scale) {
            return Err(Error::config(
                "scale",
                format!("must be 2, 3 or 4 (got {})", self.scale),
            ));
        }
        if !self.model.supported_scales().contains(&self.scale) {
            return Err(Error::config(
                "model",
                format!("{} only supports {:?}x scale", self.model, self.model.supported_scales()),
            ));
        }
        if self.tile_size != 0 && self.tile_size < MIN_TILE_SIZE {
            return Err(Error::config(
                "tile_size",
                format!("must be >= {MIN_TILE_SIZE} or 0 for auto (got {})", self.tile_size),
            ));
        }
        let tile_y = self.vertical_tile_size();
        if tile_y != 0 && tile_y < MIN_TILE_SIZE {
            return Err(Error::config(
                "tile_size_y",
                format!("must be >= {MIN_TILE_SIZE} or 0 for auto (got {tile_y})"),
            ));
        }
        Ok(())
    }

    pub fn model_files(&self) -> ModelFiles {
        self.model.files(&self.model_dir, self.scale)
    }

    /// Fix the automatic choices once the device memory budget is known.
    pub fn resolve(&self, heap_budget_mb: u64) -> Result<ResolvedConfig> {
        self.validate()?;
        Ok(ResolvedConfig {
            scale: self.scale,
            tile_width: resolve_tile_size(self.tile_size, heap_budget_mb),
            tile_height: resolve_tile_size(self.vertical_tile_size(), heap_budget_mb),
            prepadding: PREPADDING,
            tta: self.tta,
            files: self.model_files(),
        })
    }
}

/// Configuration with every automatic value decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub scale: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub prepadding: u32,
    pub tta: bool,
    pub files: ModelFiles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.scale, 2);
        assert_eq!(config.tile_size, 100);
        assert_eq!(config.vertical_tile_size(), 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_scale() {
        for scale in [0, 1, 5, 8] {
            let err = SessionConfig::default().with_scale(scale).validate().unwrap_err();
            assert!(matches!(err, Error::InvalidConfig { param: "scale", .. }));
        }
    }

    #[test]
    fn test_tile_size_bounds() {
        assert!(SessionConfig::default().with_tile_size(0).validate().is_ok());
        assert!(SessionConfig::default().with_tile_size(32).validate().is_ok());
        let err = SessionConfig::default().with_tile_size(31).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { param: "tile_size", .. }));

        let err = SessionConfig::default()
            .with_tile_size(64)
            .with_tile_size_y(16)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { param: "tile_size_y", .. }));
    }

    #[test]
    fn test_x4_models_need_scale_4() {
        let err = SessionConfig::default()
            .with_model(ModelKind::X4Plus)
            .with_scale(2)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        assert!(SessionConfig::default()
            .with_model(ModelKind::X4PlusAnime)
            .with_scale(4)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_resolve_auto_tiles() {
        let resolved = SessionConfig::default()
            .with_tile_size(0)
            .resolve(3000)
            .unwrap();
        assert_eq!(resolved.tile_width, 400);
        assert_eq!(resolved.tile_height, 400);
        assert_eq!(resolved.prepadding, 10);

        let resolved = SessionConfig::default()
            .with_tile_size(64)
            .with_tile_size_y(0)
            .resolve(300)
            .unwrap();
        assert_eq!(resolved.tile_width, 64);
        assert_eq!(resolved.tile_height, 100);
    }

    #[test]
    fn test_from_toml() {
        let config = SessionConfig::from_toml_str(
            r#"
            scale = 4
            tile_size = 0
            tile_size_y = 128
            device_id = 1
            concurrency = 2
            tta = true
            model = "x4-plus-anime"
            model_dir = "/opt/models"
            "#,
        )
        .unwrap();
        assert_eq!(config.scale, 4);
        assert_eq!(config.vertical_tile_size(), 128);
        assert_eq!(config.model, ModelKind::X4PlusAnime);
        assert!(config.tta);
        assert_eq!(
            config.model_files().weights,
            PathBuf::from("/opt/models/realesrgan-x4plus-anime.bin")
        );
    }

    #[test]
    fn test_from_toml_partial_uses_defaults() {
        let config = SessionConfig::from_toml_str("scale = 3").unwrap();
        assert_eq!(config.scale, 3);
        assert_eq!(config.tile_size, 100);
        assert_eq!(config.model, ModelKind::AnimeVideoV3);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = SessionConfig::from_toml_str("prepadding = 4").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
