//! Framework-agnostic core of the tiled super-resolution pipeline.
//!
//! # Primary API
//!
//! - [`SessionConfig`]: per-session options, validation and auto tile sizing
//! - [`TileScheduler`]: row-major bands and padded tiles
//! - [`Frame`] / [`FrameMut`]: borrowed planar RGB buffers
//! - [`ConcurrencyGate`]: per-device bound on concurrent submissions
//! - [`DeviceRegistry`]: reference-counted GPU contexts, one per device
//!
//! No ML framework types appear here. The device path lives in
//! `esrgan-burn`, which implements [`DeviceProvider`] on top of wgpu.

pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod gate;
pub mod model;
pub mod registry;
pub mod tile;

pub use config::{ResolvedConfig, SessionConfig};
pub use device::{DeviceCapabilities, DeviceProvider};
pub use error::{Error, ErrorKind, Result};
pub use frame::{Frame, FrameMut, CHANNELS};
pub use gate::{gate_capacity, ConcurrencyGate, GatePermit};
pub use model::{ModelFiles, ModelKind, DEFAULT_MODEL_DIR};
pub use registry::{DeviceLease, DeviceRegistry};
pub use tile::{
    auto_tile_size, resolve_tile_size, Band, BandTiles, Bands, Rect, Tile, TileScheduler,
    MIN_TILE_SIZE, PREPADDING,
};
