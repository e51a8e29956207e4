//! # esrgan - tiled GPU super-resolution
//!
//! Upscales planar RGB frames with a neural network, one padded tile at a
//! time, so device memory stays bounded whatever the frame size.
//!
//! ## Architecture
//!
//! esrgan is an umbrella crate over:
//! - **esrgan-core** - configuration, tile scheduling, frames, the per-device
//!   concurrency gate and the reference-counted device registry
//! - **esrgan-burn** - wgpu device bring-up, preprocessing, test-time
//!   augmentation, postprocessing and sessions on [burn](https://burn.dev)
//!
//! ## Quick Start
//!
//! ```ignore
//! use esrgan::prelude::*;
//!
//! let upscaler = UpscalerBuilder::default()
//!     .scale(2)
//!     .tile_size(0) // pick from the GPU memory budget
//!     .open(&my_loader)?;
//!
//! let input = Frame::new(w, h, stride, [&r, &g, &b])?;
//! let mut output = FrameMut::new(w * 2, h * 2, out_stride, [&mut r2, &mut g2, &mut b2])?;
//! upscaler.process(&input, &mut output)?;
//! ```

/// Re-export of esrgan-core for direct access
pub use esrgan_core as core;

/// Re-export of esrgan-burn for direct access
pub use esrgan_burn as gpu;

pub use esrgan_core::{
    DeviceCapabilities, DeviceProvider, DeviceRegistry, ErrorKind, Frame, FrameMut, ModelFiles,
    ModelKind, ResolvedConfig, SessionConfig, TileScheduler,
};

pub use esrgan_burn::{
    Dihedral, ForwardRunner, GpuBackend, InferenceRunner, ModelLoader, PixelReplicate,
    PixelReplicateLoader, Session, SessionState, WgpuProvider,
};

mod builder;
mod error;

pub use builder::{Upscaler, UpscalerBuilder};
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Upscaler, UpscalerBuilder};

    // Frames and configuration
    pub use crate::core::{Frame, FrameMut, ModelKind, SessionConfig};

    // Devices
    pub use crate::core::DeviceRegistry;
    pub use crate::gpu::WgpuProvider;

    // Networks
    pub use crate::gpu::{InferenceRunner, ModelLoader, Session};
}
