//! Burn device path for tiled super-resolution.
//!
//! Brings up wgpu devices behind [`esrgan_core::DeviceProvider`], turns frame
//! bands into tensors, runs a network per tile (optionally under the eight
//! flips and transposes of test-time augmentation) and writes the stitched
//! result back into the caller's frame.
//!
//! ```rust,ignore
//! let registry = DeviceRegistry::new(WgpuProvider::new());
//! let config = SessionConfig::default().with_scale(2).with_tta(true);
//! let session: Session<Wgpu, _> = Session::open(&registry, &config, &loader)?;
//! session.process(&input, &mut output)?;
//! ```

mod device_pool;
mod dihedral;
mod postprocess;
mod preprocess;
mod runner;
mod session;

pub use device_pool::{DeviceContext, WgpuContext, WgpuProvider};
pub use dihedral::Dihedral;
pub use postprocess::Postprocessor;
pub use preprocess::{Preprocessor, PIXEL_SCALE};
pub use runner::{ForwardRunner, InferenceRunner, ModelLoader, PixelReplicate, PixelReplicateLoader};
pub use session::{Session, SessionState};

/// GPU backend sessions run on.
pub type GpuBackend = burn::backend::wgpu::Wgpu;
