//! The network behind a session.
//!
//! A session never looks inside the model: it hands an `[1, 3, h, w]` tile
//! scaled to `[0, 255]` to [`InferenceRunner::forward`] and expects
//! `[1, 3, h * scale, w * scale]` back on the same device. Weights are
//! produced by a [`ModelLoader`] from the model files on disk.

use burn::prelude::*;
use esrgan_core::{ModelFiles, Result};
use std::sync::Arc;

/// A loaded super-resolution network.
///
/// A panic inside `forward` is fatal to the processing call; the gate permit
/// is still returned while the stack unwinds.
pub trait InferenceRunner<B: Backend>: Send + Sync {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4>;
}

/// Turns a model file pair into a runner on a device.
pub trait ModelLoader<B: Backend>: Send + Sync {
    fn load(
        &self,
        files: &ModelFiles,
        scale: u32,
        device: &B::Device,
    ) -> Result<Box<dyn InferenceRunner<B>>>;
}

impl<B, F> ModelLoader<B> for F
where
    B: Backend,
    F: Fn(&ModelFiles, u32, &B::Device) -> Result<Box<dyn InferenceRunner<B>>> + Send + Sync,
{
    fn load(
        &self,
        files: &ModelFiles,
        scale: u32,
        device: &B::Device,
    ) -> Result<Box<dyn InferenceRunner<B>>> {
        self(files, scale, device)
    }
}

/// Wraps a forward function as a runner.
pub struct ForwardRunner<B: Backend> {
    forward_fn: Arc<dyn Fn(Tensor<B, 4>) -> Tensor<B, 4> + Send + Sync>,
}

impl<B: Backend> ForwardRunner<B> {
    pub fn from_forward(
        f: impl Fn(Tensor<B, 4>) -> Tensor<B, 4> + Send + Sync + 'static,
    ) -> Self {
        Self {
            forward_fn: Arc::new(f),
        }
    }
}

impl<B: Backend> Clone for ForwardRunner<B> {
    fn clone(&self) -> Self {
        Self {
            forward_fn: Arc::clone(&self.forward_fn),
        }
    }
}

impl<B: Backend> InferenceRunner<B> for ForwardRunner<B> {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        (self.forward_fn)(input)
    }
}

/// Nearest-neighbour upscaler: every input pixel becomes a `scale x scale`
/// block. Exact and invariant under every flip and transpose, which makes it
/// the reference network for checking the tiling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelReplicate {
    scale: usize,
}

impl PixelReplicate {
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.max(1) as usize,
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale as u32
    }
}

impl<B: Backend> InferenceRunner<B> for PixelReplicate {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let [n, c, h, w] = input.dims();
        let s = self.scale;
        input
            .reshape([n, c, h, 1, w, 1])
            .repeat_dim(3, s)
            .repeat_dim(5, s)
            .reshape([n, c, h * s, w * s])
    }
}

/// Loader for [`PixelReplicate`]. The files must exist but their contents are
/// not read.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelReplicateLoader;

impl<B: Backend> ModelLoader<B> for PixelReplicateLoader {
    fn load(
        &self,
        files: &ModelFiles,
        scale: u32,
        _device: &B::Device,
    ) -> Result<Box<dyn InferenceRunner<B>>> {
        files.check_readable()?;
        tracing::debug!("Pixel-replicate runner at {}x for {}", scale, files.kind);
        Ok(Box::new(PixelReplicate::new(scale)))
    }
}
