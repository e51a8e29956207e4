//! Frame rows to network-ready tensors.
//!
//! A band's padded rows are compacted on the host (stride dropped, samples
//! scaled to `[0, 255]`) and uploaded once; tiles are then cut from the band
//! tensor on the device.

use burn::prelude::*;
use burn::tensor::TensorData;
use esrgan_core::{Band, Frame, Tile, CHANNELS};

use crate::dihedral::Dihedral;

/// Input frames are `[0, 1]`; the networks expect `[0, 255]`.
pub const PIXEL_SCALE: f32 = 255.0;

pub struct Preprocessor<B: Backend> {
    device: B::Device,
    tta: bool,
}

impl<B: Backend> Preprocessor<B> {
    pub fn new(device: B::Device, tta: bool) -> Self {
        Self { device, tta }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn tta(&self) -> bool {
        self.tta
    }

    /// Upload rows `[py0, py1)` of every channel as `[1, 3, rows, width]`.
    pub fn upload_band(&self, frame: &Frame<'_>, band: &Band) -> Tensor<B, 4> {
        let width = frame.width() as usize;
        let rows = band.padded_height() as usize;

        let mut host = Vec::with_capacity(CHANNELS * rows * width);
        for channel in 0..CHANNELS {
            for y in band.py0..band.py1 {
                host.extend(frame.row(channel, y).iter().map(|v| v * PIXEL_SCALE));
            }
        }

        Tensor::from_data(TensorData::new(host, [1, CHANNELS, rows, width]), &self.device)
    }

    /// Cut the padded window of `tile` out of its band tensor.
    pub fn tile_input(&self, band_tensor: &Tensor<B, 4>, band: &Band, tile: &Tile) -> Tensor<B, 4> {
        let window = tile.padded;
        let rows = (window.y0 - band.py0) as usize..(window.y1 - band.py0) as usize;
        band_tensor
            .clone()
            .slice([0..1, 0..CHANNELS, rows, window.x0 as usize..window.x1 as usize])
    }

    /// The tensors to run through the network for one tile: the tile itself,
    /// or all eight flips and transposes when TTA is on.
    pub fn variants(&self, tile: Tensor<B, 4>) -> Vec<(Dihedral, Tensor<B, 4>)> {
        if !self.tta {
            return vec![(Dihedral::Identity, tile)];
        }
        Dihedral::ALL
            .iter()
            .map(|&transform| (transform, transform.apply(tile.clone())))
            .collect()
    }
}
